use std::process::ExitCode;

fn main() -> ExitCode {
    tripsmith_cli::run()
}
