pub mod session;
pub mod transcript;
pub mod trip;
