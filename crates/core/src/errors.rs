use thiserror::Error;

use crate::config::ConfigError;
use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl ApplicationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => {
                "Something went wrong while planning your trip. \
                 Please try again or say 'start over'."
            }
            Self::Configuration(_) => {
                "The planner is not configured. Check the API credentials and restart."
            }
        }
    }
}
