use std::fmt::{self, Display};

/// Errors produced by model constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    EmptyUsername,
    InvalidEmail(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyUsername => {
                write!(f, "test user name must not be empty")
            }
            ModelError::InvalidEmail(email) => {
                write!(f, "invalid email address: {email}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
