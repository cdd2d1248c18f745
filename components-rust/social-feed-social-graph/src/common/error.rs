use golem_rust::Schema;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Schema, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
}

impl ErrorKind {
    /// Status code the HTTP gateway answers with for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Forbidden => 403,
            ErrorKind::Validation => 400,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not-found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::Validation => write!(f, "validation"),
        }
    }
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialError {
    pub kind: ErrorKind,
    /// HTTP status of `kind`, carried along so the gateway can answer with it.
    pub status: u64,
    pub message: String,
}

impl SocialError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        SocialError {
            kind,
            status: u64::from(kind.status_code()),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn user_not_found() -> Self {
        Self::not_found("User not found")
    }

    pub fn post_not_found() -> Self {
        Self::not_found("Post not found")
    }
}

impl Display for SocialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for SocialError {}
