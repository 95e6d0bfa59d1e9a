//! Structured error types for the SPC engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpcError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("insufficient data: need at least {required} values, got {actual}")]
  InsufficientData { required: usize, actual: usize },

  #[error("storage: {0}")]
  Storage(String),
}

impl SpcError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn storage(msg: impl Into<String>) -> Self {
    Self::Storage(msg.into())
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation { .. })
  }

  pub fn is_insufficient_data(&self) -> bool {
    matches!(self, Self::InsufficientData { .. })
  }

  pub fn is_storage(&self) -> bool {
    matches!(self, Self::Storage(_))
  }
}

impl From<std::io::Error> for SpcError {
  fn from(e: std::io::Error) -> Self {
    Self::Storage(e.to_string())
  }
}
