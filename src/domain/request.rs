use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single free-text request, supplied once per invocation. No structure is
/// imposed beyond being non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserRequest {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

impl UserRequest {
    pub fn new(text: &str) -> Result<Self> {
        let request = Self {
            text: text.trim().to_string(),
        };
        request
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid user request: {}", e)))?;
        Ok(request)
    }
}
