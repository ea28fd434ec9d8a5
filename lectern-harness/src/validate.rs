//! Validation plugins.
//!
//! Validators are external, swappable checks over an executed notebook.
//! The harness knows nothing about what they verify: they take the client,
//! inspect whatever state they care about, and pass or fail.

use async_trait::async_trait;
use tracing::debug;

use crate::client::NotebookClient;

/// Failure raised by a validator or a test body.
#[derive(Debug)]
pub struct ValidationError {
    /// Name of the validator that failed, when one was attributed
    pub validator: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            validator: None,
            message: message.into(),
        }
    }

    /// Attribute this failure to a named validator (first attribution wins)
    pub fn with_validator(mut self, name: &str) -> Self {
        if self.validator.is_none() {
            self.validator = Some(name.to_string());
        }
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.validator {
            Some(validator) => write!(f, "Validator '{}' failed: {}", validator, self.message),
            None => write!(f, "Validation failed: {}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A check over an executed notebook.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Name used to attribute failures
    fn name(&self) -> &str;

    /// Inspect the executed notebook; fail by returning an error.
    async fn validate(&self, client: &NotebookClient) -> Result<(), ValidationError>;
}

/// Run validators in order, stopping at the first failure.
pub async fn run_validators(
    client: &NotebookClient,
    validators: &[Box<dyn Validator>],
) -> Result<(), ValidationError> {
    for validator in validators {
        debug!(validator = validator.name(), "running validator");
        validator
            .validate(client)
            .await
            .map_err(|e| e.with_validator(validator.name()))?;
    }
    Ok(())
}
