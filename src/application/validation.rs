//! Input validation. Runs before any dispatch; failures here abort the run
//! with a user-visible message.

use crate::domain::errors::{DomainError, DomainResult};

/// Validate and normalize an A-share stock code: exactly six ASCII digits.
pub fn validate_stock_code(code: &str) -> DomainResult<String> {
    let trimmed = code.trim();
    if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Ok(trimmed.to_string())
    } else {
        Err(DomainError::Validation(format!(
            "stock code must be exactly six digits, got {code:?}"
        )))
    }
}
