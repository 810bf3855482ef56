//! Validity
//!
//! A tagged validation outcome (valid / invalid + reason). Used wherever a
//! failed check is an expected, recoverable answer rather than an error:
//! geometry shape checks, configuration checks, and controller argument
//! checks. Callers that need to abort turn an invalid result into an error
//! with [`Validity::into_result`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl Validity {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_valid(&mut self, is_valid: bool) {
        self.is_valid = is_valid;
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
    }

    /// Keep the first failure: `self` if invalid, otherwise `other`
    pub fn and(self, other: impl FnOnce() -> Validity) -> Validity {
        if self.is_valid {
            other()
        } else {
            self
        }
    }

    /// Convert into a `Result`, building the error from the failure reason
    pub fn into_result<E>(self, error: impl FnOnce(String) -> E) -> Result<(), E> {
        if self.is_valid {
            Ok(())
        } else {
            Err(error(self.reason.unwrap_or_default()))
        }
    }
}

impl Default for Validity {
    fn default() -> Self {
        Self::valid()
    }
}
