//! Interactive acquisition of missing bootstrap parameters.
//!
//! The configure and install phases cannot proceed with blanks, so missing
//! fields are pulled through [`CredentialSource`] before the phase runs.
//! The engine keeps asking per field until it gets a non-empty answer; the
//! source itself decides how a single ask happens.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Supplier of one bootstrap field value.
pub trait CredentialSource {
    /// Ask once for `field`, showing `prompt`. An empty answer is allowed
    /// here; the caller loops.
    fn ask(&self, field: &str, prompt: &str) -> Result<String>;
}

/// Ask a source for `field` until the answer is non-empty.
pub fn acquire(source: &dyn CredentialSource, field: &str, prompt: &str) -> Result<String> {
    loop {
        let answer = source.ask(field, prompt)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

/// Fixed answers, for non-interactive runs and tests.
///
/// Asking for a field with no entry is an error rather than an infinite
/// loop.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    answers: HashMap<String, String>,
}

impl StaticCredentials {
    /// An empty source that fails on any ask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed answer for a field.
    #[must_use]
    pub fn with(mut self, field: &str, answer: &str) -> Self {
        self.answers.insert(field.to_string(), answer.to_string());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn ask(&self, field: &str, _prompt: &str) -> Result<String> {
        self.answers
            .get(field)
            .cloned()
            .ok_or_else(|| Error::Prompt(format!("no value available for '{}'", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_static_credentials() {
        let source = StaticCredentials::new().with("dbname", "site");
        assert_eq!(acquire(&source, "dbname", "Database name").unwrap(), "site");
        assert!(acquire(&source, "dbuser", "Database user").is_err());
    }

    #[test]
    fn test_acquire_retries_until_non_empty() {
        struct FlakySource(AtomicUsize);
        impl CredentialSource for FlakySource {
            fn ask(&self, _field: &str, _prompt: &str) -> Result<String> {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                Ok(if n < 2 { "  ".to_string() } else { "admin".to_string() })
            }
        }

        let source = FlakySource(AtomicUsize::new(0));
        assert_eq!(acquire(&source, "dbuser", "Database user").unwrap(), "admin");
        assert_eq!(source.0.load(Ordering::SeqCst), 3);
    }
}
