// Error types and user-friendly error messages
//
// Library code returns typed errors (ValidationError, StoreError).
// The CLI turns them into actionable messages with the helpers below.
//
// Localization Support:
// The error messages support localization via the LANG environment variable.
// Currently supported: English (en_US), with framework for future languages.

use std::fmt;
use thiserror::Error;

use crate::runs::RunId;

/// A stored field violates its declared constraint.
///
/// Raised synchronously by every create/update before anything is written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("optimizer '{0}' should be either adam or sgd")]
    InvalidOptimizer(String),

    #[error("learning rate {0} must be between 1e-20 and 1")]
    LearningRateOutOfRange(f64),

    #[error("{field} must be a positive integer, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} must fit in {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} is {len} characters long (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} '{value}' cannot be used as a file name")]
    InvalidPathComponent { field: &'static str, value: String },

    #[error("process id must be non-zero")]
    InvalidPid,
}

impl ValidationError {
    /// Name of the field that failed, for form-style error reporting
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidOptimizer(_) => "optimizer",
            ValidationError::LearningRateOutOfRange(_) => "learning_rate",
            ValidationError::Negative { field, .. }
            | ValidationError::TooLarge { field, .. }
            | ValidationError::TooLong { field, .. } => *field,
            ValidationError::EmptyField(field)
            | ValidationError::InvalidPathComponent { field, .. } => *field,
            ValidationError::InvalidPid => "pid",
        }
    }
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("training run {0} not found")]
    RunNotFound(RunId),

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    #[error("training run {id} was already launched (pid {pid})")]
    AlreadyLaunched { id: RunId, pid: u32 },

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

/// Get the current locale from environment
fn get_locale() -> &'static str {
    if let Ok(lang) = std::env::var("LANG") {
        if lang.starts_with("es") {
            return "es";
        } else if lang.starts_with("fr") {
            return "fr";
        } else if lang.starts_with("de") {
            return "de";
        }
    }
    "en"
}

/// Localized text helper
fn t(key: &str) -> String {
    let locale = get_locale();

    let text = match (locale, key) {
        ("en", "try") => "Try:",
        ("en", "suggestion") => "Suggestion:",
        ("en", "possible_causes") => "Possible causes:",

        ("es", "try") => "Intenta:",
        ("es", "suggestion") => "Sugerencia:",
        ("es", "possible_causes") => "Posibles causas:",

        ("fr", "try") => "Essayez:",
        ("fr", "suggestion") => "Suggestion:",
        ("fr", "possible_causes") => "Causes possibles:",

        ("de", "try") => "Versuchen Sie:",
        ("de", "suggestion") => "Vorschlag:",
        ("de", "possible_causes") => "Mögliche Ursachen:",

        _ => match key {
            "try" => "Try:",
            "suggestion" => "Suggestion:",
            "possible_causes" => "Possible causes:",
            _ => key,
        },
    };

    text.to_string()
}

/// Format a validation failure with the accepted values for the field
pub fn validation_failed_error(error: &ValidationError) -> String {
    let hint = match error {
        ValidationError::InvalidOptimizer(_) => "Use --optimizer adam or --optimizer sgd",
        ValidationError::LearningRateOutOfRange(_) => {
            "Pick a learning rate between 1e-20 and 1 (e.g. 0.001)"
        }
        ValidationError::Negative { .. } | ValidationError::TooLarge { .. } => {
            "Hyperparameter counts must be whole numbers >= 0"
        }
        ValidationError::EmptyField(_) | ValidationError::TooLong { .. } => {
            "Shorten or fill in the field and submit again"
        }
        ValidationError::InvalidPathComponent { .. } => {
            "Titles and usernames name log paths: avoid '/', '\\', '.' and '..'"
        }
        ValidationError::InvalidPid => "Pass the real process id with --pid",
    };

    format!(
        "Training run was not saved: {}\n\n\
        \x1b[1;33m{}\x1b[0m {}",
        error,
        t("suggestion"),
        hint
    )
}

/// Format a missing training run error with helpful suggestions
pub fn run_not_found_error(id: RunId) -> String {
    format!(
        "Training run {} not found\n\n\
        \x1b[1;33m{}\x1b[0m\n\
        • Run was deleted\n\
        • Owner was removed (runs are deleted with their owner)\n\
        • Wrong database selected\n\n\
        \x1b[1;32m{}\x1b[0m\n\
        1. List existing runs:\n\
           \x1b[36mtrainboard run list\x1b[0m\n\n\
        2. Check which database is in use:\n\
           \x1b[36mtrainboard --database <path> run list\x1b[0m",
        id,
        t("possible_causes"),
        t("try")
    )
}

/// Format a missing user error with helpful suggestions
pub fn user_not_found_error(username: &str) -> String {
    format!(
        "User '{}' not found\n\n\
        \x1b[1;32m{}\x1b[0m\n\
        1. Create the user first:\n\
           \x1b[36mtrainboard user add {}\x1b[0m",
        username,
        t("try"),
        username
    )
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(error: &str) -> String {
    format!(
        "Failed to parse config file\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32m{}\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat ~/.trainboard/config.toml\x1b[0m\n\n\
        2. Common mistakes:\n\
           • Missing quotes around paths\n\
           • Unknown keys (allowed: base_dir, database_path, route_prefix)",
        error,
        t("try")
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33m{}\x1b[0m {}",
        error,
        t("suggestion"),
        suggestion
    )
}

/// Render any store error for the terminal
pub fn describe_store_error(error: &StoreError) -> String {
    match error {
        StoreError::Validation(e) => validation_failed_error(e),
        StoreError::RunNotFound(id) => run_not_found_error(*id),
        StoreError::UserNotFound(name) => user_not_found_error(name),
        StoreError::AlreadyLaunched { .. } => wrap_error_with_suggestion(
            error,
            "A run is launched only once. Create a new run to train again.",
        ),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_error_message() {
        let err = ValidationError::InvalidOptimizer("rmsprop".to_string());
        assert_eq!(
            err.to_string(),
            "optimizer 'rmsprop' should be either adam or sgd"
        );
        assert_eq!(err.field(), "optimizer");
    }

    #[test]
    fn test_validation_message_has_hint() {
        let msg = validation_failed_error(&ValidationError::InvalidOptimizer("x".into()));
        assert!(msg.contains("--optimizer adam"));
    }

    #[test]
    fn test_run_not_found_suggests_list() {
        let msg = run_not_found_error(RunId(42));
        assert!(msg.contains("42"));
        assert!(msg.contains("trainboard run list"));
    }

    #[test]
    fn test_store_error_wraps_validation() {
        let err: StoreError = ValidationError::LearningRateOutOfRange(2.0).into();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(describe_store_error(&err).contains("between 1e-20 and 1"));
    }
}
