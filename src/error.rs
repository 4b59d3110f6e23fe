//! # Error Handling
//!
//! Centralized error handling for `pkgset`, built on `thiserror`. The
//! `Error` enum covers every anticipated failure mode of a resolution
//! pass, from configuration parsing through source-transport failures to
//! dependency cycles, and each variant carries enough context to produce
//! an actionable message.
//!
//! Conflict conditions that the resolver treats as non-fatal (identity
//! conflicts, name conflicts) are *not* errors: they are reported through
//! the [`Reporter`](crate::report::Reporter) and resolution continues.
//!
//! Two variants have special propagation rules:
//!
//! - **`Cancelled`** always propagates immediately, bypassing the
//!   keep-going policy.
//! - **`ImportFailed`** is the aggregate raised at the end of a keep-going
//!   pass when one or more per-set failures were recorded.

use thiserror::Error;

/// Main error type for pkgset operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing a `pkgset.yaml` description file.
    ///
    /// Includes the specific parsing issue and optionally a hint about how
    /// to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while cloning a Git repository.
    ///
    /// Includes the repository URL, rev (branch/tag), error message, and an
    /// optional hint for resolution.
    #[error("Git clone error for {url}@{rev}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        rev: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// The source transport could not fetch or update a package set.
    /// `descriptor` is the rendered source descriptor, not an error
    /// source.
    #[error("Transport error for {descriptor}: {message}")]
    Transport { descriptor: String, message: String },

    /// A circular dependency was detected between package sets.
    ///
    /// `cycles` holds one rendered trace per cycle; every consecutive pair
    /// in a trace states whether the edge came from a declared import or
    /// from root-configuration ordering.
    #[error("Cycle detected in package set dependencies:\n{}", cycles.join("\n"))]
    ConfigurationCycle { cycles: Vec<String> },

    /// Aggregate of per-set failures recorded under the keep-going policy.
    #[error("{} import(s) failed:\n{}", failures.len(), failures.join("\n"))]
    ImportFailed { failures: Vec<String> },

    /// The resolution pass was cancelled by the caller.
    ///
    /// Never swallowed by keep-going; always propagates.
    #[error("Operation cancelled")]
    Cancelled,

    /// An internal invariant was violated. Not a user error.
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Whether this error is the cancellation signal.
    ///
    /// The traversal loop uses this to let cancellation escape the
    /// keep-going policy.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "Invalid YAML".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("Invalid YAML"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "Missing name field".to_string(),
            hint: Some("Add 'name:' to pkgset.yaml".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Missing name field"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Add 'name:'"));
    }

    #[test]
    fn test_error_display_git_clone() {
        let error = Error::GitClone {
            url: "https://github.com/test/sets.git".to_string(),
            rev: "main".to_string(),
            message: "Authentication failed".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Git clone error"));
        assert!(display.contains("https://github.com/test/sets.git"));
        assert!(display.contains("main"));
        assert!(display.contains("Authentication failed"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "fetch".to_string(),
            url: "https://github.com/test/sets.git".to_string(),
            stderr: "Permission denied".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("fetch"));
        assert!(display.contains("Permission denied"));
    }

    #[test]
    fn test_error_display_transport() {
        let error = Error::Transport {
            descriptor: "https://example.com/sets.git@main".to_string(),
            message: "network unreachable".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Transport error"));
        assert!(display.contains("https://example.com/sets.git@main"));
        assert!(display.contains("network unreachable"));
    }

    #[test]
    fn test_error_display_configuration_cycle() {
        let error = Error::ConfigurationCycle {
            cycles: vec!["set-a -(declared)-> set-b -(declared)-> set-a".to_string()],
        };
        let display = format!("{}", error);
        assert!(display.contains("Cycle detected"));
        assert!(display.contains("set-a -(declared)-> set-b"));
    }

    #[test]
    fn test_error_display_import_failed() {
        let error = Error::ImportFailed {
            failures: vec![
                "git:example.com/a#main: network unreachable".to_string(),
                "git:example.com/b#main: network unreachable".to_string(),
            ],
        };
        let display = format!("{}", error);
        assert!(display.contains("2 import(s) failed"));
        assert!(display.contains("example.com/a"));
        assert!(display.contains("example.com/b"));
    }

    #[test]
    fn test_error_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Internal {
            message: "root not last".to_string()
        }
        .is_cancelled());
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_str = "invalid: [unclosed";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: Error = yaml_error.into();
        let display = format!("{}", error);
        assert!(display.contains("YAML parsing error"));
    }
}
