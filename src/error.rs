//! Error types for simulation runs.
//!
//! Every fallible operation in the crate returns [`SimulationError`]. Errors carry
//! enough context to be shown to a user directly, and classify themselves as
//! retryable or not so a UI can decide whether to offer "run again".
//!
//! ## Error Categories
//!
//! - **Precondition Errors**: the submitted tree is empty, or a run is already active
//! - **Connection Errors**: the websocket could not be opened or dropped mid-run
//! - **Protocol Errors**: the simulator rejected the submission
//! - **Parse Errors**: a payload could not be encoded or decoded
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use websim::SimulationError;
//!
//! let error = SimulationError::connection_failed("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for simulation operations.
pub type Result<T, E = SimulationError> = std::result::Result<T, E>;

/// Main error type for simulation operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SimulationError {
    #[error("Tree must contain at least one node")]
    EmptyTree,

    #[error("A simulation session is already active")]
    SessionActive,

    #[error("Simulator connection failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Simulator rejected the request (code {code}): {details}")]
    Rejected { code: u16, details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session task failed: {reason}")]
    Task { reason: String },
}

impl SimulationError {
    /// Returns whether re-submitting the same tree may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SimulationError::Connection { .. } => true,
            SimulationError::Timeout { .. } => true,
            SimulationError::SessionActive => true,
            SimulationError::Task { .. } => true,
            SimulationError::EmptyTree => false,
            SimulationError::Rejected { .. } => false,
            SimulationError::Parse { .. } => false,
            SimulationError::Config { .. } => false,
            SimulationError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SimulationError::EmptyTree => {
                vec!["Add at least one node to the tree", "Connect the nodes to the root"]
            }
            SimulationError::SessionActive => vec![
                "Wait for the running simulation to finish",
                "Cancel the running simulation before submitting again",
            ],
            SimulationError::Connection { .. } => vec![
                "Check that the simulator server is running",
                "Verify the configured host and port",
                "Submit the tree again",
            ],
            SimulationError::Rejected { .. } => vec![
                "Check that the tree was exported by a compatible editor",
                "Verify the assignment identifier",
            ],
            SimulationError::Timeout { .. } => vec![
                "Increase the connect timeout",
                "Check network connectivity to the simulator",
            ],
            SimulationError::Parse { .. } => vec![
                "Check that the tree document is valid JSON",
                "Verify client and server protocol versions match",
            ],
            SimulationError::Config { .. } => vec![
                "Check configuration values against the documented defaults",
                "Remove unknown keys from the configuration file",
            ],
            SimulationError::File { .. } => {
                vec!["Check the file exists and is readable", "Check file permissions"]
            }
            SimulationError::Task { .. } => {
                vec!["Submit the tree again", "Check the logs for a panic in the session task"]
            }
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        SimulationError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        SimulationError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        SimulationError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        SimulationError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        SimulationError::File { path, source }
    }
}

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        SimulationError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(err: serde_json::Error) -> Self {
        SimulationError::Parse { context: "JSON".to_string(), details: err.to_string() }
    }
}

impl From<tokio::task::JoinError> for SimulationError {
    fn from(err: tokio::task::JoinError) -> Self {
        SimulationError::Task { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                reason in ".*",
                code in 1000u16..5000u16,
                details in ".*",
                duration_ms in 1u64..60000u64
            ) {
                let connection = SimulationError::connection_failed(reason.clone());
                prop_assert!(connection.to_string().contains(&reason));

                let rejected = SimulationError::Rejected { code, details: details.clone() };
                let rejected_msg = rejected.to_string();
                prop_assert!(rejected_msg.contains(&code.to_string()));
                prop_assert!(rejected_msg.contains(&details));

                let timeout = SimulationError::Timeout { duration: Duration::from_millis(duration_ms) };
                prop_assert!(!timeout.to_string().is_empty());
            }

            #[test]
            fn connection_source_chain_is_preserved(base_message in ".*") {
                let source: Box<dyn std::error::Error + Send + Sync> =
                    Box::new(std::io::Error::other(base_message.clone()));
                let error = SimulationError::connection_failed_with_source("websocket", source);

                let inner = std::error::Error::source(&error);
                prop_assert!(inner.is_some());
                prop_assert_eq!(inner.map(|e| e.to_string()), Some(base_message));
            }
        }
    }

    #[test]
    fn empty_tree_message_matches_notification_text() {
        assert_eq!(SimulationError::EmptyTree.to_string(), "Tree must contain at least one node");
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<SimulationError>();

        let error = SimulationError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let connection_error = SimulationError::connection_failed("test");
        let rejected = SimulationError::Rejected { code: 3000, details: "bad tree".into() };

        assert!(connection_error.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(!SimulationError::EmptyTree.is_retryable());

        for error in [connection_error, rejected, SimulationError::EmptyTree] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yaml");
        match SimulationError::from(io_err) {
            SimulationError::File { source, .. } => assert_eq!(source.to_string(), "config.yaml"),
            other => panic!("Expected File error variant, got {other:?}"),
        }

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(SimulationError::from(json_err), SimulationError::Parse { .. }));
    }
}
