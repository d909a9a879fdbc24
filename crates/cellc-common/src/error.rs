//! Unified error types for the cellc workspace.
//!
//! Validation failures abort a whole compilation; external tool failures
//! abort the enclosing operation. Neither is retried.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CellError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Two components of the same image share a name.
    #[error("two components with same name exist: \"{name}\"")]
    DuplicateComponent {
        /// The duplicated component name.
        name: String,
    },

    /// Two ingresses of one component declare different container ports.
    #[error(
        "invalid container port {declared} in component \"{component}\": \
         already bound to {existing}, multiple container ports are not supported"
    )]
    ConflictingPorts {
        /// Component carrying the ingresses.
        component: String,
        /// Port recorded by an earlier ingress.
        existing: u16,
        /// Port declared by the offending ingress.
        declared: u16,
    },

    /// A dependency shorthand did not match `org/name:version`.
    #[error("expects <organization>/<cell-image>:<version> as the dependency, received {value}")]
    InvalidDependency {
        /// The rejected dependency text.
        value: String,
    },

    /// A locally built image tag carries a repository part.
    #[error(
        "invalid docker tag: {tag}. Repository name is not supported when building from Dockerfile"
    )]
    InvalidImageTag {
        /// The rejected tag.
        tag: String,
    },

    /// Any other semantic validation failure.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the violated rule.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An external tool (image builder, kubectl) failed.
    #[error("command `{command}` failed with exit code {code}: {message}")]
    ExternalTool {
        /// Command line that was executed.
        command: String,
        /// Exit code, or -1 when the process was killed by a signal.
        code: i32,
        /// Captured error output or a description of the failure.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl CellError {
    /// Shorthand for [`CellError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns true for errors in the validation class, which are raised
    /// before any artifact exists.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateComponent { .. }
                | Self::ConflictingPorts { .. }
                | Self::InvalidDependency { .. }
                | Self::InvalidImageTag { .. }
                | Self::Validation { .. }
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_ports_message_names_both_ports() {
        let err = CellError::ConflictingPorts {
            component: "api".into(),
            existing: 8080,
            declared: 9090,
        };
        let msg = err.to_string();
        assert!(msg.contains("8080"), "got: {msg}");
        assert!(msg.contains("9090"), "got: {msg}");
        assert!(err.is_validation());
    }

    #[test]
    fn invalid_dependency_names_expected_format() {
        let err = CellError::InvalidDependency {
            value: "myorg-products-1.0.0".into(),
        };
        assert!(
            err.to_string()
                .contains("<organization>/<cell-image>:<version>")
        );
    }

    #[test]
    fn external_tool_is_not_validation() {
        let err = CellError::ExternalTool {
            command: "docker build".into(),
            code: 1,
            message: "boom".into(),
        };
        assert!(!err.is_validation());
        assert!(err.to_string().contains("exit code 1"));
    }
}
