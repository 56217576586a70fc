//! Error types for the constraint engine

use thiserror::Error;

/// Constraint engine errors
///
/// A denied constraint is not an error; denial routes to the on-fail
/// continuation. These variants cover the failure modes the engine
/// surfaces to its caller without retrying or recovering locally.
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// A dynamic/custom constraint was declared but no handler is registered
    #[error("No dynamic resource handler registered for constraint '{0}'")]
    MissingDynamicHandler(String),

    /// A named composite constraint was requested but never registered
    #[error("Unknown composite constraint: {0}")]
    UnknownConstraint(String),

    /// An invalid permission pattern string
    #[error("Invalid permission pattern '{pattern}': {source}")]
    PatternCompile {
        /// The offending pattern string
        pattern: String,
        /// The underlying compile error
        #[source]
        source: regex::Error,
    },

    /// The upstream subject lookup failed
    #[error("Subject lookup failed: {0}")]
    SubjectLookup(String),

    /// A role-permission or dynamic-handler lookup failed
    #[error("Upstream lookup failed: {0}")]
    Upstream(String),
}

/// Result type for constraint evaluation
pub type Result<T> = std::result::Result<T, ConstraintError>;
