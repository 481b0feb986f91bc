//! Error types for pagex_core

use thiserror::Error;

/// Errors raised by routing and page-scope wiring
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// A page capability was requested outside of a mounted page
    #[error("page progress can only be used within a mounted page")]
    OutsidePage,

    /// A route pattern could not be parsed
    #[error("invalid route pattern `{0}`")]
    InvalidRoutePattern(String),
}

/// Result type for pagex_core operations
pub type Result<T> = std::result::Result<T, TransitionError>;
