//! Core types for CPM
//!
//! - [`CpmError`] - Enumerated error types covering all CPM failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format

pub mod error;

pub use error::{
    CpmError, ErrorContext, MissingVariable, WronglyTypedVariable, create_error_context,
    user_friendly_error,
};
