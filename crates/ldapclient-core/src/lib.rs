//! # ldapclient-core
//!
//! Core types shared by the `ldapclient` directory wrapper.
//!
//! ## Modules
//!
//! - [`error`] - Error type, error categories and stable error codes
//! - [`credentials`] - Bind identity used to authenticate against the directory

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credentials;
pub mod error;

// Re-export commonly used types
pub use credentials::BindCredentials;
pub use error::{Error, ErrorCategory, Result};
