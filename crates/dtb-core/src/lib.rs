//! # dtb-core - Core Domain Types
//!
//! Foundation crate for devtools-bridge. Provides the error taxonomy, logging
//! setup, and the domain types exchanged between the CLI and running apps.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`AppDescriptor`] - One inspectable app instance reported by the dev server
//! - [`MessageKey`] - Plugin name + method addressing an RPC endpoint
//! - [`ResultMap`] - Per-app broadcast results keyed by app id
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`SendMessageError`] - Failures of a single broadcast call
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use dtb_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all devtools-bridge crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt, SendMessageError};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt, SendMessageError};
pub use types::{
    AppDescriptor, Capabilities, MessageKey, ReactNativeInfo, ResultMap, RESPONSE_SUFFIX,
    TIMEOUT_PLACEHOLDER,
};
