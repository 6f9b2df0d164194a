#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bcb/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core error and transport types for the BCB open-data clients.
//!
//! - [`BcbError`](error::BcbError) - The error family shared by every crate
//! - [`Transport`](transport::Transport) - HTTP GET seam used by the OData layer

/// Error types for data operations.
pub mod error;
/// HTTP transport abstraction.
pub mod transport;

// Re-export commonly used items at crate root
pub use error::{BcbError, Result};
pub use transport::{Headers, ODATA_HEADERS, Transport};
