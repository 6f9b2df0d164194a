//! HTTP transport abstraction.
//!
//! The OData layer never talks to an HTTP client directly. Every request goes
//! through a [`Transport`], which keeps the query code independent of the
//! client library and lets tests substitute a recording fake.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;

/// Header pairs attached to a single request.
pub type Headers<'a> = &'a [(&'a str, &'a str)];

/// Headers sent with every OData query.
pub const ODATA_HEADERS: &[(&str, &str)] = &[("OData-Version", "4.0"), ("OData-MaxVersion", "4.0")];

/// An asynchronous HTTP GET primitive.
///
/// Implementations must map non-success responses to
/// [`BcbError::Http`](crate::BcbError::Http) and connection failures to
/// [`BcbError::Network`](crate::BcbError::Network). They must not retry.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Performs a GET on a fully built URL and returns the body as text.
    async fn get_text(&self, url: &str, headers: Headers<'_>) -> Result<String>;
}
