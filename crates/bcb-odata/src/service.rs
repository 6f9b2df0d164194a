//! Service discovery.

use bcb_core::{BcbError, ODATA_HEADERS, Result, Transport};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::metadata::Metadata;
use crate::model::QueryTarget;
use crate::query::Query;

/// One entry of the service root's `value` list.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Endpoint name.
    pub name: String,
    /// `EntitySet` or `FunctionImport`.
    #[serde(default)]
    pub kind: String,
    /// Relative URL.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ServiceDocument {
    #[serde(rename = "@odata.context")]
    context: String,
    #[serde(default)]
    value: Vec<EndpointDescriptor>,
}

/// A connected OData service with its parsed schema.
#[derive(Debug, Clone)]
pub struct Service {
    url: String,
    context_url: String,
    endpoints: Vec<EndpointDescriptor>,
    metadata: Arc<Metadata>,
    transport: Arc<dyn Transport>,
}

impl Service {
    /// Reads the service root document, then the `$metadata` it points to.
    #[instrument(skip(transport))]
    pub async fn connect(url: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let body = transport.get_text(url, ODATA_HEADERS).await?;
        let document: ServiceDocument = serde_json::from_str(&body)
            .map_err(|e| BcbError::Parse(format!("invalid service document: {e}")))?;
        debug!(
            endpoints = document.value.len(),
            context = %document.context,
            "Read service document"
        );

        let metadata = Metadata::fetch(&document.context, transport.as_ref()).await?;

        Ok(Self {
            url: url.to_string(),
            context_url: document.context,
            endpoints: document.value,
            metadata: Arc::new(metadata),
            transport,
        })
    }

    /// Service root URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `$metadata` URL advertised by the service root.
    #[must_use]
    pub fn context_url(&self) -> &str {
        &self.context_url
    }

    /// Endpoints listed by the service root.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Parsed schema.
    #[must_use]
    pub const fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Transport used for every request of this service.
    #[must_use]
    pub const fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Resolves an endpoint name. Entity sets win over function imports.
    pub fn lookup(&self, name: &str) -> Result<QueryTarget> {
        if let Some(es) = self.metadata.entity_set(name) {
            return Ok(QueryTarget::EntitySet(Arc::clone(es)));
        }
        if let Some(fi) = self.metadata.function_import(name) {
            return Ok(QueryTarget::FunctionImport(Arc::clone(fi)));
        }
        Err(BcbError::NotFound(format!("Invalid name: {name}")))
    }

    /// Lists the primary entity sets and the function imports.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::from("EntitySets:\n");
        for es in self.metadata.primary_entity_sets() {
            let _ = writeln!(out, "  {}", es.name());
        }
        out.push_str("FunctionImports:");
        for fi in self.metadata.function_imports() {
            let _ = write!(out, "\n  {}", fi.name());
        }
        out
    }

    /// Starts a query against `target`.
    #[must_use]
    pub fn query(&self, target: QueryTarget) -> Query {
        Query::new(target, self.url.clone(), Arc::clone(&self.transport))
    }
}
