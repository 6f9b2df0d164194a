#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bcb/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Generic OData v4 client.
//!
//! - [`Service`] - Root document and `$metadata` discovery
//! - [`Metadata`] - Parsed schema with entity sets and function imports
//! - [`Query`] - Fluent request builder and executor
//! - [`Endpoint`] - Single-shot requests returning DataFrames
//!
//! # Example
//!
//! ```rust,ignore
//! use bcb_odata::{Endpoint, FrameOptions, GetOptions, HttpTransport, Service};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HttpTransport::new()?);
//! let service = Service::connect(
//!     "https://olinda.bcb.gov.br/olinda/servico/Expectativas/versao/v1/odata/",
//!     transport.clone(),
//! )
//! .await?;
//!
//! let target = service.lookup("ExpectativasMercadoAnuais")?;
//! let endpoint = Endpoint::new(target, service.url(), transport, FrameOptions::default());
//! let indicador = endpoint.property("Indicador")?;
//! let df = endpoint
//!     .get([indicador.equals("IPCA")], GetOptions::new().limit(10))
//!     .await?;
//! ```

/// Edm primitive types and caller literals.
pub mod edm;
/// Endpoint facade returning DataFrames.
pub mod endpoint;
/// JSON envelope to DataFrame conversion.
pub mod frame;
/// reqwest-backed transport.
pub mod http;
/// `$metadata` parsing.
pub mod metadata;
/// Schema model: entities, properties, functions.
pub mod model;
/// Query builder and executor.
pub mod query;
/// Service discovery.
pub mod service;

#[cfg(test)]
mod testing;

pub use edm::{EdmType, FriendlyType, Literal};
pub use endpoint::{Endpoint, GetOptions, QueryArg};
pub use frame::{DEFAULT_DATE_COLUMNS, DateColumns, FrameOptions, frame_from_envelope};
pub use http::HttpTransport;
pub use metadata::Metadata;
pub use model::{
    Direction, Entity, EntitySet, Filter, Function, FunctionImport, Operator, OrderBy, Parameter,
    Property, QueryTarget,
};
pub use query::Query;
pub use service::{EndpointDescriptor, Service};
