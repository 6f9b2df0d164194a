#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bcb/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Banco Central do Brasil open-data clients.
//!
//! This crate re-exports the core error and transport types and the generic
//! OData client, and provides [`Api`], a catalog of the OData services
//! published on the Olinda platform.
//!
//! # Example
//!
//! ```rust,ignore
//! use bcb::{Api, GetOptions};
//!
//! #[tokio::main]
//! async fn main() -> bcb::Result<()> {
//!     let ptax = Api::PTAX.connect().await?;
//!     println!("{}", ptax.describe(None)?);
//!
//!     let cotacao = ptax.endpoint("CotacaoDolarPeriodo")?;
//!     let df = cotacao
//!         .get(
//!             Vec::<bcb::QueryArg>::new(),
//!             GetOptions::new()
//!                 .param("dataInicial", "01-01-2024")
//!                 .param("dataFinalCotacao", "01-31-2024"),
//!         )
//!         .await?;
//!     println!("{df:?}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use bcb_core::*;

// Generic OData client
pub use bcb_odata::*;

pub use polars::prelude::DataFrame;

mod api;
pub use api::{Api, ODataApi, OLINDA_BASE_URL};
