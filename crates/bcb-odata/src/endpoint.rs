//! Endpoint facade.
//!
//! An [`Endpoint`] exposes the properties of one entity set or function
//! import and runs single-shot requests through [`Endpoint::get`]. Each call
//! builds its own [`Query`], so nothing carries over between calls.

use bcb_core::{BcbError, Result, Transport};
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::info;

use crate::edm::Literal;
use crate::frame::FrameOptions;
use crate::model::{Filter, OrderBy, Property, QueryTarget};
use crate::query::Query;

/// `$format` requested by [`Endpoint::get`].
pub const JSON_FORMAT: &str = "application/json";

/// One positional argument of [`Endpoint::get`].
#[derive(Clone, Debug)]
pub enum QueryArg {
    /// Added to `$filter`.
    Filter(Filter),
    /// Added to `$orderby`.
    OrderBy(OrderBy),
    /// Added to `$select`.
    Select(Property),
}

impl From<Filter> for QueryArg {
    fn from(filter: Filter) -> Self {
        Self::Filter(filter)
    }
}

impl From<OrderBy> for QueryArg {
    fn from(orderby: OrderBy) -> Self {
        Self::OrderBy(orderby)
    }
}

impl From<Property> for QueryArg {
    fn from(property: Property) -> Self {
        Self::Select(property)
    }
}

impl From<&Property> for QueryArg {
    fn from(property: &Property) -> Self {
        Self::Select(property.clone())
    }
}

/// Paging, output and function parameter options of [`Endpoint::get`].
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    limit: Option<usize>,
    skip: Option<usize>,
    verbose: bool,
    raw: bool,
    parameters: Vec<(String, Literal)>,
}

impl GetOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `$top`.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets `$skip`.
    #[must_use]
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Logs the request rendering before executing it.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Skips date coercion.
    #[must_use]
    pub const fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Binds a function import parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }
}

/// A queryable endpoint of a connected service.
#[derive(Clone, Debug)]
pub struct Endpoint {
    target: QueryTarget,
    base_url: String,
    transport: Arc<dyn Transport>,
    options: FrameOptions,
}

impl Endpoint {
    /// Wraps a resolved target.
    pub fn new(
        target: QueryTarget,
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        options: FrameOptions,
    ) -> Self {
        Self {
            target,
            base_url: base_url.into(),
            transport,
            options,
        }
    }

    /// Endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.target.name()
    }

    /// Underlying entity set or function import.
    #[must_use]
    pub const fn target(&self) -> &QueryTarget {
        &self.target
    }

    /// Properties of the returned entity, in schema order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.target.entity().properties()
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Result<&Property> {
        self.target.entity().property(name).ok_or_else(|| {
            BcbError::NotFound(format!("{} has no property {name}", self.name()))
        })
    }

    /// Returns true when the entity declares `name`.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.target.entity().property(name).is_some()
    }

    /// Starts an empty query carrying this endpoint's frame options.
    #[must_use]
    pub fn query(&self) -> Query {
        Query::new(
            self.target.clone(),
            self.base_url.clone(),
            Arc::clone(&self.transport),
        )
        .with_frame_options(self.options.clone())
    }

    fn prepare<I>(&self, args: I, options: GetOptions) -> Result<Query>
    where
        I: IntoIterator,
        I::Item: Into<QueryArg>,
    {
        let mut query = self.query();
        for arg in args {
            let arg: QueryArg = arg.into();
            match arg {
                QueryArg::Filter(f) => query.filter([f]),
                QueryArg::OrderBy(o) => query.orderby([o]),
                QueryArg::Select(p) => query.select([p]),
            };
        }
        query.parameters(options.parameters)?;
        if let Some(limit) = options.limit {
            query.limit(limit);
        }
        if let Some(skip) = options.skip {
            query.skip(skip);
        }
        query.raw(options.raw).format(JSON_FORMAT);

        if options.verbose {
            info!("{}", query.show());
        }
        Ok(query)
    }

    /// Runs one request and returns the rows as a DataFrame.
    pub async fn get<I>(&self, args: I, options: GetOptions) -> Result<DataFrame>
    where
        I: IntoIterator,
        I::Item: Into<QueryArg>,
    {
        self.prepare(args, options)?.collect_frame().await
    }

    /// Runs one request and returns the response body unparsed.
    pub async fn get_text<I>(&self, args: I, options: GetOptions) -> Result<String>
    where
        I: IntoIterator,
        I::Item: Into<QueryArg>,
    {
        self.prepare(args, options)?.text().await
    }

    /// Signature of the endpoint.
    #[must_use]
    pub fn describe(&self) -> String {
        self.target.describe()
    }
}
