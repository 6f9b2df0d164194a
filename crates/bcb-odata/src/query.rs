//! Query building and execution.
//!
//! A [`Query`] is bound to one [`QueryTarget`] and accumulates filters, sort
//! keys, selected columns, paging options and, for function imports, bound
//! parameter values. Mutators return `&mut Self` so calls chain on the same
//! instance; [`Query::reset`] makes it reusable for another request.

use bcb_core::{BcbError, ODATA_HEADERS, Result, Transport};
use indexmap::IndexMap;
use polars::prelude::DataFrame;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::edm::Literal;
use crate::frame::{FrameOptions, frame_from_envelope};
use crate::model::{Filter, OrderBy, Property, QueryTarget};

/// Default `$format` value.
pub const DEFAULT_FORMAT: &str = "json";

/// A composable OData request.
#[derive(Debug)]
pub struct Query {
    target: QueryTarget,
    base_url: String,
    transport: Arc<dyn Transport>,
    filters: Vec<Filter>,
    orderbys: Vec<OrderBy>,
    select: Vec<Property>,
    /// `$top`, `$skip` and `$format` overrides, layered over the defaults.
    options: IndexMap<String, String>,
    function_parameters: IndexMap<String, Option<Literal>>,
    frame_options: FrameOptions,
    raw: bool,
}

impl Query {
    /// Creates an empty query for `target` under the service `base_url`.
    pub fn new(target: QueryTarget, base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let function_parameters = target
            .function()
            .map(|f| {
                f.parameters()
                    .iter()
                    .map(|p| (p.name().to_string(), None))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            target,
            base_url: base_url.into(),
            transport,
            filters: Vec::new(),
            orderbys: Vec::new(),
            select: Vec::new(),
            options: IndexMap::new(),
            function_parameters,
            frame_options: FrameOptions::default(),
            raw: false,
        }
    }

    /// Replaces the options used by [`Query::collect_frame`].
    #[must_use]
    pub fn with_frame_options(mut self, frame_options: FrameOptions) -> Self {
        self.frame_options = frame_options;
        self
    }

    /// Bound endpoint.
    #[must_use]
    pub const fn target(&self) -> &QueryTarget {
        &self.target
    }

    /// Accumulated filters.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Accumulated sort keys.
    #[must_use]
    pub fn orderbys(&self) -> &[OrderBy] {
        &self.orderbys
    }

    /// Selected properties.
    #[must_use]
    pub fn selected(&self) -> &[Property] {
        &self.select
    }

    /// Explicitly set option (`$top`, `$skip`, `$format`).
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Bound value of a function parameter.
    #[must_use]
    pub fn parameter_value(&self, name: &str) -> Option<&Literal> {
        self.function_parameters.get(name).and_then(Option::as_ref)
    }

    /// Adds filters, combined with `and`.
    pub fn filter(&mut self, filters: impl IntoIterator<Item = Filter>) -> &mut Self {
        self.filters.extend(filters);
        self
    }

    /// Adds sort keys.
    pub fn orderby(&mut self, orderbys: impl IntoIterator<Item = OrderBy>) -> &mut Self {
        self.orderbys.extend(orderbys);
        self
    }

    /// Restricts the returned columns.
    pub fn select(&mut self, properties: impl IntoIterator<Item = Property>) -> &mut Self {
        self.select.extend(properties);
        self
    }

    /// Sets `$top`.
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.options.insert("$top".to_string(), limit.to_string());
        self
    }

    /// Sets `$skip`.
    pub fn skip(&mut self, skip: usize) -> &mut Self {
        self.options.insert("$skip".to_string(), skip.to_string());
        self
    }

    /// Sets `$format`.
    pub fn format(&mut self, format: impl Into<String>) -> &mut Self {
        self.options.insert("$format".to_string(), format.into());
        self
    }

    /// Returns columns as delivered, without date coercion.
    pub fn raw(&mut self, raw: bool) -> &mut Self {
        self.raw = raw;
        self
    }

    /// Binds one function parameter.
    pub fn parameter(&mut self, name: &str, value: impl Into<Literal>) -> Result<&mut Self> {
        let slot = self
            .function_parameters
            .get_mut(name)
            .ok_or_else(|| BcbError::UnknownParameter(name.to_string()))?;
        *slot = Some(value.into());
        Ok(self)
    }

    /// Binds several function parameters.
    pub fn parameters<I, K, V>(&mut self, parameters: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Literal>,
    {
        for (name, value) in parameters {
            self.parameter(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Clears filters, sort keys, selected columns and options. The target
    /// and bound function parameters are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.filters.clear();
        self.orderbys.clear();
        self.select.clear();
        self.options.clear();
        self
    }

    /// Request path, including the parameter alias clause of function imports.
    #[must_use]
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut url = format!("{base}/{}", self.target.name());
        if let Some(function) = self.target.function() {
            let args = function
                .parameters()
                .iter()
                .map(|p| format!("{0}=@{0}", p.name()))
                .collect::<Vec<_>>()
                .join(",");
            let _ = write!(url, "({args})");
        }
        url
    }

    fn system_pairs(&self) -> IndexMap<String, String> {
        let mut pairs = IndexMap::new();
        pairs.insert("$format".to_string(), DEFAULT_FORMAT.to_string());
        if !self.filters.is_empty() {
            let filter = self
                .filters
                .iter()
                .map(Filter::statement)
                .collect::<Vec<_>>()
                .join(" and ");
            pairs.insert("$filter".to_string(), filter);
        }
        if !self.orderbys.is_empty() {
            let orderby = self
                .orderbys
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            pairs.insert("$orderby".to_string(), orderby);
        }
        if !self.select.is_empty() {
            let select = self
                .select
                .iter()
                .map(Property::name)
                .collect::<Vec<_>>()
                .join(",");
            pairs.insert("$select".to_string(), select);
        }
        for (key, value) in &self.options {
            pairs.insert(key.clone(), value.clone());
        }
        pairs
    }

    /// Query string pairs in request order, function parameters last.
    ///
    /// Fails with [`BcbError::MissingParameter`] when a required function
    /// parameter has no value.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>> {
        let mut pairs = self.system_pairs();
        if let Some(function) = self.target.function() {
            for param in function.parameters() {
                let rendered = match self.parameter_value(param.name()) {
                    Some(value) => param.format(value),
                    None if param.is_required() => {
                        return Err(BcbError::MissingParameter(param.name().to_string()));
                    }
                    None => "null".to_string(),
                };
                pairs.insert(format!("@{}", param.name()), rendered);
            }
        }
        Ok(pairs.into_iter().collect())
    }

    /// Full request URL with the percent-encoded query string.
    pub fn request_url(&self) -> Result<String> {
        let query = self
            .query_pairs()?
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        Ok(format!("{}?{query}", self.url()))
    }

    /// Executes the request and returns the body.
    #[instrument(skip(self), fields(endpoint = %self.target.name()))]
    pub async fn text(&mut self) -> Result<String> {
        let url = self.request_url()?;
        debug!(%url, "Executing OData query");
        self.transport.get_text(&url, ODATA_HEADERS).await
    }

    /// Executes the request and decodes the JSON envelope.
    pub async fn collect(&mut self) -> Result<Value> {
        let text = self.text().await?;
        serde_json::from_str(&text).map_err(|e| BcbError::Parse(format!("invalid JSON response: {e}")))
    }

    /// Executes the request and returns the `value` rows as a DataFrame.
    pub async fn collect_frame(&mut self) -> Result<DataFrame> {
        let envelope = self.collect().await?;
        frame_from_envelope(
            &envelope,
            self.target.name(),
            self.target.entity(),
            &self.frame_options,
            self.raw,
        )
    }

    /// Diagnostic rendering of the request. Has no side effects.
    #[must_use]
    pub fn show(&self) -> String {
        let mut out = format!("URL:\n  {}\n", self.url());

        if let Some(function) = self.target.function() {
            if !function.parameters().is_empty() {
                out.push_str("Function Parameters:\n");
                for param in function.parameters() {
                    let required = if param.is_required() { " (required) " } else { " " };
                    let value = self
                        .parameter_value(param.name())
                        .map_or_else(|| "None".to_string(), ToString::to_string);
                    let _ = writeln!(
                        out,
                        "  {}<{}>{required}= {value}",
                        param.name(),
                        param.friendly_type()
                    );
                }
            }
        }

        out.push_str("Query Parameters:\n");
        for (key, value) in self.system_pairs() {
            let _ = writeln!(out, "  {key} = {value}");
        }

        let returns = self
            .target
            .entity()
            .properties()
            .map(Property::signature)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(out, "Return: {returns}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::testing::{
        EXPECTATIVAS_METADATA, PTAX_METADATA, QUERY_RESPONSE, RecordingTransport,
    };
    use polars::prelude::DataType;

    const BASE: &str = "https://olinda.bcb.gov.br/olinda/servico/Expectativas/versao/v1/odata/";

    fn expectativas(transport: Arc<RecordingTransport>) -> Query {
        let metadata = Metadata::parse(EXPECTATIVAS_METADATA).unwrap();
        let set = metadata.entity_set("ExpectativasMercadoAnuais").unwrap();
        Query::new(QueryTarget::EntitySet(Arc::clone(set)), BASE, transport)
    }

    fn cotacao(transport: Arc<RecordingTransport>) -> Query {
        let metadata = Metadata::parse(PTAX_METADATA).unwrap();
        let fi = metadata.function_import("CotacaoDolarPeriodo").unwrap();
        Query::new(
            QueryTarget::FunctionImport(Arc::clone(fi)),
            "https://olinda.bcb.gov.br/olinda/servico/PTAX/versao/v1/odata",
            transport,
        )
    }

    fn prop(query: &Query, name: &str) -> Property {
        query.target().entity().property(name).unwrap().clone()
    }

    #[test]
    fn test_entity_set_url() {
        let query = expectativas(Arc::new(RecordingTransport::default()));
        assert_eq!(
            query.url(),
            "https://olinda.bcb.gov.br/olinda/servico/Expectativas/versao/v1/odata/ExpectativasMercadoAnuais"
        );
    }

    #[test]
    fn test_function_import_url() {
        let query = cotacao(Arc::new(RecordingTransport::default()));
        assert_eq!(
            query.url(),
            "https://olinda.bcb.gov.br/olinda/servico/PTAX/versao/v1/odata/CotacaoDolarPeriodo(dataInicial=@dataInicial,dataFinalCotacao=@dataFinalCotacao,casas=@casas)"
        );
    }

    #[test]
    fn test_pair_order_and_overrides() {
        let mut query = expectativas(Arc::new(RecordingTransport::default()));
        let indicador = prop(&query, "Indicador");
        let mediana = prop(&query, "Mediana");
        query
            .limit(10)
            .filter([indicador.equals("IPCA"), mediana.greater_than(4.0)])
            .orderby([mediana.desc()])
            .select([indicador, mediana])
            .format("application/json");

        let pairs = query.query_pairs().unwrap();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["$format", "$filter", "$orderby", "$select", "$top"]);
        assert_eq!(pairs[0].1, "application/json");
        assert_eq!(pairs[1].1, "Indicador eq 'IPCA' and Mediana gt 4.0");
        assert_eq!(pairs[2].1, "Mediana desc");
        assert_eq!(pairs[3].1, "Indicador,Mediana");
        assert_eq!(pairs[4].1, "10");
    }

    #[test]
    fn test_reset_then_reuse_matches_fresh_query() {
        let transport = Arc::new(RecordingTransport::default());
        let mut reused = expectativas(Arc::clone(&transport));
        let mediana = prop(&reused, "Mediana");
        reused
            .filter([mediana.less_than(3)])
            .orderby([mediana.asc()])
            .skip(5)
            .limit(2);
        reused.reset();
        reused.filter([mediana.greater_or_equal(4.5)]);

        let mut fresh = expectativas(transport);
        fresh.filter([mediana.greater_or_equal(4.5)]);

        assert_eq!(reused.request_url().unwrap(), fresh.request_url().unwrap());
        assert!(reused.orderbys().is_empty());
        assert_eq!(reused.option("$top"), None);
    }

    #[test]
    fn test_request_url_is_percent_encoded() {
        let mut query = expectativas(Arc::new(RecordingTransport::default()));
        let indicador = prop(&query, "Indicador");
        query.filter([indicador.equals("IPCA")]).limit(1);

        let url = query.request_url().unwrap();
        assert!(url.ends_with(
            "ExpectativasMercadoAnuais?%24format=json&%24filter=Indicador%20eq%20%27IPCA%27&%24top=1"
        ));
    }

    #[test]
    fn test_parameters_reject_unknown_names() {
        let mut query = cotacao(Arc::new(RecordingTransport::default()));
        let err = query.parameter("moeda", "USD").unwrap_err();
        assert!(matches!(err, BcbError::UnknownParameter(ref n) if n == "moeda"));

        let mut plain = expectativas(Arc::new(RecordingTransport::default()));
        assert!(plain.parameter("anything", 1).is_err());
    }

    #[test]
    fn test_function_parameters_rendered_last() {
        let mut query = cotacao(Arc::new(RecordingTransport::default()));
        query
            .parameters([("dataInicial", "01-01-2021"), ("dataFinalCotacao", "01-31-2021")])
            .unwrap()
            .limit(3);

        let pairs = query.query_pairs().unwrap();
        assert_eq!(
            pairs,
            [
                ("$format".to_string(), "json".to_string()),
                ("$top".to_string(), "3".to_string()),
                ("@dataInicial".to_string(), "'01-01-2021'".to_string()),
                ("@dataFinalCotacao".to_string(), "'01-31-2021'".to_string()),
                ("@casas".to_string(), "null".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_required_parameter_fails_before_http() {
        let transport = Arc::new(RecordingTransport::new(QUERY_RESPONSE));
        let mut query = cotacao(Arc::clone(&transport));
        query.parameter("dataInicial", "01-01-2021").unwrap();

        let err = query.text().await.unwrap_err();
        assert!(matches!(err, BcbError::MissingParameter(ref n) if n == "dataFinalCotacao"));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_collect_returns_envelope() {
        let transport = Arc::new(RecordingTransport::new(QUERY_RESPONSE));
        let mut query = expectativas(Arc::clone(&transport));

        let envelope = query.limit(1).collect().await.unwrap();
        assert_eq!(envelope["value"][0]["Indicador"], "IPCA");
        assert_eq!(transport.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_frame_coerces_dates_unless_raw() {
        let transport = Arc::new(RecordingTransport::new(QUERY_RESPONSE));
        let mut query = expectativas(transport);

        let df = query.collect_frame().await.unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("Data").unwrap().dtype(), &DataType::Date);

        let df = query.raw(true).collect_frame().await.unwrap();
        assert_eq!(df.column("Data").unwrap().dtype(), &DataType::String);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let transport = Arc::new(RecordingTransport::new("<html>oops</html>"));
        let mut query = expectativas(transport);
        let err = query.collect().await.unwrap_err();
        assert!(matches!(err, BcbError::Parse(_)));
    }

    #[test]
    fn test_show_flags_required_parameters() {
        let mut query = cotacao(Arc::new(RecordingTransport::default()));
        query.parameter("dataInicial", "01-01-2021").unwrap();

        let text = query.show();
        assert!(text.starts_with("URL:\n  https://olinda.bcb.gov.br/"));
        assert!(text.contains("  dataInicial<str> (required) = 01-01-2021"));
        assert!(text.contains("  dataFinalCotacao<str> (required) = None"));
        assert!(text.contains("  casas<int> = None"));
        assert!(text.contains("  $format = json"));
        assert!(text.ends_with(
            "Return: cotacaoCompra<float>, cotacaoVenda<float>, dataHoraCotacao<str>"
        ));
    }
}
