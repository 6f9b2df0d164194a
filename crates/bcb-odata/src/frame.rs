//! Conversion of OData response envelopes into polars DataFrames.
//!
//! Column types are inferred from the JSON values. Date-bearing columns are
//! then coerced according to [`FrameOptions`]: by default a fixed set of
//! column names known to carry dates across the BCB services, optionally an
//! explicit allow-list, or the declared property types.

use bcb_core::{BcbError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use indexmap::IndexSet;
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::model::Entity;

/// Column names treated as dates by the default heuristic.
pub const DEFAULT_DATE_COLUMNS: &[&str] = &[
    "Data",
    "dataHoraCotacao",
    "InicioPeriodo",
    "FimPeriodo",
    "DataVigencia",
];

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Which columns get converted to dates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DateColumns {
    /// Convert the [`DEFAULT_DATE_COLUMNS`] present in the result.
    #[default]
    Heuristic,
    /// Convert only these columns.
    Only(Vec<String>),
    /// Convert columns declared as `Edm.Date` or `Edm.DateTimeOffset`.
    FromSchema,
}

impl DateColumns {
    /// Builds an explicit allow-list.
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(columns.into_iter().map(Into::into).collect())
    }

    fn selects(&self, column: &str, entity: &Entity) -> bool {
        match self {
            Self::Heuristic => DEFAULT_DATE_COLUMNS.contains(&column),
            Self::Only(columns) => columns.iter().any(|c| c == column),
            Self::FromSchema => entity
                .property(column)
                .is_some_and(|p| p.edm_type().is_temporal()),
        }
    }
}

/// Post-processing applied when a response is turned into a DataFrame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameOptions {
    date_columns: DateColumns,
    /// (endpoint, column) -> chrono format string.
    date_formats: HashMap<(String, String), String>,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self::new().date_format("IfDataCadastro", "Data", "%Y%m")
    }
}

impl FrameOptions {
    /// Options with the heuristic date columns and no format overrides.
    #[must_use]
    pub fn new() -> Self {
        Self {
            date_columns: DateColumns::Heuristic,
            date_formats: HashMap::new(),
        }
    }

    /// Sets the date column selection.
    #[must_use]
    pub fn date_columns(mut self, date_columns: DateColumns) -> Self {
        self.date_columns = date_columns;
        self
    }

    /// Parses `column` of `endpoint` with a chrono format instead of the
    /// ISO detection. Year-month formats such as `%Y%m` are accepted.
    #[must_use]
    pub fn date_format(
        mut self,
        endpoint: impl Into<String>,
        column: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        self.date_formats
            .insert((endpoint.into(), column.into()), format.into());
        self
    }

    /// Current date column selection.
    #[must_use]
    pub const fn selection(&self) -> &DateColumns {
        &self.date_columns
    }

    /// Format override for a column of an endpoint.
    #[must_use]
    pub fn format_for(&self, endpoint: &str, column: &str) -> Option<&str> {
        self.date_formats
            .get(&(endpoint.to_string(), column.to_string()))
            .map(String::as_str)
    }
}

/// Builds a DataFrame from the `value` array of an OData envelope.
///
/// With `raw` set, columns are returned with their inferred JSON types and
/// no date coercion.
pub fn frame_from_envelope(
    envelope: &Value,
    endpoint: &str,
    entity: &Entity,
    options: &FrameOptions,
    raw: bool,
) -> Result<DataFrame> {
    let rows = envelope
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| BcbError::Parse("response envelope has no value array".to_string()))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let record = row
            .as_object()
            .ok_or_else(|| BcbError::Parse(format!("expected a JSON object row, got {row}")))?;
        records.push(record);
    }

    let names: IndexSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let values: Vec<&Value> = records
            .iter()
            .map(|r| r.get(name).unwrap_or(&Value::Null))
            .collect();

        let column = if !raw && options.date_columns.selects(name, entity) {
            let format = options.format_for(endpoint, name);
            debug!(column = name, ?format, "Coercing date column");
            date_column(name, &values, format)?
        } else {
            infer_column(name, &values)
        };
        columns.push(column);
    }

    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }

    DataFrame::new(columns).map_err(|e| BcbError::Parse(e.to_string()))
}

fn infer_column(name: &str, values: &[&Value]) -> Column {
    let present = || values.iter().filter(|v| !v.is_null());

    if present().next().is_none() {
        let empty: Vec<Option<&str>> = vec![None; values.len()];
        return Column::new(name.into(), empty);
    }
    if present().all(|v| v.is_boolean()) {
        let data: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
        return Column::new(name.into(), data);
    }
    if present().all(|v| v.is_i64()) {
        let data: Vec<Option<i64>> = values.iter().map(|v| v.as_i64()).collect();
        return Column::new(name.into(), data);
    }
    if present().all(|v| v.is_number()) {
        let data: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
        return Column::new(name.into(), data);
    }
    if present().all(|v| v.is_string()) {
        let data: Vec<Option<&str>> = values.iter().map(|v| v.as_str()).collect();
        return Column::new(name.into(), data);
    }

    let data: Vec<Option<String>> = values.iter().map(|v| value_text(v)).collect();
    Column::new(name.into(), data)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Temporal {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

fn date_column(name: &str, values: &[&Value], format: Option<&str>) -> Result<Column> {
    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let Some(text) = value_text(value) else {
            parsed.push(None);
            continue;
        };
        let temporal = parse_temporal(text.trim(), format).ok_or_else(|| {
            BcbError::Parse(format!("column {name}: cannot parse {text:?} as a date"))
        })?;
        parsed.push(Some(temporal));
    }

    let has_time = parsed
        .iter()
        .any(|t| matches!(t, Some(Temporal::DateTime(_))));

    let series = if has_time {
        let millis: Vec<Option<i64>> = parsed
            .iter()
            .map(|t| {
                t.map(|t| match t {
                    Temporal::Date(d) => d.and_time(chrono::NaiveTime::MIN),
                    Temporal::DateTime(dt) => dt,
                })
                .map(|dt| dt.and_utc().timestamp_millis())
            })
            .collect();
        Series::new(name.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
    } else {
        let days: Vec<Option<i32>> = parsed
            .iter()
            .map(|t| match t {
                Some(Temporal::Date(d)) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                _ => None,
            })
            .collect();
        Series::new(name.into(), days).cast(&DataType::Date)
    }
    .map_err(|e| BcbError::Parse(e.to_string()))?;

    Ok(Column::from(series))
}

fn parse_temporal(text: &str, format: Option<&str>) -> Option<Temporal> {
    match format {
        Some(format) => parse_with_format(text, format),
        None => parse_iso(text),
    }
}

fn parse_with_format(text: &str, format: &str) -> Option<Temporal> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(Temporal::DateTime(dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, format) {
        return Some(Temporal::Date(d));
    }
    // Year-month formats carry no day; anchor them on the first.
    NaiveDate::parse_from_str(&format!("{text}01"), &format!("{format}%d"))
        .ok()
        .map(Temporal::Date)
}

fn parse_iso(text: &str) -> Option<Temporal> {
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Temporal::Date(d));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Temporal::DateTime(dt.naive_utc()));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .map(Temporal::DateTime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::EdmType;
    use crate::model::Property;
    use serde_json::json;

    fn entity() -> Entity {
        Entity::new(
            "Expectativa",
            "NS",
            [
                Property::new("Indicador", EdmType::String),
                Property::new("Data", EdmType::Date),
                Property::new("DataVigencia", EdmType::String),
                Property::new("Mediana", EdmType::Decimal),
            ],
        )
    }

    fn days(y: i32, m: u32, d: u32) -> i32 {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
    }

    fn date_at(df: &DataFrame, column: &str, row: usize) -> Option<i32> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .get(row)
    }

    fn multi_date() -> Value {
        json!({"value": [
            {"Indicador": "IPCA", "Data": "2021-01-04", "DataVigencia": "2021-06-01", "Mediana": 4.5}
        ]})
    }

    #[test]
    fn test_epoch_offset() {
        assert_eq!(days(1970, 1, 1), 0);
        assert_eq!(days(2021, 1, 4), 18_631);
    }

    #[test]
    fn test_heuristic_coerces_known_columns() {
        let df = frame_from_envelope(&multi_date(), "E", &entity(), &FrameOptions::default(), false)
            .unwrap();

        let names: Vec<_> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["Indicador", "Data", "DataVigencia", "Mediana"]);
        assert_eq!(df.column("Data").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("DataVigencia").unwrap().dtype(), &DataType::Date);
        assert_eq!(date_at(&df, "Data", 0), Some(days(2021, 1, 4)));
        assert_eq!(
            df.column("Mediana").unwrap().as_materialized_series().f64().unwrap().get(0),
            Some(4.5)
        );
        assert_eq!(
            df.column("Indicador").unwrap().as_materialized_series().str().unwrap().get(0),
            Some("IPCA")
        );
    }

    #[test]
    fn test_allow_list_converts_only_listed() {
        let options = FrameOptions::default().date_columns(DateColumns::only(["DataVigencia"]));
        let df = frame_from_envelope(&multi_date(), "E", &entity(), &options, false).unwrap();

        assert_eq!(df.column("DataVigencia").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("Data").unwrap().dtype(), &DataType::String);
        assert_eq!(
            df.column("Data").unwrap().as_materialized_series().str().unwrap().get(0),
            Some("2021-01-04")
        );
    }

    #[test]
    fn test_schema_driven_selection() {
        let options = FrameOptions::new().date_columns(DateColumns::FromSchema);
        let df = frame_from_envelope(&multi_date(), "E", &entity(), &options, false).unwrap();

        // Only `Data` is declared Edm.Date in the entity.
        assert_eq!(df.column("Data").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("DataVigencia").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_raw_skips_coercion() {
        let df = frame_from_envelope(&multi_date(), "E", &entity(), &FrameOptions::default(), true)
            .unwrap();
        assert_eq!(df.column("Data").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_year_month_override() {
        let envelope = json!({"value": [{"Data": 202103, "NomeInstituicao": "X"}]});
        let df = frame_from_envelope(&envelope, "IfDataCadastro", &entity(), &FrameOptions::default(), false)
            .unwrap();
        assert_eq!(date_at(&df, "Data", 0), Some(days(2021, 3, 1)));
    }

    #[test]
    fn test_timestamps_become_datetime() {
        let envelope = json!({"value": [
            {"dataHoraCotacao": "2021-01-04 13:05:22.123"},
            {"dataHoraCotacao": null}
        ]});
        let df = frame_from_envelope(&envelope, "CotacaoDolarDia", &entity(), &FrameOptions::default(), false)
            .unwrap();
        let column = df.column("dataHoraCotacao").unwrap();
        assert_eq!(
            column.dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn test_unparseable_date_is_error() {
        let envelope = json!({"value": [{"Data": "not a date"}]});
        let err = frame_from_envelope(&envelope, "E", &entity(), &FrameOptions::default(), false)
            .unwrap_err();
        assert!(matches!(err, BcbError::Parse(ref msg) if msg.contains("Data")));
    }

    #[test]
    fn test_inferred_types_and_missing_keys() {
        let envelope = json!({"value": [
            {"a": 1, "b": true, "c": 1.5, "d": "x"},
            {"a": 2, "c": 2, "d": 3}
        ]});
        let df = frame_from_envelope(&envelope, "E", &entity(), &FrameOptions::default(), false)
            .unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("a").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("b").unwrap().null_count(), 1);
        assert_eq!(df.column("c").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("d").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_empty_value_array() {
        let envelope = json!({"value": []});
        let df = frame_from_envelope(&envelope, "E", &entity(), &FrameOptions::default(), false)
            .unwrap();
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn test_missing_value_array_is_error() {
        let envelope = json!({"error": {"message": "boom"}});
        let err = frame_from_envelope(&envelope, "E", &entity(), &FrameOptions::default(), false)
            .unwrap_err();
        assert!(matches!(err, BcbError::Parse(_)));
    }
}
