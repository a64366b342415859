//! Plain string rendering of record field values
//!
//! The CSV and JSON transformers both need every field value as a human
//! readable string. Rendering lives here so both produce identical text for
//! the same value.

use bson::{Binary, Bson, DateTime};

/// Converts a field value into its plain text rendering
pub trait ValueRenderer {
    /// Render a single value
    fn render(&self, value: &Bson) -> String;

    /// Render an optional value, absent values render empty
    fn render_optional(&self, value: Option<&Bson>) -> String {
        value.map(|v| self.render(v)).unwrap_or_default()
    }
}

/// Plain text renderer used for data export
///
/// Scalars render without type wrappers; nested documents and arrays render
/// as compact relaxed extended JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    pub fn new() -> Self {
        Self
    }

    fn format_datetime(dt: &DateTime) -> String {
        dt.try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.timestamp_millis().to_string())
    }

    fn format_binary(bin: &Binary) -> String {
        hex::encode(&bin.bytes)
    }

    fn format_nested(value: Bson) -> String {
        serde_json::to_string(&value.into_relaxed_extjson()).unwrap_or_default()
    }
}

impl ValueRenderer for PlainTextRenderer {
    fn render(&self, value: &Bson) -> String {
        match value {
            Bson::String(s) => s.clone(),
            Bson::Int32(n) => n.to_string(),
            Bson::Int64(n) => n.to_string(),
            Bson::Double(f) => f.to_string(),
            Bson::Boolean(b) => b.to_string(),
            Bson::Null | Bson::Undefined => String::new(),
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::DateTime(dt) => Self::format_datetime(dt),
            Bson::Decimal128(d) => d.to_string(),
            Bson::Binary(bin) => Self::format_binary(bin),
            Bson::RegularExpression(regex) => format!("/{}/{}", regex.pattern, regex.options),
            Bson::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
            Bson::Symbol(s) => s.clone(),
            Bson::JavaScriptCode(code) => code.clone(),
            Bson::MinKey => String::from("MinKey"),
            Bson::MaxKey => String::from("MaxKey"),
            Bson::Array(_) | Bson::Document(_) => Self::format_nested(value.clone()),
            other => format!("{other}"),
        }
    }
}
