//! JSON transformer

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ArtifactNamer, DataTransformer, NamingStrategy, insert_file, run_blocking};
use crate::error::Result;
use crate::model::{AggregatedRecords, ContainerNameMapping, ExportArtifact, Record};
use crate::render::{PlainTextRenderer, ValueRenderer};

/// One pretty-printed JSON array per (container, record type)
///
/// Each record becomes an object of field name to rendered string. Fields a
/// record lacks are left out of its object.
#[derive(Debug, Clone, Default)]
pub struct JsonTransformer {
    renderer: PlainTextRenderer,
    naming: NamingStrategy,
}

impl JsonTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    fn record_object(&self, record: &Record) -> Map<String, Value> {
        record
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(self.renderer.render(value))))
            .collect()
    }

    /// Render one (container, record type) group as a JSON array
    pub fn render_group(&self, records: &[Record]) -> Result<String> {
        let rows: Vec<Map<String, Value>> = records.iter().map(|r| self.record_object(r)).collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    fn transform(
        &self,
        data: &AggregatedRecords,
        names: &ContainerNameMapping,
    ) -> Result<ExportArtifact> {
        let mut namer = ArtifactNamer::new(names, self.naming);
        let mut artifact = ExportArtifact::new();

        for (container, by_type) in data {
            for (record_type, records) in by_type {
                let file_name = namer.file_name(container, record_type, "json");
                debug!("Rendering {} record(s) into {}", records.len(), file_name);
                insert_file(&mut artifact, file_name, self.render_group(records)?);
            }
        }

        Ok(artifact)
    }
}

#[async_trait]
impl DataTransformer for JsonTransformer {
    type Output = ExportArtifact;

    async fn transform_data(
        &self,
        data: AggregatedRecords,
        names: &ContainerNameMapping,
    ) -> Result<ExportArtifact> {
        let transformer = self.clone();
        let names = names.clone();
        run_blocking("JSON", move || transformer.transform(&data, &names)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::fixtures::{default_logs, default_names};
    use bson::doc;

    #[tokio::test]
    async fn test_default_log_json_omits_missing_keys() {
        let artifact = JsonTransformer::new()
            .transform_data(default_logs(), &default_names())
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&artifact["default_log.json"]).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], serde_json::json!({ "id": "1" }));
        assert_eq!(rows[1], serde_json::json!({ "id": "2", "name": "Bob" }));
    }

    #[test]
    fn test_values_render_as_strings() {
        let json = JsonTransformer::new()
            .render_group(&[Record::new("log", doc! { "n": 7, "ok": true })])
            .unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!([{ "n": "7", "ok": "true" }]));
    }

    #[test]
    fn test_output_is_pretty_printed() {
        let json = JsonTransformer::new()
            .render_group(&[Record::new("log", doc! { "id": "1" })])
            .unwrap();
        assert!(json.contains('\n'));
    }
}
