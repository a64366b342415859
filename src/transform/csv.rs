//! CSV transformer

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use super::{ArtifactNamer, DataTransformer, NamingStrategy, insert_file, run_blocking};
use crate::error::Result;
use crate::model::{AggregatedRecords, ContainerNameMapping, ExportArtifact, Record};
use crate::render::{PlainTextRenderer, ValueRenderer};

/// One CSV file per (container, record type)
///
/// The header is the union of field names over the group, in sorted order.
/// Every cell is quoted; fields a record lacks render as `""`.
#[derive(Debug, Clone, Default)]
pub struct CsvTransformer {
    renderer: PlainTextRenderer,
    naming: NamingStrategy,
}

impl CsvTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    fn quote(value: &str) -> String {
        format!("\"{}\"", value.replace('"', "\"\""))
    }

    /// Render one (container, record type) group as CSV text
    pub fn render_group(&self, records: &[Record]) -> String {
        let columns: BTreeSet<&String> = records.iter().flat_map(|r| r.keys()).collect();

        let mut csv = columns
            .iter()
            .map(|name| Self::quote(name))
            .collect::<Vec<_>>()
            .join(",");
        csv.push('\n');

        for record in records {
            let row = columns
                .iter()
                .map(|name| {
                    Self::quote(&self.renderer.render_optional(record.fields.get(name.as_str())))
                })
                .collect::<Vec<_>>()
                .join(",");
            csv.push_str(&row);
            csv.push('\n');
        }

        csv
    }

    fn transform(&self, data: &AggregatedRecords, names: &ContainerNameMapping) -> ExportArtifact {
        let mut namer = ArtifactNamer::new(names, self.naming);
        let mut artifact = ExportArtifact::new();

        for (container, by_type) in data {
            for (record_type, records) in by_type {
                let file_name = namer.file_name(container, record_type, "csv");
                debug!("Rendering {} record(s) into {}", records.len(), file_name);
                insert_file(&mut artifact, file_name, self.render_group(records));
            }
        }

        artifact
    }
}

#[async_trait]
impl DataTransformer for CsvTransformer {
    type Output = ExportArtifact;

    async fn transform_data(
        &self,
        data: AggregatedRecords,
        names: &ContainerNameMapping,
    ) -> Result<ExportArtifact> {
        let transformer = self.clone();
        let names = names.clone();
        run_blocking("CSV", move || Ok(transformer.transform(&data, &names))).await
    }
}
