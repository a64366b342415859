//! Writing export results to disk
//!
//! The engine hands back artifacts in memory; persisting them is the
//! caller's business. The CLI writes every artifact as one file under an
//! output directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bson::Bson;
use serde_json::{Map, Value};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::error::{GdprError, Result};
use crate::model::{AggregatedRecords, ExportArtifact};

/// File name of the raw aggregated records
pub const RAW_FILE_NAME: &str = "records.json";

/// One file written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Create the output directory if needed
///
/// # Arguments
/// * `dir` - Output directory
///
/// # Returns
/// * `Result<()>` - Error if the path exists but is not a directory
pub async fn prepare_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(GdprError::Generic(format!(
            "Output path is not a directory: {}",
            dir.display()
        )));
    }
    fs::create_dir_all(dir).await?;
    Ok(())
}

/// Replace path separators so a file name stays inside the output directory
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}

async fn write_file(path: PathBuf, contents: &str) -> Result<WrittenFile> {
    let file = File::create(&path).await.map_err(|e| {
        GdprError::Generic(format!("Failed to create file {}: {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    writer.write_all(contents.as_bytes()).await?;
    writer.flush().await?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(WrittenFile {
        path,
        bytes: contents.len() as u64,
    })
}

/// Write every artifact as a file under `dir`
///
/// # Returns
/// * `Result<Vec<WrittenFile>>` - Written files in artifact name order
pub async fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<Vec<WrittenFile>> {
    prepare_dir(dir).await?;

    let mut written = Vec::with_capacity(artifact.len());
    let mut seen = BTreeSet::new();
    for (name, contents) in artifact {
        let path = dir.join(sanitize_file_name(name));
        if !seen.insert(path.clone()) {
            warn!("Artifact '{}' overwrites {}", name, path.display());
        }
        written.push(write_file(path, contents).await?);
    }
    Ok(written)
}

/// Render aggregated records as one JSON document
///
/// container -> record type -> array of records as relaxed extended JSON
pub fn records_to_json(records: &AggregatedRecords) -> Value {
    let containers: Map<String, Value> = records
        .iter()
        .map(|(container, by_type)| {
            let types: Map<String, Value> = by_type
                .iter()
                .map(|(record_type, records)| {
                    let rows = records
                        .iter()
                        .map(|r| Bson::Document(r.fields.clone()).into_relaxed_extjson())
                        .collect();
                    (record_type.clone(), Value::Array(rows))
                })
                .collect();
            (container.to_string(), Value::Object(types))
        })
        .collect();
    Value::Object(containers)
}

/// Write the aggregated records as [`RAW_FILE_NAME`] under `dir`
pub async fn write_raw(dir: &Path, records: &AggregatedRecords) -> Result<Vec<WrittenFile>> {
    prepare_dir(dir).await?;
    let contents = serde_json::to_string_pretty(&records_to_json(records))?;
    Ok(vec![write_file(dir.join(RAW_FILE_NAME), &contents).await?])
}
