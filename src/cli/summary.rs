//! Summary tables printed after an export or erasure

use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::model::DeletionResult;
use crate::output::WrittenFile;

fn styled(builder: Builder) -> String {
    let mut table: Table = builder.build();
    table.with(Style::modern());
    table.with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// Table of files written by an export
pub fn written_files_table(files: &[WrittenFile]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["File", "Bytes"]);
    for file in files {
        builder.push_record([file.path.display().to_string(), file.bytes.to_string()]);
    }
    styled(builder)
}

/// Table of zones deleted per container
pub fn deletion_table(result: &DeletionResult) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Container", "Zones deleted"]);
    for (container, zones) in result {
        let zones = if zones.is_empty() {
            "(none)".to_string()
        } else {
            zones
                .iter()
                .map(|z| z.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        builder.push_record([container.to_string(), zones]);
    }
    styled(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ZoneId;
    use std::path::PathBuf;

    #[test]
    fn test_written_files_table() {
        let table = written_files_table(&[WrittenFile {
            path: PathBuf::from("out/default_log.csv"),
            bytes: 42,
        }]);
        assert!(table.contains("default_log.csv"));
        assert!(table.contains("42"));
    }

    #[test]
    fn test_deletion_table() {
        let mut result = DeletionResult::new();
        result.insert("app_default".into(), vec![ZoneId::from("z1"), ZoneId::from("z2")]);
        result.insert("app_settings".into(), vec![]);

        let table = deletion_table(&result);
        assert!(table.contains("z1, z2"));
        assert!(table.contains("(none)"));
    }
}
