//! User confirmation before erasing data

use std::io::{self, BufRead, Write};

use crate::error::{GdprError, Result};
use crate::model::ContainerDeclaration;

/// Describe what an erasure will remove
pub fn erasure_description(declaration: &ContainerDeclaration) -> String {
    let containers: Vec<&str> = declaration.keys().map(|c| c.as_str()).collect();
    format!(
        "This will DELETE EVERY ZONE of {} container(s): {}",
        containers.len(),
        containers.join(", ")
    )
}

/// Prompt user for confirmation
///
/// # Arguments
/// * `operation_desc` - Description of the operation to perform
///
/// # Returns
/// * `Result<bool>` - True if user confirmed, false if cancelled, error on I/O failure
pub fn prompt_confirmation(operation_desc: &str) -> Result<bool> {
    let stdin = io::stdin();
    prompt_with(operation_desc, &mut stdin.lock(), &mut io::stdout())
}

fn prompt_with(
    operation_desc: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<bool> {
    writeln!(output, "⚠️ WARNING: This cannot be undone!")?;
    writeln!(output, "   {}", operation_desc)?;
    write!(output, "   Continue? (yes/no): ")?;
    output
        .flush()
        .map_err(|e| GdprError::Generic(format!("Failed to flush stdout: {}", e)))?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| GdprError::Generic(format!("Failed to read input: {}", e)))?;

    let answer = answer.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "yes" | "y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn ask(answer: &str) -> bool {
        let mut input = answer.as_bytes();
        let mut output = Vec::new();
        prompt_with("This will DELETE", &mut input, &mut output).unwrap()
    }

    #[test]
    fn test_accepts_yes_and_y() {
        assert!(ask("yes\n"));
        assert!(ask("Y\n"));
        assert!(!ask("no\n"));
        assert!(!ask("\n"));
        assert!(!ask(""));
    }

    #[test]
    fn test_erasure_description_lists_containers() {
        let mut declaration = ContainerDeclaration::new();
        declaration.insert("app_default".into(), BTreeSet::from(["log".to_string()]));
        declaration.insert("app_docs".into(), BTreeSet::new());

        let desc = erasure_description(&declaration);
        assert!(desc.contains("2 container(s)"));
        assert!(desc.contains("app_default, app_docs"));
    }
}
