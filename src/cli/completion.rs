//! Shell completion generation for cloudgdpr
//!
//! Generates completion scripts for bash, zsh and fish, with export formats
//! offered for `export --format`.

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::CliArgs;
use crate::error::{ConfigError, GdprError, Result};

const BIN_NAME: &str = "cloudgdpr";

/// Generate shell completion script
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish)
///
/// # Returns
/// * `Result<()>` - Success or error
pub fn generate_completion(shell_name: &str) -> Result<()> {
    let shell = parse_shell(shell_name)?;
    print!("{}", completion_script(shell));
    Ok(())
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        _ => Err(GdprError::Config(ConfigError::Generic(format!(
            "Unsupported shell: {}. Supported shells: bash, zsh, fish",
            shell_name
        )))),
    }
}

/// Build the completion script for a shell
fn completion_script(shell: Shell) -> String {
    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, BIN_NAME, &mut buffer);
    let basic_completion = String::from_utf8_lossy(&buffer);

    match shell {
        Shell::Fish => format!(
            r#"{}

# Export formats
complete -c {bin} -n "__fish_seen_subcommand_from export" -l format -f -a "json csv raw" -d "Output format"
"#,
            basic_completion,
            bin = BIN_NAME
        ),
        _ => basic_completion.into_owned(),
    }
}
