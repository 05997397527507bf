//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::BridgeBlueprint;

use crate::cli::ValidateArgs;

/// Lock-step timeouts below this are likely to break slow controllers
const SHORT_LOCKSTEP_MS: u64 = 100;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sync_addr: String,
    async_addr: String,
    num_cars: usize,
    endpoint_count: usize,
    lockstep_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    sync_addr: blueprint.network.sync_addr().to_string(),
                    async_addr: blueprint.network.async_addr().to_string(),
                    num_cars: blueprint.simulation.num_cars,
                    endpoint_count: blueprint.endpoints.len(),
                    lockstep_ms: blueprint.timeouts.lockstep_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BridgeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.network.host.is_loopback() {
        warnings.push(format!(
            "network.host {} is not loopback - the bridge has no authentication",
            blueprint.network.host
        ));
    }

    if blueprint.endpoints.is_empty() {
        warnings.push(
            "No endpoints pre-assigned - controllers must connect through the async port"
                .to_string(),
        );
    }

    if blueprint.timeouts.lockstep_ms < SHORT_LOCKSTEP_MS {
        warnings.push(format!(
            "timeouts.lockstep_ms = {} is very short - slow controllers will be dropped",
            blueprint.timeouts.lockstep_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sync port: {}", summary.sync_addr);
            println!("  Async port: {}", summary.async_addr);
            println!("  Cars: {}", summary.num_cars);
            println!("  Pre-assigned endpoints: {}", summary.endpoint_count);
            println!("  Lock-step timeout: {} ms", summary.lockstep_ms);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    fn args(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: true,
        }
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[timeouts]\nlockstep_ms = 50").unwrap();

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("lockstep_ms")));
    }

    #[test]
    fn test_same_ports_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[network]\nsync_port = 5000\nasync_port = 5000").unwrap();

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("differ"));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let result = validate_config(&args(PathBuf::from("/nonexistent/bridge.toml")));
        assert!(!result.valid);
        assert!(run_validate(&args(PathBuf::from("/nonexistent/bridge.toml"))).is_err());
    }
}
