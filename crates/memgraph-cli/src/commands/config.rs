use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memgraph::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    #[clap(about = "Show the effective configuration")]
    Show,

    #[clap(about = "Write the default configuration as TOML")]
    Init(InitArgs),
}

#[derive(Parser)]
pub struct InitArgs {
    #[clap(help = "Destination file (defaults to ~/.memgraph/config.toml)")]
    pub path: Option<PathBuf>,

    #[clap(long, help = "Overwrite an existing file")]
    pub force: bool,
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let config = Config::load(config_path)?;
                show(&config, config_path, format)
            }
            ConfigSubcommand::Init(args) => {
                let path = match &args.path {
                    Some(path) => path.clone(),
                    None => default_config_path()?,
                };
                init(&path, args.force)?;
                match format {
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({ "written": path.display().to_string() })
                    ),
                    OutputFormat::Table => {
                        println!("Wrote default configuration to {}", path.display())
                    }
                }
                Ok(())
            }
        }
    }
}

fn default_config_path() -> CliResult<PathBuf> {
    Config::default_paths()
        .into_iter()
        .next()
        .ok_or_else(|| "Could not determine a config location; pass a path".into())
}

/// Write the default TOML to `path`, creating parent directories
pub fn init(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    tracing::info!("Wrote default config to {}", path.display());
    Ok(())
}

fn show(config: &Config, config_path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::to_value(config)?)?);
        }
        OutputFormat::Table => {
            match config_path {
                Some(path) => println!("Configuration from: {}", path.display()),
                None => println!("Configuration: (defaults or first file found)"),
            }
            println!("==============================\n");

            let value = serde_json::to_value(config)?;
            let Some(sections) = value.as_object() else {
                return Ok(());
            };
            for (section, settings) in sections {
                println!("[{section}]");
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Setting", "Value"]);
                if let Some(settings) = settings.as_object() {
                    for (key, value) in settings {
                        let rendered = match value {
                            serde_json::Value::String(s) if s.is_empty() => "(not set)".to_string(),
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        table.add_row([key.as_str(), rendered.as_str()]);
                    }
                }
                println!("{table}\n");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(&path, false).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.engine.consolidation_threshold, 5);
        assert_eq!(loaded.retrieval.default_k, 3);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(init(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");
        init(&path, true).unwrap();
        assert!(Config::from_file(&path).is_ok());
    }
}
