//! Command-line front end: argument parsing, terminal rendering and the
//! stdin control channel.

pub mod console;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::MedicConfig;
use crate::error::{MedicError, Result};

/// Medic diagnostic agent CLI
#[derive(Parser, Debug)]
#[command(name = "medic", version, about = "Interactive diagnostic agent for failing builds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diagnose an error in a project
    Diagnose(DiagnoseArgs),
}

/// Arguments for the `diagnose` subcommand.
#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Error text to diagnose
    #[arg(short, long, conflicts_with = "error_file", required_unless_present = "error_file")]
    pub error: Option<String>,

    /// Read the error text from a file
    #[arg(long)]
    pub error_file: Option<PathBuf>,

    /// Commands run before the error appeared
    #[arg(long)]
    pub history: Option<String>,

    /// Project root (defaults to the current directory)
    #[arg(short, long)]
    pub project_dir: Option<PathBuf>,

    /// Model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Chat Completions base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl DiagnoseArgs {
    /// File config, then environment, then flags.
    pub fn load_config(&self) -> Result<MedicConfig> {
        let base = match &self.config {
            Some(path) => MedicConfig::load(path)?,
            None => MedicConfig::discover()?,
        };
        let mut config = base.apply_env()?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut MedicConfig) {
        if let Some(model) = &self.model {
            config.agent.model = model.clone();
        }
        if let Some(url) = &self.api_url {
            config.agent.api_url = url.clone();
        }
        if let Some(temperature) = self.temperature {
            config.agent.temperature = temperature;
        }
    }

    pub async fn error_text(&self) -> Result<String> {
        match (&self.error, &self.error_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(tokio::fs::read_to_string(path).await?),
            (None, None) => Err(MedicError::InvalidArgument(
                "either --error or --error-file is required".into(),
            )),
        }
    }

    pub fn project_dir(&self) -> Result<PathBuf> {
        match &self.project_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_diagnose_with_inline_error() {
        let cli = Cli::try_parse_from([
            "medic",
            "diagnose",
            "--error",
            "E0425: cannot find value",
            "--project-dir",
            "/tmp/app",
            "--temperature",
            "0.5",
        ])
        .unwrap();
        let Commands::Diagnose(args) = cli.command;
        assert_eq!(args.error.as_deref(), Some("E0425: cannot find value"));
        assert_eq!(args.project_dir, Some(PathBuf::from("/tmp/app")));
        assert_eq!(args.temperature, Some(0.5));
    }

    #[test]
    fn diagnose_requires_an_error_source() {
        assert!(Cli::try_parse_from(["medic", "diagnose"]).is_err());
        assert!(Cli::try_parse_from([
            "medic",
            "diagnose",
            "--error",
            "x",
            "--error-file",
            "log.txt"
        ])
        .is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "medic",
            "diagnose",
            "--error-file",
            "log.txt",
            "--model",
            "local-model",
            "--api-url",
            "http://localhost:8080/v1",
        ])
        .unwrap();
        let Commands::Diagnose(args) = cli.command;
        let mut config = MedicConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.agent.model, "local-model");
        assert_eq!(config.agent.api_url, "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn error_text_reads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.log");
        std::fs::write(&path, "linker failed").unwrap();
        let args = DiagnoseArgs {
            error: None,
            error_file: Some(path),
            history: None,
            project_dir: None,
            model: None,
            api_url: None,
            temperature: None,
            config: None,
        };
        assert_eq!(args.error_text().await.unwrap(), "linker failed");
    }
}
