///
/// This module implements the CLI surface of spice: flag declaration, merging the optional
/// YAML defaults file, and handing a resolved [`Configuration`] to the core orchestrator.
///
/// All orchestration logic (validation order, output layout, engine dispatch) lives in
/// `spice-core`. This module only turns flags into core types.
///
/// ## How To Use
/// - From a shell: `spice --command survey-artifacts --input ./payload --tag release-1`
/// - Programmatically or from tests: build a [`Cli`] and call [`run`].
///
/// [`Configuration`]: spice_core::config::Configuration
use crate::load_config::{load_config, CliConfig};
use anyhow::Result;
use clap::{ArgAction, Parser};
use spice_core::config::{Command, Configuration, LogLevel};
use spice_core::credential::Credential;
use spice_core::engines::{ProcessSurveyor, ProcessUploader};
use spice_core::kv_args::parse_key_values;
use spice_core::orchestrator::{Orchestrator, RunReport};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Survey artifacts into ADGs and upload them to Spice Labs.
#[derive(Debug, Parser)]
#[command(name = "spice", version, about = "Survey artifacts and upload ADGs to Spice Labs")]
pub struct Cli {
    /// run | survey-artifacts | upload-adgs | upload-deployment-events | decode-credential
    #[arg(long, default_value = "run", value_parser = Command::from_str)]
    pub command: Command,

    /// Payload to survey, or ADG directory to upload (default: current directory)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Base directory for survey output
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Tag recorded with the survey; required for run and survey-artifacts
    #[arg(long)]
    pub tag: Option<String>,

    /// JSON attached to the tag
    #[arg(long)]
    pub tag_json: Option<String>,

    /// Surveyor threads (default: half the available cores)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub threads: Option<u32>,

    /// Records per ADG batch (default: 5000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_records: Option<u32>,

    #[arg(long, action = ArgAction::Set)]
    pub use_static_metadata: Option<bool>,

    /// all | trace | debug | info | warn | error | fatal | off
    #[arg(long, value_parser = LogLevel::from_str)]
    pub log_level: Option<LogLevel>,

    /// Bearer token; falls back to the SPICE_PASS environment variable
    #[arg(long)]
    pub credential: Option<String>,

    /// Extra surveyor options as k=v[,k=v...]
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub surveyor_args: Vec<String>,

    /// Extra uploader options as k=v[,k=v...]
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub uploader_args: Vec<String>,

    /// YAML file with defaults for engine commands and options
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn file_config(&self) -> Result<CliConfig> {
        match &self.config {
            Some(path) => load_config(path),
            None => Ok(CliConfig::default()),
        }
    }

    /// Flag first, then the YAML file, then `info`.
    pub fn log_level(&self, file: Option<&CliConfig>) -> LogLevel {
        self.log_level
            .or_else(|| file.and_then(|f| f.log_level))
            .unwrap_or_default()
    }

    pub fn configuration(&self, file: &CliConfig) -> Configuration {
        Configuration {
            command: self.command,
            input_path: self.input.clone(),
            output_path: self.output.clone(),
            tag: self.tag.clone(),
            tag_json: self.tag_json.clone(),
            thread_count: self.threads.or(file.threads),
            max_records_per_batch: self.max_records.or(file.max_records),
            use_static_metadata: self.use_static_metadata.or(file.use_static_metadata),
            credential: self.credential.clone().map(Credential::new),
            extra_surveyor_args: file
                .surveyor_args
                .clone()
                .merged_with(&parse_key_values(&self.surveyor_args)),
            extra_uploader_args: file
                .uploader_args
                .clone()
                .merged_with(&parse_key_values(&self.uploader_args)),
            log_level: self.log_level(Some(file)),
        }
    }
}

/// Entrypoint for integration tests: loads `--config` and runs the command.
pub fn run(cli: Cli) -> Result<RunReport> {
    let file = cli.file_config()?;
    execute(&cli, &file)
}

pub fn execute(cli: &Cli, file: &CliConfig) -> Result<RunReport> {
    let config = cli.configuration(file);
    info!(
        command = %config.command,
        surveyor = ?file.surveyor_command,
        uploader = ?file.uploader_command,
        "Dispatching command"
    );

    let surveyor = ProcessSurveyor::new(file.surveyor_command.clone());
    let uploader = ProcessUploader::new(file.uploader_command.clone());
    let report = Orchestrator::new(surveyor, uploader).run(config)?;

    match serde_json::to_string(&report) {
        Ok(json) => debug!(report = %json, "Run report"),
        Err(e) => debug!(error = %e, "Run report could not be serialized"),
    }
    Ok(report)
}
