use crate::credential::Credential;
use crate::error::OrchestratorError;
use crate::kv_args::ExtraArgs;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_MAX_RECORDS: u32 = 5000;

/// The single action one invocation performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Command {
    /// Survey, then upload what was surveyed.
    #[default]
    Run,
    SurveyArtifacts,
    UploadAdgs,
    UploadDeploymentEvents,
    DecodeCredential,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Run,
        Command::SurveyArtifacts,
        Command::UploadAdgs,
        Command::UploadDeploymentEvents,
        Command::DecodeCredential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Run => "run",
            Command::SurveyArtifacts => "survey-artifacts",
            Command::UploadAdgs => "upload-adgs",
            Command::UploadDeploymentEvents => "upload-deployment-events",
            Command::DecodeCredential => "decode-credential",
        }
    }

    pub fn surveys(&self) -> bool {
        matches!(self, Command::Run | Command::SurveyArtifacts)
    }

    pub fn requires_credential(&self) -> bool {
        !matches!(self, Command::SurveyArtifacts | Command::DecodeCredential)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = OrchestratorError;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalised.as_str() {
            "run" => Ok(Command::Run),
            "survey-artifacts" | "survey" => Ok(Command::SurveyArtifacts),
            "upload-adgs" => Ok(Command::UploadAdgs),
            "upload-deployment-events" => Ok(Command::UploadDeploymentEvents),
            "decode-credential" => Ok(Command::DecodeCredential),
            _ => Err(OrchestratorError::UnknownCommandToken {
                token: s.to_string(),
                expected: Command::ALL.iter().map(Command::as_str).collect(),
            }),
        }
    }
}

/// Severity names accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    All,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::All => "all",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Off => "off",
        }
    }

    /// Upper-case spelling handed to the surveyor.
    pub fn engine_name(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    pub fn tracing_filter(&self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::All | LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Fatal => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }

    /// True when stack-trace style detail should accompany errors.
    pub fn shows_debug_detail(&self) -> bool {
        *self <= LogLevel::Debug
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(LogLevel::All),
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "off" => Ok(LogLevel::Off),
            _ => Err(OrchestratorError::UnknownLogLevel(s.to_string())),
        }
    }
}

/// Everything one invocation needs. Unset fields are resolved by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub command: Command,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub tag: Option<String>,
    pub tag_json: Option<String>,
    pub thread_count: Option<u32>,
    pub max_records_per_batch: Option<u32>,
    pub use_static_metadata: Option<bool>,
    pub credential: Option<Credential>,
    pub extra_surveyor_args: ExtraArgs,
    pub extra_uploader_args: ExtraArgs,
    pub log_level: LogLevel,
}

impl Configuration {
    pub fn new(command: Command) -> Self {
        Configuration {
            command,
            ..Default::default()
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref().filter(|c| !c.is_blank())
    }

    pub fn max_records(&self) -> u32 {
        self.max_records_per_batch.unwrap_or(DEFAULT_MAX_RECORDS)
    }

    pub fn static_metadata(&self) -> bool {
        self.use_static_metadata.unwrap_or(true)
    }

    pub fn trace_loaded(&self) {
        info!(
            command = %self.command,
            log_level = %self.log_level,
            surveyor_args = self.extra_surveyor_args.len(),
            uploader_args = self.extra_uploader_args.len(),
            "Loaded configuration"
        );
        debug!(?self, "Configuration (full debug)");
    }
}

/// `max(1, round(cores / 2))` when no explicit count is given.
pub fn resolve_thread_count(explicit: Option<u32>, available_cores: usize) -> u32 {
    match explicit {
        Some(n) if n > 0 => n,
        _ => {
            let half = (available_cores as u64 + 1) / 2;
            half.clamp(1, u32::MAX as u64) as u32
        }
    }
}

pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
