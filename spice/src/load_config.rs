/// `load_config` module: reads the optional YAML defaults file and adapts it into typed settings.
///
/// This is the only place untrusted YAML is parsed. Loosely-typed keys (log level names,
/// scalar engine arguments) are mapped onto the core's types here, so a typo or a bad value
/// fails at load time with the file path in the message.
///
/// # Accepted schema (all keys optional)
/// ```yaml
/// surveyor:
///   command: [goatrodeo]
///   args: { blockList: /etc/bl }
/// uploader:
///   command: [ginger]
///   args: { --encrypt-only: "true" }
/// threads: 4
/// max_records: 5000
/// log_level: info
/// use_static_metadata: true
/// ```
///
/// Values from this file sit below command-line flags and above built-in defaults.
use anyhow::{anyhow, Result};
use serde::Deserialize;
use spice_core::config::LogLevel;
use spice_core::engines::{DEFAULT_SURVEYOR_PROGRAM, DEFAULT_UPLOADER_PROGRAM};
use spice_core::kv_args::ExtraArgs;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

/// Settings taken from the YAML file, already converted to core types.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub surveyor_command: Vec<String>,
    pub surveyor_args: ExtraArgs,
    pub uploader_command: Vec<String>,
    pub uploader_args: ExtraArgs,
    pub threads: Option<u32>,
    pub max_records: Option<u32>,
    pub log_level: Option<LogLevel>,
    pub use_static_metadata: Option<bool>,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            surveyor_command: vec![DEFAULT_SURVEYOR_PROGRAM.to_string()],
            surveyor_args: ExtraArgs::new(),
            uploader_command: vec![DEFAULT_UPLOADER_PROGRAM.to_string()],
            uploader_args: ExtraArgs::new(),
            threads: None,
            max_records: None,
            log_level: None,
            use_static_metadata: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    surveyor: EngineSection,
    #[serde(default)]
    uploader: EngineSection,
    threads: Option<u32>,
    max_records: Option<u32>,
    log_level: Option<String>,
    use_static_metadata: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineSection {
    command: Option<Vec<String>>,
    #[serde(default)]
    args: serde_yaml::Mapping,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    // An empty file deserializes to null, which means "no overrides".
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow!("Failed to parse config YAML {:?}: {e}", path_ref));
            }
        }
    };

    let log_level = raw
        .log_level
        .as_deref()
        .map(LogLevel::from_str)
        .transpose()
        .map_err(|e| anyhow!("Invalid log_level in {:?}: {e}", path_ref))?;

    let defaults = CliConfig::default();
    Ok(CliConfig {
        surveyor_command: engine_command(raw.surveyor.command, defaults.surveyor_command, "surveyor")?,
        surveyor_args: engine_args(&raw.surveyor.args, "surveyor")?,
        uploader_command: engine_command(raw.uploader.command, defaults.uploader_command, "uploader")?,
        uploader_args: engine_args(&raw.uploader.args, "uploader")?,
        threads: positive(raw.threads, "threads")?,
        max_records: positive(raw.max_records, "max_records")?,
        log_level,
        use_static_metadata: raw.use_static_metadata,
    })
}

fn engine_command(configured: Option<Vec<String>>, default: Vec<String>, engine: &str) -> Result<Vec<String>> {
    match configured {
        None => Ok(default),
        Some(command) if command.is_empty() => Err(anyhow!("{engine}.command must not be empty")),
        Some(command) => Ok(command),
    }
}

/// Matches the `--threads`/`--max-records` flags, which reject 0.
fn positive(value: Option<u32>, key: &str) -> Result<Option<u32>> {
    match value {
        Some(0) => Err(anyhow!("{key} must be at least 1")),
        other => Ok(other),
    }
}

fn engine_args(mapping: &serde_yaml::Mapping, engine: &str) -> Result<ExtraArgs> {
    let mut args = ExtraArgs::new();
    for (key, value) in mapping {
        let key = yaml_scalar(key).ok_or_else(|| anyhow!("{engine}.args keys must be scalars"))?;
        let value = yaml_scalar(value)
            .ok_or_else(|| anyhow!("{engine}.args.{key} must be a string, number or bool"))?;
        args.insert(key, value);
    }
    Ok(args)
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}
