//! Command orchestration: validate, resolve defaults, dispatch to the engines.
//!
//! One [`Orchestrator::run`] call performs exactly one command. `run` is the only
//! composite: it surveys and then uploads the survey it just produced. A failed
//! survey stops the run before any upload is attempted.
//!
//! # Validation order
//! Fail fast, first violation wins:
//!   1. `run`/`survey-artifacts` need a non-blank tag
//!   2. thread count defaults to half the cores
//!   3. input defaults to the working directory
//!   4. `run`/`survey-artifacts` get a fresh [`OutputLayout`]
//!   5. credential falls back to `SPICE_PASS`
//!   6. every command except `survey-artifacts`/`decode-credential` needs a credential
//!   7. `run`/`upload-adgs` log a best-effort credential summary (never fatal)
//!
//! # Cleanup
//! The scratch directory, the surveyor log-level environment and the drained
//! stdin file are all held by drop guards, so they are released whether the
//! engine call succeeds, fails or panics.

use crate::config::{available_cores, resolve_thread_count, Command, Configuration};
use crate::contract::{AdgUploadRequest, DeploymentEventsRequest, SurveyRequest, Surveyor, Uploader};
use crate::credential::{Credential, CredentialInspector, DecodedCredential};
use crate::engine_log::EngineLogLevelGuard;
use crate::engines::CREDENTIAL_ENV;
use crate::error::OrchestratorError;
use crate::layout::{default_base_dir, OutputLayout, ScratchGuard};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What one invocation produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub command: Command,
    pub layout: Option<OutputLayout>,
    pub credential: Option<DecodedCredential>,
}

type CredentialLookup = Box<dyn Fn() -> Option<String> + Send + Sync>;
type EventSource = Box<dyn Read + Send>;

pub struct Orchestrator<S, U> {
    surveyor: S,
    uploader: U,
    credential_env: CredentialLookup,
    base_dir: Option<PathBuf>,
    available_cores: usize,
    events: Option<EventSource>,
}

impl<S, U> Orchestrator<S, U>
where
    S: Surveyor,
    U: Uploader,
{
    pub fn new(surveyor: S, uploader: U) -> Self {
        Orchestrator {
            surveyor,
            uploader,
            credential_env: Box::new(|| std::env::var(CREDENTIAL_ENV).ok()),
            base_dir: None,
            available_cores: available_cores(),
            events: None,
        }
    }

    /// Replace the `SPICE_PASS` lookup.
    pub fn with_credential_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.credential_env = Box::new(lookup);
        self
    }

    /// Base directory used when no `--output` is given, instead of the process default.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_available_cores(mut self, cores: usize) -> Self {
        self.available_cores = cores;
        self
    }

    /// Stream read by `upload-deployment-events` in place of standard input.
    pub fn with_event_source(mut self, source: impl Read + Send + 'static) -> Self {
        self.events = Some(Box::new(source));
        self
    }

    pub fn run(&mut self, mut config: Configuration) -> Result<RunReport, OrchestratorError> {
        let command = config.command;
        info!(command = %command, "Starting command");

        if command.surveys() && config.tag().is_none() {
            return Err(OrchestratorError::MissingTag(command));
        }

        let threads = resolve_thread_count(config.thread_count, self.available_cores);
        if config.thread_count.is_none() {
            info!(
                threads,
                available_cores = self.available_cores,
                "No thread count given, using half the available cores"
            );
        }
        config.thread_count = Some(threads);

        if config.input_path.is_none() {
            let cwd = std::env::current_dir()
                .map_err(|e| OrchestratorError::io("Failed to read current directory", e))?;
            debug!(input = %cwd.display(), "No input given, using current directory");
            config.input_path = Some(cwd);
        }

        let layout = if command.surveys() {
            let base = match (&config.output_path, &self.base_dir) {
                (Some(output), _) => output.clone(),
                (None, Some(base)) => base.clone(),
                (None, None) => default_base_dir().to_path_buf(),
            };
            let layout = OutputLayout::create(&base).map_err(|e| {
                OrchestratorError::io(format!("Failed to create output layout in {}", base.display()), e)
            })?;
            Some(layout)
        } else {
            None
        };
        // Held from here so every later failure still removes the scratch dir.
        let mut scratch = layout.as_ref().map(OutputLayout::scratch_guard);

        if config.credential().is_none() {
            config.credential = (self.credential_env)().map(Credential::new);
        }

        if command.requires_credential() && config.credential().is_none() {
            return Err(OrchestratorError::MissingCredential(command));
        }

        let mut report = RunReport {
            command,
            layout: layout.clone(),
            credential: None,
        };

        if matches!(command, Command::Run | Command::UploadAdgs) {
            if let Some(credential) = config.credential() {
                report.credential = log_credential_summary(credential);
            }
        }

        config.trace_loaded();

        match command {
            Command::SurveyArtifacts => {
                self.survey(&config, expect_layout(&layout)?, scratch.take())?;
            }
            Command::UploadAdgs => {
                let source = config.input_path.clone().unwrap_or_default();
                self.upload_adgs(&config, &source, config.output_path.clone())?;
            }
            Command::UploadDeploymentEvents => {
                self.upload_deployment_events(&config)?;
            }
            Command::DecodeCredential => {
                report.credential = Some(self.decode_credential(&config)?);
            }
            Command::Run => {
                let layout = expect_layout(&layout)?;
                self.survey(&config, layout, scratch.take())?;
                self.upload_adgs(
                    &config,
                    &layout.survey_output_dir,
                    Some(layout.invocation_dir.clone()),
                )?;
            }
        }

        info!(command = %command, "Command completed");
        Ok(report)
    }

    fn survey(
        &self,
        config: &Configuration,
        layout: &OutputLayout,
        _scratch: Option<ScratchGuard>,
    ) -> Result<(), OrchestratorError> {
        info!(output = %layout.survey_output_dir.display(), "Surveying artifacts");
        if let Some(tag_json) = &config.tag_json {
            if serde_json::from_str::<serde_json::Value>(tag_json).is_err() {
                warn!(tag_json = %tag_json, "--tag-json is not valid JSON, passing it through unchanged");
            }
        }

        let request = SurveyRequest {
            payload: config.input_path.clone().unwrap_or_default(),
            output: layout.survey_output_dir.clone(),
            threads: config.thread_count.unwrap_or(1),
            max_records: config.max_records(),
            tag: config.tag().unwrap_or_default().to_string(),
            tag_json: config.tag_json.clone(),
            use_static_metadata: config.static_metadata(),
            temp_dir: layout.scratch_dir.clone(),
            extra_args: config.extra_surveyor_args.clone(),
            log_level: config.log_level,
        };

        // Locals drop before parameters: the log level is restored, then scratch goes.
        let _log_level = EngineLogLevelGuard::apply(config.log_level);
        self.surveyor.survey(&request).map_err(|source| {
            error!(error = %source, "Surveyor failed");
            OrchestratorError::EngineFailure {
                stage: "survey",
                source,
            }
        })?;
        info!(output = %layout.survey_output_dir.display(), "Survey complete");
        Ok(())
    }

    fn upload_adgs(
        &self,
        config: &Configuration,
        source_dir: &Path,
        output_dir: Option<PathBuf>,
    ) -> Result<(), OrchestratorError> {
        info!(source = %source_dir.display(), "Uploading ADGs");
        let credential = config
            .credential()
            .cloned()
            .ok_or(OrchestratorError::MissingCredential(config.command))?;
        let request = AdgUploadRequest {
            credential,
            source_dir: source_dir.to_path_buf(),
            output_dir,
            extra_args: config.extra_uploader_args.clone(),
        };
        self.uploader.upload_adgs(&request).map_err(|source| {
            error!(error = %source, "ADG upload failed");
            OrchestratorError::EngineFailure {
                stage: "upload-adgs",
                source,
            }
        })?;
        info!("ADG upload complete");
        Ok(())
    }

    fn upload_deployment_events(&mut self, config: &Configuration) -> Result<(), OrchestratorError> {
        info!("Uploading deployment events");
        let credential = config
            .credential()
            .cloned()
            .ok_or(OrchestratorError::MissingCredential(config.command))?;

        // Removed when dropped, including on early return.
        let mut events_file = tempfile::Builder::new()
            .prefix("deploy-events-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| OrchestratorError::io("Failed to create deployment events file", e))?;

        let copied = match self.events.as_mut() {
            Some(source) => io::copy(source, &mut events_file),
            None => io::copy(&mut io::stdin().lock(), &mut events_file),
        }
        .and_then(|n| events_file.flush().map(|_| n))
        .map_err(|e| OrchestratorError::io("Failed to read deployment events from stdin", e))?;
        debug!(bytes = copied, path = %events_file.path().display(), "Deployment events staged");

        let request = DeploymentEventsRequest {
            credential,
            events_file: events_file.path().to_path_buf(),
        };
        let result = self.uploader.upload_deployment_events(&request);

        let path = events_file.path().to_path_buf();
        if let Err(e) = events_file.close() {
            warn!(error = ?e, path = %path.display(), "Failed to delete deployment events file");
        }

        result.map_err(|source| {
            error!(error = %source, "Deployment events upload failed");
            OrchestratorError::EngineFailure {
                stage: "upload-deployment-events",
                source,
            }
        })?;
        info!("Deployment events upload complete");
        Ok(())
    }

    fn decode_credential(&self, config: &Configuration) -> Result<DecodedCredential, OrchestratorError> {
        let credential = config
            .credential()
            .ok_or(OrchestratorError::MissingCredential(config.command))?;
        let inspector = CredentialInspector::decode(credential.expose())?;
        inspector.print_full_info();
        Ok(inspector.summary())
    }
}

/// Pre-run diagnostics. A token that cannot be decoded is reported and ignored.
fn log_credential_summary(credential: &Credential) -> Option<DecodedCredential> {
    match CredentialInspector::decode(credential.expose()) {
        Ok(inspector) => {
            let summary = inspector.summary();
            info!(
                project_id = summary.project_id.as_deref().unwrap_or("(none)"),
                expires_at = %summary
                    .expires_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "(none)".to_string()),
                status = %summary.status,
                "SPICE_PASS"
            );
            Some(summary)
        }
        Err(e) => {
            warn!(error = %e, "Could not decode SPICE_PASS for diagnostics, continuing");
            None
        }
    }
}

fn expect_layout(layout: &Option<OutputLayout>) -> Result<&OutputLayout, OrchestratorError> {
    layout.as_ref().ok_or_else(|| {
        OrchestratorError::io(
            "Output layout was not prepared",
            io::Error::new(io::ErrorKind::NotFound, "missing output layout"),
        )
    })
}
