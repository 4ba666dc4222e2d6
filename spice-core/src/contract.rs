#![allow(unused)]

//! # contract: interfaces to the external survey and upload engines
//!
//! The surveyor turns a payload directory into ADG files; the uploader packages
//! ADGs (or deployment events) and sends them to Spice Labs. Both are external
//! programs. The orchestrator only ever talks to them through the traits below,
//! so tests can substitute `MockSurveyor` / `MockUploader`.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the mocks are exported while the
//!   `test-export-mocks` feature is on (the default) so integration tests in
//!   other crates can use them.
//!
//! ## Errors
//! - Engines report failures as boxed errors. The orchestrator wraps them in
//!   `OrchestratorError::EngineFailure` without altering the message.

use crate::config::LogLevel;
use crate::credential::Credential;
use crate::kv_args::ExtraArgs;
use mockall::{automock, predicate::*};
use std::path::PathBuf;

/// Error type for engine calls (simple boxed error, as engines are opaque).
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Everything the surveyor needs for one pass over a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRequest {
    /// Directory (or file) to survey.
    pub payload: PathBuf,
    /// Where ADG files are written.
    pub output: PathBuf,
    pub threads: u32,
    pub max_records: u32,
    pub tag: String,
    /// Optional JSON attached to the tag.
    pub tag_json: Option<String>,
    pub use_static_metadata: bool,
    /// Scratch space, removed once the survey returns.
    pub temp_dir: PathBuf,
    pub extra_args: ExtraArgs,
    /// Verbosity the surveyor's own logger should use.
    pub log_level: LogLevel,
}

/// Upload a directory of ADGs.
#[derive(Debug, Clone, PartialEq)]
pub struct AdgUploadRequest {
    pub credential: Credential,
    pub source_dir: PathBuf,
    /// Where packaged archives are staged; the uploader picks when `None`.
    pub output_dir: Option<PathBuf>,
    pub extra_args: ExtraArgs,
}

/// Upload a JSON array of deployment events stored in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentEventsRequest {
    pub credential: Credential,
    pub events_file: PathBuf,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Surveyor: Send + Sync {
    /// Survey the payload into ADG files under `req.output`.
    fn survey(&self, req: &SurveyRequest) -> Result<(), EngineError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Uploader: Send + Sync {
    /// Package and upload the ADGs found in `req.source_dir`.
    fn upload_adgs(&self, req: &AdgUploadRequest) -> Result<(), EngineError>;

    /// Upload the deployment events held in `req.events_file`.
    fn upload_deployment_events(&self, req: &DeploymentEventsRequest) -> Result<(), EngineError>;
}
