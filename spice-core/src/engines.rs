//! Process-backed engines: run the surveyor / uploader as external programs.
//!
//! Each engine is configured with a command line prefix (program plus leading
//! arguments, e.g. `["java", "-jar", "/opt/goatrodeo.jar"]`). Request fields are
//! appended as `--flag value` pairs. The credential reaches the uploader through
//! its environment only.

use crate::contract::{
    AdgUploadRequest, DeploymentEventsRequest, EngineError, SurveyRequest, Surveyor, Uploader,
};
use crate::kv_args::ExtraArgs;
use std::ffi::OsString;
use std::process::Command;
use tracing::{debug, error, info};

pub const DEFAULT_SURVEYOR_PROGRAM: &str = "goatrodeo";
pub const DEFAULT_UPLOADER_PROGRAM: &str = "ginger";
pub const CREDENTIAL_ENV: &str = "SPICE_PASS";

#[derive(Debug, Clone)]
pub struct ProcessSurveyor {
    command: Vec<String>,
}

impl ProcessSurveyor {
    pub fn new(command: Vec<String>) -> Self {
        ProcessSurveyor { command }
    }
}

impl Default for ProcessSurveyor {
    fn default() -> Self {
        ProcessSurveyor::new(vec![DEFAULT_SURVEYOR_PROGRAM.to_string()])
    }
}

impl Surveyor for ProcessSurveyor {
    fn survey(&self, req: &SurveyRequest) -> Result<(), EngineError> {
        let mut cmd = base_command(&self.command)?;
        cmd.args(survey_arguments(req));
        run_to_completion("surveyor", cmd)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessUploader {
    command: Vec<String>,
}

impl ProcessUploader {
    pub fn new(command: Vec<String>) -> Self {
        ProcessUploader { command }
    }
}

impl Default for ProcessUploader {
    fn default() -> Self {
        ProcessUploader::new(vec![DEFAULT_UPLOADER_PROGRAM.to_string()])
    }
}

impl Uploader for ProcessUploader {
    fn upload_adgs(&self, req: &AdgUploadRequest) -> Result<(), EngineError> {
        let mut cmd = base_command(&self.command)?;
        cmd.args(adg_upload_arguments(req))
            .env(CREDENTIAL_ENV, req.credential.expose());
        run_to_completion("uploader", cmd)
    }

    fn upload_deployment_events(&self, req: &DeploymentEventsRequest) -> Result<(), EngineError> {
        let mut cmd = base_command(&self.command)?;
        cmd.args(deployment_events_arguments(req))
            .env(CREDENTIAL_ENV, req.credential.expose());
        run_to_completion("uploader", cmd)
    }
}

pub fn survey_arguments(req: &SurveyRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--payload".into(),
        req.payload.clone().into(),
        "--output".into(),
        req.output.clone().into(),
        "--threads".into(),
        req.threads.to_string().into(),
        "--max-records".into(),
        req.max_records.to_string().into(),
        "--tag".into(),
        req.tag.clone().into(),
    ];
    if let Some(tag_json) = &req.tag_json {
        args.push("--tag-json".into());
        args.push(tag_json.into());
    }
    args.push(if req.use_static_metadata {
        "--static-metadata".into()
    } else {
        "--no-static-metadata".into()
    });
    args.push("--temp-dir".into());
    args.push(req.temp_dir.clone().into());
    args.push("--log-level".into());
    args.push(req.log_level.engine_name().into());
    args.extend(extra_arguments(&req.extra_args));
    args
}

pub fn adg_upload_arguments(req: &AdgUploadRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--adg-dir".into(), req.source_dir.clone().into()];
    if let Some(output_dir) = &req.output_dir {
        args.push("--output-dir".into());
        args.push(output_dir.clone().into());
    }
    args.extend(extra_arguments(&req.extra_args));
    args
}

pub fn deployment_events_arguments(req: &DeploymentEventsRequest) -> Vec<OsString> {
    vec![
        "--deployment-events".into(),
        req.events_file.clone().into(),
    ]
}

/// `key` becomes `--key` unless it already looks like a flag.
pub fn extra_arguments(extra: &ExtraArgs) -> Vec<OsString> {
    extra
        .iter()
        .flat_map(|(key, value)| {
            let flag = if key.starts_with('-') {
                key.to_string()
            } else {
                format!("--{key}")
            };
            [OsString::from(flag), OsString::from(value)]
        })
        .collect()
}

fn base_command(command: &[String]) -> Result<Command, EngineError> {
    let (program, leading) = command
        .split_first()
        .ok_or("engine command line is empty")?;
    let mut cmd = Command::new(program);
    cmd.args(leading);
    Ok(cmd)
}

fn run_to_completion(engine: &'static str, mut cmd: Command) -> Result<(), EngineError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    info!(engine, program = %program, "Launching engine");
    debug!(engine, args = ?cmd.get_args().collect::<Vec<_>>(), "Engine arguments");

    match cmd.status() {
        Ok(status) if status.success() => {
            info!(engine, program = %program, "Engine finished successfully");
            Ok(())
        }
        Ok(status) => {
            error!(engine, program = %program, status = %status, "Engine exited with non-zero code");
            Err(format!("{engine} `{program}` exited with {status}").into())
        }
        Err(e) => {
            error!(engine, program = %program, error = ?e, "Failed to launch engine process");
            Err(format!("failed to launch {engine} `{program}`: {e}").into())
        }
    }
}
