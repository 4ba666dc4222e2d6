use crate::config::Command;
use crate::contract::EngineError;
use crate::credential::CredentialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("--tag must be set for command: {0}")]
    MissingTag(Command),

    #[error("SPICE_PASS must be set via the SPICE_PASS env var or --credential for command: {0}")]
    MissingCredential(Command),

    #[error("SPICE_PASS could not be decoded: {0}")]
    InvalidCredentialFormat(#[from] CredentialError),

    #[error("Invalid command: {token}, expected one of {expected:?}")]
    UnknownCommandToken {
        token: String,
        expected: Vec<&'static str>,
    },

    #[error("Invalid log level: {0}, expected one of all|trace|debug|info|warn|error|fatal|off")]
    UnknownLogLevel(String),

    #[error("{stage} failed: {source}")]
    EngineFailure {
        stage: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("{context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        OrchestratorError::IoFailure {
            context: context.into(),
            source,
        }
    }

    /// User-input problems: reported with a short message and a help hint, never a trace.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OrchestratorError::MissingTag(_)
                | OrchestratorError::MissingCredential(_)
                | OrchestratorError::UnknownCommandToken { .. }
                | OrchestratorError::UnknownLogLevel(_)
        )
    }
}
