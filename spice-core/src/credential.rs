//! # credential: diagnostic reader for SPICE_PASS bearer tokens
//!
//! A SPICE_PASS is a JWT. This module decodes its header and claims so the CLI
//! can report which project a token belongs to and whether it has expired.
//!
//! The signature is never checked. Nothing here grants or denies access; the
//! uploader and the remote service remain the authority on token validity.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Claim names probed, in order, for the project identity.
pub const PROJECT_ID_CLAIMS: [&str; 3] = ["x-uuid-project", "project_id", "projectId"];

/// Opaque bearer token. `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars redacted>)", self.0.len())
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("SPICE_PASS cannot be blank")]
    Blank,
    #[error("SPICE_PASS must have 3 dot-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("SPICE_PASS {segment} is not valid base64url: {source}")]
    Encoding {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("SPICE_PASS {segment} is not a JSON object: {reason}")]
    Json {
        segment: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CredentialStatus {
    NoExpiration,
    Valid,
    Expired,
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialStatus::NoExpiration => "No expiration",
            CredentialStatus::Valid => "Valid",
            CredentialStatus::Expired => "EXPIRED",
        })
    }
}

/// Read-only summary of a decoded credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCredential {
    pub project_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: CredentialStatus,
    pub all_claims: Vec<(String, String)>,
}

/// Decoded, unverified view over a token's header and claims.
#[derive(Debug, Clone)]
pub struct CredentialInspector {
    header: Map<String, Value>,
    claims: Map<String, Value>,
}

impl CredentialInspector {
    pub fn decode(token: &str) -> Result<Self, CredentialError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::Blank);
        }
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(CredentialError::SegmentCount(segments.len()));
        }
        Ok(CredentialInspector {
            header: decode_segment("header", segments[0])?,
            claims: decode_segment("payload", segments[1])?,
        })
    }

    pub fn algorithm(&self) -> Option<String> {
        self.header.get("alg").and_then(scalar_string)
    }

    pub fn token_type(&self) -> Option<String> {
        self.header.get("typ").and_then(scalar_string)
    }

    pub fn issuer(&self) -> Option<String> {
        self.claims.get("iss").and_then(scalar_string)
    }

    pub fn subject(&self) -> Option<String> {
        self.claims.get("sub").and_then(scalar_string)
    }

    /// `aud` may be a single string or an array of strings.
    pub fn audience(&self) -> Vec<String> {
        match self.claims.get("aud") {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
            Some(other) => scalar_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn project_id(&self) -> Option<String> {
        PROJECT_ID_CLAIMS
            .iter()
            .filter_map(|name| self.claims.get(*name))
            .find(|value| !value.is_null())
            .map(render_claim)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.numeric_date("iat")
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.numeric_date("exp")
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.numeric_date("nbf")
    }

    pub fn status(&self) -> CredentialStatus {
        self.status_at(Utc::now())
    }

    /// Expiring exactly at `now` counts as expired.
    pub fn status_at(&self, now: DateTime<Utc>) -> CredentialStatus {
        match self.expires_at() {
            None => CredentialStatus::NoExpiration,
            Some(exp) if exp <= now => CredentialStatus::Expired,
            Some(_) => CredentialStatus::Valid,
        }
    }

    pub fn all_claims(&self) -> Vec<(String, String)> {
        self.claims
            .iter()
            .map(|(name, value)| (name.clone(), render_claim(value)))
            .collect()
    }

    pub fn summary(&self) -> DecodedCredential {
        DecodedCredential {
            project_id: self.project_id(),
            expires_at: self.expires_at(),
            status: self.status(),
            all_claims: self.all_claims(),
        }
    }

    /// Human-readable report of header, standard claims, and every claim.
    pub fn full_info_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Credential header:".to_string(),
            format!("  Algorithm: {}", or_none(self.algorithm())),
            format!("  Type: {}", or_none(self.token_type())),
            "Credential claims:".to_string(),
            format!("  Issuer: {}", or_none(self.issuer())),
            format!("  Subject: {}", or_none(self.subject())),
            format!("  Audience: {:?}", self.audience()),
        ];
        if let Some(project_id) = self.project_id() {
            lines.push(format!("  Project ID: {project_id}"));
        }
        for (label, claim) in [
            ("Issued At", "iat"),
            ("Expires At", "exp"),
            ("Not Before", "nbf"),
        ] {
            if let (Some(raw), Some(instant)) = (self.claims.get(claim), self.numeric_date(claim)) {
                lines.push(format!(
                    "  {label}: {} ({})",
                    render_claim(raw),
                    instant.to_rfc3339()
                ));
            }
        }
        lines.push(format!("  Status: {}", self.status()));
        lines.push("All claims:".to_string());
        for (name, value) in self.all_claims() {
            lines.push(format!("  {name}: {value}"));
        }
        lines
    }

    pub fn print_full_info(&self) {
        for line in self.full_info_lines() {
            info!("{line}");
        }
    }

    fn numeric_date(&self, claim: &str) -> Option<DateTime<Utc>> {
        let seconds = match self.claims.get(claim)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            _ => return None,
        };
        DateTime::from_timestamp(seconds, 0)
    }
}

fn decode_segment(segment: &'static str, encoded: &str) -> Result<Map<String, Value>, CredentialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|source| CredentialError::Encoding { segment, source })?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CredentialError::Json {
            segment,
            reason: format!("expected object, found {other}"),
        }),
        Err(e) => Err(CredentialError::Json {
            segment,
            reason: e.to_string(),
        }),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(render_claim(other)),
    }
}

fn render_claim(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn or_none(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(none)".to_string())
}
