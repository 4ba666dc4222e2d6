use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use spice_core::credential::{Credential, CredentialError, CredentialInspector, CredentialStatus};

fn make_token(claims: serde_json::Value) -> String {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        URL_SAFE_NO_PAD.encode("not-a-real-signature")
    )
}

#[test]
fn test_project_id_prefers_x_uuid_project() {
    let token = make_token(json!({
        "x-uuid-project": "uuid-1",
        "project_id": "pid-2",
        "projectId": "pid-3"
    }));
    let inspector = CredentialInspector::decode(&token).expect("token should decode");

    assert_eq!(inspector.project_id().as_deref(), Some("uuid-1"));
}

#[test]
fn test_project_id_falls_back_through_claim_names() {
    let null_first = make_token(json!({ "x-uuid-project": null, "project_id": "pid-2" }));
    let camel_only = make_token(json!({ "projectId": "pid-3" }));
    let none = make_token(json!({ "sub": "someone" }));

    assert_eq!(
        CredentialInspector::decode(&null_first).unwrap().project_id().as_deref(),
        Some("pid-2")
    );
    assert_eq!(
        CredentialInspector::decode(&camel_only).unwrap().project_id().as_deref(),
        Some("pid-3")
    );
    assert_eq!(CredentialInspector::decode(&none).unwrap().project_id(), None);
}

#[test]
fn test_status_without_expiry_is_no_expiration() {
    let inspector = CredentialInspector::decode(&make_token(json!({ "sub": "a" }))).unwrap();

    assert_eq!(inspector.expires_at(), None);
    assert_eq!(inspector.status(), CredentialStatus::NoExpiration);
    assert_eq!(inspector.status().to_string(), "No expiration");
}

#[test]
fn test_status_boundaries() {
    let now: DateTime<Utc> = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
    let inspector =
        CredentialInspector::decode(&make_token(json!({ "exp": 1_750_000_000 }))).unwrap();

    assert_eq!(inspector.status_at(now), CredentialStatus::Expired, "expiring now is expired");
    assert_eq!(
        inspector.status_at(now - Duration::seconds(1)),
        CredentialStatus::Valid
    );
    assert_eq!(
        inspector.status_at(now + Duration::seconds(1)),
        CredentialStatus::Expired
    );
    assert_eq!(CredentialStatus::Expired.to_string(), "EXPIRED");
}

#[test]
fn test_future_expiry_is_valid_now() {
    let exp = (Utc::now() + Duration::days(30)).timestamp();
    let inspector = CredentialInspector::decode(&make_token(json!({ "exp": exp }))).unwrap();

    assert_eq!(inspector.status(), CredentialStatus::Valid);
    assert_eq!(inspector.expires_at().map(|t| t.timestamp()), Some(exp));
}

#[test]
fn test_decode_rejects_malformed_tokens() {
    assert!(matches!(
        CredentialInspector::decode("   "),
        Err(CredentialError::Blank)
    ));
    assert!(matches!(
        CredentialInspector::decode("only.two"),
        Err(CredentialError::SegmentCount(2))
    ));
    assert!(matches!(
        CredentialInspector::decode("***.***.***"),
        Err(CredentialError::Encoding { .. })
    ));
    let not_json = format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode("{}"),
        URL_SAFE_NO_PAD.encode("plain text")
    );
    assert!(matches!(
        CredentialInspector::decode(&not_json),
        Err(CredentialError::Json { segment: "payload", .. })
    ));
}

#[test]
fn test_full_info_lists_standard_and_custom_claims() {
    let token = make_token(json!({
        "iss": "spicelabs",
        "sub": "ci-bot",
        "aud": ["ingest", "upload"],
        "iat": 1_700_000_000,
        "nbf": 1_700_000_000,
        "project_id": "p-42",
        "roles": ["writer"]
    }));
    let lines = CredentialInspector::decode(&token).unwrap().full_info_lines();

    assert!(lines.contains(&"  Algorithm: HS256".to_string()));
    assert!(lines.contains(&"  Type: JWT".to_string()));
    assert!(lines.contains(&"  Issuer: spicelabs".to_string()));
    assert!(lines.contains(&"  Subject: ci-bot".to_string()));
    assert!(lines.contains(&"  Project ID: p-42".to_string()));
    assert!(lines.contains(&"  Status: No expiration".to_string()));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("  Issued At: 1700000000 (2023-11-14T22:13:20")));
    assert!(lines.iter().any(|l| l.starts_with("  Not Before: 1700000000")));
    assert!(!lines.iter().any(|l| l.starts_with("  Expires At")));
    assert!(lines.contains(&"  roles: [\"writer\"]".to_string()));
    assert!(lines.contains(&"  aud: [\"ingest\",\"upload\"]".to_string()));
}

#[test]
fn test_summary_collects_all_claims() {
    let token = make_token(json!({ "a": 1, "b": "two", "c": null }));
    let summary = CredentialInspector::decode(&token).unwrap().summary();

    assert_eq!(
        summary.all_claims,
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "two".to_string()),
            ("c".to_string(), "null".to_string()),
        ]
    );
}

#[test]
fn test_credential_debug_is_redacted() {
    let credential = Credential::new("super-secret-token");
    let rendered = format!("{credential:?}");

    assert!(!rendered.contains("super-secret-token"));
    assert!(rendered.contains("redacted"));
}
