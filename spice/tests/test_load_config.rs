use spice::cli::Cli;
use spice::load_config::{load_config, CliConfig};
use spice_core::config::{Command, LogLevel};
use std::fs::write;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[test]
fn test_load_config_full_schema() {
    let file = config_file(
        r#"
surveyor:
  command: [java, -jar, /opt/goatrodeo.jar]
  args:
    blockList: /etc/bl
    fetchMetadata: true
uploader:
  command: [ginger]
  args:
    --encrypt-only: "true"
threads: 4
max_records: 250
log_level: WARNING
use_static_metadata: false
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.surveyor_command, ["java", "-jar", "/opt/goatrodeo.jar"]);
    let surveyor_args: Vec<_> = config.surveyor_args.iter().collect();
    assert_eq!(surveyor_args, [("blockList", "/etc/bl"), ("fetchMetadata", "true")]);
    assert_eq!(config.uploader_command, ["ginger"]);
    assert_eq!(config.uploader_args.get("--encrypt-only"), Some("true"));
    assert_eq!(config.threads, Some(4));
    assert_eq!(config.max_records, Some(250));
    assert_eq!(config.log_level, Some(LogLevel::Warn));
    assert_eq!(config.use_static_metadata, Some(false));
}

#[test]
fn test_load_config_missing_sections_use_defaults() {
    let file = config_file("threads: 2\n");
    let config = load_config(file.path()).expect("Config should load");
    assert_eq!(
        config,
        CliConfig {
            threads: Some(2),
            ..CliConfig::default()
        }
    );
    assert_eq!(config.surveyor_command, ["goatrodeo"]);
    assert_eq!(config.uploader_command, ["ginger"]);

    let empty = config_file("");
    assert_eq!(load_config(empty.path()).unwrap(), CliConfig::default());
}

#[test]
fn test_load_config_rejects_bad_input() {
    let cases = [
        ("surveyor:\n  comand: [x]\n", "Failed to parse config YAML"),
        ("log_level: loud\n", "Invalid log_level"),
        ("uploader:\n  command: []\n", "uploader.command must not be empty"),
        ("surveyor:\n  args:\n    nested: [1, 2]\n", "surveyor.args.nested"),
        ("threads: 0\n", "threads must be at least 1"),
        ("max_records: 0\n", "max_records must be at least 1"),
    ];
    for (yaml, expected) in cases {
        let file = config_file(yaml);
        let err = load_config(file.path()).expect_err(yaml);
        assert!(
            err.to_string().contains(expected),
            "{yaml:?}: expected {expected:?} in {err}"
        );
    }
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/nonexistent/spice.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_flags_take_precedence_over_file() {
    use clap::Parser;

    let file = config_file(
        r#"
surveyor:
  args: { blockList: /etc/bl, depth: "3" }
threads: 4
max_records: 100
log_level: error
use_static_metadata: false
"#,
    );
    let cli = Cli::try_parse_from([
        "spice",
        "--command",
        "Survey_Artifacts",
        "--tag",
        "t",
        "--threads",
        "8",
        "--surveyor-args",
        "depth=5,verbose",
        "--config",
        file.path().to_str().unwrap(),
    ])
    .expect("flags parse");

    let loaded = cli.file_config().unwrap();
    let config = cli.configuration(&loaded);

    assert_eq!(config.command, Command::SurveyArtifacts);
    assert_eq!(config.thread_count, Some(8));
    assert_eq!(config.max_records_per_batch, Some(100));
    assert_eq!(config.use_static_metadata, Some(false));
    assert_eq!(config.log_level, LogLevel::Error);
    let args: Vec<_> = config.extra_surveyor_args.iter().collect();
    assert_eq!(args, [("blockList", "/etc/bl"), ("depth", "5"), ("verbose", "true")]);
    assert!(config.credential.is_none());
}

#[test]
fn test_defaults_without_config() {
    use clap::Parser;

    let cli = Cli::try_parse_from(["spice"]).expect("no flags parse");
    assert_eq!(cli.command, Command::Run);
    let config = cli.configuration(&CliConfig::default());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.thread_count.is_none());
    assert!(config.extra_uploader_args.is_empty());
}
