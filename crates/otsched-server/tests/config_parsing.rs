use std::io::Write;

use otsched_server::config::loader::{load_config, load_config_with_default_path};
use otsched_server::StorageBackend;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"
[logging]
level = "debug"

[storage]
backend = "file"
path = "/tmp/otsched/roster.json"

[scheduler]
sweep_interval_secs = 5
max_retries = 4
emergency_duration_minutes = 90
max_duration_hours = 8.0

[preemption]
near_complete_minutes = 25
nominal_minutes = 150.0

[roster]
theatres = 4
demo_occupancy = true

[[roster.doctors]]
name = "Dr. House"
specialty = "Diagnostics"

[[roster.doctors]]
name = "Dr. Grey"
specialty = "General"
on_call = true
"#,
    );

    let cfg = load_config(file.path().to_str()).unwrap();
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.storage.backend, StorageBackend::File);
    assert_eq!(cfg.storage.path.to_str(), Some("/tmp/otsched/roster.json"));
    assert_eq!(cfg.scheduler.sweep_interval_secs, 5);
    assert_eq!(cfg.scheduler.max_retries, 4);
    assert_eq!(cfg.scheduler.emergency_duration_minutes, 90);
    assert_eq!(cfg.preemption.near_complete_minutes, 25);
    assert_eq!(cfg.preemption.nominal_minutes, 150.0);
    // unspecified scoring constants keep their defaults
    assert_eq!(cfg.preemption.near_complete_factor, 0.2);
    assert_eq!(cfg.roster.theatres, 4);
    assert!(cfg.roster.demo_occupancy);
    assert_eq!(cfg.roster.doctors.len(), 2);
    assert!(cfg.roster.doctors[1].on_call);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_with_default_path(Some(dir.path().join("absent.toml"))).unwrap();
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.roster.doctors.len(), 12);
    assert_eq!(cfg.scheduler.max_retries, 3);
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(
        r#"
[scheduler]
sweep_interval_secs = 0
"#,
    );
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("sweep_interval_secs"), "{err}");
}

#[test]
fn test_durations_above_hard_bounds_are_rejected() {
    let file = write_config(
        r#"
[scheduler]
max_duration_hours = 24.0
"#,
    );
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("max_duration_hours"), "{err}");

    let file = write_config(
        r#"
[scheduler]
emergency_duration_minutes = 4611686018427387903
"#,
    );
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("emergency_duration_minutes"), "{err}");
}

#[test]
fn test_unknown_backend_is_rejected() {
    let file = write_config(
        r#"
[storage]
backend = "postgres"
"#,
    );
    assert!(load_config(file.path().to_str()).is_err());
}

#[test]
fn test_sample_config_matches_serde_defaults() {
    // the checked-in sample must stay loadable and equal to the built-in defaults
    let sample = include_str!("../../../otsched.example.toml");
    let parsed: otsched_server::AppConfig = toml::from_str(sample).unwrap();
    assert!(parsed.validate().is_ok());

    let defaults = otsched_server::AppConfig::default();
    assert_eq!(parsed.scheduler, defaults.scheduler);
    assert_eq!(parsed.preemption, defaults.preemption);
    assert_eq!(parsed.roster, defaults.roster);
    assert_eq!(parsed.storage.backend, defaults.storage.backend);
}
