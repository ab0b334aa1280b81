// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn state_file_name_is_deterministic() {
    let root = Path::new("/home/dev/project");
    assert_eq!(state_file_name(root), state_file_name(root));
}

#[test]
fn state_file_name_is_twelve_hex_chars() {
    let name = state_file_name(Path::new("/home/dev/project"));
    let stem = name.strip_suffix(".json").unwrap();
    assert_eq!(stem.len(), 12);
    assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn different_roots_get_different_names() {
    assert_ne!(
        state_file_name(Path::new("/home/dev/a")),
        state_file_name(Path::new("/home/dev/b"))
    );
}

#[test]
fn own_pid_is_alive() {
    assert!(pid_alive(std::process::id()));
}

#[test]
fn absurd_pid_is_dead() {
    assert!(!pid_alive(0x3FFF_FFF0));
}

#[test]
fn state_file_serializes_camel_case() {
    let snapshot = StateFile {
        pid: 42,
        config_path: PathBuf::from("/p/rig.toml"),
        project_root: PathBuf::from("/p"),
        updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        services: BTreeMap::from([(
            "api".to_string(),
            ServiceEntry {
                status: ServiceStatus::Running,
                error: None,
                started_at: Some(1_000),
            },
        )]),
        logs: BTreeMap::from([("api".to_string(), vec!["hi".to_string()])]),
    };
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["configPath"], "/p/rig.toml");
    assert_eq!(json["projectRoot"], "/p");
    assert_eq!(json["updatedAt"], "2026-01-01T00:00:00+00:00");
    assert_eq!(json["services"]["api"]["status"], "running");
    assert_eq!(json["services"]["api"]["startedAt"], 1_000);
    assert!(json["services"]["api"].get("error").is_none());
    assert_eq!(json["logs"]["api"][0], "hi");
}

#[test]
fn read_roundtrip() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state.json");
    let snapshot = StateFile {
        pid: std::process::id(),
        config_path: PathBuf::from("/p/rig.toml"),
        project_root: PathBuf::from("/p"),
        updated_at: Utc::now().to_rfc3339(),
        services: BTreeMap::new(),
        logs: BTreeMap::new(),
    };
    write_json(&path, &snapshot).unwrap();

    let parsed = read_state_file(&path).unwrap();
    assert_eq!(parsed.pid, snapshot.pid);
    assert!(!parsed.is_stale());
}

#[test]
fn dead_writer_is_stale() {
    let snapshot = StateFile {
        pid: 0x3FFF_FFF0,
        config_path: PathBuf::new(),
        project_root: PathBuf::new(),
        updated_at: String::new(),
        services: BTreeMap::new(),
        logs: BTreeMap::new(),
    };
    assert!(snapshot.is_stale());
}
