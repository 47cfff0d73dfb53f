use std::fs;
use std::path::PathBuf;

use hot_topics_infra::Template;
use serde_json::Value;

/// Set to rewrite the approved templates from the current synthesis.
pub const UPDATE_SNAPSHOTS_ENV: &str = "HOT_TOPICS_UPDATE_SNAPSHOTS";

fn snapshot_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
        .join(format!("{name}.template.json"))
}

/// Compares `template` structurally against `tests/snapshots/{name}.template.json`.
pub fn assert_matches_snapshot(template: &Template, name: &str) {
    let path = snapshot_path(name);
    if std::env::var_os(UPDATE_SNAPSHOTS_ENV).is_some() {
        let mut body = template.to_json_pretty();
        body.push('\n');
        fs::write(&path, body).expect("snapshot should be written");
        return;
    }

    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("failed to read snapshot '{}': {error}", path.display()));
    let approved: Value = serde_json::from_str(&raw).expect("snapshot should be valid JSON");
    assert_eq!(
        template.to_json(),
        approved,
        "template drifted from '{}'; rerun with {UPDATE_SNAPSHOTS_ENV}=1 to approve the change",
        path.display()
    );
}
