use std::fs;
use std::path::Path;

use anyhow::Result;
use colrun::collection::{inject_fixture, load_collection};
use colrun::config::{load_config, resolve_base_url, RunSettingsBuilder, SettingsOverrides};
use colrun::driver::prepare_collection;
use colrun::env::{resolve_variables, Environment};
use serde_json::json;
use tempfile::tempdir;

const COLLECTION: &str = r#"{
  "info": {"name": "filevault-packagemgr-tests"},
  "item": [
    {
      "name": "packages",
      "item": [
        {
          "name": "upload package",
          "request": {
            "method": "POST",
            "url": "{{HOST}}/system/jackrabbit/filevault/api/packages",
            "body": {
              "mode": "formdata",
              "formdata": [
                {"key": "package", "type": "file", "src": "placeholder"},
                {"key": "force", "type": "text", "value": "true"}
              ]
            }
          }
        },
        {
          "name": "replace package",
          "request": {
            "method": "PUT",
            "url": "{{HOST}}/system/jackrabbit/filevault/api/packages/test",
            "body": {"mode": "file", "file": {"src": "old.zip"}}
          }
        }
      ]
    },
    {
      "name": "list packages",
      "request": {"method": "GET", "url": "{{HOST}}/system/jackrabbit/filevault/api/packages"}
    }
  ]
}"#;

#[test]
fn prepared_collection_points_uploads_at_fixture() -> Result<()> {
    let temp = tempdir()?;
    write_file(temp.path().join("suite.json"), COLLECTION)?;
    let fixture = temp.path().join("test-files").join("test-package.zip");

    let collection = prepare_collection(&temp.path().join("suite.json"), &fixture)?;
    let written = serde_json::to_value(&collection)?;
    let fixture = json!(fixture.to_string_lossy());

    assert_eq!(
        written["item"][0]["item"][0]["request"]["body"]["formdata"][0]["src"],
        fixture
    );
    assert_eq!(
        written["item"][0]["item"][0]["request"]["body"]["formdata"][1],
        json!({"key": "force", "type": "text", "value": "true"})
    );
    assert_eq!(
        written["item"][0]["item"][1]["request"]["body"]["file"]["src"],
        fixture
    );
    assert!(written["item"][1]["request"].get("body").is_none());
    Ok(())
}

#[test]
fn injecting_twice_changes_nothing_more() -> Result<()> {
    let temp = tempdir()?;
    write_file(temp.path().join("suite.json"), COLLECTION)?;
    let fixture = Path::new("/fixtures/test-package.zip");

    let mut collection = load_collection(&temp.path().join("suite.json"))?;
    let first = inject_fixture(&mut collection, fixture);
    let once = serde_json::to_value(&collection)?;
    let second = inject_fixture(&mut collection, fixture);

    assert_eq!(first, second);
    assert_eq!(first.requests_visited, 3);
    assert_eq!(first.rewritten(), 2);
    assert_eq!(serde_json::to_value(&collection)?, once);
    Ok(())
}

#[test]
fn environment_targets_the_requested_port() {
    for (port, expected) in [
        (None, "http://localhost:8080"),
        (Some("9090"), "http://localhost:9090"),
        (Some("4502"), "http://localhost:4502"),
    ] {
        let env = Environment::for_host(&resolve_base_url(port));
        assert_eq!(env.get("HOST"), Some(expected));
        assert_eq!(
            resolve_variables("{{HOST}}/packages", &env.to_map()),
            format!("{expected}/packages")
        );
    }
}

#[test]
fn config_file_drives_settings() -> Result<()> {
    let temp = tempdir()?;
    write_file(
        temp.path().join("colrun.json"),
        r#"{"collection": "suite.json", "fixture": "pkg/test.zip", "defaultPort": "4502"}"#,
    )?;

    let config = load_config(temp.path())?;
    let settings = RunSettingsBuilder::new(
        temp.path().to_path_buf(),
        config,
        SettingsOverrides {
            port: Some("9090".to_string()),
            ..SettingsOverrides::default()
        },
    )
    .build()?;

    assert_eq!(settings.base_url, "http://localhost:9090");
    assert_eq!(settings.collection, temp.path().join("suite.json"));
    assert_eq!(settings.fixture, temp.path().join("pkg/test.zip"));
    Ok(())
}

fn write_file(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}
