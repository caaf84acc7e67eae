// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn create_config(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "{ id: { name: 'test' } }").expect("Failed to write config file");
    dunce::canonicalize(path).unwrap()
}

#[rstest]
fn test_explicit_path_wins() {
    let tmp = TempDir::new().unwrap();
    let explicit = create_config(tmp.path(), "custom.jsonnet");
    let env_config = create_config(tmp.path(), "env.jsonnet");
    create_config(tmp.path(), ENVE_FILENAME);

    let found = locate_config(
        Some("custom.jsonnet"),
        Some(env_config.to_str().unwrap()),
        tmp.path(),
        Path::new("/nonexistent/base.jsonnet"),
    )
    .unwrap()
    .expect("Should locate config");

    assert_eq!(found.path, explicit);
    assert_eq!(found.source, ConfigSource::Explicit);
}

#[rstest]
#[case("base")]
#[case("BASE")]
fn test_base_alias(#[case] alias: &str) {
    let tmp = TempDir::new().unwrap();
    let base = create_config(tmp.path(), "enve-base.jsonnet");

    let found = locate_config(Some(alias), None, tmp.path(), &base)
        .unwrap()
        .expect("Should locate base config");

    assert_eq!(found.path, base);
    assert_eq!(found.source, ConfigSource::Base);
}

#[rstest]
fn test_environment_before_search() {
    let tmp = TempDir::new().unwrap();
    let env_config = create_config(tmp.path(), "env.jsonnet");
    create_config(tmp.path(), ENVE_FILENAME);

    let found = locate_config(
        Some(""),
        Some(env_config.to_str().unwrap()),
        tmp.path(),
        Path::new("/nonexistent"),
    )
    .unwrap()
    .expect("Should locate config");

    assert_eq!(found.path, env_config);
    assert_eq!(found.source, ConfigSource::Environment);
}

#[rstest]
fn test_relative_environment_path_uses_given_cwd() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("sub")).unwrap();
    let env_config = create_config(&tmp.path().join("sub"), "env.jsonnet");

    let found = locate_config(None, Some("sub/env.jsonnet"), tmp.path(), Path::new("/nonexistent"))
        .unwrap()
        .expect("Should locate config");

    assert_eq!(found.path, env_config);
}

#[rstest]
fn test_search_walks_up() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    let root_config = create_config(tmp.path(), ENVE_FILENAME);

    let found = locate_config(None, None, &nested, Path::new("/nonexistent"))
        .unwrap()
        .expect("Should find parent config");

    assert_eq!(found.path, root_config);
    assert_eq!(found.source, ConfigSource::Search);
}

#[rstest]
fn test_search_stops_at_closest() {
    let tmp = TempDir::new().unwrap();
    let child = tmp.path().join("child");
    std::fs::create_dir(&child).unwrap();
    create_config(tmp.path(), ENVE_FILENAME);
    let child_config = create_config(&child, ENVE_FILENAME);

    let found = locate_config(None, None, &child, Path::new("/nonexistent"))
        .unwrap()
        .expect("Should find child config");

    assert_eq!(found.path, child_config);
}

#[rstest]
fn test_missing_explicit_is_error() {
    let tmp = TempDir::new().unwrap();
    let result = locate_config(Some("missing.jsonnet"), None, tmp.path(), Path::new("/x"));
    match result {
        Err(crate::Error::ConfigNotFoundAtPath(_)) => {}
        other => panic!("Expected ConfigNotFoundAtPath, got: {:?}", other),
    }
}

#[rstest]
fn test_nothing_found() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("empty");
    std::fs::create_dir(&dir).unwrap();

    // a config somewhere above the temp dir would be found, so only assert
    // that no config inside the temp dir is reported
    let found = locate_config(None, None, &dir, Path::new("/nonexistent")).unwrap();
    if let Some(found) = found {
        assert!(!found.path.starts_with(tmp.path()));
    }
}
