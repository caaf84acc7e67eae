// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.app_id, "dev.enve.sh");
    assert_eq!(
        settings.base_config(),
        PathBuf::from("/usr/lib/sdk/enve/etc/enve.jsonnet")
    );
    assert_eq!(settings.library_paths(), vec![PathBuf::from("/usr/lib/sdk/enve/etc")]);
    assert_eq!(settings.launcher(), PathBuf::from("/usr/lib/sdk/enve/bin/enve"));
    assert!(settings.command_wrapper.is_none());
}

#[rstest]
fn test_partial_settings_follow_root() {
    let settings = Settings::from_yaml("root: /opt/enve\n", Path::new("s.yaml")).unwrap();
    assert_eq!(settings.base_config(), PathBuf::from("/opt/enve/etc/enve.jsonnet"));
    assert_eq!(settings.launcher(), PathBuf::from("/opt/enve/bin/enve"));
    assert_eq!(settings.jsonnet, PathBuf::from("jsonnet"));
}

#[rstest]
fn test_empty_file_is_default() {
    let settings = Settings::from_yaml("\n", Path::new("s.yaml")).unwrap();
    assert_eq!(settings, Settings::default());
}

#[rstest]
fn test_unknown_field_is_rejected() {
    let result = Settings::from_yaml("rooot: /opt\n", Path::new("s.yaml"));
    assert!(matches!(result, Err(crate::Error::InvalidSettings { .. })));
}

#[rstest]
fn test_load_from_env_override() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("settings.yaml");
    std::fs::write(
        &path,
        "command_wrapper: /usr/lib/sdk/enve/bin/run\nlibrary_paths: [/a, /b]\n",
    )
    .unwrap();
    let env: EnvSnapshot = [(ENVE_SETTINGS_VAR, path.to_str().unwrap())]
        .into_iter()
        .collect();

    let settings = Settings::load(&env).unwrap();
    assert_eq!(
        settings.command_wrapper,
        Some(PathBuf::from("/usr/lib/sdk/enve/bin/run"))
    );
    assert_eq!(settings.library_paths(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
}

#[rstest]
fn test_missing_override_is_an_error() {
    let env: EnvSnapshot = [(ENVE_SETTINGS_VAR, "/nonexistent/enve/settings.yaml")]
        .into_iter()
        .collect();
    assert!(matches!(
        Settings::load(&env),
        Err(crate::Error::ReadFailed { .. })
    ));
}
