// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::ENVE_CONFIG_HASH_VAR;

#[rstest]
fn test_known_digest() {
    let fp = Fingerprint::of_bytes(b"");
    assert_eq!(
        fp.as_str(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[rstest]
fn test_file_fingerprint_tracks_content() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("enve.jsonnet");

    std::fs::write(&path, "{ id: { name: 'a' } }").unwrap();
    let first = Fingerprint::of_file(&path).unwrap();
    assert_eq!(first, Fingerprint::of_file(&path).unwrap());

    std::fs::write(&path, "{ id: { name: 'b' } }").unwrap();
    assert_ne!(first, Fingerprint::of_file(&path).unwrap());
}

#[rstest]
fn test_missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = Fingerprint::of_file(&tmp.path().join("missing"));
    assert!(matches!(result, Err(crate::Error::ReadFailed { .. })));
}

#[rstest]
fn test_matches_recorded() {
    let fp = Fingerprint::of_bytes(b"config");
    let mut env = EnvSnapshot::default();
    assert!(!fp.matches_recorded(&env));

    env.set(ENVE_CONFIG_HASH_VAR, "something-else");
    assert!(!fp.matches_recorded(&env));

    env.set(ENVE_CONFIG_HASH_VAR, fp.to_string());
    assert!(fp.matches_recorded(&env));
}
