// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::spec::CommitPin;

fn extension(proxy: Option<&str>) -> ExtensionSpec {
    ExtensionSpec {
        id: "gcc".to_string(),
        flatpak_ref: "org.freedesktop.Sdk.Extension.gcc//23.08".to_string(),
        remote_source: String::new(),
        commit_pin: CommitPin::Unpinned,
        id_alias: String::new(),
        install_path: PathBuf::new(),
        proxy_env: proxy.map(String::from),
        variables: Vec::new(),
    }
}

#[rstest]
fn test_parse_app_metadata() {
    let keyfile = r#"
[Application]
name=org.example.Editor
runtime=org.freedesktop.Platform/x86_64/23.08
sdk=org.freedesktop.Sdk/x86_64/23.08
command=editor-wrapper

[Context]
shared=network;ipc;
"#;
    let metadata = parse_app_metadata(keyfile).expect("Should parse metadata");
    assert_eq!(metadata.command, "editor-wrapper");
    assert_eq!(
        metadata.launch_runtime(),
        Some("org.freedesktop.Sdk/x86_64/23.08")
    );
}

#[rstest]
fn test_parse_app_metadata_without_command() {
    let keyfile = "[Runtime]\nname=org.freedesktop.Platform\n";
    assert!(parse_app_metadata(keyfile).is_none());
}

#[rstest]
fn test_runtime_used_without_sdk() {
    let metadata = parse_app_metadata("[Application]\ncommand=app\nruntime=rt\n").unwrap();
    assert_eq!(metadata.launch_runtime(), Some("rt"));
}

#[rstest]
fn test_queries_do_not_carry_proxies() {
    let env: EnvSnapshot = [("https_proxy", "http://proxy:3128")].into_iter().collect();
    let host = FlatpakHost::new("flatpak-spawn", &env);
    let args = host.host_args(None, &["info", "--show-origin", "x.y.z"]);
    assert_eq!(args, vec!["--host", "flatpak", "info", "--show-origin", "x.y.z"]);
}

#[rstest]
fn test_network_operations_forward_proxies() {
    let env: EnvSnapshot = [("HTTPS_PROXY", "http://proxy:3128"), ("HOME", "/home/me")]
        .into_iter()
        .collect();
    let host = FlatpakHost::new("flatpak-spawn", &env);
    let ext = extension(Some("http://ext-proxy:8080"));
    let args = host.host_args(Some(&ext), &["install"]);
    assert_eq!(
        args,
        vec![
            "--host",
            "--env=HTTPS_PROXY=http://proxy:3128",
            "--env=http_proxy=http://ext-proxy:8080",
            "--env=https_proxy=http://ext-proxy:8080",
            "flatpak",
            "install",
        ]
    );
}

#[rstest]
fn test_indent() {
    assert_eq!(indent("a\nb\n", "  "), "  a\n  b");
    assert_eq!(CommandOutcome::default().indented_stderr(), "");
}

#[rstest]
fn test_outcome_success() {
    let ok = CommandOutcome {
        code: Some(0),
        ..Default::default()
    };
    let failed = CommandOutcome {
        code: Some(1),
        ..Default::default()
    };
    let killed = CommandOutcome::default();
    assert!(ok.success());
    assert!(!failed.success());
    assert!(!killed.success());
}
