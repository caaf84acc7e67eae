// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::fixtures::{FakeConfirm, FakePackages, PackageCall};

fn cmd(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

#[rstest]
#[case("org.example.Editor", true)]
#[case("org.example.Editor//stable", true)]
#[case("a.b.c", true)]
#[case("com.example", false)]
#[case("./org.example.Editor", false)]
#[case("python3.11", false)]
#[case("ls", false)]
fn test_looks_like_application(#[case] program: &str, #[case] expected: bool) {
    assert_eq!(looks_like_application(program), expected);
}

#[rstest]
#[tokio::test]
async fn test_plain_command_is_not_queried() {
    let packages = FakePackages::new();
    let confirm = FakeConfirm::answering(false);

    let kind = classify(&cmd(&["ls", "-l"]), &packages, &confirm).await.unwrap();
    assert_eq!(kind, CommandKind::Plain);
    assert!(packages.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_installed_application_is_managed() {
    let packages =
        FakePackages::new().with_app("org.example.Editor", "editor", "org.example.Sdk");
    let confirm = FakeConfirm::answering(false);

    let kind = classify(&cmd(&["org.example.Editor", "file.txt"]), &packages, &confirm)
        .await
        .unwrap();

    match kind {
        CommandKind::Managed { app_id, metadata } => {
            assert_eq!(app_id, "org.example.Editor");
            assert_eq!(metadata.command, "editor");
        }
        other => panic!("Expected a managed command, got: {:?}", other),
    }
    assert_eq!(
        packages.calls(),
        vec![PackageCall::AppMetadata("org.example.Editor".to_string())]
    );
    assert!(confirm.asked().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_unknown_application_confirmed_as_plain() {
    let packages = FakePackages::new();
    let confirm = FakeConfirm::answering(true);

    let kind = classify(&cmd(&["org.example.Missing"]), &packages, &confirm)
        .await
        .unwrap();
    assert_eq!(kind, CommandKind::Plain);
    assert_eq!(confirm.asked().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_unknown_application_refused() {
    let packages = FakePackages::new();
    let confirm = FakeConfirm::answering(false);

    let result = classify(&cmd(&["org.example.Missing"]), &packages, &confirm).await;
    match result {
        Err(crate::Error::AmbiguousCommand(program)) => {
            assert_eq!(program, "org.example.Missing")
        }
        other => panic!("Expected AmbiguousCommand, got: {:?}", other),
    }
}

#[rstest]
#[tokio::test]
async fn test_unknown_application_without_terminal_is_refused() {
    let packages = FakePackages::new();
    let confirm = FakeConfirm::non_interactive();

    let result = classify(&cmd(&["org.example.Missing"]), &packages, &confirm).await;
    assert!(matches!(result, Err(crate::Error::AmbiguousCommand(_))));
    assert_eq!(confirm.asked().len(), 1);
}

#[rstest]
fn test_plain_invocation() {
    let env: EnvSnapshot = [("ENVE_ID", "demo")].into_iter().collect();
    let invocation = plain_invocation(&cmd(&["make", "all"]), None, env.clone());
    assert_eq!(invocation.command_line(), vec!["make", "all"]);
    assert_eq!(invocation.env, Some(env));
}

#[rstest]
fn test_plain_invocation_through_wrapper() {
    let invocation = plain_invocation(
        &cmd(&["make", "all"]),
        Some(Path::new("/usr/lib/sdk/enve/bin/run")),
        EnvSnapshot::default(),
    );
    assert_eq!(
        invocation.command_line(),
        vec!["/usr/lib/sdk/enve/bin/run", "make", "all"]
    );
}
