//! Library-level runs with the production collaborators.

use std::time::Duration;

use fullupdate_cli::archive::NativeExtractor;
use fullupdate_cli::container::ScriptContainerBuilder;
use fullupdate_cli::core::{StageFailure, UpdateError};
use fullupdate_cli::pipeline::{FullUpdatePipeline, Stage};
use fullupdate_cli::signing::MarSigner;
use fullupdate_cli::test_utils::{WorkdirFixture, init_test_logging};

use crate::common::{FakeTools, LISTING_BUILD_TOOL, SLOW_BUILD_TOOL};

fn production_pipeline(
    tools: &FakeTools,
    build_timeout: Option<Duration>,
) -> FullUpdatePipeline<NativeExtractor, ScriptContainerBuilder, MarSigner> {
    FullUpdatePipeline::new(
        NativeExtractor,
        ScriptContainerBuilder::new(tools.build_tool(), tools.mar()).with_timeout(build_timeout),
        MarSigner::new(tools.mar()).with_timeout(Some(Duration::from_secs(30))),
    )
}

#[tokio::test]
async fn test_zip_installer_with_spaces() {
    init_test_logging(None);
    let fixture = WorkdirFixture::new("app").unwrap();
    fixture
        .add_installer("App.zip", &[("App 25.8/program files/app.exe", "MZ"), ("App 25.8/readme.txt", "hi")])
        .unwrap();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);

    let report = production_pipeline(&tools, None)
        .run(&fixture.request("win", "https://example.org/builds"))
        .await
        .unwrap();

    assert_eq!(report.completed, Stage::ALL);
    let content = std::fs::read_to_string(&report.container).unwrap();
    assert_eq!(content, "./program_files/app.exe\n./readme.txt\nSIGNED:release");
    assert_eq!(report.metadata.url, "https://example.org/builds/win-complete.mar");
}

#[tokio::test]
async fn test_timeout_reports_stage() {
    let fixture = WorkdirFixture::new("app").unwrap();
    fixture.add_installer("app.tar.gz", &[("app/file", "x")]).unwrap();
    let tools = FakeTools::new(SLOW_BUILD_TOOL);

    let err = production_pipeline(&tools, Some(Duration::from_secs(1)))
        .run(&fixture.request("update", "https://h"))
        .await
        .unwrap_err();

    let failure = err.downcast_ref::<StageFailure>().unwrap();
    assert_eq!(failure.stage, Stage::BuildContainer);
    assert_eq!(failure.last_completed, Some(Stage::Extract));
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::ToolTimedOut { .. })
    ));
    assert!(tools.mar_invocations().is_empty());

    // Nothing the build tool started may write the container after the failure.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!fixture.update_dir().join("update-complete.mar").exists());
}

#[tokio::test]
async fn test_rerun_does_not_republish_previous_container() {
    let fixture = WorkdirFixture::new("app").unwrap();
    fixture.add_installer("app.tar.gz", &[("app/file", "x")]).unwrap();
    let request = fixture.request("update", "https://h");

    let first = FakeTools::new(LISTING_BUILD_TOOL);
    production_pipeline(&first, None).run(&request).await.unwrap();
    assert!(fixture.update_dir().join("update-complete.mar").is_file());

    // Second build tool exits 0 without writing a container.
    let second = FakeTools::new("#!/bin/sh\nexit 0\n");
    let err = production_pipeline(&second, None).run(&request).await.unwrap_err();

    let failure = err.downcast_ref::<StageFailure>().unwrap();
    assert_eq!(failure.stage, Stage::BuildContainer);
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::ArtifactMissing { .. })
    ));
    assert!(!fixture.update_dir().join("update-complete.mar").exists());
    assert!(second.mar_invocations().is_empty());
}
