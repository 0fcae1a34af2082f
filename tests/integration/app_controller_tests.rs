/*!
 * Tests for the command-line controller wiring
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use universalsub::app_config::Config;
use universalsub::app_controller::Controller;
use universalsub::errors::{AppError, SubmitError};
use universalsub::orchestrator::{TaskOutcome, TaskRequest};
use universalsub::providers::mock::MockChatProvider;
use universalsub::segment_store::CheckpointPaths;

use crate::common;
use crate::common::mock_providers::MockTranscriber;

#[tokio::test]
async fn test_run_withMockProviders_shouldCompleteAndWriteSubtitles() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let media = common::create_media_file(temp_dir.path(), "episode.mp4")?;
    let controller = Controller::with_providers(
        Config::default(),
        Arc::new(MockTranscriber::two_segments()),
        Arc::new(MockChatProvider::working()),
    );

    let outcome = controller.run(TaskRequest::new(&media, "Chinese")).await?;

    match outcome {
        TaskOutcome::Completed {
            output_path,
            subtitle_written,
            ..
        } => {
            assert!(subtitle_written);
            assert_eq!(output_path, temp_dir.path().join("episode.srt"));
            assert!(output_path.is_file());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingMedia_shouldReturnError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_providers(
        Config::default(),
        Arc::new(MockTranscriber::two_segments()),
        Arc::new(MockChatProvider::working()),
    );

    let result = controller
        .run(TaskRequest::new(temp_dir.path().join("ghost.mp4"), "Chinese"))
        .await;

    match result {
        Err(AppError::Rejected(SubmitError::NotFound(path))) => assert!(path.ends_with("ghost.mp4")),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_resume_point_afterRun_shouldReportTranscriptSidecar() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let media = common::create_media_file(temp_dir.path(), "resumable.mp4")?;
    let controller = Controller::with_providers(
        Config::default(),
        Arc::new(MockTranscriber::two_segments()),
        Arc::new(MockChatProvider::working()),
    );

    let before = controller.resume_point(&media);
    assert!(!before.has_transcript);
    assert!(!before.has_audio);

    controller.run(TaskRequest::new(&media, "Chinese")).await?;

    let after = controller.resume_point(&media);
    assert!(after.has_transcript);
    assert!(CheckpointPaths::for_media(&media).transcript.is_file());
    Ok(())
}

#[test]
fn test_translation_connection_withFailingProvider_shouldReturnError() {
    let controller = Controller::with_providers(
        Config::default(),
        Arc::new(MockTranscriber::silent()),
        Arc::new(MockChatProvider::failing()),
    );

    let result = tokio_test::block_on(async { controller.test_translation_connection().await });

    assert!(result.is_err());
}

#[test]
fn test_with_config_withDefaults_shouldBuildRealProviders() {
    let controller = Controller::with_config(Config::default());

    assert!(controller.is_ok());
}

#[test]
fn test_format_duration_shouldPickUnits() {
    assert_eq!(Controller::format_duration(Duration::from_millis(1500)), "1.500s");
    assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
    assert_eq!(Controller::format_duration(Duration::from_secs(3723)), "1h 2m 3s");
}
