/*!
 * Single-flight, cancellation and supervisor tests for the orchestrator
 */

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;

use universalsub::app_config::{Config, SharedConfig};
use universalsub::errors::{SubmitError, TaskError};
use universalsub::orchestrator::{PipelineContext, ResumeMode, TaskOrchestrator, TaskOutcome, TaskRequest, TaskState};
use universalsub::progress::{EventSink, ProgressPublisher, Stage, TaskEvent};
use universalsub::providers::mock::MockChatProvider;
use universalsub::segment_store::CheckpointPaths;

use crate::common;
use crate::common::mock_providers::{MockTranscriber, TranscriberBehavior};
use crate::common::{Harness, terminal_events};

/// Let spawned tasks run until the transcriber has been called
async fn wait_for_transcriber(transcriber: &MockTranscriber) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while transcriber.call_count() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("transcriber was never called");
}

#[tokio::test]
async fn test_submit_whileRunning_shouldRejectSecondTask() -> Result<()> {
    let (transcriber, gate) = MockTranscriber::two_segments().gated();
    let harness = Harness::new(transcriber, MockChatProvider::working())?;

    let handle = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    assert!(harness.orchestrator.is_running());

    let second = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"));
    assert!(matches!(second, Err(SubmitError::AlreadyRunning)));

    // A busy orchestrator rejects before looking at the path
    let missing = harness.orchestrator.submit(TaskRequest::new(harness.dir.path().join("nope.mp4"), "Chinese"));
    assert!(matches!(missing, Err(SubmitError::AlreadyRunning)));

    gate.notify_one();
    assert!(handle.wait().await.is_completed());
    assert_eq!(harness.orchestrator.state(), TaskState::Idle);

    gate.notify_one();
    let again = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    assert!(again.wait().await.is_completed());
    assert_eq!(harness.transcriber.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_submit_withMissingMedia_shouldRejectAndStayIdle() -> Result<()> {
    let mut harness = Harness::new(MockTranscriber::two_segments(), MockChatProvider::working())?;
    let missing = harness.dir.path().join("missing.mp4");

    let result = harness.orchestrator.submit(TaskRequest::new(&missing, "Chinese"));

    match result {
        Err(SubmitError::NotFound(path)) => assert_eq!(path, missing),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.orchestrator.state(), TaskState::Idle);
    assert!(harness.drain_events().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cancel_whileIdle_shouldReturnFalse() -> Result<()> {
    let harness = Harness::new(MockTranscriber::two_segments(), MockChatProvider::working())?;

    assert!(!harness.orchestrator.cancel());
    assert_eq!(harness.orchestrator.state(), TaskState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_cancel_immediatelyAfterSubmit_shouldCancelBeforeTranscription() -> Result<()> {
    let mut harness = Harness::new(MockTranscriber::two_segments(), MockChatProvider::working())?;

    let handle = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    assert!(harness.orchestrator.cancel());
    let outcome = handle.wait().await;

    assert_eq!(outcome, TaskOutcome::Cancelled);
    assert_eq!(harness.transcriber.call_count(), 0);
    assert_eq!(harness.orchestrator.state(), TaskState::Idle);

    let events = harness.drain_events();
    match terminal_events(&events).as_slice() {
        [TaskEvent::TaskFailed { message, cancelled }] => {
            assert!(cancelled);
            assert_eq!(message, "Task cancelled by user");
        }
        other => panic!("unexpected terminal events: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_cancel_duringTranscription_shouldStopWithoutCheckpoint() -> Result<()> {
    let (transcriber, gate) = MockTranscriber::two_segments().gated();
    let mut harness = Harness::new(transcriber, MockChatProvider::working())?;

    let handle = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    wait_for_transcriber(&harness.transcriber).await;
    assert_eq!(harness.orchestrator.state(), TaskState::Transcribing);

    assert!(harness.orchestrator.cancel());
    gate.notify_one();

    assert_eq!(handle.wait().await, TaskOutcome::Cancelled);
    assert!(!CheckpointPaths::for_media(&harness.media).transcript.exists());
    assert!(!harness.srt_path().exists());
    assert_eq!(harness.translator.request_count(), 0);
    assert_eq!(terminal_events(&harness.drain_events()).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cancel_flag_shouldNotLeakIntoNextTask() -> Result<()> {
    let harness = Harness::new(MockTranscriber::two_segments(), MockChatProvider::working())?;

    let first = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    harness.orchestrator.cancel();
    assert_eq!(first.wait().await, TaskOutcome::Cancelled);

    let second = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    assert!(second.wait().await.is_completed());
    Ok(())
}

#[tokio::test]
async fn test_provider_panic_shouldFailInternallyAndReleaseGuard() -> Result<()> {
    let transcriber = MockTranscriber::two_segments().with_behavior(TranscriberBehavior::Panic);
    let mut harness = Harness::new(transcriber, MockChatProvider::working())?;

    let outcome = harness
        .orchestrator
        .submit(TaskRequest::new(&harness.media, "Chinese"))?
        .wait()
        .await;

    assert!(matches!(
        outcome,
        TaskOutcome::Failed {
            reason: TaskError::Internal(_),
            ..
        }
    ));
    assert_eq!(harness.orchestrator.state(), TaskState::Idle);

    let events = harness.drain_events();
    let terminal = terminal_events(&events);
    assert_eq!(terminal.len(), 1);
    assert!(matches!(terminal[0], TaskEvent::TaskFailed { cancelled: false, .. }));
    Ok(())
}

#[tokio::test]
async fn test_transcriber_startFailure_shouldFailWithProviderMessage() -> Result<()> {
    let transcriber =
        MockTranscriber::two_segments().with_behavior(TranscriberBehavior::FailAtStart("model not found".to_string()));
    let harness = Harness::new(transcriber, MockChatProvider::working())?;

    let outcome = harness
        .orchestrator
        .submit(TaskRequest::new(&harness.media, "Chinese"))?
        .wait()
        .await;

    match outcome {
        TaskOutcome::Failed {
            reason: TaskError::TranscriptionFailure(_),
            message,
        } => assert!(message.contains("model not found")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_config_update_afterSubmit_shouldNotAffectRunningTask() -> Result<()> {
    let (transcriber, gate) = MockTranscriber::two_segments().gated();
    let harness = Harness::new(transcriber, MockChatProvider::working())?;

    let handle = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    harness.config.update(|config| config.translation.batch_size = 1);
    gate.notify_one();

    assert!(handle.wait().await.is_completed());
    // Default batch size of 10 covers both segments in one request
    assert_eq!(harness.translator.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_task_handles_shouldHaveDistinctIds() -> Result<()> {
    let harness = Harness::new(MockTranscriber::two_segments(), MockChatProvider::working())?;

    let first = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    let first_id = first.id();
    first.wait().await;
    let second = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;

    assert_ne!(first_id, second.id());
    second.wait().await;
    Ok(())
}

#[tokio::test]
async fn test_cancel_duringTranslation_shouldKeepCheckpointForResume() -> Result<()> {
    let mut config = Config::default();
    config.translation.batch_size = 1;
    let harness = Harness::with_config(MockTranscriber::two_segments(), MockChatProvider::slow(50), config)?;

    let handle = harness.orchestrator.submit(TaskRequest::new(&harness.media, "Chinese"))?;
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.translator.request_count() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("translator was never called");
    assert_eq!(harness.orchestrator.state(), TaskState::Translating);

    assert!(harness.orchestrator.cancel());

    assert_eq!(handle.wait().await, TaskOutcome::Cancelled);
    assert!(!harness.srt_path().exists());
    assert!(CheckpointPaths::for_media(&harness.media).transcript.is_file());
    // The in-flight batch finishes, the second one never starts
    assert_eq!(harness.translator.request_count(), 1);

    let resumed = harness
        .orchestrator
        .submit(TaskRequest::new(&harness.media, "Chinese").with_resume_mode(ResumeMode::UseTranscript))?
        .wait()
        .await;
    assert!(resumed.is_completed());
    assert!(harness.srt_path().is_file());
    assert_eq!(harness.transcriber.call_count(), 1);
    Ok(())
}

/// Cancels the task as soon as translation reports it is done
struct CancelAfterTranslation {
    orchestrator: Arc<OnceCell<TaskOrchestrator>>,
    events: parking_lot::Mutex<Vec<TaskEvent>>,
}

impl EventSink for CancelAfterTranslation {
    fn publish(&self, event: TaskEvent) {
        if let TaskEvent::StatusUpdate(update) = &event {
            if update.stage == Stage::Translating && update.progress == 95 {
                if let Some(orchestrator) = self.orchestrator.get() {
                    orchestrator.cancel();
                }
            }
        }
        self.events.lock().push(event);
    }
}

#[tokio::test]
async fn test_cancel_afterTranslation_shouldSkipSaving() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let media = common::create_media_file(dir.path(), "late.mp4")?;
    let transcriber = MockTranscriber::two_segments();
    let translator = MockChatProvider::working();
    let slot = Arc::new(OnceCell::new());
    let sink = Arc::new(CancelAfterTranslation {
        orchestrator: Arc::clone(&slot),
        events: parking_lot::Mutex::new(Vec::new()),
    });
    let orchestrator = TaskOrchestrator::new(
        PipelineContext {
            transcriber: Arc::new(transcriber.clone()),
            translator: Arc::new(translator.clone()),
            config: SharedConfig::new(Config::default()),
        },
        ProgressPublisher::new(sink.clone()),
    );
    let _ = slot.set(orchestrator.clone());

    let outcome = orchestrator.submit(TaskRequest::new(&media, "Chinese"))?.wait().await;

    assert_eq!(outcome, TaskOutcome::Cancelled);
    assert!(!media.with_extension("srt").exists());
    assert!(CheckpointPaths::for_media(&media).transcript.is_file());
    assert_eq!(translator.request_count(), 1);
    let events = sink.events.lock();
    assert!(!events
        .iter()
        .any(|e| matches!(e, TaskEvent::StatusUpdate(update) if update.stage == Stage::Saving)));
    assert!(matches!(
        terminal_events(&events).as_slice(),
        [TaskEvent::TaskFailed { cancelled: true, .. }]
    ));
    Ok(())
}
