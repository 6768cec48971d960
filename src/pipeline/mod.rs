//! One URL in, transcript and summary out.
//!
//! A run moves strictly forward through
//! `Idle -> Classifying -> Acquiring -> Transcribing -> Summarizing -> Done`,
//! or drops to `Failed` from any active stage. Every run gets its own
//! workspace directory; the acquired media, the workspace and any per-run
//! session state are released after the last stage, whatever the outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

use crate::acquisition::{AcquisitionError, AcquisitionTable, MediaHandle};
use crate::source::{classify, SourceTag};
use crate::summary::{Summarizer, SummaryResult};
use crate::transcribe::{Transcriber, TranscriptionError};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Classifying,
    Acquiring,
    Transcribing,
    Summarizing,
    Done,
    Failed,
}

impl Stage {
    /// The only stage a successful step may move to
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Classifying),
            Stage::Classifying => Some(Stage::Acquiring),
            Stage::Acquiring => Some(Stage::Transcribing),
            Stage::Transcribing => Some(Stage::Summarizing),
            Stage::Summarizing => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Classifying => "classifying",
            Stage::Acquiring => "acquiring",
            Stage::Transcribing => "transcribing",
            Stage::Summarizing => "summarizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a run failed
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error("Failed to prepare run workspace in {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Stable identifier of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Acquisition(e) => e.kind(),
            PipelineError::Transcription(e) => e.kind(),
            PipelineError::Workspace { .. } => "workspace",
        }
    }
}

/// What a successful run returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub source_type: SourceTag,
    pub transcript: String,
    pub summary: SummaryResult,
}

/// Stage tracker for one run
#[derive(Debug)]
struct RunState {
    id: Uuid,
    stage: Stage,
}

impl RunState {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Idle,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            tracing::info!(run_id = %self.id, from = %self.stage, to = %next, "stage transition");
            self.stage = next;
        }
    }

    fn fail(&mut self, error: &PipelineError) {
        tracing::error!(
            run_id = %self.id,
            stage = %self.stage,
            kind = error.kind(),
            error = %error,
            "run failed"
        );
        self.stage = Stage::Failed;
    }
}

/// Per-run scratch directory with a collision-free name
struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    fn create(parent: &Path, run_id: Uuid) -> std::io::Result<Self> {
        fs_err::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("run-{}-", run_id.simple()))
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove run workspace");
        }
    }
}

/// Sequences classification, acquisition, transcription and summarisation
pub struct Pipeline {
    acquisition: AcquisitionTable,
    transcriber: Transcriber,
    summarizer: Summarizer,
    work_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        acquisition: AcquisitionTable,
        transcriber: Transcriber,
        summarizer: Summarizer,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            acquisition,
            transcriber,
            summarizer,
            work_dir: work_dir.into(),
        }
    }

    /// Process one URL. Always recomputes; callers own any caching.
    pub async fn process(&self, url: &str) -> Result<PipelineResult, PipelineError> {
        let mut run = RunState::new();
        tracing::info!(run_id = %run.id, %url, "processing video");

        run.advance();
        let source_type = classify(url);
        tracing::info!(run_id = %run.id, source_type = %source_type, "classified source");

        let workspace = match RunWorkspace::create(&self.work_dir, run.id) {
            Ok(workspace) => workspace,
            Err(source) => {
                let error = PipelineError::Workspace {
                    path: self.work_dir.clone(),
                    source,
                };
                run.fail(&error);
                return Err(error);
            }
        };

        let mut media = None;
        let outcome = self
            .execute(&mut run, url, source_type, workspace.path(), &mut media)
            .await;

        self.cleanup(source_type, workspace, media).await;

        match outcome {
            Ok(result) => {
                run.advance();
                Ok(result)
            }
            Err(error) => {
                run.fail(&error);
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        run: &mut RunState,
        url: &str,
        source_type: SourceTag,
        dest: &Path,
        media: &mut Option<MediaHandle>,
    ) -> Result<PipelineResult, PipelineError> {
        run.advance();
        let handle = media.insert(self.acquisition.acquire(url, source_type, dest).await?);

        run.advance();
        let transcript = self.transcriber.transcribe(handle).await?;

        run.advance();
        let summary = self.summarizer.summarize(transcript.as_str());

        Ok(PipelineResult {
            source_type,
            transcript: transcript.into_string(),
            summary,
        })
    }

    /// Delete the media file, release strategy state, then remove the
    /// workspace. Failures here are logged and never replace the run outcome.
    async fn cleanup(&self, source_type: SourceTag, workspace: RunWorkspace, media: Option<MediaHandle>) {
        if let Some(handle) = media {
            match tokio::fs::remove_file(handle.path()).await {
                Ok(()) => tracing::debug!(path = %handle.path().display(), "removed media file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %handle.path().display(), error = %e, "failed to remove media file")
                }
            }
        }

        self.acquisition
            .strategy_for(source_type)
            .release(workspace.path())
            .await;

        workspace.close();
    }

    /// Release long-lived resources at process shutdown
    pub async fn shutdown(self) {
        self.transcriber.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::MockMediaAcquirer;
    use crate::transcribe::MockSpeechToText;
    use std::sync::{Arc, Mutex};

    fn recording_acquirer(seen: Arc<Mutex<Vec<PathBuf>>>) -> MockMediaAcquirer {
        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_name().return_const("mock");
        acquirer.expect_acquire().times(1).returning(move |_, _, dest| {
            let path = dest.join("clip.mp4");
            std::fs::write(&path, b"fake media").unwrap();
            seen.lock().unwrap().push(path.clone());
            Ok(path)
        });
        acquirer.expect_release().times(1).return_const(());
        acquirer
    }

    fn engine_returning(result: Result<String, TranscriptionError>) -> MockSpeechToText {
        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_transcribe_file()
            .times(1)
            .returning(move |_, _| result.clone());
        engine
    }

    fn pipeline(acquirer: MockMediaAcquirer, engine: MockSpeechToText, work_dir: &Path) -> Pipeline {
        Pipeline::new(
            AcquisitionTable::new(Arc::new(acquirer)),
            Transcriber::new(Arc::new(engine)),
            Summarizer::default(),
            work_dir,
        )
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_successful_run_shapes_result_and_cleans_up() {
        let work = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let text = "Cats are mammals. Dogs are mammals too. Cats and dogs are pets.";
        let pipeline = pipeline(
            recording_acquirer(seen.clone()),
            engine_returning(Ok(text.to_string())),
            work.path(),
        );

        let result = pipeline.process("https://www.tiktok.com/@cats/video/1").await.unwrap();

        assert_eq!(result.source_type, SourceTag::ShortForm);
        assert_eq!(result.transcript, text);
        assert_eq!(result.summary.brief, text);
        assert_eq!(result.summary.key_points.len(), 3);

        let media = seen.lock().unwrap()[0].clone();
        assert!(!media.exists());
        assert!(dir_is_empty(work.path()));
    }

    #[tokio::test]
    async fn test_acquisition_failure_skips_transcription() {
        let work = tempfile::tempdir().unwrap();
        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_name().return_const("mock");
        acquirer
            .expect_acquire()
            .times(1)
            .returning(|_, _, _| Err(AcquisitionError::NoMediaContent("photo post".into())));
        acquirer.expect_release().times(1).return_const(());

        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine.expect_transcribe_file().times(0);

        let pipeline = pipeline(acquirer, engine, work.path());
        let err = pipeline
            .process("https://m.instagram.com/p/ABC/")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "no-media-content");
        assert!(matches!(
            err,
            PipelineError::Acquisition(AcquisitionError::NoMediaContent(ref msg)) if msg == "photo post"
        ));
        assert!(dir_is_empty(work.path()));
    }

    #[tokio::test]
    async fn test_transcription_failure_still_deletes_media() {
        let work = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(
            recording_acquirer(seen.clone()),
            engine_returning(Err(TranscriptionError::EngineFailure("decoder crashed".into()))),
            work.path(),
        );

        let err = pipeline.process("https://youtu.be/abc").await.unwrap_err();

        assert_eq!(err.kind(), "engine-failure");
        assert_eq!(err.to_string(), "Speech engine failed: decoder crashed");
        assert!(!seen.lock().unwrap()[0].exists());
        assert!(dir_is_empty(work.path()));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_a_failure() {
        let work = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(
            recording_acquirer(seen.clone()),
            engine_returning(Ok("   ".to_string())),
            work.path(),
        );

        let err = pipeline.process("https://example.com/v.mp4").await.unwrap_err();
        assert_eq!(err.kind(), "empty-result");
        assert!(!seen.lock().unwrap()[0].exists());
    }

    #[tokio::test]
    async fn test_media_outside_workspace_is_still_deleted() {
        let work = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let stray = elsewhere.path().join("stray.mp4");
        let stray_for_mock = stray.clone();

        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_name().return_const("mock");
        acquirer.expect_acquire().times(1).returning(move |_, _, _| {
            std::fs::write(&stray_for_mock, b"media").unwrap();
            Ok(stray_for_mock.clone())
        });
        acquirer.expect_release().times(1).return_const(());

        let pipeline = pipeline(
            acquirer,
            engine_returning(Err(TranscriptionError::EmptyResult)),
            work.path(),
        );
        assert!(pipeline.process("https://example.com/v").await.is_err());
        assert!(!stray.exists());
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_separate_workspaces() {
        let work = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_name().return_const("mock");
        let seen_in_mock = seen.clone();
        acquirer.expect_acquire().times(2).returning(move |_, _, dest| {
            let path = dest.join("clip.mp4");
            std::fs::write(&path, b"media").unwrap();
            seen_in_mock.lock().unwrap().push(dest.to_path_buf());
            Ok(path)
        });
        acquirer.expect_release().times(2).return_const(());

        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_transcribe_file()
            .times(2)
            .returning(|_, _| Ok("Short and sweet.".to_string()));

        let pipeline = Arc::new(pipeline(acquirer, engine, work.path()));
        let (a, b) = tokio::join!(
            pipeline.process("https://youtu.be/a"),
            pipeline.process("https://youtu.be/b")
        );
        assert!(a.is_ok() && b.is_ok());

        let dirs = seen.lock().unwrap().clone();
        assert_eq!(dirs.len(), 2);
        assert_ne!(dirs[0], dirs[1]);
        assert!(dir_is_empty(work.path()));
    }

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Idle;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                Stage::Idle,
                Stage::Classifying,
                Stage::Acquiring,
                Stage::Transcribing,
                Stage::Summarizing,
                Stage::Done
            ]
        );
        assert!(Stage::Failed.is_terminal());
        assert_eq!(Stage::Failed.next(), None);
    }

    #[test]
    fn test_result_serializes_in_wire_shape() {
        let result = PipelineResult {
            source_type: SourceTag::ShortForm,
            transcript: "t".into(),
            summary: SummaryResult {
                brief: "b".into(),
                key_points: vec!["k".into()],
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source_type"], "short-form");
        assert_eq!(json["summary"]["keyPoints"][0], "k");
    }
}
