use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub mod aws;
pub mod processor;

use crate::acquisition::{MediaFormat, MediaHandle};

/// Why a transcript could not be produced
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    #[error("Speech engine failed: {0}")]
    EngineFailure(String),

    #[error("Speech engine produced no text")]
    EmptyResult,
}

impl TranscriptionError {
    /// Stable identifier of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptionError::EngineFailure(_) => "engine-failure",
            TranscriptionError::EmptyResult => "empty-result",
        }
    }
}

/// Text spoken in the media. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(String);

impl Transcript {
    /// Wrap engine output, treating blank text as a failed transcription
    pub fn new(text: impl Into<String>) -> Result<Self, TranscriptionError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TranscriptionError::EmptyResult);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque speech-to-text engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a local media file into plain text
    async fn transcribe_file(&self, path: &Path, format: MediaFormat) -> Result<String, TranscriptionError>;

    /// Release engine resources at process shutdown
    async fn shutdown(&self) {}

    /// Get the name of this engine
    fn name(&self) -> &'static str;
}

/// Long-lived handle on a speech engine, loaded once and shared across runs
#[derive(Clone)]
pub struct Transcriber {
    engine: Arc<dyn SpeechToText>,
}

impl Transcriber {
    pub fn new(engine: Arc<dyn SpeechToText>) -> Self {
        Self { engine }
    }

    /// Transcribe acquired media. A single attempt, no retries.
    pub async fn transcribe(&self, media: &MediaHandle) -> Result<Transcript, TranscriptionError> {
        let started = Instant::now();
        tracing::info!(
            engine = self.engine.name(),
            path = %media.path().display(),
            format = media.format().as_str(),
            "transcribing media"
        );

        let text = self.engine.transcribe_file(media.path(), media.format()).await?;
        let transcript = Transcript::new(text)?;

        tracing::info!(
            chars = transcript.as_str().len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "transcription finished"
        );
        Ok(transcript)
    }

    /// Release the engine
    pub async fn shutdown(self) {
        tracing::debug!(engine = self.engine.name(), "shutting down speech engine");
        self.engine.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceTag;
    use std::path::PathBuf;

    fn handle() -> MediaHandle {
        MediaHandle::new(PathBuf::from("/tmp/run/clip.mp3"), SourceTag::Generic).unwrap()
    }

    #[test]
    fn test_transcript_rejects_blank() {
        assert_eq!(Transcript::new("  \n "), Err(TranscriptionError::EmptyResult));
        assert_eq!(Transcript::new(" hi ").unwrap().as_str(), "hi");
    }

    #[tokio::test]
    async fn test_transcriber_passes_path_and_format() {
        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_transcribe_file()
            .withf(|path, format| path == Path::new("/tmp/run/clip.mp3") && *format == MediaFormat::Mp3)
            .times(1)
            .returning(|_, _| Ok("Hello there. General Kenobi.".to_string()));

        let transcriber = Transcriber::new(Arc::new(engine));
        let transcript = transcriber.transcribe(&handle()).await.unwrap();
        assert_eq!(transcript.as_str(), "Hello there. General Kenobi.");
    }

    #[tokio::test]
    async fn test_transcriber_maps_empty_output() {
        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_transcribe_file()
            .times(1)
            .returning(|_, _| Ok(String::new()));

        let err = Transcriber::new(Arc::new(engine))
            .transcribe(&handle())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "empty-result");
    }

    #[tokio::test]
    async fn test_transcriber_surfaces_engine_failure() {
        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine
            .expect_transcribe_file()
            .times(1)
            .returning(|_, _| Err(TranscriptionError::EngineFailure("model crashed".into())));

        let err = Transcriber::new(Arc::new(engine))
            .transcribe(&handle())
            .await
            .unwrap_err();
        assert_eq!(err, TranscriptionError::EngineFailure("model crashed".into()));
    }

    #[tokio::test]
    async fn test_shutdown_releases_engine() {
        let mut engine = MockSpeechToText::new();
        engine.expect_name().return_const("mock");
        engine.expect_shutdown().times(1).return_const(());
        Transcriber::new(Arc::new(engine)).shutdown().await;
    }
}
