//! vidbrief - turn a video link into a transcript and an extractive summary
//!
//! A URL is classified by platform, its media is downloaded with the matching
//! strategy, transcribed by a speech engine, and the transcript's sentences
//! are ranked by centrality in a lexical-overlap graph (TextRank). The most
//! central sentences become the brief and the key points.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod summary;
pub mod transcribe;
pub mod utils;

use std::sync::Arc;

pub use acquisition::{AcquisitionError, AcquisitionTable, MediaAcquirer, MediaHandle};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::{Pipeline, PipelineError, PipelineResult};
pub use source::{classify, SourceTag};
pub use store::{JsonFileStore, ResultStore, SearchQuery};
pub use summary::{Summarizer, SummaryResult};
pub use transcribe::{SpeechToText, Transcriber, Transcript, TranscriptionError};

use acquisition::instagram::InstagramAcquirer;
use acquisition::session::SessionStore;
use acquisition::ytdlp::YtDlpDownloader;
use transcribe::aws::AwsTranscribeEngine;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Stable failure kind for any error reaching the command line
pub fn error_kind(error: &anyhow::Error) -> &'static str {
    if let Some(e) = error.downcast_ref::<PipelineError>() {
        e.kind()
    } else if let Some(e) = error.downcast_ref::<AcquisitionError>() {
        e.kind()
    } else if let Some(e) = error.downcast_ref::<TranscriptionError>() {
        e.kind()
    } else {
        "internal"
    }
}

/// Session state shared by every authenticated download in this process
pub fn session_store(config: &Config) -> Result<Arc<SessionStore>> {
    Ok(Arc::new(SessionStore::new(
        config.instagram.username.clone(),
        config.instagram.password.clone(),
        config.cookie_file()?,
    )))
}

/// Download strategies: the authenticated downloader for social-photo-video
/// links, the generic downloader for everything else
pub fn acquisition_table(config: &Config, sessions: Arc<SessionStore>, quiet: bool) -> AcquisitionTable {
    let downloader = YtDlpDownloader::new(&config.downloader).quiet(quiet);

    AcquisitionTable::new(Arc::new(downloader.clone())).register(
        SourceTag::SocialPhotoVideo,
        Arc::new(InstagramAcquirer::new(Arc::new(downloader), sessions)),
    )
}

/// Assemble the full pipeline from configuration
pub async fn build_pipeline(config: &Config, quiet: bool) -> Result<Pipeline> {
    let acquisition = acquisition_table(config, session_store(config)?, quiet);
    let engine = AwsTranscribeEngine::connect(&config.aws, quiet).await?;

    Ok(Pipeline::new(
        acquisition,
        Transcriber::new(Arc::new(engine)),
        Summarizer::new(config.summary.options()),
        config.work_dir(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_sees_through_context() {
        let error = anyhow::Error::new(PipelineError::from(AcquisitionError::Auth("login required".into())))
            .context("processing failed");
        assert_eq!(error_kind(&error), "auth");

        let error = anyhow::Error::new(TranscriptionError::EmptyResult);
        assert_eq!(error_kind(&error), "empty-result");

        assert_eq!(error_kind(&anyhow::anyhow!("disk full")), "internal");
    }

    #[test]
    fn test_acquisition_table_routes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.app.data_dir = Some(dir.path().to_path_buf());

        let table = acquisition_table(&config, session_store(&config).unwrap(), true);
        assert_eq!(table.strategy_for(SourceTag::SocialPhotoVideo).name(), "instagram");
        assert_eq!(table.strategy_for(SourceTag::ShortForm).name(), "yt-dlp");
        assert_eq!(table.strategy_for(SourceTag::Generic).name(), "yt-dlp");
    }
}
