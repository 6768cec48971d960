use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat as AwsMediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use super::processor::{ProcessedTranscription, TranscriptionProcessor};
use super::{SpeechToText, TranscriptionError};
use crate::acquisition::MediaFormat;
use crate::config::AwsConfig;

/// Speech engine backed by AWS Transcribe. Media is staged in S3 for the
/// duration of one job and removed afterwards.
pub struct AwsTranscribeEngine {
    config: AwsConfig,
    s3_client: S3Client,
    transcribe_client: TranscribeClient,
    show_progress: bool,
}

impl AwsTranscribeEngine {
    /// Load AWS credentials and build the clients once
    pub async fn connect(config: &AwsConfig, quiet: bool) -> Result<Self> {
        config.validate()?;

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.region())
            .load()
            .await;

        Ok(Self {
            config: config.clone(),
            s3_client: S3Client::new(&aws_config),
            transcribe_client: TranscribeClient::new(&aws_config),
            show_progress: !quiet,
        })
    }

    async fn run_job(&self, path: &Path, format: MediaFormat) -> Result<ProcessedTranscription> {
        let s3_key = self.upload_to_s3(path, format).await?;

        let outcome = async {
            let job_name = self.start_transcription_job(&s3_key, format).await?;
            TranscriptionProcessor::new(
                self.transcribe_client.clone(),
                job_name,
                Duration::from_secs(self.config.transcription.poll_timeout_secs),
                self.show_progress,
            )
            .wait_for_completion()
            .await
        }
        .await;

        if let Err(e) = self.cleanup_s3(&s3_key).await {
            tracing::warn!(key = %s3_key, error = %e, "failed to clean up staged media");
        }

        outcome
    }

    /// Upload media file to S3
    async fn upload_to_s3(&self, path: &Path, format: MediaFormat) -> Result<String> {
        let key = staging_key(self.config.s3_key_prefix.as_deref(), format);

        tracing::info!("Uploading media to S3: s3://{}/{}", self.config.s3_bucket, key);

        let content = fs_err::read(path)?;

        self.s3_client
            .put_object()
            .bucket(&self.config.s3_bucket)
            .key(&key)
            .body(content.into())
            .content_type(format.mime_type())
            .send()
            .await
            .context("Failed to upload media to S3")?;

        Ok(key)
    }

    /// Start AWS Transcribe job, identifying the language unless one is configured
    async fn start_transcription_job(&self, s3_key: &str, format: MediaFormat) -> Result<String> {
        let job_name = format!("vidbrief_{}", Uuid::new_v4());
        let media_uri = format!("s3://{}/{}", self.config.s3_bucket, s3_key);

        tracing::info!("Starting transcription job: {}", job_name);

        let media = Media::builder().media_file_uri(media_uri).build();

        let mut job_builder = self
            .transcribe_client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(aws_media_format(format))
            .media(media);

        if let Some(lang) = self.config.transcription.default_language.as_deref() {
            tracing::info!("Using configured language: {}", lang);
            job_builder = job_builder.language_code(LanguageCode::from(lang));
        } else {
            tracing::info!("Using automatic language detection");
            job_builder = job_builder.identify_language(true);
        }

        job_builder
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    /// Clean up S3 object
    async fn cleanup_s3(&self, s3_key: &str) -> Result<()> {
        tracing::debug!("Cleaning up S3 object: {}", s3_key);

        self.s3_client
            .delete_object()
            .bucket(&self.config.s3_bucket)
            .key(s3_key)
            .send()
            .await
            .context("Failed to clean up S3 object")?;

        Ok(())
    }
}

#[async_trait]
impl SpeechToText for AwsTranscribeEngine {
    async fn transcribe_file(&self, path: &Path, format: MediaFormat) -> Result<String, TranscriptionError> {
        let processed = self
            .run_job(path, format)
            .await
            .map_err(|e| TranscriptionError::EngineFailure(format!("{:#}", e)))?;

        tracing::debug!(
            language = processed.language.as_deref().unwrap_or("unknown"),
            job_secs = processed.processing_duration.as_secs_f64(),
            "AWS Transcribe job finished"
        );
        Ok(processed.transcript)
    }

    fn name(&self) -> &'static str {
        "aws-transcribe"
    }
}

fn staging_key(prefix: Option<&str>, format: MediaFormat) -> String {
    format!(
        "{}media_{}_{}.{}",
        prefix.unwrap_or(""),
        Uuid::new_v4(),
        chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        format.as_str()
    )
}

fn aws_media_format(format: MediaFormat) -> AwsMediaFormat {
    match format {
        MediaFormat::Mp3 => AwsMediaFormat::Mp3,
        MediaFormat::Mp4 => AwsMediaFormat::Mp4,
        MediaFormat::Wav => AwsMediaFormat::Wav,
        MediaFormat::Flac => AwsMediaFormat::Flac,
        MediaFormat::Ogg => AwsMediaFormat::Ogg,
        MediaFormat::Webm => AwsMediaFormat::Webm,
        MediaFormat::Amr => AwsMediaFormat::Amr,
    }
}
