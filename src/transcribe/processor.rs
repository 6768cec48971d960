use anyhow::{Context, Result};
use aws_sdk_transcribe::types::{TranscriptionJob, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Finished AWS Transcribe job
#[derive(Debug, Clone)]
pub struct ProcessedTranscription {
    pub transcript: String,
    pub language: Option<String>,
    pub processing_duration: Duration,
}

/// AWS Transcribe transcript document (only the parts we read)
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
}

#[derive(Debug, Deserialize)]
struct TranscriptText {
    transcript: String,
}

/// Extract the full transcript text from an AWS Transcribe result document
pub fn parse_transcript_document(json: &str) -> Result<String> {
    let document: AwsTranscript =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;

    Ok(document
        .results
        .transcripts
        .into_iter()
        .map(|t| t.transcript)
        .collect::<Vec<_>>()
        .join(" "))
}

/// Seconds to wait before status check number `check` (1-based)
pub fn poll_delay(check: u64) -> Duration {
    Duration::from_secs(std::cmp::min(5 + (check.saturating_sub(1)) * 2, 30))
}

/// Transcription job processor
pub struct TranscriptionProcessor {
    client: TranscribeClient,
    job_name: String,
    timeout: Duration,
    show_progress: bool,
}

impl TranscriptionProcessor {
    pub fn new(client: TranscribeClient, job_name: String, timeout: Duration, show_progress: bool) -> Self {
        Self {
            client,
            job_name,
            timeout,
            show_progress,
        }
    }

    /// Wait for transcription job completion with progress tracking
    pub async fn wait_for_completion(&self) -> Result<ProcessedTranscription> {
        let progress = if self.show_progress {
            let progress = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                progress.set_style(style);
            }
            progress
        } else {
            ProgressBar::hidden()
        };
        progress.set_message("Starting transcription job...");

        let start_time = Instant::now();
        let mut check_count = 0;

        let job = loop {
            check_count += 1;

            let job = self.get_transcription_job().await?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress) | Some(TranscriptionJobStatus::Queued) => {
                    if start_time.elapsed() > self.timeout {
                        progress.finish_with_message("Transcription timed out");
                        anyhow::bail!(
                            "Transcription job {} did not finish within {}s",
                            self.job_name,
                            self.timeout.as_secs()
                        );
                    }

                    progress.set_message(format!(
                        "Transcribing... ({}s elapsed, check #{})",
                        start_time.elapsed().as_secs(),
                        check_count
                    ));
                    sleep(poll_delay(check_count)).await;
                }
                Some(TranscriptionJobStatus::Completed) => {
                    progress.finish_with_message("Transcription completed!");
                    break job;
                }
                Some(TranscriptionJobStatus::Failed) => {
                    progress.finish_with_message("Transcription failed");

                    let failure_reason = job.failure_reason().unwrap_or("Unknown error");
                    anyhow::bail!("Transcription job failed: {}", failure_reason);
                }
                other => {
                    progress.finish_with_message("Transcription status unknown");
                    anyhow::bail!("Unexpected transcription job status: {:?}", other);
                }
            }
        };

        self.process_transcription_result(job, start_time.elapsed()).await
    }

    /// Get transcription job details
    async fn get_transcription_job(&self) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(&self.job_name)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))
    }

    /// Process completed transcription result
    async fn process_transcription_result(
        &self,
        job: TranscriptionJob,
        processing_duration: Duration,
    ) -> Result<ProcessedTranscription> {
        let transcript_uri = job
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .ok_or_else(|| anyhow::anyhow!("No transcript URI found"))?;

        let transcript_json = self.download_transcript(transcript_uri).await?;
        let transcript = parse_transcript_document(&transcript_json)?;

        tracing::debug!(
            job = %self.job_name,
            chars = transcript.len(),
            "transcript document parsed"
        );

        Ok(ProcessedTranscription {
            transcript,
            language: job.language_code().map(|lc| lc.as_str().to_string()),
            processing_duration,
        })
    }

    /// Download transcript document from the pre-signed URI
    async fn download_transcript(&self, uri: &str) -> Result<String> {
        let response = reqwest::get(uri)
            .await
            .context("Failed to download transcript")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download transcript: HTTP {}", response.status());
        }

        response
            .text()
            .await
            .context("Failed to read transcript content")
    }
}
