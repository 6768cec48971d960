use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::PipelineResult;
use crate::store::{SearchHit, StoredResult};
use crate::summary::SummaryResult;
use crate::utils::extract_domain;

/// Plain-text rendering of a command result
pub trait TextReport {
    fn to_text(&self) -> String;
}

/// Render `value` in the requested format
pub fn render<T: TextReport + Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(value.to_text()),
        OutputFormat::Json => serde_json::to_string_pretty(value).context("Failed to serialize output"),
    }
}

/// Save a rendered result to file
pub async fn save_to_file<T: TextReport + Serialize + ?Sized>(
    value: &T,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let content = render(value, format)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write output to {}", path.display()))?;
    Ok(())
}

/// Print a rendered result to stdout
pub fn print_to_console<T: TextReport + Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    println!("{}", render(value, format)?);
    Ok(())
}

fn write_summary(out: &mut String, summary: &SummaryResult) {
    let _ = writeln!(out, "{}", style("Summary").bold().underlined());
    let _ = writeln!(out, "{}", summary.brief);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style("Key points").bold().underlined());
    for (i, point) in summary.key_points.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {}", i + 1, point);
    }
}

impl TextReport for SummaryResult {
    fn to_text(&self) -> String {
        let mut out = String::new();
        write_summary(&mut out, self);
        out.trim_end().to_string()
    }
}

impl TextReport for PipelineResult {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", style("Source:").bold(), self.source_type);
        let _ = writeln!(out);
        write_summary(&mut out, &self.summary);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style("Transcript").bold().underlined());
        let _ = writeln!(out, "{}", self.transcript);
        out.trim_end().to_string()
    }
}

impl TextReport for StoredResult {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", style("URL:").bold(), self.url);
        let _ = writeln!(out, "{} {}", style("Source:").bold(), self.source_type);
        let _ = writeln!(
            out,
            "{} {}",
            style("Processed:").bold(),
            self.processed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "{} {}", style("Id:").bold(), self.id);
        let _ = writeln!(out);
        write_summary(&mut out, &self.summary);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style("Transcript").bold().underlined());
        let _ = writeln!(out, "{}", self.transcript);
        out.trim_end().to_string()
    }
}

impl TextReport for [SearchHit] {
    fn to_text(&self) -> String {
        if self.is_empty() {
            return "No matching results.".to_string();
        }

        let mut out = String::new();
        for hit in self {
            let domain = extract_domain(&hit.url).unwrap_or_else(|| hit.url.clone());
            let _ = writeln!(
                out,
                "{} {} [{}] {}",
                style(hit.processed_at.format("%Y-%m-%d")).dim(),
                style(&domain).cyan(),
                hit.source_type,
                hit.url
            );
            let _ = writeln!(out, "    {}", hit.transcript_preview);
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceTag;

    fn result() -> PipelineResult {
        PipelineResult {
            source_type: SourceTag::ShortForm,
            transcript: "Cats purr. Dogs bark.".to_string(),
            summary: SummaryResult {
                brief: "Cats purr. Dogs bark.".to_string(),
                key_points: vec!["Cats purr.".to_string(), "Dogs bark.".to_string()],
            },
        }
    }

    #[test]
    fn test_render_json_uses_wire_names() {
        let json = render(&result(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source_type"], "short-form");
        assert_eq!(value["summary"]["keyPoints"][1], "Dogs bark.");
    }

    #[test]
    fn test_render_text_lists_key_points() {
        console::set_colors_enabled(false);
        let text = render(&result(), OutputFormat::Text).unwrap();
        assert!(text.contains("Source: short-form"));
        assert!(text.contains(" 1. Cats purr."));
        assert!(text.contains(" 2. Dogs bark."));
        assert!(text.ends_with("Cats purr. Dogs bark."));
    }

    #[test]
    fn test_empty_search_text() {
        let hits: Vec<SearchHit> = Vec::new();
        assert_eq!(render(hits.as_slice(), OutputFormat::Text).unwrap(), "No matching results.");
        assert_eq!(render(hits.as_slice(), OutputFormat::Json).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        save_to_file(&result().summary, &path, OutputFormat::Json).await.unwrap();
        let saved = fs_err::read_to_string(&path).unwrap();
        assert!(saved.contains("\"keyPoints\""));
    }
}
