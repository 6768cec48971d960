use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidbrief::cli::{Cli, Commands, OutputFormat};
use vidbrief::config::Config;
use vidbrief::output::{self, TextReport};
use vidbrief::store::{JsonFileStore, ResultStore, SearchQuery};
use vidbrief::summary::Summarizer;
use vidbrief::transcribe::Transcript;
use vidbrief::{acquisition_table, build_pipeline, classify, error_kind, session_store, utils, PipelineResult, SourceTag};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}: {:#}", error_kind(&e), e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only command output
fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose { "vidbrief=debug" } else { "vidbrief=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            url,
            output,
            format,
            refresh,
        } => {
            let store = result_store(&config)?;

            if !refresh {
                match store.lookup(&url).await {
                    Ok(Some(stored)) => {
                        tracing::info!(id = %stored.id, "using stored result (pass --refresh to process again)");
                        let result = PipelineResult {
                            source_type: stored.source_type,
                            transcript: stored.transcript,
                            summary: stored.summary,
                        };
                        return emit(&result, output.as_deref(), format).await;
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %format!("{:#}", e), "ignoring unreadable stored result"),
                }
            }

            // Missing tools surface again as tool-unavailable if actually needed
            let missing_deps = utils::check_dependencies(&config).await;
            if !missing_deps.is_empty() {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
            }

            let pipeline = build_pipeline(&config, cli.quiet).await?;
            let outcome = pipeline.process(&url).await;
            pipeline.shutdown().await;
            let result = outcome?;

            match store
                .store(&url, result.source_type, &result.transcript, &result.summary)
                .await
            {
                Ok(id) => tracing::info!(%id, "result stored"),
                Err(e) => tracing::warn!(error = %format!("{:#}", e), "failed to store result"),
            }

            emit(&result, output.as_deref(), format).await?;
        }
        Commands::Summarize { file, format } => {
            let text = match file {
                Some(path) => fs_err::read_to_string(&path)?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read transcript from stdin")?;
                    buffer
                }
            };

            let transcript = Transcript::new(text)?;
            let summary = Summarizer::new(config.summary.options()).summarize(transcript.as_str());
            output::print_to_console(&summary, format)?;
        }
        Commands::Classify { url } => {
            println!("{}", classify(&url));
        }
        Commands::Search {
            keyword,
            source,
            since,
            until,
            format,
        } => {
            let query = SearchQuery {
                keyword,
                source_type: source,
                since: since.as_deref().map(|d| utils::parse_date_bound(d, false)).transpose()?,
                until: until.as_deref().map(|d| utils::parse_date_bound(d, true)).transpose()?,
            };

            let hits = result_store(&config)?.search(&query).await?;
            output::print_to_console(hits.as_slice(), format)?;
        }
        Commands::Show { url, format } => {
            let stored = result_store(&config)?
                .lookup(&url)
                .await?
                .with_context(|| format!("No stored result for {}", url))?;
            output::print_to_console(&stored, format)?;
        }
        Commands::Session { reset } => {
            let sessions = session_store(&config)?;
            if reset {
                sessions
                    .invalidate()
                    .await
                    .with_context(|| format!("Failed to remove {}", sessions.cookie_file().display()))?;
                println!("Session reset.");
            }
            println!("Session: {}", sessions.current().await.describe());
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                println!("Configuration file: {}", path.display());
                println!("Edit it to set AWS and Instagram settings, or run `vidbrief config --show`.");
            }
        }
        Commands::Platforms => {
            let table = acquisition_table(&config, session_store(&config)?, true);
            println!("Supported platforms:");
            for (tag, strategy) in table.routes() {
                println!("  • {:<20} {} [{}]", tag.as_str(), tag.platforms(), strategy);
            }
            if config.instagram.username.is_none() && !config.cookie_file()?.is_file() {
                println!();
                println!("Note: {} links work best with a login session.", SourceTag::SocialPhotoVideo);
            }
        }
    }

    Ok(())
}

fn result_store(config: &Config) -> Result<JsonFileStore> {
    Ok(JsonFileStore::new(config.data_dir()?.join("results")))
}

async fn emit<T>(value: &T, path: Option<&Path>, format: OutputFormat) -> Result<()>
where
    T: TextReport + serde::Serialize + ?Sized,
{
    match path {
        Some(path) => {
            output::save_to_file(value, path, format).await?;
            println!("Result saved to: {}", path.display());
        }
        None => output::print_to_console(value, format)?,
    }
    Ok(())
}
