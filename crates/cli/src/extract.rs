use crate::config::get_config;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use flightscan::extract::BatchSummary;
use flightscan::payload::ExtractionInput;
use flightscan::pipeline::run_extraction;
use flightscan::providers::factory::create_batch_provider;
use flightscan::{CancellationToken, FlightInfo, SanityCheck, TextContext};
use flightscan_html::html_to_text;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaChoice {
    /// Flight booking details
    Flight,
    /// Whether a word occurs in the text
    SanityCheck,
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Directory of `.html` email bodies, one message per file
    #[arg(long)]
    input_dir: PathBuf,
    /// Directory that receives one `<identifier>.json` artifact per input
    #[arg(long)]
    output_dir: PathBuf,
    /// The record type to extract
    #[arg(long, value_enum, default_value_t = SchemaChoice::Flight)]
    schema: SchemaChoice,
    /// The account holder's name (flight schema)
    #[arg(long, env = "FLIGHTSCAN_NAME")]
    name: Option<String>,
    /// The word to look for (sanity-check schema)
    #[arg(long)]
    word: Option<String>,
    /// Path to a YAML config file
    #[arg(long)]
    config: Option<String>,
}

/// One cleaned input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedFile {
    pub identifier: String,
    pub text: String,
}

/// Reads every `*.html` file in `dir`, sorted by name, and cleans it to text.
///
/// Files whose cleaned text is empty are skipped.
pub fn read_html_inputs(dir: &Path) -> Result<Vec<CleanedFile>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        })
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(identifier) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("Skipping '{}': file name is not valid UTF-8.", path.display());
            continue;
        };
        let html = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let text = html_to_text(&html);
        if text.is_empty() {
            info!("Skipping '{}': no text after cleaning.", path.display());
            continue;
        }
        files.push(CleanedFile {
            identifier: identifier.to_string(),
            text,
        });
    }
    Ok(files)
}

fn build_inputs(args: &ExtractArgs, files: Vec<CleanedFile>) -> Result<Vec<ExtractionInput>> {
    let (key, value, text_key) = match args.schema {
        SchemaChoice::Flight => match &args.name {
            Some(name) => ("name", name, "html_text"),
            None => bail!("--name is required for the flight schema"),
        },
        SchemaChoice::SanityCheck => match &args.word {
            Some(word) => ("word", word, "text"),
            None => bail!("--word is required for the sanity-check schema"),
        },
    };

    Ok(files
        .into_iter()
        .map(|file| {
            let context = TextContext::from([
                (key.to_string(), value.clone()),
                (text_key.to_string(), file.text),
            ]);
            ExtractionInput::new(file.identifier, context)
        })
        .collect())
}

pub async fn handle_extract(args: &ExtractArgs) -> Result<BatchSummary> {
    let config = get_config(args.config.as_deref())?;
    let files = read_html_inputs(&args.input_dir)?;
    let inputs = build_inputs(args, files)?;
    info!("Prepared {} inputs from '{}'.", inputs.len(), args.input_dir.display());
    println!(
        "📄 Extracting from {} files in '{}'...",
        inputs.len(),
        args.input_dir.display()
    );

    let provider = create_batch_provider(&config.provider_config())?;
    let options = config.batch_options();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling the batch.");
            on_interrupt.cancel();
        }
    });

    let summary = match args.schema {
        SchemaChoice::Flight => {
            run_extraction::<FlightInfo>(provider, options, inputs, &args.output_dir, &cancel)
                .await?
                .summary
        }
        SchemaChoice::SanityCheck => {
            run_extraction::<SanityCheck>(provider, options, inputs, &args.output_dir, &cancel)
                .await?
                .summary
        }
    };

    println!(
        "✅ Wrote {} artifacts to '{}': {summary}.",
        summary.total(),
        args.output_dir.display()
    );
    Ok(summary)
}
