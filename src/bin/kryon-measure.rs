// src/bin/kryon-measure.rs
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kryon_core::{AttributedString, ParagraphAttributes, TextAttributes};
use kryon_layout::LayoutConstraints;
use kryon_text::{SimpleTextShaper, TextLayoutConfig, TextLayoutManager, TextMeasurer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Deterministic average-metrics shaper
    Simple,
    /// cosmic-text with the system font collection
    Cosmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "kryon-measure")]
#[command(about = "Measure attributed text the way Kryon layout does")]
struct Args {
    /// Text to measure
    #[arg(required_unless_present = "input")]
    text: Option<String>,

    /// JSON file holding an attributed string
    #[arg(short, long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Base font size in points
    #[arg(long)]
    font_size: Option<f32>,

    /// Maximum width of the text box
    #[arg(long)]
    max_width: Option<f32>,

    /// Maximum height of the text box
    #[arg(long)]
    max_height: Option<f32>,

    /// Maximum number of lines (0 means unlimited)
    #[arg(long)]
    max_lines: Option<u32>,

    /// Also print the line breakdown inside the measured box
    #[arg(long)]
    lines: bool,

    /// Measurement backend
    #[arg(long, value_enum, default_value = "simple")]
    backend: Backend,

    /// Extra font file for the cosmic backend (repeatable)
    #[arg(long = "font", value_name = "PATH")]
    fonts: Vec<PathBuf>,

    /// Measure this many times to exercise the cache
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Number of cached measurements
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "warn" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut attributed_string = load_attributed_string(&args)?;
    if let Some(font_size) = args.font_size {
        attributed_string.base_attributes.font_size = Some(font_size);
    }

    let mut paragraph_attributes = ParagraphAttributes::new();
    if let Some(max_lines) = args.max_lines {
        paragraph_attributes = paragraph_attributes.with_maximum_number_of_lines(max_lines);
    }

    let constraints = LayoutConstraints::with_max_size(
        args.max_width.unwrap_or(f32::INFINITY),
        args.max_height.unwrap_or(f32::INFINITY),
    );

    let mut config = TextLayoutConfig::default();
    if let Some(capacity) = args.cache_capacity {
        config.cache_capacity = capacity;
    }

    match args.backend {
        Backend::Simple => run(
            TextLayoutManager::with_config(SimpleTextShaper::new(), config),
            &args,
            &attributed_string,
            &paragraph_attributes,
            &constraints,
        ),
        #[cfg(feature = "cosmic-text")]
        Backend::Cosmic => run(
            TextLayoutManager::with_config(cosmic_measurer(&args.fonts)?, config),
            &args,
            &attributed_string,
            &paragraph_attributes,
            &constraints,
        ),
        #[cfg(not(feature = "cosmic-text"))]
        Backend::Cosmic => anyhow::bail!("kryon-measure was built without the cosmic-text feature"),
    }
}

#[cfg(feature = "cosmic-text")]
fn cosmic_measurer(fonts: &[PathBuf]) -> Result<kryon_text::CosmicTextMeasurer> {
    let measurer = kryon_text::CosmicTextMeasurer::new();
    for path in fonts {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        measurer.load_font_data(data);
        info!("Loaded font: {}", path.display());
    }
    debug!("{} font faces available", measurer.face_count());
    Ok(measurer)
}

fn load_attributed_string(args: &Args) -> Result<AttributedString> {
    match (&args.input, &args.text) {
        (Some(path), _) => {
            info!("Loading attributed string: {}", path.display());
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse attributed string in {}", path.display()))
        }
        (None, Some(text)) => {
            Ok(AttributedString::from(text.as_str()).with_base_attributes(TextAttributes::new()))
        }
        (None, None) => anyhow::bail!("Either a text argument or --input is required"),
    }
}

fn run<M: TextMeasurer>(
    manager: TextLayoutManager<M>,
    args: &Args,
    attributed_string: &AttributedString,
    paragraph_attributes: &ParagraphAttributes,
    constraints: &LayoutConstraints,
) -> Result<()> {
    let mut measurement = None;
    for pass in 0..args.repeat.max(1) {
        let started = Instant::now();
        let result = manager
            .measure(attributed_string, paragraph_attributes, constraints)
            .context("Failed to measure text")?;
        debug!("Pass {} took {:?}", pass + 1, started.elapsed());
        measurement = Some(result);
    }
    let measurement = measurement.context("No measurement produced")?;

    let lines = if args.lines {
        manager
            .measure_lines(attributed_string, paragraph_attributes, measurement.size)
            .context("Failed to measure lines")?
    } else {
        Vec::new()
    };
    let stats = manager.cache_stats();

    match args.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "measurement": &*measurement,
                "lines": lines,
                "cache": stats,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("size: {} x {}", measurement.size.x, measurement.size.y);
            for (index, attachment) in measurement.attachments.iter().enumerate() {
                let frame = attachment.frame;
                println!(
                    "attachment {}: ({}, {}) {} x {}{}",
                    index,
                    frame.position.x,
                    frame.position.y,
                    frame.size.x,
                    frame.size.y,
                    if attachment.is_clipped { " clipped" } else { "" }
                );
            }
            let text = attributed_string.to_plain_text();
            for (index, line) in lines.iter().enumerate() {
                let end = line.range.end().min(text.len());
                let start = line.range.location.min(end);
                println!(
                    "line {}: y={} width={} baseline={} {:?}",
                    index,
                    line.frame.position.y,
                    line.frame.size.x,
                    line.baseline,
                    text.get(start..end).unwrap_or_default()
                );
            }
            println!(
                "cache: {} hits, {} misses, {} evictions",
                stats.hits, stats.misses, stats.evictions
            );
        }
    }

    Ok(())
}
