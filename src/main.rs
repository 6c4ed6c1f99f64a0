mod db;
mod fetch;
mod parser;

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use parser::segment::{self, SegmentConfig};

#[derive(Parser)]
#[command(name = "cboa_rules", about = "CBOA rules-modifications page scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SegmentArgs {
    /// Substring that marks a line as a section heading
    #[arg(long, default_value = segment::DEFAULT_MARKER)]
    marker: String,
    /// Lines at or above this char count are never headings
    #[arg(long, default_value_t = segment::DEFAULT_MAX_HEADING_LEN)]
    max_heading_len: usize,
    /// Minimum body chars for a section to be kept
    #[arg(long, default_value_t = segment::DEFAULT_MIN_BODY_LEN)]
    min_body_len: usize,
    /// Noise substring to filter from bodies (repeatable; replaces the
    /// built-in navigation/footer list when given)
    #[arg(long = "noise")]
    noise_terms: Vec<String>,
}

impl SegmentArgs {
    fn into_config(self) -> SegmentConfig {
        let defaults = SegmentConfig::default();
        SegmentConfig {
            marker: self.marker,
            max_heading_len: self.max_heading_len,
            min_body_len: self.min_body_len,
            noise_terms: if self.noise_terms.is_empty() {
                defaults.noise_terms
            } else {
                self.noise_terms
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the rules page and store its visible text as a capture
    Fetch {
        #[arg(long, default_value = fetch::DEFAULT_URL)]
        url: String,
    },
    /// Store a capture from a text file ("-" reads stdin)
    Import {
        /// Path to a file of visible page text
        path: PathBuf,
    },
    /// Segment unprocessed captures into sections
    Process {
        /// Max captures to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[command(flatten)]
        segment: SegmentArgs,
    },
    /// Write a capture's sections as JSON and Markdown
    Export {
        /// Capture to export (default: latest)
        #[arg(long)]
        capture: Option<i64>,
        #[arg(long, default_value = "cboa_rules.json")]
        json: PathBuf,
        #[arg(long, default_value = "cboa_rules.md")]
        markdown: PathBuf,
    },
    /// Fetch + process + export in one pipeline
    Run {
        #[arg(long, default_value = fetch::DEFAULT_URL)]
        url: String,
        #[command(flatten)]
        segment: SegmentArgs,
    },
    /// Section table for a capture
    Overview {
        /// Capture to show (default: latest)
        #[arg(long)]
        capture: Option<i64>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show capture and section counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch { url } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let text = fetch::page_text(&url).await?;
            let id = db::insert_capture(&conn, &url, &text)?;
            println!("Stored capture {} ({} lines)", id, text.lines().count());
            Ok(())
        }
        Commands::Import { path } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let (source, text) = read_import(&path)?;
            let id = db::insert_capture(&conn, &source, &text)?;
            println!("Stored capture {} from {} ({} lines)", id, source, text.lines().count());
            Ok(())
        }
        Commands::Process { limit, segment } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let config = segment.into_config();
            config.validate()?;
            let captures = db::fetch_unprocessed(&conn, limit)?;
            if captures.is_empty() {
                println!("No unprocessed captures. Run 'fetch' or 'import' first.");
                return Ok(());
            }
            println!("Processing {} captures...", captures.len());
            let sections = process_captures(&conn, &captures, &config)?;
            println!("Saved {} sections from {} captures.", sections, captures.len());
            Ok(())
        }
        Commands::Export { capture, json, markdown } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            export_capture(&conn, capture, &json, &markdown)
        }
        Commands::Run { url, segment } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let config = segment.into_config();
            config.validate()?;

            let text = fetch::page_text(&url).await?;
            let id = db::insert_capture(&conn, &url, &text)?;
            println!("Stored capture {} ({} lines)", id, text.lines().count());

            let captures = db::fetch_unprocessed(&conn, None)?;
            let sections = process_captures(&conn, &captures, &config)?;
            println!("Saved {} sections.", sections);

            export_capture(
                &conn,
                Some(id),
                &PathBuf::from("cboa_rules.json"),
                &PathBuf::from("cboa_rules.md"),
            )
        }
        Commands::Overview { capture, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let Some(capture_id) = capture.or(db::latest_capture_id(&conn)?) else {
                println!("No captures yet.");
                return Ok(());
            };
            let rows = db::fetch_sections(&conn, capture_id)?;
            if rows.is_empty() {
                println!("No sections for capture {}. Run 'process' first.", capture_id);
                return Ok(());
            }

            println!("{:>3} | {:<56} | {:>5} | {:>6}", "#", "Section", "Lines", "Chars");
            println!("{}", "-".repeat(80));
            for r in rows.iter().take(limit) {
                println!(
                    "{:>3} | {:<56} | {:>5} | {:>6}",
                    r.position + 1,
                    truncate(&r.title, 56),
                    r.body.lines().count(),
                    r.body_len,
                );
            }
            println!("\n{} sections in capture {}", rows.len(), capture_id);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Captures:    {}", s.captures);
            println!("Processed:   {}", s.processed);
            println!("Unprocessed: {}", s.unprocessed);
            println!("Sections:    {}", s.sections);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn read_import(path: &PathBuf) -> anyhow::Result<(String, String)> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(("stdin".to_string(), text))
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok((path.display().to_string(), text))
    }
}

/// Segment captures in parallel, then save each result to the DB.
/// Returns the total section count saved.
fn process_captures(
    conn: &rusqlite::Connection,
    captures: &[db::Capture],
    config: &SegmentConfig,
) -> anyhow::Result<usize> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(captures.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len}")?
            .progress_chars("=> "),
    );

    let results: Vec<_> = captures
        .par_iter()
        .map(|c| (c.id, parser::process_capture(c, config)))
        .collect();

    let mut total = 0;
    for (capture_id, result) in results {
        let sections = result?;
        if sections.is_empty() {
            warn!("Capture {} produced no sections", capture_id);
        }
        total += sections.len();
        db::save_sections(conn, capture_id, &sections)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(total)
}

fn export_capture(
    conn: &rusqlite::Connection,
    capture: Option<i64>,
    json_path: &PathBuf,
    md_path: &PathBuf,
) -> anyhow::Result<()> {
    let Some(capture_id) = capture.or(db::latest_capture_id(conn)?) else {
        println!("No captures yet. Run 'fetch' or 'import' first.");
        return Ok(());
    };

    let rows = db::fetch_sections(conn, capture_id)?;
    if rows.is_empty() {
        println!("No sections for capture {}. Run 'process' first.", capture_id);
        return Ok(());
    }

    let sections: Vec<parser::segment::Section> = rows
        .into_iter()
        .map(|r| parser::segment::Section {
            title: r.title,
            body: r.body,
        })
        .collect();

    let source = db::capture_source(conn, capture_id)?;
    std::fs::write(json_path, parser::render::to_json(&sections)?)?;
    std::fs::write(
        md_path,
        parser::render::to_markdown(&sections, &source, chrono::Local::now()),
    )?;

    println!(
        "Exported {} sections to {} and {}",
        sections.len(),
        json_path.display(),
        md_path.display(),
    );
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
