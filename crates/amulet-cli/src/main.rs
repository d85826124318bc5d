//! Amulet CLI
//!
//! Mines short generated texts whose SHA-256 digest holds a run of 8s.

mod config;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};

use amulet_core::{
    aggregate, AmuletMiner, CandidateSource, CsvReportSink, DigestFilter, Hit, ListSource, MarkovSource,
    Rarity, Report, ReportSink,
};
use amulet_pattern::{classify, expected_attempts, format_attempts, longest_run, tier_probability, LUCKY_DIGIT};

use crate::config::RunConfig;

#[derive(Parser)]
#[command(name = "amulet")]
#[command(author = "Amulet Team")]
#[command(version = "0.1.0")]
#[command(about = "Search generated text for SHA-256 amulets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine for amulets and append them to the CSV file
    Mine(MineArgs),

    /// Hash one text and show its rarity
    Check {
        /// Text to check
        text: String,
    },

    /// List rarity tiers and their odds
    Tiers,
}

#[derive(Args)]
struct MineArgs {
    /// JSON config file (flags override its values)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of workers (0 = auto)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of attempts
    #[arg(short, long)]
    attempts: Option<u64>,

    /// Attempts claimed per worker batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum time in seconds (0 = unlimited)
    #[arg(long)]
    max_time: Option<u64>,

    /// Corpus file for the Markov model
    #[arg(short, long)]
    corpus: Option<PathBuf>,

    /// Word list to cycle through instead of the Markov model
    #[arg(long)]
    wordlist: Option<PathBuf>,

    /// Markov state size in words
    #[arg(long)]
    state_size: Option<usize>,

    /// CSV file amulets are appended to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// No live progress or per-amulet lines
    #[arg(short, long)]
    quiet: bool,
}

impl MineArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.mine.workers = workers;
        }
        if let Some(attempts) = self.attempts {
            config.mine.attempts = attempts;
        }
        if let Some(batch_size) = self.batch_size {
            config.mine.batch_size = batch_size;
        }
        if let Some(max_time) = self.max_time {
            config.mine.max_time_secs = max_time;
        }
        if let Some(corpus) = &self.corpus {
            config.source.corpus = corpus.clone();
        }
        if let Some(wordlist) = &self.wordlist {
            config.source.wordlist = Some(wordlist.clone());
        }
        if let Some(state_size) = self.state_size {
            config.source.markov.state_size = state_size;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mine(args) => cmd_mine(&args)?,
        Commands::Check { text } => cmd_check(&text),
        Commands::Tiers => cmd_tiers(),
    }

    Ok(())
}

fn cmd_mine(args: &MineArgs) -> Result<()> {
    let config = args.resolve()?;
    let verbose = !args.json && !args.quiet;

    let source: Arc<dyn CandidateSource> = match &config.source.wordlist {
        Some(path) => Arc::new(
            ListSource::from_path(path).with_context(|| format!("Failed to load word list {}", path.display()))?,
        ),
        None => Arc::new(
            MarkovSource::from_path(&config.source.corpus, config.source.markov.clone())
                .with_context(|| format!("Failed to build Markov model from {}", config.source.corpus.display()))?,
        ),
    };

    if !args.json {
        eprintln!("Run Configuration:");
        eprintln!("Workers used: {}", config.mine.worker_count());
        eprintln!("Attempts tried: {}", config.mine.attempts);
        eprintln!("Source: {} ({})", source.name(), source.kind());
        eprintln!();
    }

    let mut miner = AmuletMiner::new(source, config.mine.clone());

    // Live amulet lines
    let printer = if verbose {
        let feed = miner.subscribe();
        Some(thread::spawn(move || {
            for hit in feed {
                eprintln!("\rAmulet found: {} ({})", hit.text(), hit.rarity());
            }
        }))
    } else {
        None
    };

    let started = Instant::now();
    let result = miner.run_with_callback(|stats| {
        if verbose {
            eprint!("\r{}", stats.format());
            let _ = std::io::stderr().flush();
        }
    });
    if verbose {
        eprintln!();
    }

    // Closing the feed lets the printer finish
    drop(miner);
    if let Some(handle) = printer {
        let _ = handle.join();
    }

    let (report, failure) = match result {
        Ok(outcome) => {
            if !outcome.is_complete() {
                warn!(
                    "Completed {} of {} attempts",
                    outcome.attempts, outcome.requested
                );
            }
            (outcome.into_report(), None)
        }
        Err(err) => {
            let attempts = err.attempts_completed();
            error!(
                "Mining failed after {} of {} attempts: {}",
                attempts, config.mine.attempts, err
            );
            let message = err.to_string();
            let hits = err.into_partial_hits();
            (aggregate(hits, attempts, started.elapsed()), Some(message))
        }
    };

    let mut sink = CsvReportSink::new(&config.output);
    let persisted = sink.append(&report);
    if let Err(err) = &persisted {
        error!("{err}; {} amulets were not saved", report.entries.len());
    }

    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print_summary(&report, &sink.location());
    }

    if let Some(message) = failure {
        anyhow::bail!("Mining aborted: {message}");
    }
    persisted.context("Failed to save amulets")?;

    Ok(())
}

fn cmd_check(text: &str) {
    print!("{}", render_check(&DigestFilter::sha256(), text));
}

/// Filter and classifier verdict for one text
fn render_check(filter: &DigestFilter, text: &str) -> String {
    let verdict = filter.check(text);

    let mut out = format!("Text:     {}\nBytes:    {}\n", text, text.len());
    match verdict.digest {
        Some(digest) => {
            let rarity = if verdict.passes {
                classify(digest.as_str())
            } else {
                Rarity::NotAnAmulet
            };
            out += &format!("SHA-256:  {}\n", digest);
            out += &format!(
                "Run:      {} x '{}'\n",
                longest_run(digest.as_str(), LUCKY_DIGIT),
                LUCKY_DIGIT
            );
            out += &format!("Amulet:   {}\n", if verdict.passes { "yes" } else { "no" });
            out += &format!("Rarity:   {}\n", rarity);
        }
        None => {
            out += &format!(
                "SHA-256:  (not computed, text exceeds {} bytes)\n",
                filter.config().max_candidate_bytes
            );
            out += "Amulet:   no\n";
        }
    }
    out
}

fn cmd_tiers() {
    println!("Rarity Tiers:");
    println!("{:-<60}", "");
    println!("{:<6} {:<12} {:<6} {:<14} {}", "Rank", "Tier", "Run", "Probability", "Expected");
    println!("{:-<60}", "");

    for tier in Rarity::REPORTABLE {
        println!(
            "{:<6} {:<12} {:<6} {:<14.3e} 1 in {}",
            tier.rank().unwrap_or(0),
            tier.label(),
            tier.run_length().map_or("-".to_string(), |l| {
                if tier == Rarity::Unknown {
                    format!("{}+", l)
                } else {
                    l.to_string()
                }
            }),
            tier_probability(tier),
            format_attempts(expected_attempts(tier))
        );
    }
}

fn print_summary(report: &Report, location: &str) {
    let stats = &report.stats;

    if report.entries.is_empty() {
        println!("No amulets found.");
    } else {
        println!("Amulets found:");
        for hit in &report.entries {
            print_hit(hit);
        }
    }

    println!();
    println!("Statistics:");
    println!("{:-<60}", "");
    println!("Execution Time:            {:.2} seconds", stats.elapsed_secs);
    println!("Attempts Completed:        {}", stats.attempts);
    println!("Total Amulets Found:       {}", stats.hits);
    println!("Unique Texts Generated:    {}", stats.unique_texts);
    println!("Average Text Length:       {:.2} characters", stats.average_length);
    println!("Attempts per Amulet Found: {}", stats.attempts_per_hit);
    println!("Amulets found by rarity:");
    for tier in &stats.tiers {
        println!("  {}: {}", tier.rarity, tier.count);
    }
    println!("CSV File: {}", location);
}

fn print_hit(hit: &Hit) {
    println!(
        "Amulet Text: {}, SHA-256 Hash: {}, Rarity: {}",
        hit.text(),
        hit.digest(),
        hit.rarity()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_run_and_tier() {
        let out = render_check(&DigestFilter::sha256(), "amulet probe 2416808");
        assert!(out.contains("Run:      7 x '8'"), "{out}");
        assert!(out.contains("Amulet:   yes"), "{out}");
        assert!(out.contains("Rarity:   epic"), "{out}");
    }

    #[test]
    fn test_check_miss_and_long_text() {
        let out = render_check(&DigestFilter::sha256(), "amulet probe 128");
        assert!(out.contains("Run:      0 x '8'"), "{out}");
        assert!(out.contains("Rarity:   not an amulet"), "{out}");

        let out = render_check(&DigestFilter::sha256(), &"a".repeat(65));
        assert!(out.contains("not computed, text exceeds 64 bytes"), "{out}");
        assert!(out.contains("Amulet:   no"), "{out}");
    }
}
