use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spell_core::{size_for, Layout};
use spell_service::{
    AddAll, CheckReport, IgnoreAll, PromptHandler, SpellChecker, SpellConfig, DEFAULT_CONFIG_FILE,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spell", about = "Bloom filter backed spell checker")]
struct Cli {
    /// Config file with num_words, probability, case_sensitive, dictionary_path
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Repeat for more detail (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Spell check a document against the dictionary
    Check {
        #[arg(short = 'f', long = "file", default_value = "data/test_document.csv")]
        file: PathBuf,
        /// Add every unknown word without asking
        #[arg(long, conflicts_with = "ignore_all")]
        add_all: bool,
        /// Report unknown words without asking
        #[arg(long)]
        ignore_all: bool,
    },

    /// Build the dictionary filter and print its statistics
    Info,

    /// Print the sizing for a capacity and false positive probability
    Size {
        #[arg(long)]
        capacity: u64,
        #[arg(long)]
        probability: f64,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_checker(config: &Path) -> Result<SpellChecker> {
    let cfg = SpellConfig::load(config)?;
    info!("Preparing dictionary bloom filter");
    SpellChecker::prepare(&cfg).context("preparing dictionary bloom filter")
}

fn print_report(report: &CheckReport, listed: bool) {
    if listed {
        for w in &report.misspelled {
            println!("Misspelled word: {w}");
        }
    }
    for msg in &report.degraded {
        eprintln!("warning: dictionary resize failed: {msg}");
    }
    if report.misspelled.is_empty() {
        println!("Spell check complete. Great language skills!!");
    } else {
        println!(
            "Spell check complete: checked={} misspelled={} added={} resized={}",
            report.checked,
            report.misspelled.len(),
            report.added.len(),
            report.rebuilds
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Check {
            file,
            add_all,
            ignore_all,
        } => {
            let mut checker = load_checker(&cli.config)?;
            info!("Spell checking document with bloom filter");
            let report = if add_all {
                checker.check_document(&file, &mut AddAll)?
            } else if ignore_all {
                checker.check_document(&file, &mut IgnoreAll)?
            } else {
                let stdin = io::stdin();
                let mut prompt = PromptHandler::new(stdin.lock(), io::stdout());
                checker.check_document(&file, &mut prompt)?
            };
            print_report(&report, add_all || ignore_all);
        }
        Cmd::Info => {
            let checker = load_checker(&cli.config)?;
            let dict = checker.dictionary();
            let s = dict.filter().stats();
            let layout = match s.layout {
                Layout::Bits => "bits",
                Layout::Counters => "counters",
            };
            println!("capacity        : {}", s.capacity);
            println!("fpp target      : {}", s.false_positive_target);
            println!("case sensitive  : {}", s.case_sensitive);
            println!("layout          : {layout}");
            println!("bit length      : {}", s.bit_length);
            println!("hash count      : {}", s.hash_count);
            println!("inserted        : {}", s.inserted_count);
            println!("size (MB)       : {:.2}", s.size_in_mb());
            println!("fill ratio      : {:.4}", s.fill_ratio);
            println!("est. fpp        : {:.6}", s.estimated_false_positive_rate);
            println!("rebuilds        : {}", dict.rebuild_count());
        }
        Cmd::Size {
            capacity,
            probability,
        } => {
            let s = size_for(capacity, probability)?;
            println!("bit_length={} hash_count={}", s.bit_length, s.hash_count);
            println!("size (MB)={:.2}", s.bit_length as f64 / 8e6);
        }
    }
    Ok(())
}
