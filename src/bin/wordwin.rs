use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde_json::json;
use wordwin::config::{DEFAULT_EOS_TOKEN, DEFAULT_NUMERIC_PLACEHOLDER};
use wordwin::corpus::collect_paths;
use wordwin::normalize::normalize_reader;
use wordwin::serialization;
use wordwin::stopwords::{default_ignore_words, load_ignore_file};
use wordwin::tokenize::replace_numeric_tokens;
use wordwin::{
    subsample, tokenize, tokenize_text, window, Encoding, IngestConfig, NormalizationOrder,
    SubsampleConfig, TokenizerConfig, VocabularyConfig, VocabularyExtractor, WindowConfig,
};

const DEFAULT_OUTPUT: &str = "vocab.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Corpus vocabulary and skip-gram window toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract a vocabulary from text files
    Vocab(VocabArgs),
    /// Stream id windows from text files with an extracted vocabulary
    Windows(WindowsArgs),
    /// Tokenize a string the way documents are tokenized
    Tokenize(TokenizeArgs),
    /// Inspect vocabulary metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct VocabArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the vocabulary JSON
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Input encoding (latin1, ascii, utf-8)
    #[arg(long, value_name = "ENCODING", default_value = "latin1")]
    encoding: Encoding,

    /// Minimum corpus frequency (0 disables)
    #[arg(long, value_name = "COUNT")]
    min_count: Option<u64>,

    /// Minimum token length in characters
    #[arg(long, value_name = "LEN")]
    min_word_size: Option<usize>,

    /// Maximum number of counted words (0 keeps all)
    #[arg(long, value_name = "SIZE")]
    max_vocab_size: Option<usize>,

    /// Number of parallel workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Keep stopwords and TREC markup tokens in the vocabulary
    #[arg(long)]
    include_stopwords: bool,

    /// Additional ignore words, one per line
    #[arg(long, value_name = "PATH")]
    ignore_file: Option<PathBuf>,

    /// Keep numeric tokens instead of mapping them to a placeholder
    #[arg(long)]
    no_numeric_placeholder: bool,

    /// Filter scripts before NFKC normalisation
    #[arg(long)]
    raw_normalization: bool,

    /// Also write a `token id` listing
    #[arg(long, value_name = "PATH")]
    listing: Option<PathBuf>,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Disable progress logging and the spinner
    #[arg(long)]
    no_progress: bool,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct WindowsArgs {
    /// Vocabulary JSON to load
    #[arg(short = 'm', long, value_name = "PATH")]
    vocabulary: PathBuf,

    /// Text files to window
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Input encoding (latin1, ascii, utf-8)
    #[arg(long, value_name = "ENCODING", default_value = "latin1")]
    encoding: Encoding,

    /// Window size (repeat flag)
    #[arg(long = "window-size", value_name = "N")]
    window_sizes: Vec<usize>,

    /// Skip size (repeat flag)
    #[arg(long = "skip", value_name = "K")]
    skips: Vec<usize>,

    /// Positions dropped after each window
    #[arg(long, value_name = "S", default_value_t = 1)]
    stride: usize,

    /// Pad trailing windows with this token
    #[arg(long, value_name = "TOKEN")]
    padding: Option<String>,

    /// Subsampling threshold ratio
    #[arg(long, value_name = "T")]
    subsample: Option<f64>,

    /// Seed for subsampling draws
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Keep numeric tokens instead of mapping them to a placeholder
    #[arg(long)]
    no_numeric_placeholder: bool,

    /// Filter scripts before NFKC normalisation (match the vocab build)
    #[arg(long)]
    raw_normalization: bool,

    /// Emit one JSON array per window
    #[arg(long)]
    json: bool,

    /// Write windows to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TokenizeArgs {
    /// Text to tokenize
    #[arg(required = true)]
    text: Vec<String>,

    /// Drop stopwords from the output
    #[arg(long)]
    drop_stopwords: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Vocabulary JSON to inspect
    #[arg(short = 'm', long, value_name = "PATH")]
    vocabulary: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,

    /// Number of most frequent entries to list
    #[arg(long, value_name = "N", default_value_t = 10)]
    top: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Vocab(args) => run_vocab(args),
        Commands::Windows(args) => run_windows(args),
        Commands::Tokenize(args) => run_tokenize(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg} {elapsed}")
        .context("invalid spinner template")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn run_vocab(args: VocabArgs) -> Result<()> {
    let mut ignore_tokens = if args.include_stopwords {
        BTreeSet::new()
    } else {
        default_ignore_words(true)
    };
    if let Some(path) = &args.ignore_file {
        let extra = load_ignore_file(path)
            .with_context(|| format!("failed to read ignore file {}", path.display()))?;
        ignore_tokens.extend(extra);
    }

    let mut cfg = VocabularyConfig::builder()
        .encoding(args.encoding)
        .ignore_tokens(ignore_tokens)
        .show_progress(!args.no_progress);
    if let Some(min_count) = args.min_count {
        cfg = cfg.min_count(min_count);
    }
    if let Some(min_word_size) = args.min_word_size {
        cfg = cfg.min_word_size(min_word_size);
    }
    if let Some(max_vocab_size) = args.max_vocab_size {
        cfg = cfg.max_vocab_size(max_vocab_size);
    }
    if let Some(workers) = args.workers {
        cfg = cfg.num_workers(workers);
    }
    if args.no_numeric_placeholder {
        cfg = cfg.numeric_placeholder(None::<String>);
    }
    if args.raw_normalization {
        cfg = cfg.normalization(NormalizationOrder::Raw);
    }
    let vocab_cfg = cfg.build()?;

    let ingest_cfg = IngestConfig {
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
    };
    let files = collect_paths(&args.inputs, &ingest_cfg).context("failed to collect inputs")?;
    info!("collected {} input files", files.len());

    let pb = if args.no_progress {
        None
    } else {
        Some(spinner("counting tokens...")?)
    };
    let start = Instant::now();
    let artifacts = VocabularyExtractor::new(vocab_cfg).extract_from_paths(&files)?;
    if let Some(pb) = pb {
        pb.finish_with_message("extraction complete");
    }
    let elapsed = start.elapsed();

    serialization::save_vocabulary(&artifacts.vocabulary, &args.output, args.pretty)
        .with_context(|| format!("failed to save vocabulary to {}", args.output.display()))?;
    if let Some(listing) = &args.listing {
        serialization::save_listing(&artifacts.vocabulary, listing)
            .with_context(|| format!("failed to write listing {}", listing.display()))?;
    }

    let metrics = &artifacts.metrics;
    info!(
        "extraction complete: words={} observed={} chunks={} workers={} duration={elapsed:.2?}",
        metrics.retained_words, metrics.observed_tokens, metrics.chunks, metrics.workers
    );
    println!(
        "wrote vocabulary with {} words ({} impressions) to {}",
        artifacts.vocabulary.len(),
        artifacts.vocabulary.num_word_impressions(),
        args.output.display()
    );
    Ok(())
}

fn run_windows(args: WindowsArgs) -> Result<()> {
    let vocabulary = serialization::load_vocabulary(&args.vocabulary).with_context(|| {
        format!("failed to load vocabulary from {}", args.vocabulary.display())
    })?;

    let mut builder = WindowConfig::builder().stride(args.stride);
    if !args.window_sizes.is_empty() {
        builder = builder.window_sizes(args.window_sizes.iter().copied());
    }
    if !args.skips.is_empty() {
        builder = builder.skips(args.skips.iter().copied());
    }
    let window_cfg = builder.padding_token(args.padding.clone()).build()?;
    let subsample_cfg = args
        .subsample
        .map(|threshold| SubsampleConfig {
            threshold,
            seed: args.seed,
        });

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let order = if args.raw_normalization {
        NormalizationOrder::Raw
    } else {
        NormalizationOrder::Composed
    };

    let mut emitted = 0u64;
    for path in &args.inputs {
        let file =
            File::open(path).with_context(|| format!("failed to open input {}", path.display()))?;
        let chars = normalize_reader(file, args.encoding, order);
        let tokens = tokenize(chars, TokenizerConfig::default());
        let tokens: Box<dyn Iterator<Item = String>> = if args.no_numeric_placeholder {
            Box::new(tokens)
        } else {
            Box::new(replace_numeric_tokens(
                tokens,
                DEFAULT_NUMERIC_PLACEHOLDER.to_string(),
            ))
        };
        let tokens: Box<dyn Iterator<Item = String> + '_> = match &subsample_cfg {
            Some(cfg) => Box::new(subsample(
                tokens,
                vocabulary.num_word_impressions(),
                &vocabulary,
                cfg,
            )?),
            None => tokens,
        };

        let mut windows = window(tokens, &vocabulary, window_cfg.clone())?;
        for ids in windows.by_ref() {
            if args.json {
                writeln!(out, "{}", serde_json::to_string(&ids)?)?;
            } else {
                let line = ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(out, "{line}")?;
            }
        }
        let stats = windows.stats();
        info!(
            "{}: {} windows ({} padded)",
            path.display(),
            stats.emitted,
            stats.padded
        );
        emitted += stats.emitted;
    }
    out.flush()?;

    if emitted == 0 {
        warn!("no windows were emitted");
    }
    Ok(())
}

fn run_tokenize(args: TokenizeArgs) -> Result<()> {
    let text = args.text.join(" ");
    let ignore = if args.drop_stopwords {
        default_ignore_words(true)
    } else {
        BTreeSet::new()
    };
    let tokens = tokenize_text(&text, ignore);
    println!("{}", tokens.join(" "));
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let vocabulary = serialization::load_vocabulary(&args.vocabulary).with_context(|| {
        format!("failed to load vocabulary from {}", args.vocabulary.display())
    })?;

    let top: Vec<_> = vocabulary
        .iter()
        .take(args.top)
        .map(|(token, word)| json!({"token": token, "id": word.id, "count": word.count}))
        .collect();
    let summary = json!({
        "path": args.vocabulary.display().to_string(),
        "words": vocabulary.len(),
        "total_count": vocabulary.num_word_impressions(),
        "eos_token": vocabulary.get(DEFAULT_EOS_TOKEN).map(|word| word.id),
        "numeric_placeholder": vocabulary.get(DEFAULT_NUMERIC_PLACEHOLDER).map(|word| word.id),
        "top": top,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Words        : {}", vocabulary.len());
        println!("Total count  : {}", vocabulary.num_word_impressions());
        match vocabulary.get(DEFAULT_EOS_TOKEN) {
            Some(word) => println!("EOS token    : {DEFAULT_EOS_TOKEN} (id {})", word.id),
            None => println!("EOS token    : (missing)"),
        }
        for (token, word) in vocabulary.iter().take(args.top) {
            println!("{:>8} {:>12} {token}", word.id, word.count);
        }
    }
    Ok(())
}
