use std::io::{self, Read};

use clap::{Args, Parser, Subcommand};
use neardup::algo::tokenizer::Shingling;
use neardup::config::{KeyWidth, LshConfig, ScoreMode};
use neardup::ops;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "neardup",
    version,
    about = "Near-duplicate detection with MinHash signatures and LSH banding"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the text and the id of each JSON record live, and how to shingle it.
#[derive(Args)]
struct InputArgs {
    /// JSON field containing text
    #[arg(short, long, default_value = "content")]
    field: String,
    /// JSON field containing the document id (row index when absent)
    #[arg(long, default_value = "id")]
    id_field: String,
    /// Shingle kind: chars, words
    #[arg(long, default_value = "chars")]
    shingle: String,
    /// Shingle size (characters or words)
    #[arg(short = 'k', long, default_value_t = 5)]
    size: usize,
}

#[derive(Args)]
struct LshArgs {
    /// JSON config file; explicit flags below override it
    #[arg(long)]
    config: Option<String>,
    /// Number of MinHash functions
    #[arg(long)]
    hashes: Option<usize>,
    /// Number of LSH bands (must divide --hashes)
    #[arg(long)]
    bands: Option<usize>,
    /// Buckets per band
    #[arg(long)]
    buckets: Option<usize>,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Similarity threshold (pairs strictly above are reported)
    #[arg(short, long)]
    threshold: Option<f64>,
    /// Scoring: exact, estimated
    #[arg(long)]
    score: Option<String>,
    /// Band key width: full, byte
    #[arg(long)]
    key_width: Option<String>,
    /// Cap on candidate pairs handed to verification
    #[arg(long)]
    max_candidates: Option<usize>,
    /// Process bands and verification on one thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report near-duplicate pairs found through LSH
    Pairs {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        lsh: LshArgs,
    },
    /// Report pairs above the threshold by exact all-pairs comparison
    Exact {
        #[command(flatten)]
        input: InputArgs,
        /// Similarity threshold
        #[arg(short, long, default_value_t = 0.8)]
        threshold: f64,
    },
    /// Annotate records with near-duplicate groups
    Dedup {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        lsh: LshArgs,
    },
    /// Add MinHash signatures to records
    Signatures {
        #[command(flatten)]
        input: InputArgs,
        /// Number of MinHash functions
        #[arg(long, default_value_t = 100)]
        hashes: usize,
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Compare two strings: exact and estimated Jaccard
    Jaccard {
        /// First string
        a: String,
        /// Second string
        b: String,
        /// Shingle kind: chars, words
        #[arg(long, default_value = "chars")]
        shingle: String,
        /// Shingle size
        #[arg(short = 'k', long, default_value_t = 3)]
        size: usize,
        /// Number of MinHash functions
        #[arg(long, default_value_t = 128)]
        hashes: usize,
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Pairs { input, lsh } => with_rows(|rows| {
            ops::op_similar_pairs(
                rows,
                &input.id_field,
                &input.field,
                shingling(&input.shingle, input.size),
                lsh_config(&lsh),
            )
        }),
        Commands::Exact { input, threshold } => with_rows(|rows| {
            ops::op_exact_pairs(
                rows,
                &input.id_field,
                &input.field,
                shingling(&input.shingle, input.size),
                threshold,
            )
        }),
        Commands::Dedup { input, lsh } => with_rows(|rows| {
            ops::op_dedup(
                rows,
                &input.id_field,
                &input.field,
                shingling(&input.shingle, input.size),
                lsh_config(&lsh),
            )
        }),
        Commands::Signatures {
            input,
            hashes,
            seed,
        } => with_rows(|rows| {
            ops::op_signatures(
                rows,
                &input.id_field,
                &input.field,
                shingling(&input.shingle, input.size),
                hashes,
                seed,
            )
        }),
        Commands::Jaccard {
            a,
            b,
            shingle,
            size,
            hashes,
            seed,
        } => ops::op_jaccard(&a, &b, shingling(&shingle, size), hashes, seed),
    };

    match result {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(&e.to_string()),
        },
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(msg: &str) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

fn with_rows(op: impl FnOnce(&[Value]) -> neardup::Result<Value>) -> neardup::Result<Value> {
    let rows = read_stdin_json()?;
    op(&rows)
}

fn read_stdin_json() -> neardup::Result<Vec<Value>> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let parsed: Value = serde_json::from_str(&buf)?;
    Ok(match parsed {
        Value::Array(arr) => arr,
        single => vec![single],
    })
}

fn shingling(kind: &str, size: usize) -> Shingling {
    Shingling::from_parts(kind, size).unwrap_or_else(|| {
        fail(&format!(
            "Unknown shingling '{kind}' of size {size}. Use: chars, words with size >= 1"
        ))
    })
}

fn lsh_config(args: &LshArgs) -> LshConfig {
    let mut config = match &args.config {
        Some(path) => LshConfig::from_json_file(path).unwrap_or_else(|e| fail(&e.to_string())),
        None => LshConfig::new(args.seed.unwrap_or(42)),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(hashes) = args.hashes {
        config.num_hashes = hashes;
    }
    if let Some(bands) = args.bands {
        config.num_bands = bands;
    }
    if let Some(buckets) = args.buckets {
        config.num_buckets = buckets;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(score) = &args.score {
        config.score = ScoreMode::from_str(score)
            .unwrap_or_else(|| fail(&format!("Unknown score '{score}'. Use: exact, estimated")));
    }
    if let Some(width) = &args.key_width {
        config.key_width = KeyWidth::from_str(width)
            .unwrap_or_else(|| fail(&format!("Unknown key width '{width}'. Use: full, byte")));
    }
    if args.max_candidates.is_some() {
        config.max_candidates = args.max_candidates;
    }
    if args.sequential {
        config.parallel = false;
    }
    config
}
