use anyhow::{Context, Result};
use clap::Parser;
use qembag::{BagOptions, ExecParams, PackedEmbedding, PruningMap};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "embag", version, about = "Run a pooled lookup over a packed quantized table")]
struct Args {
    /// Packed table file (QEMBAG01)
    #[arg(long)]
    table: PathBuf,

    /// JSON lookup request
    #[arg(long)]
    request: PathBuf,

    /// Worker threads (0 = rayon default pool)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Bag chunks (0 = auto)
    #[arg(long, default_value_t = 0)]
    chunks: usize,

    /// Pretty-print the output JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

/// Lookup request. Without `offsets` every index is its own bag (8-bit tables only).
#[derive(Debug, Deserialize)]
struct Request {
    indices: Vec<i64>,
    #[serde(default)]
    offsets: Option<Vec<i64>>,
    #[serde(default)]
    per_sample_weights: Option<Vec<f32>>,
    #[serde(default)]
    pruning_map: Option<Vec<i32>>,
    #[serde(default)]
    pruned_weights: bool,
    #[serde(default)]
    include_last_offset: bool,
}

#[derive(Debug, Serialize)]
struct Response {
    shape: [usize; 2],
    output: Vec<Vec<f32>>,
    elapsed_ms: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let emb = PackedEmbedding::load(&args.table)?;
    let text = std::fs::read_to_string(&args.request)
        .with_context(|| format!("read request: {}", args.request.display()))?;
    let req: Request = serde_json::from_str(&text).context("parse request JSON")?;
    let pruning = req.pruning_map.map(PruningMap::new).transpose()?;

    let mut exec = ExecParams::default();
    exec.threads = args.threads;
    exec.chunks = args.chunks;

    let t0 = Instant::now();
    let out = match req.offsets.as_deref() {
        Some(offsets) => {
            let opts = BagOptions { pruned_weights: req.pruned_weights, include_last_offset: req.include_last_offset };
            emb.embedding_bag(&req.indices, Some(offsets), req.per_sample_weights.as_deref(), pruning.as_ref(), opts, &exec)?
        }
        None => emb
            .embedding(&req.indices, req.pruned_weights, pruning.as_ref(), &exec)
            .context("single-row lookup (request has no offsets)")?,
    };
    let dt = t0.elapsed();
    log::info!("lookup produced {} bags in {:.3}ms", out.rows, dt.as_secs_f64() * 1e3);

    let resp = Response { shape: [out.rows, out.dim], output: out.to_rows(), elapsed_ms: dt.as_secs_f64() * 1e3 };
    let s = if args.pretty { serde_json::to_string_pretty(&resp)? } else { serde_json::to_string(&resp)? };
    println!("{}", s);
    Ok(())
}
