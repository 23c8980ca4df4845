use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use qembag::{embedding_bag_table, BagOptions, BitWidth, ByteMatrix, ExecParams, PackedTable};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "embag-bench", version, about = "Benchmark pooled lookups on a random packed table")]
struct Args {
    /// Bit width of the table (4 or 8)
    #[arg(long, default_value_t = 8)]
    bits: u32,

    /// Table rows
    #[arg(long, default_value_t = 100_000)]
    rows: usize,

    /// Elements per row
    #[arg(long, default_value_t = 128)]
    dim: usize,

    /// Bags per lookup
    #[arg(long, default_value_t = 4096)]
    bags: usize,

    /// Indices per bag
    #[arg(long, default_value_t = 32)]
    bag_len: usize,

    /// Use per-sample weights
    #[arg(long, default_value_t = false)]
    weighted: bool,

    /// Worker threads (0 = rayon default pool)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Bag chunks (0 = auto)
    #[arg(long, default_value_t = 0)]
    chunks: usize,

    /// Timed iterations
    #[arg(long, default_value_t = 20)]
    iters: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let bw = BitWidth::from_bits(args.bits)?;
    if bw == BitWidth::Four && args.dim % 2 != 0 { anyhow::bail!("4-bit tables need an even dim"); }
    if args.rows == 0 { anyhow::bail!("table needs at least one row"); }
    let mut rng = SmallRng::seed_from_u64(args.seed);

    // Random payload bytes; scale/bias overwritten with sane values per row.
    let row_width = bw.row_width_for_dim(args.dim);
    let mut data = vec![0u8; args.rows * row_width];
    rng.fill(&mut data[..]);
    let payload = row_width - bw.overhead_bytes();
    for row in data.chunks_exact_mut(row_width) {
        let scale: f32 = rng.gen_range(0.001..0.1);
        let bias: f32 = rng.gen_range(-1.0..1.0);
        match bw {
            BitWidth::Eight => {
                row[payload..payload + 4].copy_from_slice(&scale.to_le_bytes());
                row[payload + 4..].copy_from_slice(&bias.to_le_bytes());
            }
            BitWidth::Four => {
                row[payload..payload + 2].copy_from_slice(&half::f16::from_f32(scale).to_le_bytes());
                row[payload + 2..].copy_from_slice(&half::f16::from_f32(bias).to_le_bytes());
            }
        }
    }
    let matrix = ByteMatrix::from_shape(&data, &[args.rows, row_width])?;
    let table = PackedTable::new(&matrix, bw)?;

    let n = args.bags * args.bag_len;
    let indices: Vec<i64> = (0..n).map(|_| rng.gen_range(0..args.rows as i64)).collect();
    let offsets: Vec<i64> = (0..args.bags).map(|b| (b * args.bag_len) as i64).collect();
    let weights: Option<Vec<f32>> = args.weighted.then(|| (0..n).map(|_| rng.gen_range(0.0..1.0)).collect());

    let mut exec = ExecParams::default();
    exec.threads = args.threads;
    exec.chunks = args.chunks;
    let opts = BagOptions::default();

    // warmup
    embedding_bag_table(&table, &indices, Some(&offsets), weights.as_deref(), None, opts, &exec)?;

    let pb = ProgressBar::new(args.iters as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {elapsed}").unwrap_or_else(|_| ProgressStyle::default_bar()));
    let t0 = Instant::now();
    let mut checksum = 0f64;
    for _ in 0..args.iters {
        let out = embedding_bag_table(&table, &indices, Some(&offsets), weights.as_deref(), None, opts, &exec)?;
        checksum += out.data.iter().map(|&v| v as f64).sum::<f64>();
        pb.inc(1);
    }
    pb.finish_and_clear();
    let dt = t0.elapsed().as_secs_f64();
    let bags_per_s = if dt > 0.0 { (args.bags * args.iters) as f64 / dt } else { 0.0 };
    println!(
        "bits={} rows={} dim={} bags={} bag_len={} workers={} elapsed={:.3}s bags/s={:.1} rows/s={:.1} checksum={:.3}",
        bw.bits(), args.rows, args.dim, args.bags, args.bag_len, exec.workers(), dt, bags_per_s,
        bags_per_s * args.bag_len as f64, checksum
    );
    Ok(())
}
