use super::offsets::BagRange;
use crate::error::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Execution knobs for one lookup. Output does not depend on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecParams {
    /// 0 runs on the ambient rayon pool; otherwise a local pool of this many workers is built.
    pub threads: usize,
    /// Number of bag chunks; 0 picks 4 per worker.
    pub chunks: usize,
    /// Grain: at most one chunk is planned per this many bags.
    pub min_bags_per_chunk: usize,
}

impl Default for ExecParams {
    fn default() -> Self { Self { threads: 0, chunks: 0, min_bags_per_chunk: 1 } }
}

impl ExecParams {
    pub fn workers(&self) -> usize {
        if self.threads > 0 { self.threads } else { rayon::current_num_threads() }
    }

    fn target_chunks(&self) -> usize {
        if self.chunks > 0 { self.chunks } else { self.workers() * 4 }
    }
}

/// Splits `[0, bags)` into at most `chunks` contiguous, non-overlapping spans, and no more spans
/// than there are `grain`-sized groups of bags.
pub fn plan_chunks(bags: usize, chunks: usize, grain: usize) -> Vec<(usize, usize)> {
    if bags == 0 { return Vec::new(); }
    let grain = grain.max(1);
    let n = chunks.clamp(1, bags.div_ceil(grain));
    let base = bags / n;
    let extra = bags % n;
    let mut spans = Vec::with_capacity(n);
    let mut lo = 0;
    for i in 0..n {
        let len = base + usize::from(i < extra);
        spans.push((lo, lo + len));
        lo += len;
    }
    spans
}

/// Allocates a `ranges.len() x dim` output and fills it chunk by chunk with `work`.
///
/// Each call of `work` gets its own bag ranges and the matching disjoint rows of the output.
/// Any chunk error fails the whole call and the output is dropped.
pub fn run<F>(ranges: &[BagRange], dim: usize, params: &ExecParams, work: F) -> Result<Vec<f32>>
where
    F: Fn(&[BagRange], &mut [f32]) -> Result<()> + Sync + Send,
{
    let mut out = vec![0f32; ranges.len() * dim];
    let plan = plan_chunks(ranges.len(), params.target_chunks(), params.min_bags_per_chunk);
    log::debug!("bag lookup: {} bags, dim {}, {} chunks, threads {}", ranges.len(), dim, plan.len(), params.threads);
    if plan.len() <= 1 && params.threads == 0 {
        work(ranges, &mut out)?;
        return Ok(out);
    }
    {
        let mut parts: Vec<(&[BagRange], &mut [f32])> = Vec::with_capacity(plan.len());
        let mut rest: &mut [f32] = &mut out;
        for &(lo, hi) in &plan {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut((hi - lo) * dim);
            parts.push((&ranges[lo..hi], head));
            rest = tail;
        }
        let job = move || {
            parts.into_par_iter().try_for_each(|(r, o)| {
                log::trace!("chunk of {} bags", r.len());
                work(r, o)
            })
        };
        if params.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(params.threads).build()?;
            pool.install(job)?;
        } else {
            job()?;
        }
    }
    Ok(out)
}
