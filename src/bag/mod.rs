pub mod aggregate;
pub mod driver;
pub mod offsets;
pub mod pruning;

use crate::error::{EmbagError, Result};
use crate::table::{BitWidth, ByteMatrix, PackedTable};
use serde::{Deserialize, Serialize};

pub use aggregate::BagInputs;
pub use driver::ExecParams;
pub use offsets::{BagRange, OffsetConvention};
pub use pruning::{PruningMap, PRUNED};

/// Per-call lookup flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagOptions {
    /// Indices go through a pruning map before touching the table.
    pub pruned_weights: bool,
    /// Offsets already end with the total index count.
    pub include_last_offset: bool,
}

/// `rows x dim` row-major f32 output, one row per bag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BagOutput {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl BagOutput {
    pub fn shape(&self) -> (usize, usize) { (self.rows, self.dim) }
    pub fn row(&self, i: usize) -> &[f32] { &self.data[i * self.dim..(i + 1) * self.dim] }
    pub fn as_slice(&self) -> &[f32] { &self.data }
    pub fn into_vec(self) -> Vec<f32> { self.data }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }
}

/// Pooled lookup over `weight` read as a `bit_width` packed table, on the ambient rayon pool.
pub fn embedding_bag_lookup(
    weight: &ByteMatrix<'_>,
    indices: &[i64],
    offsets: Option<&[i64]>,
    bit_width: BitWidth,
    per_sample_weights: Option<&[f32]>,
    pruning: Option<&PruningMap>,
    opts: BagOptions,
) -> Result<BagOutput> {
    let table = PackedTable::new(weight, bit_width)?;
    embedding_bag_table(&table, indices, offsets, per_sample_weights, pruning, opts, &ExecParams::default())
}

/// Pooled lookup over an already tagged table.
///
/// Bag `b` of the output is the sum over its index range of `w[p] * decode(row(indices[p]))`.
/// With `pruned_weights` every index is first resolved through `pruning`; pruned rows add nothing.
pub fn embedding_bag_table(
    table: &PackedTable<'_>,
    indices: &[i64],
    offsets: Option<&[i64]>,
    per_sample_weights: Option<&[f32]>,
    pruning: Option<&PruningMap>,
    opts: BagOptions,
    exec: &ExecParams,
) -> Result<BagOutput> {
    let offsets = offsets.ok_or_else(|| EmbagError::Domain("embedding bag lookup expects offsets to be set".into()))?;
    if let Some(ws) = per_sample_weights {
        if ws.len() != indices.len() {
            return Err(EmbagError::Shape(format!(
                "per-sample weights have {} entries, indices have {}", ws.len(), indices.len()
            )));
        }
    }
    let pruning = if opts.pruned_weights {
        Some(pruning.ok_or_else(|| EmbagError::Domain("pruned lookup expects a pruning map".into()))?)
    } else {
        if pruning.is_some() { log::debug!("pruning map given without pruned_weights; ignored"); }
        None
    };

    let convention = OffsetConvention::from_include_last(opts.include_last_offset);
    let ranges = offsets::normalize(offsets, indices.len(), convention)?;
    let inputs = BagInputs { table, indices, weights: per_sample_weights, pruning };
    let dim = table.dim();
    let data = driver::run(&ranges, dim, exec, |r, o| inputs.aggregate_chunk(r, o))?;
    Ok(BagOutput { rows: ranges.len(), dim, data })
}

/// One output row per index, read from an 8-bit table.
pub fn single_embedding_lookup(
    weight: &ByteMatrix<'_>,
    indices: &[i64],
    pruned_weights: bool,
    pruning: Option<&PruningMap>,
) -> Result<BagOutput> {
    let table = PackedTable::new(weight, BitWidth::Eight)?;
    single_lookup_table(&table, indices, pruned_weights, pruning, &ExecParams::default())
}

pub(crate) fn single_lookup_table(
    table: &PackedTable<'_>,
    indices: &[i64],
    pruned_weights: bool,
    pruning: Option<&PruningMap>,
    exec: &ExecParams,
) -> Result<BagOutput> {
    let offsets: Vec<i64> = (0..indices.len() as i64).collect();
    let opts = BagOptions { pruned_weights, include_last_offset: false };
    embedding_bag_table(table, indices, Some(&offsets), None, pruning, opts, exec)
}
