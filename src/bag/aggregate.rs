use super::offsets::BagRange;
use super::pruning::{self, PruningMap};
use crate::error::{EmbagError, Result};
use crate::table::{codec, PackedTable};

/// Read-only inputs shared by every bag of one lookup.
#[derive(Clone, Copy)]
pub struct BagInputs<'a> {
    pub table: &'a PackedTable<'a>,
    pub indices: &'a [i64],
    pub weights: Option<&'a [f32]>,
    pub pruning: Option<&'a PruningMap>,
}

impl<'a> BagInputs<'a> {
    /// Sums the weighted rows of one bag into `out` (length `dim`), in index order.
    pub fn aggregate_bag(&self, range: BagRange, out: &mut [f32]) -> Result<()> {
        out.fill(0.0);
        if range.end > self.indices.len() {
            return Err(EmbagError::Consistency(format!(
                "bag ends at {} but only {} indices were given", range.end, self.indices.len()
            )));
        }
        if let Some(ws) = self.weights {
            if ws.len() < range.end {
                return Err(EmbagError::Shape(format!("{} per-sample weights for {} indices", ws.len(), self.indices.len())));
            }
        }
        let bw = self.table.bit_width();
        for p in range.start..range.end {
            let Some(row) = pruning::resolve(self.indices[p], self.pruning)? else { continue };
            let w = self.weights.map_or(1.0, |ws| ws[p]);
            let packed = self.table.packed_row(row)?;
            codec::accumulate(bw, packed, w, out);
        }
        Ok(())
    }

    /// Aggregates consecutive bags into consecutive rows of `out`.
    pub fn aggregate_chunk(&self, ranges: &[BagRange], out: &mut [f32]) -> Result<()> {
        let dim = self.table.dim();
        if dim == 0 {
            // rows are empty but ids still have to be valid
            for &r in ranges { self.aggregate_bag(r, &mut [])?; }
            return Ok(());
        }
        for (&r, row) in ranges.iter().zip(out.chunks_exact_mut(dim)) {
            self.aggregate_bag(r, row)?;
        }
        Ok(())
    }
}
