use crate::error::{EmbagError, Result};
use serde::{Deserialize, Serialize};

/// Half-open range of positions in the index sequence that make up one bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BagRange {
    pub start: usize,
    pub end: usize,
}

impl BagRange {
    pub fn len(&self) -> usize { self.end - self.start }
    pub fn is_empty(&self) -> bool { self.start == self.end }
}

/// How the caller's offsets mark the end of the last bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetConvention {
    /// One offset per bag; the last bag ends at the total index count.
    Exclusive,
    /// The last offset already equals the total index count; `len - 1` bags.
    Inclusive,
}

impl OffsetConvention {
    pub fn from_include_last(include_last_offset: bool) -> Self {
        if include_last_offset { OffsetConvention::Inclusive } else { OffsetConvention::Exclusive }
    }

    /// Number of bags `n_offsets` offsets describe.
    pub fn bag_count(self, n_offsets: usize) -> usize {
        match self {
            OffsetConvention::Exclusive => n_offsets,
            OffsetConvention::Inclusive => n_offsets.saturating_sub(1),
        }
    }
}

fn bound(v: i64, total: usize) -> Result<usize> {
    if v < 0 {
        return Err(EmbagError::Consistency(format!("negative offset {}", v)));
    }
    if v as u64 > total as u64 {
        return Err(EmbagError::Consistency(format!("offset {} exceeds index count {}", v, total)));
    }
    Ok(v as usize)
}

/// Converts bag-start offsets into one range per bag.
pub fn normalize(offsets: &[i64], total_index_count: usize, convention: OffsetConvention) -> Result<Vec<BagRange>> {
    let bags = convention.bag_count(offsets.len());
    let mut ranges = Vec::with_capacity(bags);
    for &o in offsets { bound(o, total_index_count)?; }
    for b in 0..bags {
        let start = offsets[b] as usize;
        let end = match offsets.get(b + 1) {
            Some(&e) => e as usize,
            None => total_index_count,
        };
        if start > end {
            return Err(EmbagError::Consistency(format!("bag {} starts at {} after its end {}", b, start, end)));
        }
        ranges.push(BagRange { start, end });
    }
    Ok(ranges)
}
