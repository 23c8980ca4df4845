use crate::error::{EmbagError, Result};

/// Map entry for a row that was removed from storage.
pub const PRUNED: i32 = -1;

/// Dense map from caller-facing row ids to storage rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruningMap {
    map: Vec<i32>,
}

impl PruningMap {
    /// Entries must be a storage row (`>= 0`) or [`PRUNED`].
    pub fn new(map: Vec<i32>) -> Result<Self> {
        if let Some(i) = map.iter().position(|&v| v < PRUNED) {
            return Err(EmbagError::Domain(format!("pruning map entry {} is {}, expected a row id or {}", i, map[i], PRUNED)));
        }
        Ok(Self { map })
    }

    pub fn domain_size(&self) -> usize { self.map.len() }

    pub fn pruned_count(&self) -> usize { self.map.iter().filter(|&&v| v == PRUNED).count() }

    pub fn as_slice(&self) -> &[i32] { &self.map }

    /// Storage row for `raw_id`, or None when that row was pruned.
    #[inline]
    pub fn resolve(&self, raw_id: i64) -> Result<Option<i64>> {
        if raw_id < 0 || raw_id as u64 >= self.map.len() as u64 {
            return Err(EmbagError::Domain(format!(
                "index {} outside pruning map domain of {} rows", raw_id, self.map.len()
            )));
        }
        match self.map[raw_id as usize] {
            PRUNED => Ok(None),
            id => Ok(Some(id as i64)),
        }
    }
}

/// With no map the id passes through unchanged; the caller checks it against the table.
#[inline]
pub fn resolve(raw_id: i64, map: Option<&PruningMap>) -> Result<Option<i64>> {
    match map {
        None => Ok(Some(raw_id)),
        Some(m) => m.resolve(raw_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_and_skips() {
        let m = PruningMap::new(vec![PRUNED, 5, 0]).unwrap();
        assert_eq!(m.domain_size(), 3);
        assert_eq!(m.pruned_count(), 1);
        assert_eq!(m.resolve(0).unwrap(), None);
        assert_eq!(m.resolve(1).unwrap(), Some(5));
        assert_eq!(m.resolve(2).unwrap(), Some(0));
        assert!(matches!(m.resolve(3), Err(EmbagError::Domain(_))));
        assert!(matches!(m.resolve(-1), Err(EmbagError::Domain(_))));
    }

    #[test]
    fn disabled_passes_through() {
        assert_eq!(resolve(42, None).unwrap(), Some(42));
        assert_eq!(resolve(-3, None).unwrap(), Some(-3));
    }

    #[test]
    fn rejects_bad_sentinel() {
        assert!(matches!(PruningMap::new(vec![0, -2]), Err(EmbagError::Domain(_))));
    }
}
