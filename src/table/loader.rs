use anyhow::{bail, Context};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{BitWidth, ByteMatrix, PackedTable};
use crate::bag::{self, BagOptions, BagOutput, ExecParams, PruningMap};
use crate::error::{EmbagError, Result};

const MAGIC: &[u8; 8] = b"QEMBAG01";
const VERSION: u32 = 1;

/// An owned packed table together with the bit width it was packed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedEmbedding {
    version: u32,
    bit_width: BitWidth,
    rows: usize,
    row_width: usize,
    bytes: Vec<u8>,
}

impl PackedEmbedding {
    /// Takes ownership of `rows * row_width` packed bytes.
    pub fn new(bytes: Vec<u8>, rows: usize, row_width: usize, bit_width: BitWidth) -> Result<Self> {
        if rows.checked_mul(row_width) != Some(bytes.len()) {
            return Err(EmbagError::Shape(format!(
                "{} bytes do not form {} rows of width {}", bytes.len(), rows, row_width
            )));
        }
        let emb = Self { version: VERSION, bit_width, rows, row_width, bytes };
        emb.table()?;
        Ok(emb)
    }

    pub fn version(&self) -> u32 { self.version }
    pub fn bit_width(&self) -> BitWidth { self.bit_width }
    pub fn rows(&self) -> usize { self.rows }
    pub fn row_width(&self) -> usize { self.row_width }
    pub fn bytes(&self) -> &[u8] { &self.bytes }

    pub fn dim(&self) -> usize {
        self.bit_width.dim_for_row_width(self.row_width).unwrap_or(0)
    }

    pub fn matrix(&self) -> Result<ByteMatrix<'_>> {
        ByteMatrix::from_shape(&self.bytes, &[self.rows, self.row_width])
    }

    pub fn table(&self) -> Result<PackedTable<'_>> {
        PackedTable::new(&self.matrix()?, self.bit_width)
    }

    /// Pooled lookup at this table's bit width.
    pub fn embedding_bag(
        &self,
        indices: &[i64],
        offsets: Option<&[i64]>,
        per_sample_weights: Option<&[f32]>,
        pruning: Option<&PruningMap>,
        opts: BagOptions,
        exec: &ExecParams,
    ) -> Result<BagOutput> {
        let table = self.table()?;
        bag::embedding_bag_table(&table, indices, offsets, per_sample_weights, pruning, opts, exec)
    }

    /// One row per index. Only 8-bit tables support this lookup.
    pub fn embedding(&self, indices: &[i64], pruned_weights: bool, pruning: Option<&PruningMap>, exec: &ExecParams) -> Result<BagOutput> {
        if self.bit_width != BitWidth::Eight {
            return Err(EmbagError::Backend(format!(
                "single-row lookup supports only 8-bit tables, this one is {}-bit; pass offsets for a bag lookup",
                self.bit_width.bits()
            )));
        }
        let table = self.table()?;
        bag::single_lookup_table(&table, indices, pruned_weights, pruning, exec)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        // Format (little-endian):
        // magic: 8 bytes b"QEMBAG01"
        // u32 version
        // u32 bit width (4 or 8)
        // u32 rows, u32 row_width
        // u8  payload[rows * row_width]
        let f = File::open(&path).with_context(|| format!("open table file: {}", path.as_ref().display()))?;
        let mut r = BufReader::new(f);
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic).context("read magic")?;
        if &magic != MAGIC { bail!("bad table magic"); }
        let mut b4 = [0u8; 4];
        r.read_exact(&mut b4).context("read version")?;
        let version = u32::from_le_bytes(b4);
        if version != VERSION { bail!("unsupported table version {}", version); }
        r.read_exact(&mut b4).context("read bit width")?;
        let bit_width = BitWidth::from_bits(u32::from_le_bytes(b4))?;
        r.read_exact(&mut b4).context("read rows")?;
        let rows = u32::from_le_bytes(b4) as usize;
        r.read_exact(&mut b4).context("read row width")?;
        let row_width = u32::from_le_bytes(b4) as usize;
        let len = rows.checked_mul(row_width)
            .with_context(|| format!("table of {} rows of {} bytes is too large", rows, row_width))?;
        // grow with the data actually present, not with the header's claim
        let mut bytes = Vec::new();
        (&mut r).take(len as u64).read_to_end(&mut bytes).with_context(|| format!("read {} rows of {} bytes", rows, row_width))?;
        if bytes.len() != len {
            bail!("truncated table: header declares {} payload bytes, file holds {}", len, bytes.len());
        }
        log::info!("loaded {}-bit table: {} rows, row width {}", bit_width.bits(), rows, row_width);
        Ok(Self::new(bytes, rows, row_width, bit_width)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let f = File::create(&path).with_context(|| format!("create table file: {}", path.as_ref().display()))?;
        let mut w = BufWriter::new(f);
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.bit_width.bits().to_le_bytes())?;
        w.write_all(&(self.rows as u32).to_le_bytes())?;
        w.write_all(&(self.row_width as u32).to_le_bytes())?;
        w.write_all(&self.bytes)?;
        w.flush().context("flush table file")?;
        Ok(())
    }
}
