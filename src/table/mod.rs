pub mod codec;
pub mod loader;
pub mod matrix;

use crate::error::{EmbagError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub use loader::PackedEmbedding;
pub use matrix::ByteMatrix;

/// Storage width of one quantized element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
    /// One byte per element, f32 scale and bias.
    Eight,
    /// Two elements per byte, f16 scale and bias.
    Four,
}

impl BitWidth {
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(BitWidth::Eight),
            4 => Ok(BitWidth::Four),
            other => Err(EmbagError::Backend(format!("unsupported bit width {}, expected 4 or 8", other))),
        }
    }

    pub fn bits(self) -> u32 {
        match self { BitWidth::Eight => 8, BitWidth::Four => 4 }
    }

    /// Bytes of trailing (scale, bias) per row.
    pub fn overhead_bytes(self) -> usize {
        match self { BitWidth::Eight => 8, BitWidth::Four => 4 }
    }

    pub fn elems_per_byte(self) -> usize {
        match self { BitWidth::Eight => 1, BitWidth::Four => 2 }
    }

    /// Element count `D` for a packed row of `row_width` bytes, or None when the row cannot hold the overhead.
    pub fn dim_for_row_width(self, row_width: usize) -> Option<usize> {
        row_width.checked_sub(self.overhead_bytes()).map(|p| p * self.elems_per_byte())
    }

    /// Packed row width for `dim` elements. `dim` must be a multiple of `elems_per_byte`.
    pub fn row_width_for_dim(self, dim: usize) -> usize {
        dim / self.elems_per_byte() + self.overhead_bytes()
    }
}

/// Contiguous packed rows with a fixed stride equal to the row width.
#[derive(Debug, Clone)]
pub struct RowStore<'a> {
    bytes: Cow<'a, [u8]>,
    rows: usize,
    row_width: usize,
    dim: usize,
}

impl<'a> RowStore<'a> {
    #[inline]
    fn row(&self, r: usize) -> &[u8] {
        &self.bytes[r * self.row_width..(r + 1) * self.row_width]
    }
}

/// A quantized table tagged with its storage width. All element access goes through [`codec`].
#[derive(Debug, Clone)]
pub enum PackedTable<'a> {
    Byte(RowStore<'a>),
    Nibble(RowStore<'a>),
}

impl<'a> PackedTable<'a> {
    /// Interprets `matrix` as packed rows of `bit_width`, copying it first if its rows are not contiguous.
    pub fn new(matrix: &ByteMatrix<'a>, bit_width: BitWidth) -> Result<Self> {
        let row_width = matrix.cols();
        let dim = bit_width.dim_for_row_width(row_width).ok_or_else(|| {
            EmbagError::Shape(format!(
                "row width {} is smaller than the {}-byte scale/bias overhead of a {}-bit table",
                row_width, bit_width.overhead_bytes(), bit_width.bits()
            ))
        })?;
        debug_assert!(dim % bit_width.elems_per_byte() == 0);
        let store = RowStore { bytes: matrix.to_contiguous(), rows: matrix.rows(), row_width, dim };
        Ok(match bit_width {
            BitWidth::Eight => PackedTable::Byte(store),
            BitWidth::Four => PackedTable::Nibble(store),
        })
    }

    #[inline]
    fn store(&self) -> &RowStore<'a> {
        match self { PackedTable::Byte(s) | PackedTable::Nibble(s) => s }
    }

    pub fn bit_width(&self) -> BitWidth {
        match self { PackedTable::Byte(_) => BitWidth::Eight, PackedTable::Nibble(_) => BitWidth::Four }
    }

    pub fn rows(&self) -> usize { self.store().rows }
    pub fn row_width(&self) -> usize { self.store().row_width }
    pub fn dim(&self) -> usize { self.store().dim }

    fn check_row(&self, row: i64) -> Result<usize> {
        if row < 0 || row as u64 >= self.rows() as u64 {
            return Err(EmbagError::Domain(format!("row id {} outside table of {} rows", row, self.rows())));
        }
        Ok(row as usize)
    }

    /// Full packed bytes of `row`, payload followed by scale and bias.
    pub fn packed_row(&self, row: i64) -> Result<&[u8]> {
        let r = self.check_row(row)?;
        Ok(self.store().row(r))
    }

    pub fn scale_bias(&self, row: i64) -> Result<(f32, f32)> {
        Ok(codec::scale_bias(self.bit_width(), self.packed_row(row)?))
    }

    pub fn quant(&self, row: i64, col: usize) -> Result<u8> {
        self.check_col(col)?;
        Ok(codec::quant(self.bit_width(), self.packed_row(row)?, col))
    }

    /// Dequantized element `(row, col)`.
    pub fn decode(&self, row: i64, col: usize) -> Result<f32> {
        self.check_col(col)?;
        Ok(codec::decode(self.bit_width(), self.packed_row(row)?, col))
    }

    pub fn decode_row(&self, row: i64) -> Result<Vec<f32>> {
        let bw = self.bit_width();
        let packed = self.packed_row(row)?;
        Ok((0..self.dim()).map(|c| codec::decode(bw, packed, c)).collect())
    }

    fn check_col(&self, col: usize) -> Result<()> {
        if col >= self.dim() {
            return Err(EmbagError::Domain(format!("column {} outside row of {} elements", col, self.dim())));
        }
        Ok(())
    }
}
