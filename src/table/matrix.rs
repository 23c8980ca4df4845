use crate::error::{EmbagError, Result};
use std::borrow::Cow;

/// Borrowed 2-D byte storage: `rows` rows of `cols` bytes, `row_stride` bytes apart.
#[derive(Debug, Clone, Copy)]
pub struct ByteMatrix<'a> {
    data: &'a [u8],
    rows: usize,
    cols: usize,
    row_stride: usize,
}

impl<'a> ByteMatrix<'a> {
    /// Row-major view over `data` with the given shape. The shape must be 2-D.
    pub fn from_shape(data: &'a [u8], shape: &[usize]) -> Result<Self> {
        if shape.len() != 2 {
            return Err(EmbagError::Shape(format!("table must be 2-dimensional, got shape {:?}", shape)));
        }
        Self::strided(data, shape[0], shape[1], shape[1])
    }

    /// View whose rows start `row_stride` bytes apart; only the first `cols` bytes of each are used.
    pub fn strided(data: &'a [u8], rows: usize, cols: usize, row_stride: usize) -> Result<Self> {
        if row_stride < cols {
            return Err(EmbagError::Shape(format!("row stride {} is smaller than row width {}", row_stride, cols)));
        }
        let needed = if rows == 0 { 0 } else { (rows - 1) * row_stride + cols };
        if data.len() < needed {
            return Err(EmbagError::Shape(format!(
                "table buffer holds {} bytes, {} rows of width {} (stride {}) need {}",
                data.len(), rows, cols, row_stride, needed
            )));
        }
        Ok(Self { data, rows, cols, row_stride })
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn cols(&self) -> usize { self.cols }
    pub fn row_stride(&self) -> usize { self.row_stride }

    pub fn is_contiguous(&self) -> bool { self.row_stride == self.cols || self.rows <= 1 }

    #[inline]
    pub fn row(&self, r: usize) -> &'a [u8] {
        let start = r * self.row_stride;
        &self.data[start..start + self.cols]
    }

    /// Row-major bytes with stride exactly `cols`. Borrows when already contiguous, copies otherwise.
    pub fn to_contiguous(&self) -> Cow<'a, [u8]> {
        let len = self.rows * self.cols;
        if self.is_contiguous() {
            return Cow::Borrowed(&self.data[..len]);
        }
        log::debug!("copying strided table ({} rows, width {}, stride {})", self.rows, self.cols, self.row_stride);
        let mut out = Vec::with_capacity(len);
        for r in 0..self.rows { out.extend_from_slice(self.row(r)); }
        Cow::Owned(out)
    }
}
