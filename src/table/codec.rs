//! Row codec: reads the trailing (scale, bias) pair and the quantized payload of one packed row.
//!
//! 8-bit rows are `D` bytes followed by two little-endian f32 values.
//! 4-bit rows pack two elements per byte (low nibble first) followed by two little-endian f16 values.

use half::f16;

use super::BitWidth;

#[inline]
fn f32_at(b: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[inline]
fn f16_at(b: &[u8], at: usize) -> f32 {
    f16::from_le_bytes([b[at], b[at + 1]]).to_f32()
}

/// Trailing (scale, bias) of a full row, widened to f32.
#[inline]
pub fn scale_bias(bw: BitWidth, row: &[u8]) -> (f32, f32) {
    let w = row.len();
    match bw {
        BitWidth::Eight => (f32_at(row, w - 8), f32_at(row, w - 4)),
        BitWidth::Four => (f16_at(row, w - 4), f16_at(row, w - 2)),
    }
}

/// Quantized value of element `col`.
#[inline]
pub fn quant(bw: BitWidth, row: &[u8], col: usize) -> u8 {
    match bw {
        BitWidth::Eight => row[col],
        BitWidth::Four => (row[col / 2] >> ((col % 2) * 4)) & 0x0F,
    }
}

/// `q * scale + bias` for one element.
#[inline]
pub fn decode(bw: BitWidth, row: &[u8], col: usize) -> f32 {
    let (scale, bias) = scale_bias(bw, row);
    quant(bw, row, col) as f32 * scale + bias
}

/// Adds `weight * decode(row)` into `out`, one element per column.
///
/// Scale and bias are folded with the weight first and each column is updated as
/// `fma(w*scale, q, out + w*bias)`.
#[inline]
pub fn accumulate(bw: BitWidth, row: &[u8], weight: f32, out: &mut [f32]) {
    let (scale, bias) = scale_bias(bw, row);
    let scale = weight * scale;
    let bias = weight * bias;
    match bw {
        BitWidth::Eight => {
            for (o, &q) in out.iter_mut().zip(row.iter()) {
                *o = scale.mul_add(q as f32, *o + bias);
            }
        }
        BitWidth::Four => {
            for (j, o) in out.iter_mut().enumerate() {
                let q = (row[j / 2] >> ((j % 2) * 4)) & 0x0F;
                *o = scale.mul_add(q as f32, *o + bias);
            }
        }
    }
}
