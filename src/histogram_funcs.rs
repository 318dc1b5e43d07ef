// Copyright (c) 2024 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::cmp::min;

use crate::error::{invalid, Result};
use crate::image_funcs::SampleArray;
use crate::integral::Region;

/// Fixed-range uniform binning: `nbins` equal-width bins spanning
/// `[lo, hi]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BinParams {
    nbins: usize,
    lo: f32,
    hi: f32,
}

impl BinParams {
    pub fn new(nbins: usize, range: (f32, f32)) -> Result<Self> {
        let (lo, hi) = range;
        if nbins < 1 {
            return Err(invalid(format!("nbins must be >= 1, got {}", nbins)));
        }
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(invalid(format!("bad histogram range ({}, {})", lo, hi)));
        }
        Ok(BinParams{nbins, lo, hi})
    }

    /// Bins over the normalized range (0, 1).
    pub fn unit(nbins: usize) -> Result<Self> {
        Self::new(nbins, (0.0, 1.0))
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    pub fn range(&self) -> (f32, f32) {
        (self.lo, self.hi)
    }

    /// Maps `value` to its bin. `hi` itself lands in the last bin; values
    /// outside the range are clipped to the edge bins and NaN goes to bin 0.
    #[inline]
    pub fn bin(&self, value: f32) -> usize {
        let scaled = (value as f64 - self.lo as f64) /
            (self.hi as f64 - self.lo as f64) * self.nbins as f64;
        if !(scaled > 0.0) {
            return 0;
        }
        min(scaled as usize, self.nbins - 1)
    }
}

pub fn bin_index(value: f32, nbins: usize, range: (f32, f32)) -> Result<usize> {
    Ok(BinParams::new(nbins, range)?.bin(value))
}

/// Counts the samples of `region` directly, without an integral histogram.
/// The result has `channels * nbins` entries, channel-major. This is the
/// O(area) reference that the integral queries must agree with.
pub fn direct_histogram(samples: &SampleArray, region: &Region, params: &BinParams)
                        -> Result<Vec<u32>> {
    let (height, width, channels) = samples.shape();
    region.check_within(height, width)?;
    let nbins = params.nbins();
    let mut histogram = vec![0_u32; channels * nbins];
    let (y0, x0) = region.upper_left;
    let (y1, x1) = region.lower_right;
    for y in y0..y1 {
        for x in x0..x1 {
            for (c, &value) in samples.pixel(y, x).iter().enumerate() {
                histogram[c * nbins + params.bin(value)] += 1;
            }
        }
    }
    Ok(histogram)
}

/// Total count per channel of a channel-major histogram.
pub fn channel_totals(histogram: &[u32], nbins: usize) -> Vec<u32> {
    histogram.chunks(nbins).map(|bins| bins.iter().sum()).collect()
}

// mod tests.
