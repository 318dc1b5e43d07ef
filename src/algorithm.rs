//! Multi-radius context histograms.
//!
//! For every pixel, a context histogram describes the distribution of
//! values in a set of concentric square neighborhoods. Given radii
//! `r0 < r1 < ...`, the feature vector of pixel (y, x) is the histogram of
//! the `(2*r0+1)` square around it, followed by the histogram of the ring
//! between the `r0` and `r1` squares, then the ring between `r1` and `r2`,
//! and so on. Each segment has `channels * nbins` entries, channel-major.
//!
//! # Algorithm
//!
//! A single [IntegralHistogram] is built over the whole image. Every square
//! is then a four-lookup query against it and every ring is the difference
//! of two nested squares. The cost per pixel is thus proportional to the
//! number of radii and independent of their magnitude; recounting each
//! neighborhood directly would cost O(r^2) per radius.
//!
//! # Image borders
//!
//! Squares that extend past the image are clipped to the image bounds. This
//! is the same as counting zero-padded samples as absent: a pixel near the
//! border sees fewer samples in its outer squares than an interior pixel
//! does. Interior pixels (at least `max(radii)` from every border) are
//! unaffected by clipping.
//!
//! # Output
//!
//! A [FeatureArray] of shape `(H, W, radii.len() * channels * nbins)`,
//! with unsigned counts. Since the squares are nested, ring segments are
//! never negative.

use std::time::Instant;

use log::{debug, info};

use crate::error::{invalid, Result};
use crate::histogram_funcs::BinParams;
use crate::image_funcs::SampleArray;
use crate::integral::{IntegralHistogram, Region};
use crate::kernel::kernel;

/// Strictly increasing, positive square half-widths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RadiusSet {
    radii: Vec<u32>,
}

impl RadiusSet {
    pub fn new(radii: Vec<u32>) -> Result<Self> {
        if radii.is_empty() {
            return Err(invalid("radius set is empty"));
        }
        if radii[0] == 0 {
            return Err(invalid("radii must be positive"));
        }
        if radii.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid(format!("radii {:?} are not strictly increasing",
                                       radii)));
        }
        Ok(RadiusSet{radii})
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.radii
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    pub fn max(&self) -> u32 {
        // Never empty once constructed.
        self.radii.last().copied().unwrap_or(0)
    }
}

/// Row-major (H, W, depth) array of per-pixel counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureArray {
    height: usize,
    width: usize,
    depth: usize,
    data: Vec<u32>,
}

impl FeatureArray {
    pub fn zeros(height: usize, width: usize, depth: usize) -> Self {
        FeatureArray{height, width, depth, data: vec![0; height * width * depth]}
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.depth)
    }

    #[inline]
    pub fn pixel(&self, y: usize, x: usize) -> &[u32] {
        let start = (y * self.width + x) * self.depth;
        &self.data[start..start + self.depth]
    }

    #[inline]
    pub fn pixel_mut(&mut self, y: usize, x: usize) -> &mut [u32] {
        let start = (y * self.width + x) * self.depth;
        &mut self.data[start..start + self.depth]
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize, k: usize) -> u32 {
        self.data[(y * self.width + x) * self.depth + k]
    }

    /// One plane of the feature stack, row major.
    pub fn plane(&self, k: usize) -> Vec<u32> {
        self.data.chunks(self.depth).map(|cell| cell[k]).collect()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }
}

/// Computes context histogram features from an already built integral
/// histogram.
pub fn context_histogram_from_integral(radii: &RadiusSet,
                                       integral: &IntegralHistogram)
                                       -> Result<FeatureArray> {
    let context_start = Instant::now();
    let (height, width, segment_len) = integral.shape();
    let mut features = FeatureArray::zeros(height, width, radii.len() * segment_len);
    let mut outer = vec![0_u32; segment_len];
    let mut inner = vec![0_u32; segment_len];
    for y in 0..height {
        for x in 0..width {
            let cell = features.pixel_mut(y, x);
            let mut previous: Option<Region> = None;
            for (i, &radius) in radii.as_slice().iter().enumerate() {
                // Never None: the center pixel is inside the image.
                let Some(region) = Region::clipped_square((y, x), radius, height, width)
                else {
                    continue;
                };
                integral.query_into(&region, &mut outer)?;
                let segment = &mut cell[i * segment_len..(i + 1) * segment_len];
                if let Some(prev) = previous {
                    debug_assert!(region.contains(&prev));
                    for k in 0..segment_len {
                        segment[k] = outer[k] - inner[k];
                    }
                } else {
                    segment.copy_from_slice(&outer);
                }
                std::mem::swap(&mut outer, &mut inner);
                previous = Some(region);
            }
        }
    }
    debug!("Context histogram with radii {:?} on {}x{} in {:?}",
           radii.as_slice(), height, width, context_start.elapsed());
    Ok(features)
}

/// Builds an integral histogram of `samples` with the active kernel and
/// derives the context histogram features from it.
pub fn context_histogram(radii: &RadiusSet, samples: &SampleArray,
                         params: &BinParams) -> Result<FeatureArray> {
    let start = Instant::now();
    let features = kernel().context_histogram(radii, samples, params)?;
    let (height, width, depth) = features.shape();
    info!("Context histogram {}x{}x{} ({} kernel) computed in {:?}",
          height, width, depth, kernel().name(), start.elapsed());
    Ok(features)
}

/// Context histogram over the normalized (0, 1) value range.
pub fn context_histogram_unit(radii: &[u32], nbins: usize, samples: &SampleArray)
                              -> Result<FeatureArray> {
    let radii = RadiusSet::new(radii.to_vec())?;
    let params = BinParams::unit(nbins)?;
    context_histogram(&radii, samples, &params)
}
