// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Integral (summed-area) histograms.
//!
//! Cell `(y, x)` of an [IntegralHistogram] holds, for every channel and
//! bin, the number of samples in the rectangle `[0, y] x [0, x]` that fall
//! in that bin. Any axis-aligned rectangle's histogram can then be
//! recovered with four lookups, independent of the rectangle's size.

use std::time::Instant;

use log::debug;

use crate::algorithm::FeatureArray;
use crate::error::{invalid, Error, Result};
use crate::histogram_funcs::BinParams;
use crate::image_funcs::SampleArray;
use crate::kernel::kernel;

/// Rectangle `[upper_left, lower_right)` in (row, column) order. The lower
/// right corner is exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub upper_left: (usize, usize),
    pub lower_right: (usize, usize),
}

impl Region {
    pub fn new(upper_left: (usize, usize), lower_right: (usize, usize))
               -> Result<Self> {
        if lower_right.0 <= upper_left.0 || lower_right.1 <= upper_left.1 {
            return Err(invalid(format!(
                "region lower right {:?} must exceed upper left {:?}",
                lower_right, upper_left)));
        }
        Ok(Region{upper_left, lower_right})
    }

    /// The square of half-width `radius` around (y, x), clipped to a
    /// `height` x `width` image. None if nothing of it lies in the image.
    pub fn clipped_square(center: (usize, usize), radius: u32,
                          height: usize, width: usize) -> Option<Region> {
        let (y, x) = center;
        if y >= height || x >= width {
            return None;
        }
        let r = radius as usize;
        Some(Region{upper_left: (y.saturating_sub(r), x.saturating_sub(r)),
                    lower_right: (y.saturating_add(r).saturating_add(1).min(height),
                                  x.saturating_add(r).saturating_add(1).min(width))})
    }

    pub fn height(&self) -> usize {
        self.lower_right.0 - self.upper_left.0
    }

    pub fn width(&self) -> usize {
        self.lower_right.1 - self.upper_left.1
    }

    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    pub fn contains(&self, other: &Region) -> bool {
        self.upper_left.0 <= other.upper_left.0 &&
            self.upper_left.1 <= other.upper_left.1 &&
            self.lower_right.0 >= other.lower_right.0 &&
            self.lower_right.1 >= other.lower_right.1
    }

    pub fn check_within(&self, height: usize, width: usize) -> Result<()> {
        if self.lower_right.0 > height || self.lower_right.1 > width {
            return Err(Error::OutOfRange{what: "region lower right",
                                         index: self.lower_right,
                                         limit: (height, width)});
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntegralHistogram {
    height: usize,
    width: usize,
    channels: usize,
    params: BinParams,
    // (H, W, channels * nbins), row major.
    counts: Vec<u32>,
}

impl IntegralHistogram {
    pub(crate) fn zeroed(height: usize, width: usize, channels: usize,
                         params: BinParams) -> Self {
        IntegralHistogram{height, width, channels, params,
                          counts: vec![0; height * width * channels * params.nbins()]}
    }

    pub(crate) fn counts_mut(&mut self) -> &mut [u32] {
        &mut self.counts
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn nbins(&self) -> usize {
        self.params.nbins()
    }

    pub fn params(&self) -> &BinParams {
        &self.params
    }

    /// Entries per cell: channels * nbins.
    pub fn depth(&self) -> usize {
        self.channels * self.params.nbins()
    }

    /// (H, W, C * nbins).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.depth())
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    #[inline]
    pub fn cell(&self, y: usize, x: usize) -> &[u32] {
        let depth = self.depth();
        let start = (y * self.width + x) * depth;
        &self.counts[start..start + depth]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }

    /// Histogram of `region`, channel-major (channel 0's bins first).
    pub fn query(&self, region: &Region) -> Result<Vec<u32>> {
        let mut histogram = vec![0; self.depth()];
        self.query_into(region, &mut histogram)?;
        Ok(histogram)
    }

    /// Like [IntegralHistogram::query()] but writes into `out`, which must
    /// hold `depth()` entries.
    pub fn query_into(&self, region: &Region, out: &mut [u32]) -> Result<()> {
        region.check_within(self.height, self.width)?;
        if out.len() != self.depth() {
            return Err(invalid(format!("output holds {} entries, need {}",
                                       out.len(), self.depth())));
        }
        let (y0, x0) = region.upper_left;
        let (y1, x1) = (region.lower_right.0 - 1, region.lower_right.1 - 1);
        out.copy_from_slice(self.cell(y1, x1));
        // Intermediate sums may wrap; the final counts are exact.
        if y0 > 0 {
            for (o, &above) in out.iter_mut().zip(self.cell(y0 - 1, x1)) {
                *o = o.wrapping_sub(above);
            }
        }
        if x0 > 0 {
            for (o, &left) in out.iter_mut().zip(self.cell(y1, x0 - 1)) {
                *o = o.wrapping_sub(left);
            }
        }
        if y0 > 0 && x0 > 0 {
            for (o, &diag) in out.iter_mut().zip(self.cell(y0 - 1, x0 - 1)) {
                *o = o.wrapping_add(diag);
            }
        }
        Ok(())
    }

    /// Histogram of the whole image. All zeros for an empty image.
    pub fn total(&self) -> Vec<u32> {
        if self.is_empty() {
            return vec![0; self.depth()];
        }
        self.cell(self.height - 1, self.width - 1).to_vec()
    }
}

/// Builds the integral histogram with the literal summed-area recurrence
/// `acc[y,x] = cell[y,x] + acc[y-1,x] + acc[y,x-1] - acc[y-1,x-1]`.
pub fn build_by_recurrence(samples: &SampleArray, params: &BinParams)
                           -> IntegralHistogram {
    let build_start = Instant::now();
    let (height, width, channels) = samples.shape();
    let nbins = params.nbins();
    let mut integral = IntegralHistogram::zeroed(height, width, channels, *params);
    let depth = integral.depth();
    let counts = integral.counts_mut();
    for y in 0..height {
        for x in 0..width {
            let base = (y * width + x) * depth;
            for (c, &value) in samples.pixel(y, x).iter().enumerate() {
                counts[base + c * nbins + params.bin(value)] += 1;
            }
            for k in 0..depth {
                let mut v = counts[base + k];
                if y > 0 {
                    v += counts[base - width * depth + k];
                }
                if x > 0 {
                    v += counts[base - depth + k];
                }
                if y > 0 && x > 0 {
                    v -= counts[base - (width + 1) * depth + k];
                }
                counts[base + k] = v;
            }
        }
    }
    debug!("Recurrence build {}x{}x{} in {:?}",
           height, width, depth, build_start.elapsed());
    integral
}

/// Builds the integral histogram one row at a time: a running sum along
/// the row is added to the already finished row above.
pub fn build_by_row_sums(samples: &SampleArray, params: &BinParams)
                         -> IntegralHistogram {
    let build_start = Instant::now();
    let (height, width, channels) = samples.shape();
    let nbins = params.nbins();
    let mut integral = IntegralHistogram::zeroed(height, width, channels, *params);
    let depth = integral.depth();
    let row_len = width * depth;
    let counts = integral.counts_mut();
    let mut row_sum = vec![0_u32; depth];
    for y in 0..height {
        row_sum.fill(0);
        let (done, rest) = counts.split_at_mut(y * row_len);
        let above = if y > 0 { Some(&done[(y - 1) * row_len..]) } else { None };
        let row = &mut rest[..row_len];
        for x in 0..width {
            for (c, &value) in samples.pixel(y, x).iter().enumerate() {
                row_sum[c * nbins + params.bin(value)] += 1;
            }
            let cell = &mut row[x * depth..(x + 1) * depth];
            match above {
                Some(above) => {
                    let above_cell = &above[x * depth..(x + 1) * depth];
                    for k in 0..depth {
                        cell[k] = above_cell[k] + row_sum[k];
                    }
                },
                None => cell.copy_from_slice(&row_sum),
            }
        }
    }
    debug!("Row sum build {}x{}x{} in {:?}",
           height, width, depth, build_start.elapsed());
    integral
}

/// Non-cumulative per-pixel histogram: cell (y, x) is the one-hot bin
/// vector of that pixel's channels.
pub fn pixel_histogram(samples: &SampleArray, params: &BinParams) -> FeatureArray {
    let (height, width, channels) = samples.shape();
    let nbins = params.nbins();
    let mut features = FeatureArray::zeros(height, width, channels * nbins);
    for y in 0..height {
        for x in 0..width {
            let cell = features.pixel_mut(y, x);
            for (c, &value) in samples.pixel(y, x).iter().enumerate() {
                cell[c * nbins + params.bin(value)] = 1;
            }
        }
    }
    features
}

/// Builds the integral histogram of `samples` with the active kernel.
pub fn integral_histogram(samples: &SampleArray, nbins: usize, range: (f32, f32))
                          -> Result<IntegralHistogram> {
    let params = BinParams::new(nbins, range)?;
    Ok(kernel().build(samples, &params))
}

/// Histogram of `[upper_left, lower_right)` recovered from `integral`.
pub fn region_histogram(upper_left: (usize, usize), lower_right: (usize, usize),
                        integral: &IntegralHistogram) -> Result<Vec<u32>> {
    let region = Region::new(upper_left, lower_right)?;
    kernel().query(integral, &region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram_funcs::{channel_totals, direct_histogram};
    use image::GrayImage;
    use imageproc::noise::gaussian_noise;

    fn all_ones_5x5() -> (SampleArray, BinParams) {
        (SampleArray::new(5, 5, 1, vec![1.0; 25]).unwrap(),
         BinParams::unit(4).unwrap())
    }

    // 10 rows x 5 columns holding 0/49 .. 49/49, with value(y, x) = 10x + y.
    fn ramp_10x5() -> SampleArray {
        let mut data = Vec::new();
        for y in 0..10 {
            for x in 0..5 {
                data.push((10 * x + y) as f32 / 49.0);
            }
        }
        SampleArray::new(10, 5, 1, data).unwrap()
    }

    fn noise_image(height: u32, width: u32, seed: u64) -> SampleArray {
        let flat = GrayImage::from_pixel(width, height, image::Luma([128]));
        SampleArray::from_gray(&gaussian_noise(&flat, 0.0, 70.0, seed))
    }

    #[test]
    fn test_region_validation() {
        assert!(Region::new((0, 0), (1, 1)).is_ok());
        assert!(matches!(Region::new((2, 0), (2, 3)),
                         Err(Error::InvalidArgument(_))));
        assert!(matches!(Region::new((0, 3), (2, 1)),
                         Err(Error::InvalidArgument(_))));
        let r = Region::new((1, 2), (4, 6)).unwrap();
        assert_eq!((r.height(), r.width(), r.area()), (3, 4, 12));
        assert!(r.check_within(4, 6).is_ok());
        assert!(matches!(r.check_within(3, 6), Err(Error::OutOfRange{..})));
        assert!(matches!(r.check_within(4, 5), Err(Error::OutOfRange{..})));
    }

    #[test]
    fn test_clipped_square() {
        // Interior.
        assert_eq!(Region::clipped_square((5, 5), 2, 20, 20),
                   Some(Region{upper_left: (3, 3), lower_right: (8, 8)}));
        // Clipped at the top left corner.
        assert_eq!(Region::clipped_square((1, 0), 3, 20, 20),
                   Some(Region{upper_left: (0, 0), lower_right: (5, 4)}));
        // Clipped at the bottom right corner.
        assert_eq!(Region::clipped_square((9, 4), 2, 10, 5),
                   Some(Region{upper_left: (7, 2), lower_right: (10, 5)}));
        assert_eq!(Region::clipped_square((0, 0), 1, 0, 0), None);
        assert_eq!(Region::clipped_square((4, 0), 1, 4, 4), None);
        // Radii far beyond the image clip to the whole image.
        let whole = Some(Region{upper_left: (0, 0), lower_right: (4, 6)});
        assert_eq!(Region::clipped_square((2, 3), 1_500_000_000, 4, 6), whole);
        assert_eq!(Region::clipped_square((3, 5), u32::MAX, 4, 6), whole);
    }

    #[test]
    fn test_contains() {
        let outer = Region::new((0, 0), (5, 5)).unwrap();
        let inner = Region::new((1, 1), (3, 4)).unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_simplest_histogram() {
        let (samples, params) = all_ones_5x5();
        let integral = build_by_recurrence(&samples, &params);
        assert_eq!(integral.shape(), (5, 5, 4));
        // First row and column are plain cumulative counts.
        assert_eq!(integral.cell(0, 0), &[0, 0, 0, 1]);
        assert_eq!(integral.cell(0, 4), &[0, 0, 0, 5]);
        assert_eq!(integral.cell(4, 4), &[0, 0, 0, 25]);

        for (ul, lr) in [((0, 0), (2, 2)), ((1, 1), (4, 4)),
                         ((0, 1), (5, 5)), ((1, 1), (5, 5))] {
            let region = Region::new(ul, lr).unwrap();
            let expected = direct_histogram(&samples, &region, &params).unwrap();
            assert_eq!(integral.query(&region).unwrap(), expected,
                       "region {:?}", region);
        }
        let top_left = Region::new((0, 0), (2, 2)).unwrap();
        assert_eq!(integral.query(&top_left).unwrap(), vec![0, 0, 0, 4]);
    }

    #[test]
    fn test_ramp_histogram() {
        let samples = ramp_10x5();
        let params = BinParams::unit(3).unwrap();
        let integral = build_by_row_sums(&samples, &params);
        assert_eq!(integral.shape(), (10, 5, 3));
        assert_eq!(integral.total(), vec![17, 16, 17]);
        let whole = Region::new((0, 0), (10, 5)).unwrap();
        assert_eq!(integral.query(&whole).unwrap(), vec![17, 16, 17]);

        for (ul, lr) in [((0, 0), (7, 3)), ((1, 2), (7, 3)), ((3, 1), (10, 5))] {
            let region = Region::new(ul, lr).unwrap();
            assert_eq!(integral.query(&region).unwrap(),
                       direct_histogram(&samples, &region, &params).unwrap());
        }
    }

    #[test]
    fn test_monotone_accumulator() {
        let samples = noise_image(12, 9, 3);
        let integral = build_by_row_sums(&samples, &BinParams::unit(5).unwrap());
        for y in 0..12 {
            for x in 0..9 {
                let here = integral.cell(y, x);
                if y > 0 {
                    assert!(integral.cell(y - 1, x).iter().zip(here).all(|(a, b)| a <= b));
                }
                if x > 0 {
                    assert!(integral.cell(y, x - 1).iter().zip(here).all(|(a, b)| a <= b));
                }
            }
        }
    }

    #[test]
    fn test_builders_agree() {
        let a = noise_image(17, 23, 11);
        let b = noise_image(17, 23, 12);
        let samples = crate::image_funcs::stack_channels(&[a, b]).unwrap();
        let params = BinParams::unit(6).unwrap();
        assert_eq!(build_by_recurrence(&samples, &params),
                   build_by_row_sums(&samples, &params));
    }

    #[test]
    fn test_query_matches_direct_histogram() {
        let samples = noise_image(30, 40, 7);
        let params = BinParams::unit(8).unwrap();
        let integral = build_by_row_sums(&samples, &params);
        for (ul, lr) in [((0, 0), (1, 1)), ((0, 0), (30, 40)), ((5, 0), (6, 40)),
                         ((0, 7), (30, 8)), ((12, 13), (25, 31)), ((29, 39), (30, 40))] {
            let region = Region::new(ul, lr).unwrap();
            let histogram = integral.query(&region).unwrap();
            assert_eq!(histogram, direct_histogram(&samples, &region, &params).unwrap());
            assert_eq!(channel_totals(&histogram, 8), vec![region.area() as u32]);
        }
    }

    #[test]
    fn test_ring_is_outer_minus_inner() {
        let samples = noise_image(20, 20, 5);
        let params = BinParams::unit(4).unwrap();
        let integral = build_by_recurrence(&samples, &params);
        let outer = Region::new((4, 4), (15, 15)).unwrap();
        let inner = Region::new((7, 7), (12, 12)).unwrap();
        let ring: Vec<u32> = integral.query(&outer).unwrap().iter()
            .zip(integral.query(&inner).unwrap())
            .map(|(o, i)| o - i)
            .collect();
        let mut expected = vec![0_u32; 4];
        for y in 4..15 {
            for x in 4..15 {
                if !(7..12).contains(&y) || !(7..12).contains(&x) {
                    expected[params.bin(samples.get(y, x, 0))] += 1;
                }
            }
        }
        assert_eq!(ring, expected);
    }

    #[test]
    fn test_quadrants_add_up() {
        let samples = noise_image(16, 10, 9);
        let params = BinParams::unit(5).unwrap();
        let integral = build_by_row_sums(&samples, &params);
        let mut sum = vec![0_u32; 5];
        for (ul, lr) in [((0, 0), (7, 4)), ((0, 4), (7, 10)),
                         ((7, 0), (16, 4)), ((7, 4), (16, 10))] {
            let quadrant = integral.query(&Region::new(ul, lr).unwrap()).unwrap();
            for (s, q) in sum.iter_mut().zip(quadrant) {
                *s += q;
            }
        }
        assert_eq!(sum, integral.total());
    }

    #[test]
    fn test_query_errors() {
        let (samples, params) = all_ones_5x5();
        let integral = build_by_recurrence(&samples, &params);
        let outside = Region::new((3, 3), (6, 5)).unwrap();
        assert!(matches!(integral.query(&outside), Err(Error::OutOfRange{..})));
        let mut short = [0_u32; 3];
        let ok = Region::new((0, 0), (1, 1)).unwrap();
        assert!(matches!(integral.query_into(&ok, &mut short),
                         Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_input() {
        let samples = SampleArray::new(0, 7, 2, vec![]).unwrap();
        let params = BinParams::unit(3).unwrap();
        for integral in [build_by_recurrence(&samples, &params),
                         build_by_row_sums(&samples, &params)] {
            assert_eq!(integral.shape(), (0, 7, 6));
            assert!(integral.is_empty());
            assert!(integral.as_slice().is_empty());
            assert_eq!(integral.total(), vec![0; 6]);
        }
    }

    #[test]
    fn test_contract_wrappers() {
        let samples = SampleArray::new(5, 5, 1, vec![1.0; 25]).unwrap();
        let integral = integral_histogram(&samples, 4, (0.0, 1.0)).unwrap();
        assert_eq!(integral.shape(), (5, 5, 4));
        assert_eq!(region_histogram((1, 1), (4, 4), &integral).unwrap(),
                   vec![0, 0, 0, 9]);
        assert!(matches!(integral_histogram(&samples, 0, (0.0, 1.0)),
                         Err(Error::InvalidArgument(_))));
        assert!(matches!(region_histogram((2, 2), (2, 4), &integral),
                         Err(Error::InvalidArgument(_))));
        assert!(matches!(region_histogram((0, 0), (6, 1), &integral),
                         Err(Error::OutOfRange{..})));
    }

    #[test]
    fn test_pixel_histogram() {
        let samples = SampleArray::new(1, 2, 3, vec![0.0, 0.5, 1.0,
                                                     0.2, 0.9, 0.4]).unwrap();
        let params = BinParams::unit(3).unwrap();
        let features = pixel_histogram(&samples, &params);
        assert_eq!(features.shape(), (1, 2, 9));
        assert_eq!(features.pixel(0, 0), &[1, 0, 0, 0, 1, 0, 0, 0, 1]);
        assert_eq!(features.pixel(0, 1), &[1, 0, 0, 0, 0, 1, 0, 1, 0]);
        // Same as a 1x1 query.
        let integral = build_by_row_sums(&samples, &params);
        let one = Region::new((0, 1), (1, 2)).unwrap();
        assert_eq!(integral.query(&one).unwrap(), features.pixel(0, 1));
    }
}
