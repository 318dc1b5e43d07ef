// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::sync::OnceLock;

use crate::algorithm::{context_histogram_from_integral, FeatureArray, RadiusSet};
use crate::error::Result;
use crate::histogram_funcs::BinParams;
use crate::image_funcs::SampleArray;
use crate::integral::{build_by_recurrence, build_by_row_sums, IntegralHistogram,
                      Region};

/// The computational core behind [crate::integral_histogram()],
/// [crate::region_histogram()] and [crate::context_histogram()]. Swapping
/// implementations does not change results, only how they are computed.
pub trait HistogramKernel: Send + Sync {
    fn name(&self) -> &'static str;

    fn build(&self, samples: &SampleArray, params: &BinParams) -> IntegralHistogram;

    fn query(&self, integral: &IntegralHistogram, region: &Region) -> Result<Vec<u32>> {
        integral.query(region)
    }

    fn context_histogram(&self, radii: &RadiusSet, samples: &SampleArray,
                         params: &BinParams) -> Result<FeatureArray> {
        let integral = self.build(samples, params);
        context_histogram_from_integral(radii, &integral)
    }
}

/// Straightforward per-cell summed-area recurrence.
pub struct ScalarKernel;

impl HistogramKernel for ScalarKernel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn build(&self, samples: &SampleArray, params: &BinParams) -> IntegralHistogram {
        build_by_recurrence(samples, params)
    }
}

/// Row running sums added onto the previous row; fewer memory reads per
/// cell and contiguous inner loops.
pub struct RowSumKernel;

impl HistogramKernel for RowSumKernel {
    fn name(&self) -> &'static str {
        "row-sum"
    }

    fn build(&self, samples: &SampleArray, params: &BinParams) -> IntegralHistogram {
        build_by_row_sums(samples, params)
    }
}

static KERNEL: OnceLock<&'static dyn HistogramKernel> = OnceLock::new();

/// Selects the kernel used by the crate's top level functions. Only the
/// first call has an effect.
pub fn set_kernel(kernel: &'static dyn HistogramKernel) {
    log::info!("Setting histogram kernel '{}'.", kernel.name());
    let _ = KERNEL.set(kernel);  // Ignores error if already set.
}

/// The kernel chosen with [set_kernel()], or [RowSumKernel] if none was.
pub fn kernel() -> &'static dyn HistogramKernel {
    match KERNEL.get() {
        Some(k) => *k,
        None => &RowSumKernel,
    }
}

pub fn kernel_by_name(name: &str) -> Option<&'static dyn HistogramKernel> {
    match name {
        "scalar" => Some(&ScalarKernel),
        "row-sum" => Some(&RowSumKernel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::noise::gaussian_noise;

    #[test]
    fn test_kernel_by_name() {
        assert_eq!(kernel_by_name("scalar").unwrap().name(), "scalar");
        assert_eq!(kernel_by_name("row-sum").unwrap().name(), "row-sum");
        assert!(kernel_by_name("simd").is_none());
    }

    #[test]
    fn test_kernels_agree() {
        let flat = GrayImage::from_pixel(25, 13, Luma([100]));
        let samples = SampleArray::from_gray(&gaussian_noise(&flat, 0.0, 50.0, 4));
        let params = BinParams::unit(7).unwrap();
        let radii = RadiusSet::new(vec![1, 3, 4]).unwrap();
        let scalar: &dyn HistogramKernel = &ScalarKernel;
        let row_sum: &dyn HistogramKernel = &RowSumKernel;
        assert_eq!(scalar.build(&samples, &params), row_sum.build(&samples, &params));
        assert_eq!(scalar.context_histogram(&radii, &samples, &params).unwrap(),
                   row_sum.context_histogram(&radii, &samples, &params).unwrap());
        let integral = scalar.build(&samples, &params);
        let region = Region::new((2, 3), (11, 20)).unwrap();
        assert_eq!(scalar.query(&integral, &region).unwrap(),
                   row_sum.query(&integral, &region).unwrap());
    }

    #[test]
    fn test_set_kernel_first_call_wins() {
        // Both kernels produce identical results, so selecting one here does
        // not disturb other tests sharing the process.
        set_kernel(&ScalarKernel);
        let chosen = kernel().name();
        set_kernel(&RowSumKernel);
        assert_eq!(kernel().name(), chosen);
    }
}
