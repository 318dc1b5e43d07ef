//! Integral histograms and multi-radius context histogram features for 2D
//! multi-channel images.
//!
//! * [integral_histogram()] builds a summed-area table of per-bin counts.
//! * [region_histogram()] recovers the histogram of any rectangle from it
//!   in constant time.
//! * [context_histogram()] computes, for every pixel, histograms of a set
//!   of concentric squares (innermost square, then rings), suitable as
//!   pixel classification features.
//!
//! The computational kernel is pluggable; see [kernel::set_kernel()].
//!
//! The [dataset] and [lanes] modules hold the data-selection side: dataset
//! naming and axis conventions, and a toolkit-independent table model of
//! the loaded lanes.

pub mod algorithm;
pub mod dataset;
pub mod error;
pub mod histogram_funcs;
pub mod image_funcs;
pub mod integral;
pub mod kernel;
pub mod lanes;

pub use algorithm::{context_histogram, context_histogram_from_integral,
                    context_histogram_unit, FeatureArray, RadiusSet};
pub use error::{Error, Result};
pub use histogram_funcs::{bin_index, BinParams};
pub use image_funcs::SampleArray;
pub use integral::{integral_histogram, pixel_histogram, region_histogram,
                   IntegralHistogram, Region};
