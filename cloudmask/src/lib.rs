//! Binary cloud-mask geometry.
//!
//! A [`Mask`] is the ingestion boundary for image-derived data: whatever
//! upstream detector produced the two-level raster, this crate only sees
//! set/unset cells. From a mask it derives a [`GeometrySample`] (boundary
//! pixels, centroid, pixel area) and from that the two orthogonal footprint
//! diameters used by cloud-type classification.

mod diameter;
mod error;
mod mask;

pub use crate::{
    diameter::{resolve_diameters, Diameters},
    error::CloudmaskError,
    mask::{GeometrySample, Mask},
};

/// Base floating point type used for all coordinates and calculations.
///
/// Note: this _could_ be a generic parameter throughout, but only the
/// diameter search benefits from genericity; mask handling stays concrete.
pub type C = f64;

/// A pixel-space location. `x` grows right, `y` grows down, matching the
/// row-major mask layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T = C> {
    pub x: T,
    pub y: T,
}
