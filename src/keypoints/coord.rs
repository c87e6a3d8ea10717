//! Typed keypoint positions using PhantomData for compile-time safety.
//!
//! A keypoint's (x, y) pair is meaningless without knowing which coordinate
//! space it lives in. The zero-sized markers below tag a [`Coord`] with its
//! space so absolute and image-relative positions cannot be mixed by accident.

use std::marker::PhantomData;

use super::images::ImageSize;

/// Marker type for absolute pixel coordinates (the canonical `xy` space).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for image-relative coordinates.
///
/// A relative x of `1.0` lies on the right edge of the image and a relative
/// y of `1.0` on the bottom edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relative {}

/// A 2D keypoint position with a type-level marker for the coordinate space.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Reads the (x, y) pair from the first two channels of a keypoint row.
    #[inline]
    pub fn from_pair(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    /// Returns the raw (x, y) pair, dropping the space marker.
    #[inline]
    pub fn to_pair(self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Coord<Pixel> {
    /// Expresses this position as a fraction of the image's width and height.
    #[inline]
    pub fn to_relative(self, image: ImageSize) -> Coord<Relative> {
        Coord::new(self.x / image.width as f64, self.y / image.height as f64)
    }
}

impl Coord<Relative> {
    /// Scales this position back to absolute pixels for the given image.
    #[inline]
    pub fn to_pixel(self, image: ImageSize) -> Coord<Pixel> {
        Coord::new(self.x * image.width as f64, self.y * image.height as f64)
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
