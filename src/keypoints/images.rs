//! Image references used to resolve image-relative coordinates.
//!
//! The conversion engine never looks at pixel data. All it needs from an
//! image is its height and width, and whether the caller passed one image or a
//! batch of them.

use ndarray::{ArrayBase, Data, Dimension};
use serde::Serialize;

use crate::error::PanpointError;

/// Height and width of a single image, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ImageSize {
    pub height: usize,
    pub width: usize,
}

impl ImageSize {
    /// Creates a size from `height` and `width`, in that order, matching the
    /// `[height, width, channels]` image layout.
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

impl std::str::FromStr for ImageSize {
    type Err = PanpointError;

    /// Parses `HEIGHTxWIDTH`, e.g. `500x1000`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            PanpointError::InvalidArgument(format!(
                "image size '{}' must look like HEIGHTxWIDTH (e.g. 480x640)",
                s
            ))
        };
        let (height, width) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let height = height.trim().parse().map_err(|_| invalid())?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(height, width))
    }
}

/// The images that keypoints are positioned on.
#[derive(Clone, Debug, PartialEq)]
pub enum Images {
    /// The full shape of an image tensor, e.g. `[height, width, channels]` or
    /// `[batch, height, width, channels]`. Any rank can be represented so the
    /// engine can report unsupported ones.
    Shape(Vec<usize>),
    /// One unbatched image (rank 3).
    Single(ImageSize),
    /// A batch of images whose sizes may differ (rank 4). A batch holding a
    /// single size applies that size to every keypoint batch entry.
    Batch(Vec<ImageSize>),
}

impl Images {
    /// Describes an image tensor by its shape.
    pub fn from_shape(shape: &[usize]) -> Self {
        Self::Shape(shape.to_vec())
    }

    /// Describes an `ndarray` image tensor by its shape.
    pub fn from_array<S, D>(images: &ArrayBase<S, D>) -> Self
    where
        S: Data,
        D: Dimension,
    {
        Self::Shape(images.shape().to_vec())
    }

    /// The rank the image tensor has (or would have, for size-only variants).
    pub fn rank(&self) -> usize {
        match self {
            Images::Shape(shape) => shape.len(),
            Images::Single(_) => 3,
            Images::Batch(_) => 4,
        }
    }

    /// Returns true if these images form a batch.
    pub fn is_batched(&self) -> bool {
        self.rank() == 4
    }

    /// Number of per-image sizes supplied, when it limits the keypoint batch.
    ///
    /// Dense shapes and single-size batches broadcast, so they return `None`.
    pub(crate) fn distinct_sizes(&self) -> Option<usize> {
        match self {
            Images::Batch(sizes) if sizes.len() != 1 => Some(sizes.len()),
            _ => None,
        }
    }

    /// Size of the image that keypoints at batch position `index` refer to.
    ///
    /// Unbatched images ignore `index`.
    pub fn size_for(&self, index: usize) -> Result<ImageSize, PanpointError> {
        match self {
            Images::Shape(shape) => {
                let rank = shape.len();
                if rank < 3 {
                    return Err(PanpointError::Shape(format!(
                        "Expected images rank to be 3 or 4, got len(images.shape)={}.",
                        rank
                    )));
                }
                Ok(ImageSize::new(shape[rank - 3], shape[rank - 2]))
            }
            Images::Single(size) => Ok(*size),
            Images::Batch(sizes) if sizes.len() == 1 => Ok(sizes[0]),
            Images::Batch(sizes) => {
                sizes
                    .get(index)
                    .copied()
                    .ok_or(PanpointError::ImageCountMismatch {
                        index,
                        available: sizes.len(),
                    })
            }
        }
    }
}
