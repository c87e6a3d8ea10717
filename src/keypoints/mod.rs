//! Keypoint containers.
//!
//! Keypoints are stored with the (x, y) pair in the first two slots of the
//! last axis. Any further slots are metadata (confidence, visibility, class
//! id, ...) that conversions carry through untouched.
//!
//! Two container kinds exist, and the kind is an explicit tag rather than
//! something guessed from the rank:
//!
//! - [`Keypoints::Dense`]: an `ndarray` array of shape `[num_keypoints, C]`
//!   (unbatched), `[batch, num_keypoints, C]`, or `[batch, groups,
//!   num_keypoints, C]`.
//! - [`Keypoints::Ragged`]: a [`RaggedKeypoints`] batch whose per-image or
//!   per-group keypoint counts vary.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use panpoint::keypoints::Keypoints;
//!
//! let keypoints = Keypoints::from(array![[10.0, 20.0, 0.9], [110.0, 120.0, 0.4]]);
//! assert_eq!(keypoints.rank(), 2);
//! assert_eq!(keypoints.metadata_width(), 1);
//! assert!(!keypoints.is_batched());
//! ```

mod coord;
mod images;
pub mod io_json;
mod ragged;

use ndarray::{Array, ArrayD, Axis, Dimension};

pub use coord::{Coord, Pixel, Relative};
pub use images::{ImageSize, Images};
pub use ragged::RaggedKeypoints;

/// Number of leading channels that hold the (x, y) pair.
pub const COORD_CHANNELS: usize = 2;

/// A keypoint collection, dense or ragged.
#[derive(Clone, Debug, PartialEq)]
pub enum Keypoints {
    Dense(ArrayD<f64>),
    Ragged(RaggedKeypoints),
}

impl Keypoints {
    /// Number of axes, counting ragged axes.
    pub fn rank(&self) -> usize {
        match self {
            Keypoints::Dense(array) => array.ndim(),
            Keypoints::Ragged(ragged) => ragged.rank(),
        }
    }

    /// Returns true for rank 3 and above (one entry per image).
    pub fn is_batched(&self) -> bool {
        self.rank() >= 3
    }

    pub fn is_ragged(&self) -> bool {
        matches!(self, Keypoints::Ragged(_))
    }

    /// Size of the last axis: x, y, and any metadata.
    pub fn channels(&self) -> usize {
        match self {
            Keypoints::Dense(array) => array.shape().last().copied().unwrap_or(0),
            Keypoints::Ragged(ragged) => ragged.channels(),
        }
    }

    /// Number of trailing metadata channels after the (x, y) pair.
    pub fn metadata_width(&self) -> usize {
        self.channels().saturating_sub(COORD_CHANNELS)
    }

    /// Number of images in the batch, or `None` when unbatched.
    pub fn batch_len(&self) -> Option<usize> {
        if !self.is_batched() {
            return None;
        }
        match self {
            Keypoints::Dense(array) => Some(array.shape()[0]),
            Keypoints::Ragged(ragged) => Some(ragged.batch_len()),
        }
    }

    /// Total number of keypoints across all images and groups.
    pub fn num_keypoints(&self) -> usize {
        match self {
            Keypoints::Dense(array) => match self.channels() {
                0 => 0,
                channels => array.len() / channels,
            },
            Keypoints::Ragged(ragged) => ragged.num_rows(),
        }
    }

    /// Shape with `None` marking ragged axes.
    pub fn shape(&self) -> Vec<Option<usize>> {
        match self {
            Keypoints::Dense(array) => array.shape().iter().copied().map(Some).collect(),
            Keypoints::Ragged(ragged) => ragged.shape(),
        }
    }

    /// Iterates over every keypoint row (all channels), in storage order.
    pub fn rows(&self) -> Box<dyn Iterator<Item = Vec<f64>> + '_> {
        match self {
            Keypoints::Dense(array) if array.ndim() > 0 => {
                let last = Axis(array.ndim() - 1);
                Box::new(array.lanes(last).into_iter().map(|lane| lane.to_vec()))
            }
            Keypoints::Dense(_) => Box::new(std::iter::empty()),
            Keypoints::Ragged(ragged) => {
                Box::new((0..ragged.num_rows()).map(move |i| ragged.row(i).to_vec()))
            }
        }
    }

    pub fn as_dense(&self) -> Option<&ArrayD<f64>> {
        match self {
            Keypoints::Dense(array) => Some(array),
            Keypoints::Ragged(_) => None,
        }
    }

    pub fn as_ragged(&self) -> Option<&RaggedKeypoints> {
        match self {
            Keypoints::Dense(_) => None,
            Keypoints::Ragged(ragged) => Some(ragged),
        }
    }
}

impl<D: Dimension> From<Array<f64, D>> for Keypoints {
    fn from(array: Array<f64, D>) -> Self {
        Keypoints::Dense(array.into_dyn())
    }
}

impl From<RaggedKeypoints> for Keypoints {
    fn from(ragged: RaggedKeypoints) -> Self {
        Keypoints::Ragged(ragged)
    }
}

/// Formats a shape the way ragged tensors print, e.g. `[2, None, 3]`.
pub fn format_shape(shape: &[Option<usize>]) -> String {
    let dims: Vec<String> = shape
        .iter()
        .map(|dim| match dim {
            Some(n) => n.to_string(),
            None => "None".to_string(),
        })
        .collect();
    format!("[{}]", dims.join(", "))
}
