use std::path::PathBuf;
use thiserror::Error;

/// The main error type for panpoint operations.
#[derive(Debug, Error)]
pub enum PanpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Keypoints or images have an unsupported rank.
    #[error("{0}")]
    Shape(String),

    /// Keypoints and images disagree on whether they are batched.
    #[error(
        "convert_format() expects both `keypoints` and `images` to be batched or both \
         unbatched. Received len(keypoints.shape)={keypoints_rank}, \
         len(images.shape)={images_rank}. Expected either len(keypoints.shape)=2 and \
         len(images.shape)=3, or len(keypoints.shape)>=3 and len(images.shape)=4."
    )]
    BatchMismatch {
        keypoints_rank: usize,
        images_rank: usize,
    },

    /// A relative format was requested but no images were supplied.
    #[error(
        "convert_format() must receive `images` when transforming between relative and \
         absolute formats. convert_format() received source=`{source_format}`, target=`{target_format}`, \
         but images=None"
    )]
    MissingImages {
        source_format: String,
        target_format: String,
    },

    #[error(
        "convert_format() received an unsupported format for the argument `{argument}`. \
         `{argument}` should be one of {supported}. Got {argument}={name}"
    )]
    UnsupportedFormat {
        argument: &'static str,
        name: String,
        supported: String,
    },

    #[error("Keypoint format '{0}' is already registered")]
    DuplicateFormat(String),

    #[error("No image size for keypoint batch index {index} ({available} image size(s) supplied)")]
    ImageCountMismatch { index: usize, available: usize },

    #[error("Invalid keypoints: {0}")]
    InvalidKeypoints(String),

    #[error("Failed to parse keypoint JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse keypoint JSON from {path}: {source}")]
    KeypointsJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write keypoint JSON to {path}: {source}")]
    KeypointsJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageSize {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
