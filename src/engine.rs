//! The keypoint format conversion engine.
//!
//! [`ConversionEngine::convert_format`] validates the shapes it is given,
//! resolves both format names through its [`FormatRegistry`], and rewrites
//! the (x, y) pair of every keypoint via the canonical format. Metadata
//! channels, ragged structure, and batching are left exactly as they were.

use std::sync::LazyLock;

use ndarray::{ArrayD, ArrayViewMut1, Axis};
use tracing::debug;

use crate::error::PanpointError;
use crate::format::{FormatRegistry, KeypointFormat};
use crate::keypoints::{ImageSize, Images, Keypoints, RaggedKeypoints, COORD_CHANNELS};

static DEFAULT_ENGINE: LazyLock<ConversionEngine> = LazyLock::new(ConversionEngine::default);

/// Converts keypoints between formats using the built-in registry.
///
/// See [`ConversionEngine::convert_format`].
pub fn convert_format(
    keypoints: &Keypoints,
    source: &str,
    target: &str,
    images: Option<&Images>,
) -> Result<Keypoints, PanpointError> {
    DEFAULT_ENGINE.convert_format(keypoints, source, target, images)
}

/// Converts keypoints between the formats of a registry.
#[derive(Clone, Debug)]
pub struct ConversionEngine {
    registry: FormatRegistry,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new(FormatRegistry::builtin())
    }
}

impl ConversionEngine {
    pub fn new(registry: FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Converts `keypoints` from the `source` format to the `target` format.
    ///
    /// `images` supplies the image dimensions that relative formats need. It
    /// must be unbatched (rank 3) for unbatched keypoints (rank 2) and
    /// batched (rank 4) for batched keypoints (rank 3 or 4).
    ///
    /// The result has the same container kind, shape, and metadata channels
    /// as the input. When `source` and `target` name the same format the
    /// keypoints are returned unchanged and no images are needed.
    ///
    /// # Errors
    /// - [`PanpointError::UnsupportedFormat`] for an unknown format name.
    /// - [`PanpointError::Shape`] if the keypoints or images have an
    ///   unsupported rank.
    /// - [`PanpointError::BatchMismatch`] if only one of keypoints and images
    ///   is batched.
    /// - [`PanpointError::MissingImages`] if a relative format is involved and
    ///   `images` is `None`.
    /// - [`PanpointError::ImageCountMismatch`] if per-image sizes are given
    ///   for fewer images than the keypoint batch holds.
    pub fn convert_format(
        &self,
        keypoints: &Keypoints,
        source: &str,
        target: &str,
        images: Option<&Images>,
    ) -> Result<Keypoints, PanpointError> {
        let source = self.registry.resolve("source", source)?;
        let target = self.registry.resolve("target", target)?;
        validate_shapes(keypoints, images)?;

        if source.name() == target.name() {
            debug!(
                format = source.name(),
                "source and target formats match, keypoints returned unchanged"
            );
            return Ok(keypoints.clone());
        }

        if images.is_none() && (source.requires_images() || target.requires_images()) {
            return Err(PanpointError::MissingImages {
                source_format: source.name().to_string(),
                target_format: target.name().to_string(),
            });
        }

        debug!(
            source = source.name(),
            target = target.name(),
            rank = keypoints.rank(),
            ragged = keypoints.is_ragged(),
            keypoints = keypoints.num_keypoints(),
            metadata_channels = keypoints.metadata_width(),
            "converting keypoints"
        );

        let plan = Plan { source, target };
        match keypoints {
            Keypoints::Dense(array) => plan.convert_dense(array, images).map(Keypoints::Dense),
            Keypoints::Ragged(ragged) => plan.convert_ragged(ragged, images).map(Keypoints::Ragged),
        }
    }
}

/// Checks ranks and batching before any value is touched.
fn validate_shapes(keypoints: &Keypoints, images: Option<&Images>) -> Result<(), PanpointError> {
    let keypoints_rank = keypoints.rank();
    if !(2..=4).contains(&keypoints_rank) {
        return Err(PanpointError::Shape(format!(
            "Expected keypoints rank to be in [2, 4], got len(keypoints.shape)={}.",
            keypoints_rank
        )));
    }
    if keypoints.channels() < COORD_CHANNELS {
        return Err(PanpointError::Shape(format!(
            "Expected keypoints to have at least 2 channels on the last axis, got \
             keypoints.shape[-1]={}.",
            keypoints.channels()
        )));
    }

    let Some(images) = images else {
        return Ok(());
    };

    let images_rank = images.rank();
    if images_rank != 3 && images_rank != 4 {
        return Err(PanpointError::Shape(format!(
            "Expected images rank to be 3 or 4, got len(images.shape)={}.",
            images_rank
        )));
    }
    if (keypoints_rank == 2) != (images_rank == 3) {
        return Err(PanpointError::BatchMismatch {
            keypoints_rank,
            images_rank,
        });
    }
    if let (Some(available), Some(batch)) = (images.distinct_sizes(), keypoints.batch_len()) {
        if batch > available {
            return Err(PanpointError::ImageCountMismatch {
                index: available,
                available,
            });
        }
    }
    Ok(())
}

fn image_size(images: Option<&Images>, index: usize) -> Result<Option<ImageSize>, PanpointError> {
    images.map(|images| images.size_for(index)).transpose()
}

/// A resolved source → canonical → target route.
struct Plan<'a> {
    source: &'a KeypointFormat,
    target: &'a KeypointFormat,
}

impl Plan<'_> {
    #[inline]
    fn convert_pair(&self, pair: [f64; 2], image: Option<ImageSize>) -> [f64; 2] {
        let canonical = self.source.to_canonical(pair, image);
        self.target.from_canonical(canonical, image)
    }

    #[inline]
    fn convert_lane(&self, lane: &mut ArrayViewMut1<'_, f64>, image: Option<ImageSize>) {
        let [x, y] = self.convert_pair([lane[0], lane[1]], image);
        lane[0] = x;
        lane[1] = y;
    }

    fn convert_dense(
        &self,
        array: &ArrayD<f64>,
        images: Option<&Images>,
    ) -> Result<ArrayD<f64>, PanpointError> {
        let mut out = array.clone();

        if out.ndim() == 2 {
            let image = image_size(images, 0)?;
            for mut lane in out.lanes_mut(Axis(1)) {
                self.convert_lane(&mut lane, image);
            }
            return Ok(out);
        }

        // Batched: axis 0 picks the image.
        for (index, mut entry) in out.axis_iter_mut(Axis(0)).enumerate() {
            let image = image_size(images, index)?;
            let channel_axis = Axis(entry.ndim() - 1);
            for mut lane in entry.lanes_mut(channel_axis) {
                self.convert_lane(&mut lane, image);
            }
        }
        Ok(out)
    }

    fn convert_ragged(
        &self,
        ragged: &RaggedKeypoints,
        images: Option<&Images>,
    ) -> Result<RaggedKeypoints, PanpointError> {
        let channels = ragged.channels();
        let mut values = ragged.values().to_vec();

        for index in 0..ragged.batch_len() {
            let image = image_size(images, index)?;
            let rows = ragged.rows_of(index);
            for row in values[rows.start * channels..rows.end * channels].chunks_exact_mut(channels)
            {
                let [x, y] = self.convert_pair([row[0], row[1]], image);
                row[0] = x;
                row[1] = y;
            }
        }
        Ok(ragged.with_values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::Coord;
    use ndarray::{array, Array, Array2, IxDyn};

    fn assert_close(actual: &Keypoints, expected: &Keypoints) {
        assert_eq!(actual.shape(), expected.shape());
        for (a, e) in actual.rows().zip(expected.rows()) {
            for (x, y) in a.iter().zip(&e) {
                assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, e);
            }
        }
    }

    #[test]
    fn xy_to_rel_xy_divides_by_width_and_height() {
        let keypoints = Keypoints::from(array![[10.0, 20.0]]);
        let images = Images::from_shape(&[500, 1000, 3]);
        let out = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap();
        assert_close(&out, &Keypoints::from(array![[0.01, 0.04]]));
    }

    #[test]
    fn identity_needs_no_images() {
        let keypoints = Keypoints::from(array![[10.0, 20.0, 7.0]]);
        let out = convert_format(&keypoints, "xy", "xy", None).unwrap();
        assert_eq!(out, keypoints);
        let out = convert_format(&keypoints, "rel_xy", "REL_XY", None).unwrap();
        assert_eq!(out, keypoints);
    }

    #[test]
    fn rejects_rank_five() {
        let keypoints = Keypoints::from(Array::<f64, _>::zeros(IxDyn(&[2, 3, 4, 2, 1])));
        let err = convert_format(&keypoints, "xy", "rel_xy", None).unwrap_err();
        assert!(matches!(err, PanpointError::Shape(_)));
        assert_eq!(
            err.to_string(),
            "Expected keypoints rank to be in [2, 4], got len(keypoints.shape)=5."
        );
    }

    #[test]
    fn rejects_rank_one() {
        let keypoints = Keypoints::from(array![1.0, 2.0]);
        let err = convert_format(&keypoints, "xy", "xy", None).unwrap_err();
        assert!(err.to_string().contains("got len(keypoints.shape)=1"));
    }

    #[test]
    fn rejects_single_channel() {
        let keypoints = Keypoints::from(Array2::<f64>::zeros((3, 1)));
        let err = convert_format(&keypoints, "xy", "xy", None).unwrap_err();
        assert!(err.to_string().contains("keypoints.shape[-1]=1"));
    }

    #[test]
    fn rejects_image_rank_two() {
        let keypoints = Keypoints::from(Array2::<f64>::ones((4, 2)));
        let images = Images::from_shape(&[35, 35]);
        let err = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected images rank to be 3 or 4, got len(images.shape)=2."
        );
    }

    #[test]
    fn rejects_batched_keypoints_with_single_image() {
        let keypoints = Keypoints::from(Array::<f64, _>::ones((2, 4, 2)));
        let images = Images::from_shape(&[35, 35, 3]);
        let err = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap_err();
        assert!(matches!(
            err,
            PanpointError::BatchMismatch {
                keypoints_rank: 3,
                images_rank: 3
            }
        ));
    }

    #[test]
    fn rejects_unbatched_keypoints_with_image_batch() {
        let keypoints = Keypoints::from(Array2::<f64>::ones((4, 2)));
        let images = Images::from_shape(&[1, 35, 35, 3]);
        let err = convert_format(&keypoints, "rel_xy", "xy", Some(&images)).unwrap_err();
        assert!(matches!(err, PanpointError::BatchMismatch { .. }));
    }

    #[test]
    fn rejects_missing_images() {
        let keypoints = Keypoints::from(Array2::<f64>::ones((4, 2)));
        let err = convert_format(&keypoints, "xy", "rel_xy", None).unwrap_err();
        assert!(matches!(
            &err,
            PanpointError::MissingImages { source_format, target_format }
                if source_format == "xy" && target_format == "rel_xy"
        ));
    }

    #[test]
    fn rejects_unknown_format_before_shapes() {
        let keypoints = Keypoints::from(Array::<f64, _>::zeros(IxDyn(&[1, 1, 1, 1, 2])));
        let err = convert_format(&keypoints, "yxyx", "xy", None).unwrap_err();
        assert!(matches!(err, PanpointError::UnsupportedFormat { argument: "source", .. }));
    }

    #[test]
    fn per_image_sizes_apply_to_each_batch_entry() {
        let keypoints = Keypoints::from(array![[[10.0, 10.0]], [[10.0, 10.0]]]);
        let images = Images::Batch(vec![ImageSize::new(20, 10), ImageSize::new(100, 50)]);
        let out = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap();
        assert_close(&out, &Keypoints::from(array![[[1.0, 0.5]], [[0.2, 0.1]]]));
    }

    #[test]
    fn too_few_image_sizes_fail_before_conversion() {
        let keypoints = Keypoints::from(Array::<f64, _>::ones((3, 1, 2)));
        let images = Images::Batch(vec![ImageSize::new(20, 10), ImageSize::new(100, 50)]);
        let err = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap_err();
        assert!(matches!(
            err,
            PanpointError::ImageCountMismatch {
                index: 2,
                available: 2
            }
        ));
    }

    #[test]
    fn ragged_rows_use_their_own_image() {
        let ragged = RaggedKeypoints::from_row_lengths(
            vec![10.0, 10.0, 5.0, 10.0, 10.0, 5.0, 20.0, 20.0, 5.0],
            3,
            &[vec![1, 2]],
        )
        .unwrap();
        let keypoints = Keypoints::from(ragged);
        let images = Images::Batch(vec![ImageSize::new(20, 10), ImageSize::new(40, 20)]);
        let out = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap();
        let out = out.as_ragged().expect("ragged stays ragged");
        assert_eq!(out.row_lengths(), vec![vec![1, 2]]);
        assert_eq!(out.row(0), &[1.0, 0.5, 5.0]);
        assert_eq!(out.row(1), &[0.5, 0.25, 5.0]);
        assert_eq!(out.row(2), &[1.0, 0.5, 5.0]);
    }

    #[test]
    fn custom_registry_formats_are_dispatched() {
        let mut registry = FormatRegistry::builtin();
        registry
            .register(KeypointFormat::new(
                "yx",
                |pair, _| Coord::new(pair[1], pair[0]),
                |point, _| [point.y, point.x],
            ))
            .unwrap();
        let engine = ConversionEngine::new(registry);
        let keypoints = Keypoints::from(array![[1.0, 2.0, 3.0]]);
        let out = engine.convert_format(&keypoints, "xy", "yx", None).unwrap();
        assert_eq!(out, Keypoints::from(array![[2.0, 1.0, 3.0]]));
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConversionEngine>();
        assert_send_sync::<Keypoints>();
        assert_send_sync::<Images>();
    }
}
