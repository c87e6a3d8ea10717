#![allow(dead_code)]

use ndarray::{Array2, ArrayD, Axis, IxDyn};
use panpoint::{ImageSize, Images, Keypoints, RaggedKeypoints};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Relative tolerance for an xy -> rel_xy -> xy round trip.
pub const EPS_ROUNDTRIP: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Compares every value of two keypoint collections with a relative tolerance.
pub fn assert_keypoints_close(a: &Keypoints, b: &Keypoints, eps: f64) -> Result<(), String> {
    if a.shape() != b.shape() {
        return Err(format!("shape {:?} != {:?}", a.shape(), b.shape()));
    }
    if a.is_ragged() != b.is_ragged() {
        return Err("container kinds differ".to_string());
    }
    if let (Some(ra), Some(rb)) = (a.as_ragged(), b.as_ragged()) {
        if ra.row_splits() != rb.row_splits() {
            return Err(format!(
                "row splits {:?} != {:?}",
                ra.row_splits(),
                rb.row_splits()
            ));
        }
    }
    for (index, (row_a, row_b)) in a.rows().zip(b.rows()).enumerate() {
        for (va, vb) in row_a.iter().zip(&row_b) {
            let scale = va.abs().max(vb.abs()).max(1.0);
            if (va - vb).abs() > eps * scale {
                return Err(format!("row {}: {:?} != {:?}", index, row_a, row_b));
            }
        }
    }
    Ok(())
}

/// Metadata channels (everything after x, y) of every row.
pub fn metadata_of(keypoints: &Keypoints) -> Vec<Vec<f64>> {
    keypoints.rows().map(|row| row[2..].to_vec()).collect()
}

pub fn arb_image_size() -> BoxedStrategy<ImageSize> {
    (1usize..=4096, 1usize..=4096)
        .prop_map(|(height, width)| ImageSize::new(height, width))
        .boxed()
}

fn arb_values(len: usize) -> BoxedStrategy<Vec<f64>> {
    proptest::collection::vec(-5000.0f64..5000.0, len..=len).boxed()
}

/// Unbatched dense keypoints `[n, channels]` with a matching single image.
pub fn arb_unbatched(max_keypoints: usize, max_channels: usize) -> BoxedStrategy<(Keypoints, Images)> {
    (0usize..=max_keypoints, 2usize..=max_channels, arb_image_size())
        .prop_flat_map(|(n, channels, size)| {
            arb_values(n * channels).prop_map(move |values| {
                let array = ArrayD::from_shape_vec(IxDyn(&[n, channels]), values)
                    .expect("shape matches value count");
                (Keypoints::Dense(array), Images::Single(size))
            })
        })
        .boxed()
}

/// Batched dense keypoints of rank 3 or 4 with one image size per entry.
pub fn arb_batched_dense(
    max_batch: usize,
    max_keypoints: usize,
    max_channels: usize,
) -> BoxedStrategy<(Keypoints, Images)> {
    assert!(max_batch > 0, "max_batch must be > 0");

    (
        1usize..=max_batch,
        prop::option::of(1usize..=3),
        0usize..=max_keypoints,
        2usize..=max_channels,
    )
        .prop_flat_map(|(batch, groups, n, channels)| {
            let mut shape = vec![batch];
            shape.extend(groups);
            shape.extend([n, channels]);
            let len = shape.iter().product();
            (
                arb_values(len),
                proptest::collection::vec(arb_image_size(), batch..=batch),
            )
                .prop_map(move |(values, sizes)| {
                    let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
                        .expect("shape matches value count");
                    (Keypoints::Dense(array), Images::Batch(sizes))
                })
        })
        .boxed()
}

/// Ragged keypoints of rank 3 or 4 with one image size per entry.
pub fn arb_ragged(
    max_batch: usize,
    max_keypoints: usize,
    max_channels: usize,
) -> BoxedStrategy<(Keypoints, Images)> {
    assert!(max_batch > 0, "max_batch must be > 0");

    (1usize..=max_batch, any::<bool>(), 2usize..=max_channels)
        .prop_flat_map(move |(batch, grouped, channels)| {
            let lengths = if grouped {
                proptest::collection::vec(0usize..=3, batch..=batch)
                    .prop_flat_map(move |groups| {
                        let total: usize = groups.iter().sum();
                        proptest::collection::vec(0usize..=max_keypoints, total..=total)
                            .prop_map(move |inner| vec![groups.clone(), inner])
                    })
                    .boxed()
            } else {
                proptest::collection::vec(0usize..=max_keypoints, batch..=batch)
                    .prop_map(|lengths| vec![lengths])
                    .boxed()
            };
            (
                lengths,
                proptest::collection::vec(arb_image_size(), batch..=batch),
            )
                .prop_flat_map(move |(lengths, sizes)| {
                    let rows: usize = lengths.last().map(|l| l.iter().sum()).unwrap_or(0);
                    arb_values(rows * channels).prop_map(move |values| {
                        let ragged =
                            RaggedKeypoints::from_row_lengths(values, channels, &lengths)
                                .expect("lengths describe values");
                        (Keypoints::Ragged(ragged), Images::Batch(sizes.clone()))
                    })
                })
        })
        .boxed()
}

/// Any supported keypoint layout paired with matching images.
pub fn arb_keypoints_with_images() -> BoxedStrategy<(Keypoints, Images)> {
    prop_oneof![
        arb_unbatched(8, 6),
        arb_batched_dense(3, 6, 6),
        arb_ragged(3, 6, 6),
    ]
    .boxed()
}

/// Splits batched keypoints into one `[rows, channels]` array per image.
///
/// Groups within an image are flattened in storage order.
pub fn unbatched_entries(keypoints: &Keypoints) -> Vec<Array2<f64>> {
    let channels = keypoints.channels();
    let to_rows = |values: Vec<f64>| {
        Array2::from_shape_vec((values.len() / channels, channels), values)
            .expect("whole rows")
    };
    match keypoints {
        Keypoints::Dense(array) => array
            .axis_iter(Axis(0))
            .map(|entry| to_rows(entry.iter().copied().collect()))
            .collect(),
        Keypoints::Ragged(ragged) => (0..ragged.batch_len())
            .map(|index| {
                let rows = ragged.rows_of(index);
                to_rows(ragged.values()[rows.start * channels..rows.end * channels].to_vec())
            })
            .collect(),
    }
}

/// Batched keypoints (dense or ragged) with one image size per entry.
pub fn arb_batched_with_images() -> BoxedStrategy<(Keypoints, Images)> {
    prop_oneof![arb_batched_dense(4, 6, 6), arb_ragged(4, 6, 6)].boxed()
}
