//! Ragged keypoint storage: a flat value arena plus row-split offsets.

use std::ops::Range;

use crate::error::PanpointError;

/// A batch of keypoints whose per-image (or per-group) counts vary.
///
/// Values are stored row-major in one flat arena, `channels` values per
/// keypoint. Each level of `row_splits` partitions the level below it,
/// outermost level first, the same way ragged tensors do:
///
/// - one level (rank 3): `images -> keypoints`
/// - two levels (rank 4): `images -> groups -> keypoints`
///
/// A level's splits start at `0`, never decrease, and end at the number of
/// entries in the next level (or the number of keypoint rows, for the last
/// level).
#[derive(Clone, Debug, PartialEq)]
pub struct RaggedKeypoints {
    values: Vec<f64>,
    channels: usize,
    row_splits: Vec<Vec<usize>>,
}

impl RaggedKeypoints {
    /// Creates a ragged collection, checking that the splits describe `values`.
    pub fn new(
        values: Vec<f64>,
        channels: usize,
        row_splits: Vec<Vec<usize>>,
    ) -> Result<Self, PanpointError> {
        if channels == 0 {
            return Err(PanpointError::InvalidKeypoints(
                "ragged keypoints need at least one channel".to_string(),
            ));
        }
        if values.len() % channels != 0 {
            return Err(PanpointError::InvalidKeypoints(format!(
                "{} value(s) cannot be split into rows of {} channel(s)",
                values.len(),
                channels
            )));
        }
        if row_splits.is_empty() {
            return Err(PanpointError::InvalidKeypoints(
                "ragged keypoints need at least one level of row splits".to_string(),
            ));
        }

        let num_rows = values.len() / channels;
        for (level, splits) in row_splits.iter().enumerate() {
            if splits.first() != Some(&0) {
                return Err(PanpointError::InvalidKeypoints(format!(
                    "row splits at level {} must start at 0",
                    level
                )));
            }
            if splits.windows(2).any(|w| w[1] < w[0]) {
                return Err(PanpointError::InvalidKeypoints(format!(
                    "row splits at level {} must be non-decreasing",
                    level
                )));
            }
            let expected_end = match row_splits.get(level + 1) {
                Some(next) => next.len().saturating_sub(1),
                None => num_rows,
            };
            // `first()` was checked above, so `last()` exists.
            let end = splits.last().copied().unwrap_or_default();
            if end != expected_end {
                return Err(PanpointError::InvalidKeypoints(format!(
                    "row splits at level {} end at {} but the level below has {} entries",
                    level, end, expected_end
                )));
            }
        }

        Ok(Self {
            values,
            channels,
            row_splits,
        })
    }

    /// Creates a ragged collection from per-level row lengths instead of
    /// offsets.
    ///
    /// `row_lengths[0]` holds the number of entries per image, and so on down
    /// to the number of keypoints per innermost group.
    pub fn from_row_lengths(
        values: Vec<f64>,
        channels: usize,
        row_lengths: &[Vec<usize>],
    ) -> Result<Self, PanpointError> {
        let row_splits = row_lengths
            .iter()
            .map(|lengths| {
                std::iter::once(0)
                    .chain(lengths.iter().scan(0, |acc, &len| {
                        *acc += len;
                        Some(*acc)
                    }))
                    .collect()
            })
            .collect();
        Self::new(values, channels, row_splits)
    }

    /// Number of values per keypoint (x, y, then metadata).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Rank of the equivalent ragged tensor.
    pub fn rank(&self) -> usize {
        self.row_splits.len() + 2
    }

    /// Number of top-level entries (images).
    pub fn batch_len(&self) -> usize {
        self.row_splits[0].len() - 1
    }

    /// Total number of keypoint rows across all groups.
    pub fn num_rows(&self) -> usize {
        self.values.len() / self.channels
    }

    /// The flat value arena.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row-split offsets, outermost level first.
    pub fn row_splits(&self) -> &[Vec<usize>] {
        &self.row_splits
    }

    /// Row lengths per level, outermost first.
    pub fn row_lengths(&self) -> Vec<Vec<usize>> {
        self.row_splits
            .iter()
            .map(|splits| splits.windows(2).map(|w| w[1] - w[0]).collect())
            .collect()
    }

    /// One keypoint row (all channels).
    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.channels..(index + 1) * self.channels]
    }

    /// Range of keypoint rows that belong to top-level entry `index`.
    pub fn rows_of(&self, index: usize) -> Range<usize> {
        self.rows_at(0, index)
    }

    /// Range of keypoint rows under entry `index` of split level `level`.
    pub(crate) fn rows_at(&self, level: usize, index: usize) -> Range<usize> {
        let (mut start, mut end) = (index, index + 1);
        for splits in &self.row_splits[level..] {
            start = splits[start];
            end = splits[end];
        }
        start..end
    }

    /// Range of entries one level down under entry `index` of `level`.
    pub(crate) fn children_of(&self, level: usize, index: usize) -> Range<usize> {
        let splits = &self.row_splits[level];
        splits[index]..splits[index + 1]
    }

    /// Shape in ragged-tensor notation: `None` marks a ragged axis.
    pub fn shape(&self) -> Vec<Option<usize>> {
        let mut shape = Vec::with_capacity(self.rank());
        shape.push(Some(self.batch_len()));
        shape.extend(std::iter::repeat(None).take(self.row_splits.len()));
        shape.push(Some(self.channels));
        shape
    }

    /// Same structure with a new value arena of identical length.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            values,
            channels: self.channels,
            row_splits: self.row_splits.clone(),
        }
    }
}
