//! Nested-array JSON format for keypoints.
//!
//! Keypoints are written as plain nested JSON arrays of numbers, the same
//! layout a tensor's `tolist()` produces:
//!
//! ```json
//! [[[10, 20, 1.0], [110, 120, 0.5]],
//!  [[20, 30, 1.0]]]
//! ```
//!
//! When every list at a given depth has the same length the keypoints are read
//! as [`Keypoints::Dense`]. If any depth above the channel axis has lists of
//! different lengths (as in the example above) they are read as
//! [`Keypoints::Ragged`]. Every keypoint must have the same number of channels.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde_json::Value;

use super::{Keypoints, RaggedKeypoints};
use crate::error::PanpointError;

/// Reads keypoints from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or does
/// not describe a keypoint array.
pub fn read_keypoints_json(path: &Path) -> Result<Keypoints, PanpointError> {
    let file = File::open(path).map_err(PanpointError::Io)?;
    let reader = BufReader::new(file);

    let value: Value =
        serde_json::from_reader(reader).map_err(|source| PanpointError::KeypointsJsonParse {
            path: path.to_path_buf(),
            source,
        })?;
    from_json_value(&value)
}

/// Writes keypoints to a JSON file as nested arrays.
pub fn write_keypoints_json(path: &Path, keypoints: &Keypoints) -> Result<(), PanpointError> {
    let file = File::create(path).map_err(PanpointError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer(writer, &to_json_value(keypoints)).map_err(|source| {
        PanpointError::KeypointsJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads keypoints from a JSON string.
pub fn from_json_str(json: &str) -> Result<Keypoints, PanpointError> {
    let value: Value = serde_json::from_str(json)?;
    from_json_value(&value)
}

/// Reads keypoints from JSON bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<Keypoints, PanpointError> {
    let value: Value = serde_json::from_slice(bytes)?;
    from_json_value(&value)
}

/// Writes keypoints to a compact JSON string.
pub fn to_json_string(keypoints: &Keypoints) -> Result<String, PanpointError> {
    Ok(serde_json::to_string(&to_json_value(keypoints))?)
}

/// Builds keypoints from an already parsed JSON value.
pub fn from_json_value(value: &Value) -> Result<Keypoints, PanpointError> {
    if !value.is_array() {
        return Err(PanpointError::InvalidKeypoints(
            "expected a JSON array of keypoints".to_string(),
        ));
    }
    let rank = nesting_depth(value)?.ok_or_else(|| {
        PanpointError::InvalidKeypoints(
            "cannot infer the keypoint rank from arrays that contain no numbers".to_string(),
        )
    })?;

    // lengths[d] holds the length of every list at depth d, left to right.
    let mut lengths: Vec<Vec<usize>> = vec![Vec::new(); rank];
    let mut values = Vec::new();
    flatten(value, 0, rank, &mut lengths, &mut values)?;

    let channel_lengths = &lengths[rank - 1];
    let channels = channel_lengths.first().copied().unwrap_or(0);
    if let Some(bad) = channel_lengths.iter().find(|&&len| len != channels) {
        return Err(PanpointError::InvalidKeypoints(format!(
            "every keypoint must have the same number of channels, found {} and {}",
            channels, bad
        )));
    }

    let is_uniform = lengths
        .iter()
        .all(|level| level.windows(2).all(|w| w[0] == w[1]));

    if is_uniform {
        let shape: Vec<usize> = lengths
            .iter()
            .map(|level| level.first().copied().unwrap_or(0))
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| PanpointError::InvalidKeypoints(e.to_string()))?;
        return Ok(Keypoints::Dense(array));
    }

    // The top-level list and the channel axis never become ragged splits.
    let row_lengths = &lengths[1..rank - 1];
    let ragged = RaggedKeypoints::from_row_lengths(values, channels, row_lengths)?;
    Ok(Keypoints::Ragged(ragged))
}

/// Converts keypoints to nested JSON arrays.
///
/// Non-finite values have no JSON representation and are written as `null`,
/// which reads back as NaN.
pub fn to_json_value(keypoints: &Keypoints) -> Value {
    match keypoints {
        Keypoints::Dense(array) => dense_to_value(array.view()),
        Keypoints::Ragged(ragged) => Value::Array(
            (0..ragged.batch_len())
                .map(|index| ragged_to_value(ragged, 0, index))
                .collect(),
        ),
    }
}

/// Depth of the numbers (or nulls) below `value`, or `None` if it holds only
/// empty lists.
fn nesting_depth(value: &Value) -> Result<Option<usize>, PanpointError> {
    match value {
        Value::Number(_) | Value::Null => Ok(Some(0)),
        Value::Array(items) => {
            let mut depth = None;
            for item in items {
                match (depth, nesting_depth(item)?) {
                    (_, None) => {}
                    (None, Some(d)) => depth = Some(d),
                    (Some(a), Some(b)) if a != b => {
                        return Err(PanpointError::InvalidKeypoints(format!(
                            "mixed nesting depths {} and {}",
                            a + 1,
                            b + 1
                        )));
                    }
                    _ => {}
                }
            }
            Ok(depth.map(|d| d + 1))
        }
        other => Err(PanpointError::InvalidKeypoints(format!(
            "expected a number or an array, found {}",
            other
        ))),
    }
}

fn flatten(
    value: &Value,
    depth: usize,
    rank: usize,
    lengths: &mut [Vec<usize>],
    values: &mut Vec<f64>,
) -> Result<(), PanpointError> {
    match value {
        Value::Number(n) if depth == rank => {
            let v = n.as_f64().ok_or_else(|| {
                PanpointError::InvalidKeypoints(format!("{} is not representable as f64", n))
            })?;
            values.push(v);
            Ok(())
        }
        Value::Null if depth == rank => {
            values.push(f64::NAN);
            Ok(())
        }
        Value::Array(items) if depth < rank => {
            lengths[depth].push(items.len());
            for item in items {
                flatten(item, depth + 1, rank, lengths, values)?;
            }
            Ok(())
        }
        _ => Err(PanpointError::InvalidKeypoints(format!(
            "unexpected value at nesting depth {}",
            depth
        ))),
    }
}

fn number(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn dense_to_value(view: ArrayViewD<'_, f64>) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().copied().map(number).unwrap_or(Value::Null);
    }
    Value::Array(view.outer_iter().map(dense_to_value).collect())
}

fn ragged_to_value(ragged: &RaggedKeypoints, level: usize, index: usize) -> Value {
    let children = ragged.children_of(level, index);
    if level + 1 < ragged.row_splits().len() {
        Value::Array(
            children
                .map(|child| ragged_to_value(ragged, level + 1, child))
                .collect(),
        )
    } else {
        Value::Array(
            children
                .map(|row| Value::Array(ragged.row(row).iter().copied().map(number).collect()))
                .collect(),
        )
    }
}
