#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// A 24-bit BMP of the given size; only the header matters for size probing.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// Writes a keypoint JSON fixture into `dir` and returns its path.
pub fn write_keypoints(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).expect("write keypoints fixture");
    path
}

/// Two images with three keypoints each, in absolute pixels.
pub const XY_BATCH_JSON: &str =
    "[[[10.0,20.0],[110.0,120.0],[210.0,220.0]],[[20.0,30.0],[120.0,130.0],[220.0,230.0]]]";

/// One image with two keypoints carrying a confidence channel.
pub const XY_UNBATCHED_JSON: &str = "[[10.0,20.0,0.9],[110.0,120.0,0.5]]";

/// Two images with one and two keypoints.
pub const XY_RAGGED_JSON: &str = "[[[10.0,20.0]],[[110.0,120.0],[210.0,220.0]]]";
