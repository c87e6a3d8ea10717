//! Fuzz target for format conversion.
//!
//! Parses the input as keypoint JSON and converts it both ways against a
//! fixed image batch. Conversion may fail on bad shapes but must not panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use panpoint::keypoints::io_json::from_json_slice;
use panpoint::{convert_format, ImageSize, Images};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(keypoints) = from_json_slice(data) else {
        return;
    };
    let images = if keypoints.is_batched() {
        Images::Batch(vec![ImageSize::new(480, 640), ImageSize::new(0, 7)])
    } else {
        Images::Single(ImageSize::new(480, 640))
    };

    if let Ok(relative) = convert_format(&keypoints, "xy", "rel_xy", Some(&images)) {
        let _ = convert_format(&relative, "rel_xy", "xy", Some(&images));
    }
});
