//! Fuzz target for nested-array keypoint JSON parsing.
//!
//! Feeds arbitrary bytes to the parser and, when they parse, checks that
//! writing the keypoints back out does not panic either.

#![no_main]

use libfuzzer_sys::fuzz_target;
use panpoint::keypoints::io_json::{from_json_slice, to_json_string};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(keypoints) = from_json_slice(data) {
        let _ = to_json_string(&keypoints);
    }
});
