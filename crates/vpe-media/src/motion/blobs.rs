//! Frame differencing and blob measurement.
//!
//! A frame is compared against a fixed reference: both are smoothed,
//! absolute-differenced, thresholded into a binary mask, and the mask
//! is segmented into 4-connected blobs. The largest blob's pixel area
//! is the motion measurement.

use image::GrayImage;

use crate::frame::Frame;

/// Gaussian sigma approximating a 21x21 smoothing kernel.
const SMOOTHING_SIGMA: f32 = 3.5;

/// Smooth a raw frame into the comparison domain.
pub fn prepare(frame: &Frame) -> GrayImage {
    let img = GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .unwrap_or_else(|| GrayImage::new(frame.width, frame.height));
    image::imageops::blur(&img, SMOOTHING_SIGMA)
}

/// Largest connected changed-pixel area between `reference` and
/// `current`, both already prepared.
pub fn motion_area(reference: &GrayImage, current: &GrayImage, diff_threshold: u8) -> u64 {
    let (width, height) = reference.dimensions();
    if current.dimensions() != (width, height) {
        return 0;
    }

    let mask: Vec<bool> = reference
        .as_raw()
        .iter()
        .zip(current.as_raw().iter())
        .map(|(a, b)| a.abs_diff(*b) > diff_threshold)
        .collect();

    largest_blob(&mask, width as usize, height as usize)
}

/// Area of the largest 4-connected region of set pixels.
fn largest_blob(mask: &[bool], width: usize, height: usize) -> u64 {
    let mut visited = vec![false; mask.len()];
    let mut stack = Vec::new();
    let mut best = 0u64;

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let mut area = 0u64;
        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            area += 1;
            let x = idx % width;
            let y = idx / width;
            let neighbors = [
                (x > 0).then(|| idx - 1),
                (x + 1 < width).then(|| idx + 1),
                (y > 0).then(|| idx - width),
                (y + 1 < height).then(|| idx + width),
            ];
            for n in neighbors.into_iter().flatten() {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }
        best = best.max(area);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::{frame_with_blob, gray_frame};

    #[test]
    fn test_identical_frames_have_no_motion() {
        let a = prepare(&gray_frame(0, 40));
        let b = prepare(&gray_frame(33, 40));
        assert_eq!(motion_area(&a, &b, 25), 0);
    }

    #[test]
    fn test_bright_region_measures_as_blob() {
        let reference = prepare(&frame_with_blob(0, 0));
        let moved = prepare(&frame_with_blob(33, 24));
        let area = motion_area(&reference, &moved, 25);
        // Smoothing erodes the edges; the core must still dominate.
        assert!(area > 300, "area was {area}");
    }

    #[test]
    fn test_largest_blob_picks_maximum() {
        // Two disjoint regions on a 6x6 grid, sizes 2 and 4.
        let mut mask = vec![false; 36];
        mask[0] = true;
        mask[1] = true;
        for idx in [20, 21, 26, 27] {
            mask[idx] = true;
        }
        assert_eq!(largest_blob(&mask, 6, 6), 4);
    }

    #[test]
    fn test_sub_threshold_difference_ignored() {
        let a = prepare(&gray_frame(0, 100));
        let b = prepare(&gray_frame(33, 110));
        assert_eq!(motion_area(&a, &b, 25), 0);
    }
}
