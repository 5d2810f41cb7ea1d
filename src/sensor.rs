// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the depth-sensor sample types and the single-slot sample mailbox.

use nalgebra::Isometry3;
use parking_lot::Mutex;
use std::sync::Arc;

/// Nanosecond-precision capture timestamp.
///
/// [`Timestamp::zero`] is the conventional "latest available" marker in
/// transform lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// Creates a timestamp from nanoseconds.
    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp { nanos }
    }
    /// Creates a timestamp from seconds.
    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp {
            nanos: (secs.max(0.) * 1e9) as u64,
        }
    }
    /// Returns the timestamp as nanoseconds.
    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }
    /// Returns the timestamp as seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }
    /// Returns the zero timestamp.
    pub const fn zero() -> Self {
        Timestamp { nanos: 0 }
    }
    /// Checks if this is the zero timestamp.
    pub const fn is_zero(self) -> bool {
        self.nanos == 0
    }
}

/// A single rectified depth frame. Depths are in \[m\], row-major.
#[derive(Debug, Clone)]
pub struct DepthImage {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
}

impl DepthImage {
    /// Creates a new DepthImage.
    /// # Arguments
    /// * `width` - Image width in pixels.
    /// * `height` - Image height in pixels.
    /// * `pixels` - Row-major depth values in \[m\].
    /// # Panics
    /// This function panics if the pixel buffer length does not match
    /// `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<f32>) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize);
        DepthImage {
            width,
            height,
            pixels,
        }
    }
    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }
    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Depth at pixel `(u, v)` in \[m\].
    pub fn depth_at(&self, u: u32, v: u32) -> f32 {
        self.pixels[v as usize * self.width as usize + u as usize]
    }
    /// Row-major depth buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.pixels
    }
}

/// Pinhole camera intrinsic parameters of the rectified depth stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in pixels (x direction).
    pub fx: f64,
    /// Focal length in pixels (y direction).
    pub fy: f64,
    /// Principal point x-coordinate in pixels.
    pub cx: f64,
    /// Principal point y-coordinate in pixels.
    pub cy: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl CameraIntrinsics {
    /// Creates new camera intrinsics.
    pub const fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        CameraIntrinsics {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }
}

/// A depth frame together with the sensor-optical to task-frame pose at which
/// it was captured.
#[derive(Debug, Clone)]
pub struct SensorSample {
    /// Captured depth frame.
    pub image: DepthImage,
    /// Capture pose, sensor-optical frame expressed in the task frame.
    pub extrinsic: Isometry3<f64>,
    /// Capture time.
    pub stamp: Timestamp,
}

/// Single-slot mailbox between the sensor-ingestion context and the decision
/// loop.
///
/// Posting unconditionally replaces the current sample (last write wins, no
/// queueing); reading clones a handle to the newest complete sample. A
/// partially written sample can never be observed since the slot swap happens
/// under the lock.
#[derive(Default)]
pub struct SampleMailbox {
    slot: Mutex<Option<Arc<SensorSample>>>,
}

impl SampleMailbox {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        SampleMailbox {
            slot: Mutex::new(None),
        }
    }
    /// Replaces the current sample. Called from the sensor-ingestion context;
    /// never blocks on the decision loop for longer than the slot swap.
    pub fn post(&self, sample: SensorSample) {
        *self.slot.lock() = Some(Arc::new(sample));
    }
    /// Returns the newest sample, or None if nothing has ever been posted.
    pub fn latest(&self) -> Option<Arc<SensorSample>> {
        self.slot.lock().clone()
    }
    /// Checks whether at least one sample has been posted.
    pub fn has_sample(&self) -> bool {
        self.slot.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::sensor::{DepthImage, SampleMailbox, SensorSample, Timestamp};
    use nalgebra::Isometry3;
    use std::sync::Arc;

    fn sample_with_stamp(stamp_secs: f64) -> SensorSample {
        SensorSample {
            image: DepthImage::new(2, 2, vec![0.5; 4]),
            extrinsic: Isometry3::translation(0., 0., stamp_secs),
            stamp: Timestamp::from_secs_f64(stamp_secs),
        }
    }

    #[test]
    fn empty_mailbox_has_no_sample() {
        let mailbox = SampleMailbox::new();
        assert!(!mailbox.has_sample());
        assert!(mailbox.latest().is_none());
    }

    #[test]
    fn post_replaces_unconditionally() {
        let mailbox = SampleMailbox::new();
        mailbox.post(sample_with_stamp(1.0));
        mailbox.post(sample_with_stamp(2.0));
        mailbox.post(sample_with_stamp(0.5));
        // last write wins, even when the stamp goes backwards
        let latest = mailbox.latest().unwrap();
        assert_eq!(latest.stamp, Timestamp::from_secs_f64(0.5));
    }

    #[test]
    fn latest_keeps_handle_alive_across_replacement() {
        let mailbox = SampleMailbox::new();
        mailbox.post(sample_with_stamp(1.0));
        let held = mailbox.latest().unwrap();
        mailbox.post(sample_with_stamp(2.0));
        // the reader's handle still sees the sample it grabbed
        assert_eq!(held.stamp, Timestamp::from_secs_f64(1.0));
        assert_eq!(
            mailbox.latest().unwrap().stamp,
            Timestamp::from_secs_f64(2.0)
        );
    }

    #[test]
    fn cross_thread_posting() {
        let mailbox = Arc::new(SampleMailbox::new());
        let feed = mailbox.clone();
        let writer = std::thread::spawn(move || {
            for i in 0..100 {
                feed.post(sample_with_stamp(i as f64));
            }
        });
        while !mailbox.has_sample() {
            std::thread::yield_now();
        }
        // every observed sample is complete and well formed
        let observed = mailbox.latest().unwrap();
        assert_eq!(observed.image.width(), 2);
        writer.join().unwrap();
        assert_eq!(
            mailbox.latest().unwrap().stamp,
            Timestamp::from_secs_f64(99.0)
        );
    }

    #[test]
    fn timestamp_conversions() {
        let stamp = Timestamp::from_secs_f64(1.5);
        assert_eq!(stamp.as_nanos(), 1_500_000_000);
        assert!((stamp.as_secs_f64() - 1.5).abs() < 1e-9);
        assert!(Timestamp::zero().is_zero());
        assert!(!stamp.is_zero());
    }

    #[test]
    fn depth_image_accessors() {
        let image = DepthImage::new(3, 2, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 2);
        assert_eq!(image.depth_at(0, 0), 0.1);
        assert_eq!(image.depth_at(2, 0), 0.3);
        assert_eq!(image.depth_at(1, 1), 0.5);
        assert_eq!(image.as_slice().len(), 6);
    }

    #[test]
    #[should_panic]
    fn depth_image_rejects_short_buffer() {
        DepthImage::new(4, 4, vec![0.; 15]);
    }
}
