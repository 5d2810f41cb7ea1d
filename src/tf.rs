// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the coordinate-frame lookup interface.

use crate::exception::GraspResult;
use crate::sensor::Timestamp;
use nalgebra::Isometry3;
use std::time::Duration;

/// Resolves rigid transforms between named coordinate frames.
///
/// Frames are identified by name only; two frames with the same name are the
/// same frame. Lookups block until the transform is available or `timeout`
/// expires, in which case they fail with
/// [`LookupTimeout`](`crate::exception::GraspException::LookupTimeout`).
#[cfg_attr(test, mockall::automock)]
pub trait TransformProvider {
    /// Returns the pose of `source_frame` expressed in `target_frame` at
    /// `time`. [`Timestamp::zero`] requests the latest available transform.
    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        time: Timestamp,
        timeout: Duration,
    ) -> GraspResult<Isometry3<f64>>;
}
