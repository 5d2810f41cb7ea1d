// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use std::time::Duration;
use thiserror::Error;

/// Represents all kind of errors which can occur while constructing or running
/// a grasp policy.
#[derive(Error, Debug)]
pub enum GraspException {
    /// SensorUnavailable is returned when an integration step runs before the
    /// first depth sample has been delivered by the sensor feed.
    #[error("Trying to integrate, but no depth sample has been received yet!")]
    SensorUnavailable,

    /// LookupTimeout is returned when a transform between two frames could not
    /// be resolved within the given bound.
    #[error("Lookup of {target_frame:?} <- {source_frame:?} did not complete within {timeout:?}")]
    LookupTimeout {
        /// Frame the transform should express its result in.
        target_frame: String,
        /// Frame the transform maps from.
        source_frame: String,
        /// Bound that was exceeded.
        timeout: Duration,
    },

    /// NoGraspFound is returned when candidate extraction produced an empty
    /// list for the current scene.
    #[error("Grasp extraction returned no candidates!")]
    NoGraspFound,

    /// ModelException is returned if an error occurs when constructing the
    /// grasp-quality network, e.g. because its weights could not be loaded.
    #[error("{message:?}")]
    ModelException { message: String },
}

/// Result type which can have GraspException as Error
pub type GraspResult<T> = Result<T, GraspException>;
