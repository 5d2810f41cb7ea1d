// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the grasp candidate type and the grasp-quality network interface.

use crate::exception::GraspResult;
use crate::tsdf::DistanceGrid;
use nalgebra::Isometry3;

/// One grasp candidate proposed for the current scene.
#[derive(Debug, Clone)]
pub struct Grasp {
    /// Grasp pose, task frame to grasp frame.
    pub pose: Isometry3<f64>,
    /// Predicted quality in \[0, 1\].
    pub score: f64,
    /// Required gripper opening width in \[m\].
    pub width: f64,
}

/// Raw per-voxel output volumes of the grasp-quality network.
///
/// The policy layer treats this as opaque; only the extractor knows how to
/// decode it into grasp candidates.
#[derive(Debug, Clone)]
pub struct NetworkOutput {
    resolution: usize,
    qualities: Vec<f32>,
    rotations: Vec<[f64; 4]>,
    widths: Vec<f32>,
}

impl NetworkOutput {
    /// Creates a new NetworkOutput.
    /// # Arguments
    /// * `resolution` - Number of voxels along each axis of the input grid.
    /// * `qualities` - Per-voxel grasp quality.
    /// * `rotations` - Per-voxel grasp orientation as `[qx qy qz qw]`.
    /// * `widths` - Per-voxel gripper opening width in \[m\].
    /// # Panics
    /// This function panics if a channel length does not match
    /// `resolution^3`.
    pub fn new(
        resolution: usize,
        qualities: Vec<f32>,
        rotations: Vec<[f64; 4]>,
        widths: Vec<f32>,
    ) -> Self {
        let voxels = resolution * resolution * resolution;
        assert_eq!(qualities.len(), voxels);
        assert_eq!(rotations.len(), voxels);
        assert_eq!(widths.len(), voxels);
        NetworkOutput {
            resolution,
            qualities,
            rotations,
            widths,
        }
    }
    /// Number of voxels along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }
    /// Per-voxel grasp quality channel.
    pub fn qualities(&self) -> &[f32] {
        &self.qualities
    }
    /// Per-voxel grasp orientation channel, `[qx qy qz qw]`.
    pub fn rotations(&self) -> &[[f64; 4]] {
        &self.rotations
    }
    /// Per-voxel gripper width channel in \[m\].
    pub fn widths(&self) -> &[f32] {
        &self.widths
    }
}

/// A learned grasp-quality estimator over dense distance grids.
///
/// Constructing a concrete network from its weights can fail with
/// [`ModelException`](`crate::exception::GraspException::ModelException`);
/// such failures are fatal at policy startup.
#[cfg_attr(test, mockall::automock)]
pub trait GraspNetwork {
    /// Runs the network on one input grid.
    fn predict(&self, grid: &DistanceGrid) -> GraspResult<NetworkOutput>;
}

/// Decodes raw network output into grasp candidates, best first.
#[cfg_attr(test, mockall::automock)]
pub trait GraspExtractor {
    /// Returns the candidate list for `output`, ordered best first. An empty
    /// list means no usable grasp exists in the current scene.
    fn extract(&self, output: &NetworkOutput, voxel_size: f64) -> Vec<Grasp>;
}
