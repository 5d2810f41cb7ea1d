// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the selection core shared by all policies.

use crate::command::TargetPublisher;
use crate::config::PolicyConfig;
use crate::detection::{GraspExtractor, GraspNetwork};
use crate::exception::{GraspException, GraspResult};
use crate::sensor::{CameraIntrinsics, SampleMailbox, Timestamp};
use crate::tf::TransformProvider;
use crate::tsdf::{grid_from_map_cloud, VolumetricMap};
use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Frame-aware grasp selection shared by all policies.
///
/// Owns the configuration, the current-sample slot, the volumetric map, the
/// grasp-quality network, and the selection algorithm. Policies hold a core
/// and delegate to it; they only decide when to integrate, move, and plan.
pub struct PolicyCore {
    base_frame: String,
    ee_frame: String,
    lookup_timeout: Duration,
    /// Base to task transform, resolved once at construction. The robot base
    /// is assumed stationary relative to the task frame for the whole
    /// episode.
    h_base_task: Isometry3<f64>,
    /// End-effector to grasp-tool offset from the configuration.
    h_ee_grasp: Isometry3<f64>,
    intrinsics: CameraIntrinsics,
    mailbox: Arc<SampleMailbox>,
    tf: Box<dyn TransformProvider>,
    map: Box<dyn VolumetricMap>,
    network: Box<dyn GraspNetwork>,
    extractor: Box<dyn GraspExtractor>,
    publisher: Box<dyn TargetPublisher>,
}

impl PolicyCore {
    /// Creates a new PolicyCore.
    ///
    /// Resolves and caches the base to task transform; a lookup failure here
    /// is fatal and the core is not constructed.
    /// # Arguments
    /// * `config` - Policy configuration, resolved once.
    /// * `intrinsics` - Intrinsic parameters of the rectified depth stream.
    /// * `tf` - Frame lookup service.
    /// * `map` - Volumetric scene accumulator.
    /// * `network` - Grasp-quality estimator.
    /// * `extractor` - Candidate decoder for the network output.
    /// * `publisher` - Outbound target-pose channel.
    /// # Errors
    /// * [`LookupTimeout`](`crate::exception::GraspException::LookupTimeout`)
    ///   if the base to task transform cannot be resolved in time.
    pub fn new(
        config: &PolicyConfig,
        intrinsics: CameraIntrinsics,
        tf: Box<dyn TransformProvider>,
        map: Box<dyn VolumetricMap>,
        network: Box<dyn GraspNetwork>,
        extractor: Box<dyn GraspExtractor>,
        publisher: Box<dyn TargetPublisher>,
    ) -> GraspResult<PolicyCore> {
        let h_base_task = tf.lookup(
            &config.base_frame_id,
            &config.frame_id,
            Timestamp::zero(),
            config.lookup_timeout(),
        )?;
        info!(
            base_frame = %config.base_frame_id,
            task_frame = %config.frame_id,
            "cached base transform"
        );
        Ok(PolicyCore {
            base_frame: config.base_frame_id.clone(),
            ee_frame: config.ee_frame_id.clone(),
            lookup_timeout: config.lookup_timeout(),
            h_base_task,
            h_ee_grasp: config.ee_grasp_transform(),
            intrinsics,
            mailbox: Arc::new(SampleMailbox::new()),
            tf,
            map,
            network,
            extractor,
            publisher,
        })
    }

    /// Handle to the current-sample slot for the sensor-ingestion context.
    pub fn mailbox(&self) -> Arc<SampleMailbox> {
        self.mailbox.clone()
    }

    /// The cached base to task transform.
    pub fn base_transform(&self) -> Isometry3<f64> {
        self.h_base_task
    }

    /// The intrinsic parameters captured at construction.
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Fuses the newest depth sample into the volumetric map.
    /// # Errors
    /// * [`SensorUnavailable`](`crate::exception::GraspException::SensorUnavailable`)
    ///   if no sample has ever arrived.
    pub fn integrate_current_sample(&mut self) -> GraspResult<()> {
        let sample = self
            .mailbox
            .latest()
            .ok_or(GraspException::SensorUnavailable)?;
        debug!(stamp = sample.stamp.as_secs_f64(), "integrating depth sample");
        self.map
            .integrate(&sample.image, &self.intrinsics, &sample.extrinsic);
        debug!(
            scene_points = self.map.scene_cloud().points.len(),
            "scene reconstruction updated"
        );
        Ok(())
    }

    /// Selects the best grasp for the current scene and returns the
    /// end-effector target pose in the robot base frame.
    ///
    /// The target is composed as base←task ∘ task←grasp ∘ inverse(ee←grasp);
    /// dispatching it is the caller's responsibility.
    /// # Errors
    /// * [`NoGraspFound`](`crate::exception::GraspException::NoGraspFound`)
    ///   if candidate extraction comes back empty.
    /// * [`ModelException`](`crate::exception::GraspException::ModelException`)
    ///   if the network fails on the current grid.
    pub fn select_best_grasp(&self) -> GraspResult<Isometry3<f64>> {
        let voxel_size = self.map.voxel_size();
        let grid =
            grid_from_map_cloud(&self.map.map_cloud(), voxel_size, self.map.resolution());
        let output = self.network.predict(&grid)?;
        let grasps = self.extractor.extract(&output, voxel_size);
        let best = grasps.first().ok_or(GraspException::NoGraspFound)?;
        info!(score = best.score, width = best.width, "selected grasp");
        let h_task_grasp = canonicalize_approach(best.pose);
        Ok(self.h_base_task * h_task_grasp * self.h_ee_grasp.inverse())
    }

    /// Current pose of the end-effector in the robot base frame.
    /// # Errors
    /// * [`LookupTimeout`](`crate::exception::GraspException::LookupTimeout`)
    ///   if the transform cannot be resolved in time.
    pub fn lookup_ee_pose(&self) -> GraspResult<Isometry3<f64>> {
        self.tf.lookup(
            &self.base_frame,
            &self.ee_frame,
            Timestamp::zero(),
            self.lookup_timeout,
        )
    }

    /// Dispatches one end-effector target pose, fire and forget.
    pub fn publish_target(&self, target: &Isometry3<f64>) {
        debug!(
            x = target.translation.vector[0],
            y = target.translation.vector[1],
            z = target.translation.vector[2],
            "publishing target pose"
        );
        self.publisher.publish(target);
    }
}

/// Canonicalizes a grasp orientation so the approach direction faces the
/// workspace.
///
/// If the grasp x-axis has a negative component along the task-frame x-axis,
/// the orientation is rotated by a half turn about the grasp z-axis.
/// Applying the adjustment to an already canonical pose is a no-op.
pub fn canonicalize_approach(pose: Isometry3<f64>) -> Isometry3<f64> {
    let rotation_matrix = pose.rotation.to_rotation_matrix();
    if rotation_matrix[(0, 0)] < 0. {
        let flipped =
            pose.rotation * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI);
        return Isometry3::from_parts(pose.translation, flipped);
    }
    pose
}
