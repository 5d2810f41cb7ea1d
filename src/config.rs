// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the policy configuration surface.
//!
//! Loading these values from a parameter file is the caller's job; the crate
//! only defines the typed layout and the names derived from it.

use crate::utils::list_to_isometry;
use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration of a grasp policy, resolved once at construction.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PolicyConfig {
    /// Name of the task frame in which the scene and grasp candidates live.
    pub frame_id: String,
    /// Name of the robot base frame.
    pub base_frame_id: String,
    /// Name of the end-effector frame.
    pub ee_frame_id: String,
    /// Camera name; the sensor-optical frame and topic names derive from it.
    pub camera_name: String,
    /// End-effector to grasp-tool offset as `[x y z qx qy qz qw]`.
    pub ee_grasp_offset: [f64; 7],
    /// Location of the grasp-quality network weights.
    pub model_path: PathBuf,
    /// Physical edge length of the mapped volume in \[m\].
    pub map_size: f64,
    /// Number of voxels along each axis of the mapped volume.
    pub map_resolution: usize,
    /// Scan duration of the fixed-trajectory policy in \[s\].
    #[serde(default = "default_scan_duration")]
    pub scan_duration: f64,
    /// Scan circle radius of the fixed-trajectory policy in \[m\].
    #[serde(default = "default_scan_radius")]
    pub scan_radius: f64,
    /// Bound on blocking frame lookups in \[s\].
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout: f64,
}

fn default_scan_duration() -> f64 {
    4.0
}

fn default_scan_radius() -> f64 {
    0.1
}

fn default_lookup_timeout() -> f64 {
    0.1
}

impl PolicyConfig {
    /// Name of the sensor-optical frame of the configured camera.
    pub fn cam_frame_id(&self) -> String {
        format!("{}_optical_frame", self.camera_name)
    }
    /// Topic on which the configured camera publishes depth frames.
    pub fn depth_topic(&self) -> String {
        format!("{}/depth/image_raw", self.camera_name)
    }
    /// Topic on which the configured camera publishes its intrinsics.
    pub fn camera_info_topic(&self) -> String {
        format!("{}/depth/camera_info", self.camera_name)
    }
    /// End-effector to grasp-tool offset as an Isometry.
    pub fn ee_grasp_transform(&self) -> Isometry3<f64> {
        list_to_isometry(&self.ee_grasp_offset)
    }
    /// Bound on blocking frame lookups.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.lookup_timeout)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            frame_id: "task".to_string(),
            base_frame_id: "panda_link0".to_string(),
            ee_frame_id: "panda_hand".to_string(),
            camera_name: "camera".to_string(),
            ee_grasp_offset: [0., 0., 0., 0., 0., 0., 1.],
            model_path: PathBuf::from("data/models/vgn_conv.pth"),
            map_size: 0.3,
            map_resolution: 40,
            scan_duration: default_scan_duration(),
            scan_radius: default_scan_radius(),
            lookup_timeout: default_lookup_timeout(),
        }
    }
}
