// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the fixed-trajectory scanning policy.

use crate::exception::GraspResult;
use crate::policy::{EpisodeState, Policy, PolicyCore};
use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use std::f64::consts::PI;
use std::time::Duration;
use tracing::{debug, info};

/// Scans the scene on a timed circular trajectory, then decides.
///
/// `start()` captures the current end-effector pose `x0` and places the
/// circle's center `radius` ahead of it along the base x-axis, so `x0` lies
/// exactly on the circle. Every cycle integrates the newest depth sample and
/// commands the next point on the circle; once the scan duration has elapsed
/// the policy plans the grasp instead and finishes. The orientation captured
/// in `x0` is commanded unchanged for the entire scan.
pub struct FixedTrajectory {
    core: PolicyCore,
    duration: f64,
    radius: f64,
    time: f64,
    origin: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    state: EpisodeState,
    best_grasp: Option<Isometry3<f64>>,
}

impl FixedTrajectory {
    /// Creates a new FixedTrajectory policy around a selection core.
    /// # Arguments
    /// * `duration` - Scan duration in \[s\].
    /// * `radius` - Scan circle radius in \[m\].
    /// # Panics
    /// This function panics if `duration` or `radius` is not strictly
    /// positive and finite.
    pub fn new(core: PolicyCore, duration: f64, radius: f64) -> Self {
        assert!(duration > 0. && duration.is_finite());
        assert!(radius > 0. && radius.is_finite());
        FixedTrajectory {
            core,
            duration,
            radius,
            time: 0.,
            origin: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            state: EpisodeState::NotStarted,
            best_grasp: None,
        }
    }
    /// The selection core, e.g. to hand its mailbox to the sensor feed.
    pub fn core(&self) -> &PolicyCore {
        &self.core
    }

    /// Scan angle after `elapsed` seconds: one full revolution over the scan
    /// duration, phase shifted so the start pose lies on the circle.
    pub(crate) fn angle_at(&self, elapsed: f64) -> f64 {
        PI + elapsed / self.duration * 2. * PI
    }
}

impl Policy for FixedTrajectory {
    /// Captures the scan geometry from the live end-effector pose.
    ///
    /// A failed lookup leaves the episode unstarted so the caller can retry.
    /// # Errors
    /// * [`LookupTimeout`](`crate::exception::GraspException::LookupTimeout`)
    ///   if the end-effector pose cannot be resolved in time.
    /// # Panics
    /// This function panics if the episode already finished.
    fn start(&mut self) -> GraspResult<()> {
        assert!(
            self.state != EpisodeState::Done,
            "start() called on a finished episode"
        );
        let x0 = self.core.lookup_ee_pose()?;
        self.origin = x0.translation.vector + Vector3::new(self.radius, 0., 0.);
        self.orientation = x0.rotation;
        self.time = 0.;
        self.best_grasp = None;
        self.state = EpisodeState::Running;
        debug!(
            origin_x = self.origin[0],
            origin_y = self.origin[1],
            origin_z = self.origin[2],
            "scan started"
        );
        Ok(())
    }

    /// # Panics
    /// This function panics if called before [`start`](`Policy::start`).
    fn update(&mut self, time_step: Duration) -> GraspResult<()> {
        assert!(
            self.state != EpisodeState::NotStarted,
            "update() called before start()"
        );
        if self.state == EpisodeState::Done {
            return Ok(());
        }
        self.time += time_step.as_secs_f64();
        self.core.integrate_current_sample()?;
        if self.time >= self.duration {
            self.best_grasp = Some(self.core.select_best_grasp()?);
            self.state = EpisodeState::Done;
            info!(elapsed = self.time, "scan finished, grasp selected");
            return Ok(());
        }
        let angle = self.angle_at(self.time);
        let translation = self.origin
            + Vector3::new(self.radius * angle.cos(), self.radius * angle.sin(), 0.);
        let target = Isometry3::from_parts(translation.into(), self.orientation);
        self.core.publish_target(&target);
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.state == EpisodeState::Done
    }

    fn best_grasp(&self) -> Option<Isometry3<f64>> {
        self.best_grasp
    }
}
