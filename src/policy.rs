// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the grasp policies and the shared selection core.

use crate::command::TargetPublisher;
use crate::config::PolicyConfig;
use crate::detection::{GraspExtractor, GraspNetwork};
use crate::exception::GraspResult;
use crate::sensor::CameraIntrinsics;
use crate::tf::TransformProvider;
use crate::tsdf::VolumetricMap;
use nalgebra::Isometry3;
use std::fmt;
use std::time::Duration;

mod core;
pub mod fixed_trajectory;
pub mod single_view;

pub use self::core::PolicyCore;
pub use self::fixed_trajectory::FixedTrajectory;
pub use self::single_view::SingleView;

/// Lifecycle of one grasp episode. The state only ever moves forward.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EpisodeState {
    /// `start()` has not been called yet.
    NotStarted,
    /// The episode is collecting views and may issue motion commands.
    Running,
    /// A grasp decision has been made; no further work happens.
    Done,
}

/// A grasp policy drives one manipulation episode to a single grasp decision.
///
/// The external loop calls [`start`](`Policy::start`) once, then
/// [`update`](`Policy::update`) at a fixed cadence until
/// [`is_done`](`Policy::is_done`) reports completion, and finally reads the
/// decision from [`best_grasp`](`Policy::best_grasp`).
pub trait Policy {
    /// Begins the episode. May resolve transforms and can therefore fail
    /// with [`LookupTimeout`](`crate::exception::GraspException::LookupTimeout`);
    /// a failed start leaves the episode unstarted and can be retried.
    fn start(&mut self) -> GraspResult<()>;
    /// Runs one decision cycle. `time_step` is the time elapsed since the
    /// previous `update` call (zero on the first call).
    ///
    /// A failing cycle leaves the episode state untouched; the caller decides
    /// whether to retry on the next cycle.
    fn update(&mut self, time_step: Duration) -> GraspResult<()>;
    /// Checks whether the episode has produced its grasp decision.
    fn is_done(&self) -> bool;
    /// The end-effector target pose in the robot base frame, once the episode
    /// is done.
    fn best_grasp(&self) -> Option<Isometry3<f64>>;
}

/// Enumerates the available policy implementations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PolicyKind {
    /// Look once, decide once.
    SingleView,
    /// Scan on a timed circular trajectory, then decide.
    FixedTrajectory,
}

impl PolicyKind {
    /// Resolves a policy name from a parameter file.
    pub fn from_name(name: &str) -> Option<PolicyKind> {
        match name {
            "single-view" => Some(PolicyKind::SingleView),
            "fixed-trajectory" => Some(PolicyKind::FixedTrajectory),
            _ => None,
        }
    }
    /// The parameter-file name of this policy.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::SingleView => "single-view",
            PolicyKind::FixedTrajectory => "fixed-trajectory",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Constructs the requested policy around a freshly built [`PolicyCore`].
///
/// # Errors
/// * [`LookupTimeout`](`crate::exception::GraspException::LookupTimeout`) if
///   the base to task transform cannot be resolved at construction.
pub fn create_policy(
    kind: PolicyKind,
    config: &PolicyConfig,
    intrinsics: CameraIntrinsics,
    tf: Box<dyn TransformProvider>,
    map: Box<dyn VolumetricMap>,
    network: Box<dyn GraspNetwork>,
    extractor: Box<dyn GraspExtractor>,
    publisher: Box<dyn TargetPublisher>,
) -> GraspResult<Box<dyn Policy>> {
    let core = PolicyCore::new(config, intrinsics, tf, map, network, extractor, publisher)?;
    Ok(match kind {
        PolicyKind::SingleView => Box::new(SingleView::new(core)),
        PolicyKind::FixedTrajectory => Box::new(FixedTrajectory::new(
            core,
            config.scan_duration,
            config.scan_radius,
        )),
    })
}
