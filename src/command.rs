// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the outbound target-pose channel.

use nalgebra::Isometry3;

/// Dispatches end-effector target poses to the trajectory controller.
///
/// Dispatch is fire-and-forget: no acknowledgment is awaited and no delivery
/// guarantee exists beyond issue order.
#[cfg_attr(test, mockall::automock)]
pub trait TargetPublisher {
    /// Publishes one end-effector target pose in the robot base frame.
    fn publish(&self, target: &Isometry3<f64>);
}
