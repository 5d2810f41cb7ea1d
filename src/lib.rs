// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # active-grasp-rs
//! active-grasp-rs is the decision layer of a depth-camera driven grasp
//! planning loop. It fuses a stream of depth frames into a shared volumetric
//! scene model, runs a learned grasp-quality estimator over it, selects and
//! canonicalizes one grasp candidate, and emits a single end-effector target
//! pose for the manipulator.
//!
//! ## Design
//! The library is a policy orchestration layer. One episode means: sense the
//! scene, optionally while executing a scanning motion, then produce exactly
//! one grasp decision. Everything that is robot or perception infrastructure
//! is consumed through collaborator traits and injected at construction:
//!
//! * [`TransformProvider`](`crate::tf::TransformProvider`) - blocking frame
//!   lookups with a timeout.
//! * [`VolumetricMap`](`crate::tsdf::VolumetricMap`) - depth-frame
//!   integration and the distance-cloud views read back for planning.
//! * [`GraspNetwork`](`crate::detection::GraspNetwork`) and
//!   [`GraspExtractor`](`crate::detection::GraspExtractor`) - the learned
//!   estimator and its candidate decoder.
//! * [`TargetPublisher`](`crate::command::TargetPublisher`) - the
//!   fire-and-forget channel to the trajectory controller.
//!
//! Two policies are available behind the [`Policy`](`crate::policy::Policy`)
//! interface:
//!
//! * [`SingleView`](`crate::policy::SingleView`) - look once, decide once.
//! * [`FixedTrajectory`](`crate::policy::FixedTrajectory`) - scan one full
//!   circle over a fixed duration, integrating every cycle, then decide.
//!
//! Both delegate frame composition and grasp selection to a shared
//! [`PolicyCore`](`crate::policy::PolicyCore`). The core caches the base to
//! task transform at construction, receives depth samples through a
//! single-slot [`SampleMailbox`](`crate::sensor::SampleMailbox`) written by
//! the sensor context (last write wins, no queueing), and composes the final
//! target as base←task ∘ task←grasp ∘ inverse(ee←grasp).
//!
//! # Example:
//! ```ignore
//! use active_grasp::{FixedTrajectory, Policy, PolicyConfig, PolicyCore};
//! use std::time::Duration;
//!
//! let config = PolicyConfig::default();
//! let core = PolicyCore::new(
//!     &config,
//!     intrinsics, // from the camera driver
//!     tf,         // Box<dyn TransformProvider>
//!     map,        // Box<dyn VolumetricMap>
//!     network,    // Box<dyn GraspNetwork>
//!     extractor,  // Box<dyn GraspExtractor>
//!     publisher,  // Box<dyn TargetPublisher>
//! )?;
//!
//! // the sensor feed posts samples into the mailbox from its own thread
//! let mailbox = core.mailbox();
//!
//! let mut policy = FixedTrajectory::new(core, config.scan_duration, config.scan_radius);
//! policy.start()?;
//! while !policy.is_done() {
//!     policy.update(Duration::from_millis(100))?;
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! let target = policy.best_grasp().unwrap();
//! ```
//!
//! `update` calls and sample ingestion run in different execution contexts;
//! the mailbox is the only state they share. Per-cycle failures like a
//! missing sample or an empty candidate list come back as a
//! [`GraspException`](`crate::exception::GraspException`) and leave the
//! episode state untouched, so the external loop can simply retry on its
//! next cycle.
pub mod command;
pub mod config;
pub mod detection;
pub mod exception;
pub mod policy;
pub mod sensor;
pub mod tf;
pub mod tsdf;
pub mod utils;

pub use command::TargetPublisher;
pub use config::PolicyConfig;
pub use detection::{Grasp, GraspExtractor, GraspNetwork, NetworkOutput};
pub use exception::{GraspException, GraspResult};
pub use policy::{
    create_policy, EpisodeState, FixedTrajectory, Policy, PolicyCore, PolicyKind, SingleView,
};
pub use sensor::{CameraIntrinsics, DepthImage, SampleMailbox, SensorSample, Timestamp};
pub use tf::TransformProvider;
pub use tsdf::{grid_from_map_cloud, DistanceGrid, MapCloud, PointCloud, VolumetricMap};
pub use utils::*;
