// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the single-view baseline policy.

use crate::exception::GraspResult;
use crate::policy::{EpisodeState, Policy, PolicyCore};
use nalgebra::Isometry3;
use std::time::Duration;
use tracing::info;

/// Look once, decide once.
///
/// The first `update` integrates the current depth sample, plans the grasp,
/// and finishes the episode. No motion command is ever issued, which makes
/// this the passive baseline against the scanning policies.
pub struct SingleView {
    core: PolicyCore,
    state: EpisodeState,
    best_grasp: Option<Isometry3<f64>>,
}

impl SingleView {
    /// Creates a new SingleView policy around a selection core.
    pub fn new(core: PolicyCore) -> Self {
        SingleView {
            core,
            state: EpisodeState::NotStarted,
            best_grasp: None,
        }
    }
    /// The selection core, e.g. to hand its mailbox to the sensor feed.
    pub fn core(&self) -> &PolicyCore {
        &self.core
    }
}

impl Policy for SingleView {
    /// # Panics
    /// This function panics if the episode already finished.
    fn start(&mut self) -> GraspResult<()> {
        assert!(
            self.state != EpisodeState::Done,
            "start() called on a finished episode"
        );
        self.best_grasp = None;
        self.state = EpisodeState::Running;
        Ok(())
    }

    /// # Panics
    /// This function panics if called before [`start`](`Policy::start`).
    fn update(&mut self, _time_step: Duration) -> GraspResult<()> {
        assert!(
            self.state != EpisodeState::NotStarted,
            "update() called before start()"
        );
        if self.state == EpisodeState::Done {
            return Ok(());
        }
        self.core.integrate_current_sample()?;
        self.best_grasp = Some(self.core.select_best_grasp()?);
        self.state = EpisodeState::Done;
        info!("single-view episode finished");
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.state == EpisodeState::Done
    }

    fn best_grasp(&self) -> Option<Isometry3<f64>> {
        self.best_grasp
    }
}

#[cfg(test)]
mod tests {
    use crate::command::MockTargetPublisher;
    use crate::config::PolicyConfig;
    use crate::detection::{Grasp, MockGraspExtractor, MockGraspNetwork, NetworkOutput};
    use crate::exception::GraspException;
    use crate::policy::single_view::SingleView;
    use crate::policy::{Policy, PolicyCore};
    use crate::sensor::{CameraIntrinsics, DepthImage, SensorSample, Timestamp};
    use crate::tf::MockTransformProvider;
    use crate::tsdf::{MapCloud, MockVolumetricMap, PointCloud};
    use nalgebra::{Isometry3, UnitQuaternion, Vector3};
    use std::f64::consts::PI;
    use std::time::Duration;

    fn provider_returning(pose: Isometry3<f64>) -> Box<MockTransformProvider> {
        let mut tf = MockTransformProvider::new();
        tf.expect_lookup().returning(move |_, _, _, _| Ok(pose));
        Box::new(tf)
    }

    fn map_expecting_integrations(count: usize) -> Box<MockVolumetricMap> {
        let mut map = MockVolumetricMap::new();
        map.expect_integrate().times(count).returning(|_, _, _| ());
        map.expect_scene_cloud().returning(PointCloud::default);
        map.expect_voxel_size().return_const(0.0075);
        map.expect_resolution().return_const(40usize);
        map.expect_map_cloud().returning(MapCloud::default);
        Box::new(map)
    }

    fn network_expecting_predictions(count: usize) -> Box<MockGraspNetwork> {
        let mut network = MockGraspNetwork::new();
        network.expect_predict().times(count).returning(|_| {
            Ok(NetworkOutput::new(
                1,
                vec![0.9],
                vec![[0., 0., 0., 1.]],
                vec![0.05],
            ))
        });
        Box::new(network)
    }

    fn extractor_returning(grasps: Vec<Grasp>) -> Box<MockGraspExtractor> {
        let mut extractor = MockGraspExtractor::new();
        extractor
            .expect_extract()
            .returning(move |_, _| grasps.clone());
        Box::new(extractor)
    }

    fn silent_publisher() -> Box<MockTargetPublisher> {
        let mut publisher = MockTargetPublisher::new();
        publisher.expect_publish().times(0);
        Box::new(publisher)
    }

    fn one_candidate() -> Vec<Grasp> {
        vec![Grasp {
            pose: Isometry3::translation(0.15, 0.15, 0.05),
            score: 0.9,
            width: 0.04,
        }]
    }

    fn post_sample(policy: &SingleView) {
        policy.core().mailbox().post(SensorSample {
            image: DepthImage::new(2, 2, vec![0.6; 4]),
            extrinsic: Isometry3::identity(),
            stamp: Timestamp::from_secs_f64(1.0),
        });
    }

    fn policy_with(
        map: Box<MockVolumetricMap>,
        network: Box<MockGraspNetwork>,
        grasps: Vec<Grasp>,
    ) -> SingleView {
        let core = PolicyCore::new(
            &PolicyConfig::default(),
            CameraIntrinsics::new(540., 540., 320., 240., 640, 480),
            provider_returning(Isometry3::identity()),
            map,
            network,
            extractor_returning(grasps),
            silent_publisher(),
        )
        .unwrap();
        SingleView::new(core)
    }

    #[test]
    fn one_update_finishes_the_episode() {
        let mut policy = policy_with(
            map_expecting_integrations(1),
            network_expecting_predictions(1),
            one_candidate(),
        );
        assert!(!policy.is_done());
        policy.start().unwrap();
        post_sample(&policy);
        policy.update(Duration::from_secs(0)).unwrap();
        assert!(policy.is_done());
        let target = policy.best_grasp().unwrap();
        assert!((target.translation.vector - Vector3::new(0.15, 0.15, 0.05)).norm() < 1e-12);
    }

    #[test]
    fn update_after_done_is_inert() {
        let mut policy = policy_with(
            map_expecting_integrations(1),
            network_expecting_predictions(1),
            one_candidate(),
        );
        policy.start().unwrap();
        post_sample(&policy);
        policy.update(Duration::from_secs(0)).unwrap();
        // the loop overshooting by a cycle must not integrate or plan again
        policy.update(Duration::from_millis(100)).unwrap();
        policy.update(Duration::from_millis(100)).unwrap();
        assert!(policy.is_done());
    }

    #[test]
    #[should_panic(expected = "update() called before start()")]
    fn update_before_start_panics() {
        let mut policy = policy_with(
            map_expecting_integrations(0),
            network_expecting_predictions(0),
            vec![],
        );
        let _ = policy.update(Duration::from_secs(0));
    }

    #[test]
    #[should_panic(expected = "start() called on a finished episode")]
    fn restart_after_done_panics() {
        let mut policy = policy_with(
            map_expecting_integrations(1),
            network_expecting_predictions(1),
            one_candidate(),
        );
        policy.start().unwrap();
        post_sample(&policy);
        policy.update(Duration::from_secs(0)).unwrap();
        let _ = policy.start();
    }

    #[test]
    fn missing_sample_fails_the_cycle_and_allows_retry() {
        let mut policy = policy_with(
            map_expecting_integrations(1),
            network_expecting_predictions(1),
            one_candidate(),
        );
        policy.start().unwrap();
        match policy.update(Duration::from_secs(0)) {
            Err(GraspException::SensorUnavailable) => {}
            _ => panic!("expected SensorUnavailable"),
        }
        // the failed cycle must not have finished the episode
        assert!(!policy.is_done());
        assert!(policy.best_grasp().is_none());
        post_sample(&policy);
        policy.update(Duration::from_secs(0)).unwrap();
        assert!(policy.is_done());
    }

    #[test]
    fn empty_extraction_keeps_episode_running() {
        let mut policy = policy_with(
            map_expecting_integrations(2),
            network_expecting_predictions(2),
            vec![],
        );
        policy.start().unwrap();
        post_sample(&policy);
        match policy.update(Duration::from_secs(0)) {
            Err(GraspException::NoGraspFound) => {}
            _ => panic!("expected NoGraspFound"),
        }
        assert!(!policy.is_done());
        // the caller may retry the cycle
        let _ = policy.update(Duration::from_secs(0));
    }

    #[test]
    fn selected_pose_is_canonicalized() {
        let mut policy = policy_with(
            map_expecting_integrations(1),
            network_expecting_predictions(1),
            vec![
                Grasp {
                    pose: Isometry3::from_parts(
                        Vector3::new(0.1, 0.1, 0.1).into(),
                        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI),
                    ),
                    score: 0.9,
                    width: 0.04,
                },
                Grasp {
                    pose: Isometry3::identity(),
                    score: 0.7,
                    width: 0.04,
                },
            ],
        );
        policy.start().unwrap();
        post_sample(&policy);
        policy.update(Duration::from_secs(0)).unwrap();
        let target = policy.best_grasp().unwrap();
        // the best-scored candidate wins, with its approach flipped forward
        assert!((target.translation.vector - Vector3::new(0.1, 0.1, 0.1)).norm() < 1e-12);
        assert!(target.rotation.to_rotation_matrix()[(0, 0)] > 0.);
    }
}
