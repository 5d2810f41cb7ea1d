// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

use active_grasp::{
    isometry_to_list, CameraIntrinsics, DepthImage, DistanceGrid, FixedTrajectory, Grasp,
    GraspException, GraspExtractor, GraspNetwork, GraspResult, MapCloud, NetworkOutput, Policy,
    PolicyConfig, PolicyCore, PolicyKind, PointCloud, SensorSample, SingleView, TargetPublisher,
    Timestamp, TransformProvider, VolumetricMap,
};
use clap::Parser;
use nalgebra::{Isometry3, Point3};
use std::collections::HashMap;
use std::time::Duration;

/// An example running one grasp episode against synthetic collaborators.
///
/// A background thread plays the role of the depth-sensor feed while the main
/// thread steps the policy at a fixed cadence until it reports a decision.
#[derive(Parser, Debug)]
#[clap(author, version, name = "grasp_episode")]
struct CommandLineArguments {
    /// Policy to run: "single-view" or "fixed-trajectory"
    #[clap(long, default_value = "fixed-trajectory")]
    pub policy: String,

    /// Scan duration of the fixed-trajectory policy in seconds
    #[clap(long, default_value_t = 4.0)]
    pub scan_duration: f64,

    /// Scan radius of the fixed-trajectory policy in meters
    #[clap(long, default_value_t = 0.1)]
    pub scan_radius: f64,
}

/// Frame lookup over a fixed table of transforms.
struct StaticFrames {
    transforms: HashMap<(String, String), Isometry3<f64>>,
}

impl StaticFrames {
    fn new(config: &PolicyConfig) -> Self {
        let mut transforms = HashMap::new();
        transforms.insert(
            (config.base_frame_id.clone(), config.frame_id.clone()),
            Isometry3::translation(0.4, 0., 0.),
        );
        transforms.insert(
            (config.base_frame_id.clone(), config.ee_frame_id.clone()),
            Isometry3::translation(0.55, 0.15, 0.5),
        );
        StaticFrames { transforms }
    }
}

impl TransformProvider for StaticFrames {
    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        _time: Timestamp,
        timeout: Duration,
    ) -> GraspResult<Isometry3<f64>> {
        self.transforms
            .get(&(target_frame.to_string(), source_frame.to_string()))
            .copied()
            .ok_or(GraspException::LookupTimeout {
                target_frame: target_frame.to_string(),
                source_frame: source_frame.to_string(),
                timeout,
            })
    }
}

/// Volume standing in for a depth-fusion backend: it counts integrations and
/// exposes a fixed blob of occupied voxels in the middle of the workspace.
struct SyntheticVolume {
    voxel_size: f64,
    resolution: usize,
    integrated_frames: usize,
}

impl SyntheticVolume {
    fn new(config: &PolicyConfig) -> Self {
        SyntheticVolume {
            voxel_size: config.map_size / config.map_resolution as f64,
            resolution: config.map_resolution,
            integrated_frames: 0,
        }
    }
}

impl VolumetricMap for SyntheticVolume {
    fn integrate(
        &mut self,
        _image: &DepthImage,
        _intrinsics: &CameraIntrinsics,
        _extrinsic: &Isometry3<f64>,
    ) {
        self.integrated_frames += 1;
        tracing::info!(frames = self.integrated_frames, "integrated depth frame");
    }

    fn scene_cloud(&self) -> PointCloud {
        PointCloud {
            points: self.map_cloud().points,
        }
    }

    fn map_cloud(&self) -> MapCloud {
        // a 3x3x3 blob of surface voxels around the workspace center
        let center = self.resolution / 2;
        let mut points = Vec::new();
        let mut distances = Vec::new();
        for i in center - 1..=center + 1 {
            for j in center - 1..=center + 1 {
                for k in center - 1..=center + 1 {
                    points.push(Point3::new(
                        (i as f64 + 0.5) * self.voxel_size,
                        (j as f64 + 0.5) * self.voxel_size,
                        (k as f64 + 0.5) * self.voxel_size,
                    ));
                    distances.push(if i == center && j == center && k == center {
                        -0.5
                    } else {
                        0.5
                    });
                }
            }
        }
        MapCloud::new(points, distances)
    }

    fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    fn resolution(&self) -> usize {
        self.resolution
    }
}

/// Estimator standing in for the learned network: it rates voxels inside the
/// reconstructed surface as graspable.
struct SyntheticNetwork;

impl GraspNetwork for SyntheticNetwork {
    fn predict(&self, grid: &DistanceGrid) -> GraspResult<NetworkOutput> {
        let resolution = grid.resolution();
        let qualities = grid
            .as_slice()
            .iter()
            .map(|&distance| if distance < 0. { 0.9 } else { 0. })
            .collect();
        let voxels = resolution * resolution * resolution;
        Ok(NetworkOutput::new(
            resolution,
            qualities,
            vec![[0., 0., 0., 1.]; voxels],
            vec![0.04; voxels],
        ))
    }
}

/// Decoder that turns every voxel above a quality threshold into a grasp
/// candidate, best first.
struct ThresholdExtractor {
    threshold: f32,
}

impl GraspExtractor for ThresholdExtractor {
    fn extract(&self, output: &NetworkOutput, voxel_size: f64) -> Vec<Grasp> {
        let resolution = output.resolution();
        let mut grasps = Vec::new();
        for (index, &quality) in output.qualities().iter().enumerate() {
            if quality < self.threshold {
                continue;
            }
            let k = index % resolution;
            let j = index / resolution % resolution;
            let i = index / (resolution * resolution);
            grasps.push(Grasp {
                pose: Isometry3::translation(
                    (i as f64 + 0.5) * voxel_size,
                    (j as f64 + 0.5) * voxel_size,
                    (k as f64 + 0.5) * voxel_size,
                ),
                score: quality as f64,
                width: output.widths()[index] as f64,
            });
        }
        grasps.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        grasps
    }
}

struct LoggingPublisher;

impl TargetPublisher for LoggingPublisher {
    fn publish(&self, target: &Isometry3<f64>) {
        tracing::info!(pose = ?isometry_to_list(target), "commanded scan pose");
    }
}

fn run_episode(policy: &mut dyn Policy, time_step: Duration) -> GraspResult<Isometry3<f64>> {
    policy.start()?;
    while !policy.is_done() {
        match policy.update(time_step) {
            Ok(()) => {}
            // the feed may not have delivered its first frame yet
            Err(GraspException::SensorUnavailable) => {
                tracing::warn!("no depth sample yet, retrying next cycle")
            }
            Err(e) => return Err(e),
        }
        std::thread::sleep(time_step);
    }
    Ok(policy.best_grasp().unwrap())
}

fn main() -> GraspResult<()> {
    tracing_subscriber::fmt::init();
    let arguments = CommandLineArguments::parse();
    let kind = PolicyKind::from_name(&arguments.policy)
        .unwrap_or_else(|| panic!("{} policy does not exist", arguments.policy));

    let config = PolicyConfig {
        scan_duration: arguments.scan_duration,
        scan_radius: arguments.scan_radius,
        ..PolicyConfig::default()
    };
    let intrinsics = CameraIntrinsics::new(540., 540., 320., 240., 640, 480);
    let core = PolicyCore::new(
        &config,
        intrinsics,
        Box::new(StaticFrames::new(&config)),
        Box::new(SyntheticVolume::new(&config)),
        Box::new(SyntheticNetwork),
        Box::new(ThresholdExtractor { threshold: 0.5 }),
        Box::new(LoggingPublisher),
    )?;

    let mailbox = core.mailbox();
    std::thread::spawn(move || {
        let mut stamp = 0u64;
        loop {
            mailbox.post(SensorSample {
                image: DepthImage::new(640, 480, vec![0.5; 640 * 480]),
                extrinsic: Isometry3::translation(0.15, 0.15, 0.5),
                stamp: Timestamp::from_nanos(stamp),
            });
            stamp += 50_000_000;
            std::thread::sleep(Duration::from_millis(50));
        }
    });

    let time_step = Duration::from_millis(100);
    let target = match kind {
        PolicyKind::SingleView => run_episode(&mut SingleView::new(core), time_step)?,
        PolicyKind::FixedTrajectory => run_episode(
            &mut FixedTrajectory::new(core, config.scan_duration, config.scan_radius),
            time_step,
        )?,
    };
    println!("grasp target (base frame): {:?}", isometry_to_list(&target));
    Ok(())
}
