// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the volumetric map interface and the dense distance grid fed to
//! the grasp-quality network.

use crate::sensor::{CameraIntrinsics, DepthImage};
use nalgebra::{Isometry3, Point3};

/// Points of the currently reconstructed scene surface, in the task frame.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    /// Point positions in \[m\].
    pub points: Vec<Point3<f64>>,
}

/// Voxel-center positions of the map together with their distance values.
#[derive(Debug, Clone, Default)]
pub struct MapCloud {
    /// Voxel-center positions in the task frame in \[m\].
    pub points: Vec<Point3<f64>>,
    /// Truncated signed distance value of each voxel.
    pub distances: Vec<f32>,
}

impl MapCloud {
    /// Creates a new MapCloud.
    /// # Panics
    /// This function panics if the number of points and distance values differ.
    pub fn new(points: Vec<Point3<f64>>, distances: Vec<f32>) -> Self {
        assert_eq!(points.len(), distances.len());
        MapCloud { points, distances }
    }
    /// Number of voxels in the cloud.
    pub fn len(&self) -> usize {
        self.points.len()
    }
    /// Checks whether the cloud holds no voxels.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Dense cubic grid of distance values sampled at a fixed voxel size.
///
/// This is the input layout the grasp-quality network consumes. Cells that
/// are not covered by the map cloud stay at zero.
#[derive(Debug, Clone)]
pub struct DistanceGrid {
    resolution: usize,
    voxel_size: f64,
    data: Vec<f32>,
}

impl DistanceGrid {
    /// Creates a zero-filled grid.
    /// # Arguments
    /// * `resolution` - Number of voxels along each axis.
    /// * `voxel_size` - Edge length of a voxel in \[m\].
    /// # Panics
    /// This function panics if `resolution` is zero or `voxel_size` is not
    /// strictly positive and finite.
    pub fn new(resolution: usize, voxel_size: f64) -> Self {
        assert!(resolution > 0);
        assert!(voxel_size.is_sign_positive() && voxel_size.is_finite());
        DistanceGrid {
            resolution,
            voxel_size,
            data: vec![0.; resolution * resolution * resolution],
        }
    }
    /// Number of voxels along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }
    /// Edge length of a voxel in \[m\].
    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }
    /// Distance value at grid index `(i, j, k)`.
    pub fn at(&self, i: usize, j: usize, k: usize) -> f32 {
        self.data[self.linear_index(i, j, k)]
    }
    /// Sets the distance value at grid index `(i, j, k)`.
    pub fn set(&mut self, i: usize, j: usize, k: usize, distance: f32) {
        let index = self.linear_index(i, j, k);
        self.data[index] = distance;
    }
    /// Flat row-major view of the grid values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        assert!(i < self.resolution && j < self.resolution && k < self.resolution);
        (i * self.resolution + j) * self.resolution + k
    }
}

/// Accumulates depth frames into a 3-D distance representation of the scene.
///
/// Implemented by the volumetric integration collaborator; the policy layer
/// only drives integration and reads the two cloud views back.
#[cfg_attr(test, mockall::automock)]
pub trait VolumetricMap {
    /// Fuses one depth frame captured at `extrinsic` into the map.
    fn integrate(
        &mut self,
        image: &DepthImage,
        intrinsics: &CameraIntrinsics,
        extrinsic: &Isometry3<f64>,
    );
    /// Returns the reconstructed scene surface.
    fn scene_cloud(&self) -> PointCloud;
    /// Returns all mapped voxel centers with their distance values.
    fn map_cloud(&self) -> MapCloud;
    /// Edge length of a map voxel in \[m\].
    fn voxel_size(&self) -> f64;
    /// Number of voxels along each axis of the mapped volume.
    fn resolution(&self) -> usize;
}

/// Builds the dense network input grid from a map cloud.
///
/// Voxel-center positions are binned at `voxel_size`; positions outside the
/// `resolution^3` volume are discarded.
pub fn grid_from_map_cloud(cloud: &MapCloud, voxel_size: f64, resolution: usize) -> DistanceGrid {
    let mut grid = DistanceGrid::new(resolution, voxel_size);
    for (point, &distance) in cloud.points.iter().zip(cloud.distances.iter()) {
        let i = (point.x / voxel_size).floor() as isize;
        let j = (point.y / voxel_size).floor() as isize;
        let k = (point.z / voxel_size).floor() as isize;
        let inside = |v: isize| v >= 0 && (v as usize) < resolution;
        if inside(i) && inside(j) && inside(k) {
            grid.set(i as usize, j as usize, k as usize, distance);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use crate::tsdf::{grid_from_map_cloud, DistanceGrid, MapCloud};
    use nalgebra::Point3;

    #[test]
    fn grid_indexing() {
        let mut grid = DistanceGrid::new(4, 0.0075);
        grid.set(1, 2, 3, 0.5);
        assert_eq!(grid.at(1, 2, 3), 0.5);
        assert_eq!(grid.at(3, 2, 1), 0.);
        assert_eq!(grid.as_slice().len(), 64);
    }

    #[test]
    fn map_cloud_bins_voxel_centers() {
        // voxel centers of cells (0,0,0) and (2,1,0) at voxel size 0.1
        let cloud = MapCloud::new(
            vec![Point3::new(0.05, 0.05, 0.05), Point3::new(0.25, 0.15, 0.05)],
            vec![-0.3, 0.7],
        );
        let grid = grid_from_map_cloud(&cloud, 0.1, 4);
        assert_eq!(grid.at(0, 0, 0), -0.3);
        assert_eq!(grid.at(2, 1, 0), 0.7);
    }

    #[test]
    fn out_of_volume_points_are_discarded() {
        let cloud = MapCloud::new(
            vec![
                Point3::new(-0.05, 0.05, 0.05),
                Point3::new(0.45, 0.05, 0.05),
                Point3::new(0.05, 0.05, 0.05),
            ],
            vec![1., 1., 0.5],
        );
        let grid = grid_from_map_cloud(&cloud, 0.1, 4);
        assert_eq!(grid.at(0, 0, 0), 0.5);
        assert!(grid.as_slice().iter().filter(|&&d| d != 0.).count() == 1);
    }

    #[test]
    fn uncovered_cells_stay_zero() {
        let grid = grid_from_map_cloud(&MapCloud::default(), 0.0075, 40);
        assert!(grid.as_slice().iter().all(|&d| d == 0.));
        assert_eq!(grid.resolution(), 40);
    }

    #[test]
    #[should_panic]
    fn mismatched_cloud_lengths_panic() {
        MapCloud::new(vec![Point3::new(0., 0., 0.)], vec![]);
    }
}
