// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
use nalgebra::{Isometry3, Quaternion, UnitQuaternion, Vector3};

/// converts a 7-element pose list `[x y z qx qy qz qw]` to an Isometry
///
/// This is the layout in which 6-DoF offsets like the end-effector to
/// grasp-tool transform appear in parameter files.
pub fn list_to_isometry(list: &[f64; 7]) -> Isometry3<f64> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        list[6], list[3], list[4], list[5],
    ));
    Isometry3::from_parts(
        Vector3::new(list[0], list[1], list[2]).into(),
        rotation,
    )
}

/// converts an Isometry to a 7-element pose list `[x y z qx qy qz qw]`
pub fn isometry_to_list(pose: &Isometry3<f64>) -> [f64; 7] {
    let translation = pose.translation.vector;
    let quaternion = pose.rotation.coords;
    [
        translation[0],
        translation[1],
        translation[2],
        quaternion[0],
        quaternion[1],
        quaternion[2],
        quaternion[3],
    ]
}

#[cfg(test)]
mod test {
    use crate::utils::{isometry_to_list, list_to_isometry};
    use nalgebra::{Isometry3, UnitQuaternion, Vector3};
    use std::f64::consts::FRAC_PI_2;

    fn slice_compare(a: &[f64], b: &[f64], thresh: f64) {
        for i in 0..a.len() {
            assert!((a[i] - b[i]).abs() < thresh);
        }
    }

    #[test]
    fn list_round_trip() {
        let list = [0.1, -0.2, 0.3, 0.0, 0.0, 0.7071067811865476, 0.7071067811865476];
        let pose = list_to_isometry(&list);
        slice_compare(&isometry_to_list(&pose), &list, 1e-12);
    }

    #[test]
    fn list_to_isometry_normalizes() {
        // a deliberately unnormalized quaternion must come back unit length
        let list = [0., 0., 0., 0., 0., 2., 2.];
        let pose = list_to_isometry(&list);
        assert!((pose.rotation.norm() - 1.).abs() < 1e-12);
    }

    #[test]
    fn identity_list() {
        let pose = list_to_isometry(&[0., 0., 0., 0., 0., 0., 1.]);
        assert_eq!(pose, Isometry3::identity());
    }

    #[test]
    fn rotation_maps_axes() {
        // qz = sin(pi/4), qw = cos(pi/4) is a quarter turn about z
        let pose = list_to_isometry(&[
            0.,
            0.,
            0.,
            0.,
            0.,
            0.7071067811865476,
            0.7071067811865476,
        ]);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert!(pose.rotation.angle_to(&expected) < 1e-6);
    }
}
