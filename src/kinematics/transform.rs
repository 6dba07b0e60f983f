//! Homogeneous transform builders used by the hand rig.

use nalgebra::{Matrix4, Rotation3, Vector3};

#[inline]
pub fn rot_x(angle: f64) -> Matrix4<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angle).to_homogeneous()
}

#[inline]
pub fn rot_y(angle: f64) -> Matrix4<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), angle).to_homogeneous()
}

#[inline]
pub fn rot_z(angle: f64) -> Matrix4<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), angle).to_homogeneous()
}

/// Heading-attitude-bank Euler rotation: `Ry(heading) * Rz(attitude) * Rx(bank)`
#[inline]
pub fn euler(heading: f64, attitude: f64, bank: f64) -> Matrix4<f64> {
    rot_y(heading) * rot_z(attitude) * rot_x(bank)
}

/// Stretch along the bone axis (local `y`)
#[inline]
pub fn stretch_y(factor: f64) -> Matrix4<f64> {
    Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, factor, 1.0))
}

#[inline]
pub fn translate_y(offset: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(0.0, offset, 0.0))
}

/// Length of the translation part of a homogeneous transform
#[inline]
pub fn translation_norm(transform: &Matrix4<f64>) -> f64 {
    transform.fixed_view::<3, 1>(0, 3).norm()
}
