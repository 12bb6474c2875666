//! Camera utilities for 3D visualization

use meshprep_core::{Drawable, Point3d, Vector3d};
use nalgebra::{Matrix4, Perspective3, Rotation3, Unit};

/// Pitch is stopped this close to the up axis so the view basis stays valid.
const MAX_PITCH_COS: f64 = 0.995;

/// A perspective camera looking at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3d,
    pub target: Point3d,
    pub up: Vector3d,
    pub fov: f64,
    pub aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
    /// Radius of the sphere being looked at, used to place the clip planes
    pub focus_radius: f64,
}

impl Camera {
    /// Camera looking down -Z at the bounding sphere of `object`.
    ///
    /// With `zoom == 1.0` the sphere just fits the narrower side of the
    /// viewport; smaller values move the camera closer.
    pub fn framing<D: Drawable + ?Sized>(object: &D, aspect_ratio: f64, zoom: f64) -> Self {
        let target = object.center();
        let radius = match object.bounding_radius() {
            r if r.is_finite() && r > 0.0 => r,
            _ => 1.0,
        };

        let mut camera = Self {
            position: target,
            target,
            up: Vector3d::y(),
            fov: std::f64::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.1,
            far: 100.0,
            focus_radius: radius,
        };

        let half_fov = camera.narrow_half_fov();
        let distance = radius / half_fov.sin() * zoom.max(f64::EPSILON);
        camera.position = target + Vector3d::z() * distance;
        camera.update_clip_planes();
        camera
    }

    /// Half of the smaller of the vertical and horizontal field of view
    fn narrow_half_fov(&self) -> f64 {
        let half_vertical = self.fov / 2.0;
        if self.aspect_ratio >= 1.0 {
            half_vertical
        } else {
            (half_vertical.tan() * self.aspect_ratio).atan()
        }
    }

    /// Distance from the camera to its target
    pub fn distance(&self) -> f64 {
        (self.position - self.target).norm()
    }

    /// Unit vector from the camera towards the target
    pub fn view_direction(&self) -> Vector3d {
        (self.target - self.position)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| -Vector3d::z())
    }

    fn update_clip_planes(&mut self) {
        let distance = self.distance();
        let reach = 2.0 * self.focus_radius;
        self.near = (distance - reach).max(distance * 1e-3).max(1e-6);
        self.far = (distance + reach).max(self.near * 2.0);
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f64> {
        let perspective = Perspective3::new(self.aspect_ratio, self.fov, self.near, self.far);
        perspective.into_inner()
    }

    pub fn view_projection(&self) -> Matrix4<f64> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Rotate the camera around the target.
    ///
    /// `yaw` turns around the up axis, `pitch` tilts towards it; both are in
    /// radians. Pitch stops short of the poles.
    pub fn orbit(&mut self, yaw: f64, pitch: f64) {
        let up = Unit::new_normalize(self.up);
        let mut offset = Rotation3::from_axis_angle(&up, -yaw) * (self.position - self.target);

        if let Some(right) = up.cross(&offset).try_normalize(f64::EPSILON) {
            let pitched = Rotation3::from_axis_angle(&Unit::new_unchecked(right), pitch) * offset;
            if let Some(dir) = pitched.try_normalize(f64::EPSILON) {
                if dir.dot(up.as_ref()).abs() < MAX_PITCH_COS {
                    offset = pitched;
                }
            }
        }

        self.position = self.target + offset;
    }

    /// Scale the distance to the target; values below 1 move closer.
    pub fn zoom(&mut self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let offset = (self.position - self.target) * factor;
        if offset.norm() > self.focus_radius * 1e-3 {
            self.position = self.target + offset;
            self.update_clip_planes();
        }
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3d::new(0.0, 0.0, 5.0),
            target: Point3d::origin(),
            up: Vector3d::y(),
            fov: std::f64::consts::FRAC_PI_4,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            focus_radius: 1.0,
        }
    }
}
