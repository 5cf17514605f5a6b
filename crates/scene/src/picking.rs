use foundation::math::{EnuFrame, Vec2, Vec3, WGS84_A, WGS84_B, ecef_to_geodetic};

use crate::engine::{CameraView, Viewport};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// WGS84 ellipsoid radii along the ECEF axes.
pub const WGS84_RADII: Vec3 = Vec3::new(WGS84_A, WGS84_A, WGS84_B);

/// Nearest non-negative ray parameter where the ray meets the ellipsoid.
///
/// The ray direction does not need to be normalized; `t` is in units of it.
pub fn ray_ellipsoid_t(ray: Ray, radii: Vec3) -> Option<f64> {
    let o = Vec3::new(
        ray.origin.x / radii.x,
        ray.origin.y / radii.y,
        ray.origin.z / radii.z,
    );
    let d = Vec3::new(ray.dir.x / radii.x, ray.dir.y / radii.y, ray.dir.z / radii.z);

    let a = d.dot(d);
    if a <= 0.0 {
        return None;
    }
    let b = 2.0 * o.dot(d);
    let c = o.dot(o) - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }

    let sq = disc.sqrt();
    let t0 = (-b - sq) / (2.0 * a);
    let t1 = (-b + sq) / (2.0 * a);
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

pub fn pick_wgs84(ray: Ray) -> Option<Vec3> {
    ray_ellipsoid_t(ray, WGS84_RADII).map(|t| ray.at(t))
}

/// Perspective ray through a canvas pixel for a camera with vertical field of
/// view `fov_y_rad`. Roll is ignored.
pub fn screen_ray(camera: &CameraView, viewport: Viewport, screen: Vec2, fov_y_rad: f64) -> Option<Ray> {
    if viewport.width_px <= 0.0 || viewport.height_px <= 0.0 {
        return None;
    }

    let frame = EnuFrame::at(ecef_to_geodetic(camera.position.into()));
    let forward = frame.look_direction(camera.heading_rad, camera.pitch_rad);
    let right = frame.to_ecef_dir(camera.heading_rad.cos(), -camera.heading_rad.sin(), 0.0);
    let up = right.cross(forward);

    let aspect = viewport.width_px / viewport.height_px;
    let tan_half = (fov_y_rad / 2.0).tan();
    let ndc_x = 2.0 * screen.x / viewport.width_px - 1.0;
    let ndc_y = 1.0 - 2.0 * screen.y / viewport.height_px;

    let dir = forward + right * (ndc_x * tan_half * aspect) + up * (ndc_y * tan_half);
    Some(Ray::new(camera.position, dir.normalized()?))
}
