use super::{Geodetic, Vec3};

/// East/north/up unit axes of the local tangent frame at `origin`, in ECEF.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EnuFrame {
    pub east: Vec3,
    pub north: Vec3,
    pub up: Vec3,
}

impl EnuFrame {
    pub fn at(origin: Geodetic) -> Self {
        let sin_lat = origin.lat_rad.sin();
        let cos_lat = origin.lat_rad.cos();
        let sin_lon = origin.lon_rad.sin();
        let cos_lon = origin.lon_rad.cos();

        Self {
            east: Vec3::new(-sin_lon, cos_lon, 0.0),
            north: Vec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: Vec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        }
    }

    /// Local (east, north, up) components to an ECEF direction.
    pub fn to_ecef_dir(&self, east: f64, north: f64, up: f64) -> Vec3 {
        self.east * east + self.north * north + self.up * up
    }

    /// Viewing direction for a heading (clockwise from north) and a pitch
    /// (negative looks down), both in radians.
    pub fn look_direction(&self, heading_rad: f64, pitch_rad: f64) -> Vec3 {
        let horizontal = pitch_rad.cos();
        self.to_ecef_dir(
            heading_rad.sin() * horizontal,
            heading_rad.cos() * horizontal,
            pitch_rad.sin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::EnuFrame;
    use crate::math::{Geodetic, Vec3};

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let d = (a - b).length();
        assert!(d <= eps, "expected {a:?} ~= {b:?} (diff {d})");
    }

    #[test]
    fn frame_at_equator_prime_meridian() {
        let f = EnuFrame::at(Geodetic::new(0.0, 0.0, 0.0));
        assert_vec_close(f.east, Vec3::new(0.0, 1.0, 0.0), 1e-12);
        assert_vec_close(f.north, Vec3::new(0.0, 0.0, 1.0), 1e-12);
        assert_vec_close(f.up, Vec3::new(1.0, 0.0, 0.0), 1e-12);
    }

    #[test]
    fn straight_down_is_minus_up() {
        let f = EnuFrame::at(Geodetic::from_degrees(5.3, 52.2, 0.0));
        let dir = f.look_direction(0.3, -std::f64::consts::FRAC_PI_2);
        assert_vec_close(dir, -f.up, 1e-12);
    }
}
