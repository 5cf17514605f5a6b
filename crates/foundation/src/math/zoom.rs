//! Slippy-map zoom level <-> camera height.
//!
//! Both directions use the Web-Mercator ground resolution at the given
//! latitude (`156543.03392 * cos(lat) / 2^zoom` meters per pixel) multiplied
//! by the viewport height. This is an approximation: it ignores projection
//! distortion away from the reference latitude and the camera pitch, so a
//! height only maps back to the zoom it came from at the same latitude.

/// Ground resolution at zoom 0 on the equator (meters per pixel).
pub const METERS_PER_PIXEL_Z0: f64 = 156_543.033_92;

pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 22.0;

/// Used when the host cannot report a viewport height.
pub const FALLBACK_VIEWPORT_HEIGHT_PX: f64 = 900.0;
/// Used when a latitude is not a finite number.
pub const FALLBACK_LATITUDE_DEG: f64 = 52.0;
/// Used when a camera height is NaN or not positive.
pub const FALLBACK_HEIGHT_M: f64 = 1000.0;

const MIN_METERS_PER_PIXEL: f64 = 1e-6;

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return MIN_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Camera height (meters) that shows `zoom` at `lat_deg`.
pub fn zoom_to_height(zoom: f64, lat_deg: f64, viewport_height_px: Option<f64>) -> f64 {
    let mpp = meters_per_pixel_z0(lat_deg) / 2f64.powf(zoom);
    mpp * viewport_height(viewport_height_px)
}

/// Inverse of [`zoom_to_height`], clamped to `[MIN_ZOOM, MAX_ZOOM]`.
pub fn height_to_zoom(height_m: f64, lat_deg: f64, viewport_height_px: Option<f64>) -> f64 {
    // +inf passes through and clamps to MIN_ZOOM.
    let height = if height_m > 0.0 {
        height_m
    } else {
        FALLBACK_HEIGHT_M
    };
    let mpp = height / viewport_height(viewport_height_px);
    let z = (meters_per_pixel_z0(lat_deg) / mpp.max(MIN_METERS_PER_PIXEL)).log2();
    clamp_zoom(z)
}

fn meters_per_pixel_z0(lat_deg: f64) -> f64 {
    let lat = if lat_deg.is_finite() {
        lat_deg
    } else {
        FALLBACK_LATITUDE_DEG
    };
    METERS_PER_PIXEL_Z0 * lat.to_radians().cos()
}

fn viewport_height(px: Option<f64>) -> f64 {
    match px {
        Some(h) if h.is_finite() && h > 0.0 => h,
        _ => FALLBACK_VIEWPORT_HEIGHT_PX,
    }
}
