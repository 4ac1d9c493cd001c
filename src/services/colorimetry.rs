//! Colorimetric conversions between CIELAB, XYZ and sRGB
//!
//! Lab <-> XYZ takes the reference white explicitly; the sRGB path is always
//! D65 since that is the white of the sRGB primaries.

use nalgebra::{Matrix3, Vector3};

use crate::models::{LabColor, RgbColor, WhitePoint, XyzColor};

/// Reflectance bounds of the K/S model
pub const REFLECTANCE_MIN: f64 = 0.01;
pub const REFLECTANCE_MAX: f64 = 0.99;

const DELTA: f64 = 6.0 / 29.0;
const DELTA_CUBE: f64 = DELTA * DELTA * DELTA;

/// Linear sRGB (0-1) to XYZ (Y of white = 1), D65
fn rgb_to_xyz_matrix() -> Matrix3<f64> {
    Matrix3::new(
        0.4124564, 0.3575761, 0.1804375, //
        0.2126729, 0.7151522, 0.0721750, //
        0.0193339, 0.1191920, 0.9503041,
    )
}

fn xyz_to_rgb_matrix() -> Matrix3<f64> {
    Matrix3::new(
        3.2404542, -1.5371385, -0.4985314, //
        -0.9692660, 1.8760108, 0.0415560, //
        0.0556434, -0.2040259, 1.0572252,
    )
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > DELTA_CUBE {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

#[inline]
fn lab_f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// Convert Lab to XYZ against the given reference white
pub fn lab_to_xyz(lab: LabColor, white: WhitePoint) -> XyzColor {
    let w = white.xyz();
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;
    XyzColor::new(w.x * lab_f_inv(fx), w.y * lab_f_inv(fy), w.z * lab_f_inv(fz))
}

/// Convert XYZ to Lab against the given reference white
pub fn xyz_to_lab(xyz: XyzColor, white: WhitePoint) -> LabColor {
    let w = white.xyz();
    let fx = lab_f(xyz.x / w.x);
    let fy = lab_f(xyz.y / w.y);
    let fz = lab_f(xyz.z / w.z);
    LabColor::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// sRGB gamma expansion
#[inline]
pub fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB gamma compression
#[inline]
pub fn linear_to_srgb(c: f64) -> f64 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Lab (D65) to 8-bit sRGB, clipping out-of-gamut colors
pub fn lab_to_rgb(lab: LabColor) -> RgbColor {
    let xyz = lab_to_xyz(lab, WhitePoint::D65);
    let linear = xyz_to_rgb_matrix() * Vector3::new(xyz.x, xyz.y, xyz.z) / 100.0;
    let to_u8 = |c: f64| (linear_to_srgb(c) * 255.0).round() as u8;
    RgbColor::new(to_u8(linear.x), to_u8(linear.y), to_u8(linear.z))
}

/// 8-bit sRGB to Lab (D65)
pub fn rgb_to_lab(rgb: RgbColor) -> LabColor {
    let linear = Vector3::new(
        srgb_to_linear(rgb.r as f64 / 255.0),
        srgb_to_linear(rgb.g as f64 / 255.0),
        srgb_to_linear(rgb.b as f64 / 255.0),
    );
    let xyz = rgb_to_xyz_matrix() * linear * 100.0;
    xyz_to_lab(XyzColor::new(xyz.x, xyz.y, xyz.z), WhitePoint::D65)
}

/// Approximate diffuse reflectance from lightness, clamped to the K/S domain
#[inline]
pub fn lightness_to_reflectance(l: f64) -> f64 {
    lab_f_inv((l + 16.0) / 116.0).clamp(REFLECTANCE_MIN, REFLECTANCE_MAX)
}

/// Inverse of [`lightness_to_reflectance`] (without the clamp)
#[inline]
pub fn reflectance_to_lightness(r: f64) -> f64 {
    116.0 * lab_f(r.max(0.0)) - 16.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_maps_to_reference_white() {
        let xyz = lab_to_xyz(LabColor::new(100.0, 0.0, 0.0), WhitePoint::D50);
        assert!((xyz.x - 96.422).abs() < 1e-9);
        assert!((xyz.y - 100.0).abs() < 1e-9);
        assert!((xyz.z - 82.521).abs() < 1e-9);
    }

    #[test]
    fn mismatched_white_points_do_not_round_trip() {
        let lab = LabColor::new(60.0, 20.0, -30.0);
        let back = xyz_to_lab(lab_to_xyz(lab, WhitePoint::D50), WhitePoint::D65);
        assert!((back.a - lab.a).abs() > 0.5 || (back.b - lab.b).abs() > 0.5);
    }

    #[test]
    fn srgb_primaries() {
        let white = rgb_to_lab(RgbColor::new(255, 255, 255));
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);

        let red = rgb_to_lab(RgbColor::new(255, 0, 0));
        assert!((red.l - 53.24).abs() < 0.05);
        assert!((red.a - 80.09).abs() < 0.1);
        assert!((red.b - 67.20).abs() < 0.1);
    }

    #[test]
    fn rgb_round_trip() {
        for rgb in [
            RgbColor::new(0, 0, 0),
            RgbColor::new(12, 200, 77),
            RgbColor::new(255, 128, 3),
            RgbColor::new(90, 90, 90),
        ] {
            assert_eq!(lab_to_rgb(rgb_to_lab(rgb)), rgb);
        }
    }

    #[test]
    fn reflectance_is_clamped() {
        assert_eq!(lightness_to_reflectance(100.0), REFLECTANCE_MAX);
        assert_eq!(lightness_to_reflectance(0.0), REFLECTANCE_MIN);
        let r = lightness_to_reflectance(50.0);
        assert!((reflectance_to_lightness(r) - 50.0).abs() < 1e-9);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn white_point() -> impl Strategy<Value = WhitePoint> {
            prop_oneof![Just(WhitePoint::D50), Just(WhitePoint::D65)]
        }

        proptest! {
            #[test]
            fn lab_xyz_round_trip_within_tolerance(
                l in 0.0_f64..=100.0,
                a in -128.0_f64..=127.0,
                b in -128.0_f64..=127.0,
                white in white_point(),
            ) {
                let lab = LabColor::new(l, a, b);
                let back = xyz_to_lab(lab_to_xyz(lab, white), white);
                prop_assert!((back.l - l).abs() < 1e-3, "L: {} vs {}", back.l, l);
                prop_assert!((back.a - a).abs() < 1e-3, "a: {} vs {}", back.a, a);
                prop_assert!((back.b - b).abs() < 1e-3, "b: {} vs {}", back.b, b);
            }

            #[test]
            fn reflectance_stays_in_bounds(l in 0.0_f64..=100.0) {
                let r = lightness_to_reflectance(l);
                prop_assert!((REFLECTANCE_MIN..=REFLECTANCE_MAX).contains(&r));
            }
        }
    }
}
