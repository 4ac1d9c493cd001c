//! Perceptual color difference metrics: CIE76, CIE94, CIEDE2000 and CMC l:c
//!
//! CIE94 and CMC use the first operand as the reference (its chroma, hue and
//! lightness drive the weighting functions), so they are not symmetric.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::models::LabColor;

/// Chroma floor for hue-dependent terms
pub const CHROMA_EPSILON: f64 = 1e-9;

const POW25_7: f64 = 6_103_515_625.0; // 25^7

/// Available difference formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeltaEMethod {
    Cie76,
    Cie94,
    #[default]
    Ciede2000,
    Cmc,
}

/// Parametric factors kL, kC, kH
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaEWeights {
    pub kl: f64,
    pub kc: f64,
    pub kh: f64,
}

impl Default for DeltaEWeights {
    fn default() -> Self {
        Self {
            kl: 1.0,
            kc: 1.0,
            kh: 1.0,
        }
    }
}

/// CIE94 weights and application constants K1, K2
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cie94Params {
    pub weights: DeltaEWeights,
    pub k1: f64,
    pub k2: f64,
}

impl Cie94Params {
    pub fn graphic_arts() -> Self {
        Self {
            weights: DeltaEWeights::default(),
            k1: 0.045,
            k2: 0.015,
        }
    }

    pub fn textiles() -> Self {
        Self {
            weights: DeltaEWeights {
                kl: 2.0,
                ..Default::default()
            },
            k1: 0.048,
            k2: 0.014,
        }
    }
}

impl Default for Cie94Params {
    fn default() -> Self {
        Self::graphic_arts()
    }
}

#[inline]
fn deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

#[inline]
fn rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Hue angle in degrees [0, 360); zero when chroma is negligible
#[inline]
fn hue_angle(b: f64, a: f64) -> f64 {
    if a.hypot(b) < CHROMA_EPSILON {
        return 0.0;
    }
    let h = deg(b.atan2(a));
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

/// CIE76: Euclidean distance in Lab
pub fn delta_e_76(c1: LabColor, c2: LabColor) -> f64 {
    let dl = c1.l - c2.l;
    let da = c1.a - c2.a;
    let db = c1.b - c2.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// CIE94 with `c1` as reference
pub fn delta_e_94(c1: LabColor, c2: LabColor, params: Cie94Params) -> f64 {
    let w = params.weights;
    let dl = c1.l - c2.l;
    let chroma1 = c1.chroma();
    let chroma2 = c2.chroma();
    let dc = chroma1 - chroma2;
    let da = c1.a - c2.a;
    let db = c1.b - c2.b;
    let dh_sq = (da * da + db * db - dc * dc).max(0.0);

    let sl = 1.0;
    let sc = 1.0 + params.k1 * chroma1;
    let sh = 1.0 + params.k2 * chroma1;

    let tl = dl / (w.kl * sl);
    let tc = dc / (w.kc * sc);
    let th_sq = dh_sq / (w.kh * sh).powi(2);
    (tl * tl + tc * tc + th_sq).sqrt()
}

/// CIEDE2000 (CIE 142-2001)
pub fn delta_e_2000(c1: LabColor, c2: LabColor, weights: DeltaEWeights) -> f64 {
    let chroma1 = c1.chroma();
    let chroma2 = c2.chroma();
    let c_bar7 = ((chroma1 + chroma2) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * c1.a;
    let a2p = (1.0 + g) * c2.a;
    let c1p = a1p.hypot(c1.b);
    let c2p = a2p.hypot(c2.b);
    let h1p = hue_angle(c1.b, a1p);
    let h2p = hue_angle(c2.b, a2p);

    let chroma_product = c1p * c2p;
    let neutral = chroma_product < CHROMA_EPSILON;

    let dlp = c2.l - c1.l;
    let dcp = c2p - c1p;
    let dhp = if neutral {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff > 180.0 {
            diff - 360.0
        } else if diff < -180.0 {
            diff + 360.0
        } else {
            diff
        }
    };
    let d_hp = 2.0 * chroma_product.sqrt() * rad(dhp / 2.0).sin();

    let l_bar = (c1.l + c2.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if neutral {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * rad(h_bar_p - 30.0).cos()
        + 0.24 * rad(2.0 * h_bar_p).cos()
        + 0.32 * rad(3.0 * h_bar_p + 6.0).cos()
        - 0.20 * rad(4.0 * h_bar_p - 63.0).cos();
    let d_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let rc = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let l_offset = (l_bar - 50.0).powi(2);
    let sl = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
    let sc = 1.0 + 0.045 * c_bar_p;
    let sh = 1.0 + 0.015 * c_bar_p * t;
    let rt = -rad(2.0 * d_theta).sin() * rc;

    let tl = dlp / (weights.kl * sl);
    let tc = dcp / (weights.kc * sc);
    let th = d_hp / (weights.kh * sh);
    (tl * tl + tc * tc + th * th + rt * tc * th).max(0.0).sqrt()
}

/// CIEDE2000 with unit weights, the metric used by the optimizer
#[inline]
pub fn delta_e_00(c1: LabColor, c2: LabColor) -> f64 {
    delta_e_2000(c1, c2, DeltaEWeights::default())
}

/// CMC l:c with `c1` as reference; 2:1 is acceptability, 1:1 perceptibility
pub fn delta_e_cmc(c1: LabColor, c2: LabColor, l: f64, c: f64) -> f64 {
    let chroma1 = c1.chroma().max(CHROMA_EPSILON);
    let chroma2 = c2.chroma();
    let dl = c1.l - c2.l;
    let dc = chroma1 - chroma2;
    let da = c1.a - c2.a;
    let db = c1.b - c2.b;
    let dh_sq = (da * da + db * db - dc * dc).max(0.0);

    let h1 = hue_angle(c1.b, c1.a);
    let t = if (164.0..=345.0).contains(&h1) {
        0.56 + (0.2 * rad(h1 + 168.0).cos()).abs()
    } else {
        0.36 + (0.4 * rad(h1 + 35.0).cos()).abs()
    };
    let c1_4 = chroma1.powi(4);
    let f = (c1_4 / (c1_4 + 1900.0)).sqrt();

    let sl = if c1.l < 16.0 {
        0.511
    } else {
        0.040975 * c1.l / (1.0 + 0.01765 * c1.l)
    };
    let sc = 0.0638 * chroma1 / (1.0 + 0.0131 * chroma1) + 0.638;
    let sh = sc * (f * t + 1.0 - f);

    let tl = dl / (l * sl);
    let tc = dc / (c * sc);
    (tl * tl + tc * tc + dh_sq / (sh * sh)).sqrt()
}

/// Dispatch with each formula's default parameters
pub fn delta_e(method: DeltaEMethod, c1: LabColor, c2: LabColor) -> f64 {
    match method {
        DeltaEMethod::Cie76 => delta_e_76(c1, c2),
        DeltaEMethod::Cie94 => delta_e_94(c1, c2, Cie94Params::default()),
        DeltaEMethod::Ciede2000 => delta_e_00(c1, c2),
        DeltaEMethod::Cmc => delta_e_cmc(c1, c2, 2.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHODS: [DeltaEMethod; 4] = [
        DeltaEMethod::Cie76,
        DeltaEMethod::Cie94,
        DeltaEMethod::Ciede2000,
        DeltaEMethod::Cmc,
    ];

    // Reference pairs from Sharma, Wu & Dalal (2005)
    #[test]
    fn ciede2000_matches_reference_data() {
        let pairs = [
            (
                LabColor::new(50.0, 2.6772, -79.7751),
                LabColor::new(50.0, 0.0, -82.7485),
                2.0425,
            ),
            (
                LabColor::new(50.0, 0.0, 0.0),
                LabColor::new(50.0, -1.0, 2.0),
                2.3669,
            ),
            (
                LabColor::new(50.0, 2.5, 0.0),
                LabColor::new(73.0, 25.0, -18.0),
                27.1492,
            ),
            (
                LabColor::new(60.2574, -34.0099, 36.2677),
                LabColor::new(60.4626, -34.1751, 39.4387),
                1.2644,
            ),
        ];
        for (c1, c2, expected) in pairs {
            let de = delta_e_00(c1, c2);
            assert!(
                (de - expected).abs() < 1e-4,
                "{c1:?} vs {c2:?}: {de} != {expected}"
            );
        }
    }

    #[test]
    fn cie76_is_euclidean() {
        let de = delta_e_76(LabColor::new(50.0, 0.0, 0.0), LabColor::new(53.0, 4.0, 0.0));
        assert!((de - 5.0).abs() < 1e-12);
    }

    #[test]
    fn cie94_pure_lightness_difference() {
        let c1 = LabColor::new(50.0, 20.0, 10.0);
        let c2 = LabColor::new(55.0, 20.0, 10.0);
        assert!((delta_e_94(c1, c2, Cie94Params::graphic_arts()) - 5.0).abs() < 1e-9);
        assert!((delta_e_94(c1, c2, Cie94Params::textiles()) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn cmc_pure_lightness_difference() {
        let c1 = LabColor::new(50.0, 0.0, 0.0);
        let c2 = LabColor::new(54.0, 0.0, 0.0);
        let sl = 0.040975 * 50.0 / (1.0 + 0.01765 * 50.0);
        let expected = 4.0 / (2.0 * sl);
        assert!((delta_e_cmc(c1, c2, 2.0, 1.0) - expected).abs() < 1e-9);
    }

    // Values published with colour-science's delta_E_CIE1994 and delta_E_CMC
    #[test]
    fn cie94_and_cmc_match_published_values() {
        let c1 = LabColor::new(100.0, 21.57210357, 272.22819350);
        let c2 = LabColor::new(100.0, 426.67945353, 72.39590835);
        let graphic = delta_e_94(c1, c2, Cie94Params::graphic_arts());
        let textiles = delta_e_94(c1, c2, Cie94Params::textiles());
        let cmc = delta_e_cmc(c1, c2, 2.0, 1.0);
        assert!((graphic - 83.779225500887).abs() < 1e-6, "{graphic}");
        assert!((textiles - 88.335553057507).abs() < 1e-6, "{textiles}");
        assert!((cmc - 172.704771286560).abs() < 1e-6, "{cmc}");
    }

    // Chromatic pairs from the Sharma, Wu & Dalal set
    #[test]
    fn cie94_matches_reference_data() {
        let pairs = [
            (
                LabColor::new(50.0, 2.6772, -79.7751),
                LabColor::new(50.0, 0.0, -82.7485),
                1.395039,
                1.423046,
            ),
            (
                LabColor::new(60.2574, -34.0099, 36.2677),
                LabColor::new(60.4626, -34.1751, 39.4387),
                1.390995,
                1.389733,
            ),
        ];
        for (c1, c2, graphic, textiles) in pairs {
            let de = delta_e_94(c1, c2, Cie94Params::graphic_arts());
            assert!((de - graphic).abs() < 1e-5, "{c1:?} vs {c2:?}: {de} != {graphic}");
            let de = delta_e_94(c1, c2, Cie94Params::textiles());
            assert!((de - textiles).abs() < 1e-5, "{c1:?} vs {c2:?}: {de} != {textiles}");
        }
    }

    #[test]
    fn cmc_matches_reference_data_on_both_hue_branches() {
        // (reference, sample, reference hue, 2:1, 1:1)
        let pairs = [
            (
                LabColor::new(63.0109, -31.0961, -5.8663),
                LabColor::new(62.8187, -29.7946, -4.0864),
                190.68,
                1.247404,
                1.254814,
            ),
            (
                LabColor::new(61.2901, 3.7196, -5.3901),
                LabColor::new(61.4292, 2.2480, -4.9620),
                304.61,
                1.765559,
                1.768381,
            ),
            (
                LabColor::new(60.2574, -34.0099, 36.2677),
                LabColor::new(60.4626, -34.1751, 39.4387),
                133.16,
                1.420486,
                1.428230,
            ),
        ];
        for (c1, c2, hue, acceptability, perceptibility) in pairs {
            assert!((c1.hue_degrees() - hue).abs() < 0.01, "{c1:?} hue {}", c1.hue_degrees());
            let de = delta_e_cmc(c1, c2, 2.0, 1.0);
            assert!((de - acceptability).abs() < 1e-5, "{c1:?} 2:1: {de} != {acceptability}");
            let de = delta_e_cmc(c1, c2, 1.0, 1.0);
            assert!((de - perceptibility).abs() < 1e-5, "{c1:?} 1:1: {de} != {perceptibility}");
        }
        let (c1, c2) = (pairs[2].0, pairs[2].1);
        assert_eq!(delta_e(DeltaEMethod::Cmc, c1, c2), delta_e_cmc(c1, c2, 2.0, 1.0));
    }

    #[test]
    fn asymmetric_formulas_depend_on_reference() {
        let c1 = LabColor::new(50.0, 60.0, 10.0);
        let c2 = LabColor::new(52.0, 20.0, 5.0);
        let forward = delta_e_94(c1, c2, Cie94Params::default());
        let backward = delta_e_94(c2, c1, Cie94Params::default());
        assert!((forward - backward).abs() > 1e-3);
    }

    #[test]
    fn neutral_colors_do_not_produce_nan() {
        let gray = LabColor::new(50.0, 0.0, 0.0);
        let other = LabColor::new(60.0, 0.0, 0.0);
        for method in METHODS {
            let de = delta_e(method, gray, other);
            assert!(de.is_finite(), "{method:?} produced {de}");
            assert!(de > 0.0);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn lab() -> impl Strategy<Value = LabColor> {
            (0.0_f64..=100.0, -128.0_f64..=127.0, -128.0_f64..=127.0)
                .prop_map(|(l, a, b)| LabColor::new(l, a, b))
        }

        proptest! {
            #[test]
            fn cie76_is_symmetric(c1 in lab(), c2 in lab()) {
                prop_assert!((delta_e_76(c1, c2) - delta_e_76(c2, c1)).abs() < 1e-12);
            }

            #[test]
            fn ciede2000_is_symmetric(c1 in lab(), c2 in lab()) {
                prop_assert!((delta_e_00(c1, c2) - delta_e_00(c2, c1)).abs() < 1e-9);
            }

            #[test]
            fn identical_colors_have_zero_difference(c in lab()) {
                for method in METHODS {
                    let de = delta_e(method, c, c);
                    prop_assert!(de.abs() < 1e-9, "{:?} gave {}", method, de);
                }
            }

            #[test]
            fn differences_are_non_negative(c1 in lab(), c2 in lab()) {
                for method in METHODS {
                    let de = delta_e(method, c1, c2);
                    prop_assert!(de >= 0.0 && de.is_finite());
                }
            }
        }
    }
}
