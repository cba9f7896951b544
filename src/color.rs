//! HSL to linear-ish RGB conversion shared by both view modes.

/// Convert HSL (h in [0,1) wrapping, s and l in [0,1]) to RGB in [0,1].
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return [l, l, l];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    [
        hue_channel(p, q, h + 1.0 / 3.0),
        hue_channel(p, q, h),
        hue_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rgb_close(actual: [f32; 3], expected: [f32; 3]) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_primaries() {
        assert_rgb_close(hsl_to_rgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]);
        assert_rgb_close(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), [0.0, 1.0, 0.0]);
        assert_rgb_close(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_grayscale_when_desaturated() {
        assert_rgb_close(hsl_to_rgb(0.37, 0.0, 0.25), [0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_hue_wraps() {
        let a = hsl_to_rgb(0.2, 0.8, 0.5);
        let b = hsl_to_rgb(1.2, 0.8, 0.5);
        assert_rgb_close(a, b);
    }

    #[test]
    fn test_output_in_unit_range() {
        for i in 0..64 {
            let rgb = hsl_to_rgb(i as f32 / 64.0, 0.9, 0.6);
            assert!(rgb.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }
}
