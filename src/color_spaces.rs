/// YCbCr sample (level-shifted into the DCT's signed range) to an RGB
/// pixel. `y`, `cb`, `cr` arrive already re-centered: Y in [0, 255] and
/// chroma around 128.
pub(crate) fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> (u8, u8, u8) {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344136 * (cb - 128.0) - 0.714136 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);

    (clamp_u8(r), clamp_u8(g), clamp_u8(b))
}

/// RGB pixel to level-shifted YCbCr, ready for the forward transform:
/// Y - 128 and chroma re-centered on zero.
pub(crate) fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.1687 * r - 0.3313 * g + 0.5 * b;
    let cr = 0.5 * r - 0.4187 * g - 0.0813 * b;

    (y - 128.0, cb, cr)
}

fn clamp_u8(v: f32) -> u8 {
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_chroma_is_grayscale() {
        assert_eq!(ycbcr_to_rgb(128.0, 128.0, 128.0), (128, 128, 128));
        assert_eq!(ycbcr_to_rgb(0.0, 128.0, 128.0), (0, 0, 0));
        assert_eq!(ycbcr_to_rgb(255.0, 128.0, 128.0), (255, 255, 255));
    }

    #[test]
    fn test_conversion_round_trips_within_rounding() {
        for &(r, g, b) in &[
            (255u8, 0u8, 0u8),
            (0, 255, 0),
            (0, 0, 255),
            (12, 200, 97),
            (255, 255, 255),
        ] {
            let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
            let (r2, g2, b2) = ycbcr_to_rgb(y + 128.0, cb + 128.0, cr + 128.0);
            assert!((r as i32 - r2 as i32).abs() <= 1, "{} vs {}", r, r2);
            assert!((g as i32 - g2 as i32).abs() <= 1, "{} vs {}", g, g2);
            assert!((b as i32 - b2 as i32).abs() <= 1, "{} vs {}", b, b2);
        }
    }

    #[test]
    fn test_output_always_clamped() {
        // Saturated chroma drives the raw conversion far out of range.
        let (r, _, b) = ycbcr_to_rgb(255.0, 255.0, 255.0);
        assert_eq!(r, 255);
        let (_, _, b2) = ycbcr_to_rgb(0.0, 0.0, 0.0);
        assert_eq!(b2, 0);
        let _ = b;
    }
}
