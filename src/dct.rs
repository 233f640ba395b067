use std::f32::consts::PI;

/// 8x8 type-II DCT pair sharing one precomputed cosine table:
/// `table[k * 8 + n] = C(k) * cos((2n + 1) * k * PI / 16)` with
/// C(0) = 1/sqrt(2), C(k>0) = 1.
pub(crate) struct Dct {
    table: [f32; 64],
}

impl Dct {
    pub(crate) fn new() -> Self {
        let mut table = [0.0f32; 64];
        for k in 0..8 {
            let norm = if k == 0 { (0.5f32).sqrt() } else { 1.0 };
            for n in 0..8 {
                table[k * 8 + n] =
                    norm * ((2.0 * n as f32 + 1.0) * k as f32 * PI / 16.0).cos();
            }
        }
        Dct { table }
    }

    /// Frequency domain (natural order, [v * 8 + u]) to spatial samples
    /// ([y * 8 + x]): f(x,y) = 1/4 sum C(u)C(v) F(u,v) cos cos.
    pub(crate) fn inverse(&self, coefficients: &[f32; 64]) -> [f32; 64] {
        let mut out = [0.0f32; 64];
        for y in 0..8 {
            for x in 0..8 {
                let mut sum = 0.0;
                for v in 0..8 {
                    for u in 0..8 {
                        sum += coefficients[v * 8 + u]
                            * self.table[u * 8 + x]
                            * self.table[v * 8 + y];
                    }
                }
                out[y * 8 + x] = 0.25 * sum;
            }
        }
        out
    }

    /// Spatial samples to frequency domain, the exact dual of `inverse`.
    pub(crate) fn forward(&self, samples: &[f32; 64]) -> [f32; 64] {
        let mut out = [0.0f32; 64];
        for v in 0..8 {
            for u in 0..8 {
                let mut sum = 0.0;
                for y in 0..8 {
                    for x in 0..8 {
                        sum += samples[y * 8 + x]
                            * self.table[u * 8 + x]
                            * self.table[v * 8 + y];
                    }
                }
                out[v * 8 + u] = 0.25 * sum;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dc_only_block_is_flat() {
        let dct = Dct::new();
        let mut coefficients = [0.0f32; 64];
        coefficients[0] = 64.0;

        let spatial = dct.inverse(&coefficients);
        // f = F(0,0) / 8 for a DC-only block.
        for &v in spatial.iter() {
            assert!((v - 8.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_forward_then_inverse_round_trips() {
        let dct = Dct::new();
        let mut samples = [0.0f32; 64];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = ((i as f32) * 0.73).sin() * 100.0;
        }

        let restored = dct.inverse(&dct.forward(&samples));
        for (a, b) in samples.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_flat_block_has_dc_only() {
        let dct = Dct::new();
        let samples = [12.0f32; 64];
        let freq = dct.forward(&samples);
        // DC = 8 * sample value; every AC term vanishes.
        assert!((freq[0] - 96.0).abs() < 1e-3);
        for &v in freq.iter().skip(1) {
            assert!(v.abs() < 1e-3);
        }
    }
}
