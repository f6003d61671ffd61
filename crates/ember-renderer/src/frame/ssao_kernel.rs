//! SSAO sample kernel and rotation noise.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::ssao::KERNEL_SIZE;

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Scale applied to sample `index` of `count`, `lerp(0.1, 1.0, t^2)`.
///
/// Pulls early samples toward the kernel origin.
pub fn kernel_scale(index: usize, count: usize) -> f32 {
    let t = index as f32 / count.max(1) as f32;
    lerp(0.1, 1.0, t * t)
}

/// Hemisphere sample offsets in tangent space (+Z is the surface normal).
#[derive(Debug, Clone, PartialEq)]
pub struct SsaoKernel {
    samples: Vec<Vec4>,
}

impl SsaoKernel {
    /// Generates `count` samples (at most the uniform capacity) from `seed`.
    pub fn generate(count: usize, seed: u64) -> Self {
        let count = count.min(KERNEL_SIZE);
        let mut rng = StdRng::seed_from_u64(seed);

        let samples = (0..count)
            .map(|i| {
                let dir = Vec3::new(
                    rng.gen_range(0.0f32..1.0) * 2.0 - 1.0,
                    rng.gen_range(0.0f32..1.0) * 2.0 - 1.0,
                    rng.gen_range(0.0f32..1.0),
                )
                .normalize_or_zero();
                let length = rng.gen_range(0.0f32..1.0);
                (dir * length * kernel_scale(i, count)).extend(0.0)
            })
            .collect();

        Self { samples }
    }

    pub fn samples(&self) -> &[Vec4] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// GPU layout, zero-padded to the full kernel capacity.
    pub fn to_uniform(&self) -> KernelUniform {
        let mut uniform = KernelUniform::zeroed();
        for (slot, sample) in uniform.samples.iter_mut().zip(&self.samples) {
            *slot = sample.to_array();
        }
        uniform
    }
}

/// Kernel uniform buffer data sent to GPU (1024 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct KernelUniform {
    pub samples: [[f32; 4]; KERNEL_SIZE],
}

/// Generates `size * size` rotation vectors around the tangent-space Z axis.
///
/// Each entry is `(x, y, 0, 0)` with `x, y` in `[-1, 1]`; entries too short to
/// build a tangent basis from are replaced by the +X axis.
pub fn generate_noise(size: u32, seed: u64) -> Vec<[f32; 4]> {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    (0..size * size)
        .map(|_| {
            let x = rng.gen_range(0.0f32..1.0) * 2.0 - 1.0;
            let y = rng.gen_range(0.0f32..1.0) * 2.0 - 1.0;
            if x * x + y * y < 1e-4 {
                [1.0, 0.0, 0.0, 0.0]
            } else {
                [x, y, 0.0, 0.0]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_has_requested_size() {
        assert_eq!(SsaoKernel::generate(64, 1).len(), 64);
        assert_eq!(SsaoKernel::generate(16, 1).len(), 16);
        assert_eq!(SsaoKernel::generate(500, 1).len(), KERNEL_SIZE);
    }

    #[test]
    fn test_samples_fit_in_unit_hemisphere() {
        let kernel = SsaoKernel::generate(64, 42);
        for sample in kernel.samples() {
            assert!(sample.truncate().length() <= 1.0 + 1e-6);
            assert!(sample.z >= 0.0);
            assert_eq!(sample.w, 0.0);
        }
    }

    #[test]
    fn test_scale_is_monotonic() {
        let scales: Vec<f32> = (0..64).map(|i| kernel_scale(i, 64)).collect();
        assert_eq!(scales[0], 0.1);
        assert!(scales.windows(2).all(|w| w[1] > w[0]));
        assert!(scales[63] < 1.0);
    }

    #[test]
    fn test_later_samples_are_longer_on_average() {
        let kernel = SsaoKernel::generate(64, 7);
        let mean = |s: &[Vec4]| s.iter().map(|v| v.truncate().length()).sum::<f32>() / s.len() as f32;
        let (early, late) = kernel.samples().split_at(32);
        assert!(mean(late) > mean(early));
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(SsaoKernel::generate(64, 3), SsaoKernel::generate(64, 3));
        assert_ne!(SsaoKernel::generate(64, 3), SsaoKernel::generate(64, 4));
        assert_eq!(generate_noise(4, 3), generate_noise(4, 3));
    }

    #[test]
    fn test_noise_lies_in_tangent_plane() {
        let noise = generate_noise(4, 11);
        assert_eq!(noise.len(), 16);
        for n in noise {
            assert_eq!(n[2], 0.0);
            assert!(n[0] * n[0] + n[1] * n[1] >= 1e-4);
        }
    }

    #[test]
    fn test_uniform_is_zero_padded() {
        let uniform = SsaoKernel::generate(8, 1).to_uniform();
        assert_eq!(uniform.samples[8], [0.0; 4]);
        assert_eq!(std::mem::size_of::<KernelUniform>(), 1024);
    }
}
