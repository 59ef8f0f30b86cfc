//! Structural-similarity estimate between two grayscale planes.
//!
//! Local means, variances, and covariance are derived from Gaussian-blurred
//! f32 planes. Working in f32 is required because the squared-intensity
//! planes feeding the variance maps exceed the u8 range.

use image::GrayImage;

/// SSIM stabilization constants for 8-bit dynamic range:
/// C1 = (0.01 * 255)^2, C2 = (0.03 * 255)^2.
const C1: f32 = 6.5025;
const C2: f32 = 58.5225;

/// An owned single-channel f32 image plane.
#[derive(Debug, Clone)]
pub(crate) struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    pub(crate) fn from_gray(gray: &GrayImage) -> Self {
        Self {
            width: gray.width() as usize,
            height: gray.height() as usize,
            data: gray.as_raw().iter().map(|&p| f32::from(p)).collect(),
        }
    }

    fn zeroed_like(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: vec![0.0; self.data.len()],
        }
    }

    fn mul(&self, other: &Self) -> Self {
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a * b)
            .collect();
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Separable Gaussian blur with clamped borders.
    fn gaussian_blur(&self, sigma: f32) -> Self {
        let kernel = gaussian_kernel(sigma);
        let radius = kernel.len() / 2;

        // Horizontal pass
        let mut tmp = self.zeroed_like();
        for y in 0..self.height {
            let row = y * self.width;
            for x in 0..self.width {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x + k).saturating_sub(radius).min(self.width - 1);
                    acc += w * self.data[row + sx];
                }
                tmp.data[row + x] = acc;
            }
        }

        // Vertical pass
        let mut out = self.zeroed_like();
        for y in 0..self.height {
            for x in 0..self.width {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy = (y + k).saturating_sub(radius).min(self.height - 1);
                    acc += w * tmp.data[sy * self.width + x];
                }
                out.data[y * self.width + x] = acc;
            }
        }
        out
    }
}

/// Normalized 1-D Gaussian kernel with radius 3*sigma.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    for i in 0..=2 * radius {
        let d = i as f32 - radius as f32;
        kernel.push((-d * d / denom).exp());
    }
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Mean SSIM over the image at one Gaussian scale.
fn mean_ssim(a: &Plane, b: &Plane, sigma: f32) -> f64 {
    let mu_a = a.gaussian_blur(sigma);
    let mu_b = b.gaussian_blur(sigma);
    let e_aa = a.mul(a).gaussian_blur(sigma);
    let e_bb = b.mul(b).gaussian_blur(sigma);
    let e_ab = a.mul(b).gaussian_blur(sigma);

    let mut sum = 0.0f64;
    for i in 0..a.data.len() {
        let ma = mu_a.data[i];
        let mb = mu_b.data[i];
        let var_a = (e_aa.data[i] - ma * ma).max(0.0);
        let var_b = (e_bb.data[i] - mb * mb).max(0.0);
        let cov = e_ab.data[i] - ma * mb;

        let num = (2.0 * ma * mb + C1) * (2.0 * cov + C2);
        let den = (ma * ma + mb * mb + C1) * (var_a + var_b + C2);
        sum += f64::from(num / den);
    }
    sum / a.data.len() as f64
}

/// Structural-dissimilarity estimate in [0, 1]: `1 - mean(SSIM)`,
/// averaged over the two Gaussian scales and clipped.
///
/// Both images must share dimensions; callers resize to the similarity
/// work size before invoking this.
pub fn ssim_distance(a: &GrayImage, b: &GrayImage, sigmas: [f32; 2]) -> f64 {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    if a.width() == 0 || a.height() == 0 {
        return 0.0;
    }

    let pa = Plane::from_gray(a);
    let pb = Plane::from_gray(b);

    let ssim: f64 = sigmas
        .iter()
        .map(|&s| mean_ssim(&pa, &pb, s))
        .sum::<f64>()
        / sigmas.len() as f64;

    (1.0 - ssim).clamp(0.0, 1.0)
}
