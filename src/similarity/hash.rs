//! Average-hash fingerprints for coarse page similarity.
//!
//! The fingerprint is built by downsampling a grayscale page to a small
//! square and thresholding every pixel against the block's own mean
//! intensity. Distance between two fingerprints is the normalized
//! Hamming distance in [0, 1].

use image::imageops::{self, FilterType};
use image::GrayImage;

/// Binary perceptual fingerprint of a page.
///
/// Bits are packed into u64 words; `bit_count` is `hash_size * hash_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    words: Vec<u64>,
    bit_count: usize,
}

impl Fingerprint {
    /// Compute the average hash of a grayscale image at the given square size.
    pub fn average_hash(gray: &GrayImage, hash_size: u32) -> Self {
        let resized = imageops::resize(gray, hash_size, hash_size, FilterType::Triangle);
        let pixels: Vec<u8> = resized.pixels().map(|p| p[0]).collect();
        let bit_count = pixels.len();

        // Mean intensity of the downsampled block itself
        let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
        let avg = if bit_count > 0 {
            (sum / bit_count as u64) as u8
        } else {
            0
        };

        let mut words = vec![0u64; (bit_count + 63) / 64];
        for (i, &pixel) in pixels.iter().enumerate() {
            if pixel >= avg {
                words[i / 64] |= 1 << (i % 64);
            }
        }

        Self { words, bit_count }
    }

    /// Number of bits in the fingerprint.
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Hamming distance normalized by bit count, in [0, 1].
    /// Fingerprints of different sizes compare as maximally distant.
    pub fn distance(&self, other: &Self) -> f64 {
        if self.bit_count != other.bit_count {
            return 1.0;
        }
        if self.bit_count == 0 {
            return 0.0;
        }
        let differing: u32 = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        f64::from(differing) / self.bit_count as f64
    }
}
