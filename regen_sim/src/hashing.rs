use std::hash::Hasher;

use image::RgbaImage;

/// Deterministic FNV-1a 64-bit hasher.
///
/// `DefaultHasher` is randomized per process; frame digests have to match
/// across hosts and runs.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Digest over the dimensions and raw RGBA bytes of a frame.
pub fn frame_digest(image: &RgbaImage) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(&image.width().to_le_bytes());
    hasher.write(&image.height().to_le_bytes());
    hasher.write(image.as_raw());
    hasher.finish()
}

pub fn frame_digest_hex(image: &RgbaImage) -> String {
    format!("{:016x}", frame_digest(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn empty_input_hashes_to_the_offset_basis() {
        assert_eq!(FnvHasher::new().finish(), 0xcbf2_9ce4_8422_2325);
        let mut hasher = FnvHasher::default();
        hasher.write(b"a");
        assert_eq!(hasher.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn digest_tracks_pixels_and_shape() {
        let a = RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 4]));
        let same = RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 4]));
        let transposed = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        let recoloured = RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 5]));
        assert_eq!(frame_digest(&a), frame_digest(&same));
        assert_ne!(frame_digest(&a), frame_digest(&transposed));
        assert_ne!(frame_digest(&a), frame_digest(&recoloured));
        assert_eq!(frame_digest_hex(&a).len(), 16);
    }
}
