use std::fmt::{Debug, Formatter};

use bytemuck::{Pod, Zeroable};

/// One RGBA pixel, 8 bits per channel, laid out exactly like a pixel in an
/// `image::RgbaImage` buffer.
#[repr(C)]
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash, Pod, Zeroable)]
pub(crate) struct Rgba8([u8; 4]);

impl Rgba8 {
    pub(crate) const fn to_parts(self) -> (u8, u8, u8, u8) {
        (self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl Debug for Rgba8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (r, g, b, a) = self.to_parts();
        f.debug_struct("Rgba8")
            .field("r", &r)
            .field("g", &g)
            .field("b", &b)
            .field("a", &a)
            .finish()
    }
}

/// Reinterpret a flat RGBA8 byte buffer as pixels.
///
/// Returns `None` if the length is not a multiple of four.
pub(crate) fn as_pixels(bytes: &[u8]) -> Option<&[Rgba8]> {
    bytemuck::try_cast_slice(bytes).ok()
}

pub(crate) fn as_pixels_mut(bytes: &mut [u8]) -> Option<&mut [Rgba8]> {
    bytemuck::try_cast_slice_mut(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinterpret_as_rgba() {
        let arr = vec![0u8, 1, 2, 3, 4, 5, 6, 7];
        let pixels = as_pixels(&arr).unwrap();
        assert_eq!(pixels.len(), 2);
        assert_eq!((0, 1, 2, 3), pixels[0].to_parts());
        assert_eq!((4, 5, 6, 7), pixels[1].to_parts());
    }

    #[test]
    fn reject_partial_pixel() {
        let arr = vec![0u8, 1, 2, 3, 4];
        assert!(as_pixels(&arr).is_none());
    }

    #[test]
    fn write_through_mut_view() {
        let mut arr = vec![0u8; 8];
        as_pixels_mut(&mut arr).unwrap()[1] = Rgba8([9, 8, 7, 6]);
        assert_eq!(arr, vec![0, 0, 0, 0, 9, 8, 7, 6]);
    }
}
