//! Packed 1bpp panel image.
//!
//! Format: each byte holds 8 pixels, MSB-first, rows padded to whole bytes,
//! in native panel orientation. `BinaryColor::Off` (white) sets the bit,
//! `BinaryColor::On` (black) clears it.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::Size;
use platform::image_len;

use crate::canvas::Color;
use crate::rotation::Rotation;
use crate::tile::PixelSink;

/// Image buffer borrowed from the application.
pub struct ImageBuffer<'a> {
    bytes: &'a mut [u8],
    native: Size,
    rotation: Rotation,
}

impl<'a> ImageBuffer<'a> {
    /// Wrap `bytes` as the image of a `native`-sized panel.
    ///
    /// Returns `None` if `bytes` is not exactly the packed image size.
    pub fn new(bytes: &'a mut [u8], native: Size) -> Option<Self> {
        if bytes.len() != image_len(native.width, native.height) {
            return None;
        }
        Some(Self {
            bytes,
            native,
            rotation: Rotation::Degrees0,
        })
    }

    /// Apply `rotation` to subsequent writes.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Current rotation
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Logical size after rotation.
    pub fn logical_size(&self) -> Size {
        self.rotation.logical_size(self.native)
    }

    /// Fill the whole image.
    pub fn clear(&mut self, color: Color) {
        let fill = match color {
            BinaryColor::Off => 0xFF,
            BinaryColor::On => 0x00,
        };
        self.bytes.fill(fill);
    }

    /// Raw packed bytes, ready for the driver.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    /// Byte index and bit mask of a native pixel.
    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        let row = self.native.width.div_ceil(8) as usize;
        let index = (y as usize)
            .checked_mul(row)?
            .checked_add(x as usize / 8)?;
        // x % 8 is in 0..=7, so the shift cannot overflow.
        let mask = 0x80u8.checked_shr(x % 8)?;
        Some((index, mask))
    }

    /// Colour of logical pixel (`x`, `y`), if on screen.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        let (nx, ny) = self.rotation.to_native(x, y, self.native)?;
        let (index, mask) = self.locate(nx, ny)?;
        let byte = self.bytes.get(index)?;
        Some(if byte & mask == 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        })
    }

    /// Write logical pixel (`x`, `y`). Off-screen pixels are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some((nx, ny)) = self.rotation.to_native(x, y, self.native) else {
            return;
        };
        let Some((index, mask)) = self.locate(nx, ny) else {
            return;
        };
        if let Some(byte) = self.bytes.get_mut(index) {
            match color {
                BinaryColor::Off => *byte |= mask,
                BinaryColor::On => *byte &= !mask,
            }
        }
    }
}

impl PixelSink for ImageBuffer<'_> {
    fn handle_tile_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.set_pixel(x, y, color);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, WHITE};

    #[test]
    fn test_rejects_wrongly_sized_buffer() {
        let mut bytes = [0u8; 7];
        assert!(ImageBuffer::new(&mut bytes, Size::new(16, 4)).is_none());
    }

    #[test]
    fn test_msb_first_white_is_one() {
        let mut bytes = [0u8; 4];
        let mut img = ImageBuffer::new(&mut bytes, Size::new(16, 2)).unwrap();
        img.clear(WHITE);
        img.set_pixel(0, 0, BLACK);
        img.set_pixel(9, 1, BLACK);
        assert_eq!(img.as_bytes(), &[0x7F, 0xFF, 0xFF, 0xBF]);
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(1, 0), Some(WHITE));
    }

    #[test]
    fn test_rotated_write_lands_on_native_pixel() {
        let mut bytes = [0xFFu8; 4];
        let mut img = ImageBuffer::new(&mut bytes, Size::new(16, 2)).unwrap();
        img.set_rotation(Rotation::Degrees90);
        assert_eq!(img.logical_size(), Size::new(2, 16));
        // logical (0, 0) -> native (15, 0)
        img.set_pixel(0, 0, BLACK);
        assert_eq!(img.as_bytes(), &[0xFF, 0xFE, 0xFF, 0xFF]);
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        img.set_pixel(2, 0, BLACK);
        assert_eq!(img.pixel(2, 0), None);
    }
}
