//! Display rotation.
//!
//! Applets and tiles work in logical coordinates. Rotation is applied once,
//! when a display-space pixel is written into the panel's native image.

use embedded_graphics::prelude::Size;

/// Clockwise rotation of the logical display relative to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    /// Native orientation
    #[default]
    Degrees0,
    /// Rotate 90° clockwise
    Degrees90,
    /// Rotate 180°
    Degrees180,
    /// Rotate 270° clockwise / 90° counter-clockwise
    Degrees270,
}

impl Rotation {
    /// Rotation from a count of quarter turns (taken modulo 4).
    pub fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Self::Degrees0,
            1 => Self::Degrees90,
            2 => Self::Degrees180,
            _ => Self::Degrees270,
        }
    }

    /// Quarter turns, 0..=3.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Self::Degrees0 => 0,
            Self::Degrees90 => 1,
            Self::Degrees180 => 2,
            Self::Degrees270 => 3,
        }
    }

    /// Next rotation clockwise.
    #[must_use]
    pub fn next(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns().wrapping_add(1))
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Degrees90 | Self::Degrees270)
    }

    /// Logical display size for a panel of `native` size.
    pub fn logical_size(self, native: Size) -> Size {
        if self.swaps_dimensions() {
            Size::new(native.height, native.width)
        } else {
            native
        }
    }

    /// Map a logical pixel to native panel coordinates.
    ///
    /// Returns `None` for pixels outside the logical display.
    pub fn to_native(self, x: i32, y: i32, native: Size) -> Option<(u32, u32)> {
        let logical = self.logical_size(native);
        let x = u32::try_from(x).ok().filter(|x| *x < logical.width)?;
        let y = u32::try_from(y).ok().filter(|y| *y < logical.height)?;
        // Bounds above keep every subtraction non-negative.
        let last_x = native.width.checked_sub(1)?;
        let last_y = native.height.checked_sub(1)?;
        let mapped = match self {
            Self::Degrees0 => (x, y),
            Self::Degrees90 => (last_x.checked_sub(y)?, x),
            Self::Degrees180 => (last_x.checked_sub(x)?, last_y.checked_sub(y)?),
            Self::Degrees270 => (y, last_y.checked_sub(x)?),
        };
        Some(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIVE: Size = Size::new(122, 250);

    #[test]
    fn test_logical_size_swaps_for_quarter_turns() {
        assert_eq!(Rotation::Degrees0.logical_size(NATIVE), NATIVE);
        assert_eq!(Rotation::Degrees90.logical_size(NATIVE), Size::new(250, 122));
        assert_eq!(Rotation::Degrees270.logical_size(NATIVE), Size::new(250, 122));
    }

    #[test]
    fn test_corners_map_to_panel_corners() {
        // Logical top-left lands on a different native corner for each turn.
        assert_eq!(Rotation::Degrees0.to_native(0, 0, NATIVE), Some((0, 0)));
        assert_eq!(Rotation::Degrees90.to_native(0, 0, NATIVE), Some((121, 0)));
        assert_eq!(Rotation::Degrees180.to_native(0, 0, NATIVE), Some((121, 249)));
        assert_eq!(Rotation::Degrees270.to_native(0, 0, NATIVE), Some((0, 249)));
        // Logical bottom-right under 270°: (249, 121) -> (121, 0)
        assert_eq!(
            Rotation::Degrees270.to_native(249, 121, NATIVE),
            Some((121, 0))
        );
    }

    #[test]
    fn test_out_of_bounds_is_dropped() {
        assert_eq!(Rotation::Degrees0.to_native(-1, 0, NATIVE), None);
        assert_eq!(Rotation::Degrees0.to_native(122, 0, NATIVE), None);
        assert_eq!(Rotation::Degrees90.to_native(249, 122, NATIVE), None);
    }

    #[test]
    fn test_next_cycles_through_all_turns() {
        let mut r = Rotation::Degrees0;
        for expected in [1u8, 2, 3, 0] {
            r = r.next();
            assert_eq!(r.quarter_turns(), expected);
        }
    }
}
