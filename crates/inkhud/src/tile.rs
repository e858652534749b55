//! Tiles: rectangular screen regions that applets render into.
//!
//! A tile owns the translation from applet-local coordinates to the
//! (logical, pre-rotation) display space, and the crop that keeps an applet
//! inside its region. User tiles are time-shared between applets; system
//! tiles host a fixed applet such as the notification bar.

// Tile geometry is bounded by the panel size; see the layout tests for the
// ranges exercised.
#![allow(clippy::arithmetic_side_effects, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use embedded_graphics::prelude::Size;

use crate::applet::{Applet, AppletId, RenderContext};
use crate::canvas::{Canvas, Color, DrawingState};

/// Gap between neighbouring user tiles, in pixels.
pub const TILE_SPACING: i32 = 4;

/// Most user tiles a layout can hold.
pub const MAX_USER_TILES: usize = 4;

/// Identifies a tile within the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TileId(pub u8);

impl TileId {
    /// Notification bar.
    pub const NOTIFICATION: Self = Self(0xF0);
    /// Full-screen menu.
    pub const MENU: Self = Self(0xF1);

    /// User tile at `index`.
    pub const fn user(index: u8) -> Self {
        Self(index)
    }
}

/// Whether a tile is shared between applets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TileKind {
    /// Cycled between user applets
    User,
    /// Hosts one fixed system applet
    System,
}

/// Layout failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// Only 1, 2 or 4 user tiles can be laid out.
    #[error("unsupported user tile count {0}")]
    UnsupportedTileCount(u8),
    /// A system tile must have positive width and height.
    #[error("system tile has zero area")]
    ZeroArea,
    /// Display too small for the requested split.
    #[error("display too small for tile layout")]
    DisplayTooSmall,
}

/// Receives pixels that left a tile, in display coordinates.
pub trait PixelSink {
    /// Handle one display-space pixel.
    fn handle_tile_pixel(&mut self, x: i32, y: i32, color: Color);
}

/// A screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    id: TileId,
    kind: TileKind,
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    displayed: Option<AppletId>,
}

impl Tile {
    /// Region of user tile `index` when the display is split `count` ways.
    ///
    /// Two-way splits go side by side on landscape displays and stack on
    /// portrait ones. Four-way splits are quadrants. An `index` beyond
    /// `count` yields an off-canvas placeholder with zero size.
    pub fn place_user_tile(display: Size, count: u8, index: u8) -> Result<Self, LayoutError> {
        let w = display.width as i32;
        let h = display.height as i32;
        let s = TILE_SPACING;

        if !matches!(count, 1 | 2 | 4) {
            error!("cannot lay out {} user tiles", count);
            return Err(LayoutError::UnsupportedTileCount(count));
        }
        if index >= count {
            warn!("user tile {} outside layout of {}", index, count);
            return Ok(Self::placeholder(TileId::user(index)));
        }

        let i = i32::from(index);
        let (left, top, width, height) = match count {
            1 => (0, 0, w, h),
            2 if w > h => {
                let width = w / 2 - s / 2;
                ((w / 2 + s / 2) * i, 0, width, h)
            }
            2 => {
                let height = h / 2 - s / 2;
                (0, (h / 2 + s / 2) * i, w, height)
            }
            _ => {
                // Quadrants. Integer halving can leave the last row / column
                // of an odd-sized display uncovered.
                let width = w / 2 - s / 2;
                let height = h / 2 - s / 2;
                let left = if index % 2 == 1 { (width - 1) + s } else { 0 };
                let top = if index >= 2 { (height - 1) + s } else { 0 };
                (left, top, width, height)
            }
        };

        if width <= 0 || height <= 0 {
            error!("display {}x{} too small for {} tiles", w, h, count);
            return Err(LayoutError::DisplayTooSmall);
        }
        Ok(Self {
            id: TileId::user(index),
            kind: TileKind::User,
            left,
            top,
            width: width as u32,
            height: height as u32,
            displayed: None,
        })
    }

    /// Fixed-position system tile.
    pub fn place_system_tile(
        id: TileId,
        left: i32,
        top: i32,
        width: u32,
        height: u32,
    ) -> Result<Self, LayoutError> {
        if width == 0 || height == 0 {
            error!("system tile {}x{} has no area", width, height);
            return Err(LayoutError::ZeroArea);
        }
        Ok(Self {
            id,
            kind: TileKind::System,
            left,
            top,
            width,
            height,
            displayed: None,
        })
    }

    pub(crate) fn placeholder(id: TileId) -> Self {
        Self {
            id,
            kind: TileKind::User,
            left: -2,
            top: -2,
            width: 0,
            height: 0,
            displayed: None,
        }
    }

    /// Tile id
    pub fn id(&self) -> TileId {
        self.id
    }

    /// User or system
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    /// Left edge in display space.
    pub fn left(&self) -> i32 {
        self.left
    }

    /// Top edge in display space.
    pub fn top(&self) -> i32 {
        self.top
    }

    /// Width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `true` for the zero-size stand-in produced by an out-of-range index.
    pub fn is_placeholder(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Applet currently shown here.
    pub fn displayed_applet(&self) -> Option<AppletId> {
        self.displayed
    }

    /// Change the applet shown here.
    pub fn set_displayed_applet(&mut self, applet: Option<AppletId>) {
        self.displayed = applet;
    }

    /// `true` if the two tiles share at least one pixel.
    pub fn overlaps(&self, other: &Self) -> bool {
        let (ar, ab) = (self.left + self.width as i32, self.top + self.height as i32);
        let (br, bb) = (other.left + other.width as i32, other.top + other.height as i32);
        self.left < br && other.left < ar && self.top < bb && other.top < ab
    }

    /// Translate an applet pixel into display space and forward it if it
    /// lies inside this tile.
    pub fn handle_applet_pixel(&self, x: i32, y: i32, color: Color, sink: &mut dyn PixelSink) {
        let x = x + self.left;
        let y = y + self.top;
        if x < self.left || y < self.top {
            return;
        }
        if x >= self.left + self.width as i32 || y >= self.top + self.height as i32 {
            return;
        }
        sink.handle_tile_pixel(x, y, color);
    }

    /// Attach `applet` to this tile with fresh dimensions, reset its drawing
    /// space and let it render.
    pub fn render(
        &self,
        applet: &mut dyn Applet,
        drawing: &mut DrawingState,
        sink: &mut dyn PixelSink,
        ctx: &RenderContext,
    ) {
        applet.core_mut().attach(self.id);
        drawing.set_dimensions(self.width, self.height);
        let mut canvas = TileCanvas {
            tile: self,
            state: drawing,
            sink,
        };
        canvas.reset_drawing_space();
        applet.core_mut().mark_rendered();
        trace!("render {} into tile {}", applet.core().name(), self.id.0);
        applet.render(&mut canvas, ctx);
    }
}

/// Canvas that routes an applet's output through its tile.
struct TileCanvas<'r> {
    tile: &'r Tile,
    state: &'r mut DrawingState,
    sink: &'r mut dyn PixelSink,
}

impl Canvas for TileCanvas<'_> {
    fn state(&self) -> &DrawingState {
        &*self.state
    }

    fn state_mut(&mut self) -> &mut DrawingState {
        &mut *self.state
    }

    fn emit_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.tile.handle_applet_pixel(x, y, color, &mut *self.sink);
    }
}
