//! Drawing surface handed to applets.
//!
//! [`Canvas`] needs three things from an implementor: the mutable
//! [`DrawingState`] (crop, cursor, font, text colour) and a sink for pixels
//! that survived cropping. Everything else, including the text layout
//! toolkit, is provided on top of [`Canvas::draw_pixel`].
//!
//! Coordinates are applet-local: `(0, 0)` is the top-left of the tile the
//! applet is currently rendered into.

// Layout math mixes i32 screen coordinates with u32 sizes. Sizes are bounded
// by the panel (a few hundred pixels) so the conversions cannot overflow.
#![allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::font::{AppletFont, MAX_TEXT};

/// Pixel colour. `On` is ink (black), `Off` is paper (white).
pub type Color = BinaryColor;

/// Ink.
pub const BLACK: Color = BinaryColor::On;
/// Paper.
pub const WHITE: Color = BinaryColor::Off;

/// Padding above and below header text.
const HEADER_PAD: i32 = 2;

/// Rectangle outside which applet pixels are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    /// Left edge, inclusive
    pub left: i32,
    /// Top edge, inclusive
    pub top: i32,
    /// Width; zero or negative admits nothing
    pub width: i32,
    /// Height; zero or negative admits nothing
    pub height: i32,
}

impl Crop {
    /// Crop that admits no pixel at all.
    pub const NOTHING: Self = Self {
        left: -1,
        top: -1,
        width: 0,
        height: 0,
    };

    /// Crop covering a `width` x `height` region at the origin.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width: width as i32,
            height: height as i32,
        }
    }

    /// `[left, left+width) x [top, top+height)` membership.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left
            && y >= self.top
            && x < self.left.saturating_add(self.width)
            && y < self.top.saturating_add(self.height)
    }
}

/// Horizontal anchor for [`Canvas::print_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    /// `x` is the left edge of the text
    Left,
    /// `x` is the middle of the text
    Center,
    /// `x` is the right edge of the text
    Right,
}

/// Vertical anchor for [`Canvas::print_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    /// `y` is the top of the line
    Top,
    /// `y` is the middle of the line
    Middle,
    /// `y` is the bottom of the line
    Bottom,
}

/// Per-applet drawing state.
#[derive(Debug, Clone, Copy)]
pub struct DrawingState {
    width: u32,
    height: u32,
    crop: Crop,
    cursor: Point,
    font: AppletFont,
    default_font: AppletFont,
    text_color: Color,
}

impl DrawingState {
    /// Fresh state with zero dimensions.
    pub fn new(default_font: AppletFont) -> Self {
        Self {
            width: 0,
            height: 0,
            crop: Crop::full(0, 0),
            cursor: Point::zero(),
            font: default_font,
            default_font,
            text_color: BLACK,
        }
    }

    /// Adopt new tile dimensions. The crop is reset to cover them.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.crop = Crop::full(width, height);
    }

    /// Font restored by [`Canvas::reset_drawing_space`].
    pub fn set_default_font(&mut self, font: AppletFont) {
        self.default_font = font;
    }

    /// Width of the current drawing area.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the current drawing area.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current crop rectangle.
    pub fn crop(&self) -> Crop {
        self.crop
    }
}

/// Applet drawing capability.
pub trait Canvas {
    /// Drawing state.
    fn state(&self) -> &DrawingState;

    /// Mutable drawing state.
    fn state_mut(&mut self) -> &mut DrawingState;

    /// Receives every pixel that passed the crop test.
    fn emit_pixel(&mut self, x: i32, y: i32, color: Color);

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Drawing area width.
    fn width(&self) -> u32 {
        self.state().width
    }

    /// Drawing area height.
    fn height(&self) -> u32 {
        self.state().height
    }

    /// Position `f` of the way across the drawing area.
    fn x(&self, f: f32) -> i32 {
        (self.width() as f32 * f) as i32
    }

    /// Position `f` of the way down the drawing area.
    fn y(&self, f: f32) -> i32 {
        (self.height() as f32 * f) as i32
    }

    // -----------------------------------------------------------------------
    // Pixels and cropping
    // -----------------------------------------------------------------------

    /// Draw one pixel, subject to the crop rectangle.
    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        if self.state().crop.contains(x, y) {
            self.emit_pixel(x, y, color);
        }
    }

    /// Restrict drawing to a sub-rectangle.
    fn set_crop(&mut self, left: i32, top: i32, width: i32, height: i32) {
        self.state_mut().crop = Crop {
            left,
            top,
            width,
            height,
        };
    }

    /// Crop back to the full drawing area.
    fn reset_crop(&mut self) {
        let (w, h) = (self.width(), self.height());
        self.state_mut().crop = Crop::full(w, h);
    }

    /// Fill the whole drawing area.
    fn fill_screen(&mut self, color: Color) {
        let (w, h) = (self.width() as i32, self.height() as i32);
        self.fill_rect(0, 0, w, h, color);
    }

    /// Prepare for a render pass: full crop, white background, default text
    /// settings, cursor at the origin.
    fn reset_drawing_space(&mut self) {
        self.reset_crop();
        self.fill_screen(WHITE);
        let state = self.state_mut();
        state.text_color = BLACK;
        state.cursor = Point::zero();
        state.font = state.default_font;
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Filled rectangle.
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        for py in y..y + h {
            for px in x..x + w {
                self.draw_pixel(px, py, color);
            }
        }
    }

    /// One-pixel rectangle outline.
    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        let rect = Rectangle::new(Point::new(x, y), Size::new(w as u32, h as u32))
            .into_styled(PrimitiveStyle::with_stroke(color, 1));
        let _ = rect.draw(&mut PixelAdapter(&mut *self));
    }

    /// One-pixel line between two points, inclusive.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let line = Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_stroke(color, 1));
        let _ = line.draw(&mut PixelAdapter(&mut *self));
    }

    // -----------------------------------------------------------------------
    // Text state
    // -----------------------------------------------------------------------

    /// Select a font.
    fn set_font(&mut self, font: AppletFont) {
        self.state_mut().font = font;
    }

    /// Current font.
    fn font(&self) -> AppletFont {
        self.state().font
    }

    /// Text colour.
    fn set_text_color(&mut self, color: Color) {
        self.state_mut().text_color = color;
    }

    /// Move the cursor. `y` is the baseline.
    fn set_cursor(&mut self, x: i32, y: i32) {
        self.state_mut().cursor = Point::new(x, y);
    }

    /// Current cursor.
    fn cursor(&self) -> Point {
        self.state().cursor
    }

    /// Rendered width of `text` in the current font.
    fn text_width(&self, text: &str) -> u32 {
        self.font().text_width(text)
    }

    // -----------------------------------------------------------------------
    // Text output
    // -----------------------------------------------------------------------

    /// Draw `text` at the cursor and advance it. No wrapping.
    fn print(&mut self, text: &str) {
        let font = self.font();
        let text = font.substitute(text);
        let origin = self.cursor();
        let style = font.style(self.state().text_color);
        let _ = Text::with_baseline(text.as_str(), origin, style, Baseline::Alphabetic)
            .draw(&mut PixelAdapter(&mut *self));
        let glyphs = text.chars().count() as i32;
        self.state_mut().cursor = Point::new(origin.x + glyphs * font.advance() as i32, origin.y);
    }

    /// Draw `text` anchored at (`x`, `y`).
    fn print_at(&mut self, x: i32, y: i32, text: &str, h: HAlign, v: VAlign) {
        let font = self.font();
        let w = font.text_width(text) as i32;
        let left = match h {
            HAlign::Left => x,
            HAlign::Center => x - w / 2,
            HAlign::Right => x - w,
        };
        let above = font.height_above_cursor() as i32;
        let line = font.line_height() as i32;
        let baseline = match v {
            VAlign::Top => y + above,
            VAlign::Middle => y + above - line / 2,
            VAlign::Bottom => y + above - line,
        };
        self.set_cursor(left, baseline);
        self.print(text);
    }

    /// Overdrawn text for emphasis: `thick_x` by `thick_y` copies spread
    /// evenly around (`x`, `y`). An even count leans one pixel right/down.
    fn print_thick(&mut self, x: i32, y: i32, text: &str, thick_x: u8, thick_y: u8) {
        let (x0, x1) = thick_span(x, thick_x);
        let (y0, y1) = thick_span(y, thick_y);
        for dy in y0..=y1 {
            for dx in x0..=x1 {
                self.print_at(dx, dy, text, HAlign::Center, VAlign::Middle);
            }
        }
    }

    /// Greedy word-wrapped text inside a column `width` pixels wide.
    ///
    /// A word moves to the next line unless it fits together with one
    /// inter-word space. A word at least as wide as the column is broken
    /// between characters. `'\n'` always starts a new line. Text of any
    /// length is laid out; words are buffered one at a time.
    fn print_wrapped(&mut self, left: i32, top: i32, width: u32, text: &str) {
        let font = self.font();
        let right = left + width as i32;
        self.set_cursor(left, top + font.height_above_cursor() as i32);

        let mut word = heapless::String::<MAX_TEXT>::new();
        for c in font.substituted_chars(text) {
            if c == '\n' {
                place_word(self, &word, left, right);
                word.clear();
                newline(self, left);
                continue;
            }
            if word.push(c).is_err() {
                // Longer than the buffer, so far wider than any column.
                place_word(self, &word, left, right);
                word.clear();
                let _ = word.push(c);
            }
            if c == ' ' {
                place_word(self, &word, left, right);
                word.clear();
            }
        }
        place_word(self, &word, left, right);
    }

    /// Height `print_wrapped` would occupy, measured without drawing.
    fn wrapped_text_height(&mut self, left: i32, width: u32, text: &str) -> u32 {
        let saved_crop = self.state().crop;
        let saved_cursor = self.cursor();
        self.state_mut().crop = Crop::NOTHING;
        self.print_wrapped(left, 0, width, text);
        let bottom = self.cursor().y + self.font().height_below_cursor() as i32;
        let state = self.state_mut();
        state.crop = saved_crop;
        state.cursor = saved_cursor;
        bottom.max(0) as u32
    }

    // -----------------------------------------------------------------------
    // Decoration
    // -----------------------------------------------------------------------

    /// Diagonal hatching over a region, lines `spacing` pixels apart.
    fn hatch_region(&mut self, x: i32, y: i32, w: u32, h: u32, spacing: u8, color: Color) {
        let saved = self.state().crop;
        let (w, h) = (w as i32, h as i32);
        self.set_crop(x, y, w, h);
        let step = usize::from(spacing.max(1));
        for i in (0..w + h).step_by(step) {
            self.draw_line(x + i, y, x + i - h, y + h, color);
        }
        self.state_mut().crop = saved;
    }

    /// Height of the area [`draw_header`](Self::draw_header) covers.
    fn header_height(&self) -> u32 {
        (HEADER_PAD * 2) as u32 + self.font().line_height()
    }

    /// Standard applet header: centred title over a dotted divider.
    fn draw_header(&mut self, title: &str) {
        let height = self.header_height() as i32;
        let width = self.width() as i32;
        self.fill_rect(0, 0, width, height, WHITE);
        self.print_at(width / 2, HEADER_PAD, title, HAlign::Center, VAlign::Top);
        let divider = height - 1;
        for x in (0..width).step_by(2) {
            self.draw_pixel(x, divider, BLACK);
        }
    }
}

/// First and last offset for `count` overdrawn copies around `center`.
fn thick_span(center: i32, count: u8) -> (i32, i32) {
    match count {
        0 | 1 => (center, center),
        2 => (center, center + 1),
        n => {
            let half = i32::from(n / 2);
            (center - half, center + half)
        }
    }
}

/// Move the cursor to the start of the next line.
fn newline<C: Canvas + ?Sized>(canvas: &mut C, left: i32) {
    let y = canvas.cursor().y + canvas.font().line_height() as i32;
    canvas.set_cursor(left, y);
}

/// Place one word (with any trailing spaces) at the cursor, wrapping first
/// if it would cross `right`.
fn place_word<C: Canvas + ?Sized>(canvas: &mut C, word: &str, left: i32, right: i32) {
    let font = canvas.font();
    let trimmed = word.trim_end_matches(' ');
    if trimmed.is_empty() {
        // Lone spaces never start a line.
        if canvas.cursor().x > left {
            canvas.print(word);
        }
        return;
    }

    let w = font.text_width(trimmed) as i32;
    if w < right - left {
        let spaced = canvas.cursor().x + w + font.width_between_words() as i32;
        if canvas.cursor().x > left && spaced >= right {
            newline(canvas, left);
        }
        canvas.print(word);
        return;
    }

    // Wider than the whole column: break between characters.
    let glyph = font.text_width("W") as i32;
    let mut buf = [0u8; 4];
    for c in word.chars() {
        if canvas.cursor().x > left && canvas.cursor().x + glyph > right {
            if c == ' ' {
                continue;
            }
            newline(canvas, left);
        }
        canvas.print(c.encode_utf8(&mut buf));
    }
}

/// Routes `embedded-graphics` drawing through [`Canvas::draw_pixel`].
struct PixelAdapter<'c, C: Canvas + ?Sized>(&'c mut C);

impl<C: Canvas + ?Sized> OriginDimensions for PixelAdapter<'_, C> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl<C: Canvas + ?Sized> DrawTarget for PixelAdapter<'_, C> {
    type Color = Color;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.0.draw_pixel(point.x, point.y, color);
        }
        Ok(())
    }
}

/// Canvas over a plain pixel grid, for tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::font::FontSet;

    pub(crate) const W: usize = 64;
    pub(crate) const H: usize = 48;

    pub(crate) struct GridCanvas {
        pub state: DrawingState,
        pub pixels: [[bool; W]; H],
        pub emitted: usize,
    }

    impl GridCanvas {
        pub fn new(width: u32, height: u32) -> Self {
            let mut state = DrawingState::new(FontSet::default().small);
            state.set_dimensions(width, height);
            Self {
                state,
                pixels: [[false; W]; H],
                emitted: 0,
            }
        }

        pub fn black(&self, x: usize, y: usize) -> bool {
            self.pixels[y][x]
        }

        pub fn black_count(&self) -> usize {
            self.pixels.iter().flatten().filter(|p| **p).count()
        }

        /// Rows containing at least one black pixel.
        pub fn inked_rows(&self) -> std::vec::Vec<usize> {
            (0..H)
                .filter(|y| self.pixels[*y].iter().any(|p| *p))
                .collect()
        }
    }

    impl Canvas for GridCanvas {
        fn state(&self) -> &DrawingState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut DrawingState {
            &mut self.state
        }

        fn emit_pixel(&mut self, x: i32, y: i32, color: Color) {
            self.emitted += 1;
            if (0..W as i32).contains(&x) && (0..H as i32).contains(&y) {
                self.pixels[y as usize][x as usize] = color == BLACK;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::testing::GridCanvas;
    use super::*;

    #[test]
    fn test_crop_bounds_are_half_open() {
        let crop = Crop {
            left: 2,
            top: 3,
            width: 4,
            height: 5,
        };
        assert!(crop.contains(2, 3));
        assert!(crop.contains(5, 7));
        assert!(!crop.contains(6, 3));
        assert!(!crop.contains(2, 8));
        assert!(!crop.contains(1, 3));
        assert!(!Crop::NOTHING.contains(-1, -1));
    }

    #[test]
    fn test_draw_pixel_respects_crop() {
        let mut c = GridCanvas::new(64, 48);
        c.set_crop(10, 10, 5, 5);
        c.draw_pixel(9, 10, BLACK);
        c.draw_pixel(10, 10, BLACK);
        c.draw_pixel(14, 14, BLACK);
        c.draw_pixel(15, 14, BLACK);
        assert_eq!(c.black_count(), 2);
        assert!(c.black(10, 10) && c.black(14, 14));
    }

    #[test]
    fn test_reset_drawing_space_restores_defaults() {
        let mut c = GridCanvas::new(64, 48);
        c.fill_rect(0, 0, 4, 4, BLACK);
        c.set_crop(0, 0, 1, 1);
        c.set_cursor(20, 20);
        c.set_text_color(WHITE);
        c.reset_drawing_space();
        assert_eq!(c.black_count(), 0);
        assert_eq!(c.state().crop(), Crop::full(64, 48));
        assert_eq!(c.cursor(), Point::zero());
        assert_eq!(c.state().text_color, BLACK);
    }

    #[test]
    fn test_measuring_wrapped_text_emits_no_pixels() {
        let mut c = GridCanvas::new(64, 48);
        let h = c.wrapped_text_height(0, 60, "one two three four five");
        assert_eq!(c.emitted, 0);
        let line = c.font().line_height();
        // 6px glyphs in a 60px column, each word needing room for a space
        // after it: "one two" / "three" / "four" / "five"
        assert_eq!(h, 4 * line);
        assert_eq!(c.state().crop(), Crop::full(64, 48));
    }

    #[test]
    fn test_wrap_reserves_inter_word_space() {
        let mut c = GridCanvas::new(64, 48);
        let line = c.font().line_height();
        // "ab " ends at 18; "cd" needs 18 + 12 + 6 = 36 < 40.
        assert_eq!(c.wrapped_text_height(0, 40, "ab cd"), line);
        // "abc " ends at 24; "de" needs 24 + 12 + 6 = 42, over 40.
        assert_eq!(c.wrapped_text_height(0, 40, "abc de"), 2 * line);
        // Exactly reaching the edge still wraps.
        assert_eq!(c.wrapped_text_height(0, 42, "abc de"), 2 * line);
        assert_eq!(c.wrapped_text_height(0, 43, "abc de"), line);
    }

    #[test]
    fn test_wrap_measures_text_longer_than_buffer() {
        let mut c = GridCanvas::new(64, 48);
        let line = c.font().line_height();
        // 100 words "ab " in a 24px column: one word per line.
        let text = "ab ".repeat(100);
        assert!(text.len() > MAX_TEXT);
        assert_eq!(c.wrapped_text_height(0, 24, &text), 100 * line);
        // One unbroken 300-glyph word, 5 glyphs per 30px line.
        let word = "x".repeat(300);
        assert_eq!(c.wrapped_text_height(0, 30, &word), 60 * line);
    }

    #[test]
    fn test_wrap_keeps_words_whole() {
        let mut c = GridCanvas::new(64, 48);
        // "abc" fits in 30px but "abc abc" does not.
        let h = c.wrapped_text_height(0, 30, "abc abc");
        assert_eq!(h, 2 * c.font().line_height());
        let one = c.wrapped_text_height(0, 30, "abcde");
        assert_eq!(one, c.font().line_height());
    }

    #[test]
    fn test_wrap_splits_overlong_word_by_character() {
        let mut c = GridCanvas::new(64, 48);
        // 12 glyphs of 6px in a 30px column: 5 per line.
        let h = c.wrapped_text_height(0, 30, "abcdefghijkl");
        assert_eq!(h, 3 * c.font().line_height());
    }

    #[test]
    fn test_explicit_newline_always_breaks() {
        let mut c = GridCanvas::new(64, 48);
        let h = c.wrapped_text_height(0, 60, "a\nb");
        assert_eq!(h, 2 * c.font().line_height());
        let h = c.wrapped_text_height(0, 60, "a\n\nb");
        assert_eq!(h, 3 * c.font().line_height());
    }

    #[test]
    fn test_print_wrapped_draws_text_before_newline() {
        let mut c = GridCanvas::new(64, 48);
        c.print_wrapped(0, 0, 60, "H\nH");
        let rows = c.inked_rows();
        let line = c.font().line_height() as usize;
        assert!(rows.iter().any(|r| *r < line));
        assert!(rows.iter().any(|r| *r >= line && *r < 2 * line));
    }

    #[test]
    fn test_print_at_alignment() {
        let mut c = GridCanvas::new(64, 48);
        c.print_at(32, 0, "HH", HAlign::Center, VAlign::Top);
        // 12px wide, centred on 32
        assert_eq!(c.cursor().x, 26 + 12);
        c.print_at(64, 47, "H", HAlign::Right, VAlign::Bottom);
        assert_eq!(c.cursor().x, 64);
        let rows = c.inked_rows();
        assert!(rows.iter().all(|r| *r < 48));
        assert!(rows.iter().any(|r| *r > 40));
    }

    /// Leftmost and rightmost inked columns.
    fn inked_columns(c: &GridCanvas) -> (usize, usize) {
        let cols: std::vec::Vec<usize> = (0..super::testing::W)
            .filter(|x| (0..super::testing::H).any(|y| c.black(*x, y)))
            .collect();
        (cols[0], cols[cols.len() - 1])
    }

    #[test]
    fn test_print_thick_spreads_both_ways() {
        let mut plain = GridCanvas::new(64, 48);
        plain.print_at(32, 24, "I", HAlign::Center, VAlign::Middle);
        let (l, r) = inked_columns(&plain);

        let mut thick = GridCanvas::new(64, 48);
        thick.print_thick(32, 24, "I", 3, 1);
        assert_eq!(inked_columns(&thick), (l - 1, r + 1));

        let mut even = GridCanvas::new(64, 48);
        even.print_thick(32, 24, "I", 2, 1);
        assert_eq!(inked_columns(&even), (l, r + 1));
    }

    #[test]
    fn test_hatch_region_stays_inside_region() {
        let mut c = GridCanvas::new(64, 48);
        c.hatch_region(10, 10, 20, 10, 4, BLACK);
        assert!(c.black_count() > 0);
        for y in 0..48 {
            for x in 0..64 {
                if c.black(x, y) {
                    assert!((10..30).contains(&x) && (10..20).contains(&y));
                }
            }
        }
        assert_eq!(c.state().crop(), Crop::full(64, 48));
    }

    #[test]
    fn test_header_divider_is_dotted() {
        let mut c = GridCanvas::new(64, 48);
        c.draw_header("Hi");
        let y = c.header_height() as usize - 1;
        assert!(c.black(0, y));
        assert!(!c.black(1, y));
        assert!(c.black(2, y));
    }

    #[test]
    fn test_relative_coordinates() {
        let c = GridCanvas::new(64, 48);
        assert_eq!(c.x(0.5), 32);
        assert_eq!(c.y(0.25), 12);
    }
}
