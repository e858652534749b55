//! Applet fonts.
//!
//! Thin wrapper over an `embedded-graphics` [`MonoFont`] that exposes the
//! cursor-relative metrics the text layout code works in, plus an optional
//! substitution table for characters the font cannot render.

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;

/// Longest string the layout code prepares for drawing in one go.
pub const MAX_TEXT: usize = 256;

/// Marks truncated text.
const ELLIPSIS: &str = "...";

/// Replacement text for one character.
pub type Substitution = (char, &'static str);

/// Font plus layout metrics.
///
/// The cursor sits on the baseline: [`height_above_cursor`](Self::height_above_cursor)
/// rows are drawn above it, [`height_below_cursor`](Self::height_below_cursor)
/// rows from it downwards.
#[derive(Clone, Copy)]
pub struct AppletFont {
    font: &'static MonoFont<'static>,
    substitutions: &'static [Substitution],
}

impl AppletFont {
    /// Wrap `font` with no substitutions.
    pub const fn new(font: &'static MonoFont<'static>) -> Self {
        Self {
            font,
            substitutions: &[],
        }
    }

    /// Replace characters before measuring or drawing.
    #[must_use]
    pub const fn with_substitutions(mut self, substitutions: &'static [Substitution]) -> Self {
        self.substitutions = substitutions;
        self
    }

    /// Underlying mono font.
    pub fn mono(&self) -> &'static MonoFont<'static> {
        self.font
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self) -> u32 {
        self.font.character_size.height
    }

    /// Rows drawn above the cursor.
    pub fn height_above_cursor(&self) -> u32 {
        self.font.baseline
    }

    /// Rows drawn at or below the cursor.
    pub fn height_below_cursor(&self) -> u32 {
        self.font
            .character_size
            .height
            .saturating_sub(self.font.baseline)
    }

    /// Horizontal advance of one character.
    pub fn advance(&self) -> u32 {
        self.font
            .character_size
            .width
            .saturating_add(self.font.character_spacing)
    }

    /// Width of the gap left by a space between two words.
    pub fn width_between_words(&self) -> u32 {
        self.advance()
    }

    /// Rendered width of `text` after substitution, in pixels.
    pub fn text_width(&self, text: &str) -> u32 {
        let chars = self.substituted_len(text);
        if chars == 0 {
            return 0;
        }
        let chars = u32::try_from(chars).unwrap_or(u32::MAX);
        chars
            .saturating_mul(self.advance())
            .saturating_sub(self.font.character_spacing)
    }

    /// Number of glyphs `text` occupies once substituted.
    fn substituted_len(&self, text: &str) -> usize {
        text.chars()
            .map(|c| match self.lookup(c) {
                Some(rep) => rep.chars().count(),
                None => 1,
            })
            .sum()
    }

    fn lookup(&self, c: char) -> Option<&'static str> {
        self.substitutions
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, to)| *to)
    }

    /// `text` with the substitution table applied, one character at a time.
    pub fn substituted_chars(self, text: &str) -> impl Iterator<Item = char> + '_ {
        text.chars().flat_map(move |c| {
            let (kept, rep) = match self.lookup(c) {
                Some(rep) => (None, rep),
                None => (Some(c), ""),
            };
            kept.into_iter().chain(rep.chars())
        })
    }

    /// Apply the substitution table. Output longer than [`MAX_TEXT`] bytes
    /// is cut at a character boundary and a warning is logged; use
    /// [`substituted_chars`](Self::substituted_chars) for unbounded text.
    pub fn substitute(&self, text: &str) -> heapless::String<MAX_TEXT> {
        let mut out = heapless::String::new();
        for c in self.substituted_chars(text) {
            if out.push(c).is_err() {
                warn!("text truncated to {} bytes", MAX_TEXT);
                break;
            }
        }
        out
    }

    /// Substituted `text`, cut down with a trailing `"..."` so it is at most
    /// `max_width` pixels wide.
    pub fn fit(&self, text: &str, max_width: u32) -> heapless::String<MAX_TEXT> {
        let full = self.substitute(text);
        if self.text_width(&full) <= max_width {
            return full;
        }
        let ellipsis_glyphs = ELLIPSIS.len();
        let mut out = heapless::String::new();
        let mut glyphs = 0usize;
        for c in full.chars() {
            glyphs = glyphs.saturating_add(1);
            let total = u32::try_from(glyphs.saturating_add(ellipsis_glyphs)).unwrap_or(u32::MAX);
            let width = total
                .saturating_mul(self.advance())
                .saturating_sub(self.font.character_spacing);
            if width > max_width || out.push(c).is_err() {
                break;
            }
        }
        let _ = out.push_str(ELLIPSIS);
        out
    }

    /// Text style in `color`.
    pub fn style(&self, color: BinaryColor) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyle::new(self.font, color)
    }
}

impl core::fmt::Debug for AppletFont {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppletFont")
            .field("size", &self.font.character_size)
            .field("baseline", &self.font.baseline)
            .finish()
    }
}

impl PartialEq for AppletFont {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.font, other.font)
    }
}

/// Accented Latin characters folded to ASCII.
pub const LATIN_FOLD: &[Substitution] = &[
    ('à', "a"),
    ('á', "a"),
    ('â', "a"),
    ('ä', "a"),
    ('ç', "c"),
    ('è', "e"),
    ('é', "e"),
    ('ê', "e"),
    ('ë', "e"),
    ('ì', "i"),
    ('í', "i"),
    ('ï', "i"),
    ('ñ', "n"),
    ('ò', "o"),
    ('ó', "o"),
    ('ô', "o"),
    ('ö', "o"),
    ('ù', "u"),
    ('ú', "u"),
    ('ü', "u"),
    ('ß', "ss"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2026}', "..."),
];

/// Small and large default fonts handed to applets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSet {
    /// Body text, headers, notification bar.
    pub small: AppletFont,
    /// Emphasised text.
    pub large: AppletFont,
}

impl Default for FontSet {
    fn default() -> Self {
        Self {
            small: AppletFont::new(&FONT_6X10).with_substitutions(LATIN_FOLD),
            large: AppletFont::new(&FONT_9X15).with_substitutions(LATIN_FOLD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_cover_full_glyph_height() {
        let font = AppletFont::new(&FONT_6X10);
        assert_eq!(
            font.height_above_cursor() + font.height_below_cursor(),
            font.line_height()
        );
        assert_eq!(font.advance(), 6);
    }

    #[test]
    fn test_text_width_counts_substituted_glyphs() {
        let font = AppletFont::new(&FONT_6X10).with_substitutions(LATIN_FOLD);
        assert_eq!(font.text_width(""), 0);
        assert_eq!(font.text_width("abc"), 18);
        // 'ß' becomes two glyphs
        assert_eq!(font.text_width("ß"), 12);
        assert_eq!(font.substitute("café…").as_str(), "cafe...");
    }

    #[test]
    fn test_fit_truncates_with_ellipsis() {
        let font = AppletFont::new(&FONT_6X10);
        assert_eq!(font.fit("hello", 100).as_str(), "hello");
        // 10 glyphs of 6 px fit in 60 px (spacing is zero)
        let fitted = font.fit("hello world", 60);
        assert_eq!(fitted.as_str(), "hello w...");
        assert!(font.text_width(&fitted) <= 60);
    }

    #[test]
    fn test_substitution_is_streamed_without_limit() {
        let font = AppletFont::new(&FONT_6X10).with_substitutions(LATIN_FOLD);
        let text = "ß".repeat(200);
        assert_eq!(font.substituted_chars(&text).count(), 400);
        assert!(font.substituted_chars(&text).all(|c| c == 's'));
        // The bounded form stops at the buffer size.
        assert_eq!(font.substitute(&text).len(), MAX_TEXT);
    }
}
