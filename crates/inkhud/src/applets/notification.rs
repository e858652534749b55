//! Pop-up bar along the top edge for things the focused applets do not show.

// Pixel math on tile-sized values (a few hundred pixels at most).
#![allow(clippy::arithmetic_side_effects, clippy::cast_possible_wrap)]

use core::fmt::Write;

use crate::applet::{Applet, AppletCore, RefreshRequest, RenderContext};
use crate::canvas::{Canvas, HAlign, VAlign, BLACK, WHITE};
use crate::font::MAX_TEXT;
use crate::notification::{Notification, NotificationKind};

/// Horizontal padding inside the bar.
const PAD: i32 = 2;

/// System applet that owns the current notification.
pub struct NotificationApplet {
    core: AppletCore,
    current: Option<Notification>,
}

impl NotificationApplet {
    /// No notification pending.
    pub const fn new() -> Self {
        Self {
            core: AppletCore::new("Notification"),
            current: None,
        }
    }

    /// Replace the current notification.
    pub fn set(&mut self, notification: Notification) {
        self.current = Some(notification);
        self.core.request_update(RefreshRequest::fast());
    }

    /// Drop the current notification. Returns `false` if there was none.
    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Pending notification, shown or not.
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Bar height for a given line height.
    pub fn bar_height(line_height: u32) -> u32 {
        line_height.saturating_add(6)
    }

    fn label(notification: &Notification) -> heapless::String<MAX_TEXT> {
        let mut out = heapless::String::new();
        let _ = match notification.kind() {
            NotificationKind::DirectMessage => {
                write!(out, "DM {}: {}", notification.sender(), notification.text())
            }
            NotificationKind::ChannelMessage { channel } => write!(
                out,
                "Ch{} {}: {}",
                channel,
                notification.sender(),
                notification.text()
            ),
        };
        out
    }
}

impl Default for NotificationApplet {
    fn default() -> Self {
        Self::new()
    }
}

impl Applet for NotificationApplet {
    fn core(&self) -> &AppletCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AppletCore {
        &mut self.core
    }

    fn render(&mut self, canvas: &mut dyn Canvas, ctx: &RenderContext) {
        let Some(notification) = self.current.as_ref() else {
            return;
        };
        let width = canvas.width() as i32;
        let height = canvas.height() as i32;

        canvas.set_font(ctx.fonts.small);
        canvas.fill_rect(0, 0, width, height, WHITE);
        canvas.draw_line(0, height - 1, width - 1, height - 1, BLACK);
        canvas.draw_line(0, height - 2, width - 1, height - 2, BLACK);

        let label = Self::label(notification);
        let max_width = u32::try_from(width - 2 * PAD).unwrap_or(0);
        let text = canvas.font().fit(&label, max_width);
        canvas.print_at(PAD, (height - 2) / 2, &text, HAlign::Left, VAlign::Middle);
    }

    fn on_deactivate(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::applet::Lifecycle;
    use crate::canvas::testing::GridCanvas;
    use crate::events::TextMessage;
    use crate::font::FontSet;
    use embassy_time::Instant;

    fn note(text: &str, is_dm: bool) -> Notification {
        let msg = TextMessage {
            from: 0x42,
            sender_name: Some("ann"),
            text,
            channel: 1,
            timestamp: 0,
            is_dm,
            snr: 0.0,
            rssi: 0.0,
        };
        Notification::from_message(&msg, Instant::from_millis(0), None)
    }

    #[test]
    fn test_label_prefixes() {
        assert_eq!(NotificationApplet::label(&note("yo", true)), "DM ann: yo");
        assert_eq!(NotificationApplet::label(&note("yo", false)), "Ch1 ann: yo");
    }

    #[test]
    fn test_newer_notification_replaces_older() {
        let mut applet = NotificationApplet::new();
        applet.set(note("first", false));
        applet.set(note("second", false));
        assert_eq!(applet.current().unwrap().text(), "second");
        assert!(applet.dismiss());
        assert!(!applet.dismiss());
    }

    #[test]
    fn test_render_draws_border_and_text() {
        let mut applet = NotificationApplet::new();
        applet.activate();
        applet.set(note("hello there, a long message that will not fit", false));
        let mut canvas = GridCanvas::new(64, 16);
        canvas.reset_drawing_space();
        applet.render(&mut canvas, &RenderContext::new(FontSet::default(), None));
        for x in 0..64 {
            assert!(canvas.black(x, 15));
        }
        assert!(canvas.black_count() > 128);
        assert!(canvas.inked_rows().iter().all(|&y| y < 16));
    }
}
