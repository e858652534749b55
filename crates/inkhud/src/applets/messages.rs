//! Most recent text message, full screen or tile.

// Pixel math on tile-sized values.
#![allow(clippy::arithmetic_side_effects, clippy::cast_possible_wrap)]

use crate::applet::{Applet, AppletCore, RefreshRequest, RenderContext};
use crate::canvas::{Canvas, HAlign, VAlign, BLACK};
use crate::events::{Event, TextMessage, Topic, Topics};
use crate::notification::{push_truncated, Notification, NotificationKind};
use crate::signal::SignalStrength;
use crate::time;

const BODY_MAX: usize = 200;
const SENDER_MAX: usize = 16;

#[derive(Debug, Clone)]
struct Stored {
    sender: heapless::String<SENDER_MAX>,
    text: heapless::String<BODY_MAX>,
    timestamp: u32,
    signal: SignalStrength,
}

/// Shows the last text message received.
///
/// Requests auto-show when a message arrives, and keeps message
/// notifications off screen while it is visible.
pub struct RecentMessageApplet {
    core: AppletCore,
    last: Option<Stored>,
    direct_only: bool,
}

impl RecentMessageApplet {
    /// Applet following every channel.
    pub const fn new() -> Self {
        Self {
            core: AppletCore::new("Recent message"),
            last: None,
            direct_only: false,
        }
    }

    /// Only follow direct messages.
    #[must_use]
    pub const fn direct_only(mut self) -> Self {
        self.direct_only = true;
        self.core = AppletCore::new("Last DM");
        self
    }

    /// Body of the stored message.
    pub fn text(&self) -> Option<&str> {
        self.last.as_ref().map(|m| m.text.as_str())
    }

    fn store(&mut self, message: &TextMessage<'_>) {
        let mut sender = heapless::String::new();
        match message.sender_name {
            Some(name) => push_truncated(&mut sender, name),
            None => push_truncated(&mut sender, &time::node_id_string(message.from)),
        }
        let mut text = heapless::String::new();
        push_truncated(&mut text, message.text);
        self.last = Some(Stored {
            sender,
            text,
            timestamp: message.timestamp,
            signal: SignalStrength::classify(message.snr, message.rssi),
        });
    }
}

impl Default for RecentMessageApplet {
    fn default() -> Self {
        Self::new()
    }
}

impl Applet for RecentMessageApplet {
    fn core(&self) -> &AppletCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AppletCore {
        &mut self.core
    }

    fn render(&mut self, canvas: &mut dyn Canvas, ctx: &RenderContext) {
        canvas.set_font(ctx.fonts.small);
        let width = canvas.width();
        let height = canvas.height() as i32;

        let Some(msg) = self.last.as_ref() else {
            canvas.draw_header(self.core.name());
            canvas.print_at(
                (width / 2) as i32,
                height / 2,
                "No messages",
                HAlign::Center,
                VAlign::Middle,
            );
            return;
        };

        canvas.draw_header(&msg.sender);
        let header = canvas.header_height() as i32;
        let age = ctx.time_string(msg.timestamp);
        if !age.is_empty() {
            canvas.print_at(width as i32 - 2, header / 2, &age, HAlign::Right, VAlign::Middle);
        }
        for bar in 0..msg.signal.bars() {
            let bar = i32::from(bar);
            let bar_h = 2 + 2 * bar;
            canvas.fill_rect(2 + 3 * bar, header - 2 - bar_h, 2, bar_h, BLACK);
        }

        // Short messages get the large font.
        canvas.set_font(ctx.fonts.large);
        let body = u32::try_from(height - header).unwrap_or(0);
        if canvas.wrapped_text_height(2, width.saturating_sub(4), &msg.text) > body / 2 {
            canvas.set_font(ctx.fonts.small);
        }
        canvas.print_wrapped(2, header + 2, width.saturating_sub(4), &msg.text);
    }

    fn topics(&self) -> Topics {
        Topics::of(Topic::TextMessage).with(Topic::ClockTick)
    }

    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::TextMessage(message) => {
                if self.direct_only && !message.is_dm {
                    return;
                }
                self.store(message);
                self.core.request_autoshow();
                self.core.request_update(RefreshRequest::fast());
            }
            Event::ClockTick { .. } if self.last.is_some() && self.core.is_foreground() => {
                self.core.request_update(RefreshRequest::fast());
            }
            _ => {}
        }
    }

    fn approve_notification(&self, notification: &Notification) -> bool {
        // Already on screen here.
        match notification.kind() {
            NotificationKind::DirectMessage => false,
            NotificationKind::ChannelMessage { .. } => self.direct_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applet::Lifecycle;
    use crate::canvas::testing::GridCanvas;
    use crate::font::FontSet;
    use embassy_time::Instant;

    fn message(text: &str, is_dm: bool) -> TextMessage<'_> {
        TextMessage {
            from: 7,
            sender_name: None,
            text,
            channel: 0,
            timestamp: 0,
            is_dm,
            snr: 5.0,
            rssi: -60.0,
        }
    }

    #[test]
    fn test_message_requests_autoshow_and_update() {
        let mut applet = RecentMessageApplet::new();
        applet.activate();
        applet.on_event(&Event::TextMessage(message("ping", false)));
        assert_eq!(applet.text(), Some("ping"));
        assert!(applet.core_mut().take_autoshow());
        assert!(applet.core().wants_render());
    }

    #[test]
    fn test_direct_only_ignores_channel_traffic() {
        let mut applet = RecentMessageApplet::new().direct_only();
        applet.on_event(&Event::TextMessage(message("broadcast", false)));
        assert_eq!(applet.text(), None);
        applet.on_event(&Event::TextMessage(message("for you", true)));
        assert_eq!(applet.text(), Some("for you"));
    }

    #[test]
    fn test_vetoes_message_notifications() {
        let applet = RecentMessageApplet::new();
        let n = Notification::from_message(&message("x", false), Instant::from_millis(0), None);
        assert!(!applet.approve_notification(&n));

        // Channel traffic is not shown by a DM-only applet.
        let dm_only = RecentMessageApplet::new().direct_only();
        assert!(dm_only.approve_notification(&n));
    }

    #[test]
    fn test_render_without_message() {
        let mut applet = RecentMessageApplet::new();
        let mut canvas = GridCanvas::new(64, 48);
        canvas.reset_drawing_space();
        applet.render(&mut canvas, &RenderContext::new(FontSet::default(), None));
        assert!(canvas.black_count() > 0);
    }
}
