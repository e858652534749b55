//! Notification content.

use embassy_time::{Duration, Instant};

use crate::events::TextMessage;
use crate::time;

/// Longest stored notification body, in bytes.
pub const TEXT_MAX: usize = 96;
/// Longest stored sender label, in bytes.
pub const SENDER_MAX: usize = 16;

/// What the notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotificationKind {
    /// Message on a shared channel
    ChannelMessage {
        /// Channel index
        channel: u8,
    },
    /// Direct message
    DirectMessage,
}

/// Transient overlay content. A newer notification replaces the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    kind: NotificationKind,
    from: u32,
    sender: heapless::String<SENDER_MAX>,
    text: heapless::String<TEXT_MAX>,
    created: Instant,
    expires_at: Option<Instant>,
}

impl Notification {
    /// Notification for an incoming text message. Long text is truncated at
    /// a character boundary.
    pub fn from_message(message: &TextMessage<'_>, now: Instant, lifetime: Option<Duration>) -> Self {
        let kind = if message.is_dm {
            NotificationKind::DirectMessage
        } else {
            NotificationKind::ChannelMessage {
                channel: message.channel,
            }
        };
        let mut sender = heapless::String::new();
        match message.sender_name {
            Some(name) => push_truncated(&mut sender, name),
            None => push_truncated(&mut sender, &time::node_id_string(message.from)),
        }
        let mut text = heapless::String::new();
        push_truncated(&mut text, message.text);

        Self {
            kind,
            from: message.from,
            sender,
            text,
            created: now,
            expires_at: lifetime.and_then(|l| now.checked_add(l)),
        }
    }

    /// Kind
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Sending node
    pub fn from(&self) -> u32 {
        self.from
    }

    /// Sender label: short name or `!hex` id.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Body
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Time the notification was raised.
    pub fn created(&self) -> Instant {
        self.created
    }

    /// Time it disappears on its own, if ever.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// `true` once the expiry time has passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Append as much of `src` as fits, stopping at a character boundary.
pub(crate) fn push_truncated<const N: usize>(dst: &mut heapless::String<N>, src: &str) {
    for c in src.chars() {
        if dst.push(c).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg<'a>(text: &'a str, name: Option<&'a str>, is_dm: bool) -> TextMessage<'a> {
        TextMessage {
            from: 0xA1B2,
            sender_name: name,
            text,
            channel: 2,
            timestamp: 0,
            is_dm,
            snr: 0.0,
            rssi: -80.0,
        }
    }

    #[test]
    fn test_sender_falls_back_to_node_id() {
        let n = Notification::from_message(&msg("hi", None, false), Instant::from_millis(0), None);
        assert_eq!(n.sender(), "!a1b2");
        assert_eq!(n.kind(), NotificationKind::ChannelMessage { channel: 2 });
    }

    #[test]
    fn test_long_text_truncated_on_char_boundary() {
        let long = "é".repeat(TEXT_MAX);
        let n = Notification::from_message(&msg(&long, Some("bob"), true), Instant::from_millis(0), None);
        assert_eq!(n.text().chars().count(), TEXT_MAX / 2);
        assert_eq!(n.kind(), NotificationKind::DirectMessage);
    }

    #[test]
    fn test_expiry() {
        let n = Notification::from_message(
            &msg("x", Some("a"), false),
            Instant::from_millis(1_000),
            Some(Duration::from_millis(500)),
        );
        assert!(!n.is_expired(Instant::from_millis(1_499)));
        assert!(n.is_expired(Instant::from_millis(1_500)));

        let forever = Notification::from_message(&msg("x", None, false), Instant::from_millis(0), None);
        assert!(!forever.is_expired(Instant::from_millis(u64::MAX / 2)));
    }
}
