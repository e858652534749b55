//! Typed events and the subscription table.
//!
//! External collaborators (radio, RTC, sensors) publish an [`Event`] through
//! the window manager. Only active applets whose subscription covers the
//! event's [`Topic`] receive it. Subscriptions are created when an applet is
//! activated and revoked when it is deactivated, so an inactive applet never
//! sees an event.

use crate::applet::AppletId;

/// Subscriptions the bus can hold.
pub const MAX_SUBSCRIPTIONS: usize = 16;

/// A text message from the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMessage<'m> {
    /// Sender node number
    pub from: u32,
    /// Sender short name, if known
    pub sender_name: Option<&'m str>,
    /// Message body
    pub text: &'m str,
    /// Channel index
    pub channel: u8,
    /// Receive time, epoch seconds. Zero if the clock was unset.
    pub timestamp: u32,
    /// Addressed to this node only
    pub is_dm: bool,
    /// Signal to noise ratio, dB
    pub snr: f32,
    /// Received signal strength, dBm
    pub rssi: f32,
}

/// Any packet heard from a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeHeard<'m> {
    /// Node number
    pub node: u32,
    /// Short name, if known
    pub short_name: Option<&'m str>,
    /// Signal to noise ratio, dB
    pub snr: f32,
    /// Received signal strength, dBm
    pub rssi: f32,
    /// Relay hops, if known. Zero means heard directly.
    pub hops_away: Option<u8>,
    /// Epoch seconds
    pub last_heard: u32,
}

/// Something happened outside the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'e> {
    /// Text message received
    TextMessage(TextMessage<'e>),
    /// Node heard
    NodeHeard(NodeHeard<'e>),
    /// Wall clock advanced (once per minute)
    ClockTick {
        /// Current epoch seconds
        epoch: u32,
    },
    /// Opaque "something changed" from another collaborator
    NewData {
        /// Collaborator-defined source tag
        source: u8,
    },
}

impl Event<'_> {
    /// Topic this event is published under.
    pub fn topic(&self) -> Topic {
        match self {
            Self::TextMessage(_) => Topic::TextMessage,
            Self::NodeHeard(_) => Topic::NodeHeard,
            Self::ClockTick { .. } => Topic::ClockTick,
            Self::NewData { .. } => Topic::NewData,
        }
    }
}

/// Event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topic {
    /// [`Event::TextMessage`]
    TextMessage,
    /// [`Event::NodeHeard`]
    NodeHeard,
    /// [`Event::ClockTick`]
    ClockTick,
    /// [`Event::NewData`]
    NewData,
}

impl Topic {
    const fn bit(self) -> u8 {
        match self {
            Self::TextMessage => 1 << 0,
            Self::NodeHeard => 1 << 1,
            Self::ClockTick => 1 << 2,
            Self::NewData => 1 << 3,
        }
    }
}

/// Set of topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Topics(u8);

impl Topics {
    /// Nothing
    pub const NONE: Self = Self(0);

    /// Single topic.
    pub const fn of(topic: Topic) -> Self {
        Self(topic.bit())
    }

    /// Add `topic`.
    #[must_use]
    pub const fn with(self, topic: Topic) -> Self {
        Self(self.0 | topic.bit())
    }

    /// Membership
    pub const fn contains(self, topic: Topic) -> bool {
        self.0 & topic.bit() != 0
    }

    /// `true` if no topic is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Handle for revoking one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscriptionId(u16);

/// Subscription table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// No free subscription slot.
    #[error("subscription table full")]
    Full,
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    id: SubscriptionId,
    applet: AppletId,
    topics: Topics,
}

/// Who wants which events.
#[derive(Debug, Clone)]
pub struct EventBus<const N: usize = MAX_SUBSCRIPTIONS> {
    subscriptions: heapless::Vec<Subscription, N>,
    next_id: u16,
}

impl<const N: usize> EventBus<N> {
    /// Empty table.
    pub const fn new() -> Self {
        Self {
            subscriptions: heapless::Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe `applet` to `topics`.
    pub fn subscribe(&mut self, applet: AppletId, topics: Topics) -> Result<SubscriptionId, BusError> {
        let id = SubscriptionId(self.next_id);
        self.subscriptions
            .push(Subscription { id, applet, topics })
            .map_err(|_| BusError::Full)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(id)
    }

    /// Revoke one subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Revoke every subscription held by `applet`.
    pub fn unsubscribe_applet(&mut self, applet: AppletId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.applet != applet);
        before.saturating_sub(self.subscriptions.len())
    }

    /// Applets subscribed to `topic`, in subscription order.
    pub fn subscribers(&self, topic: Topic) -> impl Iterator<Item = AppletId> + '_ {
        self.subscriptions
            .iter()
            .filter(move |s| s.topics.contains(topic))
            .map(|s| s.applet)
    }

    /// `true` if `applet` holds any subscription.
    pub fn is_subscribed(&self, applet: AppletId) -> bool {
        self.subscriptions.iter().any(|s| s.applet == applet)
    }

    /// Live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<const N: usize> Default for EventBus<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_filters_by_topic() {
        let mut bus: EventBus<4> = EventBus::new();
        bus.subscribe(AppletId(0), Topics::of(Topic::TextMessage)).unwrap();
        bus.subscribe(AppletId(1), Topics::of(Topic::NodeHeard).with(Topic::ClockTick))
            .unwrap();

        let ev = Event::ClockTick { epoch: 5 };
        let got: std::vec::Vec<_> = bus.subscribers(ev.topic()).collect();
        assert_eq!(got, [AppletId(1)]);
        assert_eq!(bus.subscribers(Topic::NewData).count(), 0);
    }

    #[test]
    fn test_revocation() {
        let mut bus: EventBus<4> = EventBus::new();
        let a = bus.subscribe(AppletId(0), Topics::of(Topic::NewData)).unwrap();
        bus.subscribe(AppletId(1), Topics::of(Topic::NewData)).unwrap();
        bus.subscribe(AppletId(1), Topics::of(Topic::TextMessage)).unwrap();

        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        assert_eq!(bus.unsubscribe_applet(AppletId(1)), 2);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_full_table_rejects() {
        let mut bus: EventBus<1> = EventBus::new();
        bus.subscribe(AppletId(0), Topics::of(Topic::NewData)).unwrap();
        assert_eq!(
            bus.subscribe(AppletId(1), Topics::of(Topic::NewData)),
            Err(BusError::Full)
        );
    }
}
