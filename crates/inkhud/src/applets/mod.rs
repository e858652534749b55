//! Built-in applets.
//!
//! [`NotificationApplet`] and [`MenuApplet`] are system applets owned by the
//! window manager. [`RecentMessageApplet`] and [`HeardApplet`] are ordinary
//! user applets the firmware registers like any other.

mod heard;
mod menu;
mod messages;
mod notification;

pub use heard::HeardApplet;
pub use menu::{MenuAction, MenuApplet, MenuEntry, MenuItem, MenuModel, Page};
pub use messages::RecentMessageApplet;
pub use notification::NotificationApplet;
