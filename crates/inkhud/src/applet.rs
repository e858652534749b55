//! Applet base: lifecycle flags, update requests and the [`Applet`] trait.
//!
//! An applet is a stateful UI unit with two independent lifecycle axes:
//!
//! ```text
//! activation:  INACTIVE --activate()--> ACTIVE --deactivate()--> INACTIVE
//! visibility:  BACKGROUND --bring_to_foreground()--> FOREGROUND
//!              FOREGROUND --send_to_background()--> BACKGROUND
//! ```
//!
//! An inactive applet is never foreground, never rendered and holds no event
//! subscriptions. Shared behaviour lives in [`AppletCore`] and the
//! [`Lifecycle`] extension trait rather than in a base type.

use platform::UpdateType;

use crate::canvas::Canvas;
use crate::events::{Event, Topics};
use crate::font::FontSet;
use crate::notification::Notification;
use crate::tile::TileId;
use crate::time;

/// User applets the window manager can register. Settings masks are `u32`.
pub const MAX_APPLETS: usize = 16;

/// Registration index of a user applet. Lower ids win auto-show ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppletId(pub u8);

impl AppletId {
    /// Index into the registry.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Bit for this applet in a settings mask.
    pub fn mask(self) -> u32 {
        1u32.checked_shl(u32::from(self.0)).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Refresh requests
// ---------------------------------------------------------------------------

/// Which tiles a refresh should redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scope {
    /// Only applets that asked for a render.
    Tile,
    /// Every foreground applet.
    AllTiles,
}

/// Intent to refresh the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshRequest {
    /// Requested refresh type. May be promoted to `Full` by the health policy.
    pub update: UpdateType,
    /// `false` blocks the main loop until the panel is idle again.
    pub is_async: bool,
    /// Tiles to redraw
    pub scope: Scope,
    /// Interactive feedback (menu navigation). Stays FAST past the health
    /// threshold, at a higher cost.
    pub responsive: bool,
}

impl RefreshRequest {
    /// Async FAST refresh of the requesting tile.
    pub const fn fast() -> Self {
        Self {
            update: UpdateType::Fast,
            is_async: true,
            scope: Scope::Tile,
            responsive: false,
        }
    }

    /// Async FULL refresh of the requesting tile.
    pub const fn full() -> Self {
        Self {
            update: UpdateType::Full,
            ..Self::fast()
        }
    }

    /// Redraw every tile.
    #[must_use]
    pub const fn all_tiles(mut self) -> Self {
        self.scope = Scope::AllTiles;
        self
    }

    /// Block until the refresh completes.
    #[must_use]
    pub const fn blocking(mut self) -> Self {
        self.is_async = false;
        self
    }

    /// Mark as interactive feedback.
    #[must_use]
    pub const fn responsive(mut self) -> Self {
        self.responsive = true;
        self
    }

    /// Combine two pending requests into one that satisfies both.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            update: self.update.max(other.update),
            is_async: self.is_async && other.is_async,
            scope: if self.scope == Scope::AllTiles || other.scope == Scope::AllTiles {
                Scope::AllTiles
            } else {
                Scope::Tile
            },
            responsive: self.responsive && other.responsive,
        }
    }
}

impl Default for RefreshRequest {
    fn default() -> Self {
        Self::fast()
    }
}

/// Merge `request` into an optional pending slot.
pub(crate) fn coalesce(slot: &mut Option<RefreshRequest>, request: RefreshRequest) {
    *slot = Some(match slot.take() {
        Some(pending) => pending.merge(request),
        None => request,
    });
}

// ---------------------------------------------------------------------------
// AppletCore
// ---------------------------------------------------------------------------

/// State every applet carries.
#[derive(Debug, Clone)]
pub struct AppletCore {
    name: &'static str,
    active: bool,
    foreground: bool,
    want_render: bool,
    want_autoshow: bool,
    request: Option<RefreshRequest>,
    tile: Option<TileId>,
}

impl AppletCore {
    /// Inactive, background applet called `name`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            active: false,
            foreground: false,
            want_render: false,
            want_autoshow: false,
            request: None,
            tile: None,
        }
    }

    /// Applet name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Activated and not yet deactivated.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Currently shown on its tile.
    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    /// A render has been requested and not yet performed.
    pub fn wants_render(&self) -> bool {
        self.want_render
    }

    /// Tile this applet last rendered into.
    pub fn tile(&self) -> Option<TileId> {
        self.tile
    }

    /// Ask to be redrawn. Repeated calls before the next render pass merge.
    pub fn request_update(&mut self, request: RefreshRequest) {
        self.want_render = true;
        coalesce(&mut self.request, request);
    }

    /// Ask to be brought to the foreground because something new arrived.
    pub fn request_autoshow(&mut self) {
        self.want_autoshow = true;
    }

    /// Read and clear the auto-show flag.
    pub fn take_autoshow(&mut self) -> bool {
        core::mem::take(&mut self.want_autoshow)
    }

    /// Read and clear the pending refresh request.
    pub(crate) fn take_request(&mut self) -> Option<RefreshRequest> {
        self.request.take()
    }

    pub(crate) fn attach(&mut self, tile: TileId) {
        self.tile = Some(tile);
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.want_render = false;
    }
}

// ---------------------------------------------------------------------------
// Render context
// ---------------------------------------------------------------------------

/// Read-only information available while rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Default fonts
    pub fonts: FontSet,
    /// Validated wall-clock time, if known.
    pub now: Option<u32>,
    /// Clock readings at or before this are not trusted.
    pub valid_after: u32,
}

impl RenderContext {
    /// Context using the build-time clock floor.
    pub fn new(fonts: FontSet, now: Option<u32>) -> Self {
        Self {
            fonts,
            now,
            valid_after: time::valid_after(),
        }
    }

    /// Humanised age of `timestamp`, or `""` if the clock is not trusted.
    pub fn time_string(&self, timestamp: u32) -> time::TimeString {
        match self.now {
            Some(now) => time::time_string(timestamp, now, self.valid_after),
            None => time::TimeString::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Applet trait
// ---------------------------------------------------------------------------

/// A renderable UI unit.
pub trait Applet {
    /// Shared lifecycle state.
    fn core(&self) -> &AppletCore;

    /// Shared lifecycle state, mutably.
    fn core_mut(&mut self) -> &mut AppletCore;

    /// Draw into `canvas`. The drawing space has already been reset.
    fn render(&mut self, canvas: &mut dyn Canvas, ctx: &RenderContext);

    /// Called when activated.
    fn on_activate(&mut self) {}

    /// Called when deactivated.
    fn on_deactivate(&mut self) {}

    /// Called when brought to the foreground.
    fn on_foreground(&mut self) {}

    /// Called when sent to the background.
    fn on_background(&mut self) {}

    /// Veto hook: return `false` to keep `notification` off screen while this
    /// applet is in the foreground.
    fn approve_notification(&self, _notification: &Notification) -> bool {
        true
    }

    /// Event topics wanted while active.
    fn topics(&self) -> Topics {
        Topics::NONE
    }

    /// Deliver a subscribed event.
    fn on_event(&mut self, _event: &Event<'_>) {}
}

/// Lifecycle transitions, available on every [`Applet`].
pub trait Lifecycle: Applet {
    /// `on_activate`, then mark active.
    fn activate(&mut self) {
        self.on_activate();
        self.core_mut().active = true;
    }

    /// Leave the foreground if needed, run `on_deactivate`, mark inactive.
    fn deactivate(&mut self) {
        if self.core().foreground {
            self.send_to_background();
        }
        if self.core().active {
            self.on_deactivate();
        }
        self.core_mut().active = false;
    }

    /// Show this applet. `on_foreground` runs only on the transition; an
    /// update is requested every time. Inactive applets are left alone.
    fn bring_to_foreground(&mut self) -> bool {
        if !self.core().active {
            return false;
        }
        if !self.core().foreground {
            self.core_mut().foreground = true;
            self.on_foreground();
        }
        self.core_mut().request_update(RefreshRequest::fast());
        true
    }

    /// Hide this applet. `on_background` runs only on the transition.
    fn send_to_background(&mut self) {
        if self.core().foreground {
            self.core_mut().foreground = false;
            self.on_background();
        }
    }
}

impl<T: Applet + ?Sized> Lifecycle for T {}
