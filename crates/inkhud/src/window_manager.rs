//! The window manager: tiles, applet registry, refresh scheduling.
//!
//! One [`WindowManager`] exists per display. It is the only caller of the
//! e-ink driver, so at most one refresh is ever in flight. Applets never
//! trigger a refresh directly: they set their pending-render flag and the
//! next [`WindowManager::run`] pass merges every pending request into one
//! physical refresh.
//!
//! ```text
//! run(now)
//!   ├─ poll in-flight refresh ── still busy ──▶ PollAt(next poll)
//!   ├─ expire notification
//!   ├─ auto-show (earliest registered permitted requester)
//!   ├─ notification arbitration (foreground applets may veto)
//!   ├─ collect + merge applet requests
//!   └─ render dirty tiles ─▶ health policy picks FAST/FULL ─▶ start refresh
//! ```

// Indices are bounded by MAX_APPLETS / MAX_USER_TILES, both far below u8::MAX.
#![allow(clippy::cast_possible_truncation)]

use core::fmt;

use embassy_time::{Duration, Instant};
use heapless::Vec;
use platform::config::DEFAULT_LONG_PRESS_MS;
use platform::{EInkDriver, SettingsStore, UpdateType};

use crate::applet::{coalesce, Applet, AppletId, Lifecycle, RefreshRequest, RenderContext, Scope, MAX_APPLETS};
use crate::applets::{MenuAction, MenuApplet, MenuEntry, MenuModel, NotificationApplet};
use crate::canvas::{DrawingState, WHITE};
use crate::events::{BusError, Event, EventBus};
use crate::font::FontSet;
use crate::health::DisplayHealth;
use crate::image::ImageBuffer;
use crate::notification::Notification;
use crate::refresh::{PollOutcome, RefreshState, RefreshTracker};
use crate::settings::{Settings, SettingsError};
use crate::tile::{LayoutError, Tile, TileId, MAX_USER_TILES};

/// Aux presses held at least this long force a FULL refresh.
pub const AUX_HOLD: Duration = Duration::from_millis(DEFAULT_LONG_PRESS_MS);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Window manager failures. `E` is the display driver's error type.
#[derive(Debug)]
pub enum WindowManagerError<E: fmt::Debug> {
    /// Tile layout cannot be computed (unsupported tile count, zero area).
    Layout(LayoutError),
    /// Image buffer length does not match the panel.
    InvalidBuffer,
    /// No room for another applet.
    RegistryFull,
    /// `begin` called with nothing registered.
    NoApplets,
    /// Display driver failed.
    Driver(E),
}

impl<E: fmt::Debug> From<LayoutError> for WindowManagerError<E> {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

impl<E: fmt::Debug> fmt::Display for WindowManagerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "tile layout failed: {e}"),
            Self::InvalidBuffer => f.write_str("image buffer does not match the panel"),
            Self::RegistryFull => f.write_str("applet registry full"),
            Self::NoApplets => f.write_str("no applets registered"),
            Self::Driver(e) => write!(f, "display driver error: {e:?}"),
        }
    }
}

/// What the caller's scheduler should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing pending; run again when input or an event arrives.
    Idle,
    /// A refresh is in flight; run again at this instant.
    PollAt(Instant),
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Registered<'a> {
    applet: &'a mut dyn Applet,
    drawing: DrawingState,
    autostart: bool,
}

struct System<A> {
    applet: A,
    tile: Tile,
    drawing: DrawingState,
}

impl<A> System<A> {
    fn new(applet: A, id: TileId, fonts: FontSet) -> Self {
        Self {
            applet,
            tile: Tile::placeholder(id),
            drawing: DrawingState::new(fonts.small),
        }
    }
}

// ---------------------------------------------------------------------------
// WindowManager
// ---------------------------------------------------------------------------

/// Compositor root. Owns the driver, borrows the image buffer and the user
/// applets for its whole lifetime.
pub struct WindowManager<'a, D: EInkDriver> {
    driver: D,
    image: ImageBuffer<'a>,
    settings: Settings,
    fonts: FontSet,
    applets: Vec<Registered<'a>, MAX_APPLETS>,
    tiles: Vec<Tile, MAX_USER_TILES>,
    notification: System<NotificationApplet>,
    menu: System<MenuApplet>,
    bus: EventBus,
    health: DisplayHealth,
    refresh: RefreshTracker,
    pending: Option<RefreshRequest>,
    clock: Option<u32>,
    notification_shown: bool,
    notification_suppressed: bool,
    notification_lifetime: Option<Duration>,
    aux_pressed_at: Option<Instant>,
    settings_dirty: bool,
    started: bool,
}

type WmResult<T, D> = Result<T, WindowManagerError<<D as EInkDriver>::DriverError>>;

impl<'a, D: EInkDriver> WindowManager<'a, D> {
    /// Wrap `driver` and its image buffer.
    ///
    /// # Errors
    ///
    /// [`WindowManagerError::InvalidBuffer`] if `buffer` is not exactly
    /// the packed size of the panel.
    pub fn new(driver: D, buffer: &'a mut [u8], settings: Settings, fonts: FontSet) -> WmResult<Self, D> {
        let mut image = ImageBuffer::new(buffer, driver.size()).ok_or(WindowManagerError::InvalidBuffer)?;
        image.set_rotation(settings.rotation());
        Ok(Self {
            driver,
            image,
            settings,
            fonts,
            applets: Vec::new(),
            tiles: Vec::new(),
            notification: System::new(NotificationApplet::new(), TileId::NOTIFICATION, fonts),
            menu: System::new(MenuApplet::new(), TileId::MENU, fonts),
            bus: EventBus::new(),
            health: DisplayHealth::new(settings.resilience),
            refresh: RefreshTracker::new(),
            pending: None,
            clock: None,
            notification_shown: false,
            notification_suppressed: false,
            notification_lifetime: None,
            aux_pressed_at: None,
            settings_dirty: false,
            started: false,
        })
    }

    /// Let notifications disappear on their own after `lifetime`.
    #[must_use]
    pub fn with_notification_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.notification_lifetime = lifetime;
        self
    }

    /// Register a user applet. Registration order is auto-show priority.
    ///
    /// # Errors
    ///
    /// [`WindowManagerError::RegistryFull`] past [`MAX_APPLETS`].
    pub fn add_applet(&mut self, applet: &'a mut dyn Applet, autostart: bool) -> WmResult<AppletId, D> {
        let id = AppletId(self.applets.len() as u8);
        debug!("registering applet {} as {}", applet.core().name(), id.0);
        self.applets
            .push(Registered {
                applet,
                drawing: DrawingState::new(self.fonts.small),
                autostart,
            })
            .map_err(|_| WindowManagerError::RegistryFull)?;
        Ok(id)
    }

    /// Start the display: lay out tiles, activate applets, run one blocking
    /// FULL refresh.
    ///
    /// # Errors
    ///
    /// An unsupported tile count is fatal and returned as
    /// [`WindowManagerError::Layout`]. Driver failures are passed through.
    pub fn begin(&mut self, now: Instant) -> WmResult<(), D> {
        if self.applets.is_empty() {
            return Err(WindowManagerError::NoApplets);
        }
        self.driver.begin().map_err(WindowManagerError::Driver)?;
        self.layout()?;

        let active_mask = self.settings.applets.active;
        for i in 0..self.applets.len() {
            let id = AppletId(i as u8);
            let wanted = match (active_mask, self.applets.get(i)) {
                (Some(mask), _) => mask & id.mask() != 0,
                (None, Some(slot)) => slot.autostart,
                (None, None) => false,
            };
            if wanted {
                self.activate_applet(id);
            }
        }
        if self.active_count() == 0 {
            warn!("no applet selected to run, activating the first");
            self.activate_applet(AppletId(0));
        }

        self.notification.applet.activate();
        self.menu.applet.activate();
        self.assign_tiles();
        self.started = true;

        info!(
            "started with {} applets on {} tiles",
            self.applets.len(),
            self.tiles.len()
        );
        self.pending = Some(RefreshRequest::full().all_tiles().blocking());
        self.collect_requests();
        self.render_pass(now)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// One scheduler pass. Call again at [`RunOutcome::PollAt`], or after
    /// input / events when [`RunOutcome::Idle`].
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub fn run(&mut self, now: Instant) -> WmResult<RunOutcome, D> {
        match self.refresh.poll(&mut self.driver, now).map_err(WindowManagerError::Driver)? {
            PollOutcome::Pending(at) => return Ok(RunOutcome::PollAt(at)),
            PollOutcome::Completed(_) | PollOutcome::Idle => {}
        }
        if !self.started {
            return Ok(RunOutcome::Idle);
        }

        if self
            .notification
            .applet
            .current()
            .is_some_and(|n| n.is_expired(now))
        {
            debug!("notification expired");
            self.dismiss_notification();
        }
        self.apply_autoshow();
        self.arbitrate_notification();
        self.collect_requests();
        self.render_pass(now)
    }

    /// Ask for a refresh from outside any applet.
    pub fn request_update(&mut self, request: RefreshRequest) {
        coalesce(&mut self.pending, request);
    }

    /// Deliver `event` to subscribed applets. Text messages also raise a
    /// notification when notifications are enabled.
    pub fn publish(&mut self, event: &Event<'_>, now: Instant) {
        match event {
            Event::TextMessage(message) if self.settings.notifications_enabled => {
                let n = Notification::from_message(message, now, self.notification_lifetime);
                self.notification.applet.set(n);
                self.notification_suppressed = false;
            }
            Event::ClockTick { epoch } => self.clock = Some(*epoch),
            _ => {}
        }

        let mut targets: Vec<AppletId, MAX_APPLETS> = Vec::new();
        for id in self.bus.subscribers(event.topic()) {
            targets.push(id).ok();
        }
        for id in targets {
            if let Some(slot) = self.applets.get_mut(id.index()) {
                if slot.applet.core().is_active() {
                    slot.applet.on_event(event);
                }
            }
        }
    }

    /// Set the validated wall-clock time used for humanised ages.
    pub fn set_clock(&mut self, epoch: Option<u32>) {
        self.clock = epoch;
    }

    /// Persist settings changed through the menu, if any.
    ///
    /// # Errors
    ///
    /// Encoding or storage failure. The dirty flag is kept so a later call
    /// can retry.
    pub fn save_settings_if_dirty<S: SettingsStore>(&mut self, store: &mut S) -> Result<bool, SettingsError> {
        if !self.settings_dirty {
            return Ok(false);
        }
        self.settings.save(store)?;
        self.settings_dirty = false;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Short press: menu cursor, notification dismissal, or next applet on
    /// the focused tile.
    pub fn handle_button_short(&mut self) {
        if self.menu_open() {
            self.menu.applet.move_cursor();
        } else if self.notification_shown {
            self.dismiss_notification();
        } else {
            self.cycle_applet();
        }
    }

    /// Long press: open the menu, or select inside it.
    pub fn handle_button_long(&mut self) {
        if !self.menu_open() {
            self.open_menu();
            return;
        }
        if let Some(action) = self.menu.applet.select() {
            self.apply_menu_action(action);
        }
    }

    /// Aux button pressed.
    pub fn handle_aux_down(&mut self, now: Instant) {
        self.aux_pressed_at = Some(now);
    }

    /// Aux button released: a hold forces a FULL refresh; a tap dismisses a
    /// notification, closes the menu, or focuses the next tile.
    pub fn handle_aux_up(&mut self, now: Instant) {
        let held = self
            .aux_pressed_at
            .take()
            .and_then(|down| now.checked_duration_since(down));
        match held {
            Some(held) if held >= AUX_HOLD => {
                debug!("aux hold: full refresh");
                coalesce(&mut self.pending, RefreshRequest::full().all_tiles());
            }
            _ if self.notification_shown => self.dismiss_notification(),
            _ if self.menu_open() => self.close_menu(),
            _ => self.focus_next_tile(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings changed since the last save.
    pub fn settings_dirty(&self) -> bool {
        self.settings_dirty
    }

    /// Display driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Display driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// User tiles of the current layout.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Index of the tile receiving button input.
    pub fn focused_tile(&self) -> usize {
        usize::from(self.settings.user_tiles.focused)
    }

    /// Registered applet.
    pub fn applet(&self, id: AppletId) -> Option<&dyn Applet> {
        self.applets.get(id.index()).map(|slot| &*slot.applet)
    }

    /// Menu is on screen.
    pub fn menu_open(&self) -> bool {
        self.menu.applet.core().is_foreground()
    }

    /// Menu applet, for inspecting its page and cursor.
    pub fn menu(&self) -> &MenuApplet {
        &self.menu.applet
    }

    /// Notification bar is on screen.
    pub fn notification_visible(&self) -> bool {
        self.notification_shown
    }

    /// Pending notification, shown or suppressed.
    pub fn notification(&self) -> Option<&Notification> {
        self.notification.applet.current()
    }

    /// Refresh health counters.
    pub fn health(&self) -> &DisplayHealth {
        &self.health
    }

    /// Refresh state machine.
    pub fn refresh_state(&self) -> RefreshState {
        self.refresh.state()
    }

    /// Merged request waiting for the next pass.
    pub fn pending_request(&self) -> Option<RefreshRequest> {
        self.pending
    }

    /// Event subscriptions.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn render_pass(&mut self, now: Instant) -> WmResult<RunOutcome, D> {
        let Some(request) = self.pending.take() else {
            return Ok(RunOutcome::Idle);
        };
        let ctx = RenderContext::new(self.fonts, self.clock);
        let all = request.scope == Scope::AllTiles;
        if all {
            self.image.clear(WHITE);
        }

        if self.menu_open() {
            let model = self.menu_model();
            self.menu.applet.set_model(model);
            let menu = &mut self.menu;
            menu.tile
                .render(&mut menu.applet, &mut menu.drawing, &mut self.image, &ctx);
        } else {
            let mut rendered_any = false;
            for tile in &self.tiles {
                let Some(id) = tile.displayed_applet() else {
                    continue;
                };
                let Some(slot) = self.applets.get_mut(id.index()) else {
                    continue;
                };
                if all || slot.applet.core().wants_render() {
                    tile.render(&mut *slot.applet, &mut slot.drawing, &mut self.image, &ctx);
                    rendered_any = true;
                }
            }

            let bar = &mut self.notification;
            if self.notification_shown && (all || rendered_any || bar.applet.core().wants_render()) {
                bar.tile
                    .render(&mut bar.applet, &mut bar.drawing, &mut self.image, &ctx);
            }
        }

        let fast_ok = self.driver.supports(UpdateType::Fast);
        let update = self.health.select(request.update, request.responsive, fast_ok);
        let outcome = self
            .refresh
            .start(&mut self.driver, self.image.as_bytes(), update, request.is_async, now)
            .map_err(WindowManagerError::Driver)?;
        Ok(match outcome {
            PollOutcome::Pending(at) => RunOutcome::PollAt(at),
            PollOutcome::Completed(_) | PollOutcome::Idle => RunOutcome::Idle,
        })
    }

    /// Merge the requests of everything on screen; drop the rest.
    fn collect_requests(&mut self) {
        let menu_open = self.menu_open();
        for slot in &mut self.applets {
            let core = slot.applet.core_mut();
            let request = core.take_request();
            if !core.is_foreground() {
                core.mark_rendered();
                continue;
            }
            if let (Some(request), false) = (request, menu_open) {
                coalesce(&mut self.pending, request);
            }
        }

        let request = self.notification.applet.core_mut().take_request();
        if let (Some(request), true) = (request, self.notification_shown && !menu_open) {
            coalesce(&mut self.pending, request);
        }

        let request = self.menu.applet.core_mut().take_request();
        if let (Some(request), true) = (request, menu_open) {
            coalesce(&mut self.pending, request);
        }
    }

    // -----------------------------------------------------------------------
    // Auto-show and notifications
    // -----------------------------------------------------------------------

    /// Show the earliest-registered applet that asked and is allowed to.
    /// Every flag is cleared, winner or not.
    fn apply_autoshow(&mut self) {
        let mut winner = None;
        for (i, slot) in self.applets.iter_mut().enumerate() {
            let id = AppletId(i as u8);
            let asked = slot.applet.core_mut().take_autoshow();
            if !asked || winner.is_some() || !slot.applet.core().is_active() {
                continue;
            }
            if self.settings.applets.may_autoshow(id) {
                winner = Some(id);
            } else {
                trace!("auto-show denied for applet {}", id.0);
            }
        }

        let Some(id) = winner else { return };
        if self.menu_open() || self.displayed_on(id).is_some() {
            return;
        }
        debug!("auto-showing applet {}", id.0);
        self.show_on_tile(self.focused_tile(), id);
    }

    /// Show or hide the bar depending on whether any foreground applet
    /// vetoes the current notification.
    fn arbitrate_notification(&mut self) {
        let approved = self.notification.applet.current().map(|n| {
            self.settings.notifications_enabled
                && !self.menu_open()
                && self.tiles.iter().all(|tile| {
                    tile.displayed_applet()
                        .and_then(|id| self.applets.get(id.index()))
                        .map_or(true, |slot| slot.applet.approve_notification(n))
                })
        });

        match (approved, self.notification_shown) {
            (Some(true), false) => {
                self.notification_shown = true;
                self.notification_suppressed = false;
                self.notification.applet.bring_to_foreground();
            }
            (Some(false), true) | (None, true) => self.hide_notification(),
            (Some(false), false) if !self.notification_suppressed => {
                debug!("notification suppressed by a foreground applet");
                self.notification_suppressed = true;
            }
            _ => {}
        }
    }

    fn hide_notification(&mut self) {
        if !self.notification_shown {
            return;
        }
        self.notification_shown = false;
        self.notification.applet.send_to_background();
        // Redraw whatever the bar covered.
        coalesce(&mut self.pending, RefreshRequest::fast().all_tiles());
    }

    fn dismiss_notification(&mut self) {
        self.notification.applet.dismiss();
        self.hide_notification();
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    fn open_menu(&mut self) {
        debug!("menu open");
        self.menu.applet.reset();
        self.menu.applet.bring_to_foreground();
        coalesce(&mut self.pending, RefreshRequest::fast().all_tiles().responsive());
    }

    fn close_menu(&mut self) {
        debug!("menu closed");
        self.menu.applet.send_to_background();
        coalesce(&mut self.pending, RefreshRequest::fast().all_tiles());
    }

    fn menu_model(&self) -> MenuModel {
        let mut applets = Vec::new();
        for (i, slot) in self.applets.iter().enumerate() {
            let id = AppletId(i as u8);
            let entry = MenuEntry {
                name: slot.applet.core().name(),
                active: slot.applet.core().is_active(),
                autoshow: self.settings.applets.may_autoshow(id),
            };
            applets.push(entry).ok();
        }
        MenuModel {
            applets,
            tile_count: self.settings.user_tiles.count,
            rotation: self.settings.rotation(),
            notifications: self.settings.notifications_enabled,
        }
    }

    fn apply_menu_action(&mut self, action: MenuAction) {
        debug!("menu action {}", action);
        match action {
            MenuAction::Close => self.close_menu(),
            MenuAction::FocusNextTile => {
                self.focus_next_tile();
                self.close_menu();
            }
            MenuAction::CycleLayout => {
                let tiles = &mut self.settings.user_tiles;
                tiles.count = next_tile_count(tiles.count, tiles.max_count);
                if tiles.focused >= tiles.count {
                    tiles.focused = 0;
                }
                self.settings_dirty = true;
                self.relayout();
            }
            MenuAction::Rotate => {
                self.settings.rotation = self.settings.rotation().next().quarter_turns();
                self.image.set_rotation(self.settings.rotation());
                self.settings_dirty = true;
                self.relayout();
            }
            MenuAction::ToggleNotifications => {
                self.settings.notifications_enabled = !self.settings.notifications_enabled;
                if !self.settings.notifications_enabled {
                    self.dismiss_notification();
                }
                self.settings_dirty = true;
            }
            MenuAction::ToggleApplet(id) => self.toggle_applet(id),
            MenuAction::ToggleAutoshow(id) => {
                self.settings.applets.toggle_autoshow(id);
                self.settings_dirty = true;
            }
        }
    }

    /// Re-layout after a tile count or rotation change, then close the menu
    /// with a FULL refresh.
    fn relayout(&mut self) {
        if let Err(e) = self.layout() {
            error!("layout failed: {}", e);
            return;
        }
        self.assign_tiles();
        self.menu.applet.send_to_background();
        coalesce(&mut self.pending, RefreshRequest::full().all_tiles());
    }

    fn toggle_applet(&mut self, id: AppletId) {
        let Some(active) = self.applets.get(id.index()).map(|s| s.applet.core().is_active()) else {
            return;
        };
        if active {
            if self.active_count() <= 1 {
                warn!("refusing to deactivate the last active applet");
                return;
            }
            self.deactivate_applet(id);
        } else {
            self.activate_applet(id);
        }

        let mut mask = 0u32;
        for (i, slot) in self.applets.iter().enumerate() {
            if slot.applet.core().is_active() {
                mask |= AppletId(i as u8).mask();
            }
        }
        self.settings.applets.active = Some(mask);
        self.settings_dirty = true;
        self.assign_tiles();
    }

    // -----------------------------------------------------------------------
    // Tiles and applets
    // -----------------------------------------------------------------------

    /// Recompute user and system tiles from settings and rotation.
    fn layout(&mut self) -> Result<(), LayoutError> {
        let size = self.image.logical_size();
        let count = self.settings.user_tiles.count;

        let mut tiles = Vec::new();
        for index in 0..count {
            let mut tile = Tile::place_user_tile(size, count, index)?;
            tile.set_displayed_applet(self.tiles.get(usize::from(index)).and_then(Tile::displayed_applet));
            tiles.push(tile).map_err(|_| LayoutError::UnsupportedTileCount(count))?;
        }
        self.tiles = tiles;

        let bar = NotificationApplet::bar_height(self.fonts.small.line_height()).min(size.height);
        self.notification.tile = Tile::place_system_tile(TileId::NOTIFICATION, 0, 0, size.width, bar)?;
        self.menu.tile = Tile::place_system_tile(TileId::MENU, 0, 0, size.width, size.height)?;
        trace!("layout: {} user tiles on {}x{}", count, size.width, size.height);
        Ok(())
    }

    /// Give every user tile an active applet, preferring the saved choice,
    /// never showing one applet twice. Displayed applets go to the
    /// foreground, the rest to the background.
    fn assign_tiles(&mut self) {
        let mut used = 0u32;
        for t in 0..self.tiles.len() {
            let saved = self
                .settings
                .user_tiles
                .displayed
                .get(t)
                .copied()
                .flatten()
                .map(AppletId);
            let usable = |id: AppletId, used: u32| {
                id.mask() & used == 0
                    && self
                        .applets
                        .get(id.index())
                        .is_some_and(|s| s.applet.core().is_active())
            };
            let choice = saved.filter(|id| usable(*id, used)).or_else(|| {
                (0..self.applets.len())
                    .map(|i| AppletId(i as u8))
                    .find(|id| usable(*id, used))
            });

            if let Some(id) = choice {
                used |= id.mask();
            }
            if let Some(tile) = self.tiles.get_mut(t) {
                tile.set_displayed_applet(choice);
            }
            if let Some(slot) = self.settings.user_tiles.displayed.get_mut(t) {
                *slot = choice.map(|id| id.0);
            }
        }

        for (i, slot) in self.applets.iter_mut().enumerate() {
            if AppletId(i as u8).mask() & used != 0 {
                slot.applet.bring_to_foreground();
            } else {
                slot.applet.send_to_background();
            }
        }
    }

    /// Put `id` on user tile `t`. If it is on another tile, the two swap.
    fn show_on_tile(&mut self, t: usize, id: AppletId) {
        let Some(previous) = self.tiles.get(t).map(Tile::displayed_applet) else {
            return;
        };
        if previous == Some(id) {
            return;
        }

        let other = self.displayed_on(id);
        if let Some(u) = other {
            if let Some(tile) = self.tiles.get_mut(u) {
                tile.set_displayed_applet(previous);
            }
            if let Some(slot) = self.settings.user_tiles.displayed.get_mut(u) {
                *slot = previous.map(|p| p.0);
            }
        }
        match (previous, other) {
            (Some(p), Some(_)) => {
                if let Some(slot) = self.applets.get_mut(p.index()) {
                    slot.applet.bring_to_foreground();
                }
            }
            (Some(p), None) => {
                if let Some(slot) = self.applets.get_mut(p.index()) {
                    slot.applet.send_to_background();
                }
            }
            (None, _) => {}
        }

        if let Some(tile) = self.tiles.get_mut(t) {
            tile.set_displayed_applet(Some(id));
        }
        if let Some(slot) = self.settings.user_tiles.displayed.get_mut(t) {
            *slot = Some(id.0);
        }
        if let Some(slot) = self.applets.get_mut(id.index()) {
            slot.applet.bring_to_foreground();
        }
        self.settings_dirty = true;
    }

    /// Short press: next active applet (registration order, wrapping) that
    /// is not already on another tile.
    fn cycle_applet(&mut self) {
        let t = self.focused_tile();
        let Some(current) = self.tiles.get(t).map(Tile::displayed_applet) else {
            return;
        };
        let n = self.applets.len();
        let start = current.map_or(0, |c| c.index().saturating_add(1));
        let next = (0..n)
            .map(|k| AppletId(start.saturating_add(k).checked_rem(n).unwrap_or(0) as u8))
            .find(|id| {
                Some(*id) != current
                    && self.displayed_on(*id).is_none()
                    && self
                        .applets
                        .get(id.index())
                        .is_some_and(|s| s.applet.core().is_active())
            });
        match next {
            Some(id) => self.show_on_tile(t, id),
            None => trace!("no other applet to cycle to"),
        }
    }

    fn focus_next_tile(&mut self) {
        let tiles = &mut self.settings.user_tiles;
        tiles.focused = tiles
            .focused
            .saturating_add(1)
            .checked_rem(tiles.count)
            .unwrap_or(0);
        self.settings_dirty = true;
        debug!("focus tile {}", tiles.focused);
    }

    fn displayed_on(&self, id: AppletId) -> Option<usize> {
        self.tiles
            .iter()
            .position(|tile| tile.displayed_applet() == Some(id))
    }

    fn active_count(&self) -> usize {
        self.applets
            .iter()
            .filter(|s| s.applet.core().is_active())
            .count()
    }

    /// Activate and subscribe to the applet's topics.
    fn activate_applet(&mut self, id: AppletId) {
        let Some(slot) = self.applets.get_mut(id.index()) else {
            return;
        };
        slot.applet.activate();
        let topics = slot.applet.topics();
        if topics.is_empty() {
            return;
        }
        if let Err(BusError::Full) = self.bus.subscribe(id, topics) {
            warn!("no subscription slot for applet {}", id.0);
        }
    }

    /// Deactivate, revoke subscriptions and free its tile.
    fn deactivate_applet(&mut self, id: AppletId) {
        if let Some(slot) = self.applets.get_mut(id.index()) {
            slot.applet.deactivate();
        }
        self.bus.unsubscribe_applet(id);
        for tile in &mut self.tiles {
            if tile.displayed_applet() == Some(id) {
                tile.set_displayed_applet(None);
            }
        }
    }
}

/// Next user tile count in 1 → 2 → 4 → 1, skipping counts above `max`.
fn next_tile_count(count: u8, max: u8) -> u8 {
    match count {
        1 if max >= 2 => 2,
        2 if max >= 4 => 4,
        _ => 1,
    }
}
