//! On-screen menu.
//!
//! Opened by a long press and drawn full screen. A short press moves the
//! cursor down (wrapping), a long press selects. Selections that change the
//! compositor are returned to the window manager as a [`MenuAction`];
//! page changes are handled here with a bounded navigation stack.

// Pixel math on screen-sized values.
#![allow(clippy::arithmetic_side_effects, clippy::cast_possible_wrap)]

use core::fmt::Write;

use heapless::Vec;

use crate::applet::{Applet, AppletCore, AppletId, RefreshRequest, RenderContext, MAX_APPLETS};
use crate::canvas::{Canvas, HAlign, VAlign, BLACK, WHITE};
use crate::rotation::Rotation;

/// Longest item list: a back entry plus one entry per applet.
const MAX_ITEMS: usize = MAX_APPLETS + 1;

/// Nesting depth of the navigation stack.
const MAX_DEPTH: usize = 4;

/// Menu page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Page {
    /// Top level
    Root,
    /// Activate / deactivate applets
    Applets,
    /// Auto-show permissions
    Autoshow,
}

impl Page {
    fn title(self) -> &'static str {
        match self {
            Self::Root => "Menu",
            Self::Applets => "Applets",
            Self::Autoshow => "Auto-show",
        }
    }
}

/// One selectable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuItem {
    /// Close the menu
    Exit,
    /// Move input focus to the next user tile
    NextTile,
    /// Cycle the user tile count
    Layout,
    /// Rotate the display a quarter turn
    Rotate,
    /// Toggle the notification bar
    Notifications,
    /// Enter a sub-page
    Open(Page),
    /// Return to the previous page
    Back,
    /// Activate / deactivate an applet
    ToggleApplet(AppletId),
    /// Grant / revoke auto-show for an applet
    ToggleAutoshow(AppletId),
}

/// Work the window manager must do for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuAction {
    /// Close the menu
    Close,
    /// Focus the next user tile
    FocusNextTile,
    /// Next tile count
    CycleLayout,
    /// Next rotation
    Rotate,
    /// Flip notifications on / off
    ToggleNotifications,
    /// Flip an applet's active state
    ToggleApplet(AppletId),
    /// Flip an applet's auto-show permission
    ToggleAutoshow(AppletId),
}

impl core::fmt::Display for MenuItem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exit => f.write_str("exit"),
            Self::NextTile => f.write_str("next tile"),
            Self::Layout => f.write_str("layout"),
            Self::Rotate => f.write_str("rotate"),
            Self::Notifications => f.write_str("notifications"),
            Self::Open(page) => write!(f, "open {}", page.title()),
            Self::Back => f.write_str("back"),
            Self::ToggleApplet(id) => write!(f, "applet {}", id.index()),
            Self::ToggleAutoshow(id) => write!(f, "auto-show {}", id.index()),
        }
    }
}

impl core::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Close => f.write_str("close"),
            Self::FocusNextTile => f.write_str("focus next tile"),
            Self::CycleLayout => f.write_str("cycle layout"),
            Self::Rotate => f.write_str("rotate"),
            Self::ToggleNotifications => f.write_str("toggle notifications"),
            Self::ToggleApplet(id) => write!(f, "toggle applet {}", id.index()),
            Self::ToggleAutoshow(id) => write!(f, "toggle auto-show {}", id.index()),
        }
    }
}

/// Per-applet row data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    /// Applet name
    pub name: &'static str,
    /// Currently active
    pub active: bool,
    /// May auto-show
    pub autoshow: bool,
}

/// Compositor state the menu displays. Refreshed by the window manager
/// before every menu render.
#[derive(Debug, Clone, Default)]
pub struct MenuModel {
    /// Registered applets, by registration index
    pub applets: Vec<MenuEntry, MAX_APPLETS>,
    /// User tiles in use
    pub tile_count: u8,
    /// Current rotation
    pub rotation: Rotation,
    /// Notification bar enabled
    pub notifications: bool,
}

/// Page history with a cursor per level.
#[derive(Debug, Clone)]
struct Navigator {
    stack: Vec<(Page, u8), MAX_DEPTH>,
}

impl Navigator {
    fn new() -> Self {
        let mut stack = Vec::new();
        // Starts empty, so the root always fits.
        stack.push((Page::Root, 0)).ok();
        Self { stack }
    }

    fn current(&self) -> (Page, u8) {
        match self.stack.last() {
            Some(top) => *top,
            None => (Page::Root, 0),
        }
    }

    /// Silent no-op when the stack is full.
    fn push(&mut self, page: Page) {
        self.stack.push((page, 0)).ok();
    }

    /// Pops unless only the root remains.
    fn back(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn set_cursor(&mut self, cursor: u8) {
        if let Some(top) = self.stack.last_mut() {
            top.1 = cursor;
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Full-screen system menu.
pub struct MenuApplet {
    core: AppletCore,
    nav: Navigator,
    model: MenuModel,
}

impl MenuApplet {
    /// Closed menu.
    pub fn new() -> Self {
        Self {
            core: AppletCore::new("Menu"),
            nav: Navigator::new(),
            model: MenuModel::default(),
        }
    }

    /// Start again from the root page.
    pub fn reset(&mut self) {
        self.nav = Navigator::new();
    }

    /// Replace the displayed compositor state.
    pub fn set_model(&mut self, model: MenuModel) {
        self.model = model;
    }

    /// Current page
    pub fn page(&self) -> Page {
        self.nav.current().0
    }

    /// Highlighted row
    pub fn cursor(&self) -> usize {
        usize::from(self.nav.current().1)
    }

    /// Rows of the current page.
    pub fn items(&self) -> Vec<MenuItem, MAX_ITEMS> {
        let mut items = Vec::new();
        match self.page() {
            Page::Root => {
                for item in [
                    MenuItem::Exit,
                    MenuItem::NextTile,
                    MenuItem::Layout,
                    MenuItem::Rotate,
                    MenuItem::Notifications,
                    MenuItem::Open(Page::Applets),
                    MenuItem::Open(Page::Autoshow),
                ] {
                    items.push(item).ok();
                }
            }
            Page::Applets | Page::Autoshow => {
                items.push(MenuItem::Back).ok();
                let applet_page = self.page() == Page::Applets;
                for i in 0..self.model.applets.len() {
                    let id = AppletId(u8::try_from(i).unwrap_or(u8::MAX));
                    let item = if applet_page {
                        MenuItem::ToggleApplet(id)
                    } else {
                        MenuItem::ToggleAutoshow(id)
                    };
                    items.push(item).ok();
                }
            }
        }
        items
    }

    /// Short press: next row, wrapping to the top.
    pub fn move_cursor(&mut self) {
        let count = self.items().len();
        let next = if count == 0 { 0 } else { (self.cursor() + 1) % count };
        self.nav.set_cursor(u8::try_from(next).unwrap_or(0));
        self.core.request_update(RefreshRequest::fast().responsive());
    }

    /// Long press: act on the highlighted row.
    pub fn select(&mut self) -> Option<MenuAction> {
        let item = self.items().get(self.cursor()).copied()?;
        trace!("menu select {}", item);
        let action = match item {
            MenuItem::Exit => Some(MenuAction::Close),
            MenuItem::NextTile => Some(MenuAction::FocusNextTile),
            MenuItem::Layout => Some(MenuAction::CycleLayout),
            MenuItem::Rotate => Some(MenuAction::Rotate),
            MenuItem::Notifications => Some(MenuAction::ToggleNotifications),
            MenuItem::Open(page) => {
                self.nav.push(page);
                None
            }
            MenuItem::Back => {
                self.nav.back();
                None
            }
            MenuItem::ToggleApplet(id) => Some(MenuAction::ToggleApplet(id)),
            MenuItem::ToggleAutoshow(id) => Some(MenuAction::ToggleAutoshow(id)),
        };
        self.core.request_update(RefreshRequest::fast().responsive());
        action
    }

    fn label(&self, item: MenuItem) -> heapless::String<32> {
        let mut out = heapless::String::new();
        let entry = |id: AppletId| self.model.applets.get(id.index());
        let check = |on: bool| if on { "[x]" } else { "[ ]" };
        let _ = match item {
            MenuItem::Exit => write!(out, "Exit"),
            MenuItem::NextTile => write!(out, "Next tile"),
            MenuItem::Layout => write!(out, "Layout: {} tiles", self.model.tile_count),
            MenuItem::Rotate => write!(out, "Rotate: {} deg", u16::from(self.model.rotation.quarter_turns()) * 90),
            MenuItem::Notifications => write!(
                out,
                "Notifications: {}",
                if self.model.notifications { "on" } else { "off" }
            ),
            MenuItem::Open(page) => write!(out, "{} >", page.title()),
            MenuItem::Back => write!(out, "< Back"),
            MenuItem::ToggleApplet(id) => match entry(id) {
                Some(e) => write!(out, "{} {}", check(e.active), e.name),
                None => Ok(()),
            },
            MenuItem::ToggleAutoshow(id) => match entry(id) {
                Some(e) => write!(out, "{} {}", check(e.autoshow), e.name),
                None => Ok(()),
            },
        };
        out
    }
}

impl Default for MenuApplet {
    fn default() -> Self {
        Self::new()
    }
}

impl Applet for MenuApplet {
    fn core(&self) -> &AppletCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AppletCore {
        &mut self.core
    }

    fn render(&mut self, canvas: &mut dyn Canvas, ctx: &RenderContext) {
        canvas.set_font(ctx.fonts.small);
        canvas.draw_header(self.page().title());

        let width = canvas.width() as i32;
        let header = canvas.header_height() as i32;
        let row = canvas.font().line_height() as i32 + 2;
        let visible = ((canvas.height() as i32 - header) / row).max(1) as usize;

        let items = self.items();
        let cursor = self.cursor();
        let first = cursor.saturating_sub(visible - 1);

        for (slot, (index, item)) in items.iter().enumerate().skip(first).take(visible).enumerate() {
            let y = header + slot as i32 * row;
            let selected = index == cursor;
            if selected {
                canvas.fill_rect(0, y, width, row, BLACK);
                canvas.set_text_color(WHITE);
            } else {
                canvas.set_text_color(BLACK);
            }
            let label = self.label(*item);
            canvas.print_at(2, y + row / 2, &label, HAlign::Left, VAlign::Middle);
        }
        canvas.set_text_color(BLACK);

        if items.len() > visible {
            // Scroll position along the right edge.
            let track = canvas.height() as i32 - header;
            let thumb = (track * visible as i32 / items.len() as i32).max(2);
            let top = header + (track - thumb) * first as i32 / (items.len() - visible) as i32;
            canvas.fill_rect(width - 2, top, 2, thumb, BLACK);
        }
        trace!("menu depth {} cursor {}", self.nav.depth(), cursor);
    }
}
