//! Recently heard nodes, newest first, with signal and age.

// Pixel math on tile-sized values.
#![allow(clippy::arithmetic_side_effects, clippy::cast_possible_wrap)]

use core::fmt::Write;

use crate::applet::{Applet, AppletCore, RefreshRequest, RenderContext};
use crate::canvas::{Canvas, HAlign, VAlign, BLACK};
use crate::events::{Event, NodeHeard, Topic, Topics};
use crate::notification::push_truncated;
use crate::signal::SignalStrength;
use crate::time;

/// Nodes remembered.
pub const MAX_HEARD: usize = 8;

#[derive(Debug, Clone)]
struct Entry {
    node: u32,
    name: heapless::String<12>,
    signal: SignalStrength,
    hops_away: Option<u8>,
    last_heard: u32,
}

/// List of nodes heard most recently.
pub struct HeardApplet {
    core: AppletCore,
    nodes: heapless::Deque<Entry, MAX_HEARD>,
}

impl HeardApplet {
    /// Empty list.
    pub const fn new() -> Self {
        Self {
            core: AppletCore::new("Heard"),
            nodes: heapless::Deque::new(),
        }
    }

    /// Node numbers, newest first.
    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().map(|e| e.node)
    }

    fn record(&mut self, heard: &NodeHeard<'_>) {
        // Move an existing node to the front instead of duplicating it.
        let mut kept: heapless::Deque<Entry, MAX_HEARD> = heapless::Deque::new();
        while let Some(e) = self.nodes.pop_front() {
            if e.node != heard.node {
                let _ = kept.push_back(e);
            }
        }
        if kept.is_full() {
            kept.pop_back();
        }

        let mut name = heapless::String::new();
        match heard.short_name {
            Some(n) => push_truncated(&mut name, n),
            None => push_truncated(&mut name, &time::node_id_string(heard.node)),
        }
        let _ = kept.push_front(Entry {
            node: heard.node,
            name,
            signal: SignalStrength::classify(heard.snr, heard.rssi),
            hops_away: heard.hops_away,
            last_heard: heard.last_heard,
        });
        self.nodes = kept;
    }

    fn draw_bars(canvas: &mut dyn Canvas, right: i32, bottom: i32, signal: SignalStrength) {
        for bar in 0..3u8 {
            let i = i32::from(bar);
            let h = 2 + 2 * i;
            let x = right - 9 + 3 * i;
            if bar < signal.bars() {
                canvas.fill_rect(x, bottom - h, 2, h, BLACK);
            } else {
                canvas.draw_line(x, bottom - 1, x + 1, bottom - 1, BLACK);
            }
        }
    }
}

impl Default for HeardApplet {
    fn default() -> Self {
        Self::new()
    }
}

impl Applet for HeardApplet {
    fn core(&self) -> &AppletCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AppletCore {
        &mut self.core
    }

    fn render(&mut self, canvas: &mut dyn Canvas, ctx: &RenderContext) {
        canvas.set_font(ctx.fonts.small);
        canvas.draw_header("Heard");
        let width = canvas.width() as i32;
        let header = canvas.header_height() as i32;
        let row = canvas.font().line_height() as i32 + 2;

        if self.nodes.is_empty() {
            let height = canvas.height() as i32;
            canvas.print_at(width / 2, (header + height) / 2, "Nobody yet", HAlign::Center, VAlign::Middle);
            return;
        }

        let mut y = header + 1;
        for entry in &self.nodes {
            if y + row > canvas.height() as i32 {
                break;
            }
            canvas.print_at(2, y, &entry.name, HAlign::Left, VAlign::Top);

            let mut right = width - 12;
            let age = ctx.time_string(entry.last_heard);
            if !age.is_empty() {
                canvas.print_at(right, y, &age, HAlign::Right, VAlign::Top);
                right -= canvas.text_width(&age) as i32 + 4;
            }
            if let Some(hops) = entry.hops_away.filter(|h| *h > 0) {
                let mut label: heapless::String<8> = heapless::String::new();
                let _ = write!(label, "{hops}h");
                canvas.print_at(right, y, &label, HAlign::Right, VAlign::Top);
            }
            Self::draw_bars(canvas, width - 1, y + row - 2, entry.signal);
            y += row;
        }
    }

    fn topics(&self) -> Topics {
        Topics::of(Topic::NodeHeard).with(Topic::ClockTick)
    }

    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::NodeHeard(heard) => {
                self.record(heard);
                self.core.request_update(RefreshRequest::fast());
            }
            Event::ClockTick { .. } if !self.nodes.is_empty() => {
                self.core.request_update(RefreshRequest::fast());
            }
            _ => {}
        }
    }
}
