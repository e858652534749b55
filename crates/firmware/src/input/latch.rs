//! Interrupt-side edge records.
//!
//! An [`EdgeLatch`] is the only state an input interrupt handler writes: the
//! line that fired, the level it read and a timestamp. The cooperative side
//! drains the records and does all the classification.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::Instant;
use heapless::Deque;
use platform::PinState;

/// Edges buffered between two scheduler passes.
pub const LATCH_DEPTH: usize = 8;

/// One recorded interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Edge {
    /// Line index within its input source.
    pub line: u8,
    /// Level read in the handler.
    pub level: PinState,
    /// When the handler ran.
    pub at: Instant,
}

impl Edge {
    /// Record for `line` at `level`.
    pub const fn new(line: u8, level: PinState, at: Instant) -> Self {
        Self { line, level, at }
    }
}

/// Bounded queue of edges shared between interrupt handlers and the main
/// loop. When full, new edges are dropped: a burst that long is bounce.
pub struct EdgeLatch {
    edges: Mutex<RefCell<Deque<Edge, LATCH_DEPTH>>>,
}

impl EdgeLatch {
    /// Empty latch, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            edges: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Record an edge. Interrupt safe. Returns `false` if it was dropped.
    pub fn record(&self, edge: Edge) -> bool {
        critical_section::with(|cs| self.edges.borrow_ref_mut(cs).push_back(edge).is_ok())
    }

    /// Oldest unread edge.
    pub fn pop(&self) -> Option<Edge> {
        critical_section::with(|cs| self.edges.borrow_ref_mut(cs).pop_front())
    }

    /// Throw away everything recorded so far.
    pub fn clear(&self) {
        critical_section::with(|cs| self.edges.borrow_ref_mut(cs).clear());
    }

    /// Edges waiting.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.edges.borrow_ref(cs).len())
    }

    /// Nothing waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_come_out_in_order() {
        let latch = EdgeLatch::new();
        assert!(latch.record(Edge::new(0, PinState::Low, Instant::from_millis(1))));
        assert!(latch.record(Edge::new(1, PinState::High, Instant::from_millis(2))));
        assert_eq!(latch.len(), 2);
        assert_eq!(latch.pop().map(|e| e.line), Some(0));
        assert_eq!(latch.pop().map(|e| e.line), Some(1));
        assert!(latch.pop().is_none());
    }

    #[test]
    fn test_overflow_drops_newest() {
        let latch = EdgeLatch::new();
        for i in 0..LATCH_DEPTH {
            assert!(latch.record(Edge::new(i as u8, PinState::Low, Instant::from_millis(0))));
        }
        assert!(!latch.record(Edge::new(99, PinState::Low, Instant::from_millis(0))));
        assert_eq!(latch.len(), LATCH_DEPTH);
        latch.clear();
        assert!(latch.is_empty());
    }
}
