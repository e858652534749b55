//! Property-based tests for button wiring conventions.

#![allow(clippy::indexing_slicing)]

use platform::{InterruptMode, PinState, Pull, WiringType};

const ALL: [WiringType; 4] = [
    WiringType::ActiveLow,
    WiringType::ActiveHigh,
    WiringType::ActiveLowPullup,
    WiringType::ActiveHighPulldown,
];

proptest::proptest! {
    /// Exactly one of the two levels reads as pressed, for every wiring.
    #[test]
    fn exactly_one_level_is_pressed(idx in 0usize..4) {
        let wiring = ALL[idx];
        let high = wiring.is_pressed(PinState::High);
        let low = wiring.is_pressed(PinState::Low);
        assert!(high != low);
    }

    /// The press edge always moves the line towards the pressed level.
    #[test]
    fn press_edge_matches_pressed_level(idx in 0usize..4) {
        let wiring = ALL[idx];
        let expected = match wiring.pressed_level() {
            PinState::Low => InterruptMode::FallingEdge,
            PinState::High => InterruptMode::RisingEdge,
        };
        assert_eq!(wiring.press_edge(), expected);
    }
}

#[test]
fn only_pull_variants_enable_internal_resistors() {
    let pulls: Vec<Pull> = ALL.iter().map(|w| w.pull()).collect();
    assert_eq!(pulls, vec![Pull::None, Pull::None, Pull::Up, Pull::Down]);
}
