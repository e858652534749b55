//! Property-based tests for user tile layout.

#![allow(clippy::indexing_slicing, clippy::unwrap_used)]

use embedded_graphics::prelude::Size;
use inkhud::{LayoutError, Tile};

fn layout(display: Size, count: u8) -> Vec<Tile> {
    (0..count)
        .map(|i| Tile::place_user_tile(display, count, i).unwrap())
        .collect()
}

proptest::proptest! {
    /// Every tile has area, stays on the display and overlaps no other.
    #[test]
    fn tiles_are_disjoint_and_on_screen(
        w in 8u32..=800,
        h in 8u32..=800,
        pick in 0usize..3,
    ) {
        let count = [1u8, 2, 4][pick];
        let tiles = layout(Size::new(w, h), count);
        assert_eq!(tiles.len(), usize::from(count));
        for (i, a) in tiles.iter().enumerate() {
            assert!(a.width() > 0 && a.height() > 0);
            assert!(a.left() >= 0 && a.top() >= 0);
            assert!(a.left() + a.width() as i32 <= w as i32);
            assert!(a.top() + a.height() as i32 <= h as i32);
            for b in &tiles[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    /// Counts other than 1, 2 and 4 are refused whatever the display.
    #[test]
    fn unsupported_counts_fail(w in 8u32..=800, h in 8u32..=800, count in 0u8..=16) {
        proptest::prop_assume!(!matches!(count, 1 | 2 | 4));
        assert_eq!(
            Tile::place_user_tile(Size::new(w, h), count, 0).unwrap_err(),
            LayoutError::UnsupportedTileCount(count)
        );
    }

    /// Indices past the count give a zero-size placeholder, not an error.
    #[test]
    fn out_of_range_index_is_placeholder(w in 8u32..=800, h in 8u32..=800, extra in 0u8..8) {
        let tile = Tile::place_user_tile(Size::new(w, h), 2, 2 + extra).unwrap();
        assert!(tile.is_placeholder());
        assert_eq!((tile.width(), tile.height()), (0, 0));
    }
}

#[test]
fn tiny_display_cannot_host_four_tiles() {
    assert_eq!(
        Tile::place_user_tile(Size::new(4, 4), 4, 0).unwrap_err(),
        LayoutError::DisplayTooSmall
    );
}
