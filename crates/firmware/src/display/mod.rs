//! Panel drivers.
//!
//! Each driver implements [`platform::EInkDriver`], so the compositor can
//! own it directly. The driver is always compiled so host tests can run it
//! against `embedded-hal-mock`.

pub mod ssd16xx;

pub use ssd16xx::{
    Command, Ssd16xx, GDEY0213B74_HEIGHT, GDEY0213B74_IMAGE_LEN, GDEY0213B74_WIDTH,
};
