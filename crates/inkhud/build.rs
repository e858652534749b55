//! Build script for inkhud: build-epoch export.
//!
//! Emits `INKHUD_BUILD_EPOCH` (seconds since the Unix epoch) so the library
//! can reject wall-clock readings that are obviously older than the firmware
//! itself. `SOURCE_DATE_EPOCH` wins when set, which keeps reproducible builds
//! reproducible.

use std::time::{SystemTime, UNIX_EPOCH};

/// 2024-10-01T00:00:00Z, used when the host clock is unusable.
const FALLBACK_EPOCH: u64 = 1_727_740_800;

fn main() {
    let epoch = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_secs())
        })
        .filter(|secs| *secs >= FALLBACK_EPOCH && *secs <= u64::from(u32::MAX))
        .unwrap_or(FALLBACK_EPOCH);

    println!("cargo:rustc-env=INKHUD_BUILD_EPOCH={epoch}");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=build.rs");
}
