// zram-advisor - zRAM effectiveness analyzer and swap lifecycle manager
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod defaults;
pub mod devices;
pub mod exec;
pub mod helpers;
pub mod lifecycle;
pub mod meminfo;
pub mod projection;
pub mod report;
pub mod service;
pub mod sizing;
pub mod tunables;

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag for signal handling
pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Check if shutdown was requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Acquire)
}

/// Request shutdown
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::Release);
}
