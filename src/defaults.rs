// Centralised default values for zram-advisor.
// SPDX-License-Identifier: GPL-3.0-or-later
//
// Sizing defaults and the kernel tunable values applied on load live
// here instead of on the CLI surface. Changing a baked-in value means
// editing this file and reinstalling.

// ── Sizing ───────────────────────────────────────────────────────────────────

/// Default disksize multiplier (1.75 × physical RAM), as an exact rational.
pub const MULTIPLIER_NUM: u32 = 175;
pub const MULTIPLIER_DEN: u32 = 100;

/// Default cap on total zram disksize, in MiB.
pub const CAP_MB: u64 = 12288;

pub const DEVICE_COUNT: u32 = 1;

// ── Zram devices ─────────────────────────────────────────────────────────────

pub const ZRAM_ALG: &str = "zstd";

/// Fixed swap priority; zram must win over any disk swap.
pub const SWAP_PRIORITY: i32 = 100;

// ── Kernel tunables written on every load ────────────────────────────────────

pub const SWAPPINESS: i64 = 180;
pub const WATERMARK_BOOST_FACTOR: i64 = 0;
pub const WATERMARK_SCALE_FACTOR: i64 = 125;
pub const PAGE_CLUSTER: i64 = 0;

// ── Projection ───────────────────────────────────────────────────────────────

/// Conservative floor for the projected compression ratio, as a fraction
/// of the measured effective ratio. The projection blends toward this
/// floor when the device is nearly empty. Treat as a calibration knob.
pub const FLOOR_RATIO_SCALE: f64 = 0.6;

// ── Reporter ─────────────────────────────────────────────────────────────────

pub const WATCH_INTERVAL_SECS: u64 = 2;

// ── Installed artifacts ──────────────────────────────────────────────────────

pub const INSTALL_PATH: &str = "/usr/local/bin/zram-advisor";
pub const SERVICE_NAME: &str = "zram-advisor";
pub const SYSTEMD_UNIT_PATH: &str = "/etc/systemd/system/zram-advisor.service";
pub const INITD_SCRIPT_PATH: &str = "/etc/init.d/zram-advisor";

/// Log file written by pre-0.2 releases; unsetup still cleans it up.
pub const LEGACY_LOG_PATH: &str = "/var/log/zram-advisor.log";
