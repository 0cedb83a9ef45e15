// Zram device lifecycle: load and unload
// SPDX-License-Identifier: GPL-3.0-or-later
//
// The controller drives the implicit system state {absent, loaded}.
// load never layers on existing devices: anything present is unloaded
// first. All privileged steps go through the Runner gate.

use std::path::Path;

use thiserror::Error;

use crate::defaults;
use crate::devices;
use crate::exec::{ExecError, Runner};
use crate::helpers::human;
use crate::sizing::SizingSpec;
use crate::{info, meminfo, tunables, warn};

const ZSWAP_ENABLED: &str = "/sys/module/zswap/parameters/enabled";

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Exec error: {0}")]
    Exec(#[from] ExecError),
    #[error("Meminfo error: {0}")]
    MemInfo(#[from] crate::meminfo::MemInfoError),
    #[error("could not disable swap on {kept} device(s): in-use compressed pages do not fit elsewhere")]
    UnloadBlocked { kept: usize },
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Disable zswap before loading zram. The two both compress in RAM and
/// must not run together. Best-effort: absence or a write failure only
/// warns.
fn disable_zswap(runner: &Runner) {
    if !Path::new(ZSWAP_ENABLED).exists() {
        return;
    }
    let enabled = std::fs::read_to_string(ZSWAP_ENABLED)
        .map(|v| matches!(v.trim(), "Y" | "1"))
        .unwrap_or(false);
    if !enabled {
        return;
    }
    info!("Disabling zswap (competing compression layer)");
    if let Err(e) = runner.write_file(ZSWAP_ENABLED, "0") {
        warn!("Failed to disable zswap: {}", e);
    }
}

/// Disable every present zram device as swap and unload the driver.
/// A device the OS refuses to swapoff (its pages cannot be relocated)
/// stays active and is reported; the driver is then left loaded.
/// Severity is the caller's decision: the unload command warns and
/// carries on, load treats it as fatal.
pub fn unload(runner: &Runner) -> Result<()> {
    let indexes = devices::enumerate();
    if indexes.is_empty() {
        info!("Zram: no devices present, nothing to unload");
        return Ok(());
    }
    unload_devices(runner, &indexes)
}

/// Swapoff the given devices in descending order, then unload the
/// driver. The driver-unload step is skipped while any device stays
/// active as swap.
fn unload_devices(runner: &Runner, indexes: &[u32]) -> Result<()> {
    let mut kept = 0;
    for index in indexes.iter().rev() {
        let dev = format!("/dev/zram{}", index);
        match runner.run(&["swapoff", &dev]) {
            Ok(()) => info!("Zram: {} disabled as swap", dev),
            Err(e) => {
                warn!("Zram: cannot disable {}: {}", dev, e);
                kept += 1;
            }
        }
    }

    if kept > 0 {
        return Err(LifecycleError::UnloadBlocked { kept });
    }

    runner.run(&["modprobe", "-r", "zram"])?;
    info!("Zram: driver unloaded");
    Ok(())
}

/// Create devices of equal shares of the resolved size and enable them
/// as swap at fixed priority, applying the fixed kernel tunables along
/// the way.
pub fn load(runner: &Runner, spec: &SizingSpec) -> Result<()> {
    if !devices::enumerate().is_empty() {
        info!("Zram: devices already present, unloading first");
        unload(runner)?;
    }

    disable_zswap(runner);

    let ram = meminfo::get_ram_size()?;
    let share = spec.per_device_bytes(ram, meminfo::get_page_size());
    info!(
        "Zram: loading driver: {} device(s) of {} ({} total requested)",
        spec.device_count,
        human(share),
        human(spec.resolved_bytes(ram))
    );

    runner.run(&[
        "modprobe",
        "zram",
        &format!("num_devices={}", spec.device_count),
    ])?;

    for index in 0..spec.device_count {
        let sysfs = format!("/sys/block/zram{}", index);
        // The algorithm may be unavailable on this kernel; the device
        // still works with its default.
        if let Err(e) = runner.write_file(&format!("{}/comp_algorithm", sysfs), defaults::ZRAM_ALG)
        {
            warn!("Zram: cannot select {}: {}", defaults::ZRAM_ALG, e);
        }
        runner.write_file(&format!("{}/disksize", sysfs), &share.to_string())?;
        if let Err(e) = runner.write_file(&format!("{}/mem_limit", sysfs), "0") {
            warn!("Zram: cannot clear mem_limit on zram{}: {}", index, e);
        }
    }

    tunables::apply(runner)?;

    for index in 0..spec.device_count {
        let dev = format!("/dev/zram{}", index);
        runner.run(&["mkswap", &dev])?;
        runner.run(&[
            "swapon",
            "-p",
            &defaults::SWAP_PRIORITY.to_string(),
            &dev,
        ])?;
        info!("Zram: {} active as swap ({})", dev, human(share));
    }

    Ok(())
}
