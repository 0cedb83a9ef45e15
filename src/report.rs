// Snapshot rendering and the live reporter loop
// SPDX-License-Identifier: GPL-3.0-or-later
//
// One tick = sample everything, derive projections, render, discard.
// The loop's only suspension point is the inter-tick sleep; Ctrl-C is
// observed between ticks through the global shutdown flag.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::devices::{self, ZramDevice};
use crate::helpers::{human, human_pct};
use crate::meminfo::{self, MemorySnapshot};
use crate::projection::{self, EffectiveMemory, Projection};
use crate::tunables::{self, KernelParameter};
use crate::{is_shutdown, request_shutdown};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Meminfo error: {0}")]
    MemInfo(#[from] crate::meminfo::MemInfoError),
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Everything one tick samples and derives. Rebuilt from live kernel
/// state every tick, never carried over.
pub struct Snapshot {
    pub mem: MemorySnapshot,
    pub params: Vec<KernelParameter>,
    pub devices: Vec<ZramDevice>,
    pub projection: Option<Projection>,
    pub effective: Option<EffectiveMemory>,
}

/// Sample kernel state once. Tunables and devices fail softly; only an
/// unreadable /proc/meminfo aborts the tick.
pub fn collect() -> Result<Snapshot> {
    let mem = meminfo::sample()?;
    let params = tunables::sample();
    let devices = devices::sample_all();
    let projection = projection::aggregate(&devices);
    let effective = projection
        .as_ref()
        .map(|p| projection::effective_memory(&mem, &devices, p));

    Ok(Snapshot {
        mem,
        params,
        devices,
        projection,
        effective,
    })
}

fn clock_line() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{:02}:{:02}:{:02}  zram-advisor", h, m, s)
}

/// Render one snapshot as plain text lines.
pub fn render(snap: &Snapshot) -> Vec<String> {
    let mut lines = vec![clock_line()];
    let ram = snap.mem.total;

    for param in &snap.params {
        let (value, verdict) = match (param.value, param.in_band()) {
            (Some(v), Some(true)) => (v.to_string(), "....in"),
            (Some(v), Some(false)) => (v.to_string(), " NOT in"),
            _ => ("absent".to_string(), "      "),
        };
        lines.push(format!(
            "{:>16} : vm.{}{} [{}, {}]",
            value,
            format!("{:.<24}", param.name),
            verdict,
            param.band.0,
            param.band.1
        ));
    }

    if snap.devices.is_empty() {
        lines.push("   NO zRAM: not installed or not enabled".to_string());
        return lines;
    }

    let total_disksize: u64 = snap.devices.iter().map(|d| d.disksize).sum();
    let floor = tunables::recommended_disksize_floor(ram);
    let verdict = if total_disksize >= floor { "....ok" } else { " NOT ok" };
    lines.push(format!(
        "{:>16} : {:.<27}{} >= {}",
        human(total_disksize),
        "zRAM.disksize",
        verdict,
        human(floor)
    ));

    for dev in &snap.devices {
        if let Some(msg) = dev.invariant_violation() {
            lines.push(format!("WARN: inconsistent counters: {}", msg));
        }
    }

    lines.push(format!(
        "{:>16} : {:<16} eTotal={}",
        human(ram),
        "Total Memory",
        snap.effective
            .map(|e| human_pct(e.e_total, ram))
            .unwrap_or_else(|| "n/a".into())
    ));
    lines.push(format!(
        "{:>16} : {:<16}  eUsed={}",
        human_pct(snap.mem.used, ram),
        "Used",
        snap.effective
            .map(|e| human_pct(e.e_used, ram))
            .unwrap_or_else(|| "n/a".into())
    ));
    lines.push(format!(
        "{:>16} : {:<16} eAvail={}",
        human_pct(snap.mem.available, ram),
        "Available",
        snap.effective
            .map(|e| human_pct(e.e_avail, ram))
            .unwrap_or_else(|| "n/a".into())
    ));

    if let Some(proj) = &snap.projection {
        lines.push(format!(
            "{:>16} : projected at full utilization ({})",
            format!("{:.2}:1", proj.projected_factor),
            proj.confidence
        ));
    }

    for dev in &snap.devices {
        lines.push(format!(
            "{:>16} : {} limit={}",
            format!("{}: uncmpr", dev.name()),
            human(dev.orig_data_size),
            human(dev.disksize)
        ));

        let mut cmpr = format!(
            "{:>16} : {}",
            "cmpr",
            human_pct(dev.compr_data_size, ram)
        );
        if let Some(proj) = Projection::for_device(dev) {
            cmpr.push_str(&format!(
                " {:.2}:1 eff={:.2}:1 -> {:.2}:1 ({})",
                proj.raw_factor, proj.effective_factor, proj.projected_factor, proj.confidence
            ));
        }
        lines.push(cmpr);

        lines.push(format!(
            "{:>16} : {} most={} limit={}",
            "RAM",
            human_pct(dev.mem_used_total, ram),
            human_pct(dev.mem_used_max, ram),
            if dev.mem_limit == 0 {
                "none".to_string()
            } else {
                human_pct(dev.mem_limit, ram)
            }
        ));
    }

    lines
}

fn print_snapshot(snap: &Snapshot) {
    for line in render(snap) {
        println!("{}", line);
    }
}

/// Print one snapshot and return.
pub fn report_once() -> Result<()> {
    print_snapshot(&collect()?);
    Ok(())
}

/// Re-sample and re-render at a fixed cadence until interrupted, then
/// print a final snapshot. Nothing survives from tick to tick.
pub fn watch(interval: Duration) -> Result<()> {
    ctrlc::set_handler(request_shutdown)?;

    loop {
        let snap = collect()?;
        // Home the cursor and clear so the report repaints in place
        print!("\x1b[H\x1b[2J\x1b[3J");
        print_snapshot(&snap);

        if is_shutdown() {
            break;
        }
        std::thread::sleep(interval);
        if is_shutdown() {
            break;
        }
    }

    println!("\nFinal snapshot:");
    print_snapshot(&collect()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{GIB, MIB};

    fn snapshot_with(devs: Vec<ZramDevice>) -> Snapshot {
        let mem = MemorySnapshot {
            total: 8 * GIB,
            used: 5 * GIB,
            available: 3 * GIB,
        };
        let projection = projection::aggregate(&devs);
        let effective = projection
            .as_ref()
            .map(|p| projection::effective_memory(&mem, &devs, p));
        Snapshot {
            mem,
            params: vec![
                KernelParameter {
                    name: "swappiness",
                    value: Some(180),
                    band: (150, 200),
                },
                KernelParameter {
                    name: "page-cluster",
                    value: None,
                    band: (0, 0),
                },
            ],
            devices: devs,
            projection,
            effective,
        }
    }

    fn active_device() -> ZramDevice {
        ZramDevice {
            index: 0,
            disksize: 12 * GIB,
            orig_data_size: 2600 * MIB,
            compr_data_size: 607 * MIB,
            mem_used_total: 623 * MIB,
            mem_limit: 0,
            mem_used_max: 700 * MIB,
        }
    }

    #[test]
    fn test_render_no_zram_state() {
        let lines = render(&snapshot_with(vec![]));
        assert!(lines.iter().any(|l| l.contains("NO zRAM")));
        // Tunables still render in the NO zRAM state
        assert!(lines.iter().any(|l| l.contains("vm.swappiness")));
    }

    #[test]
    fn test_render_absent_tunable() {
        let lines = render(&snapshot_with(vec![]));
        let line = lines.iter().find(|l| l.contains("page-cluster")).unwrap();
        assert!(line.contains("absent"));
        assert!(!line.contains("NOT"));
    }

    #[test]
    fn test_render_active_device() {
        let lines = render(&snapshot_with(vec![active_device()]));
        assert!(lines.iter().any(|l| l.contains("zram0: uncmpr")));
        assert!(lines.iter().any(|l| l.contains("confident")));
        assert!(lines.iter().any(|l| l.contains("eTotal=")));
        assert!(!lines.iter().any(|l| l.contains("NO zRAM")));
    }

    #[test]
    fn test_render_flags_invariant_violation() {
        let mut dev = active_device();
        dev.compr_data_size = dev.mem_used_total + MIB;
        let lines = render(&snapshot_with(vec![dev]));
        assert!(lines.iter().any(|l| l.contains("inconsistent counters")));
    }

    #[test]
    fn test_render_disksize_advisory() {
        let lines = render(&snapshot_with(vec![active_device()]));
        let line = lines.iter().find(|l| l.contains("zRAM.disksize")).unwrap();
        // 12G against the 12G floor for an 8 GiB host
        assert!(line.contains("ok"));
    }

    #[test]
    fn test_collect_live() {
        // Must not panic regardless of host zram state
        let snap = collect().unwrap();
        assert!(snap.mem.total > 0);
        assert_eq!(snap.params.len(), 4);
    }
}
