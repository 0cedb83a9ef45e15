// Zram device enumeration and per-device counter sampling
// SPDX-License-Identifier: GPL-3.0-or-later
//
// Counters come from /sys/block/zramN/mm_stat (first line, columns:
// orig_data_size compr_data_size mem_used_total mem_limit mem_used_max)
// and /sys/block/zramN/disksize. A device without a readable mm_stat is
// not active and is skipped; zero devices is the "NO zRAM" state.

use std::path::Path;

use glob::glob;

use crate::helpers::human;

/// One sampled zram device. All fields are bytes except `index`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZramDevice {
    pub index: u32,
    pub disksize: u64,
    pub orig_data_size: u64,
    pub compr_data_size: u64,
    pub mem_used_total: u64,
    pub mem_limit: u64,
    pub mem_used_max: u64,
}

impl ZramDevice {
    pub fn name(&self) -> String {
        format!("zram{}", self.index)
    }

    pub fn path(&self) -> String {
        format!("/dev/zram{}", self.index)
    }

    /// Check the counter ordering the kernel guarantees:
    /// compr <= mem_used <= orig <= disksize. A violation means the
    /// sample is not trustworthy and must be flagged, never silently
    /// rendered.
    pub fn invariant_violation(&self) -> Option<String> {
        let chain = [
            ("compr_data_size", self.compr_data_size),
            ("mem_used_total", self.mem_used_total),
            ("orig_data_size", self.orig_data_size),
            ("disksize", self.disksize),
        ];
        for pair in chain.windows(2) {
            let (lo_name, lo) = pair[0];
            let (hi_name, hi) = pair[1];
            if lo > hi {
                return Some(format!(
                    "{}: {} ({}) exceeds {} ({})",
                    self.name(),
                    lo_name,
                    human(lo),
                    hi_name,
                    human(hi)
                ));
            }
        }
        None
    }
}

/// Parse the first line of mm_stat. The kernel prints at least eight
/// columns; only the first five matter here.
fn parse_mm_stat(line: &str) -> Option<[u64; 5]> {
    let mut values = [0u64; 5];
    let mut fields = line.split_whitespace();
    for slot in values.iter_mut() {
        *slot = fields.next()?.parse().ok()?;
    }
    Some(values)
}

/// Ordered list of present zram device indexes.
pub fn enumerate() -> Vec<u32> {
    let mut indexes = Vec::new();
    if let Ok(entries) = glob("/sys/block/zram[0-9]*") {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                if let Ok(index) = name.trim_start_matches("zram").parse() {
                    indexes.push(index);
                }
            }
        }
    }
    indexes.sort_unstable();
    indexes
}

fn sample_one(index: u32) -> Option<ZramDevice> {
    let sysfs = format!("/sys/block/zram{}", index);
    if !Path::new(&sysfs).is_dir() {
        return None;
    }

    let mm_stat = std::fs::read_to_string(format!("{}/mm_stat", sysfs)).ok()?;
    let [orig, compr, mem_used, mem_limit, mem_max] = parse_mm_stat(mm_stat.lines().next()?)?;

    let disksize = std::fs::read_to_string(format!("{}/disksize", sysfs))
        .ok()?
        .trim()
        .parse()
        .ok()?;

    Some(ZramDevice {
        index,
        disksize,
        orig_data_size: orig,
        compr_data_size: compr,
        mem_used_total: mem_used,
        mem_limit,
        mem_used_max: mem_max,
    })
}

/// Sample every active device, in index order. Unreadable devices are
/// skipped, not errors; an empty result is the "NO zRAM" state.
pub fn sample_all() -> Vec<ZramDevice> {
    enumerate().into_iter().filter_map(sample_one).collect()
}
