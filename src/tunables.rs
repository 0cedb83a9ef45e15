// Kernel memory-reclaim tunables: sampling, advisory bands, and the
// fixed values written on every load.
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::defaults;
use crate::exec::Runner;
use crate::helpers::GIB;

const VM_DIR: &str = "/proc/sys/vm";

/// Advisory bands (closed intervals). Informational only; the evaluator
/// never corrects a value, only the load action does.
const ADVISORY: [(&str, i64, i64); 4] = [
    ("swappiness", 150, 200),
    ("watermark_boost_factor", 0, 0),
    ("watermark_scale_factor", 125, 125),
    ("page-cluster", 0, 0),
];

/// Values applied unconditionally by every load.
const APPLIED: [(&str, i64); 4] = [
    ("swappiness", defaults::SWAPPINESS),
    ("watermark_boost_factor", defaults::WATERMARK_BOOST_FACTOR),
    ("watermark_scale_factor", defaults::WATERMARK_SCALE_FACTOR),
    ("page-cluster", defaults::PAGE_CLUSTER),
];

/// One sampled tunable. `value` is None when the pseudo-file could not
/// be read, which renders as "absent" rather than aborting the tick.
#[derive(Debug, Clone)]
pub struct KernelParameter {
    pub name: &'static str,
    pub value: Option<i64>,
    pub band: (i64, i64),
}

impl KernelParameter {
    /// IN/NOT-IN classification against the advisory band.
    pub fn in_band(&self) -> Option<bool> {
        self.value.map(|v| self.band.0 <= v && v <= self.band.1)
    }
}

fn read_value(name: &str) -> Option<i64> {
    let content = std::fs::read_to_string(format!("{}/{}", VM_DIR, name)).ok()?;
    content.trim().parse().ok()
}

/// Sample all advisory tunables; failures are soft per parameter.
pub fn sample() -> Vec<KernelParameter> {
    ADVISORY
        .iter()
        .map(|&(name, lo, hi)| KernelParameter {
            name,
            value: read_value(name),
            band: (lo, hi),
        })
        .collect()
}

/// Advisory floor for total zram disksize: 1.5 × RAM on hosts up to
/// 8 GiB, a flat 4 GiB above that.
pub fn recommended_disksize_floor(ram: u64) -> u64 {
    if ram <= 8 * GIB {
        ram + ram / 2
    } else {
        4 * GIB
    }
}

/// Write the fixed tunable values. Runs on every load; values are not
/// exposed on the command surface.
pub fn apply(runner: &Runner) -> crate::exec::Result<()> {
    for (name, value) in APPLIED {
        runner.write_file(&format!("{}/{}", VM_DIR, name), &value.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(value: Option<i64>, lo: i64, hi: i64) -> KernelParameter {
        KernelParameter {
            name: "swappiness",
            value,
            band: (lo, hi),
        }
    }

    #[test]
    fn test_band_is_closed_interval() {
        assert_eq!(param(Some(150), 150, 200).in_band(), Some(true));
        assert_eq!(param(Some(200), 150, 200).in_band(), Some(true));
        assert_eq!(param(Some(149), 150, 200).in_band(), Some(false));
        assert_eq!(param(Some(201), 150, 200).in_band(), Some(false));
    }

    #[test]
    fn test_absent_value_has_no_verdict() {
        assert_eq!(param(None, 150, 200).in_band(), None);
    }

    #[test]
    fn test_degenerate_band() {
        assert_eq!(param(Some(0), 0, 0).in_band(), Some(true));
        assert_eq!(param(Some(1), 0, 0).in_band(), Some(false));
    }

    #[test]
    fn test_disksize_floor() {
        assert_eq!(recommended_disksize_floor(8 * GIB), 12 * GIB);
        assert_eq!(recommended_disksize_floor(4 * GIB), 6 * GIB);
        assert_eq!(recommended_disksize_floor(16 * GIB), 4 * GIB);
    }

    #[test]
    fn test_applied_values_sit_inside_advisory_bands() {
        for (name, value) in APPLIED {
            let (_, lo, hi) = ADVISORY.iter().find(|a| a.0 == name).copied().unwrap();
            assert!(lo <= value && value <= hi, "{} out of band", name);
        }
    }

    #[test]
    fn test_sample_never_panics() {
        let params = sample();
        assert_eq!(params.len(), 4);
    }
}
