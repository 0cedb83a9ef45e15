// Compression projection and effective-memory calculation
// SPDX-License-Identifier: GPL-3.0-or-later
//
// Pure functions of one tick's samples; nothing here persists across
// ticks. The projected ratio blends the measured effective ratio with a
// conservative floor, weighted by how full the device is, so the
// projection converges to the measurement as real data accumulates.

use std::fmt;

use crate::defaults::FLOOR_RATIO_SCALE;
use crate::devices::ZramDevice;
use crate::meminfo::MemorySnapshot;

/// How trustworthy the projection is. A pure step function of the
/// fullness fraction with breakpoints at 0.10 and 0.50.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Uncertain,
    Confident,
    Certain,
}

impl Confidence {
    pub fn from_fullness(fullness: f64) -> Self {
        if fullness < 0.10 {
            Confidence::Uncertain
        } else if fullness < 0.50 {
            Confidence::Confident
        } else {
            Confidence::Certain
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Uncertain => "uncertain",
            Confidence::Confident => "confident",
            Confidence::Certain => "certain",
        };
        f.write_str(label)
    }
}

/// Compression ratios derived from one tick's counters.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// orig / compr: the pure algorithmic ratio.
    pub raw_factor: f64,
    /// orig / mem_used: includes device bookkeeping overhead.
    pub effective_factor: f64,
    /// orig / disksize, clamped to [0, 1].
    pub fullness: f64,
    /// Conservative lower bound the projection decays toward.
    pub floor_ratio: f64,
    /// Blend of effective_factor and floor_ratio by fullness.
    pub projected_factor: f64,
    pub confidence: Confidence,
}

/// The blend at the heart of the projection: equals `effective` at
/// fullness 1, `floor` at fullness 0.
fn blend(effective: f64, floor: f64, fullness: f64) -> f64 {
    effective * fullness + floor * (1.0 - fullness)
}

impl Projection {
    fn from_counters(orig: u64, compr: u64, mem_used: u64, disksize: u64) -> Option<Self> {
        if orig == 0 || compr == 0 || mem_used == 0 || disksize == 0 {
            return None;
        }
        let raw_factor = orig as f64 / compr as f64;
        let effective_factor = orig as f64 / mem_used as f64;
        let fullness = (orig as f64 / disksize as f64).clamp(0.0, 1.0);
        let floor_ratio = effective_factor * FLOOR_RATIO_SCALE;

        Some(Projection {
            raw_factor,
            effective_factor,
            fullness,
            floor_ratio,
            projected_factor: blend(effective_factor, floor_ratio, fullness),
            confidence: Confidence::from_fullness(fullness),
        })
    }

    /// Projection for a single device. None when the device holds no
    /// data (all ratios undefined).
    pub fn for_device(dev: &ZramDevice) -> Option<Self> {
        Self::from_counters(
            dev.orig_data_size,
            dev.compr_data_size,
            dev.mem_used_total,
            dev.disksize,
        )
    }
}

/// Aggregate projection across all devices, computed from the summed
/// counters. Summing before dividing weights each device by the data it
/// actually holds. None when nothing projectable is present.
pub fn aggregate(devs: &[ZramDevice]) -> Option<Projection> {
    let orig: u64 = devs.iter().map(|d| d.orig_data_size).sum();
    let compr: u64 = devs.iter().map(|d| d.compr_data_size).sum();
    let mem_used: u64 = devs.iter().map(|d| d.mem_used_total).sum();
    let disksize: u64 = devs.iter().map(|d| d.disksize).sum();
    Projection::from_counters(orig, compr, mem_used, disksize)
}

/// Memory figures treating compressed data as decompressed at the
/// projected ratio.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveMemory {
    pub e_total: u64,
    pub e_used: u64,
    pub e_avail: u64,
}

/// Convert a physical snapshot into effective figures using the
/// aggregate projected factor and summed device counters.
pub fn effective_memory(snap: &MemorySnapshot, devs: &[ZramDevice], proj: &Projection) -> EffectiveMemory {
    let compr: u64 = devs.iter().map(|d| d.compr_data_size).sum();
    let disksize: u64 = devs.iter().map(|d| d.disksize).sum();
    let p = proj.projected_factor;

    let scale = |v: u64| (v as f64 * p).round() as i128;

    let e_used = (snap.used as i128 - compr as i128 + scale(compr)).max(0) as u64;
    let e_total = (snap.total as i128 - disksize as i128 + scale(disksize)).max(0) as u64;
    let e_avail = e_total.saturating_sub(e_used);

    EffectiveMemory {
        e_total,
        e_used,
        e_avail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{GIB, MIB};

    const EPS: f64 = 1e-9;

    fn device(orig: u64, compr: u64, mem_used: u64, disksize: u64) -> ZramDevice {
        ZramDevice {
            index: 0,
            disksize,
            orig_data_size: orig,
            compr_data_size: compr,
            mem_used_total: mem_used,
            mem_limit: 0,
            mem_used_max: mem_used,
        }
    }

    #[test]
    fn test_confidence_breakpoints_exact() {
        assert_eq!(Confidence::from_fullness(0.0), Confidence::Uncertain);
        assert_eq!(Confidence::from_fullness(0.0999999), Confidence::Uncertain);
        assert_eq!(Confidence::from_fullness(0.10), Confidence::Confident);
        assert_eq!(Confidence::from_fullness(0.4999999), Confidence::Confident);
        assert_eq!(Confidence::from_fullness(0.50), Confidence::Certain);
        assert_eq!(Confidence::from_fullness(1.0), Confidence::Certain);
    }

    #[test]
    fn test_blend_endpoints() {
        // Full device: projection is exactly the measurement.
        assert!((blend(4.2, 2.52, 1.0) - 4.2).abs() < EPS);
        // Empty device: projection is exactly the floor.
        assert!((blend(4.2, 2.52, 0.0) - 2.52).abs() < EPS);
    }

    #[test]
    fn test_projection_never_exceeds_effective() {
        for fullness in [0.0, 0.1, 0.3, 0.7, 1.0] {
            let p = blend(3.5, 3.5 * FLOOR_RATIO_SCALE, fullness);
            assert!(p <= 3.5 + EPS);
        }
    }

    #[test]
    fn test_projection_monotonic_in_fullness() {
        let mut last = 0.0;
        for step in 0..=10 {
            let p = blend(4.0, 2.4, step as f64 / 10.0);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn test_reference_scenario() {
        // 12 GiB disksize, 2.6 GiB stored, 607.3 MiB compressed,
        // 623.1 MiB of RAM consumed.
        let dev = device(
            (2.6 * GIB as f64) as u64,
            (607.3 * MIB as f64) as u64,
            (623.1 * MIB as f64) as u64,
            12 * GIB,
        );
        let proj = Projection::for_device(&dev).unwrap();

        assert!((proj.raw_factor - 4.38).abs() < 0.05);
        assert!((proj.effective_factor - 4.27).abs() < 0.05);
        assert!((proj.fullness - 0.217).abs() < 0.001);
        assert_eq!(proj.confidence, Confidence::Confident);
        assert!((proj.floor_ratio - proj.effective_factor * 0.6).abs() < EPS);
        // Blend lands between floor and effective, close to the floor
        // at ~22% fullness.
        assert!(proj.projected_factor > proj.floor_ratio);
        assert!(proj.projected_factor < proj.effective_factor);
        assert!((proj.projected_factor - 2.93).abs() < 0.05);
    }

    #[test]
    fn test_empty_device_has_no_projection() {
        let dev = device(0, 0, 0, 12 * GIB);
        assert!(Projection::for_device(&dev).is_none());
    }

    #[test]
    fn test_aggregate_weights_by_stored_data() {
        // One device holds 4x the data of the other at a different
        // ratio; the aggregate must sit nearer the big device's ratio.
        let big = device(4 * GIB, GIB, GIB + 100 * MIB, 8 * GIB); // ~4x raw
        let small = device(GIB, 512 * MIB, 600 * MIB, 8 * GIB); // 2x raw
        let agg = aggregate(&[big, small]).unwrap();
        let mid = (4.0 + 2.0) / 2.0;
        assert!(agg.raw_factor > mid);
    }

    #[test]
    fn test_aggregate_of_nothing() {
        assert!(aggregate(&[]).is_none());
        let idle = device(0, 0, 0, GIB);
        assert!(aggregate(&[idle]).is_none());
    }

    #[test]
    fn test_effective_memory_grows_when_ratio_above_one() {
        let dev = device(2 * GIB, 512 * MIB, 600 * MIB, 8 * GIB);
        let proj = Projection::for_device(&dev).unwrap();
        assert!(proj.projected_factor >= 1.0);

        let snap = MemorySnapshot {
            total: 8 * GIB,
            used: 5 * GIB,
            available: 3 * GIB,
        };
        let eff = effective_memory(&snap, &[dev], &proj);

        assert!(eff.e_used >= snap.used);
        assert!(eff.e_total >= snap.total);
        assert_eq!(eff.e_avail, eff.e_total - eff.e_used);
    }

    #[test]
    fn test_effective_available_clamps_at_zero() {
        // Pathological counters (mem_used above orig) push the
        // projected ratio below 1; the figures must clamp, not wrap.
        let dev = device(600 * MIB, 512 * MIB, 1024 * MIB, GIB);
        let proj = Projection::for_device(&dev).unwrap();
        assert!(proj.projected_factor < 1.0);

        let snap = MemorySnapshot {
            total: 2 * GIB,
            used: 2 * GIB,
            available: 0,
        };
        let eff = effective_memory(&snap, &[dev], &proj);
        assert!(eff.e_used > eff.e_total);
        assert_eq!(eff.e_avail, 0);
    }
}
