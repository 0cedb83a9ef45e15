// Sizing argument parsing and byte resolution
// SPDX-License-Identifier: GPL-3.0-or-later
//
// Tokens: `<float>x` multiplies physical RAM, `<int>m`/`<int>g` caps
// the total. Resolved size = min(multiplier × RAM, cap), split evenly
// across the device count. Byte math is pure integer; the multiplier is
// carried as an exact decimal rational, floating point appears only in
// its user-facing rendering.

use std::fmt;

use thiserror::Error;

use crate::defaults;
use crate::helpers::{GIB, MIB};

#[derive(Error, Debug)]
pub enum SizingError {
    #[error("unrecognized sizing token '{0}' (expected <float>x, <int>m, or <int>g)")]
    BadToken(String),
    #[error("invalid multiplier '{0}'")]
    BadMultiplier(String),
    #[error("device count must be at least 1")]
    ZeroDevices,
}

pub type Result<T> = std::result::Result<T, SizingError>;

/// RAM multiplier as an exact decimal rational ("1.75" -> 175/100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplier {
    pub num: u32,
    pub den: u32,
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier {
            num: defaults::MULTIPLIER_NUM,
            den: defaults::MULTIPLIER_DEN,
        }
    }
}

impl Multiplier {
    /// Parse the numeric part of a multiplier token. At most three
    /// fractional digits; anything finer is noise for byte sizing.
    pub fn parse(text: &str) -> Result<Self> {
        let bad = || SizingError::BadMultiplier(text.to_string());

        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if frac_part.len() > 3 {
            return Err(bad());
        }

        let int: u32 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| bad())?
        };
        let den = 10u32.pow(frac_part.len() as u32);
        let frac: u32 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| bad())?
        };

        let num = int.checked_mul(den).and_then(|n| n.checked_add(frac)).ok_or_else(bad)?;
        if num == 0 {
            return Err(bad());
        }
        Ok(Multiplier { num, den })
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.num / self.den;
        let rem = self.num % self.den;
        if rem == 0 {
            write!(f, "{}", int)
        } else {
            let digits = self.den.ilog10() as usize;
            let frac = format!("{:0width$}", rem, width = digits);
            write!(f, "{}.{}", int, frac.trim_end_matches('0'))
        }
    }
}

/// Cap token value in bytes; None when the byte count overflows u64.
fn parse_cap(num: &str, unit: u64) -> Option<u64> {
    num.parse::<u64>().ok()?.checked_mul(unit)
}

/// Resolved sizing request: multiplier, absolute cap, device count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingSpec {
    pub multiplier: Multiplier,
    pub cap_bytes: u64,
    pub device_count: u32,
}

impl Default for SizingSpec {
    fn default() -> Self {
        SizingSpec {
            multiplier: Multiplier::default(),
            cap_bytes: defaults::CAP_MB * MIB,
            device_count: defaults::DEVICE_COUNT,
        }
    }
}

impl SizingSpec {
    /// Build a spec from trailing CLI tokens. Unrecognized tokens fail
    /// fast before any action is taken.
    pub fn parse_tokens(tokens: &[String], device_count: u32) -> Result<Self> {
        if device_count == 0 {
            return Err(SizingError::ZeroDevices);
        }
        let mut spec = SizingSpec {
            device_count,
            ..Default::default()
        };

        for token in tokens {
            let lower = token.to_lowercase();
            if let Some(num) = lower.strip_suffix('x') {
                spec.multiplier = Multiplier::parse(num)?;
            } else if let Some(mb) = lower.strip_suffix('m') {
                spec.cap_bytes = parse_cap(mb, MIB).ok_or_else(|| SizingError::BadToken(token.clone()))?;
            } else if let Some(gb) = lower.strip_suffix('g') {
                spec.cap_bytes = parse_cap(gb, GIB).ok_or_else(|| SizingError::BadToken(token.clone()))?;
            } else {
                return Err(SizingError::BadToken(token.clone()));
            }
        }

        Ok(spec)
    }

    /// Total disksize for a host with `ram` bytes of physical memory.
    pub fn resolved_bytes(&self, ram: u64) -> u64 {
        let scaled = (ram as u128 * self.multiplier.num as u128 / self.multiplier.den as u128)
            .min(u64::MAX as u128) as u64;
        scaled.min(self.cap_bytes)
    }

    /// Equal per-device share, aligned down to the page size.
    pub fn per_device_bytes(&self, ram: u64, page_size: u64) -> u64 {
        let share = self.resolved_bytes(ram) / self.device_count as u64;
        share - share % page_size.max(1)
    }

    /// Re-render as CLI tokens, used to bake sizing into the boot
    /// service definition.
    pub fn tokens(&self) -> String {
        let cap = if self.cap_bytes % GIB == 0 {
            format!("{}g", self.cap_bytes / GIB)
        } else {
            format!("{}m", self.cap_bytes / MIB)
        };
        format!("{}x {}", self.multiplier, cap)
    }
}
