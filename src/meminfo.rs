// Memory information parser for /proc/meminfo
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemInfoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing field: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, MemInfoError>;

/// Host memory totals for one sampling tick.
/// `used` is synthesised as total - available; MemAvailable is the
/// honest "how much can applications still use" metric, MemFree is not.
#[derive(Debug, Clone, Copy)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// Parse requested fields out of /proc/meminfo content.
/// Values reported in kB are converted to bytes; missing fields are
/// simply absent from the result.
fn parse_fields(content: &str, fields: &[&str]) -> HashMap<String, u64> {
    let mut stats = HashMap::new();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        if !fields.contains(&key) || stats.contains_key(key) {
            continue;
        }
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        let value = if parts.next() == Some("kB") {
            value * 1024
        } else {
            value
        };
        stats.insert(key.to_string(), value);
        if stats.len() == fields.len() {
            break;
        }
    }

    stats
}

/// Read one MemorySnapshot from /proc/meminfo.
pub fn sample() -> Result<MemorySnapshot> {
    let content = std::fs::read_to_string("/proc/meminfo")?;
    let stats = parse_fields(&content, &["MemTotal", "MemAvailable"]);

    let total = *stats
        .get("MemTotal")
        .ok_or_else(|| MemInfoError::MissingField("MemTotal".into()))?;
    let available = *stats
        .get("MemAvailable")
        .ok_or_else(|| MemInfoError::MissingField("MemAvailable".into()))?;

    Ok(MemorySnapshot {
        total,
        used: total.saturating_sub(available),
        available,
    })
}

/// Get total RAM in bytes
pub fn get_ram_size() -> Result<u64> {
    Ok(sample()?.total)
}

/// Get page size from system
pub fn get_page_size() -> u64 {
    nix::unistd::sysconf(nix::unistd::SysconfVar::PAGE_SIZE)
        .ok()
        .flatten()
        .unwrap_or(4096) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MemTotal:        8000000 kB\n\
                          MemFree:          200000 kB\n\
                          MemAvailable:    3000000 kB\n\
                          Buffers:          100000 kB\n";

    #[test]
    fn test_parse_fields_converts_kb() {
        let stats = parse_fields(SAMPLE, &["MemTotal", "MemAvailable"]);
        assert_eq!(stats["MemTotal"], 8_000_000 * 1024);
        assert_eq!(stats["MemAvailable"], 3_000_000 * 1024);
    }

    #[test]
    fn test_parse_fields_ignores_unrequested() {
        let stats = parse_fields(SAMPLE, &["MemTotal"]);
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_parse_fields_missing_field() {
        let stats = parse_fields(SAMPLE, &["SwapTotal"]);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_sample_live() {
        let snap = sample().unwrap();
        assert!(snap.total > 0);
        assert_eq!(snap.used, snap.total - snap.available);
    }
}
