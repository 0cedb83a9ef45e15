// Helper utilities for zram-advisor
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::symlink;
use std::path::Path;

use thiserror::Error;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HelperError>;

/// Write string to file.
/// For sysfs/procfs (virtual filesystems), writes without fsync.
/// For real filesystem paths, calls sync_all to ensure persistence.
pub fn write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    let path_str = path.to_string_lossy();
    if !path_str.starts_with("/sys/") && !path_str.starts_with("/proc/") {
        file.sync_all()?;
    }
    Ok(())
}

/// Create relative symlink, replacing any existing link
pub fn relative_symlink<P: AsRef<Path>, Q: AsRef<Path>>(target: P, link_name: Q) -> Result<()> {
    let link_name = link_name.as_ref();
    let target = target.as_ref();

    let _ = fs::remove_file(link_name);

    let link_dir = link_name.parent().unwrap_or(Path::new("."));
    let relative = pathdiff::diff_paths(target, link_dir).unwrap_or(target.to_path_buf());

    symlink(&relative, link_name)?;
    Ok(())
}

/// Format a byte count concisely: one decimal, trailing ".0" stripped.
/// "2.6G", "607.3M", "0".
pub fn human(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }
    let mut value = bytes as f64;
    for suffix in ["", "K", "M", "G", "T"] {
        if value < 999.95 || suffix == "T" {
            let num = format!("{:.1}", value);
            let num = num.strip_suffix(".0").unwrap_or(&num);
            return format!("{}{}", num, suffix);
        }
        value /= 1024.0;
    }
    unreachable!()
}

/// Human size plus percentage of a reference total: "2.6G/33%".
pub fn human_pct(bytes: u64, total: u64) -> String {
    let mut rv = human(bytes);
    if bytes > 0 && total > 0 {
        let pct = (100.0 * bytes as f64 / total as f64).round() as u64;
        rv.push_str(&format!("/{}%", pct));
    }
    rv
}

// Logging macros
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        println!("INFO: {}", format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        eprintln!("WARN: {}", format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        eprintln!("ERRO: {}", format!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if std::env::var("DEBUG").is_ok() {
            eprintln!("DEBUG: {}", format!($($arg)*))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_zero() {
        assert_eq!(human(0), "0");
    }

    #[test]
    fn test_human_plain_bytes() {
        assert_eq!(human(512), "512");
    }

    #[test]
    fn test_human_strips_trailing_zero() {
        assert_eq!(human(2 * GIB), "2G");
        assert_eq!(human(1536 * MIB), "1.5G");
    }

    #[test]
    fn test_human_rolls_over_near_boundary() {
        // 1000 KiB reads better as ~1M than as a four-digit K value
        assert_eq!(human(1000 * KIB), "1M");
    }

    #[test]
    fn test_human_pct() {
        assert_eq!(human_pct(GIB, 4 * GIB), "1G/25%");
        assert_eq!(human_pct(0, 4 * GIB), "0");
        assert_eq!(human_pct(GIB, 0), "1G");
    }
}
