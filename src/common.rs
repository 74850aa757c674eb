use std::time::{SystemTime, UNIX_EPOCH};

use crate::cuckoo::error::{CuckooError, Result};

// Format a byte count in human-readable form
pub fn bytes2hr(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let value = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if value < KB * KB {
        format!("{:.2} KB", value / KB)
    } else if value < KB * KB * KB {
        format!("{:.2} MB", value / (KB * KB))
    } else {
        format!("{:.2} GB", value / (KB * KB * KB))
    }
}

/// Wall-clock time in nanoseconds since the Unix epoch.
pub fn now_nanos() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CuckooError::TimeError(e.to_string()))?;
    Ok(elapsed.as_nanos() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes2hr() {
        assert_eq!(bytes2hr(512), "512 bytes");
        assert_eq!(bytes2hr(2048), "2.00 KB");
        assert_eq!(bytes2hr(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(bytes2hr(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_now_nanos_is_after_2020() {
        assert!(now_nanos().unwrap() > 1_577_836_800_000_000_000);
    }
}
