//! Byte-size formatting for reports

use crate::model::Count32;

/// Format a byte counter as a human-readable string (B, KiB, MiB, GiB).
///
/// A saturated counter is rendered as a lower bound, since the true
/// value may be anything at or above the clamp.
pub fn format_size(count: Count32) -> String {
    const KIB: u64 = 1 << 10;
    const MIB: u64 = 1 << 20;
    const GIB: u64 = 1 << 30;

    let bytes = count.value() as u64;
    let rendered = if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    };

    if count == Count32::MAX {
        format!(">= {}", rendered)
    } else {
        rendered
    }
}
