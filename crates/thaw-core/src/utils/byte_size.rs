//! Byte-size constants, alignment and human-readable sizes.

pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;

const UNITS: [(&str, u64); 4] = [("TiB", GIB * 1024), ("GiB", GIB), ("MiB", MIB), ("KiB", KIB)];

/// Round `value` down to a multiple of `alignment`.
#[must_use]
pub const fn align_down(value: u64, alignment: u64) -> u64 {
    value - value % alignment
}

/// Render a byte count in binary units, e.g. `1.50 MiB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    for (unit, size) in UNITS {
        if bytes >= size {
            return format!("{:.2} {unit}", bytes as f64 / size as f64);
        }
    }
    format!("{bytes} B")
}

/// Parse a size such as `1024`, `10K`, `256k`, `1M`, `1.5G` or `2MiB`.
///
/// Suffixes are binary multiples.
pub fn parse_byte_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty size".to_string());
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let multiplier = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KIB,
        "M" | "MB" | "MIB" => MIB,
        "G" | "GB" | "GIB" => GIB,
        other => return Err(format!("unknown size suffix '{other}'")),
    };

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid size '{input}'"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid size '{input}'"));
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let bytes = (value * multiplier as f64).round() as u64;
    Ok(bytes)
}
