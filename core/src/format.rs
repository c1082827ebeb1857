//! Fixed-width number formatting used by the sensors.
//!
//! Bar text jitters when a value changes length between refreshes, so
//! readings are rendered into a fixed number of characters with the
//! precision chosen by magnitude.

/// Width used by the sensors when none is configured.
pub const DEFAULT_WIDTH: usize = 4;

const BYTE_UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
const BYTE_BASE: f64 = 1000.0;

/// Render `value` right-aligned into exactly `width` characters.
///
/// Values of 100 and above are rounded to an integer, values from 10 get one
/// decimal and smaller values two. Longer results are cut from the right.
///
/// # Examples
///
/// ```rust
/// use waygauge_core::format::format_number;
///
/// assert_eq!(format_number(75.5, 4), "75.5");
/// assert_eq!(format_number(5.25, 4), "5.25");
/// assert_eq!(format_number(100.0, 4), " 100");
/// assert_eq!(format_number(12345.0, 4), "1234");
/// ```
#[must_use]
pub fn format_number(value: f64, width: usize) -> String {
    let rendered = if value >= 100.0 {
        format!("{:.0}", value.round())
    } else if value >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    };

    let len = rendered.chars().count();
    if len > width {
        rendered.chars().take(width).collect()
    } else {
        format!("{rendered:>width$}")
    }
}

/// Scale a byte count through `K`..`E` with base 1000.
///
/// The mantissa is rendered by [`format_number`] with the default width and
/// followed by a single unit letter, so the result is always five characters.
/// Anything under a kilobyte is shown as a fraction of one.
///
/// # Examples
///
/// ```rust
/// use waygauge_core::format::scale_bytes;
///
/// assert_eq!(scale_bytes(0), "0.00K");
/// assert_eq!(scale_bytes(500), "0.50K");
/// assert_eq!(scale_bytes(1_500_000), "1.50M");
/// assert_eq!(scale_bytes(250_000_000), " 250M");
/// ```
#[must_use]
pub fn scale_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    if size < 10.0 {
        return "0.00K".to_owned();
    }

    let mut unit = 0;
    size /= BYTE_BASE;
    while size >= BYTE_BASE && unit < BYTE_UNITS.len() - 1 {
        size /= BYTE_BASE;
        unit += 1;
    }

    format!("{}{}", format_number(size, DEFAULT_WIDTH), BYTE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_precision_by_magnitude() {
        assert_eq!(format_number(75.5, 4), "75.5");
        assert_eq!(format_number(5.25, 4), "5.25");
        assert_eq!(format_number(100.0, 4), " 100");
        assert_eq!(format_number(99.96, 4), "100.");
        assert_eq!(format_number(0.0, 4), "0.00");
        assert_eq!(format_number(3.14159, 4), "3.14");
    }

    #[test]
    fn test_padding_is_on_the_left() {
        assert_eq!(format_number(5.0, 6), "  5.00");
        assert_eq!(format_number(250.4, 5), "  250");
    }

    #[test]
    fn test_truncation_is_on_the_right() {
        assert_eq!(format_number(12.345, 3), "12.");
        assert_eq!(format_number(123456.0, 4), "1234");
        assert_eq!(format_number(-5.25, 4), "-5.2");
    }

    #[test]
    fn test_scale_bytes_units() {
        assert_eq!(scale_bytes(9), "0.00K");
        assert_eq!(scale_bytes(10), "0.01K");
        assert_eq!(scale_bytes(1_000), "1.00K");
        assert_eq!(scale_bytes(42_000), "42.0K");
        assert_eq!(scale_bytes(999_999), "1000K");
        assert_eq!(scale_bytes(1_000_000), "1.00M");
        assert_eq!(scale_bytes(3_200_000_000), "3.20G");
        assert_eq!(scale_bytes(u64::MAX), "18.4E");
    }

    proptest! {
        #[test]
        fn prop_format_number_has_exact_width(value in -1.0e9f64..1.0e9, width in 1usize..12) {
            prop_assert_eq!(format_number(value, width).chars().count(), width);
        }

        #[test]
        fn prop_scale_bytes_is_five_chars(bytes in any::<u64>()) {
            prop_assert_eq!(scale_bytes(bytes).chars().count(), 5);
        }
    }
}
