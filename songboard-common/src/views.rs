//! Human-readable view counts
//!
//! Provides the compact `K`/`M`/`B` notation shown next to each song.

/// Magnitude thresholds for compact notation
const THOUSAND: i64 = 1_000;
const MILLION: i64 = 1_000_000;
const BILLION: i64 = 1_000_000_000;

/// Format a view count in compact notation.
///
/// - `>= 1B` → two decimals with `B`
/// - `>= 1M` → two decimals with `M`
/// - `>= 1K` → one decimal with `K`
/// - otherwise the plain number
///
/// # Examples
///
/// ```
/// use songboard_common::views::format_views;
///
/// assert_eq!(format_views(999), "999");
/// assert_eq!(format_views(154_000), "154.0K");
/// assert_eq!(format_views(5_200_000), "5.20M");
/// assert_eq!(format_views(1_250_000_000), "1.25B");
/// ```
pub fn format_views(views: i64) -> String {
    // Negative counts never come from the resolver; show them raw
    if views < THOUSAND {
        return views.to_string();
    }

    let value = views as f64;
    if views >= BILLION {
        format!("{:.2}B", value / BILLION as f64)
    } else if views >= MILLION {
        format!("{:.2}M", value / MILLION as f64)
    } else {
        format!("{:.1}K", value / THOUSAND as f64)
    }
}
