//! Row/period helpers shared by the pipeline stages.

/// First data row; rows 1 and 2 hold the header.
pub const FIRST_DATA_ROW: usize = 3;

/// Seconds per minute, for deadtime and lag constants given in minutes.
pub const SECS_PER_MIN: f64 = 60.0;

/// Rows per reporting event: `period_s / base_period_s` by integer division.
/// - Clamps the base period to at least 1 second to avoid division by zero.
/// - Ensures result is at least 1 row.
#[inline]
pub fn rows_per_period(period_s: u32, base_period_s: u32) -> usize {
    debug_assert!(base_period_s > 0, "base_period_s must be > 0");
    ((period_s / base_period_s.max(1)) as usize).max(1)
}

/// Whole rows covered by a duration given in minutes (truncating).
#[inline]
pub fn minutes_to_rows(minutes: f64, base_period_s: u32) -> usize {
    let rows = minutes * SECS_PER_MIN / f64::from(base_period_s.max(1));
    if rows.is_finite() && rows > 0.0 {
        rows as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_per_period_divides_and_floors() {
        assert_eq!(rows_per_period(30, 5), 6);
        assert_eq!(rows_per_period(3600, 5), 720);
        assert_eq!(rows_per_period(7, 5), 1);
        assert_eq!(rows_per_period(3, 5), 1);
    }

    #[test]
    fn minutes_to_rows_truncates() {
        assert_eq!(minutes_to_rows(1.0, 5), 12);
        assert_eq!(minutes_to_rows(0.1, 5), 1);
        assert_eq!(minutes_to_rows(0.0, 5), 0);
        assert_eq!(minutes_to_rows(-2.0, 5), 0);
    }
}
