//! Monetary rounding and comparison helpers.
//!
//! Prices are plain `f64` roubles rounded to two decimal places at every
//! aggregation step, so an independent audit script recomputing a booking
//! arrives at bit-identical totals.

/// Comparison slack tolerating floating rounding in cumulative payments.
pub const PAYMENT_EPSILON: f64 = 1e-6;

/// Round a monetary amount to two decimal places (standard rounding).
///
/// # Examples
/// ```
/// use backend::domain::money::round2;
///
/// assert_eq!(round2(1234.5678), 1234.57);
/// assert_eq!(round2(2.675 * 3.0), 8.03);
/// ```
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Whether `amount` is zero within [`PAYMENT_EPSILON`].
pub fn is_zero(amount: f64) -> bool {
    amount.abs() < PAYMENT_EPSILON
}

/// Whether `paid` covers `total` within [`PAYMENT_EPSILON`].
pub fn covers(paid: f64, total: f64) -> bool {
    paid >= total - PAYMENT_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_half_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(1000.0), 1000.0);
        assert_eq!(round2(999.994), 999.99);
    }

    #[test]
    fn covers_tolerates_float_drift() {
        // Three thirds of 1000 accumulate to 999.999999... in binary floats.
        let paid = 333.33 + 333.33 + 333.34;
        assert!(covers(paid, 1000.0));
        assert!(!covers(999.98, 1000.0));
    }

    #[test]
    fn zero_detection() {
        assert!(is_zero(0.0));
        assert!(is_zero(1e-9));
        assert!(!is_zero(0.01));
    }
}
