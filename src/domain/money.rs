//! Monetary amounts.
//!
//! Amounts are persisted as two-decimal TEXT columns and handled in logic as
//! `rust_decimal::Decimal`. All rounding in the rental workflow is half-up to
//! cents.

use rust_decimal::{Decimal, RoundingStrategy};

use super::DomainError;

/// Round to two decimals, half-up.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a stored or user-supplied amount.
pub fn parse_amount(raw: &str) -> Result<Decimal, DomainError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| DomainError::Validation(format!("Invalid amount: '{}'", raw)))
}

/// Format an amount for storage and display ("50.00", never "50.0").
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up_to_cents() {
        assert_eq!(format_amount(round_cents("16.665".parse().unwrap())), "16.67");
        assert_eq!(format_amount(round_cents("16.664".parse().unwrap())), "16.66");
        assert_eq!(format_amount(round_cents("100".parse().unwrap())), "100.00");
    }

    #[test]
    fn rejects_garbage_amounts() {
        assert!(parse_amount("12.50").is_ok());
        assert!(parse_amount("  7 ").is_ok());
        assert!(parse_amount("twelve").is_err());
        assert!(parse_amount("").is_err());
    }
}
