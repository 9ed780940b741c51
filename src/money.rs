//! Fixed-point money helpers. Amounts never pass through floating point.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// `price × quantity` for one line.
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    price * Decimal::from(quantity)
}

/// Sum of `price × quantity` over `lines`.
pub fn sum_lines<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, qty)| line_total(price, qty))
        .sum()
}

/// Converts a major-unit amount to integer cents, rounding half to even at
/// two decimal places. Returns `None` for negative or out-of-range amounts.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return None;
    }
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        * Decimal::ONE_HUNDRED;
    cents.trunc().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(10.00), Some(1000))]
    #[case(dec!(19.99), Some(1999))]
    #[case(dec!(0.125), Some(12))]
    #[case(dec!(0.135), Some(14))]
    #[case(dec!(0), Some(0))]
    #[case(dec!(-1), None)]
    fn minor_units(#[case] amount: Decimal, #[case] expected: Option<i64>) {
        assert_eq!(to_minor_units(amount), expected);
    }

    #[test]
    fn sums_lines_exactly() {
        let total = sum_lines(vec![(dec!(0.10), 3), (dec!(10.00), 2)]);
        assert_eq!(total, dec!(20.30));
    }
}
