use proptest::prelude::*;
use rust_decimal::Decimal;
use shopfront_api::{
    money::{line_total, sum_lines, to_minor_units},
    services::reference::{generate_order_ref, is_valid_order_ref, ORDER_REF_LEN},
};

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn lines_strategy() -> impl Strategy<Value = Vec<(Decimal, i32)>> {
    prop::collection::vec((price_strategy(), 1i32..1_000), 0..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn cart_total_equals_sum_of_line_totals(lines in lines_strategy()) {
        let mut expected = Decimal::ZERO;
        for (price, qty) in &lines {
            expected += *price * Decimal::from(*qty);
        }
        prop_assert_eq!(sum_lines(lines.iter().copied()), expected);
    }

    #[test]
    fn cart_total_ignores_line_order(mut lines in lines_strategy()) {
        let forward = sum_lines(lines.iter().copied());
        lines.reverse();
        prop_assert_eq!(sum_lines(lines), forward);
    }

    #[test]
    fn two_decimal_amounts_convert_to_exact_cents(cents in 0i64..10_000_000_000) {
        prop_assert_eq!(to_minor_units(Decimal::new(cents, 2)), Some(cents));
    }

    #[test]
    fn minor_units_scale_with_quantity(price in price_strategy(), qty in 1i32..100) {
        let unit = to_minor_units(price).unwrap();
        prop_assert_eq!(to_minor_units(line_total(price, qty)), Some(unit * i64::from(qty)));
    }

    #[test]
    fn negative_amounts_have_no_minor_units(cents in 1i64..10_000_000) {
        prop_assert_eq!(to_minor_units(Decimal::new(-cents, 2)), None);
    }

    #[test]
    fn eight_digit_numbers_are_valid_refs(n in 10_000_000u32..100_000_000) {
        prop_assert!(is_valid_order_ref(&n.to_string()));
    }

    #[test]
    fn refs_with_letters_are_invalid(prefix in "[0-9]{0,7}", letter in "[a-z]") {
        let candidate = format!("{}{}", prefix, letter);
        prop_assert!(!is_valid_order_ref(&candidate));
    }
}

#[test]
fn generated_order_refs_are_well_formed() {
    for _ in 0..500 {
        let order_ref = generate_order_ref();
        assert_eq!(order_ref.len(), ORDER_REF_LEN);
        assert!(is_valid_order_ref(&order_ref), "{}", order_ref);
    }
}
