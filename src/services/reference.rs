//! Customer-facing order reference numbers.

use rand::Rng;
use sea_orm::ConnectionTrait;
use tracing::warn;

use crate::errors::ServiceError;
use crate::repositories::{OrderRepository, PaymentRepository};

pub const ORDER_REF_LEN: usize = 8;
const MAX_ATTEMPTS: usize = 5;

/// Random eight-digit reference without a leading zero.
pub fn generate_order_ref() -> String {
    let value: u32 = rand::thread_rng().gen_range(10_000_000..100_000_000);
    value.to_string()
}

pub fn is_valid_order_ref(candidate: &str) -> bool {
    candidate.len() == ORDER_REF_LEN
        && candidate.bytes().all(|b| b.is_ascii_digit())
        && !candidate.starts_with('0')
}

/// Draws references until one is unused by any order or payment. The unique
/// index on `orders.order_ref` still guards the race between check and insert.
pub async fn unique_order_ref<C: ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = generate_order_ref();
        if !OrderRepository::ref_exists(conn, &candidate).await?
            && !PaymentRepository::ref_exists(conn, &candidate).await?
        {
            return Ok(candidate);
        }
        warn!(attempt, "order reference collision, regenerating");
    }

    Err(ServiceError::InternalError(
        "could not allocate a unique order reference".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn generated_refs_are_eight_digits() {
        for _ in 0..1_000 {
            let r = generate_order_ref();
            assert!(is_valid_order_ref(&r), "bad ref {r}");
        }
    }

    #[rstest]
    #[case("12345678", true)]
    #[case("01234567", false)]
    #[case("1234567", false)]
    #[case("123456789", false)]
    #[case("1234567a", false)]
    fn ref_format(#[case] candidate: &str, #[case] valid: bool) {
        assert_eq!(is_valid_order_ref(candidate), valid);
    }
}
