//! Order capacity gating.
//!
//! Both the catalog (request button state) and the hold request flow ask
//! these two functions, so they cannot disagree for the same inputs.

/// A value that can be read as an order count.
///
/// Numbers convert directly and numeric-looking text is parsed after trimming.
/// Anything else, including text that parses to an infinity such as `inf`,
/// reads as NaN, which makes every capacity comparison fail.
pub trait OrderCount {
    fn as_count(&self) -> f64;
}

macro_rules! order_count_via_f64 {
    ($($t:ty),*) => {
        $(impl OrderCount for $t {
            fn as_count(&self) -> f64 {
                *self as f64
            }
        })*
    };
}

order_count_via_f64!(i32, i64, u32, u64, usize, f64);

impl OrderCount for str {
    fn as_count(&self) -> f64 {
        self.trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or(f64::NAN)
    }
}

impl OrderCount for &str {
    fn as_count(&self) -> f64 {
        (**self).as_count()
    }
}

impl OrderCount for String {
    fn as_count(&self) -> f64 {
        self.as_str().as_count()
    }
}

impl<T: OrderCount> OrderCount for Option<T> {
    fn as_count(&self) -> f64 {
        self.as_ref().map_or(f64::NAN, OrderCount::as_count)
    }
}

pub fn can_request_more<A, M>(active_count: A, max_orders: M) -> bool
where
    A: OrderCount,
    M: OrderCount,
{
    active_count.as_count() < max_orders.as_count()
}

pub fn is_request_disabled<A, M>(active_count: A, max_orders: M) -> bool
where
    A: OrderCount,
    M: OrderCount,
{
    !can_request_more(active_count, max_orders)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_integer_comparison() {
        for a in -3i64..8 {
            for m in -3i64..8 {
                assert_eq!(can_request_more(a, m), a < m, "a={} m={}", a, m);
                assert_eq!(is_request_disabled(a, m), a >= m);
            }
        }
    }

    #[test]
    fn accepts_numeric_text() {
        assert!(can_request_more("2", 4u32));
        assert!(can_request_more(" 3 ", "4"));
        assert!(!can_request_more("4", 4usize));
        assert!(can_request_more(String::from("1.5"), 2i32));
    }

    #[test]
    fn fails_closed_on_non_numeric_input() {
        assert!(!can_request_more("two", 4));
        assert!(!can_request_more(1, "many"));
        assert!(!can_request_more("", 4));
        assert!(!can_request_more(None::<i64>, 4));
        assert!(!can_request_more(f64::NAN, 4));
        assert!(is_request_disabled("abc", 10));
    }

    #[test]
    fn infinity_spellings_are_not_counts() {
        assert!(!can_request_more(0, "inf"));
        assert!(!can_request_more(0, "INF"));
        assert!(!can_request_more("-inf", 4));
        assert!(!can_request_more(" infinity ", 4));
        assert!(is_request_disabled("-Infinity", 4u32));
    }

    #[test]
    fn scenario_capacity() {
        assert!(can_request_more(2usize, 4u32));
        assert!(is_request_disabled(4usize, 4u32));
    }
}
