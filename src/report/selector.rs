use std::collections::BTreeSet;

use crate::error::{AppError, Result};
use crate::types::{MonthBucket, Order};

/// Distinct months present in the orders, in calendar order.
pub fn available_months(orders: &[Order]) -> Vec<MonthBucket> {
    orders
        .iter()
        .map(|o| o.month)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Resolve the month a request asks for. With no month requested the first
/// (earliest) available month is used. An empty month list is the explicit
/// "no data" state.
pub fn select_month(available: &[MonthBucket], requested: Option<MonthBucket>) -> Result<MonthBucket> {
    let first = *available.first().ok_or(AppError::NoData)?;
    match requested {
        None => Ok(first),
        Some(m) if available.binary_search(&m).is_ok() => Ok(m),
        Some(m) => Err(AppError::UnknownMonth(m)),
    }
}

pub fn filter_month(orders: &[Order], month: MonthBucket) -> Vec<&Order> {
    orders.iter().filter(|o| o.month == month).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn order(date: &str, revenue: f64) -> Order {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        order_on(date, revenue)
    }

    fn order_on(date: NaiveDate, revenue: f64) -> Order {
        let date = date.and_hms_opt(0, 0, 0).unwrap();
        Order {
            date,
            month: MonthBucket::from_date(&date),
            revenue,
            product_cost: 0.0,
            install_cost: 0.0,
            gross_profit: revenue,
            technician: None,
            supplier: None,
            cells: vec![CellValue::DateTime(date), CellValue::Number(revenue)],
        }
    }

    fn m(s: &str) -> MonthBucket {
        s.parse().unwrap()
    }

    #[test]
    fn months_are_distinct_and_calendar_sorted() {
        let orders = vec![
            order("2026-02-03", 1.0),
            order("2025-12-30", 1.0),
            order("2026-01-05", 1.0),
            order("2026-02-10", 1.0),
        ];
        assert_eq!(
            available_months(&orders),
            vec![m("12/2025"), m("01/2026"), m("02/2026")]
        );
    }

    #[test]
    fn empty_month_list_is_no_data() {
        assert!(matches!(select_month(&[], None), Err(AppError::NoData)));
        assert!(matches!(select_month(&[], Some(m("01/2026"))), Err(AppError::NoData)));
    }

    #[test]
    fn selection_defaults_to_first_and_rejects_unknown() {
        let months = vec![m("12/2025"), m("01/2026")];
        assert_eq!(select_month(&months, None).unwrap(), m("12/2025"));
        assert_eq!(select_month(&months, Some(m("01/2026"))).unwrap(), m("01/2026"));
        assert!(matches!(
            select_month(&months, Some(m("03/2026"))),
            Err(AppError::UnknownMonth(_))
        ));
    }

    #[test]
    fn month_filters_partition_the_order_set() {
        let orders = vec![
            order("2026-01-05", 1000.0),
            order("2026-01-20", 500.0),
            order("2026-02-01", 10.0),
            order("2025-11-15", 7.0),
            order("2026-02-28", 3.0),
        ];
        let months = available_months(&orders);

        let mut seen = vec![0usize; orders.len()];
        for month in &months {
            for o in filter_month(&orders, *month) {
                assert_eq!(o.month, *month);
                let idx = orders.iter().position(|x| std::ptr::eq(x, o)).unwrap();
                seen[idx] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1), "each order in exactly one month: {seen:?}");
    }

    fn order_set() -> impl Strategy<Value = Vec<Order>> {
        proptest::collection::vec((2019i32..2031, 1u32..=12, 1u32..=28, 0u32..1_000_000), 0..64)
            .prop_map(|rows| {
                rows.into_iter()
                    .map(|(y, m, d, cents)| {
                        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
                        order_on(date, f64::from(cents) / 100.0)
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn monthly_subsets_partition_any_order_set(orders in order_set()) {
            let months = available_months(&orders);
            prop_assert!(months.windows(2).all(|w| w[0] < w[1]));

            let mut seen = vec![0usize; orders.len()];
            for month in &months {
                let subset = filter_month(&orders, *month);
                prop_assert!(!subset.is_empty());
                for o in subset {
                    prop_assert_eq!(o.month, *month);
                    let idx = orders.iter().position(|x| std::ptr::eq(x, o)).unwrap();
                    seen[idx] += 1;
                }
            }
            prop_assert!(seen.iter().all(|&n| n == 1));
        }
    }
}
