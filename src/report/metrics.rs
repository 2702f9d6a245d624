use std::collections::{BTreeMap, HashMap};

use crate::types::{
    FinancialTarget, Figure, Missing, MonthBucket, MonthlyAggregate, Order, TechnicianProfit,
};

/// Totals, count and average ticket over one set of orders.
/// The average ticket is `undefined` for an empty set.
pub fn aggregate(month: MonthBucket, orders: &[&Order]) -> MonthlyAggregate {
    let total_revenue: f64 = orders.iter().map(|o| o.revenue).sum();
    let total_profit: f64 = orders.iter().map(|o| o.gross_profit).sum();
    let order_count = orders.len();
    let average_ticket = if order_count == 0 {
        Figure::Missing(Missing::Undefined)
    } else {
        Figure::Value(total_revenue / order_count as f64)
    };

    MonthlyAggregate {
        month,
        total_revenue,
        total_profit,
        order_count,
        average_ticket,
    }
}

/// One aggregate per month present in `orders`, oldest first.
pub fn monthly_series(orders: &[Order]) -> Vec<MonthlyAggregate> {
    let mut by_month: BTreeMap<MonthBucket, Vec<&Order>> = BTreeMap::new();
    for order in orders {
        by_month.entry(order.month).or_default().push(order);
    }
    by_month
        .into_iter()
        .map(|(month, group)| aggregate(month, &group))
        .collect()
}

// ---------------------------------------------------------------------------
// Goal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub goal_amount: Figure<f64>,
    pub attainment_pct: Figure<f64>,
    /// Attainment as a fraction capped at 1.0.
    pub progress: Figure<f64>,
    /// `max(0, goal - revenue)`, 0 when no goal is set.
    pub shortfall: f64,
    pub projected_orders: Figure<u64>,
}

impl GoalProgress {
    fn not_set() -> Self {
        Self {
            goal_amount: Figure::Missing(Missing::NotSet),
            attainment_pct: Figure::Missing(Missing::NotSet),
            progress: Figure::Missing(Missing::NotSet),
            shortfall: 0.0,
            projected_orders: Figure::Missing(Missing::Undefined),
        }
    }
}

/// Goal-dependent figures for a month. Without a positive target every goal
/// figure reads "not set" and the order projection is undefined. The projection
/// is `ceil(shortfall / average_ticket)` and is undefined when the ticket is not
/// a positive number.
pub fn goal_progress(
    total_revenue: f64,
    average_ticket: Figure<f64>,
    target: Option<&FinancialTarget>,
) -> GoalProgress {
    let Some(goal) = target.map(|t| t.goal_amount).filter(|g| *g > 0.0) else {
        return GoalProgress::not_set();
    };

    let ratio = total_revenue / goal;
    let shortfall = (goal - total_revenue).max(0.0);
    let projected_orders = match average_ticket.value() {
        Some(ticket) if ticket > 0.0 => Figure::Value((shortfall / ticket).ceil() as u64),
        _ => Figure::Missing(Missing::Undefined),
    };

    GoalProgress {
        goal_amount: Figure::Value(goal),
        attainment_pct: Figure::Value(ratio * 100.0),
        progress: Figure::Value(ratio.clamp(0.0, 1.0)),
        shortfall,
        projected_orders,
    }
}

// ---------------------------------------------------------------------------
// Technician ranking
// ---------------------------------------------------------------------------

/// Summed gross profit per technician, highest first (ties by name).
/// Orders without a technician are left out.
pub fn technician_breakdown(orders: &[&Order]) -> Vec<TechnicianProfit> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for order in orders {
        if let Some(tech) = order.technician.as_deref() {
            let entry = totals.entry(tech).or_insert((0.0, 0));
            entry.0 += order.gross_profit;
            entry.1 += 1;
        }
    }

    let mut ranking: Vec<TechnicianProfit> = totals
        .into_iter()
        .map(|(technician, (gross_profit, order_count))| TechnicianProfit {
            technician: technician.to_string(),
            gross_profit,
            order_count,
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.gross_profit
            .total_cmp(&a.gross_profit)
            .then_with(|| a.technician.cmp(&b.technician))
    });
    ranking
}
