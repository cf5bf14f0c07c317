//! Urgency-ranked admission and capacity-limited planning.
//!
//! Pure and side-effect free: safe to call concurrently from any number of
//! threads without synchronization.

use crate::models::Order;

/// Returns at most `capacity` orders, strictly descending by urgency and
/// ascending `eta` on ties, preserving input order for any remaining tie.
///
/// `capacity <= 0` yields an empty plan. The output is always a prefix of
/// length `min(orders.len(), capacity)` of the sorted sequence.
pub fn plan(orders: &[Order], capacity: i64) -> Vec<Order> {
    if capacity <= 0 || orders.is_empty() {
        return Vec::new();
    }
    let mut idx: Vec<usize> = (0..orders.len()).collect();
    idx.sort_by(|&a, &b| {
        orders[b]
            .urgency
            .cmp(&orders[a].urgency)
            .then_with(|| orders[a].eta.cmp(&orders[b].eta))
            .then_with(|| a.cmp(&b))
    });
    let take = (capacity as usize).min(idx.len());
    idx.into_iter()
        .take(take)
        .map(|i| orders[i].clone())
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllocationResult {
    pub planned: Vec<Order>,
    pub rejected: Vec<Order>,
}

/// Splits a batch into the planned subset and everything left over, by id.
pub fn dispatch_batch(orders: Vec<Order>, capacity: i64) -> AllocationResult {
    let planned = plan(&orders, capacity);
    let planned_ids: std::collections::HashSet<&str> =
        planned.iter().map(|o| o.id.as_str()).collect();
    let rejected = orders
        .into_iter()
        .filter(|o| !planned_ids.contains(o.id.as_str()))
        .collect();
    AllocationResult { planned, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, urgency: i64, eta: &str) -> Order {
        Order::new(id, urgency, eta)
    }

    #[test]
    fn capacity_zero_or_negative_yields_empty() {
        let orders = vec![order("a", 1, "09:00")];
        assert!(plan(&orders, 0).is_empty());
        assert!(plan(&orders, -5).is_empty());
    }

    #[test]
    fn capacity_and_tiebreak_scenario() {
        // Orders A(u=1,eta=09:30), B(u=3,eta=10:00), C(u=3,eta=08:30), capacity=2.
        let orders = vec![
            order("A", 1, "09:30"),
            order("B", 3, "10:00"),
            order("C", 3, "08:30"),
        ];
        let out = plan(&orders, 2);
        assert_eq!(
            out.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
            vec!["C", "B"]
        );
    }

    #[test]
    fn output_is_prefix_of_sorted_sequence() {
        let orders = vec![
            order("a", 5, "09:00"),
            order("b", 5, "09:00"),
            order("c", 10, "09:00"),
        ];
        let out = plan(&orders, 10);
        assert_eq!(out.len(), orders.len().min(10));
        for pair in out.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.urgency > b.urgency || (a.urgency == b.urgency && a.eta <= b.eta));
        }
    }

    #[test]
    fn ties_preserve_input_order() {
        let orders = vec![order("first", 2, "09:00"), order("second", 2, "09:00")];
        let out = plan(&orders, 2);
        assert_eq!(out[0].id, "first");
        assert_eq!(out[1].id, "second");
    }

    #[test]
    fn dispatch_batch_separates_rejected() {
        let orders = vec![order("a", 1, "09:00"), order("b", 9, "09:00")];
        let result = dispatch_batch(orders, 1);
        assert_eq!(result.planned[0].id, "b");
        assert_eq!(result.rejected[0].id, "a");
    }
}
