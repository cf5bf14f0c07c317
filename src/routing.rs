//! Lowest-latency channel selection with blocking and fallback.
//!
//! Selection functions are pure; [`RouteTable`] wraps a route set behind a
//! single reader/writer lock for concurrent access once routes are
//! configured in place.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub channel: String,
    pub latency: i64,
}

impl Route {
    pub fn new(channel: impl Into<String>, latency: i64) -> Self {
        Self {
            channel: channel.into(),
            latency,
        }
    }
}

/// Candidates exclude blocked channels and negative-latency (unusable) routes.
/// Ties break on channel ascending. Returns `None` if no candidate remains.
pub fn choose(routes: &[Route], blocked: &HashSet<String>) -> Option<Route> {
    routes
        .iter()
        .filter(|r| !blocked.contains(&r.channel) && r.latency >= 0)
        .cloned()
        .min_by(|a, b| a.latency.cmp(&b.latency).then_with(|| a.channel.cmp(&b.channel)))
}

/// Falls back to the secondary route set (unblocked) if no primary is eligible.
pub fn choose_with_fallback(
    primary: &[Route],
    secondary: &[Route],
    blocked: &HashSet<String>,
) -> Option<Route> {
    choose(primary, blocked).or_else(|| choose(secondary, &HashSet::new()))
}

/// `score = reliability / (1 + normalized_latency)`, descending, stable on ties.
/// Reliability for a channel absent from `reliability` or `<= 0` defaults to 0.5.
pub fn score_and_rank(routes: &[Route], reliability: &HashMap<String, f64>) -> Vec<Route> {
    if routes.is_empty() {
        return Vec::new();
    }
    let (l_min, l_max) = routes.iter().fold((i64::MAX, i64::MIN), |(lo, hi), r| {
        (lo.min(r.latency), hi.max(r.latency))
    });
    let mut scored: Vec<(f64, usize, Route)> = routes
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let norm_lat = if l_max > l_min {
                (r.latency - l_min) as f64 / (l_max - l_min) as f64
            } else {
                0.0
            };
            let rel = match reliability.get(&r.channel) {
                Some(&v) if v > 0.0 => v,
                _ => 0.5,
            };
            let score = rel / (1.0 + norm_lat);
            (score, idx, r.clone())
        })
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
    scored.into_iter().map(|(_, _, r)| r).collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultiLegPlan {
    pub legs: Vec<Route>,
    pub total_delay: i64,
}

/// Orders candidate legs by ascending latency, excluding blocked and
/// negative-latency routes (the same unusable-route policy as [`choose`]),
/// then keeps at most `max_legs` if given.
pub fn plan_multi_leg(
    routes: &[Route],
    blocked: &HashSet<String>,
    max_legs: Option<usize>,
) -> MultiLegPlan {
    let mut legs: Vec<Route> = routes
        .iter()
        .filter(|r| !blocked.contains(&r.channel) && r.latency >= 0)
        .cloned()
        .collect();
    legs.sort_by(|a, b| a.latency.cmp(&b.latency).then_with(|| a.channel.cmp(&b.channel)));
    if let Some(max_legs) = max_legs {
        if max_legs > 0 {
            legs.truncate(max_legs);
        }
    }
    let total_delay = legs.iter().map(|l| l.latency).sum();
    MultiLegPlan { legs, total_delay }
}

/// Non-positive speed is treated as "never arrives".
pub fn estimate_transit_time(distance_km: f64, speed_knots: f64) -> f64 {
    if speed_knots <= 0.0 {
        f64::INFINITY
    } else {
        distance_km / speed_knots
    }
}

/// Concurrently readable/writable table of configured routes, keyed by channel.
/// Replaceable atomically per route: readers never see a half-written entry.
pub struct RouteTable {
    routes: RwLock<HashMap<String, Route>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, route: Route) {
        self.routes.write().insert(route.channel.clone(), route);
    }

    pub fn get(&self, channel: &str) -> Option<Route> {
        self.routes.read().get(channel).cloned()
    }

    pub fn remove(&self, channel: &str) -> Option<Route> {
        self.routes.write().remove(channel)
    }

    pub fn all(&self) -> Vec<Route> {
        self.routes.read().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.routes.read().len()
    }
}
