//! Budget-bounded truncation of curriculum trees
//!
//! Three entry points share one [`Executor`]:
//!
//! - [`truncate`]: one tree, returned as a tree.
//! - [`truncate_for_comparison`]: a target plus peers. Peers lose detail
//!   first and are dropped from the end; the target's bibliography is cut
//!   only when no peer is left.
//! - [`truncate_for_aggregate`]: peers only, reduced uniformly.
//!
//! None of them fail. When every step is exhausted the smallest payload is
//! returned and `truncated` is set; callers decide whether to use it.

pub mod config;
pub mod estimate;
pub mod policy;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::value::Value;

pub use config::{TruncationConfig, ANALYSIS_BUDGET, SUMMARY_BUDGET};
pub use estimate::estimate;
pub use policy::{Executor, Outcome, Payload, Policy, Reduction, Scope, Step};

/// A payload and whether anything was cut from it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Truncated<T> {
    pub payload: T,
    pub truncated: bool,
}

/// Shrink one tree to fit `budget`
///
/// ```
/// use lattes::{truncate, Object, TruncationConfig, Value};
///
/// let mut cv = Object::new();
/// cv.insert("dados-complementares", "x".repeat(600));
/// cv.insert("producao-bibliografica", Object::new());
/// let mut tree = Object::new();
/// tree.insert("curriculo-vitae", cv);
/// let tree = Value::Object(tree);
///
/// let result = truncate(&tree, 100, &TruncationConfig::default());
/// assert!(result.truncated);
/// assert!(result.payload.pointer(&["curriculo-vitae", "dados-complementares"]).is_none());
/// ```
#[instrument(skip_all, fields(budget = budget))]
pub fn truncate(tree: &Value, budget: usize, config: &TruncationConfig) -> Truncated<Value> {
    let mut payload = Payload::single(tree.clone());
    let outcome = Executor::new(config, budget).run(&mut payload, &Policy::single(config));
    report("single", budget, outcome);

    Truncated {
        payload: payload.target.unwrap_or_else(|| tree.clone()),
        truncated: outcome.reduced,
    }
}

/// Shrink a target record plus comparison peers into one JSON payload
///
/// The payload is `{target_key: target, peers_key: [peers]}`.
#[instrument(skip_all, fields(budget = budget, peers = others.len()))]
pub fn truncate_for_comparison(
    target: &Value,
    others: &[Value],
    budget: usize,
    config: &TruncationConfig,
) -> Truncated<String> {
    let target = truncate(target, config.target_budget(budget), config);

    let mut payload = Payload::comparison(target.payload, others.to_vec(), config);
    let executor = Executor::new(config, budget);
    let outcome = executor.run(&mut payload, &Policy::comparison(config));
    report("comparison", budget, outcome);

    Truncated {
        payload: estimate::to_json(&payload),
        truncated: target.truncated || outcome.reduced,
    }
}

/// Shrink peer records into one JSON array
#[instrument(skip_all, fields(budget = budget, records = trees.len()))]
pub fn truncate_for_aggregate(
    trees: &[Value],
    budget: usize,
    config: &TruncationConfig,
) -> Truncated<String> {
    let mut payload = Payload::aggregate(trees.to_vec());
    let outcome = Executor::new(config, budget).run(&mut payload, &Policy::aggregate(config));
    report("aggregate", budget, outcome);

    Truncated {
        payload: estimate::to_json(&payload),
        truncated: outcome.reduced,
    }
}

fn report(policy: &str, budget: usize, outcome: Outcome) {
    if !outcome.fits {
        warn!(policy, cost = outcome.cost, budget, "all reductions exhausted, still over budget");
    } else if outcome.reduced {
        info!(policy, cost = outcome.cost, budget, "payload truncated to fit");
    }
}
