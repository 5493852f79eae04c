//! Ordered reduction steps and the loop that applies them
//!
//! A [`Policy`] lists [`Step`]s from cheapest loss to most expensive. The
//! [`Executor`] applies them in order to a [`Payload`], serializing the whole
//! payload at every checkpoint, and stops at the first checkpoint that fits.
//! Every step is finite, so a run always ends; it may end over budget.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::budget::config::TruncationConfig;
use crate::budget::estimate::estimate;
use crate::value::{Array, Value};

/// Which records a step touches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// The privileged record (single-document tree or comparison target)
    Target,
    /// Comparison or aggregate records
    Peers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Remove a key from each record's root element and general-data section
    RemoveField(String),
    /// Halve every array inside a section until it fits or reaches `floor`
    HalveArrays { section: String, floor: usize },
    /// Remove records from the end, one per checkpoint (peers only)
    DropRecords,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub scope: Scope,
    pub reduction: Reduction,
}

impl Step {
    pub fn remove_field(scope: Scope, key: impl Into<String>) -> Self {
        Self {
            scope,
            reduction: Reduction::RemoveField(key.into()),
        }
    }

    pub fn halve_arrays(scope: Scope, section: impl Into<String>, floor: usize) -> Self {
        Self {
            scope,
            reduction: Reduction::HalveArrays {
                section: section.into(),
                floor,
            },
        }
    }

    pub fn drop_peers() -> Self {
        Self {
            scope: Scope::Peers,
            reduction: Reduction::DropRecords,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            Scope::Target => "target",
            Scope::Peers => "peers",
        };
        match &self.reduction {
            Reduction::RemoveField(key) => write!(f, "remove {key} from {scope}"),
            Reduction::HalveArrays { section, floor } => {
                write!(f, "halve arrays in {section} of {scope} (floor {floor})")
            }
            Reduction::DropRecords => write!(f, "drop {scope} from the end"),
        }
    }
}

/// An ordered list of reduction steps
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Policy(Vec<Step>);

impl Policy {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// One record: low-value sections, then the valuable section's arrays
    pub fn single(config: &TruncationConfig) -> Self {
        let mut steps: Vec<Step> = config
            .low_value_sections
            .iter()
            .map(|key| Step::remove_field(Scope::Target, key))
            .collect();
        steps.push(Step::halve_arrays(
            Scope::Target,
            &config.valuable_section,
            0,
        ));
        Self(steps)
    }

    /// Target plus peers: everything on peers first, the target last
    pub fn comparison(config: &TruncationConfig) -> Self {
        let mut steps = peer_steps(config);
        steps.push(Step::halve_arrays(
            Scope::Target,
            &config.valuable_section,
            1,
        ));
        Self(steps)
    }

    /// Peer records only, treated uniformly
    pub fn aggregate(config: &TruncationConfig) -> Self {
        Self(peer_steps(config))
    }
}

fn peer_steps(config: &TruncationConfig) -> Vec<Step> {
    let mut steps: Vec<Step> = config
        .low_value_sections
        .iter()
        .chain(&config.peer_detail_fields)
        .map(|key| Step::remove_field(Scope::Peers, key))
        .collect();
    steps.push(Step::halve_arrays(Scope::Peers, &config.valuable_section, 1));
    steps.push(Step::remove_field(Scope::Peers, &config.valuable_section));
    steps.push(Step::drop_peers());
    steps
}

/// Serialized shape of a payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// The target tree itself
    Single,
    /// `{target_key: target, peers_key: [peers]}`
    Comparison { target_key: String, peers_key: String },
    /// `[peers]`
    Aggregate,
}

/// Records being reduced, plus how they serialize
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub target: Option<Value>,
    pub peers: Vec<Value>,
    pub shape: Shape,
}

impl Payload {
    pub fn single(tree: Value) -> Self {
        Self {
            target: Some(tree),
            peers: Vec::new(),
            shape: Shape::Single,
        }
    }

    pub fn comparison(target: Value, peers: Vec<Value>, config: &TruncationConfig) -> Self {
        Self {
            target: Some(target),
            peers,
            shape: Shape::Comparison {
                target_key: config.target_key.clone(),
                peers_key: config.peers_key.clone(),
            },
        }
    }

    pub fn aggregate(records: Vec<Value>) -> Self {
        Self {
            target: None,
            peers: records,
            shape: Shape::Aggregate,
        }
    }

    fn records_mut(&mut self, scope: Scope) -> &mut [Value] {
        match scope {
            Scope::Target => self
                .target
                .as_mut()
                .map(std::slice::from_mut)
                .unwrap_or_default(),
            Scope::Peers => &mut self.peers,
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.shape {
            Shape::Single => self.target.serialize(serializer),
            Shape::Comparison {
                target_key,
                peers_key,
            } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(target_key, &self.target)?;
                map.serialize_entry(peers_key, &self.peers)?;
                map.end()
            }
            Shape::Aggregate => self.peers.serialize(serializer),
        }
    }
}

/// What a run did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// The final payload is within budget
    pub fits: bool,
    /// At least one step ran
    pub reduced: bool,
    /// Final cost in budget units
    pub cost: usize,
}

/// Applies a policy against one budget
#[derive(Debug)]
pub struct Executor<'c> {
    config: &'c TruncationConfig,
    budget: usize,
}

impl<'c> Executor<'c> {
    pub fn new(config: &'c TruncationConfig, budget: usize) -> Self {
        Self { config, budget }
    }

    pub fn cost(&self, payload: &Payload) -> usize {
        estimate(payload, self.config.divisor)
    }

    fn fits(&self, payload: &Payload) -> bool {
        self.cost(payload) <= self.budget
    }

    /// Reduce `payload` step by step until it fits or the policy is exhausted
    pub fn run(&self, payload: &mut Payload, policy: &Policy) -> Outcome {
        if self.fits(payload) {
            return self.outcome(payload, false);
        }

        for step in policy.steps() {
            let fits = self.apply(step, payload);
            debug!(%step, cost = self.cost(payload), budget = self.budget, fits, "checkpoint");
            if fits {
                return self.outcome(payload, true);
            }
        }
        self.outcome(payload, true)
    }

    fn outcome(&self, payload: &Payload, reduced: bool) -> Outcome {
        let cost = self.cost(payload);
        Outcome {
            fits: cost <= self.budget,
            reduced,
            cost,
        }
    }

    /// Apply one step; true once a checkpoint fits
    fn apply(&self, step: &Step, payload: &mut Payload) -> bool {
        match &step.reduction {
            Reduction::RemoveField(key) => {
                for record in payload.records_mut(step.scope) {
                    self.remove_field(record, key);
                }
                self.fits(payload)
            }
            Reduction::HalveArrays { section, floor } => {
                self.halve_arrays(payload, step.scope, section, *floor)
            }
            Reduction::DropRecords => {
                if step.scope == Scope::Target {
                    return self.fits(payload);
                }
                while payload.peers.pop().is_some() {
                    if self.fits(payload) {
                        return true;
                    }
                }
                false
            }
        }
    }

    fn remove_field(&self, record: &mut Value, key: &str) {
        let Some(root) = record
            .pointer_mut(&[self.config.record_key.as_str()])
            .and_then(Value::as_object_mut)
        else {
            return;
        };
        root.remove(key);

        match root.get_mut(&self.config.general_data) {
            Some(Value::Object(general)) => {
                general.remove(key);
            }
            Some(Value::Array(sections)) => {
                for general in sections.iter_mut().filter_map(Value::as_object_mut) {
                    general.remove(key);
                }
            }
            Some(Value::String(_)) | None => {}
        }
    }

    fn halve_arrays(
        &self,
        payload: &mut Payload,
        scope: Scope,
        section: &str,
        floor: usize,
    ) -> bool {
        let path = [self.config.record_key.as_str(), section];
        let longest = payload
            .records_mut(scope)
            .iter()
            .filter_map(|record| record.pointer(&path))
            .map(longest_array)
            .max()
            .unwrap_or(0);
        if longest <= floor {
            return self.fits(payload);
        }

        let mut cap = longest / 2;
        loop {
            let limit = cap.max(floor);
            for record in payload.records_mut(scope) {
                if let Some(value) = record.pointer_mut(&path) {
                    for_each_array(value, &mut |items| items.truncate(limit));
                }
            }
            if self.fits(payload) {
                return true;
            }
            if cap <= floor {
                return false;
            }
            cap /= 2;
        }
    }
}

/// Length of the longest array reachable through objects
fn longest_array(value: &Value) -> usize {
    match value {
        Value::String(_) => 0,
        Value::Array(items) => items.len(),
        Value::Object(node) => node.values().map(longest_array).max().unwrap_or(0),
    }
}

/// Visit every array reachable through objects; elements are not descended
fn for_each_array(value: &mut Value, visit: &mut impl FnMut(&mut Array)) {
    match value {
        Value::String(_) => {}
        Value::Array(items) => visit(items),
        Value::Object(node) => {
            for child in node.values_mut() {
                for_each_array(child, visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    fn record(sections: &[(&str, Value)]) -> Value {
        let mut cv = Object::new();
        for (key, value) in sections {
            cv.insert(*key, value.clone());
        }
        let mut root = Object::new();
        root.insert("curriculo-vitae", cv);
        Value::Object(root)
    }

    fn items(n: usize) -> Value {
        (0..n)
            .map(|i| Value::from(format!("item-{i:03}")))
            .collect::<Array>()
            .into()
    }

    fn bibliography(n: usize) -> Value {
        let mut artigos = Object::new();
        artigos.insert("artigo-publicado", items(n));
        let mut section = Object::new();
        section.insert("artigos-publicados", artigos);
        Value::Object(section)
    }

    #[test]
    fn test_single_policy_order() {
        let policy = Policy::single(&TruncationConfig::default());
        let names: Vec<String> = policy.steps().iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "remove dados-complementares from target",
                "remove outra-producao from target",
                "remove producao-tecnica from target",
                "halve arrays in producao-bibliografica of target (floor 0)",
            ]
        );
    }

    #[test]
    fn test_comparison_policy_touches_target_last() -> Result<(), &'static str> {
        let policy = Policy::comparison(&TruncationConfig::default());
        let (last, rest) = policy.steps().split_last().ok_or("empty policy")?;
        assert_eq!(last.scope, Scope::Target);
        assert!(rest.iter().all(|step| step.scope == Scope::Peers));
        assert_eq!(rest.last(), Some(&Step::drop_peers()));
        Ok(())
    }

    #[test]
    fn test_remove_field_reaches_general_data() {
        let config = TruncationConfig::default();
        let mut general = Object::new();
        general.insert("atuacoes-profissionais", "x");
        general.insert("nome-completo", "N");
        let mut value = record(&[("dados-gerais", Value::Object(general))]);

        Executor::new(&config, 0).remove_field(&mut value, "atuacoes-profissionais");
        let general = value.pointer(&["curriculo-vitae", "dados-gerais"]);
        assert!(general.and_then(|g| g.pointer(&["atuacoes-profissionais"])).is_none());
        assert!(general.and_then(|g| g.pointer(&["nome-completo"])).is_some());
    }

    #[test]
    fn test_halving_stops_once_it_fits() {
        let config = TruncationConfig::default().with_divisor(1);
        let tree = record(&[("producao-bibliografica", bibliography(16))]);
        let half = record(&[("producao-bibliografica", bibliography(8))]);
        let budget = estimate(&Payload::single(half), 1);

        let mut payload = Payload::single(tree);
        let executor = Executor::new(&config, budget);
        let step = Step::halve_arrays(Scope::Target, "producao-bibliografica", 0);
        assert!(executor.apply(&step, &mut payload));

        let kept = payload
            .target
            .as_ref()
            .and_then(|t| {
                t.pointer(&[
                    "curriculo-vitae",
                    "producao-bibliografica",
                    "artigos-publicados",
                    "artigo-publicado",
                ])
            })
            .and_then(Value::as_array)
            .map(Array::len);
        assert_eq!(kept, Some(8));
    }

    #[test]
    fn test_halving_respects_floor() {
        let config = TruncationConfig::default();
        let mut payload = Payload::aggregate(vec![
            record(&[("producao-bibliografica", bibliography(9))]),
            record(&[("producao-bibliografica", bibliography(3))]),
        ]);
        let executor = Executor::new(&config, 0);
        let step = Step::halve_arrays(Scope::Peers, "producao-bibliografica", 1);
        assert!(!executor.apply(&step, &mut payload));

        for peer in &payload.peers {
            let section = peer.pointer(&["curriculo-vitae", "producao-bibliografica"]);
            assert_eq!(section.map(longest_array), Some(1));
        }
    }

    #[test]
    fn test_drop_records_from_end() {
        let config = TruncationConfig::default().with_divisor(1);
        let peers: Vec<Value> = ["a", "b", "c"].into_iter().map(Value::from).collect();
        let mut payload = Payload::aggregate(peers);
        // ["a"] is 5 bytes
        let executor = Executor::new(&config, 5);
        assert!(executor.apply(&Step::drop_peers(), &mut payload));
        assert_eq!(payload.peers, vec![Value::from("a")]);
    }

    #[test]
    fn test_comparison_shape() {
        let config = TruncationConfig::default();
        let payload = Payload::comparison(Value::from("t"), vec![Value::from("p")], &config);
        assert_eq!(
            crate::budget::estimate::to_json(&payload),
            r#"{"pesquisador_alvo":"t","outros_pesquisadores":["p"]}"#
        );
    }

    #[test]
    fn test_run_reports_untouched_payload() {
        let config = TruncationConfig::default();
        let mut payload = Payload::single(record(&[]));
        let outcome = Executor::new(&config, 1_000).run(&mut payload, &Policy::single(&config));
        assert!(outcome.fits);
        assert!(!outcome.reduced);
    }
}
