//! Intent extraction: from a free-text habit command to a typed [`Intent`].
//!
//! ## Pipeline
//!
//! ```text
//! text ──→ detect_action ─────────────┐
//!      ──→ extract_entity ────────────┤
//!      ──→ extract_filters ───────────┼──→ Intent ──→ ContextMemory (append)
//!      ──→ extract_relationships ─────┤        │
//!      ──→ extract_temporal_context ──┘        └──→ QueryCompiler
//! ```
//!
//! Every extractor is a pure function over the lower-cased text and the
//! read-only [`DomainKnowledge`](crate::knowledge::DomainKnowledge). Nothing
//! here fails: a missing keyword becomes a default value.

pub mod action;
pub mod analyzer;
pub mod extract;

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub use action::{ActionMatch, ActionRule, ActionTable};
pub use analyzer::IntentAnalyzer;
pub use extract::{
    extract_entity, extract_filters, extract_relationships, extract_temporal_context,
};

// ── Action ──────────────────────────────────────────────────────────────

/// The requested operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Analyze,
}

impl Action {
    /// All actions in their default matching priority.
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Analyze,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Analyze => "analyze",
        }
    }

    /// Parse from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" => Some(Self::Create),
            "read" => Some(Self::Read),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "analyze" | "analyse" => Some(Self::Analyze),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Metric ──────────────────────────────────────────────────────────────

/// A numeric habit property that filters and literals can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Calories,
    Heures,
    Pas,
    Niveau,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Calories, Metric::Heures, Metric::Pas, Metric::Niveau];

    /// Canonical filter name, also used as the SPARQL variable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calories => "calories",
            Self::Heures => "heures",
            Self::Pas => "pas",
            Self::Niveau => "niveau",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Whether values of this metric are whole numbers.
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Heures)
    }

    /// Build a quantity of the right kind from a parsed number.
    ///
    /// Integer metrics truncate; `None` when the result does not fit an `i64`.
    pub fn quantity(self, value: f64) -> Option<Quantity> {
        if !self.is_integer() {
            return Some(Quantity::Decimal(value));
        }
        let whole = value.trunc();
        let limit = -(i64::MIN as f64);
        if whole >= -limit && whole < limit {
            Some(Quantity::Integer(whole as i64))
        } else {
            None
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Filters ─────────────────────────────────────────────────────────────

/// Which side of a comparison a numeric filter constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound {
    Exact,
    Min,
    Max,
}

/// Key of a numeric filter: `calories`, `caloriesMin`, `heuresMax`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterKey {
    pub metric: Metric,
    pub bound: Bound,
}

impl FilterKey {
    pub fn exact(metric: Metric) -> Self {
        Self { metric, bound: Bound::Exact }
    }

    pub fn min(metric: Metric) -> Self {
        Self { metric, bound: Bound::Min }
    }

    pub fn max(metric: Metric) -> Self {
        Self { metric, bound: Bound::Max }
    }

    pub fn name(&self) -> String {
        match self.bound {
            Bound::Exact => self.metric.as_str().to_string(),
            Bound::Min => format!("{}Min", self.metric),
            Bound::Max => format!("{}Max", self.metric),
        }
    }
}

/// A numeric filter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Quantity {
    Integer(i64),
    Decimal(f64),
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(x) => write!(f, "{x}"),
        }
    }
}

/// A single-day temporal filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilter {
    Today,
    Yesterday,
}

/// A rolling-window temporal filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
}

/// Named constraints extracted from a command.
///
/// Serializes as a flat map keyed by canonical filter names
/// (`{"caloriesMin": 300, "caloriesMax": 600, "period": "week"}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    numeric: BTreeMap<FilterKey, Quantity>,
    pub date: Option<DateFilter>,
    pub period: Option<Period>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a numeric filter, replacing any earlier value for the same key.
    pub fn insert(&mut self, key: FilterKey, value: Quantity) {
        self.numeric.insert(key, value);
    }

    pub fn get(&self, key: FilterKey) -> Option<Quantity> {
        self.numeric.get(&key).copied()
    }

    /// Look up a numeric filter by its canonical name (`"caloriesMin"`).
    pub fn get_named(&self, name: &str) -> Option<Quantity> {
        self.numeric
            .iter()
            .find(|(key, _)| key.name() == name)
            .map(|(_, value)| *value)
    }

    /// Numeric filters in key order.
    pub fn numeric(&self) -> impl Iterator<Item = (FilterKey, Quantity)> + '_ {
        self.numeric.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + usize::from(self.date.is_some()) + usize::from(self.period.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Filters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in &self.numeric {
            map.serialize_entry(&key.name(), value)?;
        }
        if let Some(date) = &self.date {
            map.serialize_entry("date", date)?;
        }
        if let Some(period) = &self.period {
            map.serialize_entry("period", period)?;
        }
        map.end()
    }
}

// ── Entity ──────────────────────────────────────────────────────────────

/// The domain concept a command targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Graph class name (`Sommeil`, `ActivitéPhysique`, or the generic `Habitude`).
    #[serde(rename = "type")]
    pub graph_class: String,
    /// Taxonomy key, or the generic fallback category.
    pub category: String,
    /// Properties a node of this category may carry, primary metric first.
    pub properties: Vec<Metric>,
    #[serde(skip)]
    generic: bool,
}

impl Entity {
    pub fn new(
        graph_class: impl Into<String>,
        category: impl Into<String>,
        properties: Vec<Metric>,
    ) -> Self {
        Self {
            graph_class: graph_class.into(),
            category: category.into(),
            properties,
            generic: false,
        }
    }

    /// The fallback entity used when no category keyword matches.
    pub fn generic(graph_class: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            graph_class: graph_class.into(),
            category: category.into(),
            properties: Vec::new(),
            generic: true,
        }
    }

    pub fn is_generic(&self) -> bool {
        self.generic
    }

    pub fn allows(&self, metric: Metric) -> bool {
        self.properties.contains(&metric)
    }

    /// The first listed property, used for aggregates.
    pub fn primary_metric(&self) -> Option<Metric> {
        self.properties.first().copied()
    }
}

// ── Relationships ───────────────────────────────────────────────────────

/// A connective phrase found in the text, split into subject and object spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub natural_phrase: String,
    pub graph_predicate: String,
    pub inferred_subject: String,
    pub inferred_object: String,
}

// ── Temporal context ────────────────────────────────────────────────────

/// Result ordering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalScope {
    All,
    Recent,
    Oldest,
}

/// Ordering policy plus the maximum result count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemporalContext {
    pub scope: TemporalScope,
    pub limit: NonZeroUsize,
}

impl TemporalContext {
    pub fn new(scope: TemporalScope, limit: NonZeroUsize) -> Self {
        Self { scope, limit }
    }
}

impl Default for TemporalContext {
    fn default() -> Self {
        Self {
            scope: TemporalScope::All,
            limit: NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

// ── User context ────────────────────────────────────────────────────────

/// Reference to the user-scope node a command is issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Local name of the user node in the node namespace.
    pub fn node_name(&self) -> String {
        format!("user_{}", self.user_id)
    }
}

// ── Intent ──────────────────────────────────────────────────────────────

/// Structured classification of one text command.
///
/// Built fresh for every call and never mutated once handed out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub action: Action,
    /// Keyword that selected `action`; `None` when it defaulted to read.
    pub action_keyword: Option<String>,
    pub entity: Entity,
    pub filters: Filters,
    pub relationships: Vec<Relationship>,
    pub temporal: TemporalContext,
    pub user_context: Option<UserContext>,
    /// Calendar date relative filters (`date`, `period`) resolve against.
    pub reference_date: NaiveDate,
}

impl Intent {
    /// A bare intent with no filters, relationships or user scope.
    pub fn new(action: Action, entity: Entity, reference_date: NaiveDate) -> Self {
        Self {
            action,
            action_keyword: None,
            entity,
            filters: Filters::new(),
            relationships: Vec::new(),
            temporal: TemporalContext::default(),
            user_context: None,
            reference_date,
        }
    }

    pub fn with_filter(mut self, key: FilterKey, value: Quantity) -> Self {
        self.filters.insert(key, value);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_context = Some(UserContext::new(user_id));
        self
    }

    pub fn with_temporal(mut self, temporal: TemporalContext) -> Self {
        self.temporal = temporal;
        self
    }

    /// Whether the action was chosen by the read default rather than a keyword.
    pub fn action_defaulted(&self) -> bool {
        self.action_keyword.is_none()
    }
}
