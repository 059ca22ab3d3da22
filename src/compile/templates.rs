//! Per-action query bodies. The caller prepends the prefix prologue.

use std::fmt::Write as _;

use chrono::{Days, NaiveDate};

use crate::intent::{Bound, DateFilter, Intent, Metric, Period, TemporalScope};
use crate::knowledge::DomainKnowledge;

use super::Namespaces;
use super::escape;

// Ontology predicates shared by every habit node.
const TITLE: &str = "aTitle";
const DESCRIPTION: &str = "aDescription";
const DATE_LOG: &str = "aDateLog";
const USER_LINK: &str = "aHabitude";

pub(super) struct Context<'a> {
    pub ns: &'a Namespaces,
    pub knowledge: &'a DomainKnowledge,
}

impl Context<'_> {
    fn predicate(&self, metric: Metric) -> Option<String> {
        self.knowledge
            .property(metric)
            .map(|spec| self.ns.ont(&spec.predicate))
    }

    /// `ex:user_<id> ont:aHabitude <subject> .` when the intent is user scoped.
    fn user_join(&self, intent: &Intent, subject: &str) -> Option<String> {
        intent.user_context.as_ref().map(|user| {
            format!(
                "{} {} {subject} .",
                self.ns.ex(&user.node_name()),
                self.ns.ont(USER_LINK)
            )
        })
    }

    /// Type narrowing for a concrete class, namespace restriction otherwise.
    fn type_filter(&self, intent: &Intent) -> String {
        if intent.entity.is_generic() {
            format!(
                "FILTER(STRSTARTS(STR(?type), {}))",
                escape::string_literal(&self.ns.ontology)
            )
        } else {
            format!("FILTER(?type = {})", self.ns.ont(&intent.entity.graph_class))
        }
    }
}

fn log_dropped_filters(intent: &Intent, kept: impl Fn(Metric, Bound) -> bool) {
    let dropped: Vec<String> = intent
        .filters
        .numeric()
        .filter(|(key, _)| !kept(key.metric, key.bound))
        .map(|(key, _)| key.name())
        .collect();
    if !dropped.is_empty() {
        tracing::debug!(
            action = %intent.action,
            category = %intent.entity.category,
            dropped = ?dropped,
            "filters not allowed for category"
        );
    }
}

// ── create ──────────────────────────────────────────────────────────────

pub(super) fn create(ctx: &Context<'_>, intent: &Intent, token: &str) -> String {
    let node = ctx
        .ns
        .ex(&format!("{}_{token}", intent.entity.graph_class));

    let mut statements = vec![
        format!("rdf:type {}", ctx.ns.ont(&intent.entity.graph_class)),
        format!(
            "{} {}",
            ctx.ns.ont(DATE_LOG),
            date_literal(intent.reference_date)
        ),
    ];
    for &metric in &intent.entity.properties {
        let (Some(value), Some(spec)) = (
            intent.filters.get(crate::intent::FilterKey::exact(metric)),
            ctx.knowledge.property(metric),
        ) else {
            continue;
        };
        statements.push(format!(
            "{} {}",
            ctx.ns.ont(&spec.predicate),
            escape::typed_literal(value, spec.datatype)
        ));
    }
    log_dropped_filters(intent, |metric, bound| {
        bound == Bound::Exact && intent.entity.allows(metric)
    });

    let mut q = String::from("INSERT DATA {\n");
    let _ = writeln!(q, "  {node} {} .", statements.join(" ;\n      "));
    if let Some(link) = ctx.user_join(intent, &node) {
        let _ = writeln!(q, "  {link}");
    }
    q.push('}');
    q
}

fn date_literal(date: NaiveDate) -> String {
    format!("\"{}\"^^xsd:date", date.format("%Y-%m-%d"))
}

// ── read ────────────────────────────────────────────────────────────────

pub(super) fn read(ctx: &Context<'_>, intent: &Intent) -> String {
    let properties: Vec<(Metric, String)> = intent
        .entity
        .properties
        .iter()
        .filter_map(|&m| ctx.predicate(m).map(|p| (m, p)))
        .collect();

    let mut q = String::from("SELECT ?habitude ?type ?titre ?description ?date");
    for (metric, _) in &properties {
        let _ = write!(q, " ?{metric}");
    }
    q.push_str("\nWHERE {\n  ?habitude rdf:type ?type .\n");
    if let Some(link) = ctx.user_join(intent, "?habitude") {
        let _ = writeln!(q, "  {link}");
    }
    let _ = writeln!(q, "  OPTIONAL {{ ?habitude {} ?titre }}", ctx.ns.ont(TITLE));
    let _ = writeln!(
        q,
        "  OPTIONAL {{ ?habitude {} ?description }}",
        ctx.ns.ont(DESCRIPTION)
    );
    let _ = writeln!(q, "  OPTIONAL {{ ?habitude {} ?date }}", ctx.ns.ont(DATE_LOG));
    for (metric, predicate) in &properties {
        let _ = writeln!(q, "  OPTIONAL {{ ?habitude {predicate} ?{metric} }}");
    }
    let _ = writeln!(q, "  {}", ctx.type_filter(intent));

    for (key, value) in intent.filters.numeric() {
        if !intent.entity.allows(key.metric) {
            continue;
        }
        let op = match key.bound {
            Bound::Exact => "=",
            Bound::Min => ">=",
            Bound::Max => "<=",
        };
        let _ = writeln!(q, "  FILTER(?{} {op} {})", key.metric, escape::numeric(value));
    }
    log_dropped_filters(intent, |metric, _| intent.entity.allows(metric));

    for filter in date_filters(intent) {
        let _ = writeln!(q, "  {filter}");
    }
    q.push_str("}\n");

    let order = match intent.temporal.scope {
        TemporalScope::Recent | TemporalScope::All => "ORDER BY DESC(?date) DESC(?habitude)",
        TemporalScope::Oldest => "ORDER BY ASC(?date) ASC(?habitude)",
    };
    let _ = write!(q, "{order}\nLIMIT {}", intent.temporal.limit);
    q
}

/// Lexical filters on `?date`, resolved against the intent's reference date.
fn date_filters(intent: &Intent) -> Vec<String> {
    let reference = intent.reference_date;
    let mut filters = Vec::new();
    let day = match intent.filters.date {
        Some(DateFilter::Today) => Some(reference),
        Some(DateFilter::Yesterday) => reference.pred_opt(),
        None => None,
    };
    if let Some(day) = day {
        filters.push(format!(
            "FILTER(STRSTARTS(STR(?date), {}))",
            escape::string_literal(&day.format("%Y-%m-%d").to_string())
        ));
    }
    let window = match intent.filters.period {
        Some(Period::Week) => Some(7),
        Some(Period::Month) => Some(30),
        None => None,
    };
    if let Some(since) = window.and_then(|n| reference.checked_sub_days(Days::new(n))) {
        filters.push(format!(
            "FILTER(STR(?date) >= {})",
            escape::string_literal(&since.format("%Y-%m-%d").to_string())
        ));
    }
    filters
}

// ── delete ──────────────────────────────────────────────────────────────

/// Removes every node whose IRI starts with the class name, across all users.
pub(super) fn delete(ctx: &Context<'_>, intent: &Intent) -> String {
    let prefix = format!("{}{}", ctx.ns.node, intent.entity.graph_class);
    tracing::warn!(
        class = %intent.entity.graph_class,
        prefix = %prefix,
        "compiled wide delete: every node with this prefix will be removed"
    );
    format!(
        "DELETE {{ ?habitude ?p ?o }}\nWHERE {{\n  ?habitude ?p ?o .\n  FILTER(STRSTARTS(STR(?habitude), {}))\n}}",
        escape::string_literal(&prefix)
    )
}

// ── analyze ─────────────────────────────────────────────────────────────

pub(super) fn analyze(ctx: &Context<'_>, intent: &Intent) -> String {
    let primary = intent
        .entity
        .primary_metric()
        .and_then(|m| ctx.predicate(m).map(|p| (m, p)));

    let mut q = String::from("SELECT ?type (COUNT(?habitude) AS ?count)");
    if let Some((metric, _)) = &primary {
        let _ = write!(q, " (AVG(?{metric}) AS ?moyenne)");
    }
    q.push_str("\nWHERE {\n  ?habitude rdf:type ?type .\n");
    if let Some(link) = ctx.user_join(intent, "?habitude") {
        let _ = writeln!(q, "  {link}");
    }
    if let Some((metric, predicate)) = &primary {
        let _ = writeln!(q, "  OPTIONAL {{ ?habitude {predicate} ?{metric} }}");
    }
    let dates = date_filters(intent);
    if !dates.is_empty() {
        let _ = writeln!(q, "  OPTIONAL {{ ?habitude {} ?date }}", ctx.ns.ont(DATE_LOG));
    }
    let _ = writeln!(q, "  {}", ctx.type_filter(intent));
    for filter in dates {
        let _ = writeln!(q, "  {filter}");
    }
    q.push_str("}\nGROUP BY ?type\nORDER BY DESC(?count)");
    q
}
