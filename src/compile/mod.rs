//! Query compiler: [`Intent`] → SPARQL string.
//!
//! Compilation is a pure function of the intent, the knowledge base and the
//! configured namespaces. The only non-deterministic input is the node token
//! minted for `create`, which comes from an injectable [`NodeIdSource`].
//!
//! | Action  | Query form                                   |
//! |---------|----------------------------------------------|
//! | create  | `INSERT DATA` of one typed node              |
//! | read    | `SELECT` with optional properties and filters |
//! | update  | not supported, returns an error              |
//! | delete  | `DELETE ... WHERE` over a class-name prefix  |
//! | analyze | `SELECT` with `COUNT`/`AVG` grouped by type  |

pub mod escape;
mod templates;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CompileError, CompileResult};
use crate::intent::{Action, Intent};
use crate::knowledge::DomainKnowledge;

pub const DEFAULT_ONTOLOGY_NAMESPACE: &str = "http://www.smarthealth-tracker.com/ontologie#";
pub const DEFAULT_NODE_NAMESPACE: &str = "http://example.org/";
pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

// ── Namespaces ──────────────────────────────────────────────────────────

/// The two configurable namespaces behind the `ont:` and `ex:` prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    pub ontology: String,
    pub node: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            ontology: DEFAULT_ONTOLOGY_NAMESPACE.to_string(),
            node: DEFAULT_NODE_NAMESPACE.to_string(),
        }
    }
}

impl Namespaces {
    pub fn new(ontology: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            ontology: ontology.into(),
            node: node.into(),
        }
    }

    /// The four `PREFIX` lines every compiled query starts with.
    pub fn prologue(&self) -> String {
        format!(
            "PREFIX ont: <{}>\nPREFIX ex: <{}>\nPREFIX rdf: <{RDF_NAMESPACE}>\nPREFIX xsd: <{XSD_NAMESPACE}>\n",
            self.ontology, self.node
        )
    }

    /// A term in the ontology namespace.
    pub fn ont(&self, local: &str) -> String {
        escape::term("ont", &self.ontology, local)
    }

    /// A term in the node namespace.
    pub fn ex(&self, local: &str) -> String {
        escape::term("ex", &self.node, local)
    }
}

// ── Node identifiers ────────────────────────────────────────────────────

/// Mints the unique suffix of a freshly created node.
pub trait NodeIdSource: Send + Sync {
    fn next_token(&self) -> String;
}

static NODE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Millisecond wall-clock time plus a process-wide counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIds;

impl NodeIdSource for TimestampIds {
    fn next_token(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let n = NODE_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{millis}_{n}")
    }
}

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct FixedIds(pub String);

impl NodeIdSource for FixedIds {
    fn next_token(&self) -> String {
        self.0.clone()
    }
}

// ── Compiler ────────────────────────────────────────────────────────────

/// Compiles intents into SPARQL query or update strings.
#[derive(Clone)]
pub struct QueryCompiler {
    knowledge: Arc<DomainKnowledge>,
    namespaces: Namespaces,
    ids: Arc<dyn NodeIdSource>,
}

impl std::fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

impl QueryCompiler {
    pub fn new(knowledge: Arc<DomainKnowledge>, namespaces: Namespaces) -> Self {
        Self {
            knowledge,
            namespaces,
            ids: Arc::new(TimestampIds),
        }
    }

    /// Replace the node token source.
    pub fn with_ids(mut self, ids: Arc<dyn NodeIdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Compile one intent.
    ///
    /// Fails only for [`Action::Update`], which has no free-text form.
    pub fn compile(&self, intent: &Intent) -> CompileResult<String> {
        let ctx = templates::Context {
            ns: &self.namespaces,
            knowledge: &self.knowledge,
        };
        let body = match intent.action {
            Action::Create => templates::create(&ctx, intent, &self.ids.next_token()),
            Action::Read => templates::read(&ctx, intent),
            Action::Delete => templates::delete(&ctx, intent),
            Action::Analyze => templates::analyze(&ctx, intent),
            Action::Update => {
                tracing::warn!(category = %intent.entity.category, "update requested from free text");
                return Err(CompileError::UnsupportedOperation {
                    action: Action::Update,
                });
            }
        };
        Ok(format!("{}\n{body}", self.namespaces.prologue()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::intent::Entity;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(
            Arc::new(DomainKnowledge::bundled().unwrap()),
            Namespaces::default(),
        )
    }

    fn intent(action: Action) -> Intent {
        let entity = Entity::new("Stress", "stress", vec![crate::intent::Metric::Niveau]);
        Intent::new(action, entity, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn every_query_starts_with_four_prefixes() {
        let c = compiler();
        for action in [Action::Create, Action::Read, Action::Delete, Action::Analyze] {
            let q = c.compile(&intent(action)).unwrap();
            for prefix in ["PREFIX ont:", "PREFIX ex:", "PREFIX rdf:", "PREFIX xsd:"] {
                assert!(q.contains(prefix), "{action}: missing {prefix}");
            }
        }
    }

    #[test]
    fn update_is_unsupported() {
        let err = compiler().compile(&intent(Action::Update)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedOperation {
                action: Action::Update
            }
        ));
    }

    #[test]
    fn non_create_queries_are_idempotent() {
        let c = compiler();
        for action in [Action::Read, Action::Delete, Action::Analyze] {
            let i = intent(action);
            assert_eq!(c.compile(&i).unwrap(), c.compile(&i).unwrap());
        }
    }

    #[test]
    fn create_tokens_are_unique() {
        let ids = TimestampIds;
        let tokens: HashSet<String> = (0..1000).map(|_| ids.next_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn custom_namespaces_reach_the_prologue() {
        let c = QueryCompiler::new(
            Arc::new(DomainKnowledge::bundled().unwrap()),
            Namespaces::new("urn:onto#", "urn:nodes/"),
        );
        let q = c.compile(&intent(Action::Read)).unwrap();
        assert!(q.contains("PREFIX ont: <urn:onto#>"));
        assert!(q.contains("PREFIX ex: <urn:nodes/>"));
    }
}
