//! Query execution against an RDF triple store.
//!
//! The compiler never executes anything; callers that want results hand the
//! compiled string to a [`QueryExecutor`]. [`OxigraphExecutor`] is the
//! bundled implementation, in-memory or on disk.

use std::collections::BTreeMap;
use std::path::Path;

use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::{ExecutorError, ExecutorResult};

/// One solution: variable name → lexical value.
///
/// IRIs are given without angle brackets and literals without quotes or
/// datatype. Unbound variables are absent.
pub type Row = BTreeMap<String, String>;

/// Something that can run compiled queries.
pub trait QueryExecutor: Send + Sync {
    /// Run a `SELECT` query.
    fn execute_read(&self, query: &str) -> ExecutorResult<Vec<Row>>;

    /// Run an `INSERT DATA` / `DELETE` update.
    fn execute_write(&self, query: &str) -> ExecutorResult<()>;
}

/// Oxigraph-backed executor.
pub struct OxigraphExecutor {
    store: Store,
}

impl OxigraphExecutor {
    /// A fresh in-memory store.
    pub fn in_memory() -> ExecutorResult<Self> {
        let store = Store::new().map_err(|e| ExecutorError::Open {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at `path`.
    pub fn open(path: &Path) -> ExecutorResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| ExecutorError::Open {
            message: format!("failed to create oxigraph directory: {e}"),
        })?;
        let store = Store::open(path).map_err(|e| ExecutorError::Open {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "opened oxigraph store");
        Ok(Self { store })
    }

    /// Number of quads in the store.
    pub fn len(&self) -> ExecutorResult<usize> {
        self.store.len().map_err(|e| ExecutorError::Query {
            message: format!("failed to count quads: {e}"),
        })
    }

    pub fn is_empty(&self) -> ExecutorResult<bool> {
        self.len().map(|n| n == 0)
    }
}

fn lexical(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

impl QueryExecutor for OxigraphExecutor {
    fn execute_read(&self, query: &str) -> ExecutorResult<Vec<Row>> {
        let results = self.store.query(query).map_err(|e| ExecutorError::Query {
            message: e.to_string(),
        })?;
        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| ExecutorError::Query {
                        message: format!("solution error: {e}"),
                    })?;
                    let row: Row = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), lexical(term)))
                        .collect();
                    rows.push(row);
                }
                tracing::debug!(rows = rows.len(), "query executed");
                Ok(rows)
            }
            QueryResults::Boolean(_) => Err(ExecutorError::ResultShape {
                message: "ASK queries return a boolean, not rows".into(),
            }),
            QueryResults::Graph(_) => Err(ExecutorError::ResultShape {
                message: "CONSTRUCT/DESCRIBE queries are not supported".into(),
            }),
        }
    }

    fn execute_write(&self, query: &str) -> ExecutorResult<()> {
        self.store.update(query).map_err(|e| ExecutorError::Update {
            message: e.to_string(),
        })?;
        tracing::debug!("update executed");
        Ok(())
    }
}

impl std::fmt::Debug for OxigraphExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OxigraphExecutor").finish()
    }
}
