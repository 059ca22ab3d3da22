// thiserror's #[error("...{field}...")] format strings reference struct fields,
// which the unused-assignment lint does not see through.
#![allow(unused_assignments)]

//! # habit-intent
//!
//! A natural-language intent compiler for a French health-habit tracker.
//! Free-text commands such as "ajoute une habitude sommeil avec 8 heures" are
//! turned into a typed [`Intent`](intent::Intent) and then into a SPARQL
//! query or update for an RDF triple store.
//!
//! ## Architecture
//!
//! - **Knowledge** (`knowledge`): read-only habit taxonomy loaded from TOML
//! - **Intent extraction** (`intent`): keyword and pattern extractors
//! - **Context memory** (`memory`): command history and user preferences
//! - **Query compiler** (`compile`): intent → SPARQL, with shared escaping
//! - **Engine** (`engine`): facade wiring the pieces together
//! - **Execution** (`executor`, `present`): oxigraph store and display rows
//!
//! ## Library usage
//!
//! ```no_run
//! use habit_intent::config::EngineConfig;
//! use habit_intent::engine::{CommandRequest, Engine};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let out = engine
//!     .process(&CommandRequest::for_user("trouve mes repas de la semaine", "42"))
//!     .unwrap();
//! println!("{}", out.query);
//! ```

pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod intent;
pub mod knowledge;
pub mod memory;
pub mod present;
