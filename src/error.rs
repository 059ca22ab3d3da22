//! Rich diagnostic error types for the habit-intent compiler.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so operators know what went wrong and
//! how to fix it. Extraction itself never fails: absence of a keyword is a
//! default value, not an error.

use miette::Diagnostic;
use thiserror::Error;

use crate::intent::Action;

/// Top-level error type for the habit-intent engine.
#[derive(Debug, Error, Diagnostic)]
pub enum IntentError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Executor(#[from] ExecutorError),
}

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KnowledgeError {
    #[error("failed to parse knowledge document \"{origin}\": {message}")]
    #[diagnostic(
        code(habit::knowledge::parse),
        help(
            "The knowledge document is not valid TOML or does not match the expected \
             layout. Compare it with the bundled data/knowledge.toml."
        )
    )]
    Parse { origin: String, message: String },

    #[error("failed to read knowledge document {path}: {source}")]
    #[diagnostic(
        code(habit::knowledge::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown action \"{name}\" in action table")]
    #[diagnostic(
        code(habit::knowledge::unknown_action),
        help("Valid actions are: create, read, update, delete, analyze.")
    )]
    UnknownAction { name: String },

    #[error("action table must list every action exactly once (problem with \"{action}\")")]
    #[diagnostic(
        code(habit::knowledge::action_table),
        help(
            "Each of create, read, update, delete and analyze needs one [[actions]] entry. \
             Entry order is the matching priority."
        )
    )]
    ActionTable { action: String },

    #[error("unknown property \"{property}\" referenced by {context}")]
    #[diagnostic(
        code(habit::knowledge::unknown_property),
        help(
            "Properties must be one of calories, heures, pas, niveau and must have a \
             [properties.<name>] entry with a predicate and datatype."
        )
    )]
    UnknownProperty { property: String, context: String },

    #[error("unknown datatype \"{datatype}\" for property \"{property}\"")]
    #[diagnostic(
        code(habit::knowledge::unknown_datatype),
        help("Supported literal datatypes are \"integer\" and \"decimal\".")
    )]
    UnknownDatatype { property: String, datatype: String },

    #[error("invalid knowledge entry: {message}")]
    #[diagnostic(
        code(habit::knowledge::invalid),
        help(
            "A category, relationship phrase or temporal setting is malformed. \
             Keys and phrases must be non-empty, keys unique, and limits at least 1."
        )
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Compiler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("operation not implemented: cannot compile a {action} query")]
    #[diagnostic(
        code(habit::compile::unsupported),
        help(
            "Updating habits from a free-text command is not supported yet. \
             Use the structured habit form instead; no query was produced and \
             nothing must be sent to the triple store."
        )
    )]
    UnsupportedOperation { action: Action },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(
        code(habit::config::io),
        help("Check that the config file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(habit::config::parse),
        help(
            "The config file must be TOML with optional keys ontology_namespace, \
             node_namespace, history_capacity and knowledge_path."
        )
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(habit::config::invalid),
        help("Namespaces must be absolute IRIs ending in '#' or '/'.")
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Executor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    #[error("failed to open triple store: {message}")]
    #[diagnostic(
        code(habit::executor::open),
        help(
            "The oxigraph store could not be created. For on-disk stores, check that \
             the directory is writable and not locked by another process."
        )
    )]
    Open { message: String },

    #[error("SPARQL query failed: {message}")]
    #[diagnostic(
        code(habit::executor::query),
        help("The store rejected the query. Inspect it with `habit-intent compile`.")
    )]
    Query { message: String },

    #[error("SPARQL update failed: {message}")]
    #[diagnostic(
        code(habit::executor::update),
        help("The store rejected the update. Inspect it with `habit-intent compile`.")
    )]
    Update { message: String },

    #[error("unexpected result shape: {message}")]
    #[diagnostic(
        code(habit::executor::result_shape),
        help("execute_read expects a SELECT query; use execute_write for updates.")
    )]
    ResultShape { message: String },
}

/// Convenience alias for engine-level results.
pub type IntentResult<T> = std::result::Result<T, IntentError>;

/// Convenience alias for knowledge loading.
pub type KnowledgeResult<T> = std::result::Result<T, KnowledgeError>;

/// Convenience alias for compilation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Convenience alias for query execution.
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
