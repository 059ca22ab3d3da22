//! Engine facade: text command in, intent and query out.
//!
//! The engine owns the read-only knowledge base, the shared context memory,
//! the analyzer and the compiler. It never talks to a triple store by itself;
//! [`Engine::execute`] takes the executor as an argument.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compile::{NodeIdSource, QueryCompiler, TimestampIds};
use crate::config::EngineConfig;
use crate::error::IntentResult;
use crate::executor::{QueryExecutor, Row};
use crate::intent::{Action, Intent, IntentAnalyzer};
use crate::knowledge::DomainKnowledge;
use crate::memory::{Clock, ContextMemory, SystemClock};

/// Optional scope attached to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// One free-text command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub text: String,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

impl CommandRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
        }
    }

    pub fn for_user(text: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: Some(RequestContext {
                user_id: Some(user_id.into()),
            }),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.user_id.as_deref())
    }
}

/// The structured intent together with its compiled query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledCommand {
    pub intent: Intent,
    pub query: String,
}

/// A compiled command after it ran against a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Execution {
    pub command: CompiledCommand,
    /// Solutions for read and analyze; `None` for updates.
    pub rows: Option<Vec<Row>>,
}

/// The habit-intent engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    analyzer: IntentAnalyzer,
    compiler: QueryCompiler,
}

impl Engine {
    /// Build an engine with the wall clock and timestamp node ids.
    ///
    /// Loads `config.knowledge_path` when set, the bundled knowledge otherwise.
    pub fn new(config: EngineConfig) -> IntentResult<Self> {
        let knowledge = match &config.knowledge_path {
            Some(path) => DomainKnowledge::load(path)?,
            None => DomainKnowledge::bundled()?,
        };
        Self::with_components(
            config,
            Arc::new(knowledge),
            Arc::new(SystemClock),
            Arc::new(TimestampIds),
        )
    }

    /// Build an engine from explicit parts; `config.knowledge_path` is ignored.
    pub fn with_components(
        config: EngineConfig,
        knowledge: Arc<DomainKnowledge>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn NodeIdSource>,
    ) -> IntentResult<Self> {
        config.validate()?;
        let memory = Arc::new(match config.history_capacity {
            Some(cap) => ContextMemory::with_capacity(cap),
            None => ContextMemory::new(),
        });
        tracing::info!(
            knowledge = %knowledge.name(),
            version = %knowledge.version(),
            categories = knowledge.categories().len(),
            "initializing habit-intent engine"
        );
        let analyzer = IntentAnalyzer::new(Arc::clone(&knowledge), memory, clock);
        let compiler = QueryCompiler::new(knowledge, config.namespaces()).with_ids(ids);
        Ok(Self {
            config,
            analyzer,
            compiler,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &DomainKnowledge {
        self.analyzer.knowledge()
    }

    pub fn memory(&self) -> &ContextMemory {
        self.analyzer.memory()
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Extract the intent of a command without compiling it.
    pub fn analyze(&self, request: &CommandRequest) -> Intent {
        self.analyzer.analyze(&request.text, request.user_id())
    }

    /// Extract and compile one command.
    ///
    /// The intent is recorded in the context memory even when compilation
    /// fails.
    pub fn process(&self, request: &CommandRequest) -> IntentResult<CompiledCommand> {
        let intent = self.analyze(request);
        let query = self.compiler.compile(&intent)?;
        Ok(CompiledCommand { intent, query })
    }

    /// Shorthand for [`Engine::process`] on plain text.
    pub fn process_text(&self, text: &str, user_id: Option<&str>) -> IntentResult<CompiledCommand> {
        let request = CommandRequest {
            text: text.to_string(),
            context: user_id.map(|id| RequestContext {
                user_id: Some(id.to_string()),
            }),
        };
        self.process(&request)
    }

    /// Compile a command and run it on `executor`.
    pub fn execute(
        &self,
        executor: &dyn QueryExecutor,
        request: &CommandRequest,
    ) -> IntentResult<Execution> {
        let command = self.process(request)?;
        let rows = match command.intent.action {
            Action::Read | Action::Analyze => Some(executor.execute_read(&command.query)?),
            Action::Create | Action::Delete | Action::Update => {
                executor.execute_write(&command.query)?;
                None
            }
        };
        tracing::info!(
            action = %command.intent.action,
            category = %command.intent.entity.category,
            rows = rows.as_ref().map_or(0, Vec::len),
            "executed command"
        );
        Ok(Execution { command, rows })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::compile::FixedIds;
    use crate::error::{CompileError, IntentError};
    use crate::memory::FixedClock;

    fn engine() -> Engine {
        Engine::with_components(
            EngineConfig::default(),
            Arc::new(DomainKnowledge::bundled().unwrap()),
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())),
            Arc::new(FixedIds("1".into())),
        )
        .unwrap()
    }

    #[test]
    fn request_deserializes_from_json() {
        let req: CommandRequest =
            serde_json::from_str(r#"{"text": "ajoute du sport", "context": {"userId": "42"}}"#)
                .unwrap();
        assert_eq!(req.user_id(), Some("42"));

        let bare: CommandRequest = serde_json::from_str(r#"{"text": "bonjour"}"#).unwrap();
        assert_eq!(bare.user_id(), None);
    }

    #[test]
    fn process_returns_intent_and_query() {
        let out = engine()
            .process(&CommandRequest::for_user("ajoute une habitude sommeil avec 8 heures", "42"))
            .unwrap();
        assert_eq!(out.intent.action, Action::Create);
        assert!(out.query.contains("ex:Sommeil_1 rdf:type ont:Sommeil"));
        assert!(out.query.contains("ex:user_42 ont:aHabitude ex:Sommeil_1 ."));

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["intent"]["entity"]["category"], "sommeil");
        assert!(json["query"].as_str().unwrap().starts_with("PREFIX ont:"));
    }

    #[test]
    fn update_fails_but_is_remembered() {
        let e = engine();
        let err = e.process(&CommandRequest::new("modifie mon sommeil")).unwrap_err();
        assert!(matches!(
            err,
            IntentError::Compile(CompileError::UnsupportedOperation { .. })
        ));
        assert_eq!(e.memory().len(), 1);
    }

    #[test]
    fn history_capacity_is_applied() {
        let config = EngineConfig {
            history_capacity: Some(1),
            ..EngineConfig::default()
        };
        let e = Engine::with_components(
            config,
            Arc::new(DomainKnowledge::bundled().unwrap()),
            Arc::new(SystemClock),
            Arc::new(TimestampIds),
        )
        .unwrap();
        e.process_text("trouve mon sommeil", None).unwrap();
        e.process_text("trouve mes repas", None).unwrap();
        assert_eq!(e.memory().len(), 1);
        assert_eq!(e.memory().latest().unwrap().text, "trouve mes repas");
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
