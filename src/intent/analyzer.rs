//! Composition of the extractors into one [`Intent`].

use std::sync::Arc;

use crate::knowledge::DomainKnowledge;
use crate::memory::{Clock, ContextMemory};

use super::{
    extract_entity, extract_filters, extract_relationships, extract_temporal_context, Intent,
    UserContext,
};

/// Builds intents from text and records each one in the context memory.
///
/// Cheap to clone; all state is shared through `Arc`.
#[derive(Clone)]
pub struct IntentAnalyzer {
    knowledge: Arc<DomainKnowledge>,
    memory: Arc<ContextMemory>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for IntentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentAnalyzer")
            .field("knowledge", &self.knowledge.name())
            .field("history", &self.memory.len())
            .finish()
    }
}

impl IntentAnalyzer {
    pub fn new(
        knowledge: Arc<DomainKnowledge>,
        memory: Arc<ContextMemory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            knowledge,
            memory,
            clock,
        }
    }

    pub fn knowledge(&self) -> &DomainKnowledge {
        &self.knowledge
    }

    pub fn memory(&self) -> &ContextMemory {
        &self.memory
    }

    /// Classify `text`, optionally scoped to `user_id`.
    ///
    /// Never fails: unknown actions default to read and unknown categories to
    /// the generic entity. The resulting intent is appended to the history.
    pub fn analyze(&self, text: &str, user_id: Option<&str>) -> Intent {
        let now = self.clock.now();
        let kb = &*self.knowledge;

        let action = kb.actions().detect(text);
        if action.is_default() {
            tracing::info!(text, "no action keyword recognised, defaulting to read");
        }

        let intent = Intent {
            action: action.action,
            action_keyword: action.keyword,
            entity: extract_entity(kb, text),
            filters: extract_filters(kb, text),
            relationships: extract_relationships(kb, text),
            temporal: extract_temporal_context(kb, text),
            user_context: user_id.map(UserContext::new),
            reference_date: now.date_naive(),
        };

        tracing::debug!(
            action = %intent.action,
            category = %intent.entity.category,
            filters = intent.filters.len(),
            relationships = intent.relationships.len(),
            "analyzed command"
        );

        self.memory.append(now, text, intent.clone());
        intent
    }
}
