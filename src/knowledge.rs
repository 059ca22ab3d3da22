//! Domain knowledge base: the static habit taxonomy the extractor consults.
//!
//! The knowledge document is TOML. A bundled copy (`data/knowledge.toml`) is
//! compiled into the binary; operators may point the engine at their own file
//! instead. Either way the document is parsed and validated once at startup
//! and never mutated afterwards.
//!
//! Table order is meaningful throughout: categories, synonyms, action rules
//! and relationship phrases are all matched first-come.

use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::intent::{Action, ActionRule, ActionTable, Entity, Metric};

const BUNDLED_TOML: &str = include_str!("../data/knowledge.toml");

// ── Validated model ─────────────────────────────────────────────────────

/// XSD datatype used when a property value is written as a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralType {
    Integer,
    Decimal,
}

impl LiteralType {
    /// Local name in the `xsd:` namespace.
    pub fn xsd_local(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "integer" | "int" => Some(Self::Integer),
            "decimal" | "float" => Some(Self::Decimal),
            _ => None,
        }
    }
}

/// How a metric is stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySpec {
    /// Predicate local name in the ontology namespace.
    pub predicate: String,
    pub datatype: LiteralType,
}

/// Human-readable target for a category's primary metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    pub optimal_range: String,
    pub unit: String,
}

/// One taxonomy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: String,
    pub graph_class: String,
    pub properties: Vec<Metric>,
    pub synonyms: Vec<String>,
    pub metric: MetricDescriptor,
}

impl Category {
    pub fn entity(&self) -> Entity {
        Entity::new(&self.graph_class, &self.key, self.properties.clone())
    }
}

/// A surface connective and the predicate it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipPhrase {
    pub phrase: String,
    pub predicate: String,
}

/// Keyword sets driving temporal scope and date filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemporalKeywords {
    pub recent: Vec<String>,
    pub oldest: Vec<String>,
    /// Result cap for recent/oldest scopes.
    pub focused_limit: NonZeroUsize,
    /// Result cap when no recency keyword is present.
    pub default_limit: NonZeroUsize,
    pub today: Vec<String>,
    pub yesterday: Vec<String>,
    pub week: Vec<String>,
    pub month: Vec<String>,
}

/// Documentation-only command pattern, shown to users as an example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTemplate {
    pub name: String,
    pub example: String,
    pub template: String,
}

/// The validated, read-only knowledge base.
#[derive(Debug, Clone)]
pub struct DomainKnowledge {
    name: String,
    version: String,
    fallback_class: String,
    fallback_category: String,
    actions: ActionTable,
    properties: BTreeMap<Metric, PropertySpec>,
    categories: Vec<Category>,
    relationships: Vec<RelationshipPhrase>,
    temporal: TemporalKeywords,
    patterns: Vec<PatternTemplate>,
}

impl DomainKnowledge {
    /// The knowledge document compiled into the crate.
    pub fn bundled() -> KnowledgeResult<Self> {
        Self::from_toml(BUNDLED_TOML, "bundled")
    }

    /// Load and validate a knowledge document from disk.
    pub fn load(path: &Path) -> KnowledgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    /// Parse and validate a knowledge document. `origin` names it in errors.
    pub fn from_toml(toml_str: &str, origin: &str) -> KnowledgeResult<Self> {
        let raw: KnowledgeToml = toml::from_str(toml_str).map_err(|e| KnowledgeError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        let knowledge = raw.validate()?;
        tracing::debug!(
            origin,
            name = %knowledge.name,
            categories = knowledge.categories.len(),
            relationships = knowledge.relationships.len(),
            "loaded domain knowledge"
        );
        Ok(knowledge)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, key: &str) -> Option<&Category> {
        let key = key.to_lowercase();
        self.categories.iter().find(|c| c.key == key)
    }

    /// Entity for a category key, or `None` if the key is unknown.
    pub fn entity_for(&self, key: &str) -> Option<Entity> {
        self.category(key).map(Category::entity)
    }

    /// The generic entity used when no category matches.
    pub fn fallback_entity(&self) -> Entity {
        Entity::generic(&self.fallback_class, &self.fallback_category)
    }

    pub fn property(&self, metric: Metric) -> Option<&PropertySpec> {
        self.properties.get(&metric)
    }

    pub fn properties(&self) -> impl Iterator<Item = (Metric, &PropertySpec)> {
        self.properties.iter().map(|(m, spec)| (*m, spec))
    }

    pub fn relationships(&self) -> &[RelationshipPhrase] {
        &self.relationships
    }

    pub fn temporal(&self) -> &TemporalKeywords {
        &self.temporal
    }

    pub fn patterns(&self) -> &[PatternTemplate] {
        &self.patterns
    }
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct KnowledgeToml {
    knowledge: KnowledgeMeta,
    actions: Vec<ActionToml>,
    properties: BTreeMap<String, PropertyToml>,
    categories: Vec<CategoryToml>,
    #[serde(default)]
    relationships: Vec<RelationshipToml>,
    temporal: TemporalToml,
    #[serde(default)]
    patterns: Vec<PatternTemplate>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeMeta {
    name: String,
    version: String,
    fallback_class: String,
    fallback_category: String,
}

#[derive(Debug, Deserialize)]
struct ActionToml {
    action: String,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyToml {
    predicate: String,
    datatype: String,
}

#[derive(Debug, Deserialize)]
struct CategoryToml {
    key: String,
    graph_class: String,
    #[serde(default)]
    properties: Vec<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    metric: MetricDescriptor,
}

#[derive(Debug, Deserialize)]
struct RelationshipToml {
    phrase: String,
    predicate: String,
}

#[derive(Debug, Deserialize)]
struct TemporalToml {
    recent_keywords: Vec<String>,
    oldest_keywords: Vec<String>,
    focused_limit: usize,
    default_limit: usize,
    #[serde(default)]
    today_keywords: Vec<String>,
    #[serde(default)]
    yesterday_keywords: Vec<String>,
    #[serde(default)]
    week_keywords: Vec<String>,
    #[serde(default)]
    month_keywords: Vec<String>,
}

fn invalid(message: impl Into<String>) -> KnowledgeError {
    KnowledgeError::Invalid {
        message: message.into(),
    }
}

/// Lower-case and trim a keyword list, dropping blanks.
fn normalize(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn non_zero(value: usize, field: &str) -> KnowledgeResult<NonZeroUsize> {
    NonZeroUsize::new(value).ok_or_else(|| invalid(format!("temporal.{field} must be at least 1")))
}

impl KnowledgeToml {
    fn validate(self) -> KnowledgeResult<DomainKnowledge> {
        let meta = self.knowledge;
        if meta.fallback_class.trim().is_empty() {
            return Err(invalid("knowledge.fallback_class must not be empty"));
        }

        let actions = validate_actions(self.actions)?;

        let mut properties = BTreeMap::new();
        for (name, prop) in self.properties {
            let metric = Metric::from_name(name.trim()).ok_or_else(|| {
                KnowledgeError::UnknownProperty {
                    property: name.clone(),
                    context: "[properties]".into(),
                }
            })?;
            let datatype =
                LiteralType::parse(&prop.datatype).ok_or_else(|| KnowledgeError::UnknownDatatype {
                    property: name.clone(),
                    datatype: prop.datatype.clone(),
                })?;
            if prop.predicate.trim().is_empty() {
                return Err(invalid(format!("property \"{name}\" has an empty predicate")));
            }
            properties.insert(
                metric,
                PropertySpec {
                    predicate: prop.predicate.trim().to_string(),
                    datatype,
                },
            );
        }

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(self.categories.len());
        for raw in self.categories {
            let key = raw.key.trim().to_lowercase();
            if key.is_empty() || raw.graph_class.trim().is_empty() {
                return Err(invalid("categories need a non-empty key and graph_class"));
            }
            if !seen.insert(key.clone()) {
                return Err(invalid(format!("duplicate category \"{key}\"")));
            }
            let mut metrics = Vec::with_capacity(raw.properties.len());
            for name in &raw.properties {
                let metric = Metric::from_name(name.trim())
                    .filter(|m| properties.contains_key(m))
                    .ok_or_else(|| KnowledgeError::UnknownProperty {
                        property: name.clone(),
                        context: format!("category \"{key}\""),
                    })?;
                metrics.push(metric);
            }
            categories.push(Category {
                key,
                graph_class: raw.graph_class.trim().to_string(),
                properties: metrics,
                synonyms: normalize(raw.synonyms),
                metric: raw.metric,
            });
        }

        let mut relationships = Vec::with_capacity(self.relationships.len());
        for raw in self.relationships {
            let phrase = raw.phrase.trim().to_lowercase();
            if phrase.is_empty() || raw.predicate.trim().is_empty() {
                return Err(invalid("relationship phrases need a phrase and a predicate"));
            }
            relationships.push(RelationshipPhrase {
                phrase,
                predicate: raw.predicate.trim().to_string(),
            });
        }

        let t = self.temporal;
        let temporal = TemporalKeywords {
            recent: normalize(t.recent_keywords),
            oldest: normalize(t.oldest_keywords),
            focused_limit: non_zero(t.focused_limit, "focused_limit")?,
            default_limit: non_zero(t.default_limit, "default_limit")?,
            today: normalize(t.today_keywords),
            yesterday: normalize(t.yesterday_keywords),
            week: normalize(t.week_keywords),
            month: normalize(t.month_keywords),
        };

        Ok(DomainKnowledge {
            name: meta.name,
            version: meta.version,
            fallback_class: meta.fallback_class.trim().to_string(),
            fallback_category: meta.fallback_category.trim().to_string(),
            actions,
            properties,
            categories,
            relationships,
            temporal,
            patterns: self.patterns,
        })
    }
}

/// Every action must appear exactly once; entry order becomes match priority.
fn validate_actions(raw: Vec<ActionToml>) -> KnowledgeResult<ActionTable> {
    let mut rules = Vec::with_capacity(raw.len());
    for entry in raw {
        let action = Action::from_str_loose(&entry.action).ok_or_else(|| {
            KnowledgeError::UnknownAction {
                name: entry.action.clone(),
            }
        })?;
        if rules.iter().any(|r: &ActionRule| r.action == action) {
            return Err(KnowledgeError::ActionTable {
                action: action.to_string(),
            });
        }
        rules.push(ActionRule::new(action, normalize(entry.keywords)));
    }
    if let Some(missing) = Action::ALL
        .iter()
        .find(|a| !rules.iter().any(|r| r.action == **a))
    {
        return Err(KnowledgeError::ActionTable {
            action: missing.to_string(),
        });
    }
    Ok(ActionTable::new(rules))
}
