//! Action detection as an ordered first-match rule table.
//!
//! Priority lives in the data: rules are evaluated in table order and the
//! first rule with a keyword occurring in the lower-cased text wins. Changing
//! priority means reordering `[[actions]]` in the knowledge document.

use super::Action;

/// Keywords that select one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRule {
    pub action: Action,
    /// Lower-case substrings; any one of them selects `action`.
    pub keywords: Vec<String>,
}

impl ActionRule {
    pub fn new(action: Action, keywords: Vec<String>) -> Self {
        Self { action, keywords }
    }

    /// First keyword of this rule present in `lower`.
    fn matched_keyword(&self, lower: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|kw| lower.contains(kw))
    }
}

/// Outcome of action detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatch {
    pub action: Action,
    /// The keyword that matched; `None` means the read default applied.
    pub keyword: Option<String>,
}

impl ActionMatch {
    pub fn is_default(&self) -> bool {
        self.keyword.is_none()
    }
}

/// Ordered list of action rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable {
    rules: Vec<ActionRule>,
}

impl ActionTable {
    /// Action used when no rule matches.
    pub const DEFAULT_ACTION: Action = Action::Read;

    pub fn new(rules: Vec<ActionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ActionRule] {
        &self.rules
    }

    /// Classify `text`; falls back to [`Self::DEFAULT_ACTION`].
    pub fn detect(&self, text: &str) -> ActionMatch {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find_map(|rule| {
                rule.matched_keyword(&lower).map(|kw| ActionMatch {
                    action: rule.action,
                    keyword: Some(kw.to_string()),
                })
            })
            .unwrap_or(ActionMatch {
                action: Self::DEFAULT_ACTION,
                keyword: None,
            })
    }

    /// Convenience wrapper returning only the action.
    pub fn detect_action(&self, text: &str) -> Action {
        self.detect(text).action
    }
}
