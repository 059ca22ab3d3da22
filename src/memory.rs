//! Context memory: append-only command history and per-user preferences.
//!
//! The history is an in-process log of every analyzed command. It is
//! unbounded unless a capacity is configured, in which case it behaves as a
//! ring buffer and the oldest entries are evicted. Nothing is persisted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::intent::Intent;

// ── Clock ───────────────────────────────────────────────────────────────

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date (UTC) of [`Clock::now`].
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for deterministic tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ── History ─────────────────────────────────────────────────────────────

/// One analyzed command.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    /// Unique, strictly increasing in append order.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub intent: Intent,
}

#[derive(Debug, Default)]
struct History {
    entries: VecDeque<ContextEntry>,
    next_sequence: u64,
}

/// Shared history log plus the user preference map.
#[derive(Debug, Default)]
pub struct ContextMemory {
    history: Mutex<History>,
    capacity: Option<usize>,
    preferences: DashMap<String, HashMap<String, String>>,
}

impl ContextMemory {
    /// Unbounded memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory that keeps at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        // Poisoned locks are recovered; appends are a single push_back.
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry; returns its sequence number.
    pub fn append(&self, timestamp: DateTime<Utc>, text: impl Into<String>, intent: Intent) -> u64 {
        let mut history = self.lock();
        let sequence = history.next_sequence;
        history.next_sequence += 1;
        history.entries.push_back(ContextEntry {
            sequence,
            timestamp,
            text: text.into(),
            intent,
        });
        if let Some(cap) = self.capacity {
            while history.entries.len() > cap {
                history.entries.pop_front();
            }
        }
        tracing::trace!(sequence, "appended context entry");
        sequence
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<ContextEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<ContextEntry> {
        self.lock().entries.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Preferences ──

    /// Record a preference for a user, replacing any previous value.
    pub fn set_preference(&self, user_id: &str, key: impl Into<String>, value: impl Into<String>) {
        self.preferences
            .entry(user_id.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn preference(&self, user_id: &str, key: &str) -> Option<String> {
        self.preferences
            .get(user_id)
            .and_then(|prefs| prefs.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::intent::{Action, Entity};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn intent() -> Intent {
        Intent::new(Action::Read, Entity::generic("Habitude", "général"), date())
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let clock = FixedClock::on(date());
        assert_eq!(clock.today(), date());
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn append_assigns_increasing_sequences() {
        let memory = ContextMemory::new();
        let now = Utc::now();
        let a = memory.append(now, "un", intent());
        let b = memory.append(now, "deux", intent());
        assert!(b > a);
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.latest().unwrap().text, "deux");
    }

    #[test]
    fn bounded_memory_evicts_oldest() {
        let memory = ContextMemory::with_capacity(2);
        let now = Utc::now();
        for text in ["a", "b", "c"] {
            memory.append(now, text, intent());
        }
        let texts: Vec<String> = memory.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(memory.entries()[0].sequence, 1);
    }

    #[test]
    fn preferences_roundtrip_per_user() {
        let memory = ContextMemory::new();
        memory.set_preference("42", "unit", "kcal");
        memory.set_preference("42", "unit", "kJ");
        assert_eq!(memory.preference("42", "unit").as_deref(), Some("kJ"));
        assert_eq!(memory.preference("7", "unit"), None);
    }

    #[test]
    fn concurrent_appends_get_unique_sequences() {
        let memory = Arc::new(ContextMemory::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let memory = Arc::clone(&memory);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        memory.append(Utc::now(), format!("{t}-{i}"), intent());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let entries = memory.entries();
        assert_eq!(entries.len(), 400);
        assert!(entries.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }
}
