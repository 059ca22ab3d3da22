//! Keyword and pattern extractors.
//!
//! All functions take the raw command text, lower-case it themselves, and
//! consult the read-only knowledge base. They never fail: anything not found
//! is simply absent from the result.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::knowledge::DomainKnowledge;

use super::{
    DateFilter, Entity, FilterKey, Filters, Metric, Period, Relationship, TemporalContext,
    TemporalScope,
};

// ── Regex patterns ──────────────────────────────────────────────────────

/// `<number> <unit>`; the number accepts a comma or dot decimal separator.
static RE_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:[.,]\d+)?)\s*(calories|calorie|kcal|heures|heure|pas|niveau)\b").unwrap()
});

/// `niveau <number>`, with an optional "de stress".
static RE_LEVEL_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bniveau\s+(?:de\s+stress\s+)?(\d+(?:[.,]\d+)?)\b").unwrap()
});

static RE_RANGE_ENTRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bentre\s+(\d+(?:[.,]\d+)?)\s+et\s+(\d+(?:[.,]\d+)?)").unwrap()
});

static RE_RANGE_DE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bde\s+(\d+(?:[.,]\d+)?)\s+(?:à|a)\s+(\d+(?:[.,]\d+)?)").unwrap()
});

/// A unit word directly after a range ("entre 7 et 9 heures").
static RE_TRAILING_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(calories|calorie|kcal|heures|heure|pas)\b").unwrap()
});

static RE_UNIT_CALORIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:calories?|kcal)\b").unwrap());

static RE_UNIT_HEURES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bheures?\b").unwrap());

static RE_UNIT_PAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bpas\b").unwrap());

/// Range filters can target these families only, in this preference order.
const RANGE_FAMILIES: [Metric; 3] = [Metric::Calories, Metric::Heures, Metric::Pas];

// ── Entity ──────────────────────────────────────────────────────────────

/// Resolve the targeted category: keys first, then synonyms, then fallback.
pub fn extract_entity(knowledge: &DomainKnowledge, text: &str) -> Entity {
    let lower = text.to_lowercase();
    let by_key = knowledge
        .categories()
        .iter()
        .find(|c| lower.contains(c.key.as_str()));
    let category = by_key.or_else(|| {
        knowledge
            .categories()
            .iter()
            .find(|c| c.synonyms.iter().any(|s| synonym_matches(&lower, s)))
    });
    match category {
        Some(category) => category.entity(),
        None => knowledge.fallback_entity(),
    }
}

/// Synonyms match as substrings, except the bare unit word "pas", which
/// would otherwise fire inside "repas" or "passer".
fn synonym_matches(lower: &str, synonym: &str) -> bool {
    if synonym == "pas" {
        find_word(lower, synonym).is_some()
    } else {
        lower.contains(synonym)
    }
}

// ── Filters ─────────────────────────────────────────────────────────────

/// Extract numeric, range and temporal filters.
///
/// Numeric filters are recorded independently of the category; the compiler's
/// allow-list decides later which of them are used.
pub fn extract_filters(knowledge: &DomainKnowledge, text: &str) -> Filters {
    let lower = text.to_lowercase();
    let mut filters = Filters::new();

    let ranges = find_ranges(&lower);
    for range in &ranges {
        if let Some(metric) = range.family {
            let (lo, hi) = if range.min <= range.max {
                (range.min, range.max)
            } else {
                (range.max, range.min)
            };
            if let (Some(lo), Some(hi)) = (metric.quantity(lo), metric.quantity(hi)) {
                filters.insert(FilterKey::min(metric), lo);
                filters.insert(FilterKey::max(metric), hi);
            }
        }
    }

    // Single values, applied in text order so the last occurrence wins.
    let mut singles: Vec<(usize, Metric, f64)> = Vec::new();
    for caps in RE_QUANTITY.captures_iter(&lower) {
        let (Some(num), Some(unit)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if ranges.iter().any(|r| overlaps(&r.span, &num.range())) {
            continue;
        }
        if let (Some(metric), Some(value)) = (unit_metric(unit.as_str()), parse_number(num.as_str())) {
            singles.push((num.start(), metric, value));
        }
    }
    for caps in RE_LEVEL_FIRST.captures_iter(&lower) {
        if let Some(num) = caps.get(1) {
            if let Some(value) = parse_number(num.as_str()) {
                singles.push((num.start(), Metric::Niveau, value));
            }
        }
    }
    singles.sort_by_key(|(pos, _, _)| *pos);
    for (_, metric, value) in singles {
        if let Some(quantity) = metric.quantity(value) {
            filters.insert(FilterKey::exact(metric), quantity);
        }
    }

    let temporal = knowledge.temporal();
    if contains_any_word(&lower, &temporal.today) {
        filters.date = Some(DateFilter::Today);
    } else if contains_any_word(&lower, &temporal.yesterday) {
        filters.date = Some(DateFilter::Yesterday);
    }
    if contains_any_word(&lower, &temporal.week) {
        filters.period = Some(Period::Week);
    } else if contains_any_word(&lower, &temporal.month) {
        filters.period = Some(Period::Month);
    }

    filters
}

/// A recognised "entre X et Y" / "de X à Y" phrase.
#[derive(Debug)]
struct RangeMatch {
    span: Range<usize>,
    min: f64,
    max: f64,
    /// `None` when no unit word appears anywhere: the range is dropped.
    family: Option<Metric>,
}

fn find_ranges(lower: &str) -> Vec<RangeMatch> {
    let mut ranges = Vec::new();
    for re in [&*RE_RANGE_ENTRE, &*RE_RANGE_DE] {
        for caps in re.captures_iter(lower) {
            let (Some(whole), Some(a), Some(b)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            if ranges.iter().any(|r: &RangeMatch| overlaps(&r.span, &whole.range())) {
                continue;
            }
            let (Some(min), Some(max)) = (parse_number(a.as_str()), parse_number(b.as_str())) else {
                continue;
            };
            let family = RE_TRAILING_UNIT
                .captures(&lower[whole.end()..])
                .and_then(|c| c.get(1))
                .and_then(|u| unit_metric(u.as_str()))
                .or_else(|| named_family(lower));
            ranges.push(RangeMatch {
                span: whole.range(),
                min,
                max,
                family,
            });
        }
    }
    ranges
}

/// First range family whose unit word occurs anywhere in the text.
fn named_family(lower: &str) -> Option<Metric> {
    RANGE_FAMILIES.into_iter().find(|metric| match metric {
        Metric::Calories => RE_UNIT_CALORIES.is_match(lower),
        Metric::Heures => RE_UNIT_HEURES.is_match(lower),
        Metric::Pas => RE_UNIT_PAS.is_match(lower),
        Metric::Niveau => false,
    })
}

fn unit_metric(unit: &str) -> Option<Metric> {
    match unit {
        "calories" | "calorie" | "kcal" => Some(Metric::Calories),
        "heures" | "heure" => Some(Metric::Heures),
        "pas" => Some(Metric::Pas),
        "niveau" => Some(Metric::Niveau),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

// ── Relationships ───────────────────────────────────────────────────────

/// One record per connective phrase, split at its first occurrence.
///
/// Phrases match as plain substrings of the lower-cased text, so the short
/// "a" also matches inside words. Subject and object keep the original case.
pub fn extract_relationships(knowledge: &DomainKnowledge, text: &str) -> Vec<Relationship> {
    let (lower, origin) = lower_with_offsets(text);
    knowledge
        .relationships()
        .iter()
        .filter_map(|rel| {
            let start = lower.find(rel.phrase.as_str())?;
            let end = start + rel.phrase.len();
            Some(Relationship {
                natural_phrase: rel.phrase.clone(),
                graph_predicate: rel.predicate.clone(),
                inferred_subject: text[..origin[start]].trim().to_string(),
                inferred_object: text[origin[end]..].trim().to_string(),
            })
        })
        .collect()
}

/// Lower-case `text` and map every byte offset of the result back to the
/// start of the original character it came from.
///
/// The map has one extra entry for the end of the string.
fn lower_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut lower = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len() + 1);
    for (at, c) in text.char_indices() {
        for lc in c.to_lowercase() {
            lower.push(lc);
            origin.resize(lower.len(), at);
        }
    }
    origin.push(text.len());
    (lower, origin)
}

// ── Temporal context ────────────────────────────────────────────────────

/// Recency policy and result cap.
pub fn extract_temporal_context(knowledge: &DomainKnowledge, text: &str) -> TemporalContext {
    let lower = text.to_lowercase();
    let temporal = knowledge.temporal();
    if temporal.recent.iter().any(|kw| lower.contains(kw.as_str())) {
        TemporalContext::new(TemporalScope::Recent, temporal.focused_limit)
    } else if temporal.oldest.iter().any(|kw| lower.contains(kw.as_str())) {
        TemporalContext::new(TemporalScope::Oldest, temporal.focused_limit)
    } else {
        TemporalContext::new(TemporalScope::All, temporal.default_limit)
    }
}

// ── Word matching ───────────────────────────────────────────────────────

/// Byte offset of the first occurrence of `needle` that is not glued to a
/// letter or digit on either side.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn contains_any_word(haystack: &str, words: &[String]) -> bool {
    words.iter().any(|w| find_word(haystack, w).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Quantity;

    fn kb() -> DomainKnowledge {
        DomainKnowledge::bundled().unwrap()
    }

    // ── entity ──

    #[test]
    fn entity_from_category_key() {
        let e = extract_entity(&kb(), "ajoute une habitude sommeil avec 8 heures");
        assert_eq!(e.category, "sommeil");
        assert_eq!(e.graph_class, "Sommeil");
        assert_eq!(e.properties, vec![Metric::Heures]);
        assert!(!e.is_generic());
    }

    #[test]
    fn entity_from_synonym() {
        assert_eq!(extract_entity(&kb(), "mon repas de midi").category, "nutrition");
        assert_eq!(extract_entity(&kb(), "je veux dormir plus").category, "sommeil");
        assert_eq!(extract_entity(&kb(), "une séance de sport").category, "activité");
        assert_eq!(extract_entity(&kb(), "moment de détente").category, "stress");
    }

    #[test]
    fn unit_words_select_a_category() {
        assert_eq!(extract_entity(&kb(), "ajoute 500 calories").category, "nutrition");
        assert_eq!(extract_entity(&kb(), "un dîner de 700 kcal").category, "nutrition");
        assert_eq!(extract_entity(&kb(), "ajoute 8000 pas aujourd'hui").category, "activité");
    }

    #[test]
    fn pas_needs_word_boundaries() {
        assert_eq!(extract_entity(&kb(), "mon repas du soir").category, "nutrition");
        assert!(extract_entity(&kb(), "passer une bonne soirée").is_generic());
        assert!(extract_entity(&kb(), "le passé").is_generic());
    }

    #[test]
    fn category_key_beats_synonym() {
        // "repas" is a nutrition synonym but "stress" is a key.
        assert_eq!(extract_entity(&kb(), "stress pendant le repas").category, "stress");
    }

    #[test]
    fn entity_falls_back_to_generic() {
        let e = extract_entity(&kb(), "montre tout");
        assert!(e.is_generic());
        assert_eq!(e.category, "général");
        assert_eq!(e.graph_class, "Habitude");
        assert!(e.properties.is_empty());
    }

    // ── filters ──

    #[test]
    fn single_decimal_hours() {
        let f = extract_filters(&kb(), "ajoute une habitude sommeil avec 8 heures");
        assert_eq!(f.get(FilterKey::exact(Metric::Heures)), Some(Quantity::Decimal(8.0)));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn comma_decimal_separator() {
        let f = extract_filters(&kb(), "sommeil de 7,5 heures");
        assert_eq!(f.get(FilterKey::exact(Metric::Heures)), Some(Quantity::Decimal(7.5)));
    }

    #[test]
    fn integer_units_truncate() {
        let f = extract_filters(&kb(), "repas de 450.7 calories et 3000 pas");
        assert_eq!(f.get(FilterKey::exact(Metric::Calories)), Some(Quantity::Integer(450)));
        assert_eq!(f.get(FilterKey::exact(Metric::Pas)), Some(Quantity::Integer(3000)));
    }

    #[test]
    fn values_too_large_for_integers_are_dropped() {
        let f = extract_filters(&kb(), "ajoute 99999999999999999999 calories");
        assert!(f.is_empty());
        let f = extract_filters(&kb(), "entre 1 et 99999999999999999999 pas");
        assert!(f.is_empty());
        let f = extract_filters(&kb(), "99999999999999999999 heures");
        assert_eq!(f.get(FilterKey::exact(Metric::Heures)), Some(Quantity::Decimal(1e20)));
    }

    #[test]
    fn last_occurrence_wins() {
        let f = extract_filters(&kb(), "200 calories puis 350 calories");
        assert_eq!(f.get(FilterKey::exact(Metric::Calories)), Some(Quantity::Integer(350)));
    }

    #[test]
    fn level_before_or_after_number() {
        let f = extract_filters(&kb(), "stress 6 niveau");
        assert_eq!(f.get(FilterKey::exact(Metric::Niveau)), Some(Quantity::Integer(6)));
        let f = extract_filters(&kb(), "stress niveau 4");
        assert_eq!(f.get(FilterKey::exact(Metric::Niveau)), Some(Quantity::Integer(4)));
    }

    #[test]
    fn range_entre_assigns_min_max() {
        let f = extract_filters(
            &kb(),
            "trouve les habitudes nutrition entre 300 et 600 calories",
        );
        assert_eq!(f.get_named("caloriesMin"), Some(Quantity::Integer(300)));
        assert_eq!(f.get_named("caloriesMax"), Some(Quantity::Integer(600)));
        assert_eq!(f.get_named("calories"), None);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn range_de_a_with_unit_elsewhere() {
        let f = extract_filters(&kb(), "les heures de sommeil de 6 à 9");
        assert_eq!(f.get_named("heuresMin"), Some(Quantity::Decimal(6.0)));
        assert_eq!(f.get_named("heuresMax"), Some(Quantity::Decimal(9.0)));
    }

    #[test]
    fn range_prefers_trailing_unit() {
        let f = extract_filters(&kb(), "calories brûlées entre 5000 et 8000 pas");
        assert_eq!(f.get_named("pasMin"), Some(Quantity::Integer(5000)));
        assert_eq!(f.get_named("caloriesMin"), None);
    }

    #[test]
    fn range_without_unit_is_dropped() {
        let f = extract_filters(&kb(), "trouve entre 3 et 5");
        assert!(f.is_empty());
    }

    #[test]
    fn reversed_range_is_ordered() {
        let f = extract_filters(&kb(), "entre 600 et 300 calories");
        assert_eq!(f.get_named("caloriesMin"), Some(Quantity::Integer(300)));
        assert_eq!(f.get_named("caloriesMax"), Some(Quantity::Integer(600)));
    }

    #[test]
    fn temporal_filters() {
        let f = extract_filters(&kb(), "mes repas d'aujourd'hui");
        assert_eq!(f.date, Some(DateFilter::Today));
        let f = extract_filters(&kb(), "le sommeil d'hier");
        assert_eq!(f.date, Some(DateFilter::Yesterday));
        let f = extract_filters(&kb(), "activité de la semaine");
        assert_eq!(f.period, Some(Period::Week));
        let f = extract_filters(&kb(), "stress ce mois");
        assert_eq!(f.period, Some(Period::Month));
    }

    #[test]
    fn temporal_keywords_need_word_boundaries() {
        let f = extract_filters(&kb(), "importe le fichier");
        assert_eq!(f.date, None);
    }

    #[test]
    fn filters_ignore_category() {
        // Extraction does not cross-check units against the category.
        let f = extract_filters(&kb(), "sommeil avec 500 calories");
        assert_eq!(f.get(FilterKey::exact(Metric::Calories)), Some(Quantity::Integer(500)));
    }

    // ── relationships ──

    #[test]
    fn relationship_splits_subject_and_object() {
        let rels = extract_relationships(&kb(), "Ce repas appartient à Marie");
        let rel = rels
            .iter()
            .find(|r| r.natural_phrase == "appartient à")
            .unwrap();
        assert_eq!(rel.graph_predicate, "appartientA");
        assert_eq!(rel.inferred_subject, "Ce repas");
        assert_eq!(rel.inferred_object, "Marie");
    }

    #[test]
    fn overlapping_phrases_each_produce_a_record() {
        let rels = extract_relationships(&kb(), "Paul a pour objectif le sommeil");
        let phrases: Vec<&str> = rels.iter().map(|r| r.natural_phrase.as_str()).collect();
        assert_eq!(phrases, vec!["a pour", "a"]);
        assert_eq!(rels[0].inferred_subject, "Paul");
        assert_eq!(rels[0].inferred_object, "objectif le sommeil");
        // "a" first occurs inside "Paul".
        assert_eq!(rels[1].inferred_subject, "P");
        assert_eq!(rels[1].inferred_object, "ul a pour objectif le sommeil");
    }

    #[test]
    fn phrase_matches_inside_words() {
        let rels = extract_relationships(&kb(), "ajoute une habitude");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].natural_phrase, "a");
        assert_eq!(rels[0].graph_predicate, "aHabitude");
        assert_eq!(rels[0].inferred_subject, "");
        assert_eq!(rels[0].inferred_object, "joute une habitude");
    }

    #[test]
    fn no_phrase_no_record() {
        assert!(extract_relationships(&kb(), "dormir 8 heures").is_empty());
    }

    #[test]
    fn spans_survive_case_folding_that_changes_length() {
        // U+0130 lower-cases to two characters.
        let rels = extract_relationships(&kb(), "İLÉ APPARTIENT À ÉMILE");
        let rel = rels
            .iter()
            .find(|r| r.natural_phrase == "appartient à")
            .unwrap();
        assert_eq!(rel.inferred_subject, "İLÉ");
        assert_eq!(rel.inferred_object, "ÉMILE");
    }

    // ── temporal context ──

    #[test]
    fn temporal_scopes() {
        let t = extract_temporal_context(&kb(), "mes dernières habitudes");
        assert_eq!(t.scope, TemporalScope::Recent);
        assert_eq!(t.limit.get(), 10);

        let t = extract_temporal_context(&kb(), "les plus anciennes");
        assert_eq!(t.scope, TemporalScope::Oldest);
        assert_eq!(t.limit.get(), 10);

        let t = extract_temporal_context(&kb(), "toutes les habitudes");
        assert_eq!(t.scope, TemporalScope::All);
        assert_eq!(t.limit.get(), 100);
    }

    #[test]
    fn temporal_limit_is_always_positive() {
        for text in ["", "récent", "premier", "???", "ancien et récent"] {
            let t = extract_temporal_context(&kb(), text);
            assert!(t.limit.get() >= 1);
        }
    }

    #[test]
    fn find_word_respects_boundaries() {
        assert_eq!(find_word("il a une", "a"), Some(3));
        assert_eq!(find_word("habitude", "a"), None);
        assert_eq!(find_word("lié à marie", "lié à"), Some(0));
    }
}
