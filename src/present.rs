//! Display rows built from executor results.
//!
//! Habit nodes created from free text carry no title or description, so both
//! are synthesised from the node's class and primary value when absent.

use serde::Serialize;

use crate::executor::Row;
use crate::intent::Metric;

/// One habit as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitView {
    /// Local name of the node (`Sommeil_1760601600000_0`).
    pub id: String,
    /// Local name of the class (`Sommeil`).
    pub habit_type: String,
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    /// Numeric values present on the node, in metric order.
    pub values: Vec<(Metric, String)>,
}

/// One group of an aggregate result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub habit_type: String,
    pub count: u64,
    pub average: Option<f64>,
}

/// Text after the last `#` or `/`.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(|c: char| c == '#' || c == '/').next().unwrap_or(iri)
}

fn default_title(habit_type: &str, value: Option<&str>) -> String {
    match (habit_type, value) {
        ("Nutrition", Some(v)) => format!("Nutrition - {v} calories"),
        ("Sommeil", Some(v)) => format!("Sommeil - {v} heures"),
        ("ActivitéPhysique", Some(v)) => format!("Activité - {v} pas"),
        ("Stress", Some(v)) => format!("Stress - Niveau {v}"),
        (other, _) => other.to_string(),
    }
}

fn default_description(habit_type: &str, value: Option<&str>) -> String {
    match (habit_type, value) {
        ("Nutrition", Some(v)) => format!("Apport calorique de {v} calories"),
        ("Sommeil", Some(v)) => format!("{v} heures de sommeil"),
        ("ActivitéPhysique", Some(v)) => format!("Activité physique de {v} pas"),
        ("Stress", Some(v)) => format!("Niveau de stress: {v}"),
        (other, _) => format!("{other} enregistrée"),
    }
}

/// The metric a class is titled by.
fn headline_metric(habit_type: &str) -> Option<Metric> {
    match habit_type {
        "Nutrition" => Some(Metric::Calories),
        "Sommeil" => Some(Metric::Heures),
        "ActivitéPhysique" => Some(Metric::Pas),
        "Stress" => Some(Metric::Niveau),
        _ => None,
    }
}

/// Rows of a compiled read query.
pub fn present_habits(rows: &[Row]) -> Vec<HabitView> {
    rows.iter()
        .map(|row| {
            let habit_type = row
                .get("type")
                .map(|t| local_name(t).to_string())
                .unwrap_or_default();
            let values: Vec<(Metric, String)> = Metric::ALL
                .into_iter()
                .filter_map(|m| row.get(m.as_str()).map(|v| (m, v.clone())))
                .collect();
            let headline = headline_metric(&habit_type)
                .and_then(|m| values.iter().find(|(vm, _)| *vm == m))
                .map(|(_, v)| v.as_str());
            HabitView {
                id: row
                    .get("habitude")
                    .map(|h| local_name(h).to_string())
                    .unwrap_or_default(),
                title: row
                    .get("titre")
                    .cloned()
                    .unwrap_or_else(|| default_title(&habit_type, headline)),
                description: row
                    .get("description")
                    .cloned()
                    .unwrap_or_else(|| default_description(&habit_type, headline)),
                date: row.get("date").cloned(),
                habit_type,
                values,
            }
        })
        .collect()
}

/// Rows of a compiled analyze query.
pub fn present_analysis(rows: &[Row]) -> Vec<AnalysisView> {
    rows.iter()
        .map(|row| AnalysisView {
            habit_type: row
                .get("type")
                .map(|t| local_name(t).to_string())
                .unwrap_or_default(),
            count: row.get("count").and_then(|c| c.parse().ok()).unwrap_or(0),
            average: row.get("moyenne").and_then(|a| a.parse().ok()),
        })
        .collect()
}

impl std::fmt::Display for HabitView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.description)?;
        if let Some(date) = &self.date {
            write!(f, " [{date}]")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} entrée(s)", self.habit_type, self.count)?;
        if let Some(avg) = self.average {
            write!(f, ", moyenne {avg:.2}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn local_name_strips_namespace() {
        assert_eq!(local_name("http://example.org/Sommeil_1"), "Sommeil_1");
        assert_eq!(local_name("http://o.org/onto#Stress"), "Stress");
        assert_eq!(local_name("plain"), "plain");
    }

    #[test]
    fn missing_title_gets_default() {
        let rows = [row(&[
            ("habitude", "http://example.org/Nutrition_1"),
            ("type", "http://www.smarthealth-tracker.com/ontologie#Nutrition"),
            ("calories", "500"),
            ("date", "2026-10-16"),
        ])];
        let views = present_habits(&rows);
        assert_eq!(views[0].id, "Nutrition_1");
        assert_eq!(views[0].title, "Nutrition - 500 calories");
        assert_eq!(views[0].description, "Apport calorique de 500 calories");
        assert_eq!(views[0].values, vec![(Metric::Calories, "500".to_string())]);
    }

    #[test]
    fn stored_title_is_kept() {
        let rows = [row(&[
            ("type", "http://o#Sommeil"),
            ("titre", "Nuit complète"),
            ("heures", "8.0"),
        ])];
        let views = present_habits(&rows);
        assert_eq!(views[0].title, "Nuit complète");
        assert_eq!(views[0].description, "8.0 heures de sommeil");
    }

    #[test]
    fn unknown_type_without_value() {
        let views = present_habits(&[row(&[("type", "http://o#Habitude")])]);
        assert_eq!(views[0].title, "Habitude");
        assert_eq!(views[0].description, "Habitude enregistrée");
    }

    #[test]
    fn analysis_rows_parse_numbers() {
        let rows = [row(&[("type", "http://o#Stress"), ("count", "3"), ("moyenne", "4.5")])];
        let views = present_analysis(&rows);
        assert_eq!(views[0].habit_type, "Stress");
        assert_eq!(views[0].count, 3);
        assert_eq!(views[0].average, Some(4.5));
    }
}
