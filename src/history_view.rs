//src/history_view.rs
//! Read-side shaping of history: filtering, date grouping, name lookups,
//! catalog search and chart series. Everything here is pure and works on
//! records already loaded from the store.

use crate::compare::parse_reading;
use crate::models::{Category, Exercise, HistoryEntry, Timestamp, WorkoutSheet};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNKNOWN_EXERCISE: &str = "Unknown exercise";
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Whether chrono understands every specifier in `date_format`.
pub fn is_valid_date_format(date_format: &str) -> bool {
    !StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error))
}

/// Calendar date of `timestamp` in the local time zone.
pub fn local_date(timestamp: Timestamp) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.date_naive())
}

/// Formats in local time. A format chrono cannot render falls back to the
/// plain `Display` of the date time.
pub fn format_timestamp(timestamp: Timestamp, date_format: &str) -> String {
    let Some(dt) = Local.timestamp_millis_opt(timestamp).single() else {
        return timestamp.to_string();
    };
    let mut out = String::new();
    if write!(out, "{}", dt.format(date_format)).is_err() {
        debug!(%date_format, "unrenderable date format");
        return dt.to_string();
    }
    out
}

/// Id to name lookups over the loaded categories and exercises. Dangling
/// references resolve to placeholder names instead of failing.
#[derive(Debug, Default)]
pub struct Catalog {
    categories: HashMap<String, Category>,
    exercises: HashMap<String, Exercise>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>, exercises: Vec<Exercise>) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
            exercises: exercises.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    /// Name of the exercise, `None` when it no longer exists.
    pub fn find_exercise_name(&self, id: &str) -> Option<&str> {
        self.exercises.get(id).map(|e| e.name.as_str())
    }

    pub fn find_category_name(&self, id: &str) -> Option<&str> {
        self.categories.get(id).map(|c| c.name.as_str())
    }

    /// Name of the category the exercise belongs to, `None` when either
    /// lookup dangles.
    pub fn find_category_of_exercise(&self, exercise_id: &str) -> Option<&str> {
        let exercise = self.exercises.get(exercise_id)?;
        self.find_category_name(&exercise.category_id)
    }

    pub fn exercise_name(&self, id: &str) -> &str {
        self.find_exercise_name(id).unwrap_or(UNKNOWN_EXERCISE)
    }

    pub fn category_name(&self, id: &str) -> &str {
        match self.categories.get(id) {
            Some(category) => &category.name,
            None => {
                debug!(category_id = %id, "dangling category reference");
                UNCATEGORIZED
            }
        }
    }

    pub fn category_of_exercise(&self, exercise_id: &str) -> &str {
        match self.exercises.get(exercise_id) {
            Some(exercise) => self.category_name(&exercise.category_id),
            None => UNCATEGORIZED,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub search: Option<String>,
    pub exercise_id: Option<String>,
    pub date: Option<NaiveDate>,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry, catalog: &Catalog) -> bool {
        let text_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                catalog
                    .find_exercise_name(&entry.exercise_id)
                    .is_some_and(|name| contains_ci(name, &needle))
                    || catalog
                        .find_category_of_exercise(&entry.exercise_id)
                        .is_some_and(|name| contains_ci(name, &needle))
                    || entry
                        .comment
                        .as_deref()
                        .is_some_and(|c| contains_ci(c, &needle))
            }
        };
        let exercise_ok = self
            .exercise_id
            .as_deref()
            .map_or(true, |id| id == entry.exercise_id);
        let date_ok = self
            .date
            .map_or(true, |date| local_date(entry.timestamp) == Some(date));
        text_ok && exercise_ok && date_ok
    }

    /// Keeps matching entries in their given order.
    pub fn apply(&self, entries: Vec<HistoryEntry>, catalog: &Catalog) -> Vec<HistoryEntry> {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry, catalog))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryGroup {
    /// Formatted date, or empty when grouping is off.
    pub label: String,
    pub entries: Vec<HistoryEntry>,
}

/// Partitions entries by formatted local date in first-seen order. With
/// grouping disabled everything lands in one unlabeled group.
pub fn group_by_date(entries: Vec<HistoryEntry>, date_format: &str, enabled: bool) -> Vec<HistoryGroup> {
    if !enabled {
        return vec![HistoryGroup {
            label: String::new(),
            entries,
        }];
    }
    let date_format = if is_valid_date_format(date_format) {
        date_format
    } else {
        DEFAULT_DATE_FORMAT
    };
    let mut groups: Vec<HistoryGroup> = Vec::new();
    for entry in entries {
        let label = format_timestamp(entry.timestamp, date_format);
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.entries.push(entry),
            None => groups.push(HistoryGroup {
                label,
                entries: vec![entry],
            }),
        }
    }
    groups
}

pub fn search_categories<'a>(categories: &'a [Category], text: &str) -> Vec<&'a Category> {
    let needle = text.trim().to_lowercase();
    categories
        .iter()
        .filter(|c| contains_ci(&c.name, &needle) || contains_ci(&c.description, &needle))
        .collect()
}

pub fn search_exercises<'a>(exercises: &'a [Exercise], catalog: &Catalog, text: &str) -> Vec<&'a Exercise> {
    let needle = text.trim().to_lowercase();
    exercises
        .iter()
        .filter(|e| {
            contains_ci(&e.name, &needle)
                || contains_ci(&e.body_part.to_string(), &needle)
                || catalog
                    .find_category_name(&e.category_id)
                    .is_some_and(|name| contains_ci(name, &needle))
        })
        .collect()
}

/// `(timestamp, value)` points for one parameter, oldest first. Entries
/// without the parameter are left out; non-numeric values plot as 0.
pub fn chart_series(entries: &[HistoryEntry], parameter: &str) -> Vec<(Timestamp, f64)> {
    // Input is newest first; ties keep insertion order.
    let mut points: Vec<(Timestamp, f64)> = entries
        .iter()
        .rev()
        .filter_map(|entry| {
            entry
                .parameters
                .get(parameter)
                .map(|raw| (entry.timestamp, parse_reading(raw).unwrap_or(0.0)))
        })
        .collect();
    points.sort_by_key(|(ts, _)| *ts);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetSummary {
    pub exercise_count: usize,
    pub total_sets: u32,
}

pub fn sheet_summary(sheet: &WorkoutSheet) -> SheetSummary {
    SheetSummary {
        exercise_count: sheet.exercises.len(),
        total_sets: sheet.total_sets(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyPart, Parameters};

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn exercise(id: &str, name: &str, category_id: &str) -> Exercise {
        Exercise {
            id: id.into(),
            name: name.into(),
            category_id: category_id.into(),
            body_part: BodyPart::Legs,
            parameters: Parameters::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn at(date: NaiveDate, hour: u32) -> Timestamp {
        Local
            .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .timestamp_millis()
    }

    fn entry(id: &str, exercise_id: &str, timestamp: Timestamp, comment: Option<&str>) -> HistoryEntry {
        HistoryEntry {
            id: id.into(),
            exercise_id: exercise_id.into(),
            parameters: Parameters::from([("weight".to_string(), "80".to_string())]),
            previous_parameters: Parameters::new(),
            timestamp,
            comment: comment.map(str::to_string),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![category("c1", "Strength")],
            vec![
                exercise("squat", "Back Squat", "c1"),
                exercise("row", "Row", "c1"),
                exercise("orphan", "Plank", "gone"),
            ],
        )
    }

    #[test]
    fn text_search_matches_exercise_name_case_insensitively() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let filter = HistoryFilter {
            search: Some("squat".into()),
            ..Default::default()
        };
        let catalog = catalog();
        assert!(filter.matches(&entry("1", "squat", at(day, 9), None), &catalog));
        assert!(!filter.matches(&entry("2", "row", at(day, 9), Some("pulled")), &catalog));
        assert!(filter.matches(&entry("3", "row", at(day, 9), Some("before SQUATS")), &catalog));
    }

    #[test]
    fn text_search_reaches_category_name() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let filter = HistoryFilter {
            search: Some("strength".into()),
            ..Default::default()
        };
        let catalog = catalog();
        assert!(filter.matches(&entry("1", "row", at(day, 9), None), &catalog));
        assert!(!filter.matches(&entry("2", "orphan", at(day, 9), None), &catalog));
    }

    #[test]
    fn placeholder_names_are_not_searchable() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let catalog = catalog();
        for text in ["cat", "unknown", "ex"] {
            let filter = HistoryFilter {
                search: Some(text.into()),
                ..Default::default()
            };
            assert!(!filter.matches(&entry("1", "orphan", at(day, 9), None), &catalog), "{text}");
            assert!(!filter.matches(&entry("2", "missing", at(day, 9), None), &catalog), "{text}");
        }
        let exercises = vec![exercise("orphan", "Plank", "gone")];
        assert!(search_exercises(&exercises, &catalog, "uncat").is_empty());
    }

    #[test]
    fn exercise_and_date_filters_combine() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let entries = vec![
            entry("1", "squat", at(monday, 8), None),
            entry("2", "squat", at(tuesday, 8), None),
            entry("3", "row", at(monday, 20), None),
        ];
        let filter = HistoryFilter {
            exercise_id: Some("squat".into()),
            date: Some(monday),
            ..Default::default()
        };
        let kept = filter.apply(entries, &catalog());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn grouping_keeps_first_seen_order() {
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let entries = vec![
            entry("a", "squat", at(d1, 18), None),
            entry("b", "row", at(d1, 7), None),
            entry("c", "squat", at(d2, 12), None),
        ];
        let groups = group_by_date(entries.clone(), "%d/%m/%Y", true);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "05/03/2024");
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[1].label, "04/03/2024");

        let single = group_by_date(entries, "%d/%m/%Y", false);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].entries.len(), 3);
    }

    #[test]
    fn bad_date_format_does_not_panic() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(!is_valid_date_format("%Q"));
        assert!(is_valid_date_format("%Y-%m-%d"));

        let entries = vec![entry("a", "squat", at(day, 9), None), entry("b", "row", at(day, 18), None)];
        let groups = group_by_date(entries, "%Q", true);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "05/03/2024");

        assert!(format_timestamp(at(day, 9), "%Q %H").starts_with("2024-03-05"));
    }

    #[test]
    fn dangling_references_get_placeholders() {
        let catalog = catalog();
        assert_eq!(catalog.category_of_exercise("orphan"), UNCATEGORIZED);
        assert_eq!(catalog.exercise_name("missing"), UNKNOWN_EXERCISE);
        assert_eq!(catalog.category_of_exercise("missing"), UNCATEGORIZED);
    }

    #[test]
    fn catalog_search_covers_body_part_and_category() {
        let catalog = catalog();
        let exercises = vec![exercise("squat", "Back Squat", "c1"), exercise("row", "Row", "c1")];
        assert_eq!(search_exercises(&exercises, &catalog, "LEGS").len(), 2);
        assert_eq!(search_exercises(&exercises, &catalog, "row").len(), 1);
        let categories = vec![category("c1", "Strength"), category("c2", "Cardio")];
        assert_eq!(search_categories(&categories, "card").len(), 1);
    }

    #[test]
    fn chart_series_is_ascending_with_non_numeric_as_zero() {
        let mut newer = entry("2", "squat", 2_000, None);
        newer.parameters.insert("weight".into(), "heavy".into());
        let older = entry("1", "squat", 1_000, None);
        let points = chart_series(&[newer, older], "weight");
        assert_eq!(points, vec![(1_000, 80.0), (2_000, 0.0)]);
        assert!(chart_series(&[entry("3", "squat", 5, None)], "reps").is_empty());
    }
}
