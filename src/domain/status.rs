use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workflow category of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCategory {
    New,
    InProgress,
    Done,
}

/// Per-project presentation and board placement of one status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLabel {
    pub name: String,
    pub css_class: String,
    pub category: StatusCategory,
    /// Whether the status gets its own kanban column.
    pub kanban_col: bool,
    pub sort_key: i32,
}

impl StatusLabel {
    pub fn new(
        name: &str,
        css_class: &str,
        category: StatusCategory,
        kanban_col: bool,
        sort_key: i32,
    ) -> Self {
        Self {
            name: name.to_string(),
            css_class: css_class.to_string(),
            category,
            kanban_col,
            sort_key,
        }
    }
}

/// Status code → label mapping for one project.
///
/// Projects without a stored configuration fall back to the default seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRegistry {
    labels: BTreeMap<i32, StatusLabel>,
}

impl StatusRegistry {
    pub fn new(labels: BTreeMap<i32, StatusLabel>) -> Self {
        Self { labels }
    }

    pub fn get(&self, code: i32) -> Option<&StatusLabel> {
        self.labels.get(&code)
    }

    pub fn contains(&self, code: i32) -> bool {
        self.labels.contains_key(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i32, &StatusLabel)> {
        self.labels.iter()
    }

    /// Category of a code; codes removed from the configuration after
    /// being assigned to tickets resolve to `None`.
    pub fn category_of(&self, code: i32) -> Option<StatusCategory> {
        self.labels.get(&code).map(|label| label.category)
    }

    /// The statuses shown as kanban columns, ordered by their sort key.
    pub fn kanban_columns(&self) -> Vec<(i32, &StatusLabel)> {
        let mut columns: Vec<(i32, &StatusLabel)> = self
            .labels
            .iter()
            .filter(|(_, label)| label.kanban_col)
            .map(|(code, label)| (*code, label))
            .collect();
        columns.sort_by_key(|(_, label)| label.sort_key);
        columns
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            3,
            StatusLabel::new("New", "label-info", StatusCategory::New, true, 1),
        );
        labels.insert(
            1,
            StatusLabel::new(
                "Blocked",
                "label-important",
                StatusCategory::InProgress,
                true,
                2,
            ),
        );
        labels.insert(
            4,
            StatusLabel::new(
                "In Progress",
                "label-warning",
                StatusCategory::InProgress,
                true,
                3,
            ),
        );
        labels.insert(
            2,
            StatusLabel::new(
                "Waiting for Approval",
                "label-warning",
                StatusCategory::InProgress,
                true,
                4,
            ),
        );
        labels.insert(
            0,
            StatusLabel::new("Done", "label-success", StatusCategory::Done, true, 5),
        );
        labels.insert(
            -1,
            StatusLabel::new("Archived", "label-default", StatusCategory::Done, false, 6),
        );
        Self { labels }
    }
}

/// Display label for a priority code.
pub fn priority_label(code: &str) -> Option<&'static str> {
    match code {
        "1" => Some("Critical"),
        "2" => Some("High"),
        "3" => Some("Medium"),
        "4" => Some("Low"),
        "5" => Some("Lowest"),
        _ => None,
    }
}

/// Display label for an effort/storypoints key.
pub fn effort_label(key: &str) -> Option<&'static str> {
    match key {
        "0.5" => Some("< 2min"),
        "1" => Some("XS"),
        "2" => Some("S"),
        "3" => Some("M"),
        "5" => Some("L"),
        "8" => Some("XL"),
        "13" => Some("XXL"),
        _ => None,
    }
}

/// Icon class for a ticket type.
pub fn type_icon(ticket_type: &str) -> &'static str {
    match ticket_type {
        "task" => "fa-check-square",
        "subtask" => "fa-diagram-successor",
        "story" => "fa-book",
        "bug" => "fa-bug",
        "milestone" => "fa-map-signs",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_seed_codes() {
        let registry = StatusRegistry::default();
        assert_eq!(registry.get(3).unwrap().name, "New");
        assert_eq!(registry.get(0).unwrap().name, "Done");
        assert_eq!(registry.category_of(4), Some(StatusCategory::InProgress));
        assert_eq!(registry.category_of(99), None);
    }

    #[test]
    fn test_kanban_columns_hide_archived_and_follow_sort_key() {
        let registry = StatusRegistry::default();
        let columns = registry.kanban_columns();

        let codes: Vec<i32> = columns.iter().map(|(code, _)| *code).collect();
        assert_eq!(codes, vec![3, 1, 4, 2, 0]);
        assert!(!codes.contains(&-1));
    }

    #[test]
    fn test_priority_labels() {
        assert_eq!(priority_label("1"), Some("Critical"));
        assert_eq!(priority_label(""), None);
        assert_eq!(priority_label("9"), None);
    }

    #[test]
    fn test_effort_labels() {
        assert_eq!(effort_label("0.5"), Some("< 2min"));
        assert_eq!(effort_label("13"), Some("XXL"));
        assert_eq!(effort_label("4"), None);
    }

    #[test]
    fn test_type_icons() {
        assert_eq!(type_icon("milestone"), "fa-map-signs");
        assert_eq!(type_icon("unknown"), "");
    }
}
