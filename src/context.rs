//! Per-request context.
//!
//! Every core operation takes an explicit, immutable [`RequestContext`]
//! instead of reading ambient session state. Where the system wants to
//! write session state back (the sticky sprint filter), the operation
//! returns a [`SessionUpdate`] instruction for the caller to apply.

use serde::{Deserialize, Serialize};

/// Snapshot of the acting user and their session scope for one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: i64,
    pub user_name: String,
    pub project_id: i64,
    pub client_id: i64,
    /// Sticky sprint filter carried across requests, empty when unset.
    #[serde(default)]
    pub sprint: String,
}

impl RequestContext {
    pub fn new(user_id: i64, user_name: &str, project_id: i64, client_id: i64) -> Self {
        Self {
            user_id,
            user_name: user_name.to_string(),
            project_id,
            client_id,
            sprint: String::new(),
        }
    }

    pub fn with_sprint(mut self, sprint: &str) -> Self {
        self.sprint = sprint.to_string();
        self
    }
}

/// Session mutation requested by a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Persist this sprint as the sticky filter for subsequent requests.
    StickySprint(String),
}

/// The board view a ticket URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Kanban,
    Table,
    List,
    Roadmap,
    Calendar,
}

/// Sticky per-view "last visited" URLs from the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionViews {
    #[serde(default)]
    pub last_view: Option<ViewKind>,
    #[serde(default)]
    pub kanban: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub list: String,
    #[serde(default)]
    pub roadmap: String,
    #[serde(default)]
    pub calendar: String,
}

impl SessionViews {
    fn filtered_url(&self, view: ViewKind) -> &str {
        match view {
            ViewKind::Kanban => &self.kanban,
            ViewKind::Table => &self.table,
            ViewKind::List => &self.list,
            ViewKind::Roadmap => &self.roadmap,
            ViewKind::Calendar => &self.calendar,
        }
    }

    /// URL to send a user back to their last ticket view. Falls back to
    /// the kanban board when no view was recorded or the recorded view
    /// has no saved filtered URL.
    pub fn last_view_url(&self, base_url: &str) -> String {
        let fallback = format!("{}/tickets/showKanban", base_url);

        match self.last_view {
            Some(view) => {
                let url = self.filtered_url(view);
                if url.is_empty() {
                    fallback
                } else {
                    url.to_string()
                }
            }
            None => fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_view_url_defaults_to_kanban() {
        let views = SessionViews::default();
        assert_eq!(
            views.last_view_url("https://example.test"),
            "https://example.test/tickets/showKanban"
        );
    }

    #[test]
    fn test_last_view_url_uses_saved_filtered_view() {
        let views = SessionViews {
            last_view: Some(ViewKind::Table),
            table: "https://example.test/tickets/showAll?status=4".to_string(),
            ..SessionViews::default()
        };
        assert_eq!(
            views.last_view_url("https://example.test"),
            "https://example.test/tickets/showAll?status=4"
        );
    }

    #[test]
    fn test_last_view_url_falls_back_when_view_has_no_url() {
        let views = SessionViews {
            last_view: Some(ViewKind::Roadmap),
            ..SessionViews::default()
        };
        assert_eq!(
            views.last_view_url("https://example.test"),
            "https://example.test/tickets/showKanban"
        );
    }
}
