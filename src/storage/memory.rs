//! In-memory store backend.
//!
//! Implements the full criteria/ordering contract of [`TicketStore`] over
//! a map of tickets. Used as the bundled backend for tests and embedders
//! that do not bring their own database.

use crate::{
    domain::{
        criteria::SearchCriteria,
        status::{StatusCategory, StatusRegistry},
        ticket::{Ticket, TicketPatch, TicketType},
    },
    error::{Result, TasklineError},
    storage::{ProjectDirectory, TicketStore},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    tickets: BTreeMap<i64, Ticket>,
    next_id: i64,
    project_labels: HashMap<i64, StatusRegistry>,
    users: HashMap<i64, (String, String)>,
    sprints: HashMap<i64, String>,
    fail_rank_update_for: Option<i64>,
    fail_patch_for: Option<i64>,
}

pub struct MemoryTicketStore {
    inner: Mutex<Inner>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Seeds a ticket and returns its assigned id.
    pub async fn seed(&self, mut ticket: Ticket) -> i64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        ticket.id = id;
        inner.tickets.insert(id, ticket);
        id
    }

    pub async fn seed_user(&self, id: i64, firstname: &str, lastname: &str) {
        let mut inner = self.inner.lock().await;
        inner
            .users
            .insert(id, (firstname.to_string(), lastname.to_string()));
    }

    pub async fn seed_sprint(&self, id: i64, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.sprints.insert(id, name.to_string());
    }

    pub async fn set_status_labels(&self, project_id: i64, registry: StatusRegistry) {
        let mut inner = self.inner.lock().await;
        inner.project_labels.insert(project_id, registry);
    }

    /// Makes the next `update_status_and_rank` calls for this id fail,
    /// for exercising mid-batch failure behavior.
    pub async fn fail_rank_update_for(&self, id: i64) {
        self.inner.lock().await.fail_rank_update_for = Some(id);
    }

    pub async fn fail_patch_for(&self, id: i64) {
        self.inner.lock().await.fail_patch_for = Some(id);
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.tickets.len()
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn registry_for(&self, project_id: i64) -> StatusRegistry {
        self.project_labels
            .get(&project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Clones a ticket with its joined display fields filled in.
    fn hydrate(&self, ticket: &Ticket) -> Ticket {
        let mut row = ticket.clone();

        if let Some(milestone_id) = row.milestone_id {
            if let Some(milestone) = self.tickets.get(&milestone_id) {
                row.milestone_headline = milestone.headline.clone();
            }
        }
        if let Some(editor_id) = row.editor_id {
            if let Some((first, last)) = self.users.get(&editor_id) {
                row.editor_firstname = first.clone();
                row.editor_lastname = last.clone();
            }
        }
        if let Some(sprint_id) = row.sprint_id {
            if let Some(name) = self.sprints.get(&sprint_id) {
                row.sprint_name = name.clone();
            }
        }

        row
    }

    fn matches(&self, ticket: &Ticket, criteria: &SearchCriteria) -> bool {
        if !criteria.current_project.is_empty() {
            match criteria.current_project.parse::<i64>() {
                Ok(project_id) if ticket.project_id == project_id => {}
                _ => return false,
            }
        }

        if !criteria.users.is_empty() {
            match criteria.users.parse::<i64>() {
                Ok(user_id) if ticket.editor_id == Some(user_id) => {}
                _ => return false,
            }
        }

        match criteria.status.as_str() {
            "" | "all" => {}
            "not_done" => {
                let registry = self.registry_for(ticket.project_id);
                if registry.category_of(ticket.status) == Some(StatusCategory::Done) {
                    return false;
                }
            }
            code => match code.parse::<i32>() {
                Ok(status) if ticket.status == status => {}
                _ => return false,
            },
        }

        if !criteria.term.is_empty() {
            let term = criteria.term.to_lowercase();
            let hit = ticket.headline.to_lowercase().contains(&term)
                || ticket.description.to_lowercase().contains(&term)
                || ticket.tags.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }

        if !criteria.effort.is_empty()
            && ticket.field_text("storypoints").as_deref() != Some(criteria.effort.as_str())
        {
            return false;
        }

        if criteria.ticket_type.is_empty() {
            // Milestones have their own listing and are not ticket rows.
            if ticket.ticket_type == TicketType::Milestone {
                return false;
            }
        } else if ticket.ticket_type.to_string() != criteria.ticket_type.to_lowercase() {
            return false;
        }

        if !criteria.milestone.is_empty() {
            match criteria.milestone.parse::<i64>() {
                Ok(milestone_id) if ticket.milestone_id == Some(milestone_id) => {}
                _ => return false,
            }
        }

        if !criteria.priority.is_empty() {
            match criteria.priority.parse::<u8>() {
                Ok(priority) if ticket.priority == Some(priority) => {}
                _ => return false,
            }
        }

        if !criteria.sprint.is_empty() && criteria.sprint != "all" {
            match criteria.sprint.parse::<i64>() {
                Ok(sprint_id) if ticket.sprint_id == Some(sprint_id) => {}
                _ => return false,
            }
        }

        true
    }
}

fn sort_rows(rows: &mut [Ticket], order_by: &str, direction: &str) {
    rows.sort_by(|a, b| {
        let ordering = match order_by {
            "date" => a.created_at.cmp(&b.created_at),
            "duedate" => match (a.date_to_finish, b.date_to_finish) {
                (Some(a_date), Some(b_date)) => a_date.cmp(&b_date),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            },
            "kanbansort" => a.kanban_rank.cmp(&b.kanban_rank),
            _ => a.sort_index.cmp(&b.sort_index),
        };

        if direction.eq_ignore_ascii_case("desc") {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let inner = self.inner.lock().await;
        Ok(inner.tickets.get(&id).map(|t| inner.hydrate(t)))
    }

    async fn tickets_by_criteria(
        &self,
        criteria: &SearchCriteria,
        order_by: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Ticket>> {
        let inner = self.inner.lock().await;

        let mut rows: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| inner.matches(t, criteria))
            .map(|t| inner.hydrate(t))
            .collect();

        sort_rows(&mut rows, order_by, &criteria.order_direction);

        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn status_labels(&self, project_id: Option<i64>) -> Result<StatusRegistry> {
        let inner = self.inner.lock().await;
        Ok(project_id
            .and_then(|id| inner.project_labels.get(&id).cloned())
            .unwrap_or_default())
    }

    async fn milestones(&self, criteria: &SearchCriteria, sort_by: &str) -> Result<Vec<Ticket>> {
        let inner = self.inner.lock().await;

        let project_filter = criteria.current_project.parse::<i64>().ok();

        let mut rows: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.ticket_type == TicketType::Milestone)
            .filter(|t| project_filter.map(|p| t.project_id == p).unwrap_or(true))
            .map(|t| inner.hydrate(t))
            .collect();

        sort_rows(&mut rows, sort_by, "ASC");

        Ok(rows)
    }

    async fn subtasks(&self, ticket_id: i64) -> Result<Vec<Ticket>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .values()
            .filter(|t| t.depending_ticket_id == Some(ticket_id))
            .map(|t| inner.hydrate(t))
            .collect())
    }

    async fn add_ticket(&self, ticket: &Ticket) -> Result<i64> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let mut stored = ticket.clone();
        stored.id = id;
        inner.tickets.insert(id, stored);

        Ok(id)
    }

    async fn update_ticket(&self, ticket: &Ticket, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.tickets.contains_key(&id) {
            return Err(TasklineError::TicketNotFound(id));
        }

        let mut stored = ticket.clone();
        stored.id = id;
        inner.tickets.insert(id, stored);

        Ok(())
    }

    async fn patch_ticket(&self, id: i64, patch: &TicketPatch) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.fail_patch_for == Some(id) {
            return Err(TasklineError::StorageError(format!(
                "injected patch failure for ticket {}",
                id
            )));
        }

        let ticket = inner
            .tickets
            .get_mut(&id)
            .ok_or(TasklineError::TicketNotFound(id))?;

        if let Some(headline) = &patch.headline {
            ticket.headline = headline.clone();
        }
        if let Some(description) = &patch.description {
            ticket.description = description.clone();
        }
        if let Some(project_id) = patch.project_id {
            ticket.project_id = project_id;
        }
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(sort_index) = patch.sort_index {
            ticket.sort_index = sort_index;
        }
        if let Some(kanban_rank) = patch.kanban_rank {
            ticket.kanban_rank = kanban_rank;
        }
        if let Some(sprint_id) = patch.sprint_id {
            ticket.sprint_id = sprint_id;
        }
        if let Some(milestone_id) = patch.milestone_id {
            ticket.milestone_id = milestone_id;
        }
        if let Some(depending_ticket_id) = patch.depending_ticket_id {
            ticket.depending_ticket_id = depending_ticket_id;
        }

        Ok(())
    }

    async fn delete_ticket(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .tickets
            .remove(&id)
            .map(|_| ())
            .ok_or(TasklineError::TicketNotFound(id))
    }

    async fn delete_milestone(&self, id: i64) -> Result<()> {
        // Children keep their (now dangling) milestone reference.
        self.delete_ticket(id).await
    }

    async fn update_status_and_rank(&self, id: i64, status: i32, rank: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.fail_rank_update_for == Some(id) {
            return Err(TasklineError::StorageError(format!(
                "injected rank update failure for ticket {}",
                id
            )));
        }

        let ticket = inner
            .tickets
            .get_mut(&id)
            .ok_or(TasklineError::TicketNotFound(id))?;
        ticket.status = status;
        ticket.kanban_rank = rank;

        Ok(())
    }
}

/// Membership directory backed by a set of (user, project) pairs.
#[derive(Default)]
pub struct MemoryProjectDirectory {
    assignments: Mutex<HashSet<(i64, i64)>>,
}

impl MemoryProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, user_id: i64, project_id: i64) {
        self.assignments.lock().await.insert((user_id, project_id));
    }
}

#[async_trait]
impl ProjectDirectory for MemoryProjectDirectory {
    async fn is_user_assigned(&self, user_id: i64, project_id: i64) -> Result<bool> {
        Ok(self
            .assignments
            .lock()
            .await
            .contains(&(user_id, project_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::ticket::TicketType, testutil::ticket};
    use chrono::NaiveDate;

    fn project_criteria(project_id: i64) -> SearchCriteria {
        SearchCriteria {
            current_project: project_id.to_string(),
            ..SearchCriteria::default()
        }
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids() {
        let store = MemoryTicketStore::new();
        let first = store.add_ticket(&ticket("A", 1)).await.unwrap();
        let second = store.add_ticket(&ticket("B", 1)).await.unwrap();
        assert_eq!(second, first + 1);
    }

    #[tokio::test]
    async fn test_criteria_filters_project_and_term() {
        let store = MemoryTicketStore::new();
        store.seed(ticket("Fix login flow", 1)).await;
        store.seed(ticket("Login page styles", 2)).await;
        store.seed(ticket("Unrelated", 1)).await;

        let mut criteria = project_criteria(1);
        criteria.term = "login".to_string();

        let rows = store
            .tickets_by_criteria(&criteria, "sortIndex", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].headline, "Fix login flow");
    }

    #[tokio::test]
    async fn test_not_done_status_uses_project_categories() {
        let store = MemoryTicketStore::new();
        let mut done = ticket("Shipped", 1);
        done.status = 0;
        store.seed(done).await;
        store.seed(ticket("Pending", 1)).await;

        let mut criteria = project_criteria(1);
        criteria.status = "not_done".to_string();

        let rows = store
            .tickets_by_criteria(&criteria, "sortIndex", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].headline, "Pending");
    }

    #[tokio::test]
    async fn test_milestones_excluded_from_ticket_rows() {
        let store = MemoryTicketStore::new();
        let mut milestone = ticket("Release 1.0", 1);
        milestone.ticket_type = TicketType::Milestone;
        store.seed(milestone).await;
        store.seed(ticket("Task", 1)).await;

        let rows = store
            .tickets_by_criteria(&project_criteria(1), "sortIndex", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].headline, "Task");

        let milestones = store
            .milestones(&project_criteria(1), "duedate")
            .await
            .unwrap();
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].headline, "Release 1.0");
    }

    #[tokio::test]
    async fn test_order_by_duedate_sorts_unset_last() {
        let store = MemoryTicketStore::new();
        let mut due_late = ticket("Late", 1);
        due_late.date_to_finish = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        let mut due_soon = ticket("Soon", 1);
        due_soon.date_to_finish = NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        store.seed(ticket("No due date", 1)).await;
        store.seed(due_late).await;
        store.seed(due_soon).await;

        let mut criteria = project_criteria(1);
        criteria.order_direction = "ASC".to_string();

        let rows = store
            .tickets_by_criteria(&criteria, "duedate", None)
            .await
            .unwrap();
        let headlines: Vec<&str> = rows.iter().map(|t| t.headline.as_str()).collect();
        assert_eq!(headlines, vec!["Soon", "Late", "No due date"]);
    }

    #[tokio::test]
    async fn test_hydrate_fills_display_fields() {
        let store = MemoryTicketStore::new();
        store.seed_user(9, "Ada", "Lovelace").await;
        store.seed_sprint(4, "Sprint 4").await;

        let mut milestone = ticket("Release 1.0", 1);
        milestone.ticket_type = TicketType::Milestone;
        let milestone_id = store.seed(milestone).await;

        let mut task = ticket("Task", 1);
        task.milestone_id = Some(milestone_id);
        task.editor_id = Some(9);
        task.sprint_id = Some(4);
        let task_id = store.seed(task).await;

        let row = store.ticket(task_id).await.unwrap().unwrap();
        assert_eq!(row.milestone_headline, "Release 1.0");
        assert_eq!(row.editor_firstname, "Ada");
        assert_eq!(row.editor_lastname, "Lovelace");
        assert_eq!(row.sprint_name, "Sprint 4");
    }

    #[tokio::test]
    async fn test_patch_merges_and_clears() {
        let store = MemoryTicketStore::new();
        let mut task = ticket("Task", 1);
        task.sprint_id = Some(4);
        task.milestone_id = Some(2);
        let id = store.seed(task).await;

        let patch = TicketPatch {
            project_id: Some(7),
            sprint_id: Some(None),
            ..TicketPatch::default()
        };
        store.patch_ticket(id, &patch).await.unwrap();

        let row = store.ticket(id).await.unwrap().unwrap();
        assert_eq!(row.project_id, 7);
        assert_eq!(row.sprint_id, None);
        // Untouched fields survive the merge.
        assert_eq!(row.milestone_id, Some(2));
        assert_eq!(row.headline, "Task");
    }

    #[tokio::test]
    async fn test_update_missing_ticket_errors() {
        let store = MemoryTicketStore::new();
        let result = store.update_ticket(&ticket("Ghost", 1), 99).await;
        assert!(matches!(result, Err(TasklineError::TicketNotFound(99))));
    }

    #[tokio::test]
    async fn test_injected_rank_update_failure() {
        let store = MemoryTicketStore::new();
        let id = store.seed(ticket("Task", 1)).await;
        store.fail_rank_update_for(id).await;

        assert!(store.update_status_and_rank(id, 4, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_project_directory_membership() {
        let directory = MemoryProjectDirectory::new();
        directory.assign(5, 12).await;

        assert!(directory.is_user_assigned(5, 12).await.unwrap());
        assert!(!directory.is_user_assigned(5, 13).await.unwrap());
    }
}
