//! Milestone and subtask relationship resolution.
//!
//! Milestones parent ordinary tickets through `milestone_id`; subtasks
//! parent through `depending_ticket_id`. A subtask mirrors its parent's
//! project and milestone at creation time and is not re-synchronized
//! afterward unless the parent itself moves.

use crate::{
    context::RequestContext,
    domain::{
        criteria::SearchCriteria,
        ticket::{SubtaskInput, Ticket, TicketType},
    },
    error::Result,
    storage::TicketStore,
};
use chrono::NaiveDateTime;
use std::sync::Arc;

pub struct MilestoneSubtaskLinker<S> {
    store: Arc<S>,
}

impl<S: TicketStore> MilestoneSubtaskLinker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every ticket whose milestone reference points at the given
    /// milestone, across all ticket types.
    pub async fn children_of_milestone(&self, milestone_id: i64) -> Result<Vec<Ticket>> {
        let criteria = SearchCriteria {
            milestone: milestone_id.to_string(),
            ..SearchCriteria::default()
        };
        self.store
            .tickets_by_criteria(&criteria, "sortIndex", None)
            .await
    }

    /// The parent of a subtask, `None` for tickets without a parent
    /// reference or with a dangling one.
    pub async fn parent_of(&self, ticket: &Ticket) -> Result<Option<Ticket>> {
        match ticket.depending_ticket_id {
            Some(parent_id) => self.store.ticket(parent_id).await,
            None => Ok(None),
        }
    }

    pub async fn subtasks_of(&self, ticket_id: i64) -> Result<Vec<Ticket>> {
        self.store.subtasks(ticket_id).await
    }
}

/// Builds the stored record for a subtask. Project, milestone, and the
/// parent reference always come from the parent ticket, never from the
/// input.
pub fn subtask_record(
    input: &SubtaskInput,
    parent: &Ticket,
    ctx: &RequestContext,
    now: NaiveDateTime,
) -> Ticket {
    Ticket {
        id: input.subtask_id.unwrap_or(0),
        headline: input.headline.clone(),
        description: input.description.clone(),
        ticket_type: TicketType::Subtask,
        project_id: parent.project_id,
        author_id: ctx.user_id,
        editor_id: Some(ctx.user_id),
        status: input.status,
        priority: input.priority,
        storypoints: None,
        plan_hours: input.plan_hours,
        hour_remaining: input.hour_remaining,
        sprint_id: None,
        milestone_id: parent.milestone_id,
        depending_ticket_id: Some(parent.id),
        tags: String::new(),
        sort_index: 0,
        kanban_rank: 0,
        created_at: now,
        date_to_finish: None,
        edit_from: None,
        edit_to: None,
        milestone_headline: String::new(),
        editor_firstname: String::new(),
        editor_lastname: String::new(),
        sprint_name: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::memory::MemoryTicketStore, testutil};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_children_of_milestone() {
        let store = Arc::new(MemoryTicketStore::new());
        let mut milestone = testutil::ticket("Release", 1);
        milestone.ticket_type = TicketType::Milestone;
        let milestone_id = store.seed(milestone).await;

        for headline in ["A", "B"] {
            let mut child = testutil::ticket(headline, 1);
            child.milestone_id = Some(milestone_id);
            store.seed(child).await;
        }
        store.seed(testutil::ticket("Loose", 1)).await;

        let linker = MilestoneSubtaskLinker::new(store);
        let children = linker.children_of_milestone(milestone_id).await.unwrap();
        assert_eq!(children.len(), 2);
    }

    #[tokio::test]
    async fn test_parent_of_subtask() {
        let store = Arc::new(MemoryTicketStore::new());
        let parent_id = store.seed(testutil::ticket("Parent", 1)).await;
        let mut subtask = testutil::ticket("Child", 1);
        subtask.ticket_type = TicketType::Subtask;
        subtask.depending_ticket_id = Some(parent_id);
        let subtask_id = store.seed(subtask).await;

        let linker = MilestoneSubtaskLinker::new(Arc::clone(&store));
        let subtask = store.ticket(subtask_id).await.unwrap().unwrap();

        let parent = linker.parent_of(&subtask).await.unwrap().unwrap();
        assert_eq!(parent.id, parent_id);

        let orphan = testutil::ticket("Orphan", 1);
        assert!(linker.parent_of(&orphan).await.unwrap().is_none());
    }

    #[test]
    fn test_subtask_record_inherits_from_parent() {
        let mut parent = testutil::ticket("Parent", 7);
        parent.id = 31;
        parent.milestone_id = Some(12);
        parent.sprint_id = Some(4);

        let input = SubtaskInput {
            headline: "Step one".to_string(),
            status: 3,
            ..SubtaskInput::default()
        };
        let ctx = RequestContext::new(5, "Lena", 7, 0);

        let record = subtask_record(&input, &parent, &ctx, now());

        assert_eq!(record.ticket_type, TicketType::Subtask);
        assert_eq!(record.project_id, 7);
        assert_eq!(record.milestone_id, Some(12));
        assert_eq!(record.depending_ticket_id, Some(31));
        // The parent's sprint is not inherited.
        assert_eq!(record.sprint_id, None);
        assert_eq!(record.author_id, 5);
    }
}
