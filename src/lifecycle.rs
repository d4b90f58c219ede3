//! Ticket lifecycle operations.
//!
//! Create, full update, partial patch, cross-project move, delete, and
//! the authorized read. Create/update/delete check project membership of
//! the acting user; `patch` deliberately does not — it is the internal
//! write path for callers (sort persistence, move, drag reorder) that
//! have already authorized the surrounding operation.

use crate::{
    context::RequestContext,
    domain::{
        dates,
        ticket::{SubtaskInput, Ticket, TicketInput, TicketPatch, TicketView, TicketType},
    },
    error::{Result, TasklineError},
    notify::{Notification, NotificationDispatcher},
    relations::{self, MilestoneSubtaskLinker},
    storage::{ProjectDirectory, TicketStore},
};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub struct TicketLifecycleManager<S, P, N> {
    store: Arc<S>,
    projects: Arc<P>,
    notifier: Arc<N>,
    linker: MilestoneSubtaskLinker<S>,
    base_url: String,
}

impl<S, P, N> TicketLifecycleManager<S, P, N>
where
    S: TicketStore,
    P: ProjectDirectory,
    N: NotificationDispatcher,
{
    pub fn new(store: Arc<S>, projects: Arc<P>, notifier: Arc<N>, base_url: &str) -> Self {
        Self {
            linker: MilestoneSubtaskLinker::new(Arc::clone(&store)),
            store,
            projects,
            notifier,
            base_url: base_url.to_string(),
        }
    }

    async fn authorize(&self, ctx: &RequestContext, project_id: i64) -> Result<()> {
        if self
            .projects
            .is_user_assigned(ctx.user_id, project_id)
            .await?
        {
            Ok(())
        } else {
            Err(TasklineError::AccessDenied {
                user_id: ctx.user_id,
                project_id,
            })
        }
    }

    /// Normalizes the write payload into a stored record. Each date pair
    /// combines a raw date string with an optional time of day.
    fn build_record(
        input: &TicketInput,
        ctx: &RequestContext,
        project_id: i64,
        now: NaiveDateTime,
    ) -> Result<Ticket> {
        Ok(Ticket {
            id: 0,
            headline: input.headline.clone(),
            description: input.description.clone(),
            ticket_type: input.ticket_type,
            project_id,
            author_id: ctx.user_id,
            editor_id: input.editor_id,
            status: input.status,
            priority: input.priority,
            storypoints: input.storypoints,
            plan_hours: input.plan_hours,
            hour_remaining: input.hour_remaining,
            sprint_id: input.sprint_id,
            milestone_id: input.milestone_id,
            depending_ticket_id: input.depending_ticket_id,
            tags: input.tags.clone(),
            sort_index: 0,
            kanban_rank: 0,
            created_at: now,
            date_to_finish: dates::normalize(&input.date_to_finish, &input.time_to_finish)?,
            edit_from: dates::normalize(&input.edit_from, &input.time_from)?,
            edit_to: dates::normalize(&input.edit_to, &input.time_to)?,
            milestone_headline: String::new(),
            editor_firstname: String::new(),
            editor_lastname: String::new(),
            sprint_name: String::new(),
        })
    }

    /// Creates a ticket and notifies the project members. The acting
    /// user becomes the author; the target project defaults to the
    /// context's current project.
    pub async fn create(&self, input: &TicketInput, ctx: &RequestContext) -> Result<i64> {
        let project_id = input.project_id.unwrap_or(ctx.project_id);
        self.authorize(ctx, project_id).await?;

        if input.headline.is_empty() {
            return Err(TasklineError::MissingHeadline);
        }

        let mut record = Self::build_record(input, ctx, project_id, Utc::now().naive_utc())?;
        let id = self.store.add_ticket(&record).await?;
        record.id = id;

        debug!(ticket_id = id, project_id, "ticket created");

        let notification = Notification::ticket_created(&self.base_url, &record, ctx);
        self.notifier.notify_project_users(&notification).await?;

        Ok(id)
    }

    /// Replaces all fields of an existing ticket and notifies the
    /// project members. Authorship and manual ordering survive the
    /// replace.
    pub async fn update(&self, id: i64, input: &TicketInput, ctx: &RequestContext) -> Result<()> {
        let project_id = input.project_id.unwrap_or(ctx.project_id);
        self.authorize(ctx, project_id).await?;

        if input.headline.is_empty() {
            return Err(TasklineError::MissingHeadline);
        }

        let existing = self
            .store
            .ticket(id)
            .await?
            .ok_or(TasklineError::TicketNotFound(id))?;

        let mut record = Self::build_record(input, ctx, project_id, existing.created_at)?;
        record.id = id;
        record.author_id = existing.author_id;
        record.sort_index = existing.sort_index;
        record.kanban_rank = existing.kanban_rank;

        self.store.update_ticket(&record, id).await?;

        debug!(ticket_id = id, "ticket updated");

        let notification = Notification::ticket_updated(&self.base_url, &record, ctx);
        self.notifier.notify_project_users(&notification).await?;

        Ok(())
    }

    /// Merges the supplied fields into an existing ticket.
    ///
    /// No authorization check: internal-trust write path only.
    pub async fn patch(&self, id: i64, patch: &TicketPatch) -> Result<()> {
        self.store.patch_ticket(id, patch).await
    }

    /// Moves a ticket to another project. Moving a milestone relocates
    /// every child ticket first (project reassigned, sprint cleared);
    /// the moved ticket itself is additionally detached from its former
    /// parent and milestone. Returns `false` when the ticket does not
    /// exist or is not accessible to the acting user.
    pub async fn move_ticket(
        &self,
        id: i64,
        new_project_id: i64,
        ctx: &RequestContext,
    ) -> Result<bool> {
        let Some(view) = self.get(id, ctx).await? else {
            return Ok(false);
        };
        let ticket = view.ticket;

        if ticket.is_milestone() {
            let children = self.linker.children_of_milestone(ticket.id).await?;
            for child in children {
                self.patch(child.id, &TicketPatch::relocation(new_project_id))
                    .await?;
            }
        }

        self.patch(ticket.id, &TicketPatch::detaching_relocation(new_project_id))
            .await?;

        debug!(ticket_id = id, new_project_id, "ticket moved");

        Ok(true)
    }

    /// Deletes a ticket. Subtasks are not cascaded.
    pub async fn delete(&self, id: i64, ctx: &RequestContext) -> Result<()> {
        let ticket = self
            .store
            .ticket(id)
            .await?
            .ok_or(TasklineError::TicketNotFound(id))?;
        self.authorize(ctx, ticket.project_id).await?;

        self.store.delete_ticket(id).await?;
        debug!(ticket_id = id, "ticket deleted");
        Ok(())
    }

    /// Deletes a milestone. Child tickets keep their milestone
    /// reference; consumers must tolerate the dangling id.
    pub async fn delete_milestone(&self, id: i64, ctx: &RequestContext) -> Result<()> {
        let ticket = self
            .store
            .ticket(id)
            .await?
            .ok_or(TasklineError::TicketNotFound(id))?;
        self.authorize(ctx, ticket.project_id).await?;

        self.store.delete_milestone(id).await?;
        debug!(ticket_id = id, "milestone deleted");
        Ok(())
    }

    /// Creates or updates a subtask under a parent ticket. The subtask
    /// inherits the parent's project and milestone and references the
    /// parent; a missing subtask id creates, a supplied one updates.
    pub async fn upsert_subtask(
        &self,
        input: &SubtaskInput,
        parent: &Ticket,
        ctx: &RequestContext,
    ) -> Result<i64> {
        let record = relations::subtask_record(input, parent, ctx, Utc::now().naive_utc());

        match input.subtask_id {
            None => self.store.add_ticket(&record).await,
            Some(subtask_id) => {
                self.store.update_ticket(&record, subtask_id).await?;
                Ok(subtask_id)
            }
        }
    }

    /// The subtasks of a parent ticket.
    pub async fn subtasks(&self, ticket_id: i64) -> Result<Vec<Ticket>> {
        self.linker.subtasks_of(ticket_id).await
    }

    /// Authorized read. Returns `None` for tickets that do not exist or
    /// whose project the acting user is not assigned to; the two cases
    /// are indistinguishable to the caller. The stored date-times come
    /// back decomposed for the edit form.
    pub async fn get(&self, id: i64, ctx: &RequestContext) -> Result<Option<TicketView>> {
        let Some(ticket) = self.store.ticket(id).await? else {
            return Ok(None);
        };

        if !self
            .projects
            .is_user_assigned(ctx.user_id, ticket.project_id)
            .await?
        {
            return Ok(None);
        }

        let view = TicketView {
            date: dates::display_date(Some(ticket.created_at)),
            date_to_finish: dates::display_date(ticket.date_to_finish),
            time_to_finish: dates::extract_time(ticket.date_to_finish),
            edit_from: dates::display_date(ticket.edit_from),
            time_from: dates::extract_time(ticket.edit_from),
            edit_to: dates::display_date(ticket.edit_to),
            time_to: dates::extract_time(ticket.edit_to),
            ticket,
        };

        Ok(Some(view))
    }

    /// Persists a manual ordering: ticket id → sort index. Stops at the
    /// first failing patch.
    pub async fn update_sorting(&self, entries: &[(i64, i64)]) -> Result<()> {
        for &(id, sort_index) in entries {
            let patch = TicketPatch {
                sort_index: Some(sort_index),
                ..TicketPatch::default()
            };
            self.store.patch_ticket(id, &patch).await?;
        }
        Ok(())
    }

    /// Creates a plain task with defaults, for the quick-add form.
    pub async fn quick_add(
        &self,
        headline: &str,
        description: &str,
        ctx: &RequestContext,
    ) -> Result<i64> {
        let input = TicketInput {
            headline: headline.to_string(),
            description: description.to_string(),
            ticket_type: TicketType::Task,
            status: 3,
            editor_id: Some(ctx.user_id),
            ..TicketInput::default()
        };
        self.create(&input, ctx).await
    }

    /// Creates a milestone with its timeline range, for the quick-add
    /// form. Milestones do not trigger a member notification.
    pub async fn quick_add_milestone(
        &self,
        headline: &str,
        tags: &str,
        edit_from: &str,
        edit_to: &str,
        ctx: &RequestContext,
    ) -> Result<i64> {
        self.authorize(ctx, ctx.project_id).await?;

        if headline.is_empty() {
            return Err(TasklineError::MissingHeadline);
        }

        let input = TicketInput {
            headline: headline.to_string(),
            ticket_type: TicketType::Milestone,
            status: 3,
            priority: Some(3),
            editor_id: Some(ctx.user_id),
            tags: tags.to_string(),
            edit_from: edit_from.to_string(),
            edit_to: edit_to.to_string(),
            ..TicketInput::default()
        };
        let record =
            Self::build_record(&input, ctx, ctx.project_id, Utc::now().naive_utc())?;

        self.store.add_ticket(&record).await
    }
}
