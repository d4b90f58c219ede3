use crate::{
    domain::{
        criteria::SearchCriteria,
        status::StatusRegistry,
        ticket::{Ticket, TicketPatch},
    },
    error::Result,
};
use async_trait::async_trait;

pub mod memory;

/// Persistence boundary for tickets.
///
/// The engine never executes SQL itself; everything it needs from the
/// database goes through this trait. Criteria filtering and ordering are
/// the store's responsibility, the engine does not re-sort results.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Loads a single ticket with its denormalized display fields.
    async fn ticket(&self, id: i64) -> Result<Option<Ticket>>;

    /// Tickets matching the criteria, ordered by `order_by` and the
    /// criteria's direction. Milestones are excluded unless explicitly
    /// filtered for.
    async fn tickets_by_criteria(
        &self,
        criteria: &SearchCriteria,
        order_by: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Ticket>>;

    /// Status label configuration for a project, the default seed when
    /// the project has none.
    async fn status_labels(&self, project_id: Option<i64>) -> Result<StatusRegistry>;

    /// Milestones matching the criteria's project/client scope.
    async fn milestones(&self, criteria: &SearchCriteria, sort_by: &str) -> Result<Vec<Ticket>>;

    /// Subtasks of a parent ticket.
    async fn subtasks(&self, ticket_id: i64) -> Result<Vec<Ticket>>;

    /// Inserts a ticket, ignoring its `id`, and returns the assigned id.
    async fn add_ticket(&self, ticket: &Ticket) -> Result<i64>;

    /// Replaces all fields of an existing ticket.
    async fn update_ticket(&self, ticket: &Ticket, id: i64) -> Result<()>;

    /// Merges only the supplied fields into an existing ticket.
    async fn patch_ticket(&self, id: i64, patch: &TicketPatch) -> Result<()>;

    async fn delete_ticket(&self, id: i64) -> Result<()>;

    /// Dedicated milestone removal. Children keep their milestone
    /// reference; consumers must tolerate the dangling id.
    async fn delete_milestone(&self, id: i64) -> Result<()>;

    /// Moves one ticket to a status column at the given kanban rank.
    async fn update_status_and_rank(&self, id: i64, status: i32, rank: i64) -> Result<()>;
}

/// Project membership lookup, the only authorization capability the
/// engine consumes.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn is_user_assigned(&self, user_id: i64, project_id: i64) -> Result<bool>;
}
