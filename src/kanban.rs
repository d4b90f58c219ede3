//! Kanban drag-and-drop reordering.
//!
//! The board submits one serialized list per status column in display
//! order, plus an optional reference to the single ticket the user
//! actually dragged. The wire strings are parsed into typed column
//! orders at the boundary and not carried further.

use crate::{
    context::RequestContext,
    error::{Result, TasklineError},
    notify::{Notification, NotificationDispatcher},
    storage::{ProjectDirectory, TicketStore},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Offset of the id in a `ticket[]=<id>` payload entry.
const TICKET_ENTRY_PREFIX: usize = 9;
/// Offset of the id in a `ticket_<id>` handler reference.
const HANDLER_PREFIX: usize = 7;

/// Per-status-column display order parsed from the drag payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    pub status: i32,
    pub ticket_ids: Vec<i64>,
}

fn parse_entry(entry: &str) -> Result<i64> {
    entry
        .get(TICKET_ENTRY_PREFIX..)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| TasklineError::InvalidReference(entry.to_string()))
}

/// Parses the column → payload map. Non-numeric keys and empty payloads
/// are skipped; columns come back in ascending status order.
pub fn parse_board_payload(payload: &BTreeMap<String, String>) -> Result<Vec<ColumnOrder>> {
    let mut columns = Vec::new();

    for (key, ticket_list) in payload {
        let Ok(status) = key.parse::<i32>() else {
            continue;
        };
        if ticket_list.is_empty() {
            continue;
        }

        let ticket_ids = ticket_list
            .split('&')
            .map(parse_entry)
            .collect::<Result<Vec<i64>>>()?;

        columns.push(ColumnOrder { status, ticket_ids });
    }

    columns.sort_by_key(|column| column.status);
    Ok(columns)
}

/// Parses a `ticket_<id>` handler reference.
pub fn parse_handler(handler: &str) -> Result<i64> {
    handler
        .get(HANDLER_PREFIX..)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| TasklineError::InvalidReference(handler.to_string()))
}

pub struct KanbanReorderer<S, P, N> {
    store: Arc<S>,
    projects: Arc<P>,
    notifier: Arc<N>,
    base_url: String,
}

impl<S, P, N> KanbanReorderer<S, P, N>
where
    S: TicketStore,
    P: ProjectDirectory,
    N: NotificationDispatcher,
{
    pub fn new(store: Arc<S>, projects: Arc<P>, notifier: Arc<N>, base_url: &str) -> Self {
        Self {
            store,
            projects,
            notifier,
            base_url: base_url.to_string(),
        }
    }

    /// Applies a full board reorder: every ticket of every submitted
    /// column gets its status and a rank of position × 100.
    ///
    /// Updates are per ticket and not transactional. The first failing
    /// update aborts the whole reorder; already-updated tickets keep
    /// their new status and rank.
    pub async fn apply(
        &self,
        payload: &BTreeMap<String, String>,
        handler: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<()> {
        let columns = parse_board_payload(payload)?;

        for column in &columns {
            for (position, &ticket_id) in column.ticket_ids.iter().enumerate() {
                let rank = (position as i64) * 100;
                if let Err(error) = self
                    .store
                    .update_status_and_rank(ticket_id, column.status, rank)
                    .await
                {
                    warn!(
                        ticket_id,
                        status = column.status,
                        "kanban reorder aborted: {}",
                        error
                    );
                    return Err(error);
                }
            }
        }

        debug!(columns = columns.len(), "kanban reorder applied");

        // One notification for the dragged ticket only, never for every
        // moved ticket.
        if let Some(handler) = handler {
            let ticket_id = parse_handler(handler)?;

            if let Some(ticket) = self.store.ticket(ticket_id).await? {
                let allowed = self
                    .projects
                    .is_user_assigned(ctx.user_id, ticket.project_id)
                    .await?;
                if allowed {
                    let notification =
                        Notification::ticket_updated(&self.base_url, &ticket, ctx);
                    self.notifier.notify_project_users(&notification).await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::ticket::Ticket,
        storage::memory::{MemoryProjectDirectory, MemoryTicketStore},
        testutil::{self, RecordingDispatcher},
    };

    fn ticket(headline: &str) -> Ticket {
        testutil::ticket(headline, 1)
    }

    fn ctx() -> RequestContext {
        RequestContext::new(5, "Lena", 1, 0)
    }

    async fn fixture() -> (
        Arc<MemoryTicketStore>,
        Arc<MemoryProjectDirectory>,
        Arc<RecordingDispatcher>,
        KanbanReorderer<MemoryTicketStore, MemoryProjectDirectory, RecordingDispatcher>,
    ) {
        let store = Arc::new(MemoryTicketStore::new());
        let projects = Arc::new(MemoryProjectDirectory::new());
        projects.assign(5, 1).await;
        let notifier = Arc::new(RecordingDispatcher::default());
        let reorderer = KanbanReorderer::new(
            Arc::clone(&store),
            Arc::clone(&projects),
            Arc::clone(&notifier),
            "https://taskline.test",
        );
        (store, projects, notifier, reorderer)
    }

    #[test]
    fn test_parse_board_payload() {
        let mut payload = BTreeMap::new();
        payload.insert("2".to_string(), "ticket[]=10&ticket[]=11".to_string());
        payload.insert("3".to_string(), "ticket[]=20".to_string());
        payload.insert("handlerish".to_string(), "ticket[]=99".to_string());
        payload.insert("4".to_string(), String::new());

        let columns = parse_board_payload(&payload).unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnOrder {
                    status: 2,
                    ticket_ids: vec![10, 11]
                },
                ColumnOrder {
                    status: 3,
                    ticket_ids: vec![20]
                },
            ]
        );
    }

    #[test]
    fn test_parse_board_payload_rejects_malformed_entry() {
        let mut payload = BTreeMap::new();
        payload.insert("2".to_string(), "ticket[]=abc".to_string());
        assert!(parse_board_payload(&payload).is_err());
    }

    #[test]
    fn test_parse_handler() {
        assert_eq!(parse_handler("ticket_42").unwrap(), 42);
        assert!(parse_handler("42").is_err());
    }

    #[tokio::test]
    async fn test_apply_assigns_ranks_in_hundreds() {
        let (store, _, notifier, reorderer) = fixture().await;
        let a = store.seed(ticket("A")).await;
        let b = store.seed(ticket("B")).await;
        let c = store.seed(ticket("C")).await;

        let mut payload = BTreeMap::new();
        payload.insert("2".to_string(), format!("ticket[]={}&ticket[]={}", a, b));
        payload.insert("3".to_string(), format!("ticket[]={}", c));

        reorderer.apply(&payload, None, &ctx()).await.unwrap();

        let a = store.ticket(a).await.unwrap().unwrap();
        assert_eq!((a.status, a.kanban_rank), (2, 0));
        let b = store.ticket(b).await.unwrap().unwrap();
        assert_eq!((b.status, b.kanban_rank), (2, 100));
        let c = store.ticket(c).await.unwrap().unwrap();
        assert_eq!((c.status, c.kanban_rank), (3, 0));

        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_apply_aborts_without_rollback() {
        let (store, _, _, reorderer) = fixture().await;
        let a = store.seed(ticket("A")).await;
        let b = store.seed(ticket("B")).await;
        let c = store.seed(ticket("C")).await;
        store.fail_rank_update_for(b).await;

        let mut payload = BTreeMap::new();
        payload.insert("2".to_string(), format!("ticket[]={}&ticket[]={}", a, b));
        payload.insert("4".to_string(), format!("ticket[]={}", c));

        assert!(reorderer.apply(&payload, None, &ctx()).await.is_err());

        // The first ticket's update stays applied; the later column was
        // never attempted.
        let a = store.ticket(a).await.unwrap().unwrap();
        assert_eq!((a.status, a.kanban_rank), (2, 0));
        let c = store.ticket(c).await.unwrap().unwrap();
        assert_eq!(c.status, 3);
    }

    #[tokio::test]
    async fn test_handler_gets_exactly_one_notification() {
        let (store, _, notifier, reorderer) = fixture().await;
        let a = store.seed(ticket("A")).await;
        let b = store.seed(ticket("B")).await;

        let mut payload = BTreeMap::new();
        payload.insert("2".to_string(), format!("ticket[]={}&ticket[]={}", a, b));

        reorderer
            .apply(&payload, Some(&format!("ticket_{}", b)), &ctx())
            .await
            .unwrap();

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload.id, b);
    }

    #[tokio::test]
    async fn test_handler_outside_own_projects_is_silent() {
        let (store, _, notifier, reorderer) = fixture().await;
        let mut foreign = ticket("Foreign");
        foreign.project_id = 99;
        let id = store.seed(foreign).await;

        let mut payload = BTreeMap::new();
        payload.insert("2".to_string(), format!("ticket[]={}", id));

        reorderer
            .apply(&payload, Some(&format!("ticket_{}", id)), &ctx())
            .await
            .unwrap();

        assert!(notifier.sent.lock().await.is_empty());
    }
}
