//! Lifecycle notification composition.
//!
//! The engine composes a [`Notification`] for successful writes and hands
//! it to the [`NotificationDispatcher`]; delivery transport is outside
//! the core.

use crate::{context::RequestContext, domain::ticket::Ticket, error::Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub url: Link,
    pub payload: Ticket,
    pub module_name: String,
    pub project_id: i64,
    pub subject: String,
    pub author_id: i64,
    pub body: String,
}

fn ticket_link(base_url: &str, ticket_id: i64) -> String {
    format!("{}/dashboard/home#/tickets/showTicket/{}", base_url, ticket_id)
}

impl Notification {
    /// Notification for a freshly created ticket, addressed to the
    /// members of the context's current project.
    pub fn ticket_created(base_url: &str, ticket: &Ticket, ctx: &RequestContext) -> Self {
        Self {
            url: Link {
                href: ticket_link(base_url, ticket.id),
                label: "View To-Do".to_string(),
            },
            payload: ticket.clone(),
            module_name: "tickets".to_string(),
            project_id: ctx.project_id,
            subject: format!("A new to-do was created: #{} {}", ticket.id, ticket.headline),
            author_id: ctx.user_id,
            body: format!("{} created a new to-do: {}", ctx.user_name, ticket.headline),
        }
    }

    /// Notification for an updated ticket.
    pub fn ticket_updated(base_url: &str, ticket: &Ticket, ctx: &RequestContext) -> Self {
        Self {
            url: Link {
                href: ticket_link(base_url, ticket.id),
                label: "View To-Do".to_string(),
            },
            payload: ticket.clone(),
            module_name: "tickets".to_string(),
            project_id: ctx.project_id,
            subject: format!("A to-do was updated: #{} {}", ticket.id, ticket.headline),
            author_id: ctx.user_id,
            body: format!("{} updated the to-do: {}", ctx.user_name, ticket.headline),
        }
    }
}

/// Fan-out boundary: delivers a notification to all members of its
/// project.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_project_users(&self, notification: &Notification) -> Result<()>;
}
