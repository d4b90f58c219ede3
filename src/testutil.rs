//! Shared fixtures for the unit tests.

use crate::{
    domain::ticket::{Ticket, TicketType},
    error::Result,
    notify::{Notification, NotificationDispatcher},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

pub(crate) fn ticket(headline: &str, project_id: i64) -> Ticket {
    Ticket {
        id: 0,
        headline: headline.to_string(),
        description: String::new(),
        ticket_type: TicketType::Task,
        project_id,
        author_id: 1,
        editor_id: None,
        status: 3,
        priority: None,
        storypoints: None,
        plan_hours: 0.0,
        hour_remaining: 0.0,
        sprint_id: None,
        milestone_id: None,
        depending_ticket_id: None,
        tags: String::new(),
        sort_index: 0,
        kanban_rank: 0,
        created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
        date_to_finish: None,
        edit_from: None,
        edit_to: None,
        milestone_headline: String::new(),
        editor_firstname: String::new(),
        editor_lastname: String::new(),
        sprint_name: String::new(),
    }
}

/// Dispatcher double that records every notification it receives.
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify_project_users(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
