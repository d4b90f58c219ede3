//! Search and board-view grouping.
//!
//! Searches delegate ordering entirely to the store. Grouping buckets the
//! store-ordered rows, derives each bucket's display label from the first
//! ticket seen, and then applies the two group sort passes: an id pass for
//! status/priority/storypoints, followed in every case by a label pass.
//! The label pass always wins, so group ordering is observed as
//! alphabetical-by-label for every grouping field.

use crate::{
    domain::{
        criteria::SearchCriteria,
        status::{self, StatusCategory, StatusRegistry},
        ticket::Ticket,
    },
    error::Result,
    storage::TicketStore,
};
use chrono::{Days, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One display group of a grouped board view.
#[derive(Debug, Clone, Serialize)]
pub struct TicketGroup {
    pub id: String,
    pub label: String,
    pub css_class: String,
    pub items: Vec<Ticket>,
}

/// Due-date buckets for a user's open tickets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DueBuckets {
    pub this_week: Vec<Ticket>,
    pub later: Vec<Ticket>,
}

pub struct QueryEngine<S> {
    store: Arc<S>,
    base_url: String,
}

impl<S: TicketStore> QueryEngine<S> {
    pub fn new(store: Arc<S>, base_url: &str) -> Self {
        Self {
            store,
            base_url: base_url.to_string(),
        }
    }

    /// Tickets matching the criteria, in store order. The engine never
    /// re-sorts a search result.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Ticket>> {
        self.store
            .tickets_by_criteria(criteria, &criteria.order_by, None)
            .await
    }

    /// Tickets matching the criteria, grouped for a board view.
    pub async fn search_grouped(&self, criteria: &SearchCriteria) -> Result<Vec<TicketGroup>> {
        let tickets = self.search(criteria).await?;

        if criteria.group_by.is_empty() || criteria.group_by == "all" {
            return Ok(vec![TicketGroup {
                id: "all".to_string(),
                label: "all".to_string(),
                css_class: String::new(),
                items: tickets,
            }]);
        }

        let registry = if criteria.group_by == "status" {
            Some(
                self.store
                    .status_labels(criteria.current_project.parse().ok())
                    .await?,
            )
        } else {
            None
        };

        let mut groups: Vec<TicketGroup> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();

        for ticket in tickets {
            let Some(raw_value) = ticket.field_text(&criteria.group_by) else {
                continue;
            };
            let key = raw_value.to_lowercase();

            if let Some(&index) = index_by_key.get(&key) {
                groups[index].items.push(ticket);
                continue;
            }

            let (label, css_class) = self
                .group_label(&criteria.group_by, &key, &ticket, registry.as_ref())
                .await?;

            index_by_key.insert(key.clone(), groups.len());
            groups.push(TicketGroup {
                id: key,
                label,
                css_class,
                items: vec![ticket],
            });
        }

        // Two sort passes; the second runs unconditionally, so the id
        // pass never determines the final order.
        match criteria.group_by.as_str() {
            "status" | "priority" | "storypoints" => {
                groups.sort_by(|a, b| a.id.cmp(&b.id));
            }
            _ => {}
        }
        groups.sort_by(|a, b| a.label.cmp(&b.label));

        Ok(groups)
    }

    /// Display label and css class for a new bucket, derived from the
    /// first ticket seen for it.
    async fn group_label(
        &self,
        field: &str,
        key: &str,
        ticket: &Ticket,
        registry: Option<&StatusRegistry>,
    ) -> Result<(String, String)> {
        let derived = match field {
            "status" => {
                let code: Option<i32> = key.parse().ok();
                match code.and_then(|c| registry.and_then(|r| r.get(c))) {
                    Some(label) => (label.name.clone(), label.css_class.clone()),
                    None => (key.to_string(), String::new()),
                }
            }
            "priority" => match status::priority_label(key) {
                Some(label) => (label.to_string(), format!("priority-text-{}", key)),
                None => ("No Priority Set".to_string(), String::new()),
            },
            "storypoints" => (
                status::effort_label(key)
                    .unwrap_or("No Effort Set")
                    .to_string(),
                String::new(),
            ),
            "milestoneid" => match ticket.milestone_id {
                Some(milestone_id) if milestone_id > 0 => {
                    // The milestone's accent color lives in its tags field.
                    let color = self
                        .store
                        .ticket(milestone_id)
                        .await?
                        .map(|m| m.tags)
                        .unwrap_or_default();
                    let label = format!(
                        "{} <a href='#/tickets/editMilestone/{}' style='float:right;'><i class='fa fa-edit'></i></a>",
                        ticket.milestone_headline, milestone_id
                    );
                    (label, color)
                }
                _ => ("No Milestone Set".to_string(), String::new()),
            },
            "editorId" => {
                if ticket.editor_firstname.is_empty() && ticket.editor_lastname.is_empty() {
                    ("Not Assigned to Anyone".to_string(), String::new())
                } else {
                    let label = format!(
                        "<div class='profileImage'><img src='{}/api/users?profileImage={}' /></div> {} {}",
                        self.base_url,
                        key,
                        ticket.editor_firstname,
                        ticket.editor_lastname
                    );
                    (label, String::new())
                }
            }
            "sprint" => {
                if ticket.sprint_name.is_empty() {
                    ("Not assigned to a sprint".to_string(), String::new())
                } else {
                    (ticket.sprint_name.clone(), String::new())
                }
            }
            "type" => (
                format!(
                    "<i class='fa {}'></i>{}",
                    status::type_icon(key),
                    ticket.ticket_type
                ),
                String::new(),
            ),
            _ => (key.to_string(), String::new()),
        };

        Ok(derived)
    }

    /// Milestones for the criteria's project. Milestones are scoped to a
    /// project; without one there is nothing to list.
    pub async fn milestones(
        &self,
        criteria: &SearchCriteria,
        sort_by: &str,
    ) -> Result<Vec<Ticket>> {
        if criteria.current_project.parse::<i64>().unwrap_or(0) <= 0 {
            return Ok(Vec::new());
        }
        self.store.milestones(criteria, sort_by).await
    }

    /// The most recently created open tickets of a project.
    pub async fn latest(&self, project_id: i64, limit: usize) -> Result<Vec<Ticket>> {
        let criteria = SearchCriteria {
            current_project: project_id.to_string(),
            status: "not_done".to_string(),
            ..SearchCriteria::default()
        };
        self.store
            .tickets_by_criteria(&criteria, "date", Some(limit))
            .await
    }

    /// A user's open tickets split into due-this-week and later, ordered
    /// by due date. Tickets whose status category resolves to DONE are
    /// skipped unless `include_done`; tickets whose status code is no
    /// longer configured for their project are skipped entirely.
    pub async fn user_tickets_by_due(
        &self,
        user_id: i64,
        project_id: i64,
        include_done: bool,
        today: NaiveDate,
    ) -> Result<DueBuckets> {
        let criteria = SearchCriteria {
            current_project: project_id.to_string(),
            current_user: user_id.to_string(),
            users: user_id.to_string(),
            status: if include_done { "all" } else { "not_done" }.to_string(),
            order_direction: "ASC".to_string(),
            ..SearchCriteria::default()
        };
        let rows = self
            .store
            .tickets_by_criteria(&criteria, "duedate", None)
            .await?;

        // End of the work week: this week's Friday at midnight.
        let friday = today
            .week(Weekday::Mon)
            .first_day()
            .checked_add_days(Days::new(4))
            .unwrap_or(today);
        let cutoff = friday.and_time(NaiveTime::MIN);

        let mut registries: HashMap<i64, StatusRegistry> = HashMap::new();
        let mut buckets = DueBuckets::default();

        for ticket in rows {
            if !registries.contains_key(&ticket.project_id) {
                let registry = self.store.status_labels(Some(ticket.project_id)).await?;
                registries.insert(ticket.project_id, registry);
            }
            let registry = &registries[&ticket.project_id];

            // The status may have been removed after assignment.
            let Some(category) = registry.category_of(ticket.status) else {
                continue;
            };
            if category == StatusCategory::Done && !include_done {
                continue;
            }

            match ticket.date_to_finish {
                Some(due) if due <= cutoff => buckets.this_week.push(ticket),
                _ => buckets.later.push(ticket),
            }
        }

        Ok(buckets)
    }
}
