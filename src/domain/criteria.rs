use crate::context::{RequestContext, SessionUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical, fully populated search criteria.
///
/// Flat string mapping; the empty string marks an unset scalar filter.
/// Key names follow the wire format the board views submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    #[serde(rename = "currentProject")]
    pub current_project: String,
    #[serde(rename = "currentUser")]
    pub current_user: String,
    #[serde(rename = "currentClient")]
    pub current_client: String,
    pub sprint: String,
    pub users: String,
    pub clients: String,
    pub status: String,
    pub term: String,
    pub effort: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub milestone: String,
    pub priority: String,
    #[serde(rename = "orderBy")]
    pub order_by: String,
    #[serde(rename = "orderDirection")]
    pub order_direction: String,
    #[serde(rename = "groupBy")]
    pub group_by: String,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            current_project: String::new(),
            current_user: String::new(),
            current_client: String::new(),
            sprint: String::new(),
            users: String::new(),
            clients: String::new(),
            status: String::new(),
            term: String::new(),
            effort: String::new(),
            ticket_type: String::new(),
            milestone: String::new(),
            priority: String::new(),
            order_by: "sortIndex".to_string(),
            order_direction: "DESC".to_string(),
            group_by: String::new(),
        }
    }
}

/// Raw, possibly partial filter input. Only keys that are present
/// override the contextual defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    #[serde(rename = "currentProject")]
    pub current_project: Option<String>,
    #[serde(rename = "currentUser")]
    pub current_user: Option<String>,
    pub sprint: Option<String>,
    pub users: Option<String>,
    pub clients: Option<String>,
    pub status: Option<String>,
    pub term: Option<String>,
    pub effort: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    pub milestone: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
    #[serde(rename = "orderDirection")]
    pub order_direction: Option<String>,
    #[serde(rename = "groupBy")]
    pub group_by: Option<String>,
}

impl SearchCriteria {
    /// Builds complete criteria from partial filter input, defaulting the
    /// session-scoped keys from the request context.
    ///
    /// Supplying `sprint` is sticky: the caller receives a
    /// [`SessionUpdate`] instructing it to persist the value.
    pub fn build(
        filter: &TicketFilter,
        ctx: &RequestContext,
    ) -> (Self, Option<SessionUpdate>) {
        let mut criteria = Self {
            current_project: ctx.project_id.to_string(),
            current_user: ctx.user_id.to_string(),
            current_client: ctx.client_id.to_string(),
            sprint: ctx.sprint.clone(),
            ..Self::default()
        };

        if let Some(value) = &filter.current_project {
            criteria.current_project = value.clone();
        }
        if let Some(value) = &filter.current_user {
            criteria.current_user = value.clone();
        }
        if let Some(value) = &filter.users {
            criteria.users = value.clone();
        }
        if let Some(value) = &filter.clients {
            criteria.clients = value.clone();
        }
        if let Some(value) = &filter.status {
            criteria.status = value.clone();
        }
        if let Some(value) = &filter.term {
            criteria.term = value.clone();
        }
        if let Some(value) = &filter.effort {
            criteria.effort = value.clone();
        }
        if let Some(value) = &filter.ticket_type {
            criteria.ticket_type = value.clone();
        }
        if let Some(value) = &filter.milestone {
            criteria.milestone = value.clone();
        }
        if let Some(value) = &filter.priority {
            criteria.priority = value.clone();
        }
        if let Some(value) = &filter.order_by {
            criteria.order_by = value.clone();
        }
        if let Some(value) = &filter.order_direction {
            criteria.order_direction = value.clone();
        }
        if let Some(value) = &filter.group_by {
            criteria.group_by = value.clone();
        }

        let session_update = filter.sprint.as_ref().map(|value| {
            criteria.sprint = value.clone();
            SessionUpdate::StickySprint(value.clone())
        });

        (criteria, session_update)
    }

    /// The scalar filter keys a user can actively set, with their values.
    /// Structural and session-scoped keys are not filters.
    fn scalar_filters(&self) -> [(&'static str, &str); 8] {
        [
            ("users", &self.users),
            ("clients", &self.clients),
            ("status", &self.status),
            ("term", &self.term),
            ("effort", &self.effort),
            ("type", &self.ticket_type),
            ("milestone", &self.milestone),
            ("priority", &self.priority),
        ]
    }

    /// Number of filters with a non-empty value. Grouping is not a filter
    /// for counting purposes.
    pub fn count_set_filters(&self) -> usize {
        self.scalar_filters()
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .count()
    }

    /// The active filters as key → value, for rebuilding a filter URL.
    /// `clients` is session-scoped in this variant and excluded;
    /// `include_group` additionally exposes a non-empty grouping.
    pub fn active_filters(&self, include_group: bool) -> BTreeMap<String, String> {
        let mut filters = BTreeMap::new();

        for (key, value) in self.scalar_filters() {
            if key != "clients" && !value.is_empty() {
                filters.insert(key.to_string(), value.to_string());
            }
        }

        if include_group && !self.group_by.is_empty() {
            filters.insert("groupBy".to_string(), self.group_by.clone());
        }

        filters
    }
}
