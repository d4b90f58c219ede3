use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kind of a ticket.
///
/// Milestones act as timeline parents for ordinary tickets; subtasks always
/// carry a parent reference in `depending_ticket_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Task,
    Story,
    Bug,
    Milestone,
    Subtask,
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Story => write!(f, "story"),
            Self::Bug => write!(f, "bug"),
            Self::Milestone => write!(f, "milestone"),
            Self::Subtask => write!(f, "subtask"),
        }
    }
}

impl FromStr for TicketType {
    type Err = crate::error::TasklineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "story" => Ok(Self::Story),
            "bug" => Ok(Self::Bug),
            "milestone" => Ok(Self::Milestone),
            "subtask" => Ok(Self::Subtask),
            other => Err(crate::error::TasklineError::Other(format!(
                "Unknown ticket type: {}",
                other
            ))),
        }
    }
}

impl Default for TicketType {
    fn default() -> Self {
        Self::Task
    }
}

/// A ticket row as returned by the store.
///
/// Reference fields use `None` where the wire format uses `0`/empty.
/// The trailing display fields are denormalized by the store from the
/// joined milestone/editor/sprint rows and default to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub ticket_type: TicketType,
    pub project_id: i64,
    pub author_id: i64,
    #[serde(default)]
    pub editor_id: Option<i64>,
    pub status: i32,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub storypoints: Option<f32>,
    #[serde(default)]
    pub plan_hours: f64,
    #[serde(default)]
    pub hour_remaining: f64,
    #[serde(default)]
    pub sprint_id: Option<i64>,
    #[serde(default)]
    pub milestone_id: Option<i64>,
    #[serde(default)]
    pub depending_ticket_id: Option<i64>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub sort_index: i64,
    #[serde(default)]
    pub kanban_rank: i64,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to_finish: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_from: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_to: Option<NaiveDateTime>,

    #[serde(default)]
    pub milestone_headline: String,
    #[serde(default)]
    pub editor_firstname: String,
    #[serde(default)]
    pub editor_lastname: String,
    #[serde(default)]
    pub sprint_name: String,
}

impl Ticket {
    pub fn is_milestone(&self) -> bool {
        self.ticket_type == TicketType::Milestone
    }

    pub fn is_subtask(&self) -> bool {
        self.ticket_type == TicketType::Subtask
    }

    /// Textual value of a named field, used as the grouping bucket key.
    ///
    /// Unset references render as `0`, unset scalars as the empty string,
    /// mirroring the flat row shape the board views group on. Unknown
    /// field names return `None` and the ticket is skipped by grouping.
    pub fn field_text(&self, field: &str) -> Option<String> {
        match field {
            "status" => Some(self.status.to_string()),
            "priority" => Some(
                self.priority
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            ),
            "storypoints" => Some(
                self.storypoints
                    .map(format_points)
                    .unwrap_or_default(),
            ),
            "milestoneid" => Some(self.milestone_id.unwrap_or(0).to_string()),
            "editorId" => Some(
                self.editor_id
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
            ),
            "sprint" => Some(
                self.sprint_id
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            ),
            "type" => Some(self.ticket_type.to_string()),
            "tags" => Some(self.tags.clone()),
            _ => None,
        }
    }
}

/// Renders storypoints the way the effort tables are keyed: `3`, not `3.0`,
/// but `0.5` stays fractional.
pub(crate) fn format_points(points: f32) -> String {
    if points.fract() == 0.0 {
        format!("{}", points as i64)
    } else {
        points.to_string()
    }
}

/// Full write payload for create/update.
///
/// Date fields arrive as raw strings with an optional separate time of
/// day; the lifecycle manager normalizes them before anything is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketInput {
    pub headline: String,
    #[serde(rename = "type", default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub editor_id: Option<i64>,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub storypoints: Option<f32>,
    #[serde(default)]
    pub plan_hours: f64,
    #[serde(default)]
    pub hour_remaining: f64,
    #[serde(default)]
    pub sprint_id: Option<i64>,
    #[serde(default)]
    pub milestone_id: Option<i64>,
    #[serde(default)]
    pub depending_ticket_id: Option<i64>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub date_to_finish: String,
    #[serde(default)]
    pub time_to_finish: String,
    #[serde(default)]
    pub edit_from: String,
    #[serde(default)]
    pub time_from: String,
    #[serde(default)]
    pub edit_to: String,
    #[serde(default)]
    pub time_to: String,
}

/// Partial update. `None` leaves a field alone; for the clearable
/// references, `Some(None)` clears the association.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub sort_index: Option<i64>,
    #[serde(default)]
    pub kanban_rank: Option<i64>,
    #[serde(default)]
    pub sprint_id: Option<Option<i64>>,
    #[serde(default)]
    pub milestone_id: Option<Option<i64>>,
    #[serde(default)]
    pub depending_ticket_id: Option<Option<i64>>,
}

impl TicketPatch {
    /// Patch applied to every ticket a cross-project move touches:
    /// reassign the project and drop the sprint association.
    pub fn relocation(project_id: i64) -> Self {
        Self {
            project_id: Some(project_id),
            sprint_id: Some(None),
            ..Self::default()
        }
    }

    /// Patch for the moved ticket itself: relocation plus detachment from
    /// its former parent and milestone.
    pub fn detaching_relocation(project_id: i64) -> Self {
        Self {
            depending_ticket_id: Some(None),
            milestone_id: Some(None),
            ..Self::relocation(project_id)
        }
    }
}

/// Write payload for a subtask. Project, milestone, and parent reference
/// are never taken from here; they are inherited from the parent ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskInput {
    /// `None` creates a new subtask, `Some(id)` updates an existing one.
    #[serde(default)]
    pub subtask_id: Option<i64>,
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub plan_hours: f64,
    #[serde(default)]
    pub hour_remaining: f64,
}

/// Read model for the edit form: the ticket plus its date-times split
/// into a display date and a separately extracted time of day.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub ticket: Ticket,
    pub date: String,
    pub date_to_finish: String,
    pub time_to_finish: String,
    pub edit_from: String,
    pub time_from: String,
    pub edit_to: String,
    pub time_to: String,
}
