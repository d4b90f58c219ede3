//! # Taskline Core
//!
//! Core business logic and domain models for Taskline ticket management.
//!
//! This crate provides the fundamental types and operations for managing
//! tickets, milestones, sprints, and kanban workflows without any
//! dependency on specific UI implementations or storage backends.

pub mod context;
pub mod domain;
pub mod error;
pub mod kanban;
pub mod lifecycle;
pub mod notify;
pub mod query;
pub mod relations;
pub mod storage;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use context::{RequestContext, SessionUpdate, SessionViews, ViewKind};
pub use domain::{
    criteria::{SearchCriteria, TicketFilter},
    status::{StatusCategory, StatusLabel, StatusRegistry},
    ticket::{SubtaskInput, Ticket, TicketInput, TicketPatch, TicketType, TicketView},
};
pub use error::{Result, TasklineError};
pub use kanban::KanbanReorderer;
pub use lifecycle::TicketLifecycleManager;
pub use notify::{Notification, NotificationDispatcher};
pub use query::QueryEngine;
pub use relations::MilestoneSubtaskLinker;
pub use storage::{ProjectDirectory, TicketStore};
