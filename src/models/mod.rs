//! Domain models for Trackline.
//!
//! # Core Concepts
//!
//! - [`Project`]: Top-level container. Tickets and tasks belong to exactly
//!   one project.
//! - [`Ticket`]: Discussion-oriented work item with a status, priority and
//!   optional assignee. Comments attach to tickets.
//! - [`Task`]: Schedulable work item. Tasks carry optional start/due dates
//!   and may depend on other tasks in the same project via
//!   [`TaskDependency`] edges.
//! - [`User`]: Account with a [`UserRole`]. Referenced as assignee and
//!   comment author.
//! - [`Notification`]: Per-user inbox entry written when tickets are
//!   assigned or commented on.
//!
//! Level assignments for the dependency view are computed per request in
//! [`crate::levels`] and never stored.

mod comment;
mod notification;
mod project;
mod task;
mod ticket;
mod user;

pub use comment::*;
pub use notification::*;
pub use project::*;
pub use task::*;
pub use ticket::*;
pub use user::*;
