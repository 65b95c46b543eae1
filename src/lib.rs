//! Trackline: a project-management backend.
//!
//! Projects contain tickets (discussion-oriented work items with comments)
//! and tasks (schedulable work items with dependency edges). The API serves
//! plain CRUD plus two computed read views: dependency level groups for
//! hierarchical task rendering and a Gantt chart window with per-task bars.

pub mod api;
pub mod db;
pub mod gantt;
pub mod levels;
pub mod models;
