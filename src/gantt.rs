//! Date-range arithmetic for Gantt chart rendering.
//!
//! The chart window spans from the earliest start date to the latest due
//! date among the project's dated tasks. Each row places its task's bar as
//! a day offset from the window start plus an inclusive duration. Tasks
//! with no dates at all are left out of the chart.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Task;

/// A rendered chart: the overall window plus one row per dated task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttChart {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub rows: Vec<GanttRow>,
}

/// Bar placement for a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttRow {
    pub task: Task,
    /// Days between the window start and the bar start.
    pub offset_days: i64,
    /// Bar length in days, inclusive of both endpoints. At least 1.
    pub duration_days: i64,
}

/// Resolve a task's bar to a concrete date range.
///
/// A task with only one of its two dates renders as a one-day bar on that
/// date.
fn bar_span(task: &Task) -> Option<(NaiveDate, NaiveDate)> {
    match (task.start_date, task.due_date) {
        (Some(start), Some(due)) if start <= due => Some((start, due)),
        // Inverted ranges collapse onto the start date rather than
        // rendering a negative-length bar.
        (Some(start), Some(_)) => Some((start, start)),
        (Some(start), None) => Some((start, start)),
        (None, Some(due)) => Some((due, due)),
        (None, None) => None,
    }
}

/// Build the chart for a set of tasks, or `None` when no task has a date.
pub fn build_chart(tasks: Vec<Task>) -> Option<GanttChart> {
    let spans: Vec<(Task, NaiveDate, NaiveDate)> = tasks
        .into_iter()
        .filter_map(|t| bar_span(&t).map(|(start, end)| (t, start, end)))
        .collect();

    let window_start = spans.iter().map(|(_, start, _)| *start).min()?;
    let window_end = spans.iter().map(|(_, _, end)| *end).max()?;

    let rows = spans
        .into_iter()
        .map(|(task, start, end)| GanttRow {
            task,
            offset_days: (start - window_start).num_days(),
            duration_days: (end - start).num_days() + 1,
        })
        .collect();

    Some(GanttChart {
        window_start,
        window_end,
        rows,
    })
}
