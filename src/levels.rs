//! Dependency leveling for the hierarchical task view.
//!
//! Each task gets an integer level: 0 for tasks with no dependencies,
//! otherwise one more than the deepest task it depends on. The view renders
//! one row per level, so every task sits strictly below everything it waits
//! on.
//!
//! Leveling is a pure function over a freshly fetched snapshot of tasks and
//! edges; nothing here is cached or shared between invocations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Task, TaskDependency};

/// The computed level for every task, plus any cycles found along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAssignment {
    /// Task id → level, defined for every input task.
    pub levels: HashMap<Uuid, u32>,
    /// Tasks that were revisited while their own level was still being
    /// computed. Edge creation rejects cycles, so this is only non-empty
    /// for databases written before that validation existed. Sorted.
    pub cycle_task_ids: Vec<Uuid>,
}

/// One display row: all tasks sharing a level, ordered by title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelGroup {
    pub level: u32,
    pub tasks: Vec<Task>,
}

/// The level view as served by the API: ordered groups plus the cycle
/// report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelView {
    pub groups: Vec<LevelGroup>,
    pub cycle_task_ids: Vec<Uuid>,
}

/// Visit state for the depth-first walk.
enum Mark {
    InProgress,
    Done(u32),
}

/// Assign a level to every task.
///
/// Edges whose endpoints are not both in `tasks` are ignored; the source
/// data may be incomplete. A task caught in a cycle keeps the recursion
/// finite by falling back to level 0 and is reported in
/// [`LevelAssignment::cycle_task_ids`].
pub fn compute_levels(tasks: &[Task], deps: &[TaskDependency]) -> LevelAssignment {
    let mut deps_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for task in tasks {
        deps_of.entry(task.id).or_default();
    }
    for edge in deps {
        // Both endpoints must be known tasks for the edge to count.
        if !deps_of.contains_key(&edge.depends_on_id) {
            continue;
        }
        if let Some(list) = deps_of.get_mut(&edge.task_id) {
            list.push(edge.depends_on_id);
        }
    }

    fn visit(
        id: Uuid,
        deps_of: &HashMap<Uuid, Vec<Uuid>>,
        marks: &mut HashMap<Uuid, Mark>,
        cycles: &mut Vec<Uuid>,
    ) -> u32 {
        match marks.get(&id) {
            Some(Mark::Done(level)) => return *level,
            Some(Mark::InProgress) => {
                // Revisited before finishing: this node closes a cycle.
                cycles.push(id);
                return 0;
            }
            None => {}
        }

        marks.insert(id, Mark::InProgress);
        let level = deps_of
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&dep| visit(dep, deps_of, marks, cycles) + 1)
            .max()
            .unwrap_or(0);
        marks.insert(id, Mark::Done(level));
        level
    }

    let mut marks = HashMap::new();
    let mut cycle_task_ids = Vec::new();
    let mut levels = HashMap::new();
    for task in tasks {
        let level = visit(task.id, &deps_of, &mut marks, &mut cycle_task_ids);
        levels.insert(task.id, level);
    }

    cycle_task_ids.sort();
    cycle_task_ids.dedup();

    LevelAssignment {
        levels,
        cycle_task_ids,
    }
}

/// Bucket tasks into ordered level groups for rendering.
pub fn level_groups(tasks: Vec<Task>, assignment: &LevelAssignment) -> Vec<LevelGroup> {
    let mut by_level: HashMap<u32, Vec<Task>> = HashMap::new();
    for task in tasks {
        let level = assignment.levels.get(&task.id).copied().unwrap_or(0);
        by_level.entry(level).or_default().push(task);
    }

    let mut groups: Vec<LevelGroup> = by_level
        .into_iter()
        .map(|(level, mut tasks)| {
            tasks.sort_by(|a, b| a.title.cmp(&b.title));
            LevelGroup { level, tasks }
        })
        .collect();
    groups.sort_by_key(|g| g.level);
    groups
}
