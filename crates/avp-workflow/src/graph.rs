//! Dependency analysis over task lists.
//!
//! Dependencies that name a task outside the slice being analysed are
//! treated as already satisfied, so a subset of a pipeline (e.g. the
//! non-critical tail under the hybrid strategy) can be levelled on its own.

use std::collections::HashSet;

use crate::definition::WorkflowTask;
use crate::error::WorkflowError;

/// Check a full task list: unique IDs, known dependencies, no cycles, and no
/// critical task waiting on a non-critical one.
pub fn validate_graph(tasks: &[WorkflowTask]) -> Result<(), WorkflowError> {
    let mut ids = HashSet::new();
    for task in tasks {
        if !ids.insert(task.id.as_str()) {
            return Err(WorkflowError::InvalidTaskGraph(format!(
                "duplicate task id '{}'",
                task.id
            )));
        }
    }

    for task in tasks {
        for dep in &task.dependencies {
            if dep == &task.id {
                return Err(WorkflowError::InvalidTaskGraph(format!(
                    "task '{}' depends on itself",
                    task.id
                )));
            }
            let Some(upstream) = tasks.iter().find(|t| &t.id == dep) else {
                return Err(WorkflowError::InvalidTaskGraph(format!(
                    "task '{}' depends on unknown task '{}'",
                    task.id, dep
                )));
            };
            if task.critical && !upstream.critical {
                return Err(WorkflowError::InvalidTaskGraph(format!(
                    "critical task '{}' depends on non-critical task '{}'",
                    task.id, dep
                )));
            }
        }
    }

    dependency_levels(tasks).map(|_| ())
}

/// Group tasks into levels: every task's in-slice dependencies sit in an
/// earlier level. Order within a level follows the input order.
pub fn dependency_levels(tasks: &[WorkflowTask]) -> Result<Vec<Vec<WorkflowTask>>, WorkflowError> {
    let in_slice: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut done: HashSet<String> = HashSet::new();
    let mut remaining: Vec<&WorkflowTask> = tasks.iter().collect();
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&WorkflowTask>, Vec<&WorkflowTask>) =
            remaining.into_iter().partition(|t| {
                t.dependencies
                    .iter()
                    .all(|d| !in_slice.contains(d.as_str()) || done.contains(d))
            });

        if ready.is_empty() {
            let stuck: Vec<&str> = blocked.iter().map(|t| t.id.as_str()).collect();
            return Err(WorkflowError::InvalidTaskGraph(format!(
                "dependency cycle among: {}",
                stuck.join(", ")
            )));
        }

        done.extend(ready.iter().map(|t| t.id.clone()));
        levels.push(ready.into_iter().cloned().collect());
        remaining = blocked;
    }

    Ok(levels)
}

/// A dependency-respecting order, stable with respect to the input.
pub fn topological_order(tasks: &[WorkflowTask]) -> Result<Vec<WorkflowTask>, WorkflowError> {
    Ok(dependency_levels(tasks)?.into_iter().flatten().collect())
}
