//! LIFO work list
//!
//! The work list replaces natural recursion: a task that finds missing
//! children pushes itself back first and its sub-tasks after, so LIFO
//! drainage solves the children before the parent is retried.

use anyhow::Result;

use super::task::Task;
use super::SizeSolver;
use crate::repository::store::ObjectStore;

#[derive(Default)]
pub(crate) struct WorkList {
    tasks: Vec<Task>,
}

impl WorkList {
    pub(crate) fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Append another list's tasks, preserving their order.
    pub(crate) fn push_all(&mut self, mut other: WorkList) {
        self.tasks.append(&mut other.tasks);
    }

    pub(crate) fn pop(&mut self) -> Option<Task> {
        self.tasks.pop()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Pop and dispatch until empty. When this returns `Ok`, every
    /// object any task touched has been recorded in the solver's caches.
    pub(crate) fn run<S: ObjectStore>(&mut self, solver: &mut SizeSolver<S>) -> Result<()> {
        while let Some(task) = self.pop() {
            task.run(solver, self)?;
        }
        Ok(())
    }
}
