//! Projects and Goals.

use super::links::{self, strip_everywhere};
use super::{find, find_mut, new_id, remove, require_opt, Slot, Store};
use crate::backend::SlotStore;
use crate::error::Result;
use crate::types::*;

impl<B: SlotStore> Store<B> {
    // ============================================
    // Project operations
    // ============================================

    pub fn create_project(&mut self, input: ProjectInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            require_opt(&txn.state.goals, input.goal_id.as_deref())?;

            let id = new_id();
            txn.state.projects.insert(
                0,
                Project {
                    id: id.clone(),
                    title: input.title,
                    description: input.description,
                    status: input.status,
                    goal_id: input.goal_id,
                    due_date: input.due_date,
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::Projects);

            tracing::debug!(project_id = %id, "Created project");
            Ok(id)
        })
    }

    pub fn update_project(&mut self, id: &str, patch: ProjectPatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            if let Some(goal_id) = &patch.goal_id {
                require_opt(&txn.state.goals, goal_id.as_deref())?;
            }

            let project = find_mut(&mut txn.state.projects, id)?;
            if let Some(title) = patch.title {
                project.title = title;
            }
            if let Some(description) = patch.description {
                project.description = description;
            }
            if let Some(status) = patch.status {
                project.status = status;
            }
            if let Some(goal_id) = patch.goal_id {
                project.goal_id = goal_id;
            }
            if let Some(due_date) = patch.due_date {
                project.due_date = due_date;
            }
            project.touch(now);
            txn.touch(Slot::Projects);
            Ok(())
        })
    }

    /// Delete a project and remove it from every task.
    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            remove(&mut txn.state.projects, id)?;
            txn.touch(Slot::Projects);

            if strip_everywhere(&mut txn.state.tasks, links::task_projects, id, now) {
                txn.touch(Slot::Tasks);
            }

            tracing::debug!(project_id = %id, "Deleted project");
            Ok(())
        })
    }

    pub fn project(&self, id: &str) -> Result<&Project> {
        find(&self.state.projects, id)
    }

    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    /// Tasks that belong to a project
    pub fn tasks_for_project(&self, project_id: &str) -> Result<Vec<&Task>> {
        self.project(project_id)?;
        Ok(self
            .state
            .tasks
            .iter()
            .filter(|task| task.project_ids.iter().any(|id| id == project_id))
            .collect())
    }

    // ============================================
    // Goal operations
    // ============================================

    pub fn create_goal(&mut self, input: GoalInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            let id = new_id();
            txn.state.goals.insert(
                0,
                Goal {
                    id: id.clone(),
                    title: input.title,
                    description: input.description,
                    horizon: input.horizon,
                    status: input.status,
                    target_date: input.target_date,
                    progress: input.progress.min(100),
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::Goals);

            tracing::debug!(goal_id = %id, "Created goal");
            Ok(id)
        })
    }

    pub fn update_goal(&mut self, id: &str, patch: GoalPatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            let goal = find_mut(&mut txn.state.goals, id)?;
            if let Some(title) = patch.title {
                goal.title = title;
            }
            if let Some(description) = patch.description {
                goal.description = description;
            }
            if let Some(horizon) = patch.horizon {
                goal.horizon = horizon;
            }
            if let Some(status) = patch.status {
                goal.status = status;
            }
            if let Some(target_date) = patch.target_date {
                goal.target_date = target_date;
            }
            if let Some(progress) = patch.progress {
                goal.progress = progress.min(100);
            }
            goal.touch(now);
            txn.touch(Slot::Goals);
            Ok(())
        })
    }

    /// Delete a goal and detach every project that served it.
    pub fn delete_goal(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            remove(&mut txn.state.goals, id)?;
            txn.touch(Slot::Goals);

            if links::detach_everywhere(&mut txn.state.projects, links::project_goal, id, now) {
                txn.touch(Slot::Projects);
            }

            tracing::debug!(goal_id = %id, "Deleted goal");
            Ok(())
        })
    }

    pub fn goal(&self, id: &str) -> Result<&Goal> {
        find(&self.state.goals, id)
    }

    pub fn goals(&self) -> &[Goal] {
        &self.state.goals
    }

    /// Projects serving a goal
    pub fn projects_for_goal(&self, goal_id: &str) -> Result<Vec<&Project>> {
        self.goal(goal_id)?;
        Ok(self
            .state
            .projects
            .iter()
            .filter(|project| project.goal_id.as_deref() == Some(goal_id))
            .collect())
    }
}
