use tokio::sync::watch;

use crate::api::ApiClient;
use crate::error::Error;
use crate::types::{Task, TaskId};

/// Local mirror of the user's task list.
///
/// Each operation makes one API call and applies its result to the list.
/// Failures are logged and returned; apart from [`fetch_tasks`](Self::fetch_tasks),
/// a failed call leaves the list exactly as it was.
#[derive(Debug)]
pub struct TaskListManager {
    api: ApiClient,
    tasks: watch::Sender<Vec<Task>>,
}

impl TaskListManager {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tasks: watch::Sender::new(Vec::new()),
        }
    }

    /// Snapshot of the current list.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.borrow().clone()
    }

    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.borrow().iter().find(|t| t.id == id).cloned()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    /// Replace the list with the server's, in server order.
    ///
    /// On failure the list is emptied: callers cannot tell "no tasks" from
    /// "fetch failed" by looking at the list alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn fetch_tasks(&self) -> Result<(), Error> {
        match self.api.list_tasks().await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "Fetched tasks");
                self.tasks.send_replace(tasks);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch tasks");
                self.tasks.send_replace(Vec::new());
                Err(e)
            }
        }
    }

    /// Create a task and put the server's record at the front of the list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn add_task(&self, title: &str) -> Result<Task, Error> {
        let task = self
            .api
            .create_task(title)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to add task"))?;

        self.tasks.send_modify(|tasks| tasks.insert(0, task.clone()));
        Ok(task)
    }

    /// Flip `completed` on a task, using the value held in this list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] without any request if `id` is not in
    /// the list, otherwise [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn toggle_task(&self, id: TaskId) -> Result<Task, Error> {
        let current = self
            .tasks
            .borrow()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.completed)
            .ok_or(Error::TaskNotFound(id))
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to toggle task"))?;

        let updated = self
            .api
            .update_task(id, !current)
            .await
            .inspect_err(|e| tracing::error!(error = %e, task_id = %id, "Failed to toggle task"))?;

        self.tasks.send_modify(|tasks| {
            for task in tasks.iter_mut().filter(|t| t.id == id) {
                *task = updated.clone();
            }
        });
        Ok(updated)
    }

    /// Delete a task and drop it from the list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), Error> {
        self.api
            .delete_task(id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, task_id = %id, "Failed to delete task"))?;

        self.tasks.send_modify(|tasks| tasks.retain(|t| t.id != id));
        Ok(())
    }
}
