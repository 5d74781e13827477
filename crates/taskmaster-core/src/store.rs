use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::task::{Task, TaskDraft};

const SESSION_FLAG: &str = "true";

/// Canonical owner of the task collection. The in-memory `tasks` vector is
/// authoritative; the files under `data_dir` are a mirror rewritten after
/// every mutation and read once at `open`.
#[derive(Debug)]
pub struct TaskStore {
    pub data_dir: PathBuf,
    tasks_path: PathBuf,
    session_path: PathBuf,
    tasks: Vec<Task>,
}

impl TaskStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.json");
        let session_path = data_dir.join("session.data");
        let tasks = load_tasks(&tasks_path);

        info!(
            data_dir = %data_dir.display(),
            tasks = tasks.len(),
            "opened task store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            session_path,
            tasks,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Completes the draft (generated id, creation stamp, default status),
    /// inserts it, and re-sorts the collection by creation time.
    #[tracing::instrument(skip(self, draft, now), fields(title = %draft.title))]
    pub fn add(&mut self, draft: TaskDraft, now: DateTime<Utc>) {
        let task = Task::from_draft(draft, now);
        debug!(id = %task.id, "adding task");
        self.tasks.push(task);
        self.tasks.sort_by_key(|task| task.created_at);
        self.persist();
    }

    /// Replaces the record whose id matches. Returns whether a match
    /// existed; on a miss the collection is left untouched.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn update(&mut self, task: Task) -> bool {
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            warn!(id = %task.id, "update target not found");
            return false;
        };
        *slot = task;
        self.persist();
        true
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!(id = %id, "delete target not found");
            return false;
        }
        self.persist();
        true
    }

    /// All tasks due on the given calendar date. Dates are compared as
    /// plain calendar days, never as timestamps.
    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.due_date == Some(date))
            .collect()
    }

    pub fn is_logged_in(&self) -> bool {
        match fs::read_to_string(&self.session_path) {
            Ok(raw) => raw.trim() == SESSION_FLAG,
            Err(_) => false,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn login(&self) -> anyhow::Result<()> {
        fs::write(&self.session_path, SESSION_FLAG)
            .with_context(|| format!("failed writing {}", self.session_path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub fn logout(&self) -> anyhow::Result<()> {
        if !self.session_path.exists() {
            return Ok(());
        }
        fs::remove_file(&self.session_path)
            .with_context(|| format!("failed removing {}", self.session_path.display()))
    }

    /// Mirrors the collection to disk. A write failure is logged and
    /// swallowed: the in-memory change stands and persistence is degraded
    /// until the next successful save.
    fn persist(&self) {
        if let Err(err) = save_tasks_atomic(&self.tasks_path, &self.tasks) {
            error!(
                file = %self.tasks_path.display(),
                error = %format!("{err:#}"),
                "failed to persist tasks; continuing with in-memory state"
            );
        }
    }
}

#[tracing::instrument(skip(path))]
fn load_tasks(path: &Path) -> Vec<Task> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(file = %path.display(), "no tasks file yet; starting empty");
            return Vec::new();
        }
        Err(err) => {
            warn!(
                file = %path.display(),
                error = %err,
                "failed reading tasks file; starting empty"
            );
            return Vec::new();
        }
    };

    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<Task>>(&raw) {
        Ok(tasks) => {
            debug!(count = tasks.len(), "loaded tasks");
            tasks
        }
        Err(err) => {
            warn!(
                file = %path.display(),
                error = %err,
                "malformed tasks file; resetting to empty collection"
            );
            Vec::new()
        }
    }
}

#[tracing::instrument(skip(path, tasks))]
fn save_tasks_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving tasks atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string(tasks)?;
    writeln!(temp, "{serialized}")?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
