//! Task persistence
//!
//! Mirrors the task list into a SQLite `tasks` table keyed by title.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use super::{Priority, Task};

/// Errors from the task store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open task database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("task database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("corrupt task row {id}: {message}")]
    CorruptRow { id: i64, message: String },
}

/// Raw row of the `tasks` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub completed: bool,
}

/// Durable mirror of the task list
pub trait TaskRepository: Send {
    /// Insert a task, returning its row id
    fn save(&mut self, task: &Task) -> Result<i64, StoreError>;

    /// Load every stored task in insertion order
    fn load_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Delete the first task with this title
    fn delete(&mut self, title: &str) -> Result<(), StoreError>;

    /// Set the completion flag of the first task with this title
    fn update_completion(&mut self, title: &str, completed: bool) -> Result<(), StoreError>;

    /// Raw rows, for diagnostics
    fn rows(&self) -> Result<Vec<TaskRow>, StoreError>;

    /// Replace every stored task with `tasks`, returning the new row ids in order
    fn replace_all(&mut self, tasks: &[Task]) -> Result<Vec<i64>, StoreError>;
}

/// SQLite-backed task repository
pub struct SqliteTaskRepository {
    conn: Connection,
}

impl std::fmt::Debug for SqliteTaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTaskRepository")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteTaskRepository {
    /// Open (and create if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                description TEXT,
                priority    TEXT NOT NULL,
                due_date    TEXT,
                completed   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_title ON tasks(title);",
        )?;
        Ok(Self { conn })
    }

    fn first_id_for(&self, title: &str) -> Result<Option<i64>, StoreError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM tasks WHERE title = ?1 ORDER BY id LIMIT 1",
                params![title],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

fn insert_task(conn: &Connection, task: &Task) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO tasks (title, priority, due_date, completed) VALUES (?1, ?2, ?3, ?4)",
        params![
            task.title,
            task.priority.as_str(),
            task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            task.completed,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl TaskRepository for SqliteTaskRepository {
    fn save(&mut self, task: &Task) -> Result<i64, StoreError> {
        insert_task(&self.conn, task)
    }

    fn load_all(&self) -> Result<Vec<Task>, StoreError> {
        self.rows()?
            .into_iter()
            .map(|row| {
                let priority = row
                    .priority
                    .parse::<Priority>()
                    .map_err(|e| StoreError::CorruptRow {
                        id: row.id,
                        message: e.to_string(),
                    })?;
                let due_date = row
                    .due_date
                    .as_deref()
                    .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
                    .transpose()
                    .map_err(|e| StoreError::CorruptRow {
                        id: row.id,
                        message: e.to_string(),
                    })?;
                Ok(Task {
                    title: row.title,
                    priority,
                    due_date,
                    completed: row.completed,
                })
            })
            .collect()
    }

    fn delete(&mut self, title: &str) -> Result<(), StoreError> {
        if let Some(id) = self.first_id_for(title)? {
            self.conn
                .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        }
        Ok(())
    }

    fn update_completion(&mut self, title: &str, completed: bool) -> Result<(), StoreError> {
        if let Some(id) = self.first_id_for(title)? {
            self.conn.execute(
                "UPDATE tasks SET completed = ?1 WHERE id = ?2",
                params![completed, id],
            )?;
        }
        Ok(())
    }

    fn rows(&self) -> Result<Vec<TaskRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, priority, due_date, completed FROM tasks ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TaskRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    priority: row.get(2)?,
                    due_date: row.get(3)?,
                    completed: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn replace_all(&mut self, tasks: &[Task]) -> Result<Vec<i64>, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tasks", [])?;
        let ids = tasks
            .iter()
            .map(|task| insert_task(&tx, task))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;
        Ok(ids)
    }
}
