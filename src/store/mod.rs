// SQLite-backed store for users and training runs
//
// Every write validates first and then issues a single statement, so a
// failed save leaves nothing behind.

mod rows;
mod schema;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::identity::{User, UserId};
use crate::runs::{LaunchRecord, RunForm, RunId, TrainingRun, DEFAULT_COMMAND};

use rows::{row_to_run, row_to_user};

/// Persistent store for training runs and their owners
pub struct RunStore {
    conn: Connection,
}

impl RunStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened run store");
        Self::init(conn)
    }

    /// Throwaway database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(schema::PRAGMAS)?;
        schema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    pub fn create_user(&self, username: &str) -> Result<User, StoreError> {
        User::validate_username(username)?;

        match self.conn.execute(
            "INSERT INTO users (username, date_joined) VALUES (?1, ?2)",
            params![username, Utc::now()],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateUser(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let user = User {
            id: UserId(self.conn.last_insert_rowid()),
            username: username.to_string(),
        };
        info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Look a user up, failing when absent
    pub fn require_user(&self, username: &str) -> Result<User, StoreError> {
        self.find_user(username)?
            .ok_or_else(|| StoreError::UserNotFound(username.to_string()))
    }

    /// Delete a user and, through the foreign key, every run they own.
    ///
    /// Returns the number of runs removed with the user.
    pub fn delete_user(&self, username: &str) -> Result<usize, StoreError> {
        let user = self.require_user(username)?;

        let tx = self.conn.unchecked_transaction()?;
        let runs: i64 = tx.query_row(
            "SELECT COUNT(*) FROM training_runs WHERE owner_id = ?1",
            params![user.id.0],
            |row| row.get(0),
        )?;
        tx.execute("DELETE FROM users WHERE id = ?1", params![user.id.0])?;
        tx.commit()?;

        info!(user_id = %user.id, username = %user.username, runs = runs, "Deleted user");
        Ok(runs as usize)
    }

    // -------------------------------------------------------------------------
    // Runs
    // -------------------------------------------------------------------------

    /// Validate and insert a new run. Process fields start at their defaults.
    pub fn create_run(&self, owner: &User, form: &RunForm) -> Result<TrainingRun, StoreError> {
        let fields = form.validate().map_err(|e| {
            warn!(title = %form.title, field = e.field(), "Rejected training run: {}", e);
            e
        })?;

        let inserted = self.conn.execute(
            "INSERT INTO training_runs (\
               owner_id, created_at, title, batch_size, image_size, n_validation, n_test,\
               learning_rate, optimizer, group_size, filters_root, augment,\
               pid, tb_pid, port, cmd_str\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, 0, 0, ?13)",
            params![
                owner.id.0,
                Utc::now(),
                fields.title,
                fields.batch_size,
                fields.image_size,
                fields.n_validation,
                fields.n_test,
                fields.learning_rate.get(),
                fields.optimizer.as_str(),
                fields.group_size,
                fields.filters_root,
                fields.augment,
                DEFAULT_COMMAND,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                // Owner row is gone (foreign key)
                return Err(StoreError::UserNotFound(owner.username.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = RunId(self.conn.last_insert_rowid());
        info!(
            run_id = %id,
            owner = %owner.username,
            title = %fields.title,
            optimizer = %fields.optimizer,
            learning_rate = fields.learning_rate.get(),
            "Created training run"
        );
        self.require_run(id)
    }

    pub fn get_run(&self, id: RunId) -> Result<Option<TrainingRun>, StoreError> {
        let sql = format!(
            "SELECT {} FROM training_runs r JOIN users u ON u.id = r.owner_id WHERE r.id = ?1",
            schema::RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&sql, params![id.0], row_to_run)
            .optional()
            .map_err(decode_error)?;
        debug!(run_id = %id, found = run.is_some(), "Loaded training run");
        Ok(run)
    }

    pub fn require_run(&self, id: RunId) -> Result<TrainingRun, StoreError> {
        self.get_run(id)?.ok_or(StoreError::RunNotFound(id))
    }

    /// Runs newest first, optionally restricted to one owner
    pub fn list_runs(&self, owner: Option<UserId>) -> Result<Vec<TrainingRun>, StoreError> {
        let sql = format!(
            "SELECT {} FROM training_runs r JOIN users u ON u.id = r.owner_id \
             WHERE (?1 IS NULL OR r.owner_id = ?1) \
             ORDER BY r.created_at DESC, r.id DESC",
            schema::RUN_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![owner.map(|id| id.0)], row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(decode_error)?;
        Ok(runs)
    }

    /// Replace the creation attributes of an existing run.
    ///
    /// `created_at` and the process fields are left alone.
    pub fn update_run(&self, id: RunId, form: &RunForm) -> Result<TrainingRun, StoreError> {
        let fields = form.validate().map_err(|e| {
            warn!(run_id = %id, field = e.field(), "Rejected training run update: {}", e);
            e
        })?;

        let changed = self.conn.execute(
            "UPDATE training_runs SET \
               title = ?1, batch_size = ?2, image_size = ?3, n_validation = ?4, n_test = ?5,\
               learning_rate = ?6, optimizer = ?7, group_size = ?8, filters_root = ?9, augment = ?10 \
             WHERE id = ?11",
            params![
                fields.title,
                fields.batch_size,
                fields.image_size,
                fields.n_validation,
                fields.n_test,
                fields.learning_rate.get(),
                fields.optimizer.as_str(),
                fields.group_size,
                fields.filters_root,
                fields.augment,
                id.0,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(id));
        }

        info!(run_id = %id, title = %fields.title, "Updated training run");
        self.require_run(id)
    }

    /// Record that the launcher started this run.
    ///
    /// Moves the run from pending to launched exactly once: the update only
    /// matches rows whose pid is still 0, so of two racing launchers one wins
    /// and the other gets `AlreadyLaunched`.
    pub fn record_launch(&self, id: RunId, launch: &LaunchRecord) -> Result<TrainingRun, StoreError> {
        launch.validate()?;

        let changed = self.conn.execute(
            "UPDATE training_runs SET pid = ?1, tb_pid = ?2, port = ?3, cmd_str = ?4 \
             WHERE id = ?5 AND (pid IS NULL OR pid = 0)",
            params![
                launch.pid,
                launch.tensorboard_pid.unwrap_or(0),
                launch.port.unwrap_or(0),
                launch.command,
                id.0,
            ],
        )?;

        if changed == 0 {
            let existing = self.require_run(id)?;
            warn!(run_id = %id, pid = existing.process_id(), "Run already launched");
            return Err(StoreError::AlreadyLaunched {
                id,
                pid: existing.process_id(),
            });
        }

        info!(
            run_id = %id,
            pid = launch.pid,
            tb_pid = ?launch.tensorboard_pid,
            port = ?launch.port,
            "Recorded training launch"
        );
        self.require_run(id)
    }

    pub fn delete_run(&self, id: RunId) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM training_runs WHERE id = ?1", params![id.0])?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(id));
        }
        info!(run_id = %id, "Deleted training run");
        Ok(())
    }
}

/// Rows that no longer pass validation are reported as corrupt
fn decode_error(error: rusqlite::Error) -> StoreError {
    match error {
        rusqlite::Error::FromSqlConversionFailure(index, _, source) => {
            StoreError::Corrupt(format!("column {}: {}", index, source))
        }
        other => StoreError::Sqlite(other),
    }
}
