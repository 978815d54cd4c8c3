// SQLite schema
//
// Column names and defaults stay compatible with the existing training table:
// unset process fields are 0 (not NULL) and cmd_str defaults to '.'.

use rusqlite::Connection;

use crate::errors::StoreError;

pub(super) const PRAGMAS: &str = "PRAGMA foreign_keys=ON;\
     PRAGMA busy_timeout=5000;";

const CREATE_TABLES: &str = "CREATE TABLE IF NOT EXISTS users (\
       id INTEGER PRIMARY KEY AUTOINCREMENT,\
       username VARCHAR(150) NOT NULL UNIQUE,\
       date_joined TEXT NOT NULL\
     );\
     CREATE TABLE IF NOT EXISTS training_runs (\
       id INTEGER PRIMARY KEY AUTOINCREMENT,\
       owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,\
       created_at TEXT NOT NULL,\
       title VARCHAR(255) NOT NULL,\
       batch_size INTEGER NOT NULL CHECK (batch_size >= 0),\
       image_size INTEGER NOT NULL CHECK (image_size >= 0),\
       n_validation INTEGER NOT NULL CHECK (n_validation >= 0),\
       n_test INTEGER NOT NULL CHECK (n_test >= 0),\
       learning_rate REAL NOT NULL,\
       optimizer VARCHAR(10) NOT NULL,\
       group_size INTEGER NOT NULL CHECK (group_size >= 0),\
       filters_root INTEGER NOT NULL CHECK (filters_root >= 0),\
       augment BOOL NOT NULL,\
       pid INTEGER DEFAULT 0 CHECK (pid >= 0),\
       tb_pid INTEGER DEFAULT 0 CHECK (tb_pid >= 0),\
       port INTEGER DEFAULT 0 CHECK (port >= 0),\
       cmd_str VARCHAR(1000) DEFAULT '.'\
     );\
     CREATE INDEX IF NOT EXISTS idx_training_runs_owner ON training_runs(owner_id);";

/// Columns selected for every run read, in `rows::row_to_run` order
pub(super) const RUN_COLUMNS: &str = "r.id, r.owner_id, u.username, r.created_at, r.title, \
     r.batch_size, r.image_size, r.n_validation, r.n_test, r.learning_rate, r.optimizer, \
     r.group_size, r.filters_root, r.augment, r.pid, r.tb_pid, r.port, r.cmd_str";

/// Idempotent, safe to call on every open
pub(super) fn create_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}
