// Row converters
//
// Values that fail the record's own validation surface as conversion errors
// instead of being coerced to defaults.

use rusqlite::types::Type;
use rusqlite::Row;

use crate::errors::ValidationError;
use crate::identity::{User, UserId};
use crate::runs::{LearningRate, RunId, RunParams, RunPhase, TrainingRun, DEFAULT_COMMAND};

pub(super) fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
    })
}

pub(super) fn row_to_run(row: &Row<'_>) -> rusqlite::Result<TrainingRun> {
    let learning_rate: f64 = row.get(9)?;
    let optimizer: String = row.get(10)?;

    Ok(TrainingRun {
        id: RunId(row.get(0)?),
        owner: User {
            id: UserId(row.get(1)?),
            username: row.get(2)?,
        },
        created_at: row.get(3)?,
        params: RunParams {
            title: row.get(4)?,
            batch_size: row.get(5)?,
            image_size: row.get(6)?,
            n_validation: row.get(7)?,
            n_test: row.get(8)?,
            learning_rate: LearningRate::new(learning_rate)
                .map_err(|e| invalid(9, Type::Real, e))?,
            optimizer: optimizer.parse().map_err(|e| invalid(10, Type::Text, e))?,
            group_size: row.get(11)?,
            filters_root: row.get(12)?,
            augment: row.get(13)?,
        },
        phase: RunPhase::from_stored_pid(row.get(14)?),
        tensorboard_pid: row.get::<_, Option<u32>>(15)?.filter(|pid| *pid != 0),
        port: row.get::<_, Option<u16>>(16)?.filter(|port| *port != 0),
        command: row
            .get::<_, Option<String>>(17)?
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
    })
}

fn invalid(index: usize, ty: Type, error: ValidationError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, ty, Box::new(error))
}
