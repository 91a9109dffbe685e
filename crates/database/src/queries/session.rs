use demurrage::database::Result;
use model::{session::Session, WithId};
use sqlx::{Executor, Postgres};

use crate::data_model::{session::SessionRow, with_id};

use super::convert_error;

pub async fn by_token<'c, E>(executor: E, token: &str) -> Result<WithId<Session>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, user_id, token, created_at, expires_at
        FROM sessions
        WHERE token = $1;
        ",
    )
    .bind(token)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: SessionRow| with_id(row))
}

pub async fn insert<'c, E>(executor: E, session: Session) -> Result<WithId<Session>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO sessions(
            user_id,
            token,
            created_at,
            expires_at
        )
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, token, created_at, expires_at;
        ",
    )
    .bind(session.user_id.raw())
    .bind(&session.token)
    .bind(session.created_at)
    .bind(session.expires_at)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: SessionRow| with_id(row))
}
