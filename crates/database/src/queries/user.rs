use demurrage::database::Result;
use model::{user::User, WithId};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{user::UserRow, with_id};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, name, email, role
        FROM users
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: UserRow| with_id(row))
}

pub async fn insert<'c, E>(executor: E, user: User) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO users(
            company_id,
            name,
            email,
            role
        )
        VALUES ($1, $2, $3, $4)
        RETURNING id, company_id, name, email, role;
        ",
    )
    .bind(user.company_id.raw())
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role.as_str())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: UserRow| with_id(row))
}
