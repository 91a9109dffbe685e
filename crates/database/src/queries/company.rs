use demurrage::database::Result;
use model::{company::Company, WithId};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{company::CompanyRow, with_id};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Company>) -> Result<WithId<Company>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, demurrage_threshold_minutes
        FROM companies
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: CompanyRow| with_id(row))
}

pub async fn insert<'c, E>(executor: E, company: Company) -> Result<WithId<Company>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO companies(
            name,
            demurrage_threshold_minutes
        )
        VALUES ($1, $2)
        RETURNING id, name, demurrage_threshold_minutes;
        ",
    )
    .bind(&company.name)
    .bind(company.demurrage_threshold_minutes)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: CompanyRow| with_id(row))
}

pub async fn update<'c, E>(executor: E, company: WithId<Company>) -> Result<WithId<Company>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE companies
        SET name = $1,
            demurrage_threshold_minutes = $2
        WHERE id = $3
        RETURNING id, name, demurrage_threshold_minutes;
        ",
    )
    .bind(&company.content.name)
    .bind(company.content.demurrage_threshold_minutes)
    .bind(company.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: CompanyRow| with_id(row))
}
