use demurrage::database::Result;
use chrono::Datelike;
use model::{
    company::Company,
    demurrage::{Week, WeeklyDemurrage},
    tracking::InvoiceFlags,
};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::weekly::WeeklyDemurrageRow;

use super::convert_error;

pub async fn get<'c, E>(
    executor: E,
    company_id: &Id<Company>,
    week: Week,
) -> Result<Option<WeeklyDemurrage>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT company_id, week_start, total_minutes, event_count,
            invoice_generated, invoice_sent
        FROM weekly_demurrage
        WHERE company_id = $1 AND week_start = $2;
        ",
    )
    .bind(company_id.raw())
    .bind(week.start_date())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?
    .map(|row: WeeklyDemurrageRow| row.to_model())
    .let_owned(Ok)
}

/// Takes a transaction-scoped advisory lock keyed by company and week.
pub async fn lock<'c, E>(executor: E, company_id: &Id<Company>, week: Week) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2);")
        .bind(company_id.raw())
        .bind(week.start_date().num_days_from_ce())
        .execute(executor)
        .await
        .map_err(convert_error)?;
    Ok(())
}

/// Upserts the totals, the invoice flags of an existing row stay as they are.
pub async fn put_totals<'c, E>(executor: E, weekly: &WeeklyDemurrage) -> Result<WeeklyDemurrage>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO weekly_demurrage(
            company_id,
            week_start,
            total_minutes,
            event_count,
            invoice_generated,
            invoice_sent
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (company_id, week_start)
        DO UPDATE SET
            total_minutes = EXCLUDED.total_minutes,
            event_count = EXCLUDED.event_count
        RETURNING company_id, week_start, total_minutes, event_count,
            invoice_generated, invoice_sent;
        ",
    )
    .bind(weekly.company_id.raw())
    .bind(weekly.week_start.start_date())
    .bind(weekly.total_minutes)
    .bind(weekly.event_count)
    .bind(weekly.invoice_generated)
    .bind(weekly.invoice_sent)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: WeeklyDemurrageRow| row.to_model())
}

pub async fn set_flags<'c, E>(
    executor: E,
    company_id: &Id<Company>,
    week: Week,
    flags: &InvoiceFlags,
) -> Result<WeeklyDemurrage>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE weekly_demurrage
        SET invoice_generated = COALESCE($3, invoice_generated),
            invoice_sent = COALESCE($4, invoice_sent)
        WHERE company_id = $1 AND week_start = $2
        RETURNING company_id, week_start, total_minutes, event_count,
            invoice_generated, invoice_sent;
        ",
    )
    .bind(company_id.raw())
    .bind(week.start_date())
    .bind(flags.invoice_generated)
    .bind(flags.invoice_sent)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: WeeklyDemurrageRow| row.to_model())
}

pub async fn for_company<'c, E>(
    executor: E,
    company_id: &Id<Company>,
) -> Result<Vec<WeeklyDemurrage>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT company_id, week_start, total_minutes, event_count,
            invoice_generated, invoice_sent
        FROM weekly_demurrage
        WHERE company_id = $1
        ORDER BY week_start DESC;
        ",
    )
    .bind(company_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .into_iter()
    .map(|row: WeeklyDemurrageRow| row.to_model())
    .collect::<Vec<_>>()
    .let_owned(Ok)
}
