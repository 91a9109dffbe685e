use demurrage::database::{Result, StopEventFilter};
use model::{stop_event::StopEvent, user::User, WithId};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{stop_event::StopEventRow, with_id, with_ids};

use super::convert_error;

const COLUMNS: &str = "
    id, user_id, company_id, vehicle_id, start_time, end_time,
    start_latitude, start_longitude, end_latitude, end_longitude,
    duration_minutes, is_demurrage, reason, notes, photos
";

pub async fn get<'c, E>(executor: E, id: &Id<StopEvent>) -> Result<WithId<StopEvent>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!("SELECT {} FROM stop_events WHERE id = $1;", COLUMNS))
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(|row: StopEventRow| with_id(row))
}

pub async fn open_for_user<'c, E>(
    executor: E,
    user_id: &Id<User>,
) -> Result<Option<WithId<StopEvent>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "SELECT {} FROM stop_events WHERE user_id = $1 AND end_time IS NULL;",
        COLUMNS
    ))
    .bind(user_id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?
    .map(|row: StopEventRow| with_id(row))
    .let_owned(Ok)
}

pub async fn filtered<'c, E>(
    executor: E,
    filter: &StopEventFilter,
) -> Result<Vec<WithId<StopEvent>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "
        SELECT {}
        FROM stop_events
        WHERE company_id = $1
            AND ($2::INTEGER IS NULL OR user_id = $2)
            AND ($3::TIMESTAMPTZ IS NULL OR start_time >= $3)
            AND ($4::TIMESTAMPTZ IS NULL OR start_time < $4)
            AND (NOT $5 OR is_demurrage)
        ORDER BY start_time DESC, id DESC;
        ",
        COLUMNS
    ))
    .bind(filter.company_id.raw())
    .bind(filter.user_id.map(|id| id.raw()))
    .bind(filter.start)
    .bind(filter.end)
    .bind(filter.demurrage_only)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|events: Vec<StopEventRow>| Ok(with_ids(events)))
}

/// Fails with a conflict if the event is open and the user already has an
/// open event, enforced by a partial unique index.
pub async fn insert<'c, E>(executor: E, event: StopEvent) -> Result<WithId<StopEvent>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "
        INSERT INTO stop_events(
            user_id,
            company_id,
            vehicle_id,
            start_time,
            end_time,
            start_latitude,
            start_longitude,
            end_latitude,
            end_longitude,
            duration_minutes,
            is_demurrage,
            reason,
            notes,
            photos
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(event.user_id.raw())
    .bind(event.company_id.raw())
    .bind(event.vehicle_id.map(|id| id.raw()))
    .bind(event.start_time)
    .bind(event.end_time)
    .bind(event.start_location.map(|location| location.latitude))
    .bind(event.start_location.map(|location| location.longitude))
    .bind(event.end_location.map(|location| location.latitude))
    .bind(event.end_location.map(|location| location.longitude))
    .bind(event.duration_minutes)
    .bind(event.is_demurrage)
    .bind(event.reason.map(|reason| reason.as_str()))
    .bind(&event.notes)
    .bind(&event.photos)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: StopEventRow| with_id(row))
}

pub async fn update<'c, E>(
    executor: E,
    event: WithId<StopEvent>,
) -> Result<WithId<StopEvent>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "
        UPDATE stop_events
        SET vehicle_id = $1,
            end_time = $2,
            end_latitude = $3,
            end_longitude = $4,
            duration_minutes = $5,
            is_demurrage = $6,
            reason = $7,
            notes = $8,
            photos = $9
        WHERE id = $10
        RETURNING {};
        ",
        COLUMNS
    ))
    .bind(event.content.vehicle_id.map(|id| id.raw()))
    .bind(event.content.end_time)
    .bind(event.content.end_location.map(|location| location.latitude))
    .bind(event.content.end_location.map(|location| location.longitude))
    .bind(event.content.duration_minutes)
    .bind(event.content.is_demurrage)
    .bind(event.content.reason.map(|reason| reason.as_str()))
    .bind(&event.content.notes)
    .bind(&event.content.photos)
    .bind(event.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: StopEventRow| with_id(row))
}
