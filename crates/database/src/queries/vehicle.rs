use demurrage::database::Result;
use model::{company::Company, vehicle::Vehicle, WithId};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{vehicle::VehicleRow, with_id, with_ids};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Vehicle>) -> Result<WithId<Vehicle>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, name, license_plate, is_active
        FROM vehicles
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: VehicleRow| with_id(row))
}

pub async fn get_by_company<'c, E>(
    executor: E,
    company_id: &Id<Company>,
) -> Result<Vec<WithId<Vehicle>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, company_id, name, license_plate, is_active
        FROM vehicles
        WHERE company_id = $1
        ORDER BY id ASC;
        ",
    )
    .bind(company_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|vehicles: Vec<VehicleRow>| Ok(with_ids(vehicles)))
}

pub async fn insert<'c, E>(executor: E, vehicle: Vehicle) -> Result<WithId<Vehicle>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO vehicles(
            company_id,
            name,
            license_plate,
            is_active
        )
        VALUES ($1, $2, $3, $4)
        RETURNING id, company_id, name, license_plate, is_active;
        ",
    )
    .bind(vehicle.company_id.raw())
    .bind(&vehicle.name)
    .bind(&vehicle.license_plate)
    .bind(vehicle.is_active)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: VehicleRow| with_id(row))
}
