use async_trait::async_trait;
use demurrage::database::{Result, VehicleRepo};
use model::{company::Company, vehicle::Vehicle, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::vehicle::{get, get_by_company, insert};
use crate::PgDatabaseAutocommit;
use crate::PgDatabaseTransaction;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct VehicleRow {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub license_plate: Option<String>,
    pub is_active: bool,
}

impl DatabaseRow for VehicleRow {
    type Model = Vehicle;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Vehicle {
            company_id: Id::new(self.company_id),
            name: self.name,
            license_plate: self.license_plate,
            is_active: self.is_active,
        }
    }
}

#[async_trait]
impl VehicleRepo for PgDatabaseAutocommit {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        get(&self.pool, id).await
    }

    async fn get_vehicles(
        &mut self,
        company_id: &Id<Company>,
    ) -> Result<Vec<WithId<Vehicle>>> {
        get_by_company(&self.pool, company_id).await
    }

    async fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<WithId<Vehicle>> {
        insert(&self.pool, vehicle).await
    }
}

#[async_trait]
impl<'a> VehicleRepo for PgDatabaseTransaction<'a> {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        get(&mut *self.tx, id).await
    }

    async fn get_vehicles(
        &mut self,
        company_id: &Id<Company>,
    ) -> Result<Vec<WithId<Vehicle>>> {
        get_by_company(&mut *self.tx, company_id).await
    }

    async fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<WithId<Vehicle>> {
        insert(&mut *self.tx, vehicle).await
    }
}
