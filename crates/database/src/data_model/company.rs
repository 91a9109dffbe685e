use async_trait::async_trait;
use demurrage::database::{CompanyRepo, Result};
use model::{company::Company, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::company::{get, insert, update};
use crate::PgDatabaseAutocommit;
use crate::PgDatabaseTransaction;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct CompanyRow {
    pub id: i32,
    pub name: String,
    pub demurrage_threshold_minutes: i32,
}

impl DatabaseRow for CompanyRow {
    type Model = Company;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Company {
            name: self.name,
            demurrage_threshold_minutes: self.demurrage_threshold_minutes,
        }
    }
}

#[async_trait]
impl CompanyRepo for PgDatabaseAutocommit {
    async fn get_company(&mut self, id: &Id<Company>) -> Result<WithId<Company>> {
        get(&self.pool, id).await
    }

    async fn insert_company(&mut self, company: Company) -> Result<WithId<Company>> {
        insert(&self.pool, company).await
    }

    async fn update_company(&mut self, company: WithId<Company>) -> Result<WithId<Company>> {
        update(&self.pool, company).await
    }
}

#[async_trait]
impl<'a> CompanyRepo for PgDatabaseTransaction<'a> {
    async fn get_company(&mut self, id: &Id<Company>) -> Result<WithId<Company>> {
        get(&mut *self.tx, id).await
    }

    async fn insert_company(&mut self, company: Company) -> Result<WithId<Company>> {
        insert(&mut *self.tx, company).await
    }

    async fn update_company(&mut self, company: WithId<Company>) -> Result<WithId<Company>> {
        update(&mut *self.tx, company).await
    }
}
