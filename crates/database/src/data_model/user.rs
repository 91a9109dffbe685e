use async_trait::async_trait;
use demurrage::database::{Result, UserRepo};
use model::{
    user::{User, UserRole},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::user::{get, insert};
use crate::PgDatabaseAutocommit;
use crate::PgDatabaseTransaction;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl DatabaseRow for UserRow {
    type Model = User;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        User {
            company_id: Id::new(self.company_id),
            name: self.name,
            email: self.email,
            // the column is constrained, anything unknown gets the least privileges
            role: UserRole::parse(&self.role).unwrap_or(UserRole::Driver),
        }
    }
}

#[async_trait]
impl UserRepo for PgDatabaseAutocommit {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        get(&self.pool, id).await
    }

    async fn insert_user(&mut self, user: User) -> Result<WithId<User>> {
        insert(&self.pool, user).await
    }
}

#[async_trait]
impl<'a> UserRepo for PgDatabaseTransaction<'a> {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        get(&mut *self.tx, id).await
    }

    async fn insert_user(&mut self, user: User) -> Result<WithId<User>> {
        insert(&mut *self.tx, user).await
    }
}
