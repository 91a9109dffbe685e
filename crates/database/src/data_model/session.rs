use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demurrage::database::{Result, SessionRepo};
use model::{session::Session, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::session::{by_token, insert};
use crate::PgDatabaseAutocommit;
use crate::PgDatabaseTransaction;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DatabaseRow for SessionRow {
    type Model = Session;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Session {
            user_id: Id::new(self.user_id),
            token: self.token,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[async_trait]
impl SessionRepo for PgDatabaseAutocommit {
    async fn session_by_token(&mut self, token: &str) -> Result<WithId<Session>> {
        by_token(&self.pool, token).await
    }

    async fn insert_session(&mut self, session: Session) -> Result<WithId<Session>> {
        insert(&self.pool, session).await
    }
}

#[async_trait]
impl<'a> SessionRepo for PgDatabaseTransaction<'a> {
    async fn session_by_token(&mut self, token: &str) -> Result<WithId<Session>> {
        by_token(&mut *self.tx, token).await
    }

    async fn insert_session(&mut self, session: Session) -> Result<WithId<Session>> {
        insert(&mut *self.tx, session).await
    }
}
