use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demurrage::database::{Result, StopEventFilter, StopEventRepo};
use model::{
    location::Location,
    stop_event::{StopEvent, StopReason},
    user::User,
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::stop_event::{filtered, get, insert, open_for_user, update};
use crate::PgDatabaseAutocommit;
use crate::PgDatabaseTransaction;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct StopEventRow {
    pub id: i32,
    pub user_id: i32,
    pub company_id: i32,
    pub vehicle_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub duration_minutes: i32,
    pub is_demurrage: bool,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<String>,
}

impl DatabaseRow for StopEventRow {
    type Model = StopEvent;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        StopEvent {
            user_id: Id::new(self.user_id),
            company_id: Id::new(self.company_id),
            vehicle_id: self.vehicle_id.map(Id::new),
            start_time: self.start_time,
            end_time: self.end_time,
            start_location: Location::from_parts(self.start_latitude, self.start_longitude),
            end_location: Location::from_parts(self.end_latitude, self.end_longitude),
            duration_minutes: self.duration_minutes,
            is_demurrage: self.is_demurrage,
            reason: self.reason.as_deref().and_then(StopReason::parse),
            notes: self.notes,
            photos: self.photos,
        }
    }
}

#[async_trait]
impl StopEventRepo for PgDatabaseAutocommit {
    async fn insert_stop_event(&mut self, event: StopEvent) -> Result<WithId<StopEvent>> {
        insert(&self.pool, event).await
    }

    async fn update_stop_event(
        &mut self,
        event: WithId<StopEvent>,
    ) -> Result<WithId<StopEvent>> {
        update(&self.pool, event).await
    }

    async fn get_stop_event(&mut self, id: &Id<StopEvent>) -> Result<WithId<StopEvent>> {
        get(&self.pool, id).await
    }

    async fn open_stop_event(
        &mut self,
        user_id: &Id<User>,
    ) -> Result<Option<WithId<StopEvent>>> {
        open_for_user(&self.pool, user_id).await
    }

    async fn stop_events(
        &mut self,
        filter: &StopEventFilter,
    ) -> Result<Vec<WithId<StopEvent>>> {
        filtered(&self.pool, filter).await
    }
}

#[async_trait]
impl<'a> StopEventRepo for PgDatabaseTransaction<'a> {
    async fn insert_stop_event(&mut self, event: StopEvent) -> Result<WithId<StopEvent>> {
        insert(&mut *self.tx, event).await
    }

    async fn update_stop_event(
        &mut self,
        event: WithId<StopEvent>,
    ) -> Result<WithId<StopEvent>> {
        update(&mut *self.tx, event).await
    }

    async fn get_stop_event(&mut self, id: &Id<StopEvent>) -> Result<WithId<StopEvent>> {
        get(&mut *self.tx, id).await
    }

    async fn open_stop_event(
        &mut self,
        user_id: &Id<User>,
    ) -> Result<Option<WithId<StopEvent>>> {
        open_for_user(&mut *self.tx, user_id).await
    }

    async fn stop_events(
        &mut self,
        filter: &StopEventFilter,
    ) -> Result<Vec<WithId<StopEvent>>> {
        filtered(&mut *self.tx, filter).await
    }
}
