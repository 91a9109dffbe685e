use std::{error, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    company::Company,
    demurrage::{Week, WeeklyDemurrage},
    session::Session,
    stop_event::StopEvent,
    tracking::InvoiceFlags,
    user::User,
    vehicle::Vehicle,
    WithId,
};
use thiserror::Error;
use utility::id::Id;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("entry not found")]
    NotFound,
    /// A uniqueness constraint was violated, e.g. a second open stop event.
    #[error("conflicting entry")]
    Conflict,
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

pub type Result<T> = result::Result<T, DatabaseError>;

/// Selects stop events of one company. All other criteria are optional.
#[derive(Debug, Clone)]
pub struct StopEventFilter {
    pub company_id: Id<Company>,
    pub user_id: Option<Id<User>>,
    /// Inclusive lower bound on the start time.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the start time.
    pub end: Option<DateTime<Utc>>,
    pub demurrage_only: bool,
}

impl StopEventFilter {
    pub fn company(company_id: Id<Company>) -> Self {
        Self {
            company_id,
            user_id: None,
            start: None,
            end: None,
            demurrage_only: false,
        }
    }

    pub fn user(mut self, user_id: Option<Id<User>>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn between(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn week(self, week: Week) -> Self {
        self.between(Some(week.start()), Some(week.end()))
    }

    pub fn demurrage_only(mut self) -> Self {
        self.demurrage_only = true;
        self
    }

    pub fn matches(&self, event: &StopEvent) -> bool {
        event.company_id == self.company_id
            && self.user_id.map_or(true, |user| event.user_id == user)
            && self.start.map_or(true, |start| event.start_time >= start)
            && self.end.map_or(true, |end| event.start_time < end)
            && (!self.demurrage_only || event.is_demurrage)
    }
}

#[async_trait]
pub trait CompanyRepo {
    async fn get_company(&mut self, id: &Id<Company>) -> Result<WithId<Company>>;
    async fn insert_company(&mut self, company: Company) -> Result<WithId<Company>>;
    async fn update_company(
        &mut self,
        company: WithId<Company>,
    ) -> Result<WithId<Company>>;
}

#[async_trait]
pub trait UserRepo {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>>;
    async fn insert_user(&mut self, user: User) -> Result<WithId<User>>;
}

#[async_trait]
pub trait SessionRepo {
    async fn session_by_token(&mut self, token: &str) -> Result<WithId<Session>>;
    async fn insert_session(&mut self, session: Session) -> Result<WithId<Session>>;
}

#[async_trait]
pub trait VehicleRepo {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>>;
    async fn get_vehicles(
        &mut self,
        company_id: &Id<Company>,
    ) -> Result<Vec<WithId<Vehicle>>>;
    async fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<WithId<Vehicle>>;
}

#[async_trait]
pub trait StopEventRepo {
    /// Fails with `DatabaseError::Conflict` if the event is open and the user
    /// already has an open event.
    async fn insert_stop_event(
        &mut self,
        event: StopEvent,
    ) -> Result<WithId<StopEvent>>;

    async fn update_stop_event(
        &mut self,
        event: WithId<StopEvent>,
    ) -> Result<WithId<StopEvent>>;

    async fn get_stop_event(&mut self, id: &Id<StopEvent>) -> Result<WithId<StopEvent>>;

    /// The event of the user with no end time, if any.
    async fn open_stop_event(
        &mut self,
        user_id: &Id<User>,
    ) -> Result<Option<WithId<StopEvent>>>;

    /// Matching events ordered by start time, most recent first.
    async fn stop_events(
        &mut self,
        filter: &StopEventFilter,
    ) -> Result<Vec<WithId<StopEvent>>>;
}

#[async_trait]
pub trait WeeklyDemurrageRepo {
    async fn get_weekly(
        &mut self,
        company_id: &Id<Company>,
        week: Week,
    ) -> Result<Option<WeeklyDemurrage>>;

    /// Serializes recomputations of the same company and week. Held until the
    /// surrounding transaction ends; a no-op outside of transactions.
    async fn lock_week(&mut self, company_id: &Id<Company>, week: Week) -> Result<()>;

    /// Inserts or overwrites the totals of a week. Invoice flags of an existing
    /// row are left untouched.
    async fn put_weekly_totals(
        &mut self,
        weekly: &WeeklyDemurrage,
    ) -> Result<WeeklyDemurrage>;

    /// Updates the given flags of an existing row.
    async fn set_invoice_flags(
        &mut self,
        company_id: &Id<Company>,
        week: Week,
        flags: &InvoiceFlags,
    ) -> Result<WeeklyDemurrage>;

    /// All aggregates of a company, most recent week first.
    async fn weekly_for_company(
        &mut self,
        company_id: &Id<Company>,
    ) -> Result<Vec<WeeklyDemurrage>>;
}

pub trait DatabaseOperations:
    CompanyRepo + UserRepo + SessionRepo + VehicleRepo + StopEventRepo + WeeklyDemurrageRepo
{
}

impl<T> DatabaseOperations for T where
    T: CompanyRepo
        + UserRepo
        + SessionRepo
        + VehicleRepo
        + StopEventRepo
        + WeeklyDemurrageRepo
{
}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

/// Trait to implement a demurrage database.
/// Multiple concurrent accesses should be possible by cloning the database object.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseOperations + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}
