//! A demurrage database kept in memory. Used by tests and by the tracker when
//! it runs without a server.

use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use model::{
    company::Company,
    demurrage::{Week, WeeklyDemurrage},
    session::Session,
    stop_event::StopEvent,
    tracking::InvoiceFlags,
    user::{User, UserRole},
    vehicle::Vehicle,
    WithId,
};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use utility::id::{HasId, Id};

use crate::database::{
    CompanyRepo, Database, DatabaseError, DatabaseTransaction, Result, SessionRepo,
    StopEventFilter, StopEventRepo, UserRepo, VehicleRepo, WeeklyDemurrageRepo,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    companies: BTreeMap<i32, Company>,
    users: BTreeMap<i32, User>,
    sessions: BTreeMap<i32, Session>,
    vehicles: BTreeMap<i32, Vehicle>,
    stop_events: BTreeMap<i32, StopEvent>,
    weekly: BTreeMap<(i32, Week), WeeklyDemurrage>,
}

fn next_key<V>(map: &BTreeMap<i32, V>) -> i32 {
    map.keys().next_back().map_or(1, |key| key + 1)
}

fn insert<V>(map: &mut BTreeMap<i32, V>, value: V) -> WithId<V>
where
    V: HasId<IdType = i32> + Clone,
{
    let key = next_key(map);
    map.insert(key, value.clone());
    WithId::new(Id::new(key), value)
}

fn get<V>(map: &BTreeMap<i32, V>, id: &Id<V>) -> Result<WithId<V>>
where
    V: HasId<IdType = i32> + Clone,
{
    map.get(&id.raw())
        .cloned()
        .map(|value| WithId::new(*id, value))
        .ok_or(DatabaseError::NotFound)
}

fn replace<V>(map: &mut BTreeMap<i32, V>, value: WithId<V>) -> Result<WithId<V>>
where
    V: HasId<IdType = i32> + Clone,
{
    match map.get_mut(&value.id.raw()) {
        Some(stored) => {
            *stored = value.content.clone();
            Ok(value)
        }
        None => Err(DatabaseError::NotFound),
    }
}

impl MemoryState {
    fn open_event_key(&self, user_id: &Id<User>) -> Option<i32> {
        self.stop_events
            .iter()
            .find(|(_, event)| event.user_id == *user_id && event.is_open())
            .map(|(key, _)| *key)
    }
}

/// Either the shared state itself or the private copy of a transaction.
pub enum StateGuard<'a> {
    Locked(MutexGuard<'a, MemoryState>),
    Borrowed(&'a mut MemoryState),
}

impl Deref for StateGuard<'_> {
    type Target = MemoryState;

    fn deref(&self) -> &Self::Target {
        match self {
            StateGuard::Locked(guard) => guard,
            StateGuard::Borrowed(state) => state,
        }
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            StateGuard::Locked(guard) => guard,
            StateGuard::Borrowed(state) => state,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a company with one admin and one driver, each holding a
    /// session which never expires.
    pub async fn seed_company(
        &self,
        name: &str,
        threshold_minutes: i32,
        now: DateTime<Utc>,
    ) -> Result<SeededCompany> {
        let mut tx = self.transaction().await?;
        let company = tx
            .insert_company(Company::new(name).with_threshold(threshold_minutes))
            .await?;
        let mut tokens = Vec::with_capacity(2);
        for role in [UserRole::Admin, UserRole::Driver] {
            let user = tx
                .insert_user(User {
                    company_id: company.id,
                    name: format!("{} {}", name, role.as_str()),
                    email: format!("{}@company-{}.example", role.as_str(), company.id),
                    role,
                })
                .await?;
            let token = format!("{}-{}-{}", role.as_str(), company.id, user.id);
            tx.insert_session(Session {
                user_id: user.id,
                token: token.clone(),
                created_at: now,
                expires_at: None,
            })
            .await?;
            tokens.push(token);
        }
        tx.commit().await?;

        let driver_token = tokens.pop().unwrap_or_default();
        let admin_token = tokens.pop().unwrap_or_default();
        Ok(SeededCompany {
            company,
            admin_token,
            driver_token,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SeededCompany {
    pub company: WithId<Company>,
    pub admin_token: String,
    pub driver_token: String,
}

/// Every operation locks the shared state on its own.
#[derive(Debug)]
pub struct MemoryAutocommit {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAutocommit {
    async fn state(&mut self) -> StateGuard<'_> {
        StateGuard::Locked(self.state.lock().await)
    }
}

/// Holds the lock for its whole lifetime and works on a copy, which replaces
/// the shared state on commit. Dropping the transaction discards the copy.
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTransaction {
    async fn state(&mut self) -> StateGuard<'_> {
        StateGuard::Borrowed(&mut self.working)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;
    type Autocommit = MemoryAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction { guard, working })
    }

    fn auto(&self) -> Self::Autocommit {
        MemoryAutocommit {
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn commit(mut self) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }
}

macro_rules! impl_memory_repos {
    ($connection:ty) => {
        #[async_trait]
        impl CompanyRepo for $connection {
            async fn get_company(&mut self, id: &Id<Company>) -> Result<WithId<Company>> {
                get(&self.state().await.companies, id)
            }

            async fn insert_company(&mut self, company: Company) -> Result<WithId<Company>> {
                Ok(insert(&mut self.state().await.companies, company))
            }

            async fn update_company(
                &mut self,
                company: WithId<Company>,
            ) -> Result<WithId<Company>> {
                replace(&mut self.state().await.companies, company)
            }
        }

        #[async_trait]
        impl UserRepo for $connection {
            async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
                get(&self.state().await.users, id)
            }

            async fn insert_user(&mut self, user: User) -> Result<WithId<User>> {
                let mut state = self.state().await;
                if !state.companies.contains_key(&user.company_id.raw()) {
                    return Err(DatabaseError::NotFound);
                }
                if state.users.values().any(|other| other.email == user.email) {
                    return Err(DatabaseError::Conflict);
                }
                Ok(insert(&mut state.users, user))
            }
        }

        #[async_trait]
        impl SessionRepo for $connection {
            async fn session_by_token(&mut self, token: &str) -> Result<WithId<Session>> {
                self.state()
                    .await
                    .sessions
                    .iter()
                    .find(|(_, session)| session.token == token)
                    .map(|(key, session)| WithId::new(Id::new(*key), session.clone()))
                    .ok_or(DatabaseError::NotFound)
            }

            async fn insert_session(&mut self, session: Session) -> Result<WithId<Session>> {
                let mut state = self.state().await;
                if state.sessions.values().any(|other| other.token == session.token) {
                    return Err(DatabaseError::Conflict);
                }
                Ok(insert(&mut state.sessions, session))
            }
        }

        #[async_trait]
        impl VehicleRepo for $connection {
            async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
                get(&self.state().await.vehicles, id)
            }

            async fn get_vehicles(
                &mut self,
                company_id: &Id<Company>,
            ) -> Result<Vec<WithId<Vehicle>>> {
                Ok(self
                    .state()
                    .await
                    .vehicles
                    .iter()
                    .filter(|(_, vehicle)| vehicle.company_id == *company_id)
                    .map(|(key, vehicle)| WithId::new(Id::new(*key), vehicle.clone()))
                    .collect())
            }

            async fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<WithId<Vehicle>> {
                Ok(insert(&mut self.state().await.vehicles, vehicle))
            }
        }

        #[async_trait]
        impl StopEventRepo for $connection {
            async fn insert_stop_event(
                &mut self,
                event: StopEvent,
            ) -> Result<WithId<StopEvent>> {
                let mut state = self.state().await;
                if event.is_open() && state.open_event_key(&event.user_id).is_some() {
                    return Err(DatabaseError::Conflict);
                }
                Ok(insert(&mut state.stop_events, event))
            }

            async fn update_stop_event(
                &mut self,
                event: WithId<StopEvent>,
            ) -> Result<WithId<StopEvent>> {
                let mut state = self.state().await;
                if event.content.is_open() {
                    let open = state.open_event_key(&event.content.user_id);
                    if open.is_some_and(|key| key != event.id.raw()) {
                        return Err(DatabaseError::Conflict);
                    }
                }
                replace(&mut state.stop_events, event)
            }

            async fn get_stop_event(
                &mut self,
                id: &Id<StopEvent>,
            ) -> Result<WithId<StopEvent>> {
                get(&self.state().await.stop_events, id)
            }

            async fn open_stop_event(
                &mut self,
                user_id: &Id<User>,
            ) -> Result<Option<WithId<StopEvent>>> {
                let state = self.state().await;
                Ok(state.open_event_key(user_id).and_then(|key| {
                    state
                        .stop_events
                        .get(&key)
                        .map(|event| WithId::new(Id::new(key), event.clone()))
                }))
            }

            async fn stop_events(
                &mut self,
                filter: &StopEventFilter,
            ) -> Result<Vec<WithId<StopEvent>>> {
                Ok(self
                    .state()
                    .await
                    .stop_events
                    .iter()
                    .filter(|(_, event)| filter.matches(event))
                    .map(|(key, event)| WithId::new(Id::new(*key), event.clone()))
                    .sorted_by(|a, b| {
                        b.content
                            .start_time
                            .cmp(&a.content.start_time)
                            .then(b.id.raw().cmp(&a.id.raw()))
                    })
                    .collect())
            }
        }

        #[async_trait]
        impl WeeklyDemurrageRepo for $connection {
            async fn get_weekly(
                &mut self,
                company_id: &Id<Company>,
                week: Week,
            ) -> Result<Option<WeeklyDemurrage>> {
                Ok(self
                    .state()
                    .await
                    .weekly
                    .get(&(company_id.raw(), week))
                    .cloned())
            }

            async fn lock_week(&mut self, _: &Id<Company>, _: Week) -> Result<()> {
                // transactions already hold the whole state
                Ok(())
            }

            async fn put_weekly_totals(
                &mut self,
                weekly: &WeeklyDemurrage,
            ) -> Result<WeeklyDemurrage> {
                let mut state = self.state().await;
                let key = (weekly.company_id.raw(), weekly.week_start);
                let stored = state
                    .weekly
                    .entry(key)
                    .or_insert_with(|| weekly.clone());
                stored.total_minutes = weekly.total_minutes;
                stored.event_count = weekly.event_count;
                Ok(stored.clone())
            }

            async fn set_invoice_flags(
                &mut self,
                company_id: &Id<Company>,
                week: Week,
                flags: &InvoiceFlags,
            ) -> Result<WeeklyDemurrage> {
                let mut state = self.state().await;
                let stored = state
                    .weekly
                    .get_mut(&(company_id.raw(), week))
                    .ok_or(DatabaseError::NotFound)?;
                if let Some(generated) = flags.invoice_generated {
                    stored.invoice_generated = generated;
                }
                if let Some(sent) = flags.invoice_sent {
                    stored.invoice_sent = sent;
                }
                Ok(stored.clone())
            }

            async fn weekly_for_company(
                &mut self,
                company_id: &Id<Company>,
            ) -> Result<Vec<WeeklyDemurrage>> {
                Ok(self
                    .state()
                    .await
                    .weekly
                    .values()
                    .rev()
                    .filter(|weekly| weekly.company_id == *company_id)
                    .cloned()
                    .collect())
            }
        }
    };
}

impl_memory_repos!(MemoryAutocommit);
impl_memory_repos!(MemoryTransaction);

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn open_event(user: i32, minute: u32) -> StopEvent {
        StopEvent::open(
            Id::new(user),
            Id::new(1),
            None,
            Utc.with_ymd_and_hms(2024, 5, 13, 8, minute, 0).unwrap(),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn second_open_event_conflicts() {
        let db = MemoryDatabase::new();
        let mut auto = db.auto();
        auto.insert_stop_event(open_event(1, 0)).await.unwrap();
        assert!(matches!(
            auto.insert_stop_event(open_event(1, 5)).await,
            Err(DatabaseError::Conflict)
        ));
        // other users are unaffected
        auto.insert_stop_event(open_event(2, 5)).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let db = MemoryDatabase::new();
        {
            let mut tx = db.transaction().await.unwrap();
            tx.insert_company(Company::new("Rollback Haulage"))
                .await
                .unwrap();
        }
        let mut auto = db.auto();
        assert!(matches!(
            auto.get_company(&Id::new(1)).await,
            Err(DatabaseError::NotFound)
        ));

        let mut tx = db.transaction().await.unwrap();
        let company = tx.insert_company(Company::new("Commit Haulage")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(
            auto.get_company(&company.id).await.unwrap().content.name,
            "Commit Haulage"
        );
    }

    #[tokio::test]
    async fn weekly_totals_keep_invoice_flags() {
        let db = MemoryDatabase::new();
        let mut auto = db.auto();
        let week = Week::of(Utc.with_ymd_and_hms(2024, 5, 13, 8, 0, 0).unwrap());
        let mut weekly = WeeklyDemurrage::empty(Id::new(1), week);
        weekly.total_minutes = 51;
        weekly.event_count = 1;
        auto.put_weekly_totals(&weekly).await.unwrap();
        auto.set_invoice_flags(
            &Id::new(1),
            week,
            &InvoiceFlags {
                invoice_generated: Some(true),
                invoice_sent: None,
            },
        )
        .await
        .unwrap();

        weekly.total_minutes = 120;
        weekly.event_count = 2;
        let stored = auto.put_weekly_totals(&weekly).await.unwrap();
        assert_eq!(stored.total_minutes, 120);
        assert!(stored.invoice_generated);
        assert!(!stored.invoice_sent);
    }
}
