use chrono::{DateTime, Duration, Utc};
use model::{
    company::Company,
    demurrage::{Week, WeeklyDemurrage},
    stop_event::{StopEvent, StopEventError},
    tracking::{
        ActiveStopEvent, Annotations, ClosedStopEvent, EndTracking, InvoiceFlags,
        StartTracking, WeekReport,
    },
    vehicle::Vehicle,
    WithId,
};
use serde::Deserialize;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    database::{
        CompanyRepo, Database, DatabaseOperations, DatabaseTransaction, SessionRepo,
        StopEventFilter, StopEventRepo, UserRepo, VehicleRepo, WeeklyDemurrageRepo,
    },
    Caller, RequestError, RequestResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub demurrage_threshold_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub name: String,
    pub license_plate: Option<String>,
}

/// How far a client's clock may run ahead of the server's.
pub const MAX_CLOCK_SKEW: Duration = Duration::minutes(1);

/// How far back a client may date the start or end of a stop. Anything older
/// would let drivers invent stops after the fact.
pub const MAX_BACKDATE: Duration = Duration::minutes(5);

/// Message of the conflict returned when a user already has an open event.
pub const TRACKING_ALREADY_ACTIVE: &str = "Tracking is already active.";

/// Timestamp of a tracking request, checked against the server's clock.
fn request_time(
    requested: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> RequestResult<DateTime<Utc>> {
    let Some(time) = requested else {
        return Ok(now);
    };
    if time > now + MAX_CLOCK_SKEW {
        return Err(RequestError::invalid("The time lies in the future."));
    }
    if time < now - MAX_BACKDATE {
        return Err(RequestError::invalid("The time lies too far in the past."));
    }
    Ok(time)
}

/// Entry point for all operations on the demurrage database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database,
{
    pub database: D,
}

impl<D> Client<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self { database }
    }

    /// Resolves a bearer token to the user and company it belongs to.
    pub async fn authenticate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> RequestResult<Caller> {
        let mut db = self.database.auto();
        let session = db
            .session_by_token(token)
            .await
            .map_err(|why| match RequestError::from(why) {
                RequestError::NotFound => RequestError::Unauthorized,
                other => other,
            })?;
        if session.content.is_expired(now) {
            return Err(RequestError::Unauthorized);
        }
        let user = db.get_user(&session.content.user_id).await?;
        let company = db.get_company(&user.content.company_id).await?;
        Ok(Caller {
            session,
            user,
            company,
        })
    }
}

// company

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_company(&self, caller: &Caller) -> RequestResult<WithId<Company>> {
        Ok(self.database.auto().get_company(&caller.company.id).await?)
    }

    pub async fn update_company(
        &self,
        caller: &Caller,
        update: CompanyUpdate,
    ) -> RequestResult<WithId<Company>> {
        caller.require_admin()?;
        if update
            .demurrage_threshold_minutes
            .is_some_and(|minutes| minutes < 0)
        {
            return Err(RequestError::invalid(
                "The demurrage threshold must not be negative.",
            ));
        }
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(RequestError::invalid("The company name must not be empty."));
        }

        let mut db = self.database.auto();
        let company = db.get_company(&caller.company.id).await?.map(|company| Company {
            name: update.name.unwrap_or(company.name),
            demurrage_threshold_minutes: update
                .demurrage_threshold_minutes
                .unwrap_or(company.demurrage_threshold_minutes),
        });
        log::info!(
            "company {} now uses a demurrage threshold of {} minutes",
            company.id,
            company.content.demurrage_threshold_minutes
        );
        Ok(db.update_company(company).await?)
    }
}

// vehicles

impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_vehicles(&self, caller: &Caller) -> RequestResult<Vec<WithId<Vehicle>>> {
        Ok(self.database.auto().get_vehicles(&caller.company.id).await?)
    }

    /// Vehicles of other companies are reported as not found.
    pub async fn get_vehicle(
        &self,
        caller: &Caller,
        id: &Id<Vehicle>,
    ) -> RequestResult<WithId<Vehicle>> {
        let vehicle = self.database.auto().get_vehicle(id).await?;
        if vehicle.content.company_id != caller.company.id {
            return Err(RequestError::NotFound);
        }
        Ok(vehicle)
    }

    pub async fn add_vehicle(
        &self,
        caller: &Caller,
        vehicle: NewVehicle,
    ) -> RequestResult<WithId<Vehicle>> {
        caller.require_admin()?;
        if vehicle.name.trim().is_empty() {
            return Err(RequestError::invalid("The vehicle name must not be empty."));
        }
        self.database
            .auto()
            .insert_vehicle(Vehicle {
                company_id: caller.company.id,
                name: vehicle.name,
                license_plate: vehicle.license_plate,
                is_active: true,
            })
            .await?
            .let_owned(Ok)
    }
}

// tracking

impl<D> Client<D>
where
    D: Database,
{
    /// Opens a stop event for the caller. At most one event per user may be
    /// open at a time.
    pub async fn start_tracking(
        &self,
        caller: &Caller,
        request: StartTracking,
        now: DateTime<Utc>,
    ) -> RequestResult<WithId<StopEvent>> {
        if let Some(vehicle_id) = &request.vehicle_id {
            self.get_vehicle(caller, vehicle_id).await.map_err(|why| match why {
                RequestError::NotFound => RequestError::invalid("Unknown vehicle."),
                other => other,
            })?;
        }

        let start_time = request_time(request.time, now)?;

        let mut tx = self.database.transaction().await?;
        if tx.open_stop_event(&caller.user.id).await?.is_some() {
            return Err(RequestError::Conflict(TRACKING_ALREADY_ACTIVE.to_owned()));
        }
        let event = StopEvent::open(
            caller.user.id,
            caller.company.id,
            request.vehicle_id,
            start_time,
            request.location,
            request.reason,
        );
        let event = tx.insert_stop_event(event).await.map_err(|why| {
            match RequestError::from(why) {
                RequestError::Conflict(_) => {
                    RequestError::Conflict(TRACKING_ALREADY_ACTIVE.to_owned())
                }
                other => other,
            }
        })?;
        tx.commit().await?;

        log::info!(
            "user {} started stop event {} at {}",
            caller.user.id,
            event.id,
            event.content.start_time
        );
        Ok(event)
    }

    /// Closes the caller's open stop event, flags demurrage against the
    /// company's threshold and, for demurrage events, recomputes the totals of
    /// the week the event started in.
    pub async fn end_tracking(
        &self,
        caller: &Caller,
        request: EndTracking,
        now: DateTime<Utc>,
    ) -> RequestResult<ClosedStopEvent> {
        let end_time = request_time(request.time, now)?;

        let mut tx = self.database.transaction().await?;
        let mut event = tx
            .open_stop_event(&caller.user.id)
            .await?
            .ok_or(RequestError::NotFound)?;
        let company = tx.get_company(&caller.company.id).await?;

        event
            .content
            .close(
                end_time,
                request.location,
                company.content.demurrage_threshold_minutes,
            )
            .map_err(|why| match why {
                StopEventError::AlreadyClosed => RequestError::NotFound,
                StopEventError::EndsBeforeStart => RequestError::invalid(why.to_string()),
            })?;
        if request.notes.is_some() {
            event.content.annotate(request.notes, None);
        }
        let event = tx.update_stop_event(event).await?;

        let weekly = if event.content.is_demurrage {
            Some(
                recompute_week(&mut tx, &company.id, Week::of(event.content.start_time))
                    .await?,
            )
        } else {
            None
        };
        tx.commit().await?;

        log::info!(
            "user {} closed stop event {} after {} minutes (demurrage: {})",
            caller.user.id,
            event.id,
            event.content.duration_minutes,
            event.content.is_demurrage
        );
        Ok(ClosedStopEvent { event, weekly })
    }

    /// The caller's open stop event with duration and demurrage flag refreshed
    /// to `now`. Nothing is written.
    pub async fn get_active(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> RequestResult<Option<ActiveStopEvent>> {
        let mut db = self.database.auto();
        let Some(mut event) = db.open_stop_event(&caller.user.id).await? else {
            return Ok(None);
        };
        let company = db.get_company(&caller.company.id).await?;
        event
            .content
            .refresh(now, company.content.demurrage_threshold_minutes);
        let elapsed = event.content.elapsed(now);
        Ok(Some(ActiveStopEvent { event, elapsed }))
    }

    /// Stop events visible to the caller: drivers see their own, admins see
    /// the whole company.
    pub async fn get_events(
        &self,
        caller: &Caller,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> RequestResult<Vec<WithId<StopEvent>>> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(RequestError::invalid("The range ends before it starts."));
            }
        }
        let filter = StopEventFilter::company(caller.company.id)
            .user((!caller.is_admin()).then_some(caller.user.id))
            .between(start, end);
        Ok(self.database.auto().stop_events(&filter).await?)
    }

    /// Replaces notes and/or photos of a stop event. Everything else about an
    /// event is fixed once it has been closed.
    pub async fn annotate_event(
        &self,
        caller: &Caller,
        id: &Id<StopEvent>,
        annotations: Annotations,
    ) -> RequestResult<WithId<StopEvent>> {
        let mut tx = self.database.transaction().await?;
        let mut event = tx.get_stop_event(id).await?;
        if event.content.company_id != caller.company.id {
            return Err(RequestError::NotFound);
        }
        if event.content.user_id != caller.user.id && !caller.is_admin() {
            return Err(RequestError::Forbidden);
        }
        event
            .content
            .annotate(annotations.notes, annotations.photos);
        let event = tx.update_stop_event(event).await?;
        tx.commit().await?;
        Ok(event)
    }
}

// weekly demurrage

impl<D> Client<D>
where
    D: Database,
{
    /// The stored totals of the week (or empty totals if there were no
    /// demurrage events yet) together with the week's demurrage events.
    pub async fn get_week_report(
        &self,
        caller: &Caller,
        week: Week,
    ) -> RequestResult<WeekReport> {
        let mut db = self.database.auto();
        let weekly = db
            .get_weekly(&caller.company.id, week)
            .await?
            .unwrap_or_else(|| WeeklyDemurrage::empty(caller.company.id, week));
        let events = db
            .stop_events(
                &StopEventFilter::company(caller.company.id)
                    .week(week)
                    .demurrage_only(),
            )
            .await?
            .into_iter()
            .filter(|event| !event.content.is_open())
            .collect();
        Ok(WeekReport { weekly, events })
    }

    pub async fn get_weekly(&self, caller: &Caller) -> RequestResult<Vec<WeeklyDemurrage>> {
        Ok(self
            .database
            .auto()
            .weekly_for_company(&caller.company.id)
            .await?)
    }

    pub async fn set_invoice_flags(
        &self,
        caller: &Caller,
        week: Week,
        flags: InvoiceFlags,
    ) -> RequestResult<WeeklyDemurrage> {
        caller.require_admin()?;
        let mut tx = self.database.transaction().await?;
        if tx.get_weekly(&caller.company.id, week).await?.is_none() {
            // make sure there is a row to flag, even for weeks without demurrage
            recompute_week(&mut tx, &caller.company.id, week).await?;
        }
        let weekly = tx.set_invoice_flags(&caller.company.id, week, &flags).await?;
        tx.commit().await?;
        Ok(weekly)
    }

    /// Rebuilds the totals of a week from scratch.
    pub async fn recompute_week(
        &self,
        caller: &Caller,
        week: Week,
    ) -> RequestResult<WeeklyDemurrage> {
        let mut tx = self.database.transaction().await?;
        let weekly = recompute_week(&mut tx, &caller.company.id, week).await?;
        tx.commit().await?;
        Ok(weekly)
    }
}

/// Full re-scan of the week's demurrage events, summed and stored.
async fn recompute_week<O>(
    db: &mut O,
    company_id: &Id<Company>,
    week: Week,
) -> RequestResult<WeeklyDemurrage>
where
    O: DatabaseOperations + Send,
{
    db.lock_week(company_id, week).await?;
    let events = db
        .stop_events(&StopEventFilter::company(*company_id).week(week).demurrage_only())
        .await?;
    let previous = db.get_weekly(company_id, week).await?;
    let weekly = WeeklyDemurrage::recompute(
        *company_id,
        week,
        events.iter().map(|event| &event.content),
    )
    .keep_invoice_state(previous.as_ref());
    log::debug!(
        "week {} of company {}: {} demurrage events, {} minutes",
        week,
        company_id,
        weekly.event_count,
        weekly.total_minutes
    );
    Ok(db.put_weekly_totals(&weekly).await?)
}
