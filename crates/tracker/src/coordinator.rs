//! The actor which turns motion transitions into stop events.
//!
//! All state lives in one place: the classifier, the open event and the two
//! timers (debounce and live refresh). Timers are owned by the coordinator and
//! cancelled by dropping their handles, which happens in [`Coordinator::teardown`]
//! when tracking ends or the actor stops.

use std::sync::Arc;

use actors::{
    actor::Actor,
    actor_ref::{ActorRef, WeakActorRef},
    handler::{Handler, Message},
    run,
    timer::{schedule_interval, schedule_once, TimerHandle},
};
use async_trait::async_trait;
use model::{
    motion::MotionState,
    stop_event::{StopEvent, StopReason},
    tracking::{ActiveStopEvent, ClosedStopEvent, EndTracking, StartTracking},
    WithId,
};
use serde::Serialize;
use tokio::time::Instant;

use crate::{
    backend::TrackingBackend,
    clock::Clock,
    config::TrackerConfig,
    error::{Result, TrackerError},
    motion::{Motion, MotionClassifier, Transition},
    sample::SensorSample,
};

pub struct Sample(pub SensorSample);

impl Message for Sample {
    type Response = ();
}

pub struct DebounceElapsed {
    pub deadline: Instant,
}

impl Message for DebounceElapsed {
    type Response = ();
}

pub struct RefreshTick;

impl Message for RefreshTick {
    type Response = ();
}

/// Reason attached to the next automatically opened stop event.
pub struct SetReason(pub Option<StopReason>);

impl Message for SetReason {
    type Response = ();
}

pub struct StartManual {
    pub reason: Option<StopReason>,
}

impl Message for StartManual {
    type Response = Result<WithId<StopEvent>>;
}

pub struct StopManual {
    pub notes: Option<String>,
}

impl Message for StopManual {
    type Response = Result<ClosedStopEvent>;
}

/// Picks up a stop event which is still open on the server.
pub struct Resume;

impl Message for Resume {
    type Response = Result<Option<WithId<StopEvent>>>;
}

pub struct GetSnapshot;

impl Message for GetSnapshot {
    type Response = TrackerSnapshot;
}

/// Cancels all timers and forgets the open event, which stays open on the
/// server and can be picked up again with [`Resume`].
pub struct Shutdown;

impl Message for Shutdown {
    type Response = ();
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub motion: MotionState,
    pub phase: &'static str,
    pub active: Option<ActiveStopEvent>,
    pub next_reason: Option<StopReason>,
    pub last_closed: Option<ClosedStopEvent>,
    pub timers_running: usize,
}

pub struct Coordinator<B: TrackingBackend> {
    config: TrackerConfig,
    clock: Clock,
    backend: Arc<B>,
    classifier: MotionClassifier,
    myself: Option<WeakActorRef<Self>>,
    active: Option<ActiveStopEvent>,
    next_reason: Option<StopReason>,
    last_closed: Option<ClosedStopEvent>,
    debounce: Option<TimerHandle>,
    refresh: Option<TimerHandle>,
}

impl<B: TrackingBackend> Coordinator<B> {
    pub fn new(config: TrackerConfig, backend: Arc<B>, clock: Clock) -> Self {
        Self {
            classifier: MotionClassifier::new(config.clone(), clock.now()),
            config,
            clock,
            backend,
            myself: None,
            active: None,
            next_reason: None,
            last_closed: None,
            debounce: None,
            refresh: None,
        }
    }

    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            motion: self.classifier.state(),
            phase: self.classifier.phase().name(),
            active: self.active.clone(),
            next_reason: self.next_reason,
            last_closed: self.last_closed.clone(),
            timers_running: self.debounce.iter().chain(self.refresh.iter()).count(),
        }
    }

    async fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Unchanged => {}
            Transition::DebounceStarted { deadline } => {
                let delay = deadline.saturating_duration_since(Instant::now());
                self.debounce = self
                    .myself
                    .clone()
                    .map(|myself| schedule_once(myself, delay, DebounceElapsed { deadline }));
            }
            Transition::DebounceCancelled => self.debounce = None,
            Transition::Became(motion) => {
                self.debounce = None;
                log::info!("motion changed to {:?}", motion);
                self.on_motion(motion).await;
            }
        }
    }

    async fn on_motion(&mut self, motion: Motion) {
        match motion {
            Motion::Stopped if self.active.is_none() => {
                if let Err(why) = self.open(None).await {
                    log::error!("could not open stop event: {}", why);
                }
            }
            Motion::Moving if self.active.is_some() => {
                if let Err(why) = self.close(None).await {
                    log::error!("could not close stop event: {}", why);
                }
            }
            _ => {}
        }
    }

    async fn open(&mut self, reason: Option<StopReason>) -> Result<WithId<StopEvent>> {
        if self.active.is_some() {
            return Err(TrackerError::AlreadyTracking);
        }
        let request = StartTracking {
            vehicle_id: self.config.vehicle_id,
            location: self.classifier.last_location(),
            reason: reason.or_else(|| self.next_reason.take()),
            time: Some(self.clock.now()),
        };
        let event = match self.backend.start(request).await {
            Ok(event) => event,
            Err(why) if why.is_conflict() => match self.backend.active().await? {
                Some(active) => {
                    log::warn!("adopting stop event {} which was already open", active.event.id);
                    active.event
                }
                None => return Err(why),
            },
            Err(why) => return Err(why),
        };
        log::info!("opened stop event {}", event.id);
        self.track(event.clone());
        Ok(event)
    }

    async fn close(&mut self, notes: Option<String>) -> Result<ClosedStopEvent> {
        if self.active.is_none() {
            return Err(TrackerError::NotTracking);
        }
        let request = EndTracking {
            location: self.classifier.last_location(),
            time: Some(self.clock.now()),
            notes,
        };
        let closed = match self.backend.end(request).await {
            Ok(closed) => closed,
            Err(why) if why.is_not_found() => {
                log::warn!("stop event was closed elsewhere");
                self.teardown();
                return Err(TrackerError::NotTracking);
            }
            Err(why) => return Err(why),
        };
        self.teardown();

        let event = &closed.event;
        if event.content.is_demurrage {
            log::warn!(
                "stop event {} lasted {} minutes and counts as demurrage",
                event.id,
                event.content.duration_minutes
            );
        } else {
            log::info!(
                "closed stop event {} after {} minutes",
                event.id,
                event.content.duration_minutes
            );
        }
        self.last_closed = Some(closed.clone());
        Ok(closed)
    }

    fn track(&mut self, event: WithId<StopEvent>) {
        let elapsed = event.content.elapsed(self.clock.now());
        self.active = Some(ActiveStopEvent { event, elapsed });
        self.refresh = self
            .myself
            .clone()
            .map(|myself| schedule_interval(myself, self.config.refresh_period, || RefreshTick));
    }

    /// Forgets the open event and cancels every timer.
    fn teardown(&mut self) {
        self.active = None;
        self.debounce = None;
        self.refresh = None;
    }
}

impl<B: TrackingBackend> Actor for Coordinator<B> {
    fn started(&mut self, myself: WeakActorRef<Self>) {
        self.myself = Some(myself);
    }

    fn stopped(&mut self) {
        self.teardown();
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<Sample> for Coordinator<B> {
    async fn handle(&mut self, Sample(sample): Sample) {
        self.classifier.record(&sample, self.clock.now());
        let transition = self.classifier.evaluate(Instant::now());
        self.apply(transition).await;
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<DebounceElapsed> for Coordinator<B> {
    async fn handle(&mut self, message: DebounceElapsed) {
        let transition = self.classifier.deadline_reached(message.deadline);
        if transition == Transition::Unchanged {
            log::debug!("ignoring deadline of a cancelled debounce");
        }
        self.apply(transition).await;
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<RefreshTick> for Coordinator<B> {
    async fn handle(&mut self, _: RefreshTick) {
        if self.active.is_none() {
            self.refresh = None;
            return;
        }
        match self.backend.active().await {
            Ok(Some(active)) => {
                log::debug!(
                    "stop event {} open for {} minutes",
                    active.event.id,
                    active.elapsed.num_minutes()
                );
                self.active = Some(active);
            }
            Ok(None) => {
                log::warn!("stop event was closed elsewhere");
                self.teardown();
            }
            Err(why) => {
                log::warn!("could not refresh stop event: {}", why);
                let now = self.clock.now();
                if let Some(active) = &mut self.active {
                    active.elapsed = active.event.content.elapsed(now);
                }
            }
        }
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<SetReason> for Coordinator<B> {
    async fn handle(&mut self, SetReason(reason): SetReason) {
        self.next_reason = reason;
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<StartManual> for Coordinator<B> {
    async fn handle(&mut self, message: StartManual) -> Result<WithId<StopEvent>> {
        self.open(message.reason).await
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<StopManual> for Coordinator<B> {
    async fn handle(&mut self, message: StopManual) -> Result<ClosedStopEvent> {
        self.close(message.notes).await
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<Resume> for Coordinator<B> {
    async fn handle(&mut self, _: Resume) -> Result<Option<WithId<StopEvent>>> {
        if let Some(active) = &self.active {
            return Ok(Some(active.event.clone()));
        }
        let Some(active) = self.backend.active().await? else {
            return Ok(None);
        };
        log::info!("resuming stop event {}", active.event.id);
        let event = active.event.clone();
        self.track(active.event);
        Ok(Some(event))
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<GetSnapshot> for Coordinator<B> {
    async fn handle(&mut self, _: GetSnapshot) -> TrackerSnapshot {
        self.snapshot()
    }
}

#[async_trait]
impl<B: TrackingBackend> Handler<Shutdown> for Coordinator<B> {
    async fn handle(&mut self, _: Shutdown) {
        self.teardown();
    }
}

/// Starts a coordinator. It stops once the last reference is dropped.
pub fn spawn<B: TrackingBackend>(
    config: TrackerConfig,
    backend: Arc<B>,
    clock: Clock,
) -> ActorRef<Coordinator<B>> {
    run(move || Coordinator::new(config.clone(), backend.clone(), clock))
}

#[async_trait]
pub trait CoordinatorRef {
    async fn sample(&self, sample: SensorSample) -> Result<()>;
    async fn set_reason(&self, reason: Option<StopReason>) -> Result<()>;
    async fn start_manual(&self, reason: Option<StopReason>) -> Result<WithId<StopEvent>>;
    async fn stop_manual(&self, notes: Option<String>) -> Result<ClosedStopEvent>;
    async fn resume(&self) -> Result<Option<WithId<StopEvent>>>;
    async fn snapshot(&self) -> Result<TrackerSnapshot>;
    async fn shutdown(&self) -> Result<()>;
}

#[async_trait]
impl<B: TrackingBackend> CoordinatorRef for ActorRef<Coordinator<B>> {
    async fn sample(&self, sample: SensorSample) -> Result<()> {
        Ok(self.tell(Sample(sample)).await?)
    }

    async fn set_reason(&self, reason: Option<StopReason>) -> Result<()> {
        Ok(self.ask(SetReason(reason)).await?)
    }

    async fn start_manual(&self, reason: Option<StopReason>) -> Result<WithId<StopEvent>> {
        self.ask(StartManual { reason }).await?
    }

    async fn stop_manual(&self, notes: Option<String>) -> Result<ClosedStopEvent> {
        self.ask(StopManual { notes }).await?
    }

    async fn resume(&self) -> Result<Option<WithId<StopEvent>>> {
        self.ask(Resume).await?
    }

    async fn snapshot(&self) -> Result<TrackerSnapshot> {
        Ok(self.ask(GetSnapshot).await?)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(self.ask(Shutdown).await?)
    }
}
