use std::sync::Arc;

use actors::actor_ref::ActorRef;
use chrono::Utc;
use demurrage::{client::Client, memory::MemoryDatabase, Caller};
use model::{stop_event::StopReason, tracking::StartTracking};
use tokio::time::{self, Duration};
use tracker::{
    backend::LocalBackend,
    clock::Clock,
    config::TrackerConfig,
    coordinator::{self, Coordinator, CoordinatorRef},
    error::TrackerError,
    replay::replay,
    sample::SensorSample,
};

type Tracker = ActorRef<Coordinator<LocalBackend<MemoryDatabase>>>;

struct Setup {
    tracker: Tracker,
    client: Client<MemoryDatabase>,
    driver: Caller,
    clock: Clock,
}

async fn setup() -> Setup {
    let clock = Clock::new();
    let database = MemoryDatabase::new();
    let seeded = database
        .seed_company("Kieler Kühltransporte", 50, clock.now())
        .await
        .unwrap();
    let client = Client::new(database);
    let driver = client
        .authenticate(&seeded.driver_token, clock.now())
        .await
        .unwrap();
    let backend = LocalBackend::new(client.clone(), driver.clone(), clock);
    let tracker = coordinator::spawn(TrackerConfig::default(), Arc::new(backend), clock);
    Setup {
        tracker,
        client,
        driver,
        clock,
    }
}

/// Sends one GPS fix per second.
async fn drive(tracker: &Tracker, speed: f64, seconds: u64) {
    for _ in 0..seconds {
        tracker
            .sample(SensorSample::gps(54.3233, 10.1228, Some(speed)))
            .await
            .unwrap();
        time::sleep(Duration::from_secs(1)).await;
    }
}

/// Drives until the classifier settles on moving.
async fn get_moving(tracker: &Tracker) {
    drive(tracker, 10.0, 10).await;
    assert_eq!(tracker.snapshot().await.unwrap().phase, "moving");
}

#[tokio::test(start_paused = true)]
async fn sustained_standstill_opens_a_stop_event() {
    let setup = setup().await;
    get_moving(&setup.tracker).await;

    drive(&setup.tracker, 0.0, 15).await;
    let snapshot = setup.tracker.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, "pending_stopped");
    assert!(snapshot.active.is_none());

    drive(&setup.tracker, 0.0, 5).await;
    let snapshot = setup.tracker.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, "stopped");
    assert!(!snapshot.motion.is_moving);
    let active = snapshot.active.unwrap();
    assert!(active.event.content.start_location.is_some());
    assert!(active.event.content.is_open());

    let stored = setup
        .client
        .get_active(&setup.driver, setup.clock.now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.event.id, active.event.id);
}

#[tokio::test(start_paused = true)]
async fn long_stop_is_closed_as_demurrage_when_driving_on() {
    let setup = setup().await;
    get_moving(&setup.tracker).await;
    drive(&setup.tracker, 0.0, 20).await;
    assert!(setup.tracker.snapshot().await.unwrap().active.is_some());

    time::sleep(Duration::from_secs(51 * 60)).await;
    let active = setup.tracker.snapshot().await.unwrap().active.unwrap();
    assert!(active.elapsed.num_minutes() >= 50);

    drive(&setup.tracker, 10.0, 8).await;
    let snapshot = setup.tracker.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, "moving");
    assert!(snapshot.active.is_none());
    assert_eq!(snapshot.timers_running, 0);

    let closed = snapshot.last_closed.unwrap();
    assert!(closed.event.content.is_demurrage);
    assert!(closed.event.content.duration_minutes >= 51);
    let weekly = closed.weekly.unwrap();
    assert_eq!(weekly.event_count, 1);
    assert_eq!(
        weekly.total_minutes,
        i64::from(closed.event.content.duration_minutes)
    );
}

#[tokio::test(start_paused = true)]
async fn short_standstill_is_not_a_stop() {
    let setup = setup().await;
    get_moving(&setup.tracker).await;

    drive(&setup.tracker, 0.0, 12).await;
    drive(&setup.tracker, 10.0, 10).await;
    // the deadline of the cancelled debounce passes as well
    time::sleep(Duration::from_secs(20)).await;

    let snapshot = setup.tracker.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, "moving");
    assert!(snapshot.active.is_none());
    let events = setup
        .client
        .get_events(&setup.driver, None, None)
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn driver_supplied_reason_tags_the_next_stop() {
    let setup = setup().await;
    setup
        .tracker
        .set_reason(Some(StopReason::Unloading))
        .await
        .unwrap();
    get_moving(&setup.tracker).await;
    drive(&setup.tracker, 0.0, 20).await;

    let active = setup.tracker.snapshot().await.unwrap().active.unwrap();
    assert_eq!(active.event.content.reason, Some(StopReason::Unloading));
    assert_eq!(setup.tracker.snapshot().await.unwrap().next_reason, None);
}

#[tokio::test(start_paused = true)]
async fn manual_start_and_stop() {
    let setup = setup().await;
    let event = setup
        .tracker
        .start_manual(Some(StopReason::Loading))
        .await
        .unwrap();
    assert_eq!(event.content.reason, Some(StopReason::Loading));
    assert_eq!(setup.tracker.snapshot().await.unwrap().timers_running, 1);
    assert!(matches!(
        setup.tracker.start_manual(None).await,
        Err(TrackerError::AlreadyTracking)
    ));

    time::sleep(Duration::from_secs(20 * 60)).await;
    let closed = setup
        .tracker
        .stop_manual(Some("ramp 4".to_owned()))
        .await
        .unwrap();
    assert_eq!(closed.event.id, event.id);
    assert_eq!(closed.event.content.duration_minutes, 20);
    assert!(!closed.event.content.is_demurrage);
    assert_eq!(closed.event.content.notes.as_deref(), Some("ramp 4"));
    assert!(closed.weekly.is_none());

    assert!(matches!(
        setup.tracker.stop_manual(None).await,
        Err(TrackerError::NotTracking)
    ));
    assert_eq!(setup.tracker.snapshot().await.unwrap().timers_running, 0);
}

#[tokio::test(start_paused = true)]
async fn event_opened_elsewhere_is_adopted() {
    let setup = setup().await;
    let opened = setup
        .client
        .start_tracking(&setup.driver, StartTracking::default(), Utc::now())
        .await
        .unwrap();

    let adopted = setup.tracker.start_manual(None).await.unwrap();
    assert_eq!(adopted.id, opened.id);
    assert_eq!(
        setup.tracker.resume().await.unwrap().map(|event| event.id),
        Some(opened.id)
    );
}

#[tokio::test(start_paused = true)]
async fn event_closed_elsewhere_is_dropped_on_refresh() {
    let setup = setup().await;
    setup.tracker.start_manual(None).await.unwrap();
    setup
        .client
        .end_tracking(&setup.driver, Default::default(), setup.clock.now())
        .await
        .unwrap();

    time::sleep(Duration::from_secs(61)).await;
    let snapshot = setup.tracker.snapshot().await.unwrap();
    assert!(snapshot.active.is_none());
    assert_eq!(snapshot.timers_running, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_timers_but_keeps_the_event_open() {
    let setup = setup().await;
    setup.tracker.start_manual(None).await.unwrap();
    setup.tracker.shutdown().await.unwrap();

    let snapshot = setup.tracker.snapshot().await.unwrap();
    assert_eq!(snapshot.timers_running, 0);
    assert!(snapshot.active.is_none());
    assert!(setup
        .client
        .get_active(&setup.driver, setup.clock.now())
        .await
        .unwrap()
        .is_some());

    assert!(setup.tracker.resume().await.unwrap().is_some());
    assert_eq!(setup.tracker.snapshot().await.unwrap().timers_running, 1);
}

#[tokio::test(start_paused = true)]
async fn replays_commands_and_samples() {
    let setup = setup().await;
    let input = br#"
# a driver waiting at the gate
{"type":"start","reason":"waiting"}
{"type":"gps","latitude":54.3233,"longitude":10.1228,"speed":0.0}
{"type":"wait","seconds":3600}
{"type":"wait","seconds":1e300}
{"type":"stop","notes":"finally"}
{"type":"teleport"}
"#;
    let stats = replay(&setup.tracker, &input[..]).await.unwrap();
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.commands, 3);
    assert_eq!(stats.skipped, 2);

    let closed = setup.tracker.snapshot().await.unwrap().last_closed.unwrap();
    assert_eq!(closed.event.content.reason, Some(StopReason::Waiting));
    assert_eq!(closed.event.content.duration_minutes, 60);
    assert!(closed.event.content.is_demurrage);
}
