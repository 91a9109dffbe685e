//! These tests need a running PostgreSQL server, pointed to by `DATABASE_URL`.
//! Run them with `cargo test -p database -- --ignored`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use database::PgDatabase;
use demurrage::{
    client::Client,
    database::{
        CompanyRepo, Database, DatabaseError, DatabaseTransaction, SessionRepo,
        StopEventFilter, StopEventRepo, UserRepo, WeeklyDemurrageRepo,
    },
    RequestError,
};
use model::{
    company::Company,
    demurrage::{Week, WeeklyDemurrage},
    session::Session,
    stop_event::StopEvent,
    tracking::{EndTracking, InvoiceFlags, StartTracking},
    user::{User, UserRole},
    WithId,
};
use sqlx::PgPool;

fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 13, 8, 0, 0).unwrap()
}

async fn setup_company(db: &PgDatabase) -> (WithId<Company>, WithId<User>, String) {
    let mut auto = db.auto();
    let company = auto
        .insert_company(Company::new("Förde Spedition"))
        .await
        .unwrap();
    let user = auto
        .insert_user(User {
            company_id: company.id,
            name: "Jens".to_owned(),
            email: "jens@foerde.example".to_owned(),
            role: UserRole::Driver,
        })
        .await
        .unwrap();
    let token = "driver-token".to_owned();
    auto.insert_session(Session {
        user_id: user.id,
        token: token.clone(),
        created_at: monday_morning(),
        expires_at: None,
    })
    .await
    .unwrap();
    (company, user, token)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn company_threshold_defaults_to_fifty(pool: PgPool) {
    let db = PgDatabase::from_pool(pool.clone());
    let (company, _, _) = setup_company(&db).await;

    let threshold: i32 = sqlx::query_scalar(
        "SELECT demurrage_threshold_minutes FROM companies WHERE id = $1",
    )
    .bind(company.id.raw())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(threshold, 50);
    assert_eq!(company.content.demurrage_threshold_minutes, 50);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn only_one_open_event_per_user(pool: PgPool) {
    let db = PgDatabase::from_pool(pool);
    let (company, user, _) = setup_company(&db).await;
    let mut auto = db.auto();

    let open = StopEvent::open(user.id, company.id, None, monday_morning(), None, None);
    auto.insert_stop_event(open.clone()).await.unwrap();
    assert!(matches!(
        auto.insert_stop_event(open).await,
        Err(DatabaseError::Conflict)
    ));
    assert!(auto.open_stop_event(&user.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn rolled_back_transactions_leave_no_trace(pool: PgPool) {
    let db = PgDatabase::from_pool(pool);
    let (company, user, _) = setup_company(&db).await;

    {
        let mut tx = db.transaction().await.unwrap();
        tx.insert_stop_event(StopEvent::open(
            user.id,
            company.id,
            None,
            monday_morning(),
            None,
            None,
        ))
        .await
        .unwrap();
    }
    assert!(db.auto().open_stop_event(&user.id).await.unwrap().is_none());

    let mut tx = db.transaction().await.unwrap();
    tx.insert_stop_event(StopEvent::open(
        user.id,
        company.id,
        None,
        monday_morning(),
        None,
        None,
    ))
    .await
    .unwrap();
    tx.commit().await.unwrap();
    assert!(db.auto().open_stop_event(&user.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn filter_selects_demurrage_events_of_the_week(pool: PgPool) {
    let db = PgDatabase::from_pool(pool);
    let (company, user, _) = setup_company(&db).await;
    let mut auto = db.auto();

    for (offset_days, minutes) in [(0, 51), (1, 20), (7, 90)] {
        let start = monday_morning() + Duration::days(offset_days);
        let mut event = StopEvent::open(user.id, company.id, None, start, None, None);
        event
            .close(start + Duration::minutes(minutes), None, 50)
            .unwrap();
        auto.insert_stop_event(event).await.unwrap();
    }

    let week = Week::of(monday_morning());
    let events = auto
        .stop_events(&StopEventFilter::company(company.id).week(week).demurrage_only())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].content.duration_minutes, 51);

    let all = auto
        .stop_events(&StopEventFilter::company(company.id).user(Some(user.id)))
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].content.start_time > all[1].content.start_time);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn weekly_upsert_keeps_invoice_flags(pool: PgPool) {
    let db = PgDatabase::from_pool(pool);
    let (company, _, _) = setup_company(&db).await;
    let mut auto = db.auto();
    let week = Week::of(monday_morning());

    let mut weekly = WeeklyDemurrage::empty(company.id, week);
    weekly.total_minutes = 51;
    weekly.event_count = 1;
    auto.put_weekly_totals(&weekly).await.unwrap();
    auto.set_invoice_flags(
        &company.id,
        week,
        &InvoiceFlags {
            invoice_generated: None,
            invoice_sent: Some(true),
        },
    )
    .await
    .unwrap();

    weekly.total_minutes = 102;
    weekly.event_count = 2;
    let stored = auto.put_weekly_totals(&weekly).await.unwrap();
    assert_eq!(stored.total_minutes, 102);
    assert!(stored.invoice_sent);
    assert!(!stored.invoice_generated);
    assert_eq!(auto.weekly_for_company(&company.id).await.unwrap(), vec![stored]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn tracking_round_trip_through_client(pool: PgPool) {
    let db = PgDatabase::from_pool(pool);
    let (_, _, token) = setup_company(&db).await;
    let client = Client::new(db);
    let caller = client.authenticate(&token, monday_morning()).await.unwrap();

    client
        .start_tracking(&caller, StartTracking::default(), monday_morning())
        .await
        .unwrap();
    assert!(matches!(
        client
            .start_tracking(&caller, StartTracking::default(), monday_morning())
            .await,
        Err(RequestError::Conflict(_))
    ));

    let closed = client
        .end_tracking(
            &caller,
            EndTracking::default(),
            monday_morning() + Duration::minutes(51),
        )
        .await
        .unwrap();
    assert!(closed.event.content.is_demurrage);
    assert_eq!(closed.weekly.unwrap().total_minutes, 51);
}

async fn add_driver(db: &PgDatabase, company: &WithId<Company>, name: &str) -> String {
    let mut auto = db.auto();
    let user = auto
        .insert_user(User {
            company_id: company.id,
            name: name.to_owned(),
            email: format!("{}@foerde.example", name.to_lowercase()),
            role: UserRole::Driver,
        })
        .await
        .unwrap();
    let token = format!("{}-token", name.to_lowercase());
    auto.insert_session(Session {
        user_id: user.id,
        token: token.clone(),
        created_at: monday_morning(),
        expires_at: None,
    })
    .await
    .unwrap();
    token
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_closes_keep_the_weekly_total(pool: PgPool) {
    let db = PgDatabase::from_pool(pool);
    let (company, _, token) = setup_company(&db).await;
    let other_token = add_driver(&db, &company, "Maren").await;
    let client = Client::new(db);
    let first = client.authenticate(&token, monday_morning()).await.unwrap();
    let second = client
        .authenticate(&other_token, monday_morning())
        .await
        .unwrap();

    let mut expected = 0;
    for round in 0..5 {
        let start = monday_morning() + Duration::hours(2 * round);
        for caller in [&first, &second] {
            client
                .start_tracking(caller, StartTracking::default(), start)
                .await
                .unwrap();
        }
        let (a, b) = tokio::join!(
            client.end_tracking(&first, EndTracking::default(), start + Duration::minutes(51)),
            client.end_tracking(&second, EndTracking::default(), start + Duration::minutes(60)),
        );
        assert!(a.unwrap().event.content.is_demurrage);
        assert!(b.unwrap().event.content.is_demurrage);
        expected += 111;
    }

    let report = client
        .get_week_report(&first, Week::of(monday_morning()))
        .await
        .unwrap();
    assert_eq!(report.weekly.total_minutes, expected);
    assert_eq!(report.weekly.event_count, 10);
}
