use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use tikiti::{
    auth::AuthService,
    config::Settings,
    domain::*,
    error::AppError,
    events::{self, EventBus, InMemoryEventBus},
    service::ServiceContext,
};

async fn setup() -> anyhow::Result<Arc<ServiceContext>> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let auth_service = Arc::new(AuthService::new(pool.clone(), "test-secret".to_string()));
    let event_bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());
    Ok(Arc::new(ServiceContext::new(
        pool,
        event_bus,
        auth_service,
        &Settings::default(),
    )))
}

struct Fixture {
    company: Company,
    patron: User,
    client: User,
    trip: Trip,
}

/// Approved company with one bus (30 seats), one route, and a trip
/// departing at the given offset from now.
async fn seed(ctx: &ServiceContext, departure_in: Duration) -> anyhow::Result<Fixture> {
    let (patron, company) = ctx
        .company_service
        .register(RegisterCompanyRequest {
            company_name: format!("Express {}", Uuid::new_v4()),
            full_name: "Awa Patron".to_string(),
            phone: format!("6{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password: "secret-password".to_string(),
        })
        .await?;

    let admin = ctx
        .user_repo
        .create(User {
            id: Uuid::new_v4(),
            full_name: "Platform Admin".to_string(),
            phone: format!("5{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: None,
            password_hash: None,
            role: Role::Admin,
            company_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;
    let company = ctx.company_service.approve(company.id, &admin).await?;

    let bus = ctx
        .fleet_repo
        .create_bus(Bus {
            id: Uuid::new_v4(),
            company_id: company.id,
            plate_number: format!("LT-{}", &Uuid::new_v4().simple().to_string()[..6]),
            model: "Marcopolo G7".to_string(),
            capacity: 30,
            created_at: Utc::now(),
        })
        .await?;
    let route = ctx
        .fleet_repo
        .create_route(Route {
            id: Uuid::new_v4(),
            company_id: company.id,
            origin: "Douala".to_string(),
            destination: "Yaounde".to_string(),
            duration_minutes: 240,
            base_price_cents: 5000,
            created_at: Utc::now(),
        })
        .await?;

    let departure = Utc::now() + departure_in;
    let trip = ctx
        .trip_repo
        .create(Trip {
            id: Uuid::new_v4(),
            company_id: company.id,
            route_id: route.id,
            bus_id: bus.id,
            departure_time: departure,
            arrival_time: departure + Duration::minutes(240),
            status: TripStatus::Scheduled,
            available_seats: bus.capacity,
            price_cents: 5000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    let client = ctx
        .user_repo
        .create(User {
            id: Uuid::new_v4(),
            full_name: "Chantal Client".to_string(),
            phone: format!("7{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: Some(format!("{}@example.com", Uuid::new_v4().simple())),
            password_hash: None,
            role: Role::Client,
            company_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    Ok(Fixture {
        company,
        patron,
        client,
        trip,
    })
}

async fn available_seats(ctx: &ServiceContext, trip_id: Uuid) -> anyhow::Result<i32> {
    Ok(ctx
        .trip_repo
        .find_by_id(trip_id)
        .await?
        .expect("trip exists")
        .available_seats)
}

#[tokio::test]
async fn payment_confirms_reservation_and_takes_one_seat() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(12),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.user_id, Some(fx.client.id));
    // Pending reservations do not touch the counter yet.
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 30);

    let outcome = ctx
        .reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &fx.client)
        .await?;

    assert_eq!(outcome.reservation.status, ReservationStatus::Confirmed);
    assert_eq!(outcome.payment.status, PaymentStatus::Completed);
    assert_eq!(outcome.payment.amount_cents, 5000);
    assert_eq!(outcome.ticket.status, TicketStatus::Valid);
    assert_eq!(outcome.ticket.seat_number, 12);
    assert!(outcome.ticket.code.starts_with("TK"));
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 29);

    let stored = ctx
        .ticket_repo
        .find_by_code(&outcome.ticket.code)
        .await?
        .expect("ticket persisted");
    assert_eq!(stored.reservation_id, reservation.id);

    Ok(())
}

#[tokio::test]
async fn second_payment_attempt_conflicts_without_side_effects() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: None,
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;

    ctx.reservation_service
        .process_payment(reservation.id, PaymentMethod::MobileMoney, &fx.client)
        .await?;

    let second = ctx
        .reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &fx.client)
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    // No second ticket, no second decrement.
    let tickets = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tickets WHERE reservation_id = ?",
    )
    .bind(reservation.id.to_string())
    .fetch_one(&ctx.db_pool)
    .await?;
    assert_eq!(tickets, 1);
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 29);

    Ok(())
}

#[tokio::test]
async fn booking_a_departed_trip_is_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;
    // Still Scheduled, but departure is an hour in the past.
    let fx = seed(&ctx, Duration::hours(-1)).await?;

    let result = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(1),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 30);

    Ok(())
}

#[tokio::test]
async fn paying_a_missing_reservation_is_not_found() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let result = ctx
        .reservation_service
        .process_payment(Uuid::new_v4(), PaymentMethod::Cash, &fx.client)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn cancelling_a_confirmed_reservation_returns_the_seat() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(3),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;
    let outcome = ctx
        .reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &fx.client)
        .await?;
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 29);

    let cancelled = ctx
        .reservation_service
        .cancel_reservation(reservation.id, &fx.client)
        .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 30);

    let ticket = ctx
        .ticket_repo
        .find_by_code(&outcome.ticket.code)
        .await?
        .expect("ticket exists");
    assert_eq!(ticket.status, TicketStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn cancelling_a_pending_reservation_leaves_the_counter_alone() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(7),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;

    let cancelled = ctx
        .reservation_service
        .cancel_reservation(reservation.id, &fx.client)
        .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    // Never confirmed, so it never held a seat.
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 30);

    // The freed seat can be claimed again.
    let again = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(7),
                passenger_name: "Didier Voyageur".to_string(),
                passenger_phone: "699000002".to_string(),
            },
            &fx.client,
        )
        .await?;
    assert_eq!(again.seat_number, 7);

    Ok(())
}

#[tokio::test]
async fn cancellation_inside_the_cutoff_is_too_late() -> anyhow::Result<()> {
    let ctx = setup().await?;
    // Departs in one hour: inside the two-hour window.
    let fx = seed(&ctx, Duration::hours(1)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(1),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;
    ctx.reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &fx.client)
        .await?;

    let result = ctx
        .reservation_service
        .cancel_reservation(reservation.id, &fx.client)
        .await;
    assert!(matches!(result, Err(AppError::TooLate(_))));

    // Nothing mutated.
    let unchanged = ctx
        .reservation_repo
        .find_by_id(reservation.id)
        .await?
        .expect("reservation exists");
    assert_eq!(unchanged.status, ReservationStatus::Confirmed);
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 29);

    Ok(())
}

#[tokio::test]
async fn cancellation_just_outside_the_cutoff_is_allowed() -> anyhow::Result<()> {
    let ctx = setup().await?;
    // A few seconds past the boundary; the window is exclusive.
    let fx = seed(&ctx, Duration::hours(2) + Duration::seconds(30)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(1),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;
    ctx.reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &fx.client)
        .await?;

    let cancelled = ctx
        .reservation_service
        .cancel_reservation(reservation.id, &fx.client)
        .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn only_the_owner_or_company_staff_may_cancel() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(5),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;

    let stranger = ctx
        .user_repo
        .create(User {
            id: Uuid::new_v4(),
            full_name: "Someone Else".to_string(),
            phone: "688000000".to_string(),
            country_code: "+237".to_string(),
            email: None,
            password_hash: None,
            role: Role::Client,
            company_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    let result = ctx
        .reservation_service
        .cancel_reservation(reservation.id, &stranger)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    // The patron's staff may cancel on the passenger's behalf.
    let cancelled = ctx
        .reservation_service
        .cancel_reservation(reservation.id, &fx.patron)
        .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn seat_accounting_holds_over_payments_and_cancellations() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    // Three confirmed reservations, one later cancelled: 30 - 3 + 1 = 28.
    let mut reservations = Vec::new();
    for seat in 1..=3 {
        let r = ctx
            .reservation_service
            .create_reservation(
                CreateReservationRequest {
                    trip_id: fx.trip.id,
                    seat_number: Some(seat),
                    passenger_name: format!("Passenger {}", seat),
                    passenger_phone: format!("69900000{}", seat),
                },
                &fx.client,
            )
            .await?;
        ctx.reservation_service
            .process_payment(r.id, PaymentMethod::Cash, &fx.client)
            .await?;
        reservations.push(r);
    }
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 27);

    ctx.reservation_service
        .cancel_reservation(reservations[1].id, &fx.client)
        .await?;
    assert_eq!(available_seats(&ctx, fx.trip.id).await?, 28);

    Ok(())
}

#[tokio::test]
async fn a_taken_seat_cannot_be_claimed_twice() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    ctx.reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(10),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;

    let duplicate = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(10),
                passenger_name: "Didier Voyageur".to_string(),
                passenger_phone: "699000002".to_string(),
            },
            &fx.client,
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    // Auto-assignment skips the taken seat.
    let auto = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: None,
                passenger_name: "Didier Voyageur".to_string(),
                passenger_phone: "699000002".to_string(),
            },
            &fx.client,
        )
        .await?;
    assert_eq!(auto.seat_number, 1);

    Ok(())
}

#[tokio::test]
async fn walk_in_sale_by_staff_has_no_owner() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let caissier = ctx
        .company_service
        .create_employee(
            CreateEmployeeRequest {
                full_name: "Brice Caissier".to_string(),
                phone: "677000001".to_string(),
                country_code: "+237".to_string(),
                role: Role::Caissier,
            },
            &fx.patron,
        )
        .await?;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: None,
                passenger_name: "Walk-in Passenger".to_string(),
                passenger_phone: "690000000".to_string(),
            },
            &caissier,
        )
        .await?;
    assert_eq!(reservation.user_id, None);

    let outcome = ctx
        .reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &caissier)
        .await?;
    assert_eq!(outcome.reservation.status, ReservationStatus::Confirmed);

    Ok(())
}

#[tokio::test]
async fn payment_publishes_events_to_the_company_room() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx, Duration::hours(5)).await?;

    let mut company_rx = ctx
        .event_bus
        .subscribe(&events::company_room(fx.company.id))
        .await;
    let mut user_rx = ctx
        .event_bus
        .subscribe(&events::user_room(fx.client.id))
        .await;

    let reservation = ctx
        .reservation_service
        .create_reservation(
            CreateReservationRequest {
                trip_id: fx.trip.id,
                seat_number: Some(2),
                passenger_name: "Chantal Client".to_string(),
                passenger_phone: "699000001".to_string(),
            },
            &fx.client,
        )
        .await?;
    ctx.reservation_service
        .process_payment(reservation.id, PaymentMethod::Cash, &fx.client)
        .await?;

    let mut company_events = Vec::new();
    while let Ok(event) = company_rx.try_recv() {
        company_events.push(event.event);
    }
    assert!(company_events.iter().any(|e| e == events::RESERVATION_UPDATED));
    assert!(company_events.iter().any(|e| e == events::PAYMENT_COMPLETED));

    let mut user_events = Vec::new();
    while let Ok(event) = user_rx.try_recv() {
        user_events.push(event.event);
    }
    assert!(user_events.iter().any(|e| e == events::PAYMENT_COMPLETED));

    Ok(())
}
