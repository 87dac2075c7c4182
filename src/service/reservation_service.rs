use base64::Engine as _;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    events::{self, EventBus},
    repository::reservation_repository::{
        row_to_reservation, ReservationRow, RESERVATION_COLUMNS,
    },
    service::codes,
};

const TICKET_CODE_LEN: usize = 10;

/// Everything that moves a reservation through its lifecycle. Each operation
/// is one transaction; state preconditions are re-verified inside it by
/// guarded UPDATEs, so two concurrent calls cannot both pass a check that
/// only one of them may act on. Events go out only after commit.
pub struct ReservationService {
    pool: SqlitePool,
    event_bus: Arc<dyn EventBus>,
    cancellation_cutoff: Duration,
}

/// Result of a completed payment: the issued ticket, the payment record,
/// and the now-confirmed reservation.
pub struct PaymentOutcome {
    pub ticket: Ticket,
    pub payment: Payment,
    pub reservation: Reservation,
}

#[derive(FromRow)]
struct TripSnapshot {
    company_id: String,
    status: String,
    departure_time: NaiveDateTime,
    available_seats: i32,
    price_cents: i64,
    capacity: i32,
}

impl ReservationService {
    pub fn new(
        pool: SqlitePool,
        event_bus: Arc<dyn EventBus>,
        cancellation_cutoff_hours: i64,
    ) -> Self {
        Self {
            pool,
            event_bus,
            cancellation_cutoff: Duration::hours(cancellation_cutoff_hours),
        }
    }

    pub async fn create_reservation(
        &self,
        request: CreateReservationRequest,
        actor: &User,
    ) -> Result<Reservation> {
        let mut tx = self.pool.begin().await?;

        let trip = fetch_trip_snapshot(&mut tx, request.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
        let trip_company = parse_uuid(&trip.company_id)?;

        // Clients book for themselves; staff sell walk-in seats for their
        // own company only.
        let user_id = match actor.role {
            Role::Client => Some(actor.id),
            role if role.is_staff() => {
                if actor.company_id != Some(trip_company) {
                    return Err(AppError::Forbidden);
                }
                None
            }
            _ => return Err(AppError::Forbidden),
        };

        if TripStatus::parse(&trip.status) != Some(TripStatus::Scheduled) {
            return Err(AppError::InvalidState(
                "Trip is not open for booking".to_string(),
            ));
        }
        let departure = DateTime::<Utc>::from_naive_utc_and_offset(trip.departure_time, Utc);
        if departure <= Utc::now() {
            return Err(AppError::InvalidState("Trip has already departed".to_string()));
        }
        if trip.available_seats <= 0 {
            return Err(AppError::Conflict("No seats available".to_string()));
        }

        let taken = taken_seats(&mut tx, request.trip_id).await?;
        let seat_number = match request.seat_number {
            Some(seat) => {
                if seat < 1 || seat > trip.capacity {
                    return Err(AppError::BadRequest(format!(
                        "Seat {} is outside bus capacity {}",
                        seat, trip.capacity
                    )));
                }
                if taken.contains(&seat) {
                    return Err(AppError::Conflict(format!("Seat {} is already taken", seat)));
                }
                seat
            }
            None => (1..=trip.capacity)
                .find(|s| !taken.contains(s))
                .ok_or_else(|| AppError::Conflict("Bus is full".to_string()))?,
        };

        let reservation = Reservation {
            id: Uuid::new_v4(),
            trip_id: request.trip_id,
            company_id: trip_company,
            user_id,
            passenger_name: request.passenger_name,
            passenger_phone: request.passenger_phone,
            seat_number,
            status: ReservationStatus::Pending,
            total_amount_cents: trip.price_cents,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        insert_reservation(&mut tx, &reservation).await?;
        insert_audit(
            &mut tx,
            actor.id,
            Some(trip_company),
            AuditAction::ReservationCreated,
            &format!(
                "Reservation for seat {} on trip {}",
                seat_number, request.trip_id
            ),
            json!({
                "reservation_id": reservation.id,
                "trip_id": request.trip_id,
                "seat_number": seat_number,
            }),
        )
        .await?;

        tx.commit().await?;

        self.publish_reservation_update(&reservation).await;

        Ok(reservation)
    }

    /// Confirms a pending reservation against a completed payment. One
    /// atomic unit: reservation flips to Confirmed, the ticket and payment
    /// rows are created, and the trip loses one available seat. The
    /// Pending gate lives in the UPDATE itself: of two concurrent attempts,
    /// exactly one affects a row and the other gets Conflict.
    pub async fn process_payment(
        &self,
        reservation_id: Uuid,
        method: PaymentMethod,
        actor: &User,
    ) -> Result<PaymentOutcome> {
        let mut tx = self.pool.begin().await?;

        let reservation = fetch_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

        self.authorize(actor, &reservation)?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::Conflict(
                "Reservation is not awaiting payment".to_string(),
            ));
        }

        let now = Utc::now();
        let confirmed = sqlx::query(
            "UPDATE reservations SET status = 'Confirmed', updated_at = ? \
             WHERE id = ? AND status = 'Pending'",
        )
        .bind(now.naive_utc())
        .bind(reservation_id.to_string())
        .execute(&mut *tx)
        .await?;
        if confirmed.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Reservation is not awaiting payment".to_string(),
            ));
        }

        let seats = sqlx::query(
            "UPDATE trips SET available_seats = available_seats - 1, updated_at = ? \
             WHERE id = ? AND available_seats > 0",
        )
        .bind(now.naive_utc())
        .bind(reservation.trip_id.to_string())
        .execute(&mut *tx)
        .await?;
        if seats.rows_affected() == 0 {
            return Err(AppError::Conflict("No seats available".to_string()));
        }

        let ticket = build_ticket(&reservation, now);
        insert_ticket(&mut tx, &ticket).await?;

        let payment = Payment {
            id: Uuid::new_v4(),
            reservation_id,
            amount_cents: reservation.total_amount_cents,
            method,
            status: PaymentStatus::Completed,
            paid_at: Some(now),
            created_at: now,
        };
        insert_payment(&mut tx, &payment).await?;

        insert_audit(
            &mut tx,
            actor.id,
            Some(reservation.company_id),
            AuditAction::PaymentCompleted,
            &format!("Payment of {} for reservation {}", payment.amount_cents, reservation_id),
            json!({
                "reservation_id": reservation_id,
                "ticket_code": ticket.code,
                "method": method,
                "amount_cents": payment.amount_cents,
            }),
        )
        .await?;

        tx.commit().await?;

        let reservation = Reservation {
            status: ReservationStatus::Confirmed,
            updated_at: now,
            ..reservation
        };

        let payload = json!({
            "reservation_id": reservation.id,
            "trip_id": reservation.trip_id,
            "status": reservation.status,
            "ticket_code": ticket.code,
        });
        self.event_bus
            .publish(
                &events::company_room(reservation.company_id),
                events::PAYMENT_COMPLETED,
                payload.clone(),
            )
            .await;
        if let Some(user_id) = reservation.user_id {
            self.event_bus
                .publish(&events::user_room(user_id), events::PAYMENT_COMPLETED, payload)
                .await;
        }
        self.publish_reservation_update(&reservation).await;

        Ok(PaymentOutcome {
            ticket,
            payment,
            reservation,
        })
    }

    /// Cancels a pending or confirmed reservation, strictly outside the
    /// cutoff window. The seat goes back to the trip counter only when the
    /// reservation had been confirmed; a pending one never took a seat out.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        actor: &User,
    ) -> Result<Reservation> {
        let mut tx = self.pool.begin().await?;

        let reservation = fetch_reservation(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

        self.authorize(actor, &reservation)?;

        if !matches!(
            reservation.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(AppError::InvalidState(
                "Reservation can no longer be cancelled".to_string(),
            ));
        }

        let trip = fetch_trip_snapshot(&mut tx, reservation.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
        let departure = DateTime::from_naive_utc_and_offset(trip.departure_time, Utc);
        // Boundary is exclusive: exactly at the cutoff still allows.
        if departure - Utc::now() < self.cancellation_cutoff {
            return Err(AppError::TooLate(format!(
                "Cancellation closes {} hours before departure",
                self.cancellation_cutoff.num_hours()
            )));
        }

        let now = Utc::now();
        let was_confirmed = reservation.status == ReservationStatus::Confirmed;

        let cancelled = sqlx::query(
            "UPDATE reservations SET status = 'Cancelled', updated_at = ? \
             WHERE id = ? AND status IN ('Pending', 'Confirmed')",
        )
        .bind(now.naive_utc())
        .bind(reservation_id.to_string())
        .execute(&mut *tx)
        .await?;
        if cancelled.rows_affected() == 0 {
            return Err(AppError::InvalidState(
                "Reservation can no longer be cancelled".to_string(),
            ));
        }

        sqlx::query("UPDATE tickets SET status = 'Cancelled' WHERE reservation_id = ? AND status = 'Valid'")
            .bind(reservation_id.to_string())
            .execute(&mut *tx)
            .await?;

        if was_confirmed {
            // Capacity guard keeps the counter from ever exceeding the bus.
            sqlx::query(
                "UPDATE trips SET available_seats = available_seats + 1, updated_at = ? \
                 WHERE id = ? AND available_seats < \
                   (SELECT capacity FROM buses WHERE buses.id = trips.bus_id)",
            )
            .bind(now.naive_utc())
            .bind(reservation.trip_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        insert_audit(
            &mut tx,
            actor.id,
            Some(reservation.company_id),
            AuditAction::ReservationCancelled,
            &format!("Reservation {} cancelled", reservation_id),
            json!({
                "reservation_id": reservation_id,
                "trip_id": reservation.trip_id,
                "was_confirmed": was_confirmed,
            }),
        )
        .await?;

        tx.commit().await?;

        let reservation = Reservation {
            status: ReservationStatus::Cancelled,
            updated_at: now,
            ..reservation
        };
        self.publish_reservation_update(&reservation).await;

        Ok(reservation)
    }

    /// Owner of the reservation, or staff of the company that runs the trip.
    fn authorize(&self, actor: &User, reservation: &Reservation) -> Result<()> {
        if reservation.user_id == Some(actor.id) {
            return Ok(());
        }
        if actor.role.is_staff() && actor.company_id == Some(reservation.company_id) {
            return Ok(());
        }
        Err(AppError::Forbidden)
    }

    async fn publish_reservation_update(&self, reservation: &Reservation) {
        let payload = json!({
            "reservation_id": reservation.id,
            "trip_id": reservation.trip_id,
            "status": reservation.status,
            "seat_number": reservation.seat_number,
        });
        self.event_bus
            .publish(
                &events::company_room(reservation.company_id),
                events::RESERVATION_UPDATED,
                payload.clone(),
            )
            .await;
        if let Some(user_id) = reservation.user_id {
            self.event_bus
                .publish(&events::user_room(user_id), events::RESERVATION_UPDATED, payload)
                .await;
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

fn build_ticket(reservation: &Reservation, now: DateTime<Utc>) -> Ticket {
    let code = format!("TK{}", codes::random_code(TICKET_CODE_LEN));
    let seed = json!({
        "code": code,
        "reservation_id": reservation.id,
        "trip_id": reservation.trip_id,
        "seat_number": reservation.seat_number,
    });
    let qr_payload = base64::engine::general_purpose::STANDARD.encode(seed.to_string());

    Ticket {
        id: Uuid::new_v4(),
        code,
        qr_payload,
        reservation_id: reservation.id,
        trip_id: reservation.trip_id,
        company_id: reservation.company_id,
        seat_number: reservation.seat_number,
        status: TicketStatus::Valid,
        issued_at: now,
    }
}

async fn fetch_trip_snapshot(
    tx: &mut Transaction<'_, Sqlite>,
    trip_id: Uuid,
) -> Result<Option<TripSnapshot>> {
    let row = sqlx::query_as::<_, TripSnapshot>(
        r#"
        SELECT t.company_id, t.status, t.departure_time, t.available_seats,
               t.price_cents, b.capacity
        FROM trips t
        JOIN buses b ON b.id = t.bus_id
        WHERE t.id = ?
        "#,
    )
    .bind(trip_id.to_string())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

async fn fetch_reservation(
    tx: &mut Transaction<'_, Sqlite>,
    id: Uuid,
) -> Result<Option<Reservation>> {
    let row = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(r) => Ok(Some(row_to_reservation(r)?)),
        None => Ok(None),
    }
}

async fn taken_seats(tx: &mut Transaction<'_, Sqlite>, trip_id: Uuid) -> Result<Vec<i32>> {
    let seats = sqlx::query_scalar::<_, i32>(
        "SELECT seat_number FROM reservations WHERE trip_id = ? AND status != 'Cancelled'",
    )
    .bind(trip_id.to_string())
    .fetch_all(&mut **tx)
    .await?;

    Ok(seats)
}

async fn insert_reservation(
    tx: &mut Transaction<'_, Sqlite>,
    reservation: &Reservation,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, trip_id, company_id, user_id, passenger_name, passenger_phone,
            seat_number, status, total_amount_cents, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(reservation.id.to_string())
    .bind(reservation.trip_id.to_string())
    .bind(reservation.company_id.to_string())
    .bind(reservation.user_id.map(|id| id.to_string()))
    .bind(&reservation.passenger_name)
    .bind(&reservation.passenger_phone)
    .bind(reservation.seat_number)
    .bind(reservation.status.as_str())
    .bind(reservation.total_amount_cents)
    .bind(reservation.created_at.naive_utc())
    .bind(reservation.updated_at.naive_utc())
    .execute(&mut **tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("Seat is already taken".to_string())
        }
        _ => AppError::Database(e.to_string()),
    })?;

    Ok(())
}

async fn insert_ticket(tx: &mut Transaction<'_, Sqlite>, ticket: &Ticket) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tickets (
            id, code, qr_payload, reservation_id, trip_id, company_id,
            seat_number, status, issued_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ticket.id.to_string())
    .bind(&ticket.code)
    .bind(&ticket.qr_payload)
    .bind(ticket.reservation_id.to_string())
    .bind(ticket.trip_id.to_string())
    .bind(ticket.company_id.to_string())
    .bind(ticket.seat_number)
    .bind(ticket.status.as_str())
    .bind(ticket.issued_at.naive_utc())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_payment(tx: &mut Transaction<'_, Sqlite>, payment: &Payment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, reservation_id, amount_cents, method, status, paid_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payment.id.to_string())
    .bind(payment.reservation_id.to_string())
    .bind(payment.amount_cents)
    .bind(payment.method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.paid_at.map(|dt| dt.naive_utc()))
    .bind(payment.created_at.naive_utc())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn insert_audit(
    tx: &mut Transaction<'_, Sqlite>,
    actor_id: Uuid,
    company_id: Option<Uuid>,
    action: AuditAction,
    description: &str,
    metadata: serde_json::Value,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (id, actor_id, company_id, action, description, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(actor_id.to_string())
    .bind(company_id.map(|id| id.to_string()))
    .bind(action.as_str())
    .bind(description)
    .bind(metadata.to_string())
    .bind(Utc::now().naive_utc())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
