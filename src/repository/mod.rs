use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod access_code_repository;
pub mod audit_repository;
pub mod company_repository;
pub mod fleet_repository;
pub mod reservation_repository;
pub mod ticket_repository;
pub mod trip_repository;
pub mod user_repository;

pub use access_code_repository::SqliteAccessCodeRepository;
pub use audit_repository::SqliteAuditRepository;
pub use company_repository::SqliteCompanyRepository;
pub use fleet_repository::SqliteFleetRepository;
pub use reservation_repository::SqliteReservationRepository;
pub use ticket_repository::SqliteTicketRepository;
pub use trip_repository::SqliteTripRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_phone(&self, country_code: &str, phone: &str) -> Result<Option<User>>;
    async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<User>>;
    async fn update_status(&self, id: Uuid, status: UserStatus) -> Result<()>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Company>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Company>>;
    async fn update_status(&self, id: Uuid, status: CompanyStatus) -> Result<Company>;
}

#[async_trait]
pub trait FleetRepository: Send + Sync {
    async fn create_bus(&self, bus: Bus) -> Result<Bus>;
    async fn find_bus(&self, id: Uuid) -> Result<Option<Bus>>;
    async fn list_buses(&self, company_id: Uuid) -> Result<Vec<Bus>>;
    async fn create_route(&self, route: Route) -> Result<Route>;
    async fn find_route(&self, id: Uuid) -> Result<Option<Route>>;
    async fn list_routes(&self, company_id: Uuid) -> Result<Vec<Route>>;
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create(&self, trip: Trip) -> Result<Trip>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>>;
    async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<Trip>>;
    /// Public trip search: scheduled departures of approved companies only.
    async fn search(
        &self,
        origin: Option<&str>,
        destination: Option<&str>,
        after: DateTime<Utc>,
    ) -> Result<Vec<Trip>>;
    async fn update_status(&self, id: Uuid, status: TripStatus) -> Result<Trip>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Reservation>>;
    async fn list_by_trip(&self, trip_id: Uuid) -> Result<Vec<Reservation>>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<Ticket>>;
    async fn find_by_reservation(&self, reservation_id: Uuid) -> Result<Option<Ticket>>;
}

#[async_trait]
pub trait AccessCodeRepository: Send + Sync {
    async fn insert(&self, code: AccessCode) -> Result<AccessCode>;
    /// Any unexpired, unconsumed code with this value in the company?
    async fn active_code_exists(&self, company_id: Uuid, code: &str) -> Result<bool>;
    /// Marks the employee's matching live code consumed. Guarded so that two
    /// concurrent calls cannot both succeed; returns false when nothing
    /// matched (wrong code, expired, or already used).
    async fn consume(&self, employee_id: Uuid, code: &str) -> Result<bool>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<()>;
    async fn list(&self, company_id: Option<Uuid>, limit: i64, offset: i64)
        -> Result<Vec<AuditRecord>>;
}
