pub mod codes;
pub mod company_service;
pub mod employee_auth_service;
pub mod reservation_service;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::events::EventBus;
use crate::repository::*;

pub use company_service::CompanyService;
pub use employee_auth_service::{EmployeeAuthService, GeneratedCode, VerifiedEmployee};
pub use reservation_service::{PaymentOutcome, ReservationService};

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub company_repo: Arc<dyn CompanyRepository>,
    pub fleet_repo: Arc<dyn FleetRepository>,
    pub trip_repo: Arc<dyn TripRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub ticket_repo: Arc<dyn TicketRepository>,
    pub audit_repo: Arc<dyn AuditRepository>,
    pub reservation_service: Arc<ReservationService>,
    pub employee_auth_service: Arc<EmployeeAuthService>,
    pub company_service: Arc<CompanyService>,
    pub auth_service: Arc<AuthService>,
    pub event_bus: Arc<dyn EventBus>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        event_bus: Arc<dyn EventBus>,
        auth_service: Arc<AuthService>,
        settings: &Settings,
    ) -> Self {
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let company_repo: Arc<dyn CompanyRepository> =
            Arc::new(SqliteCompanyRepository::new(db_pool.clone()));
        let fleet_repo: Arc<dyn FleetRepository> =
            Arc::new(SqliteFleetRepository::new(db_pool.clone()));
        let trip_repo: Arc<dyn TripRepository> =
            Arc::new(SqliteTripRepository::new(db_pool.clone()));
        let reservation_repo: Arc<dyn ReservationRepository> =
            Arc::new(SqliteReservationRepository::new(db_pool.clone()));
        let ticket_repo: Arc<dyn TicketRepository> =
            Arc::new(SqliteTicketRepository::new(db_pool.clone()));
        let access_code_repo: Arc<dyn AccessCodeRepository> =
            Arc::new(SqliteAccessCodeRepository::new(db_pool.clone()));
        let audit_repo: Arc<dyn AuditRepository> =
            Arc::new(SqliteAuditRepository::new(db_pool.clone()));

        let reservation_service = Arc::new(ReservationService::new(
            db_pool.clone(),
            event_bus.clone(),
            settings.booking.cancellation_cutoff_hours,
        ));
        let employee_auth_service = Arc::new(EmployeeAuthService::new(
            user_repo.clone(),
            company_repo.clone(),
            access_code_repo,
            audit_repo.clone(),
            auth_service.clone(),
            settings.auth.access_code_minutes,
            settings.auth.employee_token_hours,
        ));
        let company_service = Arc::new(CompanyService::new(
            db_pool.clone(),
            user_repo.clone(),
            company_repo.clone(),
            audit_repo.clone(),
            event_bus.clone(),
        ));

        Self {
            user_repo,
            company_repo,
            fleet_repo,
            trip_repo,
            reservation_repo,
            ticket_repo,
            audit_repo,
            reservation_service,
            employee_auth_service,
            company_service,
            auth_service,
            event_bus,
            db_pool,
        }
    }
}
