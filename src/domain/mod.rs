pub mod access_code;
pub mod audit;
pub mod company;
pub mod fleet;
pub mod payment;
pub mod reservation;
pub mod ticket;
pub mod trip;
pub mod user;

pub use access_code::AccessCode;
pub use audit::{AuditAction, AuditRecord};
pub use company::{Company, CompanyStatus, RegisterCompanyRequest};
pub use fleet::{Bus, CreateBusRequest, CreateRouteRequest, Route};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use reservation::{CreateReservationRequest, Reservation, ReservationStatus};
pub use ticket::{Ticket, TicketStatus};
pub use trip::{CreateTripRequest, Trip, TripStatus};
pub use user::{CreateEmployeeRequest, Role, User, UserStatus};
