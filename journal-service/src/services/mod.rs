//! Business logic for the journal service.
//!
//! Handlers stay thin: they extract and validate input, then call into the
//! services here, which talk to the repositories.

pub mod auth;
pub mod clock;
pub mod email;
pub mod error;
mod journal;
mod jwt;
pub mod login_defense;
mod profile;

pub use auth::{AuthService, ClientContext};
pub use clock::{Clock, ManualClock, SystemClock};
pub use email::{EmailProvider, EmailService, MockEmailService, SentEmail};
pub use error::ServiceError;
pub use journal::JournalService;
pub use jwt::{JwtService, TokenClaims, TokenResponse, TokenType};
pub use login_defense::{DefenseState, FailureOutcome, LoginDefense};
pub use profile::ProfileService;
