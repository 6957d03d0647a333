pub mod password;
pub mod registration;
pub mod session;

pub use password::{change_password, forgot_password, reset_password};
pub use registration::{register, resend_verification, verify_email};
pub use session::{login, logout, me, refresh};

use service_core::axum::http::{header, HeaderMap};
use std::net::IpAddr;

use crate::services::ClientContext;

fn client_context(ip: IpAddr, headers: &HeaderMap) -> ClientContext {
    ClientContext {
        ip_address: ip.to_string(),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(512).collect()),
    }
}
