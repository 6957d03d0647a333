pub mod security;
pub mod users;

pub use security::{
    block_ip, defense_state, list_blocked_ips, list_failed_attempts, list_security_logs,
    unblock_ip,
};
pub use users::{list_users, set_admin};
