use crate::db::{DbPool, OrmConn};
use crate::notify::{Mailer, SmsClient};

/// Shared per-process handles: both database connections plus the outbound
/// notification collaborators, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub sms: SmsClient,
    pub mailer: Mailer,
    pub public_base_url: String,
}
