use std::sync::Arc;

use axum::extract::FromRef;
use slotbook_core::{PgDatabase, Slotbook};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub slotbook: Arc<Slotbook<PgDatabase>>,
}
