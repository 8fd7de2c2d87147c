mod auth;
mod bookings;
mod catalog;
mod db;

use std::sync::Arc;

pub use auth::*;
pub use bookings::*;
pub use catalog::*;
pub use db::*;

#[cfg(test)]
pub use db::memory;

/// The slotbook system, facilitating accounts, the room catalog, and the
/// booking workflow over a shared database handle.
pub struct Slotbook<Db> {
    database: Arc<Db>,

    pub auth: Auth<Db>,
    pub catalog: Catalog<Db>,
    pub bookings: Bookings<Db>,
}

impl<Db> Slotbook<Db>
where
    Db: Database,
{
    pub fn new(database: Db, jwt_secret: &str) -> Self {
        let database = Arc::new(database);

        let auth = Auth::new(&database, jwt_secret);
        let catalog = Catalog::new(&database);
        let bookings = Bookings::new(&database);

        Self {
            database,
            auth,
            catalog,
            bookings,
        }
    }

    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}
