use rocket::{
    fairing::{self, Fairing, Info, Kind},
    Build, Rocket,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

use crate::{migrator::Migrator, AppConfig};

pub struct DatabaseFairing;

impl DatabaseFairing {
    pub fn fairing() -> Self {
        Self {}
    }
}

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "Database",
            kind: Kind::Ignite | Kind::Singleton,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        let Some(config) = rocket.state::<AppConfig>() else {
            error!("Application config has not been loaded.");
            return Err(rocket);
        };

        let db = match Database::connect(&config.database_url).await {
            Ok(db) => db,
            Err(e) => {
                error!(
                    "Failed to connect to database ({}): {e}",
                    config.database_url
                );
                return Err(rocket);
            }
        };

        match Migrator::get_pending_migrations(&db).await {
            Ok(migrations) => {
                info!("{} database migrations pending.", migrations.len());
                #[allow(clippy::cast_possible_truncation)]
                let result = Migrator::up(&db, Some(migrations.len() as u32)).await;

                if let Err(e) = result {
                    error!("Failed to apply pending migrations: {e}");
                    return Err(rocket);
                }
                info!("Database migrations succesfully applied!");
            }
            Err(e) => {
                error!("Failed to get pending migrations: {e}");
                return Err(rocket);
            }
        };

        Ok(rocket.manage(db))
    }
}
