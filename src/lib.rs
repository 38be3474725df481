#[macro_use]
extern crate rocket;

pub mod activity;
pub mod auth;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod store;

use crate::auth::{AuthConfig, AuthState};
use crate::db::GeofeedDb;
use crate::export::PublishConfig;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Ensure the publish directory exists so feed generation never races
    // directory creation under load.
    let publish_config = PublishConfig::from_env();
    std::fs::create_dir_all(&publish_config.dir).expect("Failed to create publish directory");
    log::info!(
        "publish directory initialized at: {}",
        publish_config.dir.display()
    );

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(GeofeedDb::init())
        .attach(cors)
        .manage(publish_config)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match GeofeedDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match db::run_migrations(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Clone and manage the raw pool for handlers and the activity sink
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match GeofeedDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        // Token-validation state for the AuthUser request guard
        .attach(AdHoc::try_on_ignite(
            "Auth Configuration",
            |rocket| async move {
                let config = match AuthConfig::from_env() {
                    Ok(config) => config,
                    Err(err) => {
                        log::error!("auth configuration failed: {}", err);
                        return Err(rocket);
                    }
                };
                match AuthState::new(config) {
                    Ok(state) => Ok(rocket.manage(state)),
                    Err(err) => {
                        log::error!("failed to initialize auth state: {}", err);
                        Err(rocket)
                    }
                }
            },
        ))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Geofeed routes
                routes::geofeeds::list_geofeeds,
                routes::geofeeds::list_draft_geofeeds,
                routes::geofeeds::create_geofeed,
                routes::geofeeds::get_geofeed,
                routes::geofeeds::rename_geofeed,
                routes::geofeeds::delete_geofeed,
                // Range routes
                routes::ranges::list_ranges,
                routes::ranges::create_range,
                routes::ranges::delete_range,
                routes::ranges::bulk_delete_ranges,
                // Import workflow routes
                routes::imports::begin_import,
                routes::imports::preview_import,
                routes::imports::commit_import,
                routes::imports::cancel_import,
                // Publication routes
                routes::publish::generate_geofeed,
                routes::publish::unpublish_geofeed,
                routes::publish::download_geofeed,
                // Activity routes
                routes::activity::list_activity,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Geofeed API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::auth::{AuthConfig, AuthState};
    use crate::export::PublishConfig;
    use crate::models::NewGeofeedRow;
    use crate::store::{GeofeedStore, RequestContext};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Secret shared between test token minting and the test AuthState.
    pub const TEST_JWT_SECRET: &str = "geofeed-test-secret";

    /// Auth configuration matching [`test_auth_state`]-minted tokens.
    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            issuer: "https://geofeed.test".into(),
            audience: "geofeed-api".into(),
            jwt_secret: TEST_JWT_SECRET.into(),
            access_token_ttl_secs: 900,
        }
    }

    /// Token-validation state for test Rockets.
    pub fn test_auth_state() -> AuthState {
        AuthState::new(test_auth_config()).expect("test auth state")
    }

    /// Mint a bearer token for `user_id`, valid against [`test_auth_state`].
    pub fn mint_token(state: &AuthState, user_id: Uuid) -> String {
        state
            .jwt_service
            .issue_access_token(user_id, "user@example.com")
            .expect("issue test token")
            .token
    }

    /// Convenience helpers for seeding geofeed data in tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a geofeed for `user_id`, returning its id.
        pub async fn insert_geofeed(
            &self,
            user_id: Uuid,
            name: &str,
            is_draft: bool,
        ) -> Result<Uuid, sqlx::Error> {
            let ctx = RequestContext { user_id };
            let geofeed = GeofeedStore::new(self.pool)
                .create_geofeed(&ctx, name, is_draft)
                .await?;
            Ok(geofeed.id)
        }

        /// Insert a stored row for assertions and reconciliation fixtures.
        pub async fn insert_row(
            &self,
            user_id: Uuid,
            geofeed_id: Uuid,
            network: &str,
            country_code: &str,
            subdivision: &str,
        ) -> Result<u64, sqlx::Error> {
            let ctx = RequestContext { user_id };
            let row = NewGeofeedRow {
                network: network.to_string(),
                country_code: country_code.to_string(),
                subdivision: subdivision.to_string(),
                city: String::new(),
                postal_code: String::new(),
            };
            GeofeedStore::new(self.pool)
                .insert_rows(&ctx, geofeed_id, std::slice::from_ref(&row))
                .await
        }

        /// Count geofeeds with the given name, across drafts and finalized.
        pub async fn count_geofeeds_named(
            &self,
            user_id: Uuid,
            name: &str,
        ) -> Result<i64, sqlx::Error> {
            sqlx::query_scalar("SELECT count(*) FROM geofeeds WHERE user_id = $1 AND name = $2")
                .bind(user_id)
                .bind(name)
                .fetch_one(self.pool)
                .await
        }
    }

    pub mod database {
        use sqlx::PgPool;
        use sqlx::postgres::PgPoolOptions;
        use testcontainers::core::WaitFor;
        use testcontainers::{GenericImage, ImageExt};
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;

        static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        ///
        /// Each instance launches a disposable Postgres container, runs the
        /// migrations, and tears everything down when dropped. One
        /// container per test keeps isolation without a create/drop
        /// database dance.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            /// Provision a fresh migrated database in a new container.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let image = GenericImage::new("postgres", "16-alpine")
                    .with_wait_for(WaitFor::message_on_stdout(
                        "database system is ready to accept connections",
                    ))
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ));

                let request = image
                    .with_env_var("POSTGRES_DB", "geofeed")
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/geofeed", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    container: Some(container),
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and stop the container.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
                Ok(())
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration
    /// tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
        publish_config: Option<PublishConfig>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging
        /// disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
                publish_config: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for tests that exercise
        /// database-backed routes.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage token-validation state so `AuthUser`-guarded routes work.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Manage a publish configuration, typically rooted in a tempdir.
        pub fn manage_publish_config(mut self, config: PublishConfig) -> Self {
            self.publish_config = Some(config);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }
            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }
            if let Some(config) = self.publish_config {
                rocket = rocket.manage(config);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
