//! Library Server - REST API for library management

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!("Starting Library Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(repository.clone(), &config);

    if let Some(password) = services.users.bootstrap_admin().await? {
        tracing::warn!(
            "Created administrator '{}' with generated password '{}', change it now",
            config.auth.bootstrap_admin_login,
            password
        );
    }

    if config.scheduler.enabled {
        services.scheduler(repository, &config).spawn();
    } else {
        tracing::info!("Circulation scheduler disabled");
    }

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        .route("/auth/setup-password", post(api::auth::setup_password))
        // Accounts
        .route("/users", get(api::users::list_users).post(api::users::create_user))
        .route("/users/:id", get(api::users::get_user).put(api::users::update_user))
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route("/books/statistics", get(api::books::book_statistics))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        .route(
            "/books/:id/quants",
            get(api::books::list_quants).post(api::books::create_quant),
        )
        .route("/books/:id/quants/batch", post(api::books::create_quant_batch))
        .route(
            "/books/:id/quants/suggestions",
            get(api::books::suggest_registrations),
        )
        .route(
            "/quants/:id",
            get(api::books::get_quant)
                .put(api::books::update_quant)
                .delete(api::books::delete_quant),
        )
        .route("/cutter/preview", post(api::books::preview_cutter))
        // References
        .route(
            "/authors",
            get(api::references::list_authors).post(api::references::create_author),
        )
        .route(
            "/authors/:id",
            get(api::references::get_author)
                .put(api::references::update_author)
                .delete(api::references::delete_author),
        )
        .route(
            "/publishers",
            get(api::references::list_publishers).post(api::references::create_publisher),
        )
        .route(
            "/publishers/:id",
            get(api::references::get_publisher)
                .put(api::references::update_publisher)
                .delete(api::references::delete_publisher),
        )
        .route(
            "/series",
            get(api::references::list_series).post(api::references::create_series),
        )
        .route(
            "/series/:id",
            get(api::references::get_series)
                .put(api::references::update_series)
                .delete(api::references::delete_series),
        )
        .route(
            "/quant-types",
            get(api::references::list_quant_types).post(api::references::create_quant_type),
        )
        .route(
            "/quant-types/:id",
            get(api::references::get_quant_type)
                .put(api::references::update_quant_type)
                .delete(api::references::delete_quant_type),
        )
        .route(
            "/borrower-types",
            get(api::references::list_borrower_types).post(api::references::create_borrower_type),
        )
        .route(
            "/borrower-types/:id",
            get(api::references::get_borrower_type)
                .put(api::references::update_borrower_type)
                .delete(api::references::delete_borrower_type),
        )
        .route(
            "/categories",
            get(api::references::list_categories).post(api::references::create_category),
        )
        .route(
            "/categories/:id",
            get(api::references::get_category)
                .put(api::references::update_category)
                .delete(api::references::delete_category),
        )
        .route(
            "/locations",
            get(api::references::list_locations).post(api::references::create_location),
        )
        .route(
            "/locations/:id",
            get(api::references::get_location)
                .put(api::references::update_location)
                .delete(api::references::delete_location),
        )
        .route(
            "/character-mappings",
            get(api::references::list_mappings).post(api::references::create_mapping),
        )
        .route(
            "/character-mappings/:id",
            put(api::references::update_mapping).delete(api::references::delete_mapping),
        )
        // Resources
        .route(
            "/resources",
            get(api::resources::list_resources).post(api::resources::create_resource),
        )
        .route(
            "/resources/:id",
            get(api::resources::get_resource)
                .put(api::resources::update_resource)
                .delete(api::resources::delete_resource),
        )
        .route(
            "/resources/:id/books",
            get(api::resources::list_resource_books)
                .post(api::resources::add_resource_books)
                .delete(api::resources::remove_resource_books),
        )
        .route(
            "/resources/:id/borrowers/:borrower_id",
            get(api::resources::borrower_stats),
        )
        // Borrowers
        .route(
            "/borrowers",
            get(api::borrowers::list_borrowers).post(api::borrowers::create_borrower),
        )
        .route(
            "/borrowers/:id",
            get(api::borrowers::get_borrower)
                .put(api::borrowers::update_borrower)
                .delete(api::borrowers::delete_borrower),
        )
        .route(
            "/borrowers/:id/renew-membership",
            post(api::borrowers::renew_membership),
        )
        // Borrowings
        .route(
            "/borrowings",
            get(api::borrowings::list_borrowings).post(api::borrowings::create_borrowing),
        )
        .route("/borrowings/:id", get(api::borrowings::get_borrowing))
        .route("/borrowings/:id/lines", post(api::borrowings::add_line))
        .route("/borrowings/:id/lines/:line_id", delete(api::borrowings::remove_line))
        .route(
            "/borrowings/:id/lines/:line_id/allocate",
            post(api::borrowings::allocate),
        )
        .route(
            "/borrowings/:id/clear-allocations",
            post(api::borrowings::clear_allocations),
        )
        .route("/borrowings/:id/confirm", post(api::borrowings::confirm_borrowing))
        .route("/borrowings/:id/return", post(api::borrowings::return_borrowing))
        .route(
            "/borrowings/:id/copies/:quant_line_id/renew",
            post(api::borrowings::renew_copy),
        )
        .route("/borrowings/:id/lost", post(api::borrowings::mark_lost))
        .route("/borrowings/:id/cancel", post(api::borrowings::cancel_borrowing))
        .route("/borrowings/:id/draft", post(api::borrowings::set_draft))
        // Reservations
        .route(
            "/reservations",
            get(api::reservations::list_reservations).post(api::reservations::create_reservation),
        )
        .route("/reservations/:id", get(api::reservations::get_reservation))
        .route(
            "/reservations/:id/confirm",
            post(api::reservations::confirm_reservation),
        )
        .route("/reservations/:id/notify", post(api::reservations::notify_available))
        .route(
            "/reservations/:id/fulfill",
            post(api::reservations::fulfill_reservation),
        )
        .route("/reservations/:id/cancel", post(api::reservations::cancel_reservation))
        .route("/reservations/:id/draft", post(api::reservations::set_draft))
        // Signups
        .route(
            "/signups",
            get(api::signups::list_signups).post(api::signups::submit_signup),
        )
        .route("/signups/:id", get(api::signups::get_signup))
        .route("/signups/:id/approve", post(api::signups::approve_signup))
        .route("/signups/:id/reject", post(api::signups::reject_signup))
        .route("/signups/:id/reset", post(api::signups::reset_signup))
        // Member portal
        .route("/my/profile", get(api::portal::my_profile))
        .route("/my/borrowings", get(api::portal::my_borrowings))
        .route("/my/borrowings/:id", get(api::portal::my_borrowing))
        .route(
            "/my/borrowings/:id/copies/:quant_line_id/renew",
            post(api::portal::renew_my_copy),
        )
        .route(
            "/my/reservations",
            get(api::portal::my_reservations).post(api::portal::reserve_book),
        )
        .route(
            "/my/reservations/:id/cancel",
            post(api::portal::cancel_my_reservation),
        )
        .route("/my/cart", get(api::portal::my_cart))
        .route("/my/cart/lines", post(api::portal::add_to_cart))
        .route("/my/cart/lines/:line_id", delete(api::portal::remove_from_cart))
        .route("/my/cart/checkout", post(api::portal::checkout))
        .route("/my/history", get(api::portal::my_history))
        // Website catalog
        .route("/catalog/books", get(api::website::list_books))
        .route("/catalog/books/:id", get(api::website::get_book))
        .route("/catalog/categories", get(api::website::categories))
        // Statistics
        .route("/stats/dashboard", get(api::stats::dashboard))
        // Settings
        .route("/settings", get(api::settings::get_settings))
        .route(
            "/settings/:key",
            put(api::settings::set_setting).delete(api::settings::reset_setting),
        )
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
