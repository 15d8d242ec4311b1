//! Repository layer for database operations

pub mod books;
pub mod borrowers;
pub mod borrowings;
pub mod hierarchy;
pub mod parameters;
pub mod quants;
pub mod references;
pub mod reservations;
pub mod resources;
pub mod signups;
pub mod stats;
pub mod users;

use sqlx::{PgConnection, Pool, Postgres};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub quants: quants::QuantsRepository,
    pub references: references::ReferencesRepository,
    pub hierarchy: hierarchy::HierarchyRepository,
    pub borrowers: borrowers::BorrowersRepository,
    pub borrowings: borrowings::BorrowingsRepository,
    pub reservations: reservations::ReservationsRepository,
    pub resources: resources::ResourcesRepository,
    pub signups: signups::SignupsRepository,
    pub users: users::UsersRepository,
    pub parameters: parameters::ParametersRepository,
    pub stats: stats::StatsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            quants: quants::QuantsRepository::new(pool.clone()),
            references: references::ReferencesRepository::new(pool.clone()),
            hierarchy: hierarchy::HierarchyRepository::new(pool.clone()),
            borrowers: borrowers::BorrowersRepository::new(pool.clone()),
            borrowings: borrowings::BorrowingsRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            resources: resources::ResourcesRepository::new(pool.clone()),
            signups: signups::SignupsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            parameters: parameters::ParametersRepository::new(pool.clone()),
            stats: stats::StatsRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Increment and return the counter of a naming scope (e.g. "borrowing/2024/05")
pub async fn next_sequence(conn: &mut PgConnection, scope: &str) -> AppResult<i32> {
    let value = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO name_sequences (scope, last_value) VALUES ($1, 1)
        ON CONFLICT (scope) DO UPDATE SET last_value = name_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(scope)
    .fetch_one(&mut *conn)
    .await?;
    Ok(value)
}

/// `%term%` pattern for ILIKE searches
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim().replace('%', "\\%").replace('_', "\\_"))
}
