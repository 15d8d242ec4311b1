//! Reference data repository: authors, publishers, series, quant types,
//! borrower types and Cutter character mappings

use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, FromRow, Pool, Postgres};
use unicode_normalization::UnicodeNormalization;

use crate::{
    cutter::RhymeTable,
    error::{map_unique_violation, AppError, AppResult},
    models::{
        borrower::{BorrowerType, BorrowerTypeInput},
        catalog::{
            Author, AuthorInput, CharacterMapping, CharacterMappingInput, Publisher,
            PublisherInput, QuantType, QuantTypeInput, ReferenceQuery, Series, SeriesInput,
        },
    },
};

use super::like_pattern;

#[derive(Clone)]
pub struct ReferencesRepository {
    pool: Pool<Postgres>,
}

impl ReferencesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn list_named<T>(&self, table: &'static str, query: &ReferenceQuery) -> AppResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "SELECT * FROM {} WHERE ($1::text IS NULL OR name ILIKE $1) AND ($2 OR active) ORDER BY name, id",
            table
        );
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(query.name.as_deref().map(like_pattern))
            .bind(query.include_inactive.unwrap_or(false))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_one<T>(&self, table: &'static str, label: &str, id: i32) -> AppResult<T>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE id = $1", table);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", label, id)))
    }

    async fn archive(&self, table: &'static str, label: &str, id: i32) -> AppResult<()> {
        let sql = format!("UPDATE {} SET active = FALSE WHERE id = $1", table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} with id {} not found", label, id)));
        }
        Ok(())
    }

    // Authors

    pub async fn list_authors(&self, query: &ReferenceQuery) -> AppResult<Vec<Author>> {
        self.list_named("authors", query).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.get_one("authors", "Author", id).await
    }

    pub async fn create_author(&self, data: &AuthorInput) -> AppResult<Author> {
        let row = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (name, birth_date, death_date, nationality, biography)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.birth_date)
        .bind(data.death_date)
        .bind(&data.nationality)
        .bind(&data.biography)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_author(&self, id: i32, data: &AuthorInput) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET name = $2, birth_date = $3, death_date = $4, nationality = $5, biography = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.birth_date)
        .bind(data.death_date)
        .bind(&data.nationality)
        .bind(&data.biography)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn archive_author(&self, id: i32) -> AppResult<()> {
        self.archive("authors", "Author", id).await
    }

    // Publishers

    pub async fn list_publishers(&self, query: &ReferenceQuery) -> AppResult<Vec<Publisher>> {
        self.list_named("publishers", query).await
    }

    pub async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        self.get_one("publishers", "Publisher", id).await
    }

    pub async fn create_publisher(&self, data: &PublisherInput) -> AppResult<Publisher> {
        let row = sqlx::query_as::<_, Publisher>(
            r#"
            INSERT INTO publishers (name, address, phone, email, website)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(&data.address)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(&data.website)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_publisher(&self, id: i32, data: &PublisherInput) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>(
            r#"
            UPDATE publishers
            SET name = $2, address = $3, phone = $4, email = $5, website = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.address)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(&data.website)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))
    }

    pub async fn archive_publisher(&self, id: i32) -> AppResult<()> {
        self.archive("publishers", "Publisher", id).await
    }

    // Series

    pub async fn list_series(&self, query: &ReferenceQuery) -> AppResult<Vec<Series>> {
        self.list_named("series", query).await
    }

    pub async fn get_series(&self, id: i32) -> AppResult<Series> {
        self.get_one("series", "Series", id).await
    }

    pub async fn create_series(&self, data: &SeriesInput) -> AppResult<Series> {
        let row = sqlx::query_as::<_, Series>(
            "INSERT INTO series (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(data.name.trim())
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_series(&self, id: i32, data: &SeriesInput) -> AppResult<Series> {
        sqlx::query_as::<_, Series>(
            "UPDATE series SET name = $2, description = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Series with id {} not found", id)))
    }

    pub async fn archive_series(&self, id: i32) -> AppResult<()> {
        self.archive("series", "Series", id).await
    }

    // Quant types

    pub async fn list_quant_types(&self, query: &ReferenceQuery) -> AppResult<Vec<QuantType>> {
        self.list_named("quant_types", query).await
    }

    pub async fn get_quant_type(&self, id: i32) -> AppResult<QuantType> {
        self.get_one("quant_types", "Quant type", id).await
    }

    pub async fn create_quant_type(&self, data: &QuantTypeInput) -> AppResult<QuantType> {
        sqlx::query_as::<_, QuantType>(
            r#"
            INSERT INTO quant_types (name, code, color, can_borrow, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.code.trim().to_uppercase())
        .bind(&data.color)
        .bind(data.can_borrow)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Quant type code '{}' already exists", data.code)))
    }

    pub async fn update_quant_type(&self, id: i32, data: &QuantTypeInput) -> AppResult<QuantType> {
        sqlx::query_as::<_, QuantType>(
            r#"
            UPDATE quant_types
            SET name = $2, code = $3, color = $4, can_borrow = $5, description = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.code.trim().to_uppercase())
        .bind(&data.color)
        .bind(data.can_borrow)
        .bind(&data.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Quant type code '{}' already exists", data.code)))?
        .ok_or_else(|| AppError::NotFound(format!("Quant type with id {} not found", id)))
    }

    pub async fn archive_quant_type(&self, id: i32) -> AppResult<()> {
        self.archive("quant_types", "Quant type", id).await
    }

    // Borrower types

    pub async fn list_borrower_types(&self, query: &ReferenceQuery) -> AppResult<Vec<BorrowerType>> {
        self.list_named("borrower_types", query).await
    }

    pub async fn get_borrower_type(&self, id: i32) -> AppResult<BorrowerType> {
        self.get_one("borrower_types", "Borrower type", id).await
    }

    pub async fn create_borrower_type(
        &self,
        data: &BorrowerTypeInput,
        default_fine: Decimal,
    ) -> AppResult<BorrowerType> {
        sqlx::query_as::<_, BorrowerType>(
            r#"
            INSERT INTO borrower_types (
                name, code, max_books, max_days, daily_fine_amount,
                can_reserve, can_extend, max_extensions, description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.code.trim().to_uppercase())
        .bind(data.max_books)
        .bind(data.max_days)
        .bind(data.daily_fine_amount.unwrap_or(default_fine))
        .bind(data.can_reserve)
        .bind(data.can_extend)
        .bind(data.max_extensions)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Borrower type code '{}' already exists", data.code)))
    }

    pub async fn update_borrower_type(
        &self,
        id: i32,
        data: &BorrowerTypeInput,
        default_fine: Decimal,
    ) -> AppResult<BorrowerType> {
        sqlx::query_as::<_, BorrowerType>(
            r#"
            UPDATE borrower_types
            SET name = $2, code = $3, max_books = $4, max_days = $5, daily_fine_amount = $6,
                can_reserve = $7, can_extend = $8, max_extensions = $9, description = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.code.trim().to_uppercase())
        .bind(data.max_books)
        .bind(data.max_days)
        .bind(data.daily_fine_amount.unwrap_or(default_fine))
        .bind(data.can_reserve)
        .bind(data.can_extend)
        .bind(data.max_extensions)
        .bind(&data.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Borrower type code '{}' already exists", data.code)))?
        .ok_or_else(|| AppError::NotFound(format!("Borrower type with id {} not found", id)))
    }

    pub async fn archive_borrower_type(&self, id: i32) -> AppResult<()> {
        self.archive("borrower_types", "Borrower type", id).await
    }

    // Character mappings

    pub async fn list_mappings(
        &self,
        language: Option<&str>,
        include_inactive: bool,
    ) -> AppResult<Vec<CharacterMapping>> {
        let rows = sqlx::query_as::<_, CharacterMapping>(
            r#"
            SELECT * FROM character_mappings
            WHERE ($1::text IS NULL OR language = $1) AND ($2 OR active)
            ORDER BY language, rhyme
            "#,
        )
        .bind(language)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_mapping(&self, data: &CharacterMappingInput) -> AppResult<CharacterMapping> {
        sqlx::query_as::<_, CharacterMapping>(
            "INSERT INTO character_mappings (rhyme, code, language) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(data.rhyme.trim().to_lowercase())
        .bind(data.code.trim())
        .bind(data.language.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Mapping for rhyme '{}' already exists", data.rhyme)))
    }

    pub async fn update_mapping(&self, id: i32, data: &CharacterMappingInput) -> AppResult<CharacterMapping> {
        sqlx::query_as::<_, CharacterMapping>(
            r#"
            UPDATE character_mappings SET rhyme = $2, code = $3, language = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.rhyme.trim().to_lowercase())
        .bind(data.code.trim())
        .bind(data.language.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Mapping for rhyme '{}' already exists", data.rhyme)))?
        .ok_or_else(|| AppError::NotFound(format!("Character mapping with id {} not found", id)))
    }

    pub async fn archive_mapping(&self, id: i32) -> AppResult<()> {
        self.archive("character_mappings", "Character mapping", id).await
    }

    /// Active rhyme table of a language, empty when none is defined
    pub async fn rhyme_table(&self, language: &str) -> AppResult<RhymeTable> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT rhyme, code FROM character_mappings WHERE language = $1 AND active ORDER BY id",
        )
        .bind(language)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(rhyme, code)| (rhyme.nfc().collect::<String>(), code))
            .collect())
    }
}
