//! Books repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{
        Book, BookAuthor, BookAvailability, BookQuery, BookShort, BookStatistics, CreateBook,
        UpdateBook,
    },
};

use super::like_pattern;

/// Columns of `BookShort`, `b` is the books alias
const BOOK_SHORT_COLUMNS: &str = r#"
    b.id, b.title, b.cutter_number, b.category_id, c.complete_name AS category_name,
    (SELECT string_agg(a.name, ', ' ORDER BY ba.position, a.name)
       FROM book_authors ba JOIN authors a ON a.id = ba.author_id
      WHERE ba.book_id = b.id) AS author_names,
    b.publication_year,
    COALESCE((SELECT SUM(q.quantity) FROM book_quants q
               WHERE q.book_id = b.id AND q.active), 0)::bigint AS quant_count,
    (SELECT COUNT(*) FROM book_quants q
      WHERE q.book_id = b.id AND q.active AND q.state = 'available'
        AND q.registration_number IS NOT NULL) AS available_count,
    b.created_at
"#;

/// Filter shared by list and count, parameters $1..$8
const BOOK_FILTER: &str = r#"
    b.active
    AND ($1::text IS NULL OR b.title ILIKE $1 OR b.keywords ILIKE $1 OR b.isbn ILIKE $1
         OR EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                     WHERE ba.book_id = b.id AND a.name ILIKE $1))
    AND ($2::int[] IS NULL OR b.category_id = ANY($2))
    AND ($3::int IS NULL OR b.publisher_id = $3)
    AND ($4::int IS NULL OR b.series_id = $4)
    AND ($5::int IS NULL OR EXISTS (SELECT 1 FROM book_authors ba
                                     WHERE ba.book_id = b.id AND ba.author_id = $5))
    AND (NOT $6 OR b.is_published)
    AND (NOT $7
         OR NOT EXISTS (SELECT 1 FROM book_borrower_types bt WHERE bt.book_id = b.id)
         OR EXISTS (SELECT 1 FROM book_borrower_types bt
                     WHERE bt.book_id = b.id AND bt.borrower_type_id = $8))
"#;

/// Who is browsing: decides published-only and borrower type visibility
#[derive(Debug, Clone, Copy, Default)]
pub struct Visibility {
    pub published_only: bool,
    /// Apply borrower type restrictions
    pub restricted: bool,
    /// Borrower type of the member browsing, if any
    pub borrower_type_id: Option<i32>,
}

impl Visibility {
    pub fn staff() -> Self {
        Self::default()
    }

    pub fn public(borrower_type_id: Option<i32>) -> Self {
        Self {
            published_only: true,
            restricted: true,
            borrower_type_id,
        }
    }
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books with filters and pagination; `category_ids` already holds descendants
    pub async fn list(
        &self,
        query: &BookQuery,
        category_ids: Option<Vec<i32>>,
        visibility: Visibility,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<BookShort>, i64)> {
        let search = query.search.as_deref().filter(|s| !s.trim().is_empty()).map(like_pattern);
        let order = query.sort.unwrap_or_default().order_clause();

        let count_sql = format!("SELECT COUNT(*) FROM books b WHERE {}", BOOK_FILTER);
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(&search)
            .bind(&category_ids)
            .bind(query.publisher_id)
            .bind(query.series_id)
            .bind(query.author_id)
            .bind(visibility.published_only)
            .bind(visibility.restricted)
            .bind(visibility.borrower_type_id)
            .fetch_one(&self.pool)
            .await?;

        let select_sql = format!(
            "SELECT {} FROM books b LEFT JOIN categories c ON c.id = b.category_id WHERE {} ORDER BY {} LIMIT $9 OFFSET $10",
            BOOK_SHORT_COLUMNS, BOOK_FILTER, order
        );
        let rows = sqlx::query_as::<_, BookShort>(&select_sql)
            .bind(&search)
            .bind(&category_ids)
            .bind(query.publisher_id)
            .bind(query.series_id)
            .bind(query.author_id)
            .bind(visibility.published_only)
            .bind(visibility.restricted)
            .bind(visibility.borrower_type_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn authors(&self, book_id: i32) -> AppResult<Vec<BookAuthor>> {
        let rows = sqlx::query_as::<_, BookAuthor>(
            r#"
            SELECT a.id, a.name FROM book_authors ba JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = $1
            ORDER BY ba.position, a.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn allowed_borrower_types(&self, book_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT borrower_type_id FROM book_borrower_types WHERE book_id = $1 ORDER BY borrower_type_id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Publisher, category and series display names
    pub async fn reference_names(
        &self,
        book: &Book,
    ) -> AppResult<(Option<String>, Option<String>, Option<String>)> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>, Option<String>)>(
            r#"
            SELECT
                (SELECT name FROM publishers WHERE id = $1),
                (SELECT complete_name FROM categories WHERE id = $2),
                (SELECT name FROM series WHERE id = $3)
            "#,
        )
        .bind(book.publisher_id)
        .bind(book.category_id)
        .bind(book.series_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn availability(&self, book_id: i32) -> AppResult<BookAvailability> {
        let row = sqlx::query_as::<_, BookAvailability>(
            r#"
            SELECT
                COALESCE(SUM(q.quantity) FILTER (WHERE q.active), 0)::bigint AS quant_count,
                COUNT(*) FILTER (WHERE q.active AND q.state = 'available'
                                 AND q.registration_number IS NOT NULL) AS available_count,
                COUNT(*) FILTER (WHERE q.active AND q.state = 'borrowed') AS borrowed_count,
                (SELECT COUNT(*) FROM reservations r
                  WHERE r.book_id = $1 AND r.state IN ('active', 'available')) AS reservation_count
            FROM book_quants q
            WHERE q.book_id = $1
            "#,
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn replace_links(
        conn: &mut PgConnection,
        book_id: i32,
        author_ids: Option<&[i32]>,
        borrower_type_ids: Option<&[i32]>,
    ) -> AppResult<()> {
        if let Some(author_ids) = author_ids {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(book_id)
                .execute(&mut *conn)
                .await?;
            for (position, author_id) in author_ids.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO book_authors (book_id, author_id, position) VALUES ($1, $2, $3)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(book_id)
                .bind(author_id)
                .bind(position as i32)
                .execute(&mut *conn)
                .await?;
            }
        }
        if let Some(type_ids) = borrower_type_ids {
            sqlx::query("DELETE FROM book_borrower_types WHERE book_id = $1")
                .bind(book_id)
                .execute(&mut *conn)
                .await?;
            sqlx::query(
                r#"
                INSERT INTO book_borrower_types (book_id, borrower_type_id)
                SELECT $1, UNNEST($2::int[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(book_id)
            .bind(type_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Create a book with its authors and borrower type restrictions
    pub async fn create(&self, data: &CreateBook, language: &str, cutter_number: &str) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, subtitle, isbn, publisher_id, category_id, series_id, language,
                publication_year, pages, description, keywords, cutter_number, is_published
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.subtitle)
        .bind(&data.isbn)
        .bind(data.publisher_id)
        .bind(data.category_id)
        .bind(data.series_id)
        .bind(language)
        .bind(data.publication_year)
        .bind(data.pages)
        .bind(&data.description)
        .bind(&data.keywords)
        .bind(cutter_number)
        .bind(data.is_published.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_links(
            &mut tx,
            book.id,
            Some(&data.author_ids),
            Some(&data.allowed_borrower_type_ids),
        )
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Update a book; absent fields are kept
    pub async fn update(&self, id: i32, data: &UpdateBook, cutter_number: &str) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                subtitle = COALESCE($3, subtitle),
                isbn = COALESCE($4, isbn),
                publisher_id = COALESCE($5, publisher_id),
                category_id = COALESCE($6, category_id),
                series_id = COALESCE($7, series_id),
                language = COALESCE($8, language),
                publication_year = COALESCE($9, publication_year),
                pages = COALESCE($10, pages),
                description = COALESCE($11, description),
                keywords = COALESCE($12, keywords),
                is_published = COALESCE($13, is_published),
                cutter_number = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(&data.subtitle)
        .bind(&data.isbn)
        .bind(data.publisher_id)
        .bind(data.category_id)
        .bind(data.series_id)
        .bind(&data.language)
        .bind(data.publication_year)
        .bind(data.pages)
        .bind(&data.description)
        .bind(&data.keywords)
        .bind(data.is_published)
        .bind(cutter_number)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        Self::replace_links(
            &mut tx,
            id,
            data.author_ids.as_deref(),
            data.allowed_borrower_type_ids.as_deref(),
        )
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Soft delete, refused while copies are on loan
    pub async fn archive(&self, id: i32) -> AppResult<()> {
        let on_loan: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_quants WHERE book_id = $1 AND state = 'borrowed')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if on_loan {
            return Err(AppError::BusinessRule(
                "Cannot archive a book with copies on loan".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE books SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Published books sharing the category or an author
    pub async fn related(&self, book: &Book, visibility: Visibility, limit: i64) -> AppResult<Vec<BookShort>> {
        let sql = format!(
            r#"
            SELECT {} FROM books b LEFT JOIN categories c ON c.id = b.category_id
            WHERE b.active AND b.is_published AND b.id <> $1
              AND ((b.category_id IS NOT NULL AND b.category_id = $2)
                   OR EXISTS (SELECT 1 FROM book_authors x JOIN book_authors y ON x.author_id = y.author_id
                               WHERE x.book_id = b.id AND y.book_id = $1))
              AND (NOT $3
                   OR NOT EXISTS (SELECT 1 FROM book_borrower_types bt WHERE bt.book_id = b.id)
                   OR EXISTS (SELECT 1 FROM book_borrower_types bt
                               WHERE bt.book_id = b.id AND bt.borrower_type_id = $4))
            ORDER BY (b.category_id IS NOT DISTINCT FROM $2) DESC, b.created_at DESC
            LIMIT $5
            "#,
            BOOK_SHORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookShort>(&sql)
            .bind(book.id)
            .bind(book.category_id)
            .bind(visibility.restricted)
            .bind(visibility.borrower_type_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Books created since a date
    pub async fn created_since(&self, since: chrono::NaiveDate, limit: i64) -> AppResult<Vec<BookShort>> {
        let sql = format!(
            r#"
            SELECT {} FROM books b LEFT JOIN categories c ON c.id = b.category_id
            WHERE b.active AND b.created_at >= $1::date
            ORDER BY b.created_at DESC
            LIMIT $2
            "#,
            BOOK_SHORT_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookShort>(&sql)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Rows of the `book_statistics` view
    pub async fn statistics(&self, limit: i64, offset: i64) -> AppResult<(Vec<BookStatistics>, i64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM book_statistics")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, BookStatistics>(
            "SELECT * FROM book_statistics ORDER BY title, book_id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok((rows, total))
    }
}
