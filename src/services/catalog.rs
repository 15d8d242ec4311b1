//! Catalog service: books, copies and Cutter numbers

use std::collections::HashMap;

use crate::{
    circulation::{find_duplicate, suggest_registration_numbers},
    cutter::{book_cutter, rhyme_cutter, CutterSanborn, CutterScheme},
    error::{AppError, AppResult},
    models::{
        book::{
            Book, BookDetails, BookQuery, BookShort, BookStatistics, CreateBook, CutterPreview,
            CutterPreviewRequest, UpdateBook, WebsiteBook,
        },
        catalog::{Category, CategoryNode},
        quant::{CreateQuant, CreateQuantBatch, Quant, RegistrationSuggestion, UpdateQuant},
        Page, PageQuery,
    },
    repository::{books::Visibility, quants::NewQuant, Repository},
};

/// Language of books created without one
pub const DEFAULT_LANGUAGE: &str = "vi";

/// Maximum number of related books on a detail page
pub const RELATED_LIMIT: i64 = 6;

/// Nest categories under their parents, keeping the given order
pub fn category_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let mut children: HashMap<Option<i32>, Vec<&Category>> = HashMap::new();
    let known: std::collections::HashSet<i32> = categories.iter().map(|c| c.id).collect();
    for category in categories {
        // Orphans (hidden parent) become roots
        let parent = category.parent_id.filter(|p| known.contains(p));
        children.entry(parent).or_default().push(category);
    }

    fn build(parent: Option<i32>, children: &HashMap<Option<i32>, Vec<&Category>>) -> Vec<CategoryNode> {
        children
            .get(&parent)
            .map(|list| {
                list.iter()
                    .map(|c| CategoryNode {
                        id: c.id,
                        name: c.name.clone(),
                        slug: c.slug.clone(),
                        children: build(Some(c.id), children),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    build(None, &children)
}

fn normalize_language(language: Option<&str>) -> String {
    language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

fn manual_cutter(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Whether a book shows on the website for the given visitor
pub fn is_visible(details: &BookDetails, visibility: Visibility) -> bool {
    if !details.book.active || (visibility.published_only && !details.book.is_published) {
        return false;
    }
    if !visibility.restricted || details.allowed_borrower_type_ids.is_empty() {
        return true;
    }
    visibility
        .borrower_type_id
        .map(|t| details.allowed_borrower_type_ids.contains(&t))
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Cutter numbers

    /// Cutter number of a title in the scheme its language supports
    async fn compute_cutter(&self, title: &str, language: &str) -> AppResult<String> {
        let table = self.repository.references.rhyme_table(language).await?;
        let (scheme, code) = book_cutter(title, &table);
        tracing::debug!("Cutter for '{}' ({}, {:?}): {}", title, language, scheme, code);
        Ok(code)
    }

    pub async fn preview_cutter(&self, request: &CutterPreviewRequest) -> AppResult<CutterPreview> {
        let language = normalize_language(request.language.as_deref());
        let include_second = request.include_second_letter.unwrap_or(true);

        let (scheme, code) = match request.scheme {
            Some(CutterScheme::Sanborn) => (
                CutterScheme::Sanborn,
                CutterSanborn::generate_code(&request.text, include_second),
            ),
            Some(CutterScheme::Rhyme) => {
                let table = self.repository.references.rhyme_table(&language).await?;
                if table.is_empty() {
                    return Err(AppError::BusinessRule(format!(
                        "No character mappings defined for language '{}'",
                        language
                    )));
                }
                (CutterScheme::Rhyme, rhyme_cutter(&request.text, &table))
            }
            None => {
                let table = self.repository.references.rhyme_table(&language).await?;
                if table.is_empty() {
                    (
                        CutterScheme::Sanborn,
                        CutterSanborn::generate_code(&request.text, include_second),
                    )
                } else {
                    (CutterScheme::Rhyme, rhyme_cutter(&request.text, &table))
                }
            }
        };

        Ok(CutterPreview {
            scheme,
            code,
            normalized: CutterSanborn::normalize_title(&request.text),
        })
    }

    // Books

    /// Staff book search
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Page<BookShort>> {
        self.search_books(query, Visibility::staff()).await
    }

    /// Book search under a visibility, category filter includes descendants
    pub async fn search_books(&self, query: &BookQuery, visibility: Visibility) -> AppResult<Page<BookShort>> {
        let page = PageQuery {
            page: query.page,
            per_page: query.per_page,
        };
        let category_ids = match query.category_id {
            Some(id) => Some(self.repository.hierarchy.category_subtree_ids(id).await?),
            None => None,
        };
        let (items, total) = self
            .repository
            .books
            .list(query, category_ids, visibility, page.per_page(), page.offset())
            .await?;
        Ok(Page::new(items, total, &page))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Book with authors, reference names and copy counts
    pub async fn get_book_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;
        let authors = self.repository.books.authors(id).await?;
        let (publisher_name, category_name, series_name) =
            self.repository.books.reference_names(&book).await?;
        let allowed_borrower_type_ids = self.repository.books.allowed_borrower_types(id).await?;
        let availability = self.repository.books.availability(id).await?;

        Ok(BookDetails {
            book,
            authors,
            publisher_name,
            category_name,
            series_name,
            allowed_borrower_type_ids,
            availability,
        })
    }

    pub async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        let language = normalize_language(data.language.as_deref());
        let cutter = match manual_cutter(data.cutter_number.as_deref()) {
            Some(cutter) => cutter,
            None => self.compute_cutter(&data.title, &language).await?,
        };
        let book = self.repository.books.create(data, &language, &cutter).await?;
        tracing::info!("Created book {} '{}' ({})", book.id, book.title, cutter);
        Ok(book)
    }

    /// Update a book; the Cutter number follows title and language changes
    /// unless one is given
    pub async fn update_book(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let current = self.repository.books.get_by_id(id).await?;
        let title = data.title.as_deref().unwrap_or(&current.title);
        let language = match data.language.as_deref() {
            Some(l) => normalize_language(Some(l)),
            None => current.language.clone(),
        };

        let cutter = match manual_cutter(data.cutter_number.as_deref()) {
            Some(cutter) => cutter,
            None => {
                let changed = title != current.title || language != current.language;
                match (&current.cutter_number, changed) {
                    (Some(existing), false) => existing.clone(),
                    _ => self.compute_cutter(title, &language).await?,
                }
            }
        };

        self.repository.books.update(id, data, &cutter).await
    }

    pub async fn archive_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.archive(id).await?;
        tracing::info!("Archived book {}", id);
        Ok(())
    }

    pub async fn related_books(&self, book: &Book, visibility: Visibility) -> AppResult<Vec<BookShort>> {
        self.repository.books.related(book, visibility, RELATED_LIMIT).await
    }

    /// Visibility of the website for a visitor; members see the books of their type
    pub async fn visibility_for(&self, borrower_id: Option<i32>) -> AppResult<Visibility> {
        let borrower_type_id = match borrower_id {
            Some(id) => self.repository.borrowers.get_by_id(id).await?.borrower_type_id,
            None => None,
        };
        Ok(Visibility::public(borrower_type_id))
    }

    /// Book page of the website with availability and related books
    pub async fn website_book(&self, id: i32, visibility: Visibility) -> AppResult<WebsiteBook> {
        let details = self.get_book_details(id).await?;
        if !is_visible(&details, visibility) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        let related = self.related_books(&details.book, visibility).await?;
        Ok(WebsiteBook { details, related })
    }

    pub async fn book_statistics(&self, page: &PageQuery) -> AppResult<Page<BookStatistics>> {
        let (items, total) = self
            .repository
            .books
            .statistics(page.per_page(), page.offset())
            .await?;
        Ok(Page::new(items, total, page))
    }

    // Copies

    pub async fn list_quants(&self, book_id: i32, include_inactive: bool) -> AppResult<Vec<Quant>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.quants.list_for_book(book_id, include_inactive).await
    }

    pub async fn get_quant(&self, id: i32) -> AppResult<Quant> {
        self.repository.quants.get_by_id(id).await
    }

    pub async fn suggest_registrations(&self, book_id: i32, count: usize) -> AppResult<RegistrationSuggestion> {
        self.repository.books.get_by_id(book_id).await?;
        let last = self.repository.quants.last_registration_number(book_id).await?;
        let suggestions = suggest_registration_numbers(last.as_deref(), count.clamp(1, 500));
        Ok(RegistrationSuggestion { last, suggestions })
    }

    /// Reject numbers repeated in the request or already used by another copy
    async fn check_registration_numbers(&self, numbers: &[String], exclude_id: Option<i32>) -> AppResult<()> {
        if let Some(dup) = find_duplicate(numbers) {
            return Err(AppError::Conflict(format!(
                "Registration number {} appears more than once",
                dup
            )));
        }
        let existing = self
            .repository
            .quants
            .existing_registration_numbers(numbers, exclude_id)
            .await?;
        if !existing.is_empty() {
            return Err(AppError::Conflict(format!(
                "Registration numbers already exist: {}",
                existing.join(", ")
            )));
        }
        Ok(())
    }

    pub async fn create_quant(&self, book_id: i32, data: &CreateQuant) -> AppResult<Quant> {
        let book = self.repository.books.get_by_id(book_id).await?;
        if !book.active {
            return Err(AppError::BusinessRule("Cannot add copies to an archived book".to_string()));
        }

        let number = match data.registration_number.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self
                .suggest_registrations(book_id, 1)
                .await?
                .suggestions
                .remove(0),
        };
        self.check_registration_numbers(std::slice::from_ref(&number), None)
            .await?;

        let mut created = self
            .repository
            .quants
            .create_many(
                book_id,
                &[NewQuant {
                    registration_number: number,
                    location_id: data.location_id,
                    quant_type_id: data.quant_type_id,
                    quantity: data.quantity.unwrap_or(1),
                    acquisition_date: data.acquisition_date,
                    price: data.price,
                    note: data.note.clone(),
                }],
            )
            .await?;
        created
            .pop()
            .ok_or_else(|| AppError::Internal("Copy was not created".to_string()))
    }

    /// Create `count` copies, numbered explicitly or from the last copy
    pub async fn create_quant_batch(&self, book_id: i32, data: &CreateQuantBatch) -> AppResult<Vec<Quant>> {
        let book = self.repository.books.get_by_id(book_id).await?;
        if !book.active {
            return Err(AppError::BusinessRule("Cannot add copies to an archived book".to_string()));
        }

        let numbers: Vec<String> = match &data.registration_numbers {
            Some(numbers) => {
                if numbers.len() != data.count as usize {
                    return Err(AppError::Validation(format!(
                        "Expected {} registration numbers, got {}",
                        data.count,
                        numbers.len()
                    )));
                }
                if numbers.iter().any(|n| n.trim().is_empty()) {
                    return Err(AppError::Validation(
                        "Registration numbers cannot be empty".to_string(),
                    ));
                }
                numbers.iter().map(|n| n.trim().to_string()).collect()
            }
            None => {
                self.suggest_registrations(book_id, data.count as usize)
                    .await?
                    .suggestions
            }
        };
        self.check_registration_numbers(&numbers, None).await?;

        let items: Vec<NewQuant> = numbers
            .into_iter()
            .map(|registration_number| NewQuant {
                registration_number,
                location_id: data.location_id,
                quant_type_id: data.quant_type_id,
                quantity: 1,
                acquisition_date: data.acquisition_date,
                price: data.price,
                note: data.note.clone(),
            })
            .collect();

        let created = self.repository.quants.create_many(book_id, &items).await?;
        tracing::info!("Created {} copies of book {}", created.len(), book_id);
        Ok(created)
    }

    pub async fn update_quant(&self, id: i32, data: &UpdateQuant) -> AppResult<Quant> {
        let current = self.repository.quants.get_by_id(id).await?;

        if let Some(state) = data.state {
            if !state.is_manual() {
                return Err(AppError::Validation(format!(
                    "State '{}' cannot be set by hand",
                    state
                )));
            }
            if current.state.is_in_circulation() && state != current.state {
                return Err(AppError::BusinessRule(format!(
                    "Copy {} is {} and cannot change state by hand",
                    current.registration_number.as_deref().unwrap_or("-"),
                    current.state
                )));
            }
        }
        if let Some(number) = data.registration_number.as_deref() {
            self.check_registration_numbers(&[number.trim().to_string()], Some(id))
                .await?;
        }

        self.repository.quants.update(id, data).await
    }

    pub async fn archive_quant(&self, id: i32) -> AppResult<()> {
        self.repository.quants.archive(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::AccessLevel;
    use chrono::Utc;

    fn category(id: i32, parent_id: Option<i32>, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            slug: None,
            parent_id,
            parent_path: String::new(),
            complete_name: name.to_string(),
            sequence: 0,
            access_level: AccessLevel::Public,
            is_website_menu: true,
            description: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_tree() {
        let categories = vec![
            category(1, None, "Kinh"),
            category(2, Some(1), "Nikaya"),
            category(3, Some(2), "Trung Bo"),
            category(4, None, "Luat"),
            category(5, Some(99), "Orphan"),
        ];
        let tree = category_tree(&categories);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[0].name, "Kinh");
        assert_eq!(tree[0].children[0].children[0].id, 3);
        assert_eq!(tree[1].id, 4);
        assert_eq!(tree[2].id, 5);
    }

    fn details(published: bool, allowed: Vec<i32>) -> BookDetails {
        BookDetails {
            book: Book {
                id: 1,
                title: "Kinh Phap Cu".to_string(),
                subtitle: None,
                isbn: None,
                publisher_id: None,
                category_id: None,
                series_id: None,
                language: "vi".to_string(),
                publication_year: None,
                pages: None,
                description: None,
                keywords: None,
                cutter_number: None,
                is_published: published,
                active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            authors: vec![],
            publisher_name: None,
            category_name: None,
            series_name: None,
            allowed_borrower_type_ids: allowed,
            availability: Default::default(),
        }
    }

    #[test]
    fn test_website_visibility() {
        assert!(is_visible(&details(true, vec![]), Visibility::public(None)));
        assert!(!is_visible(&details(false, vec![]), Visibility::public(None)));
        assert!(is_visible(&details(false, vec![]), Visibility::staff()));

        let restricted = details(true, vec![2, 3]);
        assert!(!is_visible(&restricted, Visibility::public(None)));
        assert!(!is_visible(&restricted, Visibility::public(Some(1))));
        assert!(is_visible(&restricted, Visibility::public(Some(3))));
    }

    #[test]
    fn test_language_and_manual_cutter() {
        assert_eq!(normalize_language(None), "vi");
        assert_eq!(normalize_language(Some(" EN ")), "en");
        assert_eq!(manual_cutter(Some("  ")), None);
        assert_eq!(manual_cutter(Some(" R100M ")), Some("R100M".to_string()));
    }
}
