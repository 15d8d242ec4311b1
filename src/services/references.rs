//! Reference data service: authors, publishers, series, quant and borrower
//! types, character mappings and the category/location hierarchies

use crate::{
    error::AppResult,
    models::{
        borrower::{BorrowerType, BorrowerTypeInput},
        catalog::{
            AccessLevel, Author, AuthorInput, Category, CategoryInput, CategoryNode,
            CharacterMapping, CharacterMappingInput, Location, LocationInput, Publisher,
            PublisherInput, QuantType, QuantTypeInput, ReferenceQuery, Series, SeriesInput,
        },
    },
    repository::Repository,
    services::{catalog::category_tree, settings::SettingsService},
};

#[derive(Clone)]
pub struct ReferencesService {
    repository: Repository,
    settings: SettingsService,
}

impl ReferencesService {
    pub fn new(repository: Repository, settings: SettingsService) -> Self {
        Self { repository, settings }
    }

    // Authors

    pub async fn list_authors(&self, query: &ReferenceQuery) -> AppResult<Vec<Author>> {
        self.repository.references.list_authors(query).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.references.get_author(id).await
    }

    pub async fn create_author(&self, data: &AuthorInput) -> AppResult<Author> {
        self.repository.references.create_author(data).await
    }

    pub async fn update_author(&self, id: i32, data: &AuthorInput) -> AppResult<Author> {
        self.repository.references.update_author(id, data).await
    }

    pub async fn archive_author(&self, id: i32) -> AppResult<()> {
        self.repository.references.archive_author(id).await
    }

    // Publishers

    pub async fn list_publishers(&self, query: &ReferenceQuery) -> AppResult<Vec<Publisher>> {
        self.repository.references.list_publishers(query).await
    }

    pub async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        self.repository.references.get_publisher(id).await
    }

    pub async fn create_publisher(&self, data: &PublisherInput) -> AppResult<Publisher> {
        self.repository.references.create_publisher(data).await
    }

    pub async fn update_publisher(&self, id: i32, data: &PublisherInput) -> AppResult<Publisher> {
        self.repository.references.update_publisher(id, data).await
    }

    pub async fn archive_publisher(&self, id: i32) -> AppResult<()> {
        self.repository.references.archive_publisher(id).await
    }

    // Series

    pub async fn list_series(&self, query: &ReferenceQuery) -> AppResult<Vec<Series>> {
        self.repository.references.list_series(query).await
    }

    pub async fn get_series(&self, id: i32) -> AppResult<Series> {
        self.repository.references.get_series(id).await
    }

    pub async fn create_series(&self, data: &SeriesInput) -> AppResult<Series> {
        self.repository.references.create_series(data).await
    }

    pub async fn update_series(&self, id: i32, data: &SeriesInput) -> AppResult<Series> {
        self.repository.references.update_series(id, data).await
    }

    pub async fn archive_series(&self, id: i32) -> AppResult<()> {
        self.repository.references.archive_series(id).await
    }

    // Quant types

    pub async fn list_quant_types(&self, query: &ReferenceQuery) -> AppResult<Vec<QuantType>> {
        self.repository.references.list_quant_types(query).await
    }

    pub async fn get_quant_type(&self, id: i32) -> AppResult<QuantType> {
        self.repository.references.get_quant_type(id).await
    }

    pub async fn create_quant_type(&self, data: &QuantTypeInput) -> AppResult<QuantType> {
        self.repository.references.create_quant_type(data).await
    }

    pub async fn update_quant_type(&self, id: i32, data: &QuantTypeInput) -> AppResult<QuantType> {
        self.repository.references.update_quant_type(id, data).await
    }

    pub async fn archive_quant_type(&self, id: i32) -> AppResult<()> {
        self.repository.references.archive_quant_type(id).await
    }

    // Borrower types, the fine rate defaults to the library parameter

    pub async fn list_borrower_types(&self, query: &ReferenceQuery) -> AppResult<Vec<BorrowerType>> {
        self.repository.references.list_borrower_types(query).await
    }

    pub async fn get_borrower_type(&self, id: i32) -> AppResult<BorrowerType> {
        self.repository.references.get_borrower_type(id).await
    }

    pub async fn create_borrower_type(&self, data: &BorrowerTypeInput) -> AppResult<BorrowerType> {
        let params = self.settings.parameters().await?;
        self.repository
            .references
            .create_borrower_type(data, params.fine_rate_per_day)
            .await
    }

    pub async fn update_borrower_type(&self, id: i32, data: &BorrowerTypeInput) -> AppResult<BorrowerType> {
        let params = self.settings.parameters().await?;
        self.repository
            .references
            .update_borrower_type(id, data, params.fine_rate_per_day)
            .await
    }

    pub async fn archive_borrower_type(&self, id: i32) -> AppResult<()> {
        self.repository.references.archive_borrower_type(id).await
    }

    // Character mappings

    pub async fn list_mappings(&self, language: Option<&str>, include_inactive: bool) -> AppResult<Vec<CharacterMapping>> {
        self.repository.references.list_mappings(language, include_inactive).await
    }

    pub async fn create_mapping(&self, data: &CharacterMappingInput) -> AppResult<CharacterMapping> {
        self.repository.references.create_mapping(data).await
    }

    pub async fn update_mapping(&self, id: i32, data: &CharacterMappingInput) -> AppResult<CharacterMapping> {
        self.repository.references.update_mapping(id, data).await
    }

    pub async fn archive_mapping(&self, id: i32) -> AppResult<()> {
        self.repository.references.archive_mapping(id).await
    }

    // Categories

    pub async fn list_categories(&self, query: &ReferenceQuery) -> AppResult<Vec<Category>> {
        self.repository.hierarchy.list_categories(query).await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.hierarchy.get_category(id).await
    }

    pub async fn create_category(&self, data: &CategoryInput) -> AppResult<Category> {
        self.repository.hierarchy.create_category(data).await
    }

    pub async fn update_category(&self, id: i32, data: &CategoryInput) -> AppResult<Category> {
        self.repository.hierarchy.update_category(id, data).await
    }

    pub async fn archive_category(&self, id: i32) -> AppResult<()> {
        self.repository.hierarchy.archive_category(id).await
    }

    /// Website menu: categories visible at the given access level
    pub async fn website_categories(&self, member: bool) -> AppResult<Vec<CategoryNode>> {
        let all = self
            .repository
            .hierarchy
            .list_categories(&ReferenceQuery::default())
            .await?;
        let visible = |c: &Category| {
            c.is_website_menu
                && match c.access_level {
                    AccessLevel::Public => true,
                    AccessLevel::Members => member,
                    AccessLevel::Staff => false,
                }
        };
        // A hidden category hides its whole subtree
        let hidden: Vec<String> = all
            .iter()
            .filter(|c| !visible(c))
            .map(|c| c.parent_path.clone())
            .collect();
        let categories: Vec<Category> = all
            .into_iter()
            .filter(|c| !hidden.iter().any(|h| c.parent_path.starts_with(h.as_str())))
            .collect();
        Ok(category_tree(&categories))
    }

    // Locations

    pub async fn list_locations(&self, query: &ReferenceQuery) -> AppResult<Vec<Location>> {
        self.repository.hierarchy.list_locations(query).await
    }

    pub async fn get_location(&self, id: i32) -> AppResult<Location> {
        self.repository.hierarchy.get_location(id).await
    }

    pub async fn create_location(&self, data: &LocationInput) -> AppResult<Location> {
        self.repository.hierarchy.create_location(data).await
    }

    pub async fn update_location(&self, id: i32, data: &LocationInput) -> AppResult<Location> {
        self.repository.hierarchy.update_location(id, data).await
    }

    pub async fn archive_location(&self, id: i32) -> AppResult<()> {
        self.repository.hierarchy.archive_location(id).await
    }
}
