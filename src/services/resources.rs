//! Resource collections service

use crate::{
    circulation::resource_stats,
    error::AppResult,
    models::{
        catalog::ReferenceQuery,
        resource::{Resource, ResourceBorrowerStats, ResourceInput},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ResourcesService {
    repository: Repository,
}

impl ResourcesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ReferenceQuery) -> AppResult<Vec<Resource>> {
        self.repository.resources.list(query).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Resource> {
        self.repository.resources.get_by_id(id).await
    }

    pub async fn create(&self, data: &ResourceInput) -> AppResult<Resource> {
        let resource = self.repository.resources.create(data).await?;
        tracing::info!("Created resource {} ({})", resource.code, resource.name);
        Ok(resource)
    }

    pub async fn update(&self, id: i32, data: &ResourceInput) -> AppResult<Resource> {
        self.repository.resources.update(id, data).await
    }

    pub async fn archive(&self, id: i32) -> AppResult<()> {
        self.repository.resources.archive(id).await
    }

    pub async fn book_ids(&self, id: i32) -> AppResult<Vec<i32>> {
        self.repository.resources.get_by_id(id).await?;
        self.repository.resources.book_ids(id).await
    }

    /// Attach books and return the refreshed resource
    pub async fn add_books(&self, id: i32, book_ids: &[i32]) -> AppResult<Resource> {
        self.repository.resources.get_by_id(id).await?;
        let added = self.repository.resources.add_books(id, book_ids).await?;
        tracing::info!("Resource {}: {} books attached", id, added);
        self.repository.resources.get_by_id(id).await
    }

    pub async fn remove_books(&self, id: i32, book_ids: &[i32]) -> AppResult<Resource> {
        self.repository.resources.get_by_id(id).await?;
        let removed = self.repository.resources.remove_books(id, book_ids).await?;
        tracing::info!("Resource {}: {} books detached", id, removed);
        self.repository.resources.get_by_id(id).await
    }

    /// How many more copies of the resource a borrower may take
    pub async fn borrower_stats(&self, id: i32, borrower_id: i32) -> AppResult<ResourceBorrowerStats> {
        self.repository.borrowers.get_by_id(borrower_id).await?;
        let usage = self.repository.resources.usage(id, borrower_id).await?;
        Ok(resource_stats(&usage))
    }
}
