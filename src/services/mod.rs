//! Business logic services

pub mod borrowers;
pub mod borrowings;
pub mod catalog;
pub mod email;
pub mod references;
pub mod reservations;
pub mod resources;
pub mod scheduler;
pub mod settings;
pub mod signups;
pub mod stats;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub references: references::ReferencesService,
    pub borrowers: borrowers::BorrowersService,
    pub borrowings: borrowings::BorrowingsService,
    pub reservations: reservations::ReservationsService,
    pub resources: resources::ResourcesService,
    pub signups: signups::SignupsService,
    pub stats: stats::StatsService,
    pub settings: settings::SettingsService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let settings = settings::SettingsService::new(repository.clone(), config.library.clone());
        let email = email::EmailService::new(config.email.clone());
        let borrowers = borrowers::BorrowersService::new(repository.clone(), settings.clone());
        let reservations = reservations::ReservationsService::new(
            repository.clone(),
            settings.clone(),
            borrowers.clone(),
            email.clone(),
        );
        let borrowings = borrowings::BorrowingsService::new(
            repository.clone(),
            settings.clone(),
            borrowers.clone(),
            reservations.clone(),
            email.clone(),
        );

        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            references: references::ReferencesService::new(repository.clone(), settings.clone()),
            resources: resources::ResourcesService::new(repository.clone()),
            signups: signups::SignupsService::new(repository.clone(), settings.clone(), email.clone()),
            stats: stats::StatsService::new(repository),
            borrowers,
            borrowings,
            reservations,
            settings,
            email,
        }
    }

    /// Background scheduler sharing the circulation services
    pub fn scheduler(&self, repository: Repository, config: &AppConfig) -> scheduler::Scheduler {
        scheduler::Scheduler::new(
            repository,
            self.borrowings.clone(),
            self.reservations.clone(),
            &config.scheduler,
        )
    }
}
