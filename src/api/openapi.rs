//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, books, borrowers, borrowings, health, portal, references, reservations, resources,
    settings, signups, stats, users, website,
};
use crate::models::{
    book, borrower, borrowing, catalog, quant, reservation, resource, settings as parameters,
    signup, stats as statistics, user,
};

/// Registers the JWT bearer scheme used by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Server API",
        version = "0.4.0",
        description = "Library management REST API: catalog, copies, borrowings, reservations and member portal",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        auth::setup_password,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        // Books and copies
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::book_statistics,
        books::preview_cutter,
        books::list_quants,
        books::suggest_registrations,
        books::create_quant,
        books::create_quant_batch,
        books::get_quant,
        books::update_quant,
        books::delete_quant,
        // References
        references::list_authors,
        references::get_author,
        references::create_author,
        references::update_author,
        references::delete_author,
        references::list_publishers,
        references::get_publisher,
        references::create_publisher,
        references::update_publisher,
        references::delete_publisher,
        references::list_series,
        references::get_series,
        references::create_series,
        references::update_series,
        references::delete_series,
        references::list_quant_types,
        references::get_quant_type,
        references::create_quant_type,
        references::update_quant_type,
        references::delete_quant_type,
        references::list_borrower_types,
        references::get_borrower_type,
        references::create_borrower_type,
        references::update_borrower_type,
        references::delete_borrower_type,
        references::list_categories,
        references::get_category,
        references::create_category,
        references::update_category,
        references::delete_category,
        references::list_locations,
        references::get_location,
        references::create_location,
        references::update_location,
        references::delete_location,
        references::list_mappings,
        references::create_mapping,
        references::update_mapping,
        references::delete_mapping,
        // Resources
        resources::list_resources,
        resources::get_resource,
        resources::create_resource,
        resources::update_resource,
        resources::delete_resource,
        resources::list_resource_books,
        resources::add_resource_books,
        resources::remove_resource_books,
        resources::borrower_stats,
        // Borrowers
        borrowers::list_borrowers,
        borrowers::get_borrower,
        borrowers::create_borrower,
        borrowers::update_borrower,
        borrowers::renew_membership,
        borrowers::delete_borrower,
        // Borrowings
        borrowings::list_borrowings,
        borrowings::get_borrowing,
        borrowings::create_borrowing,
        borrowings::add_line,
        borrowings::remove_line,
        borrowings::allocate,
        borrowings::clear_allocations,
        borrowings::confirm_borrowing,
        borrowings::return_borrowing,
        borrowings::renew_copy,
        borrowings::mark_lost,
        borrowings::cancel_borrowing,
        borrowings::set_draft,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::confirm_reservation,
        reservations::notify_available,
        reservations::fulfill_reservation,
        reservations::cancel_reservation,
        reservations::set_draft,
        // Signups
        signups::submit_signup,
        signups::list_signups,
        signups::get_signup,
        signups::approve_signup,
        signups::reject_signup,
        signups::reset_signup,
        // Member portal
        portal::my_profile,
        portal::my_borrowings,
        portal::my_borrowing,
        portal::renew_my_copy,
        portal::my_reservations,
        portal::reserve_book,
        portal::cancel_my_reservation,
        portal::my_cart,
        portal::add_to_cart,
        portal::remove_from_cart,
        portal::checkout,
        portal::my_history,
        // Website catalog
        website::list_books,
        website::get_book,
        website::categories,
        // Statistics
        stats::dashboard,
        // Settings
        settings::get_settings,
        settings::set_setting,
        settings::reset_setting,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            user::User,
            user::UserRole,
            user::CreateUser,
            user::UpdateUser,
            user::PasswordSetup,
            // Books and copies
            book::Book,
            book::BookAuthor,
            book::BookAvailability,
            book::BookDetails,
            book::BookShort,
            book::BookSort,
            book::BookStatistics,
            book::CreateBook,
            book::UpdateBook,
            book::CutterPreviewRequest,
            book::CutterPreview,
            book::WebsiteBook,
            crate::cutter::CutterScheme,
            quant::Quant,
            quant::QuantState,
            quant::CreateQuant,
            quant::CreateQuantBatch,
            quant::UpdateQuant,
            quant::RegistrationSuggestion,
            // References
            catalog::AccessLevel,
            catalog::LocationType,
            catalog::Author,
            catalog::AuthorInput,
            catalog::Publisher,
            catalog::PublisherInput,
            catalog::Series,
            catalog::SeriesInput,
            catalog::QuantType,
            catalog::QuantTypeInput,
            catalog::CharacterMapping,
            catalog::CharacterMappingInput,
            catalog::Category,
            catalog::CategoryInput,
            catalog::CategoryNode,
            catalog::Location,
            catalog::LocationInput,
            // Resources
            resource::Resource,
            resource::ResourceInput,
            resource::ResourceBooks,
            resource::ResourceBorrowerStats,
            // Borrowers
            borrower::BorrowerType,
            borrower::BorrowerTypeInput,
            borrower::Borrower,
            borrower::BorrowerStats,
            borrower::BorrowerDetails,
            borrower::CreateBorrower,
            borrower::UpdateBorrower,
            borrower::RenewMembership,
            // Borrowings
            borrowing::BorrowingState,
            borrowing::LineState,
            borrowing::QuantLineState,
            borrowing::Borrowing,
            borrowing::BorrowingLine,
            borrowing::QuantLine,
            borrowing::LineDetails,
            borrowing::BorrowingDetails,
            borrowing::BorrowingSummary,
            borrowing::CreateBorrowing,
            borrowing::AddLine,
            borrowing::AllocateRequest,
            borrowing::QuantLineSelection,
            borrowing::ReturnRequest,
            borrowing::ReturnOutcome,
            borrowings::AllocationResponse,
            // Reservations
            reservation::ReservationState,
            reservation::Reservation,
            reservation::CreateReservation,
            reservation::ReserveBook,
            // Signups
            signup::SignupState,
            signup::SignupRequest,
            signup::CreateSignup,
            signup::RejectSignup,
            signup::SignupApproval,
            // Portal
            portal::CartItem,
            // Statistics
            statistics::DashboardStats,
            statistics::PopularBook,
            statistics::CategoryShare,
            statistics::OverdueCopy,
            statistics::DailyTrend,
            statistics::TopBorrower,
            statistics::Dashboard,
            statistics::HistoryEntry,
            statistics::HistoryStats,
            // Settings
            parameters::ParameterEntry,
            parameters::SetParameter,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "Account management"),
        (name = "books", description = "Book catalog management"),
        (name = "quants", description = "Physical copies"),
        (name = "references", description = "Authors, publishers, series, types, categories and locations"),
        (name = "resources", description = "Resource collections and their lending limits"),
        (name = "borrowers", description = "Borrowers and memberships"),
        (name = "borrowings", description = "Borrowing workflow"),
        (name = "reservations", description = "Reservation queue"),
        (name = "signups", description = "Member signup requests"),
        (name = "portal", description = "Member self-service"),
        (name = "website", description = "Public catalog"),
        (name = "stats", description = "Statistics"),
        (name = "settings", description = "Business parameters")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/borrowings/{id}/confirm"));
        assert!(doc.paths.paths.contains_key("/catalog/books"));
        assert!(doc.paths.paths.contains_key("/resources/{id}/borrowers/{borrower_id}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
