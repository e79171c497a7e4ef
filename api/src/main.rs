//! Document Hub API Server
//!
//! Admin backend for a real-estate franchise's document templates and the
//! reference data they draw on: merge fields, layout partials, offices,
//! employees, brand assets, listings, checklists and territories.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod entity;
mod error;
mod handlers;
mod sanitizer;

#[cfg(test)]
mod test_utils;

use adapters::{
    GraphClientImpl, PostgresAssetRepository, PostgresAuditLogRepository,
    PostgresCategoryRepository, PostgresChecklistRepository, PostgresCodePatternRepository,
    PostgresEmployeeRepository, PostgresLayoutPartialRepository, PostgresListingRepository,
    PostgresMergeFieldRepository, PostgresOfficeRepository, PostgresTagRepository,
    PostgresTemplateRepository, PostgresTerritoryRepository,
};
use app::{
    AssetService, AuditService, ChecklistService, ContentLibraryService, EmployeeService,
    IntegrationService, ListingService, OfficeService, SanitizerService, TaxonomyService,
    TemplateService, TerritoryService,
};
use config::Config;

/// Multipart and JSON framing on top of the configured content limits
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Request body cap for endpoints carrying up to `content_bytes` of HTML.
///
/// JSON escaping can double the content, so oversized content still reaches
/// the size check and gets its 400. Bodies past this cap get a 413.
fn json_body_limit(content_bytes: usize) -> usize {
    content_bytes
        .saturating_mul(2)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub template_service: Arc<
        TemplateService<
            PostgresTemplateRepository,
            PostgresTagRepository,
            PostgresCategoryRepository,
            PostgresMergeFieldRepository,
            PostgresLayoutPartialRepository,
            PostgresAuditLogRepository,
        >,
    >,
    pub taxonomy_service: Arc<
        TaxonomyService<PostgresTagRepository, PostgresCategoryRepository, PostgresAuditLogRepository>,
    >,
    pub library_service: Arc<
        ContentLibraryService<
            PostgresMergeFieldRepository,
            PostgresCodePatternRepository,
            PostgresLayoutPartialRepository,
            PostgresAuditLogRepository,
        >,
    >,
    pub audit_service: AuditService<PostgresAuditLogRepository>,
    pub office_service: Arc<
        OfficeService<PostgresOfficeRepository, PostgresEmployeeRepository, PostgresAuditLogRepository>,
    >,
    pub employee_service: Arc<
        EmployeeService<PostgresEmployeeRepository, PostgresOfficeRepository, PostgresAuditLogRepository>,
    >,
    pub asset_service: Arc<
        AssetService<PostgresAssetRepository, PostgresOfficeRepository, PostgresAuditLogRepository>,
    >,
    pub listing_service: Arc<
        ListingService<
            PostgresListingRepository,
            PostgresOfficeRepository,
            PostgresEmployeeRepository,
            PostgresAuditLogRepository,
        >,
    >,
    pub checklist_service: Arc<
        ChecklistService<
            PostgresChecklistRepository,
            PostgresOfficeRepository,
            PostgresAuditLogRepository,
        >,
    >,
    pub territory_service: Arc<
        TerritoryService<
            PostgresTerritoryRepository,
            PostgresOfficeRepository,
            PostgresAuditLogRepository,
        >,
    >,
    pub sanitizer_service:
        Arc<SanitizerService<PostgresMergeFieldRepository, PostgresLayoutPartialRepository>>,
    pub integration_service: Arc<
        IntegrationService<GraphClientImpl, PostgresTemplateRepository, PostgresAuditLogRepository>,
    >,
    pub config: Config,
}

impl AppState {
    /// Wire every service to its PostgreSQL repositories and the Graph client
    pub fn new(config: Config, db: DatabaseConnection) -> Self {
        // Create adapters
        let template_repo = Arc::new(PostgresTemplateRepository::new(db.clone()));
        let tag_repo = Arc::new(PostgresTagRepository::new(db.clone()));
        let category_repo = Arc::new(PostgresCategoryRepository::new(db.clone()));
        let merge_field_repo = Arc::new(PostgresMergeFieldRepository::new(db.clone()));
        let code_pattern_repo = Arc::new(PostgresCodePatternRepository::new(db.clone()));
        let partial_repo = Arc::new(PostgresLayoutPartialRepository::new(db.clone()));
        let office_repo = Arc::new(PostgresOfficeRepository::new(db.clone()));
        let employee_repo = Arc::new(PostgresEmployeeRepository::new(db.clone()));
        let asset_repo = Arc::new(PostgresAssetRepository::new(db.clone()));
        let listing_repo = Arc::new(PostgresListingRepository::new(db.clone()));
        let checklist_repo = Arc::new(PostgresChecklistRepository::new(db.clone()));
        let territory_repo = Arc::new(PostgresTerritoryRepository::new(db.clone()));
        let audit_repo = Arc::new(PostgresAuditLogRepository::new(db));

        let graph_client = Arc::new(GraphClientImpl::new(&config.graph));
        if !config.graph.enabled() {
            tracing::warn!("Microsoft Graph credentials missing; integration endpoints will return 503");
        }

        let audit_service = AuditService::new(audit_repo);

        // Create application services
        let template_service = Arc::new(TemplateService::new(
            template_repo.clone(),
            tag_repo.clone(),
            category_repo.clone(),
            merge_field_repo.clone(),
            partial_repo.clone(),
            audit_service.clone(),
            config.max_html_bytes,
        ));

        let taxonomy_service = Arc::new(TaxonomyService::new(
            tag_repo,
            category_repo,
            audit_service.clone(),
        ));

        let library_service = Arc::new(ContentLibraryService::new(
            merge_field_repo.clone(),
            code_pattern_repo,
            partial_repo.clone(),
            audit_service.clone(),
            config.max_html_bytes,
        ));

        let office_service = Arc::new(OfficeService::new(
            office_repo.clone(),
            employee_repo.clone(),
            audit_service.clone(),
        ));

        let employee_service = Arc::new(EmployeeService::new(
            employee_repo.clone(),
            office_repo.clone(),
            audit_service.clone(),
        ));

        let asset_service = Arc::new(AssetService::new(
            asset_repo,
            office_repo.clone(),
            audit_service.clone(),
        ));

        let listing_service = Arc::new(ListingService::new(
            listing_repo,
            office_repo.clone(),
            employee_repo,
            audit_service.clone(),
        ));

        let checklist_service = Arc::new(ChecklistService::new(
            checklist_repo,
            office_repo.clone(),
            audit_service.clone(),
        ));

        let territory_service = Arc::new(TerritoryService::new(
            territory_repo,
            office_repo,
            audit_service.clone(),
        ));

        let sanitizer_service = Arc::new(SanitizerService::new(
            merge_field_repo,
            partial_repo,
            config.max_html_bytes,
            config.max_upload_bytes,
        ));

        let integration_service = Arc::new(IntegrationService::new(
            graph_client,
            template_repo,
            audit_service.clone(),
        ));

        Self {
            template_service,
            taxonomy_service,
            library_service,
            audit_service,
            office_service,
            employee_service,
            asset_service,
            listing_service,
            checklist_service,
            territory_service,
            sanitizer_service,
            integration_service,
            config,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full router: public health check, rate-limited sanitizer
/// routes and the authenticated admin API.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // Rate limiting config: 2 req/sec sustained, burst of 5
    // Uses PeerIpKeyExtractor to get client IP from socket connection
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(2)
            .burst_size(5)
            .finish()
            .context("Failed to build governor config")?,
    );

    // Rate-limited routes (sanitizer and document conversion)
    let rate_limited_routes = Router::new()
        .route("/sanitizer/sanitize", post(handlers::sanitize_html))
        .route("/sanitizer/convert", post(handlers::convert_docx))
        .layer(DefaultBodyLimit::max(
            (state.config.max_upload_bytes + BODY_OVERHEAD_BYTES)
                .max(json_body_limit(state.config.max_html_bytes)),
        ))
        .layer(GovernorLayer {
            config: governor_config,
        });

    let protected_routes = Router::new()
        // Templates
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/templates/:id",
            get(handlers::get_template)
                .patch(handlers::update_template)
                .delete(handlers::delete_template),
        )
        .route("/templates/:id/status", post(handlers::set_template_status))
        .route("/templates/:id/versions", get(handlers::list_versions))
        .route(
            "/templates/:id/versions/:number",
            get(handlers::get_version),
        )
        .route(
            "/templates/:id/versions/:number/restore",
            post(handlers::restore_version),
        )
        .route("/templates/:id/preview", post(handlers::preview_template))
        .route("/templates/:id/validate", get(handlers::validate_template))
        .route("/templates/:id/export", post(handlers::export_template))
        .route("/templates/:id/announce", post(handlers::announce_template))
        // Taxonomy
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route(
            "/tags/:id",
            get(handlers::get_tag)
                .patch(handlers::update_tag)
                .delete(handlers::delete_tag),
        )
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        // Content library
        .route(
            "/merge-fields",
            get(handlers::list_merge_fields).post(handlers::create_merge_field),
        )
        .route(
            "/merge-fields/:id",
            get(handlers::get_merge_field)
                .patch(handlers::update_merge_field)
                .delete(handlers::delete_merge_field),
        )
        .route(
            "/code-patterns",
            get(handlers::list_code_patterns).post(handlers::create_code_pattern),
        )
        .route(
            "/code-patterns/:id",
            get(handlers::get_code_pattern)
                .patch(handlers::update_code_pattern)
                .delete(handlers::delete_code_pattern),
        )
        .route(
            "/layout-partials",
            get(handlers::list_partials).post(handlers::create_partial),
        )
        .route(
            "/layout-partials/:id",
            get(handlers::get_partial)
                .patch(handlers::update_partial)
                .delete(handlers::delete_partial),
        )
        // Audit trail
        .route("/audit-logs", get(handlers::list_audit_logs))
        // Organization
        .route(
            "/offices",
            get(handlers::list_offices).post(handlers::create_office),
        )
        .route(
            "/offices/:id",
            get(handlers::get_office)
                .patch(handlers::update_office)
                .delete(handlers::delete_office),
        )
        .route(
            "/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/employees/:id",
            get(handlers::get_employee)
                .patch(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .route("/employees/:id/roles", put(handlers::set_employee_roles))
        .route(
            "/employees/:id/api-key",
            post(handlers::issue_api_key).delete(handlers::revoke_api_key),
        )
        // Brand assets
        .route(
            "/assets",
            get(handlers::list_assets).post(handlers::create_asset),
        )
        .route(
            "/assets/:id",
            get(handlers::get_asset)
                .patch(handlers::update_asset)
                .delete(handlers::delete_asset),
        )
        // Listings
        .route(
            "/listings",
            get(handlers::list_listings).post(handlers::create_listing),
        )
        .route("/listings/import", post(handlers::import_listings))
        .route(
            "/listings/:id",
            get(handlers::get_listing)
                .patch(handlers::update_listing)
                .delete(handlers::delete_listing),
        )
        // Checklists
        .route(
            "/checklists",
            get(handlers::list_checklists).post(handlers::create_checklist),
        )
        .route(
            "/checklists/:id",
            get(handlers::get_checklist)
                .patch(handlers::update_checklist)
                .delete(handlers::delete_checklist),
        )
        .route("/checklists/:id/items", post(handlers::add_item))
        .route(
            "/checklists/:id/items/:item_id",
            patch(handlers::update_item).delete(handlers::delete_item),
        )
        .route(
            "/checklists/:id/items/:item_id/complete",
            post(handlers::complete_item),
        )
        // Territories
        .route(
            "/territories",
            get(handlers::list_territories).post(handlers::create_territory),
        )
        .route(
            "/territories/:id",
            get(handlers::get_territory)
                .patch(handlers::update_territory)
                .delete(handlers::delete_territory),
        )
        .route(
            "/territories/:id/postal-codes",
            put(handlers::assign_postal_codes),
        )
        .route(
            "/territories/:id/postal-codes/:code",
            delete(handlers::remove_postal_code),
        )
        .route("/postal-codes/:code", get(handlers::lookup_postal_code))
        // Microsoft Graph browsing
        .route("/integrations/teams", get(handlers::list_teams))
        .route(
            "/integrations/teams/:team_id/channels",
            get(handlers::list_channels),
        )
        .route("/integrations/sites", get(handlers::find_sites))
        .route(
            "/integrations/sites/:site_id/drive",
            get(handlers::list_drive),
        )
        .merge(rate_limited_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let app = Router::new()
        // Health check (no auth)
        .route("/health", get(health))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(json_body_limit(
            state.config.max_html_bytes,
        )))
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,docuhub_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Document Hub API...");

    // Load configuration
    let config = Config::from_env()?;
    if config.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY is not set; only employee keys can authenticate");
    }

    // Connect to PostgreSQL
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    if config.run_migrations {
        let applied = db::apply_migrations(&db)
            .await
            .context("Failed to apply migrations")?;
        tracing::info!(
            applied,
            schema_version = db::latest_version(),
            "Database schema up to date"
        );
    }

    let port = config.port;
    let state = AppState::new(config, db);
    let app = build_router(state)?;

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
