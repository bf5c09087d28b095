//! Property and saved-view query service.
//!
//! `AppState` is the explicit application context: it is built once at
//! start-up from a database handle, a host adapter and `AppConfig`, and handed
//! to every handler through Axum state.

pub mod error;
pub mod host;
pub mod routes;
pub mod services;
pub mod storage;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use propview_api::{DEFAULT_QUERY_PER_PAGE, MAX_FIELDS_TO_AUTOCOMPLETE};

use host::HostStore;
use services::{FieldService, PermissionService, PropertyService, ViewService};
use storage::Db;

/// Path prefix all API routes are mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Server configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub base_url: String,
    pub default_per_page: i64,
    pub autocomplete_limit: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            port: 3000,
            base_url: "http://localhost:3000".into(),
            default_per_page: DEFAULT_QUERY_PER_PAGE,
            autocomplete_limit: MAX_FIELDS_TO_AUTOCOMPLETE,
        }
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

fn parsed_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match non_empty(raw) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{key}={raw} is not valid, using the default");
            default
        }),
        None => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from a variable lookup. Page sizes are clamped to
    /// `0..=MAX_FIELDS_TO_AUTOCOMPLETE` for autocomplete and to non-negative
    /// values for view queries.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let autocomplete_limit = parsed_or(
            "PROPVIEW_AUTOCOMPLETE_LIMIT",
            lookup("PROPVIEW_AUTOCOMPLETE_LIMIT"),
            defaults.autocomplete_limit,
        );
        if autocomplete_limit > MAX_FIELDS_TO_AUTOCOMPLETE {
            tracing::warn!(
                autocomplete_limit,
                max = MAX_FIELDS_TO_AUTOCOMPLETE,
                "PROPVIEW_AUTOCOMPLETE_LIMIT above the maximum, clamping"
            );
        }
        Self {
            data_dir: non_empty(lookup("PROPVIEW_DATA_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            port: parsed_or("PORT", lookup("PORT"), defaults.port),
            base_url: non_empty(lookup("BASE_URL"))
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            default_per_page: parsed_or(
                "PROPVIEW_DEFAULT_PER_PAGE",
                lookup("PROPVIEW_DEFAULT_PER_PAGE"),
                defaults.default_per_page,
            )
            .max(0),
            autocomplete_limit: autocomplete_limit.clamp(0, MAX_FIELDS_TO_AUTOCOMPLETE),
        }
    }

    /// Absolute URL of an API resource, for `Location` headers.
    pub fn location(&self, path: &str) -> String {
        format!("{}{API_PREFIX}/{path}", self.base_url)
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub fields: FieldService,
    pub properties: PropertyService,
    pub views: ViewService,
    pub permissions: PermissionService,
}

impl AppState {
    pub fn new(db: Db, host: Arc<dyn HostStore>, config: AppConfig) -> Self {
        let permissions = PermissionService::new(host.clone());
        let properties = PropertyService::new(db.clone(), host.clone(), permissions.clone());
        Self {
            config,
            fields: FieldService::new(db.clone()),
            views: ViewService::new(db, host, properties.clone()),
            properties,
            permissions,
        }
    }
}

/// Build the full HTTP router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Fields
        .route("/field", post(routes::fields::create_field))
        .route(
            "/field/autocomplete",
            get(routes::fields::autocomplete_fields),
        )
        .route(
            "/field/{id}",
            get(routes::fields::get_field)
                .put(routes::fields::update_field)
                .delete(routes::fields::delete_field),
        )
        // Properties
        .route("/property", post(routes::properties::create_property))
        .route(
            "/property/{id}",
            put(routes::properties::update_property).delete(routes::properties::delete_property),
        )
        .route(
            "/property/object/{object_id}",
            get(routes::properties::get_properties_for_object),
        )
        .route(
            "/property/object/{object_id}/resync",
            post(routes::properties::resync_object),
        )
        // Views
        .route("/view", post(routes::views::create_view))
        .route("/view/user/{id}", get(routes::views::views_for_user))
        .route(
            "/view/{id}",
            get(routes::views::get_view).patch(routes::views::patch_view),
        )
        .route("/view/{id}/query", get(routes::views::query_view))
        .route("/view/{id}/member", post(routes::views::add_view_member));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_joins_base_and_prefix() {
        let config = AppConfig {
            base_url: "https://chat.example.com".into(),
            ..Default::default()
        };
        assert_eq!(
            config.location("view/abc"),
            "https://chat.example.com/api/v1/view/abc"
        );
    }

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        AppConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn autocomplete_limit_is_clamped_to_maximum() {
        assert_eq!(
            config_from(&[("PROPVIEW_AUTOCOMPLETE_LIMIT", "5000")]).autocomplete_limit,
            MAX_FIELDS_TO_AUTOCOMPLETE
        );
        assert_eq!(
            config_from(&[("PROPVIEW_AUTOCOMPLETE_LIMIT", "-3")]).autocomplete_limit,
            0
        );
        assert_eq!(
            config_from(&[("PROPVIEW_AUTOCOMPLETE_LIMIT", "25")]).autocomplete_limit,
            25
        );
    }

    #[test]
    fn invalid_or_blank_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("PROPVIEW_DATA_DIR", "  "),
            ("BASE_URL", "https://chat.example.com/"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.base_url, "https://chat.example.com");
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.default_per_page, 60);
        assert_eq!(config.autocomplete_limit, 200);
        assert_eq!(config.port, 3000);
    }
}
