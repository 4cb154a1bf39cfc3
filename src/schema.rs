//! Section schema declarations.
//!
//! Every configuration section the tool manages is declared here as a
//! static structural descriptor and registered once at startup. The
//! declaration order is the dependency order used by the engine: tags
//! are created before anything that references them and deleted after
//! nothing does.

use reconcile::{FieldDefault, FieldKind, FieldSchema, Registry, ResourceSchema, SectionSchema};
use std::sync::OnceLock;

/// The process-wide schema registry.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Registry::new(vec![
            tags(),
            sync_profiles(),
            indexer_proxies(),
            download_clients(),
            indexers(),
            applications(),
            notifications(),
            ui(),
        ])
        .expect("section names are unique")
    })
}

/// Tags are label-only resources: the collection key is the label, so
/// entries only ever get created or deleted.
fn tags() -> SectionSchema {
    SectionSchema::collection("tags", "tag", ResourceSchema::new("tag", Vec::new()))
}

fn sync_profiles() -> SectionSchema {
    SectionSchema::collection(
        "sync_profiles",
        "appprofile",
        ResourceSchema::new(
            "sync_profile",
            vec![
                FieldSchema::new("enable_rss", "enableRss", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(true)),
                FieldSchema::new(
                    "enable_interactive_search",
                    "enableInteractiveSearch",
                    FieldKind::Bool,
                )
                .with_default(FieldDefault::Bool(true)),
                FieldSchema::new(
                    "enable_automatic_search",
                    "enableAutomaticSearch",
                    FieldKind::Bool,
                )
                .with_default(FieldDefault::Bool(true)),
                FieldSchema::new("minimum_seeders", "minimumSeeders", FieldKind::Int)
                    .with_default(FieldDefault::Int(1)),
            ],
        ),
    )
}

fn indexer_proxies() -> SectionSchema {
    SectionSchema::collection(
        "indexer_proxies",
        "indexerproxy",
        ResourceSchema::new(
            "indexer_proxy",
            vec![
                FieldSchema::new("type", "implementation", FieldKind::Text).required(),
                FieldSchema::new("host", "host", FieldKind::Text)
                    .with_default(FieldDefault::Text("localhost"))
                    .in_fields(),
                FieldSchema::new("port", "port", FieldKind::Int)
                    .with_default(FieldDefault::Int(8080))
                    .in_fields(),
                FieldSchema::new("username", "username", FieldKind::Text)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("password", "password", FieldKind::Secret).in_fields(),
                FieldSchema::new("request_timeout", "requestTimeout", FieldKind::Int)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("tags", "tags", FieldKind::StringSet)
                    .with_default(FieldDefault::EmptySet),
            ],
        ),
    )
    .with_template("indexerproxy/schema")
}

fn download_clients() -> SectionSchema {
    SectionSchema::collection(
        "download_clients",
        "downloadclient",
        ResourceSchema::new(
            "download_client",
            vec![
                FieldSchema::new("type", "implementation", FieldKind::Text).required(),
                FieldSchema::new("enable", "enable", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(true)),
                FieldSchema::new("priority", "priority", FieldKind::Int)
                    .with_default(FieldDefault::Int(1)),
                FieldSchema::new("host", "host", FieldKind::Text)
                    .with_default(FieldDefault::Text("localhost"))
                    .in_fields(),
                FieldSchema::new("port", "port", FieldKind::Int)
                    .with_default(FieldDefault::Int(8080))
                    .in_fields(),
                FieldSchema::new("use_ssl", "useSsl", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(false))
                    .in_fields(),
                FieldSchema::new("username", "username", FieldKind::Text)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("password", "password", FieldKind::Secret).in_fields(),
                FieldSchema::new("category", "category", FieldKind::Text)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("tags", "tags", FieldKind::StringSet)
                    .with_default(FieldDefault::EmptySet),
            ],
        ),
    )
    .with_template("downloadclient/schema")
}

fn indexers() -> SectionSchema {
    SectionSchema::collection(
        "indexers",
        "indexer",
        ResourceSchema::new(
            "indexer",
            vec![
                FieldSchema::new("type", "definitionName", FieldKind::Text).required(),
                FieldSchema::new("enable", "enable", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(false)),
                FieldSchema::new("priority", "priority", FieldKind::Int)
                    .with_default(FieldDefault::Int(25)),
                FieldSchema::new("app_profile", "appProfileId", FieldKind::Text),
                FieldSchema::new("query_limit", "baseSettings.queryLimit", FieldKind::Int)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("grab_limit", "baseSettings.grabLimit", FieldKind::Int)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("tags", "tags", FieldKind::StringSet)
                    .with_default(FieldDefault::EmptySet),
            ],
        ),
    )
    .with_template("indexer/schema")
}

fn applications() -> SectionSchema {
    SectionSchema::collection(
        "applications",
        "applications",
        ResourceSchema::new(
            "application",
            vec![
                FieldSchema::new("type", "implementation", FieldKind::Text).required(),
                FieldSchema::new("prowlarr_url", "prowlarrUrl", FieldKind::Text)
                    .with_default(FieldDefault::Text("http://localhost:9696"))
                    .in_fields(),
                FieldSchema::new("base_url", "baseUrl", FieldKind::Text)
                    .required()
                    .in_fields(),
                FieldSchema::new("api_key", "apiKey", FieldKind::Secret).in_fields(),
                FieldSchema::new("sync_level", "syncLevel", FieldKind::Text)
                    .with_default(FieldDefault::Text("addOnly")),
                FieldSchema::new("tags", "tags", FieldKind::StringSet)
                    .with_default(FieldDefault::EmptySet),
            ],
        ),
    )
    .with_template("applications/schema")
}

fn notifications() -> SectionSchema {
    SectionSchema::collection(
        "notifications",
        "notification",
        ResourceSchema::new(
            "notification",
            vec![
                FieldSchema::new("type", "implementation", FieldKind::Text).required(),
                FieldSchema::new("on_health_issue", "onHealthIssue", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(false)),
                FieldSchema::new("on_health_restored", "onHealthRestored", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(false)),
                FieldSchema::new(
                    "on_application_update",
                    "onApplicationUpdate",
                    FieldKind::Bool,
                )
                .with_default(FieldDefault::Bool(false)),
                FieldSchema::new(
                    "include_health_warnings",
                    "includeHealthWarnings",
                    FieldKind::Bool,
                )
                .with_default(FieldDefault::Bool(false)),
                FieldSchema::new("url", "url", FieldKind::Text)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("username", "username", FieldKind::Text)
                    .nullable()
                    .in_fields(),
                FieldSchema::new("password", "password", FieldKind::Secret).in_fields(),
                FieldSchema::new("tags", "tags", FieldKind::StringSet)
                    .with_default(FieldDefault::EmptySet),
            ],
        ),
    )
    .with_template("notification/schema")
}

fn ui() -> SectionSchema {
    SectionSchema::flat(
        "ui",
        "config/ui",
        ResourceSchema::new(
            "ui",
            vec![
                FieldSchema::new("theme", "theme", FieldKind::Text)
                    .with_default(FieldDefault::Text("auto")),
                FieldSchema::new("first_day_of_week", "firstDayOfWeek", FieldKind::Int)
                    .with_default(FieldDefault::Int(0)),
                FieldSchema::new("short_date_format", "shortDateFormat", FieldKind::Text)
                    .with_default(FieldDefault::Text("MMM D YYYY")),
                FieldSchema::new("long_date_format", "longDateFormat", FieldKind::Text)
                    .with_default(FieldDefault::Text("dddd, MMMM D YYYY")),
                FieldSchema::new("time_format", "timeFormat", FieldKind::Text)
                    .with_default(FieldDefault::Text("h(:mm)a")),
                FieldSchema::new("show_relative_dates", "showRelativeDates", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(true)),
                FieldSchema::new(
                    "enable_color_impaired_mode",
                    "enableColorImpairedMode",
                    FieldKind::Bool,
                )
                .with_default(FieldDefault::Bool(false)),
            ],
        ),
    )
}
