//! Router builder for the bookshelf HTTP server

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use bookshelf_kernel::{Module, ModuleRegistry};

use crate::error::AppError;
use crate::MakeRequestUuid;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Builder for constructing the main HTTP router.
///
/// Layers only wrap routes added before them, so mount routes and call
/// [`RouterBuilder::with_fallbacks`] before adding middleware.
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Merge a module's router into the root router
    pub fn mount_module(mut self, module: &dyn Module) -> Self {
        self.router = self.router.merge(module.routes());
        self
    }

    /// JSON 404 for unknown paths and JSON 405 for unsupported methods
    pub fn with_fallbacks(mut self) -> Self {
        self.router = self
            .router
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(not_found);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware. Any `OPTIONS` request is answered as a preflight;
    /// the allowed methods and headers are stamped on every response,
    /// preflight included, from the same values.
    pub fn with_cors(mut self) -> Self {
        self.router = self
            .router
            .layer(CorsLayer::new().allow_origin(Any))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            ));
        self
    }

    /// Stamp every response as UTF-8 JSON
    pub fn with_json_content_type(mut self) -> Self {
        self.router = self.router.layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ));
        self
    }

    /// Add request ID middleware; the id is echoed on the response
    pub fn with_request_id(mut self) -> Self {
        let x_request_id = HeaderName::from_static("x-request-id");
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_millis(timeout_ms),
            ));
        self
    }

    /// Serve the merged OpenAPI document of all modules at `/docs/openapi.json`
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);

        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Base document plus every module's `paths` and `components.schemas`.
pub fn merged_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let base = utoipa::openapi::OpenApiBuilder::new()
        .info(
            utoipa::openapi::InfoBuilder::new()
                .title("Bookshelf API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some("In-memory book collection service"))
                .build(),
        )
        .build();

    let mut openapi_spec = serde_json::to_value(&base).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize base OpenAPI document");
        serde_json::json!({ "openapi": "3.1.0", "paths": {} })
    });

    // Common error response schema
    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "status": { "type": "string", "enum": ["fail", "error"] },
            "message": { "type": "string" }
        },
        "required": ["status", "message"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": { "description": "OK" }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                openapi_spec["paths"][path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

async fn not_found() -> AppError {
    AppError::not_found("page not found")
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
