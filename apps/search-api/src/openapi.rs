use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Combined OpenAPI document for the search API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog Search API",
        version = "0.1.0",
        description = "Search cache administration, rate limiting and API key management"
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    modifiers(&DomainDocs, &ApiKeyAuth)
)]
pub struct ApiDoc;

/// Pulls in the paths and schemas documented by each domain crate
struct DomainDocs;

impl Modify for DomainDocs {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(domain_cache::ApiDoc::openapi());
        openapi.merge(domain_security::ApiDoc::openapi());
    }
}

/// `api_key` scheme referenced by the guarded operations
struct ApiKeyAuth;

impl Modify for ApiKeyAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_covers_both_domains() {
        let doc = ApiDoc::openapi();

        for path in [
            "/cache/stats",
            "/cache/clear",
            "/security/info",
            "/security/rate-limit/reset",
            "/security/audit",
            "/security/headers/test",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_api_key_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("api_key"));
        assert!(components.schemas.contains_key("CacheStats"));
    }
}
