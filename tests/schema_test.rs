// OpenAPI schema contract test

use utoipa::OpenApi;

#[test]
fn openapi_schema_is_valid_json() {
    let schema = serde_json::to_string_pretty(&cvcrm_mcp::ApiDoc::openapi())
        .expect("OpenAPI schema should serialize to JSON");
    assert!(!schema.is_empty(), "Schema should not be empty");
}

#[test]
fn openapi_schema_contains_required_fields() {
    let schema = serde_json::to_string_pretty(&cvcrm_mcp::ApiDoc::openapi())
        .expect("OpenAPI schema should serialize to JSON");
    assert!(schema.contains("openapi"), "Schema should contain 'openapi' version field");
    assert!(schema.contains("/api/health"), "Schema should document /api/health endpoint");
    assert!(schema.contains("CV CRM MCP Server"), "Schema should contain project name");
}

#[test]
fn openapi_schema_documents_key_endpoints() {
    let schema = serde_json::to_string_pretty(&cvcrm_mcp::ApiDoc::openapi())
        .expect("OpenAPI schema should serialize to JSON");
    assert!(schema.contains("/api/luna"), "Schema should document /api/luna");
    assert!(schema.contains("/api/luna/{alias}"), "Schema should document the alias route");
    assert!(schema.contains("/api/auth/status"), "Schema should document /api/auth/status");
    assert!(schema.contains("/api/auth/code"), "Schema should document /api/auth/code");
    assert!(schema.contains("AuthStatus"), "Schema should carry the AuthStatus component");
}

#[test]
fn openapi_schema_parses_to_valid_structure() {
    let doc = cvcrm_mcp::ApiDoc::openapi();
    let value = serde_json::to_value(&doc).expect("Schema should convert to Value");
    assert!(value.is_object(), "Schema root should be an object");
    assert!(value.get("info").is_some(), "Schema should have 'info' section");
    assert!(value.get("paths").is_some(), "Schema should have 'paths' section");
}
