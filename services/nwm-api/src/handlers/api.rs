//! Documentation handlers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

use nwm_protocol::media_types;

/// OpenAPI 3.0 document for the NWM API
const OPENAPI_SPEC: &str = include_str!("../openapi.json");

const REDOC_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>National Water Model API Documentation</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link href="https://fonts.googleapis.com/css?family=Montserrat:300,400,700|Roboto:300,400,700" rel="stylesheet">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <redoc spec-url='/openapi.json'></redoc>
    <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
</body>
</html>"#;

/// GET / - Redirect to the documentation page
pub async fn root_handler() -> Redirect {
    Redirect::temporary("/docs")
}

/// GET /openapi.json - OpenAPI definition
pub async fn openapi_handler() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, media_types::JSON),
            (header::CACHE_CONTROL, "max-age=3600"),
        ],
        OPENAPI_SPEC,
    )
        .into_response()
}

/// GET /docs - API documentation (ReDoc)
pub async fn docs_handler() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, media_types::HTML),
            (header::CACHE_CONTROL, "max-age=3600"),
        ],
        REDOC_PAGE,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_is_valid_json() {
        let doc: serde_json::Value = serde_json::from_str(OPENAPI_SPEC).unwrap();
        assert_eq!(doc["info"]["version"], "1.1.0");
        for path in ["/forecast", "/analysis-assim", "/geometry", "/return-period"] {
            assert!(doc["paths"].get(path).is_some(), "missing {}", path);
        }
    }
}
