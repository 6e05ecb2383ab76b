// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use vaid_dashboard::error::{AppError, SchemaError};

#[test]
fn test_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::Storage("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::Geocoding("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[test]
fn test_schema_error_names_document_and_field() {
    let err = SchemaError::MissingField {
        collection: "clients",
        id: "s3".to_string(),
        field: "createdat",
    };
    assert_eq!(
        err.to_string(),
        "clients/s3: missing required field `createdat`"
    );

    let app: AppError = err.into();
    assert_eq!(
        app.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
