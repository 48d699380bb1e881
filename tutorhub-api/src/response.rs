//! Envelope helpers and request extractors with envelope-shaped rejections

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tutorhub_common::api::{ApiResponse, Pagination};

use crate::error::ApiError;

/// Successful handler output: status plus envelope
pub type ApiJson<T> = (StatusCode, Json<ApiResponse<T>>);

/// 200 with `result`
pub fn ok<T: Serialize>(result: T) -> ApiJson<T> {
    (StatusCode::OK, Json(ApiResponse::success(200, result)))
}

/// 201 with the created resource
pub fn created<T: Serialize>(result: T) -> ApiJson<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(201, result)))
}

/// 200 with one page of results
pub fn paged<T: Serialize>(items: Vec<T>, pagination: Pagination) -> ApiJson<Vec<T>> {
    (StatusCode::OK, Json(ApiResponse::paged(items, pagination)))
}

/// JSON body extractor answering malformed bodies with a 400 envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Query string extractor answering malformed queries with a 400 envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Path extractor answering malformed ids with a 400 envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);
