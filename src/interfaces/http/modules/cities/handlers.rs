//! City CRUD and listing handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::dto::{CityDto, CreateCityRequest, ListCitiesParams, UpdateCityRequest};
use crate::application::CityUseCase;
use crate::domain::city::{MSG_CREATED, MSG_DELETED, MSG_RETRIEVED, MSG_UPDATED};
use crate::interfaces::http::common::{
    ApiError, EmptyData, ErrorResponse, ListResponse, MessageResponse, ValidatedJson,
};

/// City handler state
#[derive(Clone)]
pub struct CityState {
    pub usecase: Arc<CityUseCase>,
}

#[utoipa::path(
    post,
    path = "/api/cities",
    tag = "Cities",
    request_body = CreateCityRequest,
    responses(
        (status = 201, description = "City added successfully", body = MessageResponse<CityDto>),
        (status = 400, description = "Malformed JSON body", body = ErrorResponse),
        (status = 409, description = "City name must be unique", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn create_city(
    State(state): State<CityState>,
    ValidatedJson(request): ValidatedJson<CreateCityRequest>,
) -> Result<(StatusCode, Json<MessageResponse<CityDto>>), ApiError> {
    let city = state.usecase.create(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(MSG_CREATED, city.into())),
    ))
}

#[utoipa::path(
    put,
    path = "/api/cities/{id}",
    tag = "Cities",
    params(("id" = String, Path, description = "City ID")),
    request_body = UpdateCityRequest,
    responses(
        (status = 200, description = "City updated successfully", body = MessageResponse<CityDto>),
        (status = 404, description = "City not found", body = ErrorResponse),
        (status = 409, description = "City name must be unique", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn update_city(
    State(state): State<CityState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateCityRequest>,
) -> Result<Json<MessageResponse<CityDto>>, ApiError> {
    let city = state.usecase.update(&id, request.into()).await?;
    Ok(Json(MessageResponse::with_data(MSG_UPDATED, city.into())))
}

#[utoipa::path(
    delete,
    path = "/api/cities/{id}",
    tag = "Cities",
    params(("id" = String, Path, description = "City ID")),
    responses(
        (status = 200, description = "City deleted successfully", body = MessageResponse<EmptyData>),
        (status = 404, description = "City not found", body = ErrorResponse)
    )
)]
pub async fn delete_city(
    State(state): State<CityState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse<EmptyData>>, ApiError> {
    state.usecase.delete(&id).await?;
    Ok(Json(MessageResponse::message(MSG_DELETED)))
}

#[utoipa::path(
    get,
    path = "/api/cities/{id}",
    tag = "Cities",
    params(("id" = String, Path, description = "City ID")),
    responses(
        (status = 200, description = "City retrieved successfully", body = MessageResponse<CityDto>),
        (status = 404, description = "City not found", body = ErrorResponse)
    )
)]
pub async fn get_city(
    State(state): State<CityState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse<CityDto>>, ApiError> {
    let city = state.usecase.get(&id).await?;
    Ok(Json(MessageResponse::with_data(MSG_RETRIEVED, city.into())))
}

#[utoipa::path(
    get,
    path = "/api/cities",
    tag = "Cities",
    params(ListCitiesParams),
    responses(
        (status = 200, description = "Cities with optional pagination metadata", body = ListResponse),
        (status = 400, description = "Malformed filter or projection", body = ErrorResponse)
    )
)]
pub async fn list_cities(
    State(state): State<CityState>,
    Query(params): Query<ListCitiesParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let result = state.usecase.list(params.into_list_query()?).await?;
    Ok(Json(ListResponse {
        data: result.data,
        metadata: result.metadata.into(),
    }))
}
