//! Generic list/get/create/update/delete handlers.
//!
//! Every business record is served by the same five handlers,
//! monomorphised per [`Entity`]. Access is checked against the entity's
//! module before anything touches the store.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use crate::core::shared::state::AppState;
use crate::core::store::{CrmStore, Entity, EntityStore, Pagination};
use crate::security::auth_api::AuthenticatedUser;
use crate::security::validation::Validate;

pub type ApiResult<T> = Result<T, ApiError>;

pub async fn list<E: Entity>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    page: Result<Query<Pagination>, QueryRejection>,
    filter: Result<Query<E::Filter>, QueryRejection>,
) -> ApiResult<Json<Vec<E>>>
where
    dyn CrmStore: EntityStore<E>,
{
    user.require_read(E::MODULE)?;
    let Query(page) = page?;
    let Query(filter) = filter?;
    page.validate()?;

    let rows = EntityStore::<E>::list(state.store.as_ref(), filter, page).await?;
    Ok(Json(rows.into_iter().map(E::redacted).collect()))
}

pub async fn fetch<E: Entity>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<E>>
where
    dyn CrmStore: EntityStore<E>,
{
    user.require_read(E::MODULE)?;
    let Path(id) = id?;

    let row = EntityStore::<E>::get(state.store.as_ref(), id).await?;
    Ok(Json(row.redacted()))
}

pub async fn create<E: Entity>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    input: Result<Json<E::Input>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<E>)>
where
    dyn CrmStore: EntityStore<E>,
{
    user.require_write(E::MODULE)?;
    let Json(input) = input?;
    input.validate()?;

    let mut row = E::from_input(Uuid::new_v4(), input, Utc::now());
    row.stamp_creator(user.user_id);

    let row = EntityStore::<E>::insert(state.store.as_ref(), row).await?;
    info!("{} created {} {}", user.username, E::LABEL, row.id());
    Ok((StatusCode::CREATED, Json(row.redacted())))
}

pub async fn update<E: Entity>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
    input: Result<Json<E::Input>, JsonRejection>,
) -> ApiResult<Json<E>>
where
    dyn CrmStore: EntityStore<E>,
{
    user.require_write(E::MODULE)?;
    let Path(id) = id?;
    let Json(input) = input?;
    input.validate()?;

    let mut row = EntityStore::<E>::get(state.store.as_ref(), id).await?;
    row.apply_input(input, Utc::now());

    let row = EntityStore::<E>::replace(state.store.as_ref(), row).await?;
    info!("{} updated {} {}", user.username, E::LABEL, id);
    Ok(Json(row.redacted()))
}

pub async fn remove<E: Entity>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode>
where
    dyn CrmStore: EntityStore<E>,
{
    user.require_write(E::MODULE)?;
    let Path(id) = id?;

    EntityStore::<E>::remove(state.store.as_ref(), id).await?;
    info!("{} deleted {} {}", user.username, E::LABEL, id);
    Ok(StatusCode::NO_CONTENT)
}

/// `/` and `/:id` for one collection, to be nested under its path.
pub fn entity_routes<E: Entity>() -> Router<Arc<AppState>>
where
    dyn CrmStore: EntityStore<E>,
{
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route("/:id", get(fetch::<E>).put(update::<E>).delete(remove::<E>))
}
