use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{
            CreateUserDto, CreateUserRequest, CreateUserResponse, GetAllUsersResponse, ListQuery,
            UpdateUserRequest, User,
        },
        repo_types::Pagination,
        services::{ServiceError, UserService},
        validation::validate_create,
    },
};

type ApiError = (StatusCode, String);

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(get_all_users))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[instrument(skip(users, payload))]
pub async fn create_user(
    State(users): State<UserService>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<CreateUserResponse>), ApiError> {
    let input = CreateUserDto::from(payload);

    if let Err(e) = validate_create(&input) {
        return Err(reject(e.into()));
    }

    let id = users.create(input).await.map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/users/{id}"))],
        Json(CreateUserResponse { id }),
    ))
}

#[instrument(skip(users, payload))]
pub async fn update_user(
    State(users): State<UserService>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<StatusCode, ApiError> {
    users.update(id, payload.into()).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(users))]
pub async fn get_user(
    State(users): State<UserService>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = users.get_one(id).await.map_err(reject)?;
    Ok(Json(user.into()))
}

#[instrument(skip(users))]
pub async fn get_all_users(
    State(users): State<UserService>,
    Query(q): Query<ListQuery>,
) -> Result<Json<GetAllUsersResponse>, ApiError> {
    let page = match (q.limit, q.offset) {
        (None, None) => None,
        (limit, offset) => Some(Pagination::new(limit, offset)),
    };
    let rows = users.get_all(page).await.map_err(reject)?;
    Ok(Json(GetAllUsersResponse {
        users: rows.into_iter().map(User::from).collect(),
    }))
}

#[instrument(skip(users))]
pub async fn delete_user(
    State(users): State<UserService>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    users.delete(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Maps service failures to status codes. Store and hashing causes are
/// logged here and replaced by a generic message.
fn reject(e: ServiceError) -> ApiError {
    match e {
        ServiceError::Validation(v) => {
            warn!(field = v.field, rule = %v.rule, "validation failed");
            (StatusCode::BAD_REQUEST, format!("Validation error: {v}"))
        }
        ServiceError::NotFound(id) => {
            warn!(user_id = id, "user not found");
            (StatusCode::NOT_FOUND, "User not found".into())
        }
        ServiceError::Conflict(_) => (StatusCode::CONFLICT, e.to_string()),
        other => {
            error!(error = ?other, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            )
        }
    }
}
