//! REST endpoints for organizations under `/api/v1`.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::domains::organization::actions::{
    create_organization, delete_organization, get_organization, update_organization,
};
use crate::domains::organization::{NewOrganization, OrganizationError};
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

/// Body of `POST /api/v1/organizations`
#[derive(Debug, Deserialize)]
pub struct NewOrganizationPayload {
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub street: String,
}

/// Body of `PUT /api/v1/organizations/:id`
#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationPayload {
    pub name: String,
}

impl IntoResponse for OrganizationError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            OrganizationError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            OrganizationError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            OrganizationError::ResourceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service unavailable".to_string())
            }
            OrganizationError::UpstreamFailure(_) => {
                (StatusCode::BAD_GATEWAY, "failed to create organization".to_string())
            }
            OrganizationError::Timeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "failed to create organization".to_string())
            }
            OrganizationError::PersistenceFailure(_)
            | OrganizationError::EventPublicationFailure(_)
            | OrganizationError::CommitFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create organization".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error = %self, "organization request failed");
        }

        (status, message).into_response()
    }
}

pub async fn create_organization_handler(
    Extension(state): Extension<AxumAppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<NewOrganizationPayload>,
) -> Result<Response, OrganizationError> {
    let intent = NewOrganization {
        name: payload.name,
        city: payload.city,
        country: payload.country,
        house_number: payload.house_number,
        postal_code: payload.postal_code,
        state: payload.state,
        street: payload.street,
        created_by: user.user_id,
    };

    let org = create_organization(intent, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(org)).into_response())
}

pub async fn get_organization_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, OrganizationError> {
    let org = get_organization(id, &state.deps).await?;
    Ok(Json(org).into_response())
}

pub async fn update_organization_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrganizationPayload>,
) -> Result<Response, OrganizationError> {
    let org = update_organization(id, payload.name, &state.deps).await?;
    Ok(Json(org).into_response())
}

pub async fn delete_organization_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, OrganizationError> {
    delete_organization(id, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}
