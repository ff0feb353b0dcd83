use serde::Deserialize;

/// Request body for toggling a round's access gate.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetAccessRequest {
    pub enabled: bool,
}
