use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use slotbook_core::{Decision, PrimaryKey, SlotPolicy};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupSchema {
    pub id: PrimaryKey,
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 2, max = 128))]
    pub name: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: Option<String>,
    #[validate(length(min = 2, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 8, max = 64))]
    pub new_password: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRoomSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(range(min = 1, max = 1000))]
    pub capacity: i32,
    pub wifi: bool,
    #[validate(length(max = 512))]
    pub image_url: String,
    /// Initial status every created slot starts out with
    #[schema(value_type = String, example = "free")]
    pub policy: SlotPolicy,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditRoomSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub capacity: Option<i32>,
    pub wifi: Option<bool>,
    #[validate(length(max = 512))]
    pub image_url: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookSlotSchema {
    pub slot_id: PrimaryKey,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecisionSchema {
    #[schema(value_type = String, example = "approved")]
    pub decision: Decision,
}

/// Day filter accepted by the history endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// A calendar day in `YYYY-MM-DD` form
    pub date: Option<String>,
    /// Shorthand for filtering to the current server-local day. The
    /// bare `?today` form counts, whatever the value.
    #[serde(default, deserialize_with = "flag_presence")]
    pub today: bool,
}

fn flag_presence<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?;
    Ok(true)
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| ServerError::BadRequest("JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| ServerError::BadRequest("Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
