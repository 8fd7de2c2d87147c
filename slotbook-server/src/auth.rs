use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts},
    routing::{get, post, put},
    Json,
};
use slotbook_core::{Credentials, Identity, NewRegistration, UpdatedProfile, UserRole};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, SignupSchema, UpdateProfileSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router,
};

/// The resolved identity of the bearer token on the request
pub struct Session(pub Identity);

impl Session {
    pub fn id(&self) -> i32 {
        self.0.id
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    /// Rejects the request unless the session's role is one of `roles`
    pub fn require(&self, roles: &[UserRole]) -> Result<(), ServerError> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            Err(ServerError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ServerError::Unauthenticated)?;

        let identity = context.slotbook.auth.verify(token).await?;

        Ok(Self(identity))
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .slotbook
        .auth
        .login(Credentials {
            username: body.username,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
async fn signup(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<SignupSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .slotbook
        .auth
        .register(NewRegistration {
            id: body.id,
            username: body.username,
            name: body.name,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The active token was revoked")
    )
)]
async fn logout(session: Session, State(context): State<ServerContext>) -> ServerResult<()> {
    context.slotbook.auth.logout(session.id()).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/user/details",
    tag = "user",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn user_details(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<User>> {
    let user = context.slotbook.auth.user(session.id()).await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/user/update",
    tag = "user",
    request_body = UpdateProfileSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn update_profile(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<UpdateProfileSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .slotbook
        .auth
        .update_profile(UpdatedProfile {
            id: session.id(),
            username: body.username,
            name: body.name,
            new_password: body.new_password,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

pub fn auth_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
}

pub fn user_router() -> Router {
    Router::new()
        .route("/details", get(user_details))
        .route("/update", put(update_profile))
}
