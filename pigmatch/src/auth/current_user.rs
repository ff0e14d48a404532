use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{
    AppState,
    config::AuthConfig,
    errors::{Error, Result},
    types::{Role, UserId},
};

/// The authenticated caller, as asserted by the trusted proxy in front of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
}

impl CurrentUser {
    pub fn require(&self, role: Role) -> Result<UserId> {
        if self.role == role {
            Ok(self.id)
        } else {
            Err(Error::forbidden(format!("this operation requires the {role} role")))
        }
    }

    pub fn require_landowner(&self) -> Result<UserId> {
        self.require(Role::Landowner)
    }

    pub fn require_hunter(&self) -> Result<UserId> {
        self.require(Role::Hunter)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| Error::Unauthenticated {
            message: Some(format!("Missing {name} header")),
        })?
        .to_str()
        .map_err(|_| Error::Unauthenticated {
            message: Some(format!("Invalid {name} header")),
        })
}

/// Read the identity headers configured in `auth`.
pub fn from_proxy_headers(parts: &Parts, auth: &AuthConfig) -> Result<CurrentUser> {
    let id = header(parts, &auth.user_id_header)?
        .trim()
        .parse::<UserId>()
        .map_err(|_| Error::Unauthenticated {
            message: Some(format!("{} is not a valid user id", auth.user_id_header)),
        })?;
    let role = header(parts, &auth.role_header)?
        .parse::<Role>()
        .map_err(|_| Error::Unauthenticated {
            message: Some(format!("{} is not a recognised role", auth.role_header)),
        })?;
    Ok(CurrentUser { id, role })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = from_proxy_headers(parts, &state.config.auth)?;
        trace!(user_id = %user.id, role = %user.role, "Authenticated via proxy headers");
        Ok(user)
    }
}
