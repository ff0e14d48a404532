//! OpenAPI document for the `/api/v1` surface, served at `/openapi.json` and rendered at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;
use crate::config::AuthConfig;

/// Documents the proxy identity headers. Only the user id header can be expressed as a scheme;
/// the role header is described alongside it.
struct ProxyUserAddon;

impl Modify for ProxyUserAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let auth = AuthConfig::default();
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "ProxyUser".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    auth.user_id_header,
                    format!(
                        "User id (UUID) asserted by the trusted proxy. The proxy must also send `{}` with \
                         `landowner` or `hunter`. Header names are configurable.",
                        auth.role_header
                    ),
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pigmatch",
        description = "Matches landowners reporting feral pig sightings with hunters and manages access bookings."
    ),
    servers((url = "/api/v1")),
    paths(
        api::handlers::properties::create_property,
        api::handlers::properties::list_properties,
        api::handlers::properties::list_my_properties,
        api::handlers::properties::update_property,
        api::handlers::subscriptions::create_subscription,
        api::handlers::subscriptions::list_my_subscriptions,
        api::handlers::subscriptions::deactivate_subscription,
        api::handlers::sightings::report_sighting,
        api::handlers::sightings::list_visible_sightings,
        api::handlers::sightings::get_sighting,
        api::handlers::sightings::close_sighting,
        api::handlers::sightings::request_access,
        api::handlers::requests::list_incoming,
        api::handlers::requests::list_outgoing,
        api::handlers::requests::get_request,
        api::handlers::requests::approve_request,
        api::handlers::requests::reject_request,
        api::handlers::requests::list_messages,
        api::handlers::requests::post_message,
        api::handlers::matches::list_my_matches,
        api::handlers::matches::cancel_match,
        api::handlers::matches::complete_elapsed,
    ),
    components(schemas(
        crate::errors::ErrorBody,
        crate::geo::GeoPoint,
    )),
    modifiers(&ProxyUserAddon),
    tags(
        (name = "properties", description = "Landowner parcels"),
        (name = "subscriptions", description = "Areas a hunter wants to hear about"),
        (name = "sightings", description = "Reported pig sightings and their visibility"),
        (name = "requests", description = "Access requests, approvals and conversations"),
        (name = "matches", description = "Confirmed bookings"),
    )
)]
pub struct ApiDoc;
