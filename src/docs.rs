use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::media::orientation::Orientation;
use crate::modules::video::model::Video;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::video::handler::get_video,
        crate::modules::video::handler::upload_video,
        crate::modules::video::handler::upload_thumbnail,
    ),
    components(
        schemas(Video, Orientation)
    ),
    tags(
        (name = "Videos", description = "Video and thumbnail uploads")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
