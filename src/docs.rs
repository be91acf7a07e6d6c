use utoipa::OpenApi;

use crate::modules::callback::dto::{
    CallbackAction, CallbackOutcome, JobProgressEvent, PackagingFailureEvent,
    PackagingFailureMessage, PackagingSuccessEvent,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "ad-normalizer", description = "Rewrites VAST/VMAP responses to serve transcoded creatives"),
    paths(
        crate::modules::ads::handler::get_vast,
        crate::modules::ads::handler::post_vast,
        crate::modules::ads::handler::get_vmap,
        crate::modules::ads::handler::post_vmap,
        crate::modules::callback::handler::encore_callback,
        crate::modules::callback::handler::packaging_success,
        crate::modules::callback::handler::packaging_failure,
    ),
    components(
        schemas(
            JobProgressEvent, PackagingSuccessEvent, PackagingFailureEvent, PackagingFailureMessage,
            CallbackOutcome, CallbackAction,
        )
    ),
    tags(
        (name = "Ads", description = "VAST and VMAP normalization"),
        (name = "Callbacks", description = "Transcoder and packager events")
    )
)]
pub struct ApiDoc;
