use actix_web::{
    http::{header, Method},
    web, HttpRequest, HttpResponse, Resource,
};
use tracing::debug;

use super::error::{ErrorBody, ErrorKind, Result};
use crate::{model::PostId, App};

pub mod posts;

static CREATE_METHODS: [Method; 1] = [Method::POST];
static POST_METHODS: [Method; 2] = [Method::GET, Method::DELETE];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(route("/post", &CREATE_METHODS))
        .service(route("/post/", &POST_METHODS))
        .service(route("/post/{id}", &POST_METHODS));
}

/// Builds a resource that only answers to the `allowed` methods.
///
/// Allowed requests are dispatched to the post operation matching
/// their method. Every other method is answered with
/// `405 Method Not Allowed` before anything else happens, the body
/// of the request included.
pub fn route(path: &str, allowed: &'static [Method]) -> Resource {
    web::resource(path).route(web::route().to(
        move |app: web::Data<App>, request: HttpRequest, payload: web::Payload| {
            dispatch(allowed, app, request, payload)
        },
    ))
}

#[tracing::instrument(
    skip_all,
    fields(http.method = %request.method(), http.path = %request.path()),
    name = "http.dispatch"
)]
async fn dispatch(
    allowed: &'static [Method],
    app: web::Data<App>,
    request: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let method = request.method();
    if !allowed.contains(method) {
        debug!("method is not allowed on this route");
        return Ok(method_not_allowed(allowed));
    }

    match *method {
        Method::POST => posts::create(&app, payload).await,
        Method::GET => posts::read(&app, path_id(&request)).await,
        Method::DELETE => posts::delete(&app, path_id(&request)).await,
        _ => Ok(method_not_allowed(allowed)),
    }
}

/// Binds the `{id}` segment of the path and checks its shape.
fn path_id(request: &HttpRequest) -> Option<PostId> {
    request.match_info().get("id").and_then(PostId::parse)
}

fn method_not_allowed(allowed: &[Method]) -> HttpResponse {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let kind = ErrorKind::MethodNotAllowed;
    HttpResponse::build(kind.status_code())
        .insert_header((header::ALLOW, allow))
        .json(ErrorBody::from(kind))
}
