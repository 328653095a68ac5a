//! Request entry point: resolve, select an action, run it, format the outcome.

use actix_web::{
    HttpRequest, HttpResponse,
    http::Method,
    web::{self, Data},
};
use strum::Display;

use crate::{
    config::ServeConfig,
    delete,
    envelope::{Negotiation, respond_data, respond_error, respond_ok},
    errors::RuntimeError,
    listing, params, relocate, renderer,
    relocate::RelocateAction,
    transfer,
};

/// The operation a request maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    List,
    Read,
    Write,
    Relocate,
    Delete,
}

impl Action {
    /// Maps a method and the target's directory classification onto exactly one action.
    ///
    /// Reads of a directory list it, everything else is decided by the method alone.
    pub fn select(method: &Method, is_directory: bool) -> Result<Self, RuntimeError> {
        let is_read = method == Method::GET || method == Method::HEAD;

        if is_read {
            Ok(if is_directory { Self::List } else { Self::Read })
        } else if method == Method::POST {
            Ok(Self::Write)
        } else if method == Method::PUT {
            Ok(Self::Relocate)
        } else if method == Method::DELETE {
            Ok(Self::Delete)
        } else {
            Err(RuntimeError::MethodNotAllowed)
        }
    }
}

/// Handler for every path below the root.
pub async fn serve(
    req: HttpRequest,
    payload: web::Payload,
    config: Data<ServeConfig>,
) -> HttpResponse {
    let negotiation = Negotiation::from_request(&req);

    match handle(&req, payload, &config, &negotiation).await {
        Ok(res) => res,
        Err(e) => respond_error(&negotiation, &e),
    }
}

async fn handle(
    req: &HttpRequest,
    payload: web::Payload,
    config: &ServeConfig,
    negotiation: &Negotiation,
) -> Result<HttpResponse, RuntimeError> {
    let root = &config.root;
    let target = root.resolve(req.path())?;
    let action = Action::select(req.method(), target.is_directory)?;
    log::debug!("{} {} -> {action}", req.method(), target.request_path);

    match action {
        Action::List => {
            let listing = {
                let target = target.clone();
                web::block(move || listing::list_directory(&target)).await??
            };
            if negotiation.json {
                Ok(respond_data(negotiation, listing))
            } else {
                Ok(HttpResponse::Ok()
                    .content_type(mime::TEXT_HTML_UTF_8)
                    .body(renderer::page(&listing).into_string()))
            }
        }

        Action::Read => transfer::download(req, &target, negotiation).await,

        Action::Write => {
            let saved =
                transfer::upload(req, payload, &target, root, config.max_memory_size).await?;
            log::info!("Uploaded {}", saved.display());
            Ok(respond_ok(negotiation))
        }

        Action::Relocate => {
            let body = params::read_body(payload, config.max_memory_size).await?;
            let params = params::collect(req, &body)?;
            let (act, dst) = match (
                params::string_param(&params, "act")?,
                params::string_param(&params, "dst")?,
            ) {
                (Some(act), Some(dst)) => (act, dst),
                _ => {
                    return Err(RuntimeError::MalformedRequest(
                        "Missing parameters 'act' and 'dst'".to_string(),
                    ));
                }
            };
            let relocate_action = RelocateAction::parse(&act)?;

            let destination = {
                let root = root.clone();
                let target = target.clone();
                web::block(move || relocate::relocate(&root, &target, relocate_action, &dst))
                    .await??
            };
            log::info!(
                "{relocate_action} {} -> {}",
                target.local_path.display(),
                destination.display()
            );
            Ok(respond_ok(negotiation))
        }

        Action::Delete => {
            let removed = target.local_path.clone();
            web::block(move || delete::delete(&target)).await??;
            log::info!("Deleted {}", removed.display());
            Ok(respond_ok(negotiation))
        }
    }
}
