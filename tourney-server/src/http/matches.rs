use hyper::Method;
use tourney_api::id::MatchId;
use tourney_api::matches::ScoreBody;

use super::{unknown_path, Request, RequestUri, Response, Result};
use crate::method;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    let id: MatchId = match uri.take() {
        Some(part) => part.parse()?,
        None => return Err(unknown_path("match")),
    };

    match uri.take_str() {
        None => method!(req, {
            Method::GET => get(req, id).await,
            Method::PATCH => update_score(req, id).await,
        }),
        Some("end") => method!(req, {
            Method::POST => end(req, id).await,
        }),
        Some(part) => Err(unknown_path(part)),
    }
}

async fn get(req: Request, id: MatchId) -> Result {
    let m = req.state().engine.get_match(id).await?;

    Response::ok().json(&m)
}

async fn update_score(mut req: Request, id: MatchId) -> Result {
    let body: ScoreBody = req.json().await?;

    let m = req.state().engine.update_score(id, body.score).await?;

    Response::ok().json(&m)
}

async fn end(mut req: Request, id: MatchId) -> Result {
    let body: ScoreBody = req.json().await?;

    let m = req.state().engine.end_match(id, body.score).await?;

    Response::ok().json(&m)
}
