use hyper::Method;
use tourney_api::id::TournamentId;
use tourney_api::RankingConfig;

use super::{unknown_path, Request, RequestUri, Response, Result};
use crate::method;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    let id: TournamentId = match uri.take() {
        Some(part) => part.parse()?,
        None => return Err(unknown_path("tournaments")),
    };

    match uri.take_str() {
        Some("ranking") => method!(req, {
            Method::GET => get_ranking(req, id).await,
            Method::PUT => put_ranking(req, id).await,
        }),
        Some(part) => Err(unknown_path(part)),
        None => Err(unknown_path(id)),
    }
}

async fn get_ranking(req: Request, id: TournamentId) -> Result {
    let config = req.state().engine.ranking(id).await?;

    Response::ok().json(&config)
}

async fn put_ranking(mut req: Request, id: TournamentId) -> Result {
    let config: RankingConfig = req.json().await?;

    req.state().engine.set_ranking(id, config).await?;

    Response::ok().json(&config)
}
