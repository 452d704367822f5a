use hyper::Method;
use tourney_api::id::StageItemId;

use super::{unknown_path, Request, RequestUri, Response, Result};
use crate::method;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    let id: StageItemId = match uri.take() {
        Some(part) => part.parse()?,
        None => return Err(unknown_path("stageItem")),
    };

    match uri.take_str() {
        None => method!(req, {
            Method::GET => get(req, id).await,
        }),
        Some("rounds") => method!(req, {
            Method::GET => rounds(req, id).await,
        }),
        Some("standings") => method!(req, {
            Method::GET => standings(req, id).await,
        }),
        Some(part) => Err(unknown_path(part)),
    }
}

async fn get(req: Request, id: StageItemId) -> Result {
    let item = req.state().engine.stage_item(id).await?;

    Response::ok().json(&item)
}

async fn rounds(req: Request, id: StageItemId) -> Result {
    // Distinguish an unknown stage item from one without rounds.
    req.state().engine.stage_item(id).await?;

    let rounds = req.state().engine.stage_item_rounds(id).await?;

    Response::ok().json(&rounds)
}

async fn standings(req: Request, id: StageItemId) -> Result {
    let standings = req.state().engine.standings(id).await?;

    Response::ok().json(&standings)
}
