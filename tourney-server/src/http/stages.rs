use hyper::Method;
use tourney_api::id::StageId;
use tourney_api::stages::NewStageItem;

use super::{unknown_path, Request, RequestUri, Response, Result};
use crate::method;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    let id: StageId = match uri.take() {
        Some(part) => part.parse()?,
        None => return Err(unknown_path("stages")),
    };

    match uri.take_str() {
        Some("rounds") => method!(req, {
            Method::GET => rounds(req, id).await,
        }),
        Some("items") => method!(req, {
            Method::GET => list_items(req, id).await,
            Method::POST => create_item(req, id).await,
        }),
        Some(part) => Err(unknown_path(part)),
        None => Err(unknown_path(id)),
    }
}

async fn rounds(req: Request, id: StageId) -> Result {
    let rounds = req.state().engine.stage_rounds(id).await?;

    Response::ok().json(&rounds)
}

async fn list_items(req: Request, id: StageId) -> Result {
    let items = req.state().engine.list_stage_items(id).await?;

    Response::ok().json(&items)
}

async fn create_item(mut req: Request, id: StageId) -> Result {
    let new: NewStageItem = req.json().await?;

    let item = req.state().engine.create_stage_item(id, new).await?;

    Response::created().json(&item)
}
