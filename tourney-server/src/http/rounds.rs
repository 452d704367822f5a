use hyper::Method;
use tourney_api::id::StageItemId;
use tourney_api::rounds::GeneratedRounds;

use super::{unknown_path, Request, RequestUri, Response, Result};
use crate::method;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    let id: StageItemId = match uri.take() {
        Some(part) => part.parse()?,
        None => return Err(unknown_path("rounds")),
    };

    match uri.take_str() {
        None => method!(req, {
            Method::POST => generate(req, id).await,
        }),
        Some(part) => Err(unknown_path(part)),
    }
}

async fn generate(req: Request, id: StageItemId) -> Result {
    let regenerate = req.query_flag("regenerate")?;

    let rounds = req.state().engine.generate_rounds(id, regenerate).await?;

    Response::created().json(&GeneratedRounds { rounds })
}

#[cfg(test)]
mod tests {
    use hyper::{Method, StatusCode};
    use serde_json::json;

    use crate::http::tests::{request, state};

    #[tokio::test]
    async fn test_generate_rounds() {
        let state = state();

        let (status, item) = request(
            &state,
            Method::POST,
            "/stages/1/items",
            Some(json!({ "tournamentId": 1, "type": "league", "inputs": [1, 2, 3, 4] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = item["id"].as_u64().unwrap();

        let uri = format!("/rounds/{}", id);
        let (status, body) = request(&state, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CREATED);

        let rounds = body["rounds"].as_array().unwrap();
        assert_eq!(rounds.len(), 3);
        for (index, round) in rounds.iter().enumerate() {
            assert_eq!(round["number"], index as u64 + 1);
            assert_eq!(round["matches"].as_array().unwrap().len(), 2);
        }

        let (status, body) = request(&state, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "already_scheduled");

        let (status, body) = request(
            &state,
            Method::POST,
            &format!("{}?regenerate=true", uri),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["rounds"].as_array().unwrap().len(), 3);

        let (status, body) = request(&state, Method::POST, "/rounds/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }
}
