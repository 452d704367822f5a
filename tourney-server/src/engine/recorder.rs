use std::cmp::Ordering;

use chrono::Utc;
use tourney_api::id::MatchId;
use tourney_api::matches::{Match, Score, ScoreUpdate};
use tourney_api::stages::StageItem;
use tourney_api::StageKind;
use tourney_core::{knockout, Entrants};

use super::{materialize, Engine, Error, Result};
use crate::store::Batch;

/// Converts a client provided score into a stored [`Score`].
fn validate(update: ScoreUpdate) -> Result<Score> {
    let convert = |team: u8, value: i64| {
        u32::try_from(value).map_err(|_| {
            Error::InvalidInput(format!("invalid score for team {}: {}", team, value))
        })
    };

    Ok(Score::new(
        convert(1, update.team1)?,
        convert(2, update.team2)?,
    ))
}

impl Engine {
    /// Updates the score of a running or scheduled match. The match is started if it wasn't
    /// already.
    pub async fn update_score(&self, id: MatchId, update: ScoreUpdate) -> Result<Match> {
        let score = validate(update)?;

        let stage_item_id = self.get_match(id).await?.stage_item_id;
        let _guard = self.locks.lock(stage_item_id).await?;

        let mut m = self.get_match(id).await?;
        if m.is_completed() {
            return Err(Error::MatchCompleted(id));
        }

        m.score = score;
        m.start_time.get_or_insert_with(Utc::now);

        self.store.update_match(m.clone()).await?;

        log::debug!(
            "Updated score of match {} to {}:{}",
            id,
            score.team1_score,
            score.team2_score
        );

        Ok(m)
    }

    /// Completes a match with its final score.
    ///
    /// For knockout stage items the next round is created once all matches of the latest round
    /// are completed. The standings of the stage item are recomputed afterwards.
    pub async fn end_match(&self, id: MatchId, update: ScoreUpdate) -> Result<Match> {
        let score = validate(update)?;

        let stage_item_id = self.get_match(id).await?.stage_item_id;
        let _guard = self.locks.lock(stage_item_id).await?;

        let mut m = self.get_match(id).await?;
        if m.is_completed() {
            return Err(Error::MatchCompleted(id));
        }

        let item = self.stage_item(stage_item_id).await?;

        let winner = match score.team1_score.cmp(&score.team2_score) {
            Ordering::Greater => m.participant1,
            Ordering::Less => m.participant2,
            Ordering::Equal => {
                if item.kind == StageKind::Knockout {
                    return Err(Error::InvalidInput(String::from(
                        "knockout matches cannot end in a draw",
                    )));
                }

                None
            }
        };

        let now = Utc::now();
        m.score = score;
        m.start_time.get_or_insert(now);
        m.end_time = Some(now);
        m.winner_id = winner;

        match item.kind {
            StageKind::Knockout => self.advance(&item, m.clone()).await?,
            _ => self.store.update_match(m.clone()).await?,
        }

        log::info!(
            "Match {} ended {}:{}",
            id,
            score.team1_score,
            score.team2_score
        );

        self.recompute_standings(&item).await?;

        Ok(m)
    }

    /// Stores the `completed` match of a knockout stage item. If it was the last open match of
    /// the latest round the next round is stored along with it.
    async fn advance(&self, item: &StageItem, completed: Match) -> Result<()> {
        let rounds = self.store.load_rounds_for_stage_item(item.id).await?;

        let latest = match rounds.last() {
            Some(round) if round.id == completed.round_id => round,
            _ => {
                self.store.update_match(completed).await?;
                return Ok(());
            }
        };

        let mut matches = self.store.load_matches_for_round(latest.id).await?;
        for m in matches.iter_mut().filter(|m| m.id == completed.id) {
            *m = completed.clone();
        }

        if !matches.iter().all(Match::is_completed) {
            self.store.update_match(completed).await?;
            return Ok(());
        }

        let entrants = Entrants::build(item.inputs.iter().copied())?;

        let mut winners = Vec::with_capacity(matches.len());
        for m in &matches {
            match m.winner_id.and_then(|id| entrants.seed_of(&id)) {
                Some(seed) => winners.push(seed),
                None => log::error!("Match {} has no valid winner, skipping", m.id),
            }
        }

        let mut batch = Batch::new(item.id, rounds.len());
        batch.updated.push(completed);

        match knockout::next_round(&winners) {
            Some(plan) => {
                batch.rounds = materialize(item, &entrants, vec![plan], latest.number + 1, Utc::now());

                log::info!(
                    "Advancing {} winners of stage item {} to round {}",
                    winners.len(),
                    item.id,
                    latest.number + 1
                );
            }
            None => log::info!("Stage item {} is finished", item.id),
        }

        self.store.save_rounds_and_matches(batch).await?;
        Ok(())
    }
}
