use chrono::{DateTime, Utc};
use tourney_api::id::{StageId, StageItemId, TeamId};
use tourney_api::matches::{Match, Score};
use tourney_api::rounds::{Round, RoundWithMatches};
use tourney_api::stages::{NewStageItem, StageItem, StageItemOverview};
use tourney_api::StageKind;
use tourney_core::groups::{self, Groups};
use tourney_core::{Entrants, RoundPlan, ScheduleOptions};

use super::{Engine, Error, Result};
use crate::store::{id, Batch};

/// Turns the `plans` of a stage item into rounds and matches. Rounds are numbered starting at
/// `first_number`.
///
/// Byes are created completed at `now` with the lone entrant as the winner. All other matches
/// are created without a start time.
pub fn materialize(
    item: &StageItem,
    entrants: &Entrants<TeamId>,
    plans: Vec<RoundPlan>,
    first_number: u32,
    now: DateTime<Utc>,
) -> Vec<RoundWithMatches> {
    plans
        .into_iter()
        .zip(first_number..)
        .map(|(plan, number)| {
            let round = Round {
                id: id::round(),
                stage_item_id: item.id,
                number,
            };

            let matches = plan
                .into_iter()
                .zip(0..)
                .map(|(pairing, position)| {
                    let mut m = Match {
                        id: id::match_id(),
                        round_id: round.id,
                        stage_item_id: item.id,
                        position,
                        participant1: None,
                        participant2: None,
                        start_time: None,
                        end_time: None,
                        winner_id: None,
                        score: Score::default(),
                    };

                    match pairing.lone() {
                        Some(seed) => {
                            m.participant1 = entrants.id(seed).copied();
                            m.start_time = Some(now);
                            m.end_time = Some(now);
                            m.winner_id = m.participant1;
                        }
                        None => {
                            let [first, second] = pairing
                                .entrants
                                .map(|seed| seed.and_then(|seed| entrants.id(seed).copied()));

                            m.participant1 = first;
                            m.participant2 = second;
                        }
                    }

                    m
                })
                .collect();

            RoundWithMatches { round, matches }
        })
        .collect()
}

impl Engine {
    /// Creates a new stage item in the stage with the given `stage_id`.
    pub async fn create_stage_item(
        &self,
        stage_id: StageId,
        new: NewStageItem,
    ) -> Result<StageItem> {
        let entrants = Entrants::build(new.inputs.iter().copied())?;

        let group_count = match new.kind {
            StageKind::Group => {
                let count = match new.group_count {
                    Some(count) => count as usize,
                    None => groups::default_group_count(entrants.len(), self.group_size),
                };

                // Reject group counts that cannot be scheduled before storing them.
                Groups::new(entrants.len(), count)?;

                Some(count as u32)
            }
            kind => {
                if new.group_count.is_some() {
                    log::debug!("Ignoring group count for {} stage item", kind);
                }

                None
            }
        };

        let item = StageItem {
            id: id::stage_item(),
            stage_id,
            tournament_id: new.tournament_id,
            kind: new.kind,
            inputs: new.inputs,
            group_count,
        };

        self.store.insert_stage_item(item.clone()).await?;

        log::info!(
            "Created {} stage item {} with {} entrants",
            item.kind,
            item.id,
            entrants.len()
        );

        Ok(item)
    }

    /// Returns all stage items of a stage together with their number of rounds.
    pub async fn list_stage_items(&self, stage_id: StageId) -> Result<Vec<StageItemOverview>> {
        let items = self.store.list_stage_items(stage_id).await?;

        let mut overviews = Vec::with_capacity(items.len());
        for item in items {
            let rounds = self.store.load_rounds_for_stage_item(item.id).await?;

            overviews.push(StageItemOverview {
                item,
                rounds_count: rounds.len() as u32,
            });
        }

        Ok(overviews)
    }

    /// Returns the rounds of every stage item of a stage, ordered by stage item.
    pub async fn stage_rounds(&self, stage_id: StageId) -> Result<Vec<RoundWithMatches>> {
        let mut rounds = Vec::new();

        for item in self.store.list_stage_items(stage_id).await? {
            rounds.extend(self.stage_item_rounds(item.id).await?);
        }

        Ok(rounds)
    }

    /// Generates and stores the rounds of a stage item.
    ///
    /// With `regenerate` all existing rounds are replaced, as long as no contested match has been
    /// started yet. Knockout stage items only receive their first round.
    pub async fn generate_rounds(
        &self,
        id: StageItemId,
        regenerate: bool,
    ) -> Result<Vec<RoundWithMatches>> {
        let _guard = self.locks.lock(id).await?;

        let item = self.stage_item(id).await?;
        let inputs = self
            .store
            .load_entrants_for_stage_item(id)
            .await?
            .ok_or(Error::NotFound {
                kind: "stage item",
                id: id.0,
            })?;
        let entrants = Entrants::build(inputs)?;

        let existing = self.stage_item_rounds(id).await?;

        if regenerate {
            let started = existing
                .iter()
                .flat_map(|round| &round.matches)
                .find(|m| !m.is_bye() && m.start_time.is_some());

            if let Some(m) = started {
                return Err(Error::AlreadyScheduled(format!(
                    "match {} has already started",
                    m.id
                )));
            }
        }

        let options = ScheduleOptions {
            regenerate,
            groups: item.group_count.map(|count| count as usize),
        };

        let plans = tourney_core::generate(&entrants, item.kind, existing.len(), &options)?;

        let first_number = if regenerate {
            1
        } else {
            existing.len() as u32 + 1
        };

        let rounds = materialize(&item, &entrants, plans, first_number, chrono::Utc::now());

        let mut batch = Batch::new(id, existing.len());
        batch.replace = regenerate && !existing.is_empty();
        batch.rounds = rounds.clone();
        self.store.save_rounds_and_matches(batch).await?;

        log::info!(
            "Generated {} rounds for stage item {} (regenerate = {})",
            rounds.len(),
            id,
            regenerate
        );

        // Byes never count, but replaced rounds may have had completed matches.
        if !existing.is_empty() {
            self.recompute_standings(&item).await?;
        }

        Ok(rounds)
    }
}
