use std::collections::HashMap;

use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use tourney_api::id::{MatchId, RoundId, StageId, StageItemId, TeamId, TournamentId};
use tourney_api::matches::Match;
use tourney_api::rounds::Round;
use tourney_api::stages::StageItem;
use tourney_api::{RankingConfig, TeamStats};

use super::{Batch, Error, Persistence, Result};

/// A [`Persistence`] implementation keeping everything in memory. All data is lost when the
/// process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    stage_items: HashMap<StageItemId, StageItem>,
    /// Rounds of every stage item, ordered by number.
    rounds: HashMap<StageItemId, Vec<Round>>,
    /// Match ids of every round, ordered by position.
    round_matches: HashMap<RoundId, Vec<MatchId>>,
    matches: HashMap<MatchId, Match>,
    team_stats: HashMap<StageItemId, Vec<(TeamId, TeamStats)>>,
    rankings: HashMap<TournamentId, RankingConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn apply(&mut self, batch: Batch) -> Result<()> {
        let rounds = self.rounds.entry(batch.stage_item_id).or_default();

        if rounds.len() != batch.expected_rounds {
            log::debug!(
                "Rejecting batch for stage item {}: expected {} rounds, found {}",
                batch.stage_item_id,
                batch.expected_rounds,
                rounds.len()
            );

            return Err(Error::Conflict);
        }

        if batch.replace {
            for round in rounds.drain(..) {
                for id in self.round_matches.remove(&round.id).unwrap_or_default() {
                    self.matches.remove(&id);
                }
            }
        }

        for m in batch.updated {
            self.matches.insert(m.id, m);
        }

        for round in batch.rounds {
            let ids = round.matches.iter().map(|m| m.id).collect();
            self.round_matches.insert(round.round.id, ids);

            for m in round.matches {
                self.matches.insert(m.id, m);
            }

            rounds.push(round.round);
        }

        rounds.sort_by_key(|round| round.number);

        Ok(())
    }
}

impl Persistence for MemoryStore {
    fn load_stage_item(&self, id: StageItemId) -> BoxFuture<'_, Result<Option<StageItem>>> {
        let item = self.inner.read().stage_items.get(&id).cloned();

        Box::pin(future::ready(Ok(item)))
    }

    fn list_stage_items(&self, stage_id: StageId) -> BoxFuture<'_, Result<Vec<StageItem>>> {
        let mut items: Vec<StageItem> = self
            .inner
            .read()
            .stage_items
            .values()
            .filter(|item| item.stage_id == stage_id)
            .cloned()
            .collect();

        items.sort_by_key(|item| item.id);

        Box::pin(future::ready(Ok(items)))
    }

    fn insert_stage_item(&self, item: StageItem) -> BoxFuture<'_, Result<()>> {
        self.inner.write().stage_items.insert(item.id, item);

        Box::pin(future::ready(Ok(())))
    }

    fn load_entrants_for_stage_item(
        &self,
        id: StageItemId,
    ) -> BoxFuture<'_, Result<Option<Vec<TeamId>>>> {
        let inputs = self
            .inner
            .read()
            .stage_items
            .get(&id)
            .map(|item| item.inputs.clone());

        Box::pin(future::ready(Ok(inputs)))
    }

    fn load_rounds_for_stage_item(&self, id: StageItemId) -> BoxFuture<'_, Result<Vec<Round>>> {
        let rounds = self
            .inner
            .read()
            .rounds
            .get(&id)
            .cloned()
            .unwrap_or_default();

        Box::pin(future::ready(Ok(rounds)))
    }

    fn load_matches_for_round(&self, id: RoundId) -> BoxFuture<'_, Result<Vec<Match>>> {
        let inner = self.inner.read();

        let matches = match inner.round_matches.get(&id) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.matches.get(id))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        Box::pin(future::ready(Ok(matches)))
    }

    fn load_match(&self, id: MatchId) -> BoxFuture<'_, Result<Option<Match>>> {
        let m = self.inner.read().matches.get(&id).cloned();

        Box::pin(future::ready(Ok(m)))
    }

    fn save_rounds_and_matches(&self, batch: Batch) -> BoxFuture<'_, Result<()>> {
        let res = self.inner.write().apply(batch);

        Box::pin(future::ready(res))
    }

    fn update_match(&self, m: Match) -> BoxFuture<'_, Result<()>> {
        self.inner.write().matches.insert(m.id, m);

        Box::pin(future::ready(Ok(())))
    }

    fn save_team_stats(
        &self,
        id: StageItemId,
        stats: Vec<(TeamId, TeamStats)>,
    ) -> BoxFuture<'_, Result<()>> {
        self.inner.write().team_stats.insert(id, stats);

        Box::pin(future::ready(Ok(())))
    }

    fn load_team_stats(&self, id: StageItemId) -> BoxFuture<'_, Result<Vec<(TeamId, TeamStats)>>> {
        let stats = self
            .inner
            .read()
            .team_stats
            .get(&id)
            .cloned()
            .unwrap_or_default();

        Box::pin(future::ready(Ok(stats)))
    }

    fn load_ranking(&self, id: TournamentId) -> BoxFuture<'_, Result<Option<RankingConfig>>> {
        let config = self.inner.read().rankings.get(&id).copied();

        Box::pin(future::ready(Ok(config)))
    }

    fn save_ranking(&self, id: TournamentId, config: RankingConfig) -> BoxFuture<'_, Result<()>> {
        self.inner.write().rankings.insert(id, config);

        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use tourney_api::id::{MatchId, RoundId, StageItemId, TeamId};
    use tourney_api::matches::{Match, Score};
    use tourney_api::rounds::{Round, RoundWithMatches};

    use super::MemoryStore;
    use crate::store::{Batch, Error, Persistence};

    fn round(id: u64, number: u32, matches: &[u64]) -> RoundWithMatches {
        RoundWithMatches {
            round: Round {
                id: RoundId(id),
                stage_item_id: StageItemId(1),
                number,
            },
            matches: matches
                .iter()
                .enumerate()
                .map(|(position, id)| Match {
                    id: MatchId(*id),
                    round_id: RoundId(id / 10),
                    stage_item_id: StageItemId(1),
                    position: position as u32,
                    participant1: Some(TeamId(1)),
                    participant2: Some(TeamId(2)),
                    start_time: None,
                    end_time: None,
                    winner_id: None,
                    score: Score::default(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_batch() {
        let store = MemoryStore::new();

        let mut batch = Batch::new(StageItemId(1), 0);
        batch.rounds = vec![round(2, 2, &[20]), round(1, 1, &[10, 11])];
        store.save_rounds_and_matches(batch).await.unwrap();

        let rounds = store
            .load_rounds_for_stage_item(StageItemId(1))
            .await
            .unwrap();
        assert_eq!(
            rounds.iter().map(|r| r.number).collect::<Vec<_>>(),
            [1, 2]
        );

        let matches = store.load_matches_for_round(RoundId(1)).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].id, MatchId(11));

        // Stale batch
        let batch = Batch::new(StageItemId(1), 0);
        assert!(matches!(
            store.save_rounds_and_matches(batch).await,
            Err(Error::Conflict)
        ));

        // Replace everything
        let mut batch = Batch::new(StageItemId(1), 2);
        batch.replace = true;
        batch.rounds = vec![round(3, 1, &[30])];
        store.save_rounds_and_matches(batch).await.unwrap();

        let rounds = store
            .load_rounds_for_stage_item(StageItemId(1))
            .await
            .unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].id, RoundId(3));
        assert!(store.load_match(MatchId(10)).await.unwrap().is_none());
        assert!(store.load_match(MatchId(30)).await.unwrap().is_some());
    }
}
