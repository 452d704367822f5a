use tourney_api::id::{StageItemId, TeamId, TournamentId};
use tourney_api::stages::StageItem;
use tourney_api::standings::StandingsEntry;
use tourney_api::RankingConfig;
use tourney_core::groups::Groups;
use tourney_core::standings::{compute_standings, Outcome, Standings};
use tourney_core::{Entrants, StageKind};

use super::{Engine, Error, Result};

impl Engine {
    /// Returns the ranking config of a tournament, or the default if none is stored.
    pub async fn ranking(&self, id: TournamentId) -> Result<RankingConfig> {
        Ok(self.store.load_ranking(id).await?.unwrap_or_default())
    }

    /// Stores the ranking config of a tournament. Configs awarding more than
    /// [`RankingConfig::MAX_POINTS`] per match are rejected.
    pub async fn set_ranking(&self, id: TournamentId, config: RankingConfig) -> Result<()> {
        if !config.is_valid() {
            return Err(Error::InvalidInput(format!(
                "points per match must be within -{max}..={max}",
                max = RankingConfig::MAX_POINTS
            )));
        }

        self.store.save_ranking(id, config).await?;

        log::info!("Updated ranking config of tournament {}", id);
        Ok(())
    }

    /// Returns the ranked standings of a stage item.
    pub async fn standings(&self, id: StageItemId) -> Result<Vec<StandingsEntry>> {
        let item = self.stage_item(id).await?;
        let (entrants, standings) = self.compute(&item).await?;

        let groups = match (item.kind, item.group_count) {
            (StageKind::Group, Some(count)) => Groups::new(entrants.len(), count as usize).ok(),
            _ => None,
        };

        let entries = standings
            .ranked(groups.as_ref())
            .into_iter()
            .filter_map(|entry| {
                let team_id = *entrants.id(entry.seed)?;

                Some(StandingsEntry {
                    team_id,
                    group: entry.group as u32,
                    rank: entry.rank as u32,
                    stats: entry.stats,
                    goal_difference: entry.stats.goal_difference(),
                })
            })
            .collect();

        Ok(entries)
    }

    /// Recomputes the stats of all entrants of a stage item from its completed matches and
    /// stores them.
    pub(super) async fn recompute_standings(&self, item: &StageItem) -> Result<()> {
        let (entrants, standings) = self.compute(item).await?;

        let stats = standings
            .iter()
            .filter_map(|(seed, stats)| Some((*entrants.id(seed)?, *stats)))
            .collect();

        self.store.save_team_stats(item.id, stats).await?;

        log::debug!("Recomputed standings of stage item {}", item.id);
        Ok(())
    }

    async fn compute(&self, item: &StageItem) -> Result<(Entrants<TeamId>, Standings)> {
        let entrants = Entrants::build(item.inputs.iter().copied())?;
        let config = self.ranking(item.tournament_id).await?;

        let outcomes: Vec<Outcome<TeamId>> = self
            .stage_item_rounds(item.id)
            .await?
            .into_iter()
            .flat_map(|round| round.matches)
            .map(|m| Outcome {
                entrants: m.participants(),
                scores: [m.score.team1_score, m.score.team2_score],
                completed: m.is_completed(),
            })
            .collect();

        let standings = compute_standings(&entrants, &outcomes, &config);

        Ok((entrants, standings))
    }
}
