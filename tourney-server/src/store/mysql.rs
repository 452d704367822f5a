use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{MySql, Row, Transaction};
use tourney_api::id::{MatchId, RoundId, StageId, StageItemId, TeamId, TournamentId};
use tourney_api::matches::{Match, Score};
use tourney_api::rounds::Round;
use tourney_api::stages::StageItem;
use tourney_api::{RankingConfig, StageKind, TeamStats};

use super::{Batch, Error, Persistence, Result};

const MATCH_COLUMNS: &str = "id, round_id, stage_item_id, position, participant1, participant2, start_time, end_time, winner_id, team1_score, team2_score";

/// A [`Persistence`] implementation backed by MySQL. All tables are prefixed with
/// `table_prefix`.
#[derive(Clone, Debug)]
pub struct MySqlStore {
    pub pool: MySqlPool,
    pub table_prefix: String,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, table_prefix: String) -> Self {
        Self { pool, table_prefix }
    }

    /// Creates all tables that don't exist yet.
    pub async fn migrate(&self) -> Result<()> {
        let prefix = &self.table_prefix;

        let tables = [
            format!("CREATE TABLE IF NOT EXISTS {}stage_items (id BIGINT UNSIGNED PRIMARY KEY, stage_id BIGINT UNSIGNED NOT NULL, tournament_id BIGINT UNSIGNED NOT NULL, kind TINYINT UNSIGNED NOT NULL, group_count INT UNSIGNED NULL, inputs BLOB NOT NULL, INDEX (stage_id))", prefix),
            format!("CREATE TABLE IF NOT EXISTS {}rounds (id BIGINT UNSIGNED PRIMARY KEY, stage_item_id BIGINT UNSIGNED NOT NULL, number INT UNSIGNED NOT NULL, UNIQUE (stage_item_id, number))", prefix),
            format!("CREATE TABLE IF NOT EXISTS {}matches (id BIGINT UNSIGNED PRIMARY KEY, round_id BIGINT UNSIGNED NOT NULL, stage_item_id BIGINT UNSIGNED NOT NULL, position INT UNSIGNED NOT NULL, participant1 BIGINT UNSIGNED NULL, participant2 BIGINT UNSIGNED NULL, start_time DATETIME(3) NULL, end_time DATETIME(3) NULL, winner_id BIGINT UNSIGNED NULL, team1_score BIGINT NOT NULL DEFAULT 0, team2_score BIGINT NOT NULL DEFAULT 0, INDEX (round_id), INDEX (stage_item_id))", prefix),
            format!("CREATE TABLE IF NOT EXISTS {}team_stats (stage_item_id BIGINT UNSIGNED NOT NULL, team_id BIGINT UNSIGNED NOT NULL, data BLOB NOT NULL, PRIMARY KEY (stage_item_id, team_id))", prefix),
            format!("CREATE TABLE IF NOT EXISTS {}rankings (tournament_id BIGINT UNSIGNED PRIMARY KEY, data BLOB NOT NULL)", prefix),
        ];

        for sql in tables {
            sqlx::query(&sql).execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the rounds of the stage item for the rest of the transaction.
        let rows = sqlx::query(&format!(
            "SELECT id FROM {}rounds WHERE stage_item_id = ? FOR UPDATE",
            self.table_prefix
        ))
        .bind(batch.stage_item_id.0)
        .fetch_all(&mut tx)
        .await?;

        if rows.len() != batch.expected_rounds {
            log::debug!(
                "Rejecting batch for stage item {}: expected {} rounds, found {}",
                batch.stage_item_id,
                batch.expected_rounds,
                rows.len()
            );

            tx.rollback().await?;
            return Err(Error::Conflict);
        }

        if batch.replace {
            for table in ["matches", "rounds"] {
                sqlx::query(&format!(
                    "DELETE FROM {}{} WHERE stage_item_id = ?",
                    self.table_prefix, table
                ))
                .bind(batch.stage_item_id.0)
                .execute(&mut tx)
                .await?;
            }
        }

        for m in &batch.updated {
            self.write_match(&mut tx, m, false).await?;
        }

        for round in &batch.rounds {
            sqlx::query(&format!(
                "INSERT INTO {}rounds (id, stage_item_id, number) VALUES (?, ?, ?)",
                self.table_prefix
            ))
            .bind(round.round.id.0)
            .bind(round.round.stage_item_id.0)
            .bind(round.round.number)
            .execute(&mut tx)
            .await?;

            for m in &round.matches {
                self.write_match(&mut tx, m, true).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn write_match(
        &self,
        tx: &mut Transaction<'_, MySql>,
        m: &Match,
        insert: bool,
    ) -> Result<()> {
        let sql = if insert {
            format!(
                "INSERT INTO {}matches ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                self.table_prefix, MATCH_COLUMNS
            )
        } else {
            format!(
                "UPDATE {}matches SET round_id = ?, stage_item_id = ?, position = ?, participant1 = ?, participant2 = ?, start_time = ?, end_time = ?, winner_id = ?, team1_score = ?, team2_score = ? WHERE id = ?",
                self.table_prefix
            )
        };

        let mut query = sqlx::query(&sql);
        if insert {
            query = query.bind(m.id.0);
        }

        query = query
            .bind(m.round_id.0)
            .bind(m.stage_item_id.0)
            .bind(m.position)
            .bind(m.participant1.map(|id| id.0))
            .bind(m.participant2.map(|id| id.0))
            .bind(m.start_time)
            .bind(m.end_time)
            .bind(m.winner_id.map(|id| id.0))
            .bind(i64::from(m.score.team1_score))
            .bind(i64::from(m.score.team2_score));

        if !insert {
            query = query.bind(m.id.0);
        }

        query.execute(&mut *tx).await?;
        Ok(())
    }

    fn stage_item_from_row(row: &MySqlRow) -> Result<StageItem> {
        let kind: u8 = row.try_get("kind")?;
        let kind = StageKind::from_u8(kind).ok_or_else(|| Error::InvalidValue {
            column: "kind",
            value: kind.to_string(),
        })?;

        let inputs: Vec<u8> = row.try_get("inputs")?;

        Ok(StageItem {
            id: StageItemId(row.try_get("id")?),
            stage_id: StageId(row.try_get("stage_id")?),
            tournament_id: TournamentId(row.try_get("tournament_id")?),
            kind,
            inputs: serde_json::from_slice(&inputs)?,
            group_count: row.try_get("group_count")?,
        })
    }

    fn match_from_row(row: &MySqlRow) -> Result<Match> {
        let id = MatchId(row.try_get("id")?);

        let mut scores = [0; 2];
        for (score, column) in scores.iter_mut().zip(["team1_score", "team2_score"]) {
            let value: i64 = row.try_get(column)?;

            *score = match u32::try_from(value) {
                Ok(value) => value,
                Err(_) => {
                    log::warn!(
                        "Match {} has an invalid {} of {}, using 0",
                        id,
                        column,
                        value
                    );
                    0
                }
            };
        }

        let team = |column: &'static str| -> Result<Option<TeamId>> {
            Ok(row.try_get::<Option<u64>, _>(column)?.map(TeamId))
        };

        Ok(Match {
            id,
            round_id: RoundId(row.try_get("round_id")?),
            stage_item_id: StageItemId(row.try_get("stage_item_id")?),
            position: row.try_get("position")?,
            participant1: team("participant1")?,
            participant2: team("participant2")?,
            start_time: row.try_get::<Option<DateTime<Utc>>, _>("start_time")?,
            end_time: row.try_get::<Option<DateTime<Utc>>, _>("end_time")?,
            winner_id: team("winner_id")?,
            score: Score::new(scores[0], scores[1]),
        })
    }
}

impl Persistence for MySqlStore {
    fn load_stage_item(&self, id: StageItemId) -> BoxFuture<'_, Result<Option<StageItem>>> {
        Box::pin(async move {
            let row = match sqlx::query(&format!(
                "SELECT id, stage_id, tournament_id, kind, group_count, inputs FROM {}stage_items WHERE id = ?",
                self.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            {
                Ok(row) => row,
                Err(sqlx::Error::RowNotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            Ok(Some(Self::stage_item_from_row(&row)?))
        })
    }

    fn list_stage_items(&self, stage_id: StageId) -> BoxFuture<'_, Result<Vec<StageItem>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT id, stage_id, tournament_id, kind, group_count, inputs FROM {}stage_items WHERE stage_id = ? ORDER BY id ASC",
                self.table_prefix
            );

            let mut rows = sqlx::query(&sql).bind(stage_id.0).fetch(&self.pool);

            let mut items = Vec::new();
            while let Some(row) = rows.try_next().await? {
                items.push(Self::stage_item_from_row(&row)?);
            }

            Ok(items)
        })
    }

    fn insert_stage_item(&self, item: StageItem) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            sqlx::query(&format!(
                "INSERT INTO {}stage_items (id, stage_id, tournament_id, kind, group_count, inputs) VALUES (?, ?, ?, ?, ?, ?)",
                self.table_prefix
            ))
            .bind(item.id.0)
            .bind(item.stage_id.0)
            .bind(item.tournament_id.0)
            .bind(item.kind.to_u8())
            .bind(item.group_count)
            .bind(serde_json::to_vec(&item.inputs)?)
            .execute(&self.pool)
            .await?;

            Ok(())
        })
    }

    fn load_entrants_for_stage_item(
        &self,
        id: StageItemId,
    ) -> BoxFuture<'_, Result<Option<Vec<TeamId>>>> {
        Box::pin(async move {
            let row = match sqlx::query(&format!(
                "SELECT inputs FROM {}stage_items WHERE id = ?",
                self.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            {
                Ok(row) => row,
                Err(sqlx::Error::RowNotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            let inputs: Vec<u8> = row.try_get("inputs")?;
            Ok(Some(serde_json::from_slice(&inputs)?))
        })
    }

    fn load_rounds_for_stage_item(&self, id: StageItemId) -> BoxFuture<'_, Result<Vec<Round>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT id, number FROM {}rounds WHERE stage_item_id = ? ORDER BY number ASC",
                self.table_prefix
            );

            let mut rows = sqlx::query(&sql).bind(id.0).fetch(&self.pool);

            let mut rounds = Vec::new();
            while let Some(row) = rows.try_next().await? {
                rounds.push(Round {
                    id: RoundId(row.try_get("id")?),
                    stage_item_id: id,
                    number: row.try_get("number")?,
                });
            }

            Ok(rounds)
        })
    }

    fn load_matches_for_round(&self, id: RoundId) -> BoxFuture<'_, Result<Vec<Match>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {} FROM {}matches WHERE round_id = ? ORDER BY position ASC",
                MATCH_COLUMNS, self.table_prefix
            );

            let mut rows = sqlx::query(&sql).bind(id.0).fetch(&self.pool);

            let mut matches = Vec::new();
            while let Some(row) = rows.try_next().await? {
                matches.push(Self::match_from_row(&row)?);
            }

            Ok(matches)
        })
    }

    fn load_match(&self, id: MatchId) -> BoxFuture<'_, Result<Option<Match>>> {
        Box::pin(async move {
            let row = match sqlx::query(&format!(
                "SELECT {} FROM {}matches WHERE id = ?",
                MATCH_COLUMNS, self.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            {
                Ok(row) => row,
                Err(sqlx::Error::RowNotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            Ok(Some(Self::match_from_row(&row)?))
        })
    }

    fn save_rounds_and_matches(&self, batch: Batch) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.apply(batch))
    }

    fn update_match(&self, m: Match) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            self.write_match(&mut tx, &m, false).await?;
            tx.commit().await?;

            Ok(())
        })
    }

    fn save_team_stats(
        &self,
        id: StageItemId,
        stats: Vec<(TeamId, TeamStats)>,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query(&format!(
                "DELETE FROM {}team_stats WHERE stage_item_id = ?",
                self.table_prefix
            ))
            .bind(id.0)
            .execute(&mut tx)
            .await?;

            for (team_id, stats) in &stats {
                sqlx::query(&format!(
                    "INSERT INTO {}team_stats (stage_item_id, team_id, data) VALUES (?, ?, ?)",
                    self.table_prefix
                ))
                .bind(id.0)
                .bind(team_id.0)
                .bind(serde_json::to_vec(stats)?)
                .execute(&mut tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        })
    }

    fn load_team_stats(&self, id: StageItemId) -> BoxFuture<'_, Result<Vec<(TeamId, TeamStats)>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT team_id, data FROM {}team_stats WHERE stage_item_id = ?",
                self.table_prefix
            );

            let mut rows = sqlx::query(&sql).bind(id.0).fetch(&self.pool);

            let mut stats = Vec::new();
            while let Some(row) = rows.try_next().await? {
                let data: Vec<u8> = row.try_get("data")?;

                stats.push((TeamId(row.try_get("team_id")?), serde_json::from_slice(&data)?));
            }

            Ok(stats)
        })
    }

    fn load_ranking(&self, id: TournamentId) -> BoxFuture<'_, Result<Option<RankingConfig>>> {
        Box::pin(async move {
            let row = match sqlx::query(&format!(
                "SELECT data FROM {}rankings WHERE tournament_id = ?",
                self.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            {
                Ok(row) => row,
                Err(sqlx::Error::RowNotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            let data: Vec<u8> = row.try_get("data")?;
            Ok(Some(serde_json::from_slice(&data)?))
        })
    }

    fn save_ranking(&self, id: TournamentId, config: RankingConfig) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            sqlx::query(&format!(
                "INSERT INTO {}rankings (tournament_id, data) VALUES (?, ?) ON DUPLICATE KEY UPDATE data = VALUES(data)",
                self.table_prefix
            ))
            .bind(id.0)
            .bind(serde_json::to_vec(&config)?)
            .execute(&self.pool)
            .await?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use chrono::{TimeZone, Utc};
    use sqlx::MySqlPool;
    use tourney_api::id::{MatchId, RoundId, StageId, StageItemId, TeamId, TournamentId};
    use tourney_api::matches::{Match, Score};
    use tourney_api::rounds::{Round, RoundWithMatches};
    use tourney_api::stages::StageItem;
    use tourney_api::StageKind;

    use super::MySqlStore;
    use crate::config::Database;
    use crate::store::{id, Batch, Error, Persistence};

    /// Connects to the database configured by the `TOURNEY_DB_*` variables. Every call uses a
    /// fresh table prefix.
    async fn store() -> Option<MySqlStore> {
        if env::var("TOURNEY_DB_HOST").is_err() {
            eprintln!("TOURNEY_DB_HOST is not set, skipping");
            return None;
        }

        let database = Database::default().with_environment();
        let pool = MySqlPool::connect(&database.connect_string()).await.unwrap();

        let store = MySqlStore::new(pool, format!("test{}_", id::stage_item()));
        store.migrate().await.unwrap();
        Some(store)
    }

    async fn drop_tables(store: &MySqlStore) {
        for table in ["stage_items", "rounds", "matches", "team_stats", "rankings"] {
            sqlx::query(&format!("DROP TABLE {}{}", store.table_prefix, table))
                .execute(&store.pool)
                .await
                .unwrap();
        }
    }

    fn round(stage_item_id: StageItemId, number: u32, matches: usize) -> RoundWithMatches {
        let round_id = id::round();

        RoundWithMatches {
            round: Round {
                id: round_id,
                stage_item_id,
                number,
            },
            matches: (0..matches)
                .map(|position| Match {
                    id: id::match_id(),
                    round_id,
                    stage_item_id,
                    position: position as u32,
                    participant1: Some(TeamId(position as u64 * 2 + 1)),
                    participant2: Some(TeamId(position as u64 * 2 + 2)),
                    start_time: None,
                    end_time: None,
                    winner_id: None,
                    score: Score::default(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_mysql_batch() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };
        // Migrations can run repeatedly.
        store.migrate().await.unwrap();

        let item = StageItem {
            id: id::stage_item(),
            stage_id: StageId(1),
            tournament_id: TournamentId(1),
            kind: StageKind::League,
            inputs: (1..=4).map(TeamId).collect(),
            group_count: None,
        };
        store.insert_stage_item(item.clone()).await.unwrap();
        assert_eq!(store.load_stage_item(item.id).await.unwrap(), Some(item.clone()));

        let mut batch = Batch::new(item.id, 0);
        batch.rounds = vec![round(item.id, 1, 2), round(item.id, 2, 2)];
        let written = batch.rounds.clone();
        store.save_rounds_and_matches(batch).await.unwrap();

        let rounds = store.load_rounds_for_stage_item(item.id).await.unwrap();
        assert_eq!(
            rounds,
            written.iter().map(|r| r.round).collect::<Vec<_>>()
        );
        assert_eq!(
            store.load_matches_for_round(rounds[0].id).await.unwrap(),
            written[0].matches
        );

        // A batch created before the rounds were written is rejected without any writes.
        let mut stale = Batch::new(item.id, 0);
        stale.rounds = vec![round(item.id, 3, 1)];
        assert!(matches!(
            store.save_rounds_and_matches(stale).await,
            Err(Error::Conflict)
        ));
        assert_eq!(store.load_rounds_for_stage_item(item.id).await.unwrap().len(), 2);

        let mut m = written[0].matches[0].clone();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        m.score = Score::new(3, 1);
        m.start_time = Some(now);
        m.end_time = Some(now);
        m.winner_id = m.participant1;
        store.update_match(m.clone()).await.unwrap();
        assert_eq!(store.load_match(m.id).await.unwrap(), Some(m.clone()));

        let mut replace = Batch::new(item.id, 2);
        replace.replace = true;
        replace.rounds = vec![round(item.id, 1, 1)];
        store.save_rounds_and_matches(replace).await.unwrap();

        assert_eq!(store.load_rounds_for_stage_item(item.id).await.unwrap().len(), 1);
        assert_eq!(store.load_match(m.id).await.unwrap(), None);
        assert_eq!(store.load_match(MatchId(0)).await.unwrap(), None);
        assert!(store
            .load_matches_for_round(RoundId(0))
            .await
            .unwrap()
            .is_empty());

        drop_tables(&store).await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_mysql_batch_concurrent() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };

        for _ in 0..8 {
            let id = id::stage_item();

            let mut a = Batch::new(id, 0);
            a.rounds = vec![round(id, 1, 2)];
            let mut b = Batch::new(id, 0);
            b.rounds = vec![round(id, 1, 2)];

            let (a, b) = tokio::join!(
                store.save_rounds_and_matches(a),
                store.save_rounds_and_matches(b)
            );

            // The loser either waits for the row locks or is chosen as the deadlock victim,
            // both surface as a conflict.
            let results = [a, b];
            assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
            assert!(results.iter().any(|res| matches!(res, Err(Error::Conflict))));

            assert_eq!(store.load_rounds_for_stage_item(id).await.unwrap().len(), 1);
        }

        drop_tables(&store).await;
    }
}
