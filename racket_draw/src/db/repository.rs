//! Storage abstraction for brackets, matches and standings.
//!
//! The core never writes across entities atomically. The only guarantee it
//! needs from storage is per-entity atomicity plus the versioned match write
//! in [`BracketRepository::update_match`].

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::bracket::BracketConfig;
use crate::bracket::models::{Bracket, BracketId, CategoryId, MatchId, Phase, TournamentId};
use crate::errors::{DrawError, DrawResult};
use crate::matches::{Match, SetScore, Side};
use crate::standings::Standing;

/// Trait for bracket storage operations
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Get bracket by ID
    async fn get_bracket(&self, id: BracketId) -> DrawResult<Option<Bracket>>;

    /// Find the bracket of a tournament category
    async fn find_bracket(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
    ) -> DrawResult<Option<Bracket>>;

    /// List all brackets of a tournament
    async fn list_brackets(&self, tournament_id: TournamentId) -> DrawResult<Vec<Bracket>>;

    /// Insert or replace a bracket
    async fn upsert_bracket(&self, bracket: &Bracket) -> DrawResult<()>;

    /// Delete a bracket together with its matches and standings
    async fn delete_bracket(&self, id: BracketId) -> DrawResult<()>;

    /// Get match by ID
    async fn get_match(&self, id: MatchId) -> DrawResult<Option<Match>>;

    /// List matches of a bracket, group stage first, then by round and slot
    async fn list_matches(&self, bracket_id: BracketId) -> DrawResult<Vec<Match>>;

    /// Insert freshly generated matches
    async fn insert_matches(&self, matches: &[Match]) -> DrawResult<()>;

    /// Write a match if its stored version still equals `m.version`.
    ///
    /// Returns the stored match with the incremented version.
    ///
    /// # Errors
    ///
    /// * `DrawError::Conflict` - The match changed since it was read
    /// * `DrawError::MatchNotFound` - No such match
    async fn update_match(&self, m: &Match) -> DrawResult<Match>;

    /// Delete matches by ID
    async fn delete_matches(&self, ids: &[MatchId]) -> DrawResult<()>;

    /// List standings of a bracket, group rows first
    async fn list_standings(&self, bracket_id: BracketId) -> DrawResult<Vec<Standing>>;

    /// Replace every standing row of one phase with `rows`
    async fn replace_standings(
        &self,
        bracket_id: BracketId,
        phase: Phase,
        rows: &[Standing],
    ) -> DrawResult<()>;
}

fn side_to_db(side: Option<Side>) -> Option<i16> {
    side.map(|s| match s {
        Side::One => 1,
        Side::Two => 2,
    })
}

fn side_from_db(value: Option<i16>) -> Option<Side> {
    match value {
        Some(1) => Some(Side::One),
        Some(2) => Some(Side::Two),
        _ => None,
    }
}

/// Successors before the matches that point at them, finals first
fn insertion_order(matches: &[Match]) -> Vec<&Match> {
    let mut ordered: Vec<&Match> = matches.iter().collect();
    ordered.sort_by_key(|m| std::cmp::Reverse(m.round));
    ordered
}

/// Default PostgreSQL implementation of `BracketRepository`
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn bracket_from_row(row: &PgRow) -> DrawResult<Bracket> {
        let format: String = row.get("format");
        let seeding: String = row.get("seeding_method");
        let status: String = row.get("status");

        Ok(Bracket {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            category_id: row.get("category_id"),
            format: format.parse()?,
            seeding_method: seeding.parse()?,
            status: status.parse()?,
            config: BracketConfig::from_value(row.get("config"))?,
            withdrawn_teams: row.get("withdrawn_teams"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn match_from_row(row: &PgRow) -> DrawResult<Match> {
        let status: String = row.get("status");
        let sets: Vec<SetScore> = serde_json::from_value(row.get("sets"))?;

        Ok(Match {
            id: row.get("id"),
            bracket_id: row.get("bracket_id"),
            round: row.get::<i32, _>("round") as u32,
            round_name: row.get("round_name"),
            slot: row.get::<i32, _>("slot") as u32,
            team1: row.get("team1"),
            team2: row.get("team2"),
            winner: side_from_db(row.get("winner")),
            sets,
            status: status.parse()?,
            group_number: row.get::<Option<i32>, _>("group_number").map(|g| g as u32),
            next_match_id: row.get("next_match_id"),
            next_match_slot: side_from_db(row.get("next_match_slot")),
            court: row.get("court"),
            scheduled_at: row.get("scheduled_at"),
            is_bye: row.get("is_bye"),
            version: row.get("version"),
        })
    }

    fn standing_from_row(row: &PgRow) -> Standing {
        Standing {
            bracket_id: row.get("bracket_id"),
            team_id: row.get("team_id"),
            group_number: row.get::<Option<i32>, _>("group_number").map(|g| g as u32),
            position: row.get::<i32, _>("position") as u32,
            played: row.get::<i32, _>("played") as u32,
            won: row.get::<i32, _>("won") as u32,
            lost: row.get::<i32, _>("lost") as u32,
            games_won: row.get::<i32, _>("games_won") as u32,
            games_lost: row.get::<i32, _>("games_lost") as u32,
            points: row.get("points"),
            furthest_round: row.get::<Option<i32>, _>("furthest_round").map(|r| r as u32),
            eliminated: row.get("eliminated"),
        }
    }
}

const BRACKET_COLUMNS: &str = "id, tournament_id, category_id, format, seeding_method, status, \
     config, withdrawn_teams, created_at, updated_at";

const MATCH_COLUMNS: &str = "id, bracket_id, round, round_name, slot, team1, team2, winner, sets, \
     status, group_number, next_match_id, next_match_slot, court, scheduled_at, is_bye, version";

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn get_bracket(&self, id: BracketId) -> DrawResult<Option<Bracket>> {
        let row = sqlx::query(&format!("SELECT {BRACKET_COLUMNS} FROM brackets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::bracket_from_row).transpose()
    }

    async fn find_bracket(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
    ) -> DrawResult<Option<Bracket>> {
        let row = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM brackets WHERE tournament_id = $1 AND category_id = $2"
        ))
        .bind(tournament_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::bracket_from_row).transpose()
    }

    async fn list_brackets(&self, tournament_id: TournamentId) -> DrawResult<Vec<Bracket>> {
        let rows = sqlx::query(&format!(
            "SELECT {BRACKET_COLUMNS} FROM brackets WHERE tournament_id = $1 ORDER BY created_at"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::bracket_from_row).collect()
    }

    async fn upsert_bracket(&self, bracket: &Bracket) -> DrawResult<()> {
        let config = serde_json::to_value(&bracket.config)?;

        sqlx::query(
            r#"
            INSERT INTO brackets (id, tournament_id, category_id, format, seeding_method, status,
                                  config, withdrawn_teams, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                format = EXCLUDED.format,
                seeding_method = EXCLUDED.seeding_method,
                status = EXCLUDED.status,
                config = EXCLUDED.config,
                withdrawn_teams = EXCLUDED.withdrawn_teams,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(bracket.id)
        .bind(bracket.tournament_id)
        .bind(bracket.category_id)
        .bind(bracket.format.to_string())
        .bind(bracket.seeding_method.to_string())
        .bind(bracket.status.to_string())
        .bind(config)
        .bind(&bracket.withdrawn_teams)
        .bind(bracket.created_at)
        .bind(bracket.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_bracket(&self, id: BracketId) -> DrawResult<()> {
        // Matches and standings go with ON DELETE CASCADE.
        sqlx::query("DELETE FROM brackets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_match(&self, id: MatchId) -> DrawResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::match_from_row).transpose()
    }

    async fn list_matches(&self, bracket_id: BracketId) -> DrawResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE bracket_id = $1 \
             ORDER BY group_number IS NULL, group_number, round, slot"
        ))
        .bind(bracket_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::match_from_row).collect()
    }

    async fn insert_matches(&self, matches: &[Match]) -> DrawResult<()> {
        let mut tx = self.pool.begin().await?;

        for m in insertion_order(matches) {
            sqlx::query(
                r#"
                INSERT INTO matches (id, bracket_id, round, round_name, slot, team1, team2, winner,
                                     sets, status, group_number, next_match_id, next_match_slot,
                                     court, scheduled_at, is_bye, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                "#,
            )
            .bind(m.id)
            .bind(m.bracket_id)
            .bind(m.round as i32)
            .bind(&m.round_name)
            .bind(m.slot as i32)
            .bind(m.team1)
            .bind(m.team2)
            .bind(side_to_db(m.winner))
            .bind(serde_json::to_value(&m.sets)?)
            .bind(m.status.to_string())
            .bind(m.group_number.map(|g| g as i32))
            .bind(m.next_match_id)
            .bind(side_to_db(m.next_match_slot))
            .bind(&m.court)
            .bind(m.scheduled_at)
            .bind(m.is_bye)
            .bind(m.version)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_match(&self, m: &Match) -> DrawResult<Match> {
        // Structure columns (round, slot, next match) are immutable after
        // generation and are not written here.
        let row = sqlx::query(
            r#"
            UPDATE matches
            SET team1 = $3, team2 = $4, winner = $5, sets = $6, status = $7,
                court = $8, scheduled_at = $9, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(m.id)
        .bind(m.version)
        .bind(m.team1)
        .bind(m.team2)
        .bind(side_to_db(m.winner))
        .bind(serde_json::to_value(&m.sets)?)
        .bind(m.status.to_string())
        .bind(&m.court)
        .bind(m.scheduled_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut stored = m.clone();
                stored.version = row.get("version");
                Ok(stored)
            }
            None => {
                let exists = sqlx::query("SELECT 1 FROM matches WHERE id = $1")
                    .bind(m.id)
                    .fetch_optional(&self.pool)
                    .await?;
                match exists {
                    Some(_) => Err(DrawError::Conflict(m.id)),
                    None => Err(DrawError::MatchNotFound(m.id)),
                }
            }
        }
    }

    async fn delete_matches(&self, ids: &[MatchId]) -> DrawResult<()> {
        sqlx::query("DELETE FROM matches WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_standings(&self, bracket_id: BracketId) -> DrawResult<Vec<Standing>> {
        let rows = sqlx::query(
            r#"
            SELECT bracket_id, team_id, group_number, position, played, won, lost,
                   games_won, games_lost, points, furthest_round, eliminated
            FROM standings
            WHERE bracket_id = $1
            ORDER BY group_number IS NULL, group_number, position
            "#,
        )
        .bind(bracket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::standing_from_row).collect())
    }

    async fn replace_standings(
        &self,
        bracket_id: BracketId,
        phase: Phase,
        rows: &[Standing],
    ) -> DrawResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM standings WHERE bracket_id = $1 AND (group_number IS NULL) = $2")
            .bind(bracket_id)
            .bind(phase == Phase::Knockout)
            .execute(&mut *tx)
            .await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO standings (bracket_id, team_id, group_number, position, played, won,
                                       lost, games_won, games_lost, points, furthest_round,
                                       eliminated)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(row.bracket_id)
            .bind(row.team_id)
            .bind(row.group_number.map(|g| g as i32))
            .bind(row.position as i32)
            .bind(row.played as i32)
            .bind(row.won as i32)
            .bind(row.lost as i32)
            .bind(row.games_won as i32)
            .bind(row.games_lost as i32)
            .bind(row.points)
            .bind(row.furthest_round.map(|r| r as i32))
            .bind(row.eliminated)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
