//! In-process repository used by tests and the server's `--memory` mode.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::repository::BracketRepository;
use crate::bracket::models::{Bracket, BracketId, CategoryId, MatchId, Phase, TournamentId};
use crate::errors::{DrawError, DrawResult};
use crate::matches::Match;
use crate::standings::Standing;

/// Repository keeping everything in memory behind async locks
#[derive(Default)]
pub struct InMemoryRepository {
    brackets: RwLock<HashMap<BracketId, Bracket>>,
    matches: RwLock<HashMap<MatchId, Match>>,
    standings: RwLock<Vec<Standing>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BracketRepository for InMemoryRepository {
    async fn get_bracket(&self, id: BracketId) -> DrawResult<Option<Bracket>> {
        Ok(self.brackets.read().await.get(&id).cloned())
    }

    async fn find_bracket(
        &self,
        tournament_id: TournamentId,
        category_id: CategoryId,
    ) -> DrawResult<Option<Bracket>> {
        Ok(self
            .brackets
            .read()
            .await
            .values()
            .find(|b| b.tournament_id == tournament_id && b.category_id == category_id)
            .cloned())
    }

    async fn list_brackets(&self, tournament_id: TournamentId) -> DrawResult<Vec<Bracket>> {
        let mut brackets: Vec<Bracket> = self
            .brackets
            .read()
            .await
            .values()
            .filter(|b| b.tournament_id == tournament_id)
            .cloned()
            .collect();
        brackets.sort_by_key(|b| b.created_at);
        Ok(brackets)
    }

    async fn upsert_bracket(&self, bracket: &Bracket) -> DrawResult<()> {
        self.brackets
            .write()
            .await
            .insert(bracket.id, bracket.clone());
        Ok(())
    }

    async fn delete_bracket(&self, id: BracketId) -> DrawResult<()> {
        self.brackets.write().await.remove(&id);
        self.matches.write().await.retain(|_, m| m.bracket_id != id);
        self.standings.write().await.retain(|s| s.bracket_id != id);
        Ok(())
    }

    async fn get_match(&self, id: MatchId) -> DrawResult<Option<Match>> {
        Ok(self.matches.read().await.get(&id).cloned())
    }

    async fn list_matches(&self, bracket_id: BracketId) -> DrawResult<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .matches
            .read()
            .await
            .values()
            .filter(|m| m.bracket_id == bracket_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.group_number.is_none(), m.group_number, m.round, m.slot));
        Ok(matches)
    }

    async fn insert_matches(&self, matches: &[Match]) -> DrawResult<()> {
        let mut stored = self.matches.write().await;
        for m in matches {
            stored.insert(m.id, m.clone());
        }
        Ok(())
    }

    async fn update_match(&self, m: &Match) -> DrawResult<Match> {
        let mut stored = self.matches.write().await;
        let current = stored.get_mut(&m.id).ok_or(DrawError::MatchNotFound(m.id))?;

        if current.version != m.version {
            return Err(DrawError::Conflict(m.id));
        }

        let mut updated = m.clone();
        updated.version += 1;
        *current = updated.clone();
        Ok(updated)
    }

    async fn delete_matches(&self, ids: &[MatchId]) -> DrawResult<()> {
        let mut stored = self.matches.write().await;
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn list_standings(&self, bracket_id: BracketId) -> DrawResult<Vec<Standing>> {
        let mut rows: Vec<Standing> = self
            .standings
            .read()
            .await
            .iter()
            .filter(|s| s.bracket_id == bracket_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.group_number.is_none(), s.group_number, s.position));
        Ok(rows)
    }

    async fn replace_standings(
        &self,
        bracket_id: BracketId,
        phase: Phase,
        rows: &[Standing],
    ) -> DrawResult<()> {
        let mut stored = self.standings.write().await;
        stored.retain(|s| !(s.bracket_id == bracket_id && s.phase() == phase));
        stored.extend_from_slice(rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BracketConfig;
    use crate::bracket::models::{BracketFormat, SeedingMethod};
    use uuid::Uuid;

    fn bracket() -> Bracket {
        Bracket::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BracketFormat::Knockout,
            SeedingMethod::Manual,
            BracketConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_stale_match_write_conflicts() {
        let repo = InMemoryRepository::new();
        let b = bracket();
        let m = Match::new(b.id, 1, "Final", 0);
        repo.insert_matches(std::slice::from_ref(&m)).await.unwrap();

        let first = repo.update_match(&m).await.unwrap();
        assert_eq!(first.version, m.version + 1);

        // Second write still carries the old version.
        let err = repo.update_match(&m).await.unwrap_err();
        assert!(matches!(err, DrawError::Conflict(id) if id == m.id));

        repo.update_match(&first).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_match() {
        let repo = InMemoryRepository::new();
        let m = Match::new(Uuid::new_v4(), 1, "Final", 0);
        let err = repo.update_match(&m).await.unwrap_err();
        assert!(matches!(err, DrawError::MatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_standings_touches_one_phase() {
        let repo = InMemoryRepository::new();
        let b = bracket();
        let group_row = Standing::new(b.id, Uuid::new_v4(), Some(1));
        let knockout_row = Standing::new(b.id, Uuid::new_v4(), None);

        repo.replace_standings(b.id, Phase::Groups, std::slice::from_ref(&group_row))
            .await
            .unwrap();
        repo.replace_standings(b.id, Phase::Knockout, std::slice::from_ref(&knockout_row))
            .await
            .unwrap();
        repo.replace_standings(b.id, Phase::Knockout, &[]).await.unwrap();

        let rows = repo.list_standings(b.id).await.unwrap();
        assert_eq!(rows, vec![group_row]);
    }

    #[tokio::test]
    async fn test_delete_bracket_cascades() {
        let repo = InMemoryRepository::new();
        let b = bracket();
        repo.upsert_bracket(&b).await.unwrap();
        repo.insert_matches(&[Match::new(b.id, 1, "Final", 0)])
            .await
            .unwrap();

        repo.delete_bracket(b.id).await.unwrap();

        assert!(repo.get_bracket(b.id).await.unwrap().is_none());
        assert!(repo.list_matches(b.id).await.unwrap().is_empty());
    }
}
