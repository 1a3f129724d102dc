//! Group stage management: assignment, swaps and the knockout hand-off.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::round_robin::group_matches;
use crate::bracket::generator;
use crate::bracket::manager::{SharedRng, lock_rng};
use crate::bracket::models::{
    Bracket, BracketFormat, BracketId, GeneratedBracket, MatchId, Phase, SeedingMethod, TeamId,
};
use crate::db::BracketRepository;
use crate::errors::{DrawError, DrawResult};
use crate::matches::Match;
use crate::standings::{Standing, group_standings};

/// Teams placed in one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignment {
    pub group_number: u32,
    pub team_ids: Vec<TeamId>,
}

/// Check group numbers, sizes and team uniqueness
pub fn validate_assignment(groups: &[GroupAssignment]) -> DrawResult<()> {
    if groups.is_empty() {
        return Err(DrawError::validation("At least one group is required"));
    }

    let mut numbers = std::collections::HashSet::new();
    let mut teams = std::collections::HashSet::new();
    for group in groups {
        if group.group_number == 0 {
            return Err(DrawError::validation("Group numbers start at 1"));
        }
        if !numbers.insert(group.group_number) {
            return Err(DrawError::validation(format!(
                "Group {} is listed twice",
                group.group_number
            )));
        }
        if group.team_ids.len() < 2 {
            return Err(DrawError::validation(format!(
                "Group {} needs at least 2 teams",
                group.group_number
            )));
        }
        for team in &group.team_ids {
            if !teams.insert(*team) {
                return Err(DrawError::validation(format!(
                    "Team {team} appears in more than one group"
                )));
            }
        }
    }
    Ok(())
}

/// Group membership as recorded by the stored group matches
pub fn current_groups(matches: &[Match]) -> BTreeMap<u32, Vec<TeamId>> {
    let mut groups: BTreeMap<u32, Vec<TeamId>> = BTreeMap::new();
    for m in matches {
        let Some(group) = m.group_number else {
            continue;
        };
        let members = groups.entry(group).or_default();
        for team in [m.team1, m.team2].into_iter().flatten() {
            if !members.contains(&team) {
                members.push(team);
            }
        }
    }
    groups
}

/// Knockout seed order from group standings.
///
/// Withdrawn teams are skipped. The remaining finishers are ordered by
/// finishing position, then by group number, so every group winner is
/// seeded ahead of every runner-up.
pub fn qualifiers(standings: &[Standing], top_per_group: u32, withdrawn: &[TeamId]) -> Vec<TeamId> {
    let mut by_group: BTreeMap<u32, Vec<&Standing>> = BTreeMap::new();
    for row in standings {
        if let Some(group) = row.group_number {
            by_group.entry(group).or_default().push(row);
        }
    }

    let mut seeded: Vec<(usize, u32, TeamId)> = Vec::new();
    for (group, mut rows) in by_group {
        rows.sort_by_key(|s| s.position);
        seeded.extend(
            rows.into_iter()
                .filter(|s| !withdrawn.contains(&s.team_id))
                .take(top_per_group as usize)
                .enumerate()
                .map(|(rank, s)| (rank, group, s.team_id)),
        );
    }

    seeded.sort_by_key(|&(rank, group, _)| (rank, group));
    seeded.into_iter().map(|(_, _, team)| team).collect()
}

/// Group stage operations over a bracket
#[derive(Clone)]
pub struct GroupStageManager {
    repo: Arc<dyn BracketRepository>,
    rng: SharedRng,
}

impl GroupStageManager {
    pub fn new(repo: Arc<dyn BracketRepository>, rng: SharedRng) -> Self {
        Self { repo, rng }
    }

    async fn load_bracket(&self, bracket_id: BracketId) -> DrawResult<Bracket> {
        self.repo
            .get_bracket(bracket_id)
            .await?
            .ok_or(DrawError::BracketNotFound(bracket_id))
    }

    /// Replace the group stage with a fresh round robin per group.
    ///
    /// # Errors
    ///
    /// * `DrawError::Validation` - Malformed assignment
    /// * `DrawError::State` - Wrong format, published, results recorded, or a
    ///   knockout phase exists
    pub async fn assign_groups(
        &self,
        bracket_id: BracketId,
        groups: &[GroupAssignment],
    ) -> DrawResult<Vec<Match>> {
        let bracket = self.load_bracket(bracket_id).await?;
        ensure_group_format(&bracket)?;
        ensure_unlocked(&bracket)?;
        if bracket.format == BracketFormat::RoundRobin && groups.len() != 1 {
            return Err(DrawError::validation(
                "Round-robin brackets have exactly one group",
            ));
        }
        validate_assignment(groups)?;

        let existing = self.repo.list_matches(bracket_id).await?;
        if existing.iter().any(|m| !m.is_group_match()) {
            return Err(DrawError::state(
                "Delete the knockout phase before reassigning groups",
            ));
        }
        if existing.iter().any(|m| m.is_finished()) {
            return Err(DrawError::state(
                "Groups cannot be reassigned after results were recorded",
            ));
        }

        let old: Vec<MatchId> = existing.iter().map(|m| m.id).collect();
        let matches: Vec<Match> = groups
            .iter()
            .flat_map(|g| group_matches(bracket_id, g.group_number, &g.team_ids))
            .collect();

        self.repo.delete_matches(&old).await?;
        self.repo.insert_matches(&matches).await?;
        self.repo
            .replace_standings(bracket_id, Phase::Groups, &[])
            .await?;

        log::info!(
            "Assigned {} groups with {} matches to bracket {}",
            groups.len(),
            matches.len(),
            bracket_id
        );
        Ok(matches)
    }

    /// Exchange two teams between their groups.
    ///
    /// Only the two affected groups are regenerated, which discards their
    /// matches; the swap is therefore refused once either group has a result.
    pub async fn swap_teams(
        &self,
        bracket_id: BracketId,
        team_a: TeamId,
        team_b: TeamId,
    ) -> DrawResult<Vec<Match>> {
        let bracket = self.load_bracket(bracket_id).await?;
        ensure_group_format(&bracket)?;
        ensure_unlocked(&bracket)?;
        if team_a == team_b {
            return Err(DrawError::validation("Cannot swap a team with itself"));
        }

        let matches = self.repo.list_matches(bracket_id).await?;
        if matches.iter().any(|m| !m.is_group_match()) {
            return Err(DrawError::state("Knockout phase already generated"));
        }

        let mut groups = current_groups(&matches);
        let group_of = |team: TeamId| {
            groups
                .iter()
                .find(|(_, members)| members.contains(&team))
                .map(|(&g, _)| g)
        };
        let group_a = group_of(team_a).ok_or(DrawError::TeamNotFound(team_a))?;
        let group_b = group_of(team_b).ok_or(DrawError::TeamNotFound(team_b))?;
        if group_a == group_b {
            return Err(DrawError::validation(format!(
                "Both teams are already in group {group_a}"
            )));
        }

        for team in [team_a, team_b] {
            if matches.iter().any(|m| m.is_finished() && m.has_team(team)) {
                return Err(DrawError::state(format!(
                    "Team {team} already has a recorded result"
                )));
            }
        }
        let affected = |m: &&Match| matches!(m.group_number, Some(g) if g == group_a || g == group_b);
        if matches.iter().filter(affected).any(|m| m.is_finished()) {
            return Err(DrawError::state(format!(
                "Groups {group_a} and {group_b} must have no results to be regenerated"
            )));
        }

        for (group, from, to) in [(group_a, team_a, team_b), (group_b, team_b, team_a)] {
            if let Some(members) = groups.get_mut(&group) {
                for member in members.iter_mut().filter(|m| **m == from) {
                    *member = to;
                }
            }
        }

        let old: Vec<MatchId> = matches.iter().filter(affected).map(|m| m.id).collect();
        let mut regenerated = Vec::new();
        for group in [group_a, group_b] {
            if let Some(members) = groups.get(&group) {
                regenerated.extend(group_matches(bracket_id, group, members));
            }
        }

        self.repo.delete_matches(&old).await?;
        self.repo.insert_matches(&regenerated).await?;
        self.repo
            .replace_standings(bracket_id, Phase::Groups, &[])
            .await?;

        log::info!(
            "Swapped {} (group {}) and {} (group {}) in bracket {}",
            team_a,
            group_a,
            team_b,
            group_b,
            bracket_id
        );
        Ok(regenerated)
    }

    /// Build the knockout phase from final group standings.
    ///
    /// # Errors
    ///
    /// * `DrawError::State` - Group play unfinished, groups missing, or a
    ///   knockout phase already exists
    pub async fn generate_knockout(&self, bracket_id: BracketId) -> DrawResult<GeneratedBracket> {
        let bracket = self.load_bracket(bracket_id).await?;
        if bracket.format != BracketFormat::GroupsKnockout {
            return Err(DrawError::state(format!(
                "Bracket format {} has no knockout phase",
                bracket.format
            )));
        }
        ensure_unlocked(&bracket)?;

        let matches = self.repo.list_matches(bracket_id).await?;
        let (group, knockout): (Vec<&Match>, Vec<&Match>) =
            matches.iter().partition(|m| m.is_group_match());
        if group.is_empty() {
            return Err(DrawError::state("Groups have not been assigned"));
        }
        if !knockout.is_empty() {
            return Err(DrawError::state("Knockout phase already exists"));
        }
        let unfinished = group.iter().filter(|m| !m.is_finished()).count();
        if unfinished > 0 {
            return Err(DrawError::state(format!(
                "{unfinished} group matches are not finished"
            )));
        }

        let standings = group_standings(bracket_id, &matches, bracket.config.group_win_points);
        let seeds = qualifiers(
            &standings,
            bracket.config.top_per_group,
            &bracket.withdrawn_teams,
        );
        if seeds.len() < 2 {
            return Err(DrawError::state(format!(
                "A knockout phase needs at least 2 qualifiers, groups produced {}",
                seeds.len()
            )));
        }

        self.repo
            .replace_standings(bracket_id, Phase::Groups, &standings)
            .await?;
        let generated = {
            let mut rng = lock_rng(&self.rng);
            generator::generate(bracket_id, &seeds, SeedingMethod::Ranking, &mut *rng)?
        };
        self.repo.insert_matches(&generated.matches).await?;

        log::info!(
            "Generated knockout phase for bracket {} from {} qualifiers",
            bracket_id,
            seeds.len()
        );
        Ok(generated)
    }

    /// Remove knockout matches and knockout standings; group data stays.
    ///
    /// Returns the number of matches removed.
    pub async fn delete_knockout(&self, bracket_id: BracketId) -> DrawResult<usize> {
        let bracket = self.load_bracket(bracket_id).await?;
        if bracket.format != BracketFormat::GroupsKnockout {
            return Err(DrawError::state(format!(
                "Bracket format {} has no separate knockout phase",
                bracket.format
            )));
        }
        ensure_unlocked(&bracket)?;

        let knockout: Vec<MatchId> = self
            .repo
            .list_matches(bracket_id)
            .await?
            .into_iter()
            .filter(|m| !m.is_group_match())
            .map(|m| m.id)
            .collect();
        if knockout.is_empty() {
            return Err(DrawError::state("No knockout phase to delete"));
        }

        self.repo.delete_matches(&knockout).await?;
        self.repo
            .replace_standings(bracket_id, Phase::Knockout, &[])
            .await?;

        log::info!(
            "Deleted knockout phase of bracket {} ({} matches)",
            bracket_id,
            knockout.len()
        );
        Ok(knockout.len())
    }
}

fn ensure_group_format(bracket: &Bracket) -> DrawResult<()> {
    if !bracket.format.has_groups() {
        return Err(DrawError::state(format!(
            "Bracket format {} has no group stage",
            bracket.format
        )));
    }
    Ok(())
}

pub(crate) fn ensure_unlocked(bracket: &Bracket) -> DrawResult<()> {
    if bracket.status.is_structure_locked() {
        return Err(DrawError::state(format!(
            "Bracket {} is published; unpublish it to change its structure",
            bracket.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BracketConfig;
    use crate::db::InMemoryRepository;
    use crate::matches::{ProgressionEngine, SetScore};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct Fixture {
        groups: GroupStageManager,
        engine: ProgressionEngine,
        repo: Arc<InMemoryRepository>,
        bracket: Bracket,
    }

    async fn fixture(format: BracketFormat) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let bracket = Bracket::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            format,
            SeedingMethod::Manual,
            BracketConfig::default(),
        );
        repo.upsert_bracket(&bracket).await.unwrap();
        let rng = Arc::new(Mutex::new(StdRng::seed_from_u64(3)));

        Fixture {
            groups: GroupStageManager::new(repo.clone(), rng),
            engine: ProgressionEngine::new(repo.clone()),
            repo,
            bracket,
        }
    }

    fn assignment(group_number: u32, team_ids: &[TeamId]) -> GroupAssignment {
        GroupAssignment {
            group_number,
            team_ids: team_ids.to_vec(),
        }
    }

    fn teams(n: usize) -> Vec<TeamId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    /// Finish every group match; the team listed earlier in `order` wins.
    async fn play_groups(f: &Fixture, order: &[TeamId]) {
        let rank = |t: Option<TeamId>| order.iter().position(|&x| Some(x) == t);
        for m in f.repo.list_matches(f.bracket.id).await.unwrap() {
            let sets = if rank(m.team1) < rank(m.team2) {
                [SetScore::new(6, 2), SetScore::new(6, 2)]
            } else {
                [SetScore::new(2, 6), SetScore::new(2, 6)]
            };
            f.engine.submit_score(m.id, &sets).await.unwrap();
        }
    }

    #[test]
    fn test_assignment_validation() {
        let t = teams(4);
        assert!(validate_assignment(&[]).is_err());
        assert!(validate_assignment(&[assignment(1, &t[..1])]).is_err());
        assert!(validate_assignment(&[assignment(1, &t[..2]), assignment(1, &t[2..])]).is_err());
        assert!(validate_assignment(&[assignment(1, &t[..3]), assignment(2, &t[2..])]).is_err());
        assert!(validate_assignment(&[assignment(0, &t)]).is_err());
        assert!(validate_assignment(&[assignment(1, &t[..2]), assignment(2, &t[2..])]).is_ok());
    }

    #[test]
    fn test_qualifier_order() {
        let bracket_id = Uuid::new_v4();
        let t = teams(6);
        let row = |team, group, position| {
            let mut s = Standing::new(bracket_id, team, Some(group));
            s.position = position;
            s
        };
        let standings = vec![
            row(t[0], 2, 1),
            row(t[1], 2, 2),
            row(t[2], 2, 3),
            row(t[3], 1, 2),
            row(t[4], 1, 1),
            row(t[5], 1, 3),
        ];

        assert_eq!(qualifiers(&standings, 2, &[]), vec![t[4], t[0], t[3], t[1]]);
        // Withdrawn group winner makes room for the third-placed team.
        assert_eq!(qualifiers(&standings, 2, &[t[4]]), vec![t[3], t[0], t[5], t[1]]);
    }

    #[tokio::test]
    async fn test_assign_groups_generates_round_robin() {
        let f = fixture(BracketFormat::GroupsKnockout).await;
        let t = teams(7);
        let matches = f
            .groups
            .assign_groups(f.bracket.id, &[assignment(1, &t[..4]), assignment(2, &t[4..])])
            .await
            .unwrap();

        assert_eq!(matches.len(), 6 + 3);
        assert!(matches.iter().all(|m| m.next_match_id.is_none()));
    }

    #[tokio::test]
    async fn test_groups_rejected_for_knockout_format() {
        let f = fixture(BracketFormat::Knockout).await;
        let t = teams(4);
        let err = f
            .groups
            .assign_groups(f.bracket.id, &[assignment(1, &t)])
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::State(_)));
    }

    #[tokio::test]
    async fn test_swap_regenerates_both_groups() {
        let f = fixture(BracketFormat::GroupsKnockout).await;
        let t = teams(6);
        f.groups
            .assign_groups(f.bracket.id, &[assignment(1, &t[..3]), assignment(2, &t[3..])])
            .await
            .unwrap();

        f.groups.swap_teams(f.bracket.id, t[0], t[5]).await.unwrap();

        let matches = f.repo.list_matches(f.bracket.id).await.unwrap();
        let groups = current_groups(&matches);
        assert!(groups[&1].contains(&t[5]) && !groups[&1].contains(&t[0]));
        assert!(groups[&2].contains(&t[0]) && !groups[&2].contains(&t[5]));
        assert_eq!(matches.len(), 6);
    }

    #[tokio::test]
    async fn test_swap_refused_after_result() {
        let f = fixture(BracketFormat::GroupsKnockout).await;
        let t = teams(6);
        let matches = f
            .groups
            .assign_groups(f.bracket.id, &[assignment(1, &t[..3]), assignment(2, &t[3..])])
            .await
            .unwrap();
        let played = matches.iter().find(|m| m.has_team(t[0])).unwrap();
        f.engine
            .submit_score(played.id, &[SetScore::new(6, 0), SetScore::new(6, 0)])
            .await
            .unwrap();

        let err = f.groups.swap_teams(f.bracket.id, t[0], t[5]).await.unwrap_err();
        assert!(matches!(err, DrawError::State(_)));
    }

    #[tokio::test]
    async fn test_knockout_requires_finished_groups() {
        let f = fixture(BracketFormat::GroupsKnockout).await;
        let t = teams(8);
        f.groups
            .assign_groups(f.bracket.id, &[assignment(1, &t[..4]), assignment(2, &t[4..])])
            .await
            .unwrap();

        let err = f.groups.generate_knockout(f.bracket.id).await.unwrap_err();
        assert!(matches!(err, DrawError::State(_)));

        play_groups(&f, &t).await;
        let generated = f.groups.generate_knockout(f.bracket.id).await.unwrap();

        // Winners t0 and t4 are seeds 1 and 2, runners-up t1 and t5 seeds 3 and 4.
        let semis: Vec<(Option<TeamId>, Option<TeamId>)> = generated
            .matches
            .iter()
            .filter(|m| m.round == 1)
            .map(|m| (m.team1, m.team2))
            .collect();
        assert_eq!(semis, vec![(Some(t[0]), Some(t[5])), (Some(t[4]), Some(t[1]))]);

        let err = f.groups.generate_knockout(f.bracket.id).await.unwrap_err();
        assert!(matches!(err, DrawError::State(_)));
    }

    #[tokio::test]
    async fn test_knockout_needs_two_qualifiers() {
        let mut f = fixture(BracketFormat::GroupsKnockout).await;
        f.bracket.config.top_per_group = 1;
        f.repo.upsert_bracket(&f.bracket).await.unwrap();

        let t = teams(2);
        f.groups
            .assign_groups(f.bracket.id, &[assignment(1, &t)])
            .await
            .unwrap();
        play_groups(&f, &t).await;

        for _ in 0..2 {
            let err = f.groups.generate_knockout(f.bracket.id).await.unwrap_err();
            assert!(matches!(err, DrawError::State(_)));
        }

        // Nothing was written by the refused attempts.
        let matches = f.repo.list_matches(f.bracket.id).await.unwrap();
        assert!(matches.iter().all(|m| m.is_group_match()));
        assert!(f.repo.list_standings(f.bracket.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_knockout_keeps_groups() {
        let f = fixture(BracketFormat::GroupsKnockout).await;
        let t = teams(4);
        f.groups
            .assign_groups(f.bracket.id, &[assignment(1, &t[..2]), assignment(2, &t[2..])])
            .await
            .unwrap();

        let err = f.groups.delete_knockout(f.bracket.id).await.unwrap_err();
        assert!(matches!(err, DrawError::State(_)));

        play_groups(&f, &t).await;
        f.groups.generate_knockout(f.bracket.id).await.unwrap();
        assert_eq!(f.groups.delete_knockout(f.bracket.id).await.unwrap(), 3);

        let remaining = f.repo.list_matches(f.bracket.id).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|m| m.is_group_match()));
        let standings = f.repo.list_standings(f.bracket.id).await.unwrap();
        assert_eq!(standings.len(), 4);
    }
}
