//! Round-robin scheduling with the circle method.

use crate::bracket::models::{BracketId, TeamId};
use crate::matches::Match;

/// Pairings per round for `teams`.
///
/// The first team stays fixed while the others rotate. An odd team count
/// gets a phantom entry, and whoever meets it sits the round out. Every pair
/// meets exactly once and nobody plays twice in a round.
pub fn circle_rounds(teams: &[TeamId]) -> Vec<Vec<(TeamId, TeamId)>> {
    if teams.len() < 2 {
        return Vec::new();
    }

    let mut ring: Vec<Option<TeamId>> = teams.iter().copied().map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();

    let mut rounds = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        let pairs = (0..n / 2)
            .filter_map(|i| match (ring[i], ring[n - 1 - i]) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            })
            .collect();
        rounds.push(pairs);

        // Keep position 0, rotate the rest one step clockwise.
        ring[1..].rotate_right(1);
    }
    rounds
}

/// Matches for one group, tagged with its number and never linked to a
/// successor.
pub fn group_matches(bracket_id: BracketId, group_number: u32, teams: &[TeamId]) -> Vec<Match> {
    let mut matches = Vec::new();
    for (i, pairs) in circle_rounds(teams).into_iter().enumerate() {
        let round = i as u32 + 1;
        let name = format!("Group {group_number} - Round {round}");
        for (slot, (team1, team2)) in pairs.into_iter().enumerate() {
            let mut m = Match::new(bracket_id, round, name.clone(), slot as u32);
            m.group_number = Some(group_number);
            m.team1 = Some(team1);
            m.team2 = Some(team2);
            matches.push(m);
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn teams(n: usize) -> Vec<TeamId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn assert_complete_round_robin(teams: &[TeamId]) {
        let rounds = circle_rounds(teams);
        let mut seen = HashSet::new();

        for pairs in &rounds {
            let mut in_round = HashSet::new();
            for &(a, b) in pairs {
                assert!(in_round.insert(a), "team plays twice in a round");
                assert!(in_round.insert(b), "team plays twice in a round");
                let key = if a < b { (a, b) } else { (b, a) };
                assert!(seen.insert(key), "pair meets twice");
            }
        }

        let n = teams.len();
        assert_eq!(seen.len(), n * (n - 1) / 2);
    }

    #[test]
    fn test_even_group() {
        let teams = teams(4);
        assert_eq!(circle_rounds(&teams).len(), 3);
        assert_complete_round_robin(&teams);
    }

    #[test]
    fn test_odd_group_sits_one_out() {
        let teams = teams(5);
        let rounds = circle_rounds(&teams);
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|r| r.len() == 2));
        assert_complete_round_robin(&teams);
    }

    #[test]
    fn test_group_matches_are_tagged() {
        let bracket_id = Uuid::new_v4();
        let matches = group_matches(bracket_id, 2, &teams(3));
        assert_eq!(matches.len(), 3);
        for m in &matches {
            assert_eq!(m.group_number, Some(2));
            assert!(m.next_match_id.is_none());
            assert!(m.is_ready());
            assert!(m.round_name.starts_with("Group 2"));
        }
    }

    #[test]
    fn test_single_team_has_no_matches() {
        assert!(circle_rounds(&teams(1)).is_empty());
    }
}
