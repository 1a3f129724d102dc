//! Ranking computation from finished matches.
//!
//! Both calculations are pure projections of the match list. Callers store
//! the result wholesale in place of the previous rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::models::Standing;
use crate::bracket::KnockoutPoints;
use crate::bracket::models::{BracketId, TeamId};
use crate::matches::{Match, Side};

/// Record one finished match for both participants
fn record_result(rows: &mut HashMap<TeamId, Standing>, m: &Match) {
    let Some(winner) = m.winner else {
        return;
    };

    for side in [Side::One, Side::Two] {
        let Some(team) = m.team(side) else {
            continue;
        };
        if let Some(row) = rows.get_mut(&team) {
            row.played += 1;
            row.games_won += m.games(side);
            row.games_lost += m.games(side.opposite());
            if side == winner {
                row.won += 1;
            } else {
                row.lost += 1;
            }
        }
    }
}

/// Tie-break shared by both rankings: game difference, then games won
fn compare_games(a: &Standing, b: &Standing) -> Ordering {
    b.game_difference()
        .cmp(&a.game_difference())
        .then(b.games_won.cmp(&a.games_won))
        .then(a.team_id.cmp(&b.team_id))
}

/// Knockout ranking.
///
/// Teams are ordered by the furthest round they reached: the champion
/// counts one round past the final, eliminated teams count the round they
/// lost in, teams still alive count the round they have been placed in.
/// Group-stage matches in `matches` are ignored.
pub fn knockout_standings(
    bracket_id: BracketId,
    matches: &[Match],
    points: &KnockoutPoints,
) -> Vec<Standing> {
    let knockout: Vec<&Match> = matches.iter().filter(|m| !m.is_group_match()).collect();
    let Some(total_rounds) = knockout.iter().map(|m| m.round).max() else {
        return Vec::new();
    };

    let mut rows: HashMap<TeamId, Standing> = HashMap::new();
    let mut reached: HashMap<TeamId, u32> = HashMap::new();

    for m in &knockout {
        for team in [m.team1, m.team2].into_iter().flatten() {
            rows.entry(team)
                .or_insert_with(|| Standing::new(bracket_id, team, None));
            let round = reached.entry(team).or_insert(m.round);
            *round = (*round).max(m.round);
        }
    }

    for m in knockout.iter().filter(|m| m.is_finished() && !m.is_bye) {
        record_result(&mut rows, m);
        if let Some(loser) = m.loser_team() {
            if let Some(row) = rows.get_mut(&loser) {
                row.eliminated = true;
            }
            reached.insert(loser, m.round);
        }
    }

    let champion = knockout
        .iter()
        .find(|m| m.round == total_rounds && m.next_match_id.is_none() && m.is_finished())
        .and_then(|m| m.winner_team());
    if let Some(champion) = champion {
        reached.insert(champion, total_rounds + 1);
    }

    let mut standings: Vec<Standing> = rows
        .into_values()
        .map(|mut row| {
            let round = reached.get(&row.team_id).copied().unwrap_or(1);
            row.furthest_round = Some(round);
            row.points = tier_points(round, total_rounds, points);
            row
        })
        .collect();

    standings.sort_by(|a, b| {
        b.furthest_round
            .cmp(&a.furthest_round)
            .then_with(|| compare_games(a, b))
    });

    for (i, row) in standings.iter_mut().enumerate() {
        row.position = i as u32 + 1;
    }
    standings
}

/// Points for the tier a team finished in
fn tier_points(round: u32, total_rounds: u32, points: &KnockoutPoints) -> i32 {
    if round > total_rounds {
        return points.winner;
    }
    match total_rounds - round {
        0 => points.finalist,
        1 => points.semi_finalist,
        2 => points.quarter_finalist,
        _ => points.base_points + points.per_round_bonus * (round as i32 - 1),
    }
}

/// Group ranking, one independent table per group.
///
/// Order: points, then the head-to-head result between two teams level on
/// points, then game difference, then games won. Rows come back grouped by
/// group number with positions restarting at 1 in every group.
pub fn group_standings(bracket_id: BracketId, matches: &[Match], win_points: i32) -> Vec<Standing> {
    let mut groups: BTreeMap<u32, Vec<&Match>> = BTreeMap::new();
    for m in matches {
        if let Some(group) = m.group_number {
            groups.entry(group).or_default().push(m);
        }
    }

    let mut standings = Vec::new();
    for (group, group_matches) in groups {
        standings.extend(rank_group(bracket_id, group, &group_matches, win_points));
    }
    standings
}

fn rank_group(
    bracket_id: BracketId,
    group: u32,
    matches: &[&Match],
    win_points: i32,
) -> Vec<Standing> {
    let mut rows: HashMap<TeamId, Standing> = HashMap::new();
    let mut head_to_head: HashMap<(TeamId, TeamId), TeamId> = HashMap::new();

    for m in matches {
        for team in [m.team1, m.team2].into_iter().flatten() {
            rows.entry(team)
                .or_insert_with(|| Standing::new(bracket_id, team, Some(group)));
        }
    }

    for m in matches.iter().filter(|m| m.is_finished()) {
        record_result(&mut rows, m);
        if let (Some(a), Some(b), Some(winner)) = (m.team1, m.team2, m.winner_team()) {
            head_to_head.insert(pair_key(a, b), winner);
        }
    }

    let mut ranked: Vec<Standing> = rows
        .into_values()
        .map(|mut row| {
            row.points = row.won as i32 * win_points;
            row
        })
        .collect();

    ranked.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| compare_games(a, b)));

    // Head-to-head is pairwise and may be cyclic, so it is applied with an
    // insertion sort inside each block of teams level on points.
    let compare = |a: &Standing, b: &Standing| match head_to_head.get(&pair_key(a.team_id, b.team_id)) {
        Some(&winner) if winner == a.team_id => Ordering::Less,
        Some(&winner) if winner == b.team_id => Ordering::Greater,
        _ => compare_games(a, b),
    };

    let mut start = 0;
    while start < ranked.len() {
        let mut end = start + 1;
        while end < ranked.len() && ranked[end].points == ranked[start].points {
            end += 1;
        }
        insertion_sort(&mut ranked[start..end], &compare);
        start = end;
    }

    for (i, row) in ranked.iter_mut().enumerate() {
        row.position = i as u32 + 1;
    }
    ranked
}

fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b { (a, b) } else { (b, a) }
}

fn insertion_sort<F>(rows: &mut [Standing], compare: &F)
where
    F: Fn(&Standing, &Standing) -> Ordering,
{
    for i in 1..rows.len() {
        let mut j = i;
        while j > 0 && compare(&rows[j - 1], &rows[j]) == Ordering::Greater {
            rows.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::SeedingMethod;
    use crate::bracket::generator;
    use crate::matches::{MatchStatus, SetScore};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    fn group_match(bracket_id: BracketId, a: TeamId, b: TeamId, sets: &[(u8, u8)]) -> Match {
        let mut m = Match::new(bracket_id, 1, "Group A", 0);
        m.group_number = Some(1);
        m.team1 = Some(a);
        m.team2 = Some(b);
        m.sets = sets.iter().map(|&(x, y)| SetScore::new(x, y)).collect();
        let won = m.sets.iter().filter(|s| s.team1 > s.team2).count();
        m.winner = Some(if won * 2 > m.sets.len() { Side::One } else { Side::Two });
        m.status = MatchStatus::Completed;
        m
    }

    fn finish(m: &mut Match, winner: Side, sets: &[(u8, u8)]) {
        m.sets = sets.iter().map(|&(x, y)| SetScore::new(x, y)).collect();
        m.winner = Some(winner);
        m.status = MatchStatus::Completed;
    }

    #[test]
    fn test_head_to_head_beats_game_difference() {
        let bracket_id = Uuid::new_v4();
        let [a, b, c, d, e] = [(); 5].map(|_| Uuid::new_v4());
        let matches = vec![
            group_match(bracket_id, a, b, &[(6, 4), (6, 4)]),
            group_match(bracket_id, a, d, &[(6, 4), (6, 4)]),
            group_match(bracket_id, a, e, &[(6, 4), (6, 4)]),
            group_match(bracket_id, a, c, &[(0, 6), (0, 6)]),
            group_match(bracket_id, b, c, &[(6, 0), (6, 0)]),
            group_match(bracket_id, b, d, &[(6, 0), (6, 0)]),
            group_match(bracket_id, b, e, &[(6, 0), (6, 0)]),
            group_match(bracket_id, c, d, &[(0, 6), (0, 6)]),
            group_match(bracket_id, c, e, &[(0, 6), (0, 6)]),
            group_match(bracket_id, d, e, &[(6, 3), (6, 3)]),
        ];

        let standings = group_standings(bracket_id, &matches, 3);
        assert_eq!(standings.len(), 5);

        let row_a = &standings[0];
        let row_b = &standings[1];
        assert_eq!(row_a.team_id, a);
        assert_eq!(row_b.team_id, b);
        assert_eq!(row_a.points, 9);
        assert_eq!(row_b.points, 9);
        assert!(row_b.game_difference() > row_a.game_difference());
        assert_eq!(standings[2].team_id, d);
        assert_eq!(standings[2].points, 6);
    }

    #[test]
    fn test_game_difference_then_games_won() {
        let bracket_id = Uuid::new_v4();
        let [a, b, c] = [(); 3].map(|_| Uuid::new_v4());
        // Every team wins once: a > b, b > c, c > a.
        let matches = vec![
            group_match(bracket_id, a, b, &[(6, 0), (6, 0)]),
            group_match(bracket_id, b, c, &[(6, 4), (6, 4)]),
            group_match(bracket_id, c, a, &[(7, 5), (7, 5)]),
        ];

        let standings = group_standings(bracket_id, &matches, 3);
        assert!(standings.iter().all(|s| s.points == 3));
        // Cyclic head-to-head must still produce a full ranking.
        let positions: Vec<u32> = standings.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_custom_win_points_and_unplayed_matches() {
        let bracket_id = Uuid::new_v4();
        let [a, b, c] = [(); 3].map(|_| Uuid::new_v4());
        let mut pending = group_match(bracket_id, b, c, &[]);
        pending.status = MatchStatus::Pending;
        pending.winner = None;
        let matches = vec![group_match(bracket_id, a, b, &[(6, 2), (6, 2)]), pending];

        let standings = group_standings(bracket_id, &matches, 2);
        assert_eq!(standings[0].team_id, a);
        assert_eq!(standings[0].points, 2);
        let row_c = standings.iter().find(|s| s.team_id == c).unwrap();
        assert_eq!(row_c.played, 0);
        assert_eq!(row_c.group_number, Some(1));
    }

    #[test]
    fn test_groups_are_ranked_independently() {
        let bracket_id = Uuid::new_v4();
        let [a, b, c, d] = [(); 4].map(|_| Uuid::new_v4());
        let mut second = group_match(bracket_id, c, d, &[(2, 6), (2, 6)]);
        second.group_number = Some(2);
        let matches = vec![group_match(bracket_id, a, b, &[(6, 2), (6, 2)]), second];

        let standings = group_standings(bracket_id, &matches, 3);
        let group_two: Vec<&Standing> = standings
            .iter()
            .filter(|s| s.group_number == Some(2))
            .collect();
        assert_eq!(group_two[0].team_id, d);
        assert_eq!(group_two[0].position, 1);
        assert_eq!(group_two[1].position, 2);
    }

    #[test]
    fn test_knockout_ranking_by_elimination_round() {
        let bracket_id = Uuid::new_v4();
        let teams: Vec<TeamId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let mut matches = generator::generate(bracket_id, &teams, SeedingMethod::Manual, &mut rng)
            .unwrap()
            .matches;

        // Semis are 1v4 and 2v3: 1 beats 4 narrowly, 3 beats 2 easily.
        finish(&mut matches[0], Side::One, &[(7, 6), (7, 6)]);
        finish(&mut matches[1], Side::Two, &[(0, 6), (0, 6)]);
        matches[2].team1 = Some(teams[0]);
        matches[2].team2 = Some(teams[2]);
        finish(&mut matches[2], Side::Two, &[(4, 6), (4, 6)]);

        let points = KnockoutPoints::default();
        let standings = knockout_standings(bracket_id, &matches, &points);

        assert_eq!(standings[0].team_id, teams[2]);
        assert_eq!(standings[0].points, points.winner);
        assert_eq!(standings[0].furthest_round, Some(3));
        assert!(!standings[0].eliminated);
        assert_eq!(standings[1].team_id, teams[0]);
        assert_eq!(standings[1].points, points.finalist);
        // Both semifinal losers: seed 4 lost 6-7 6-7, seed 2 lost 0-6 0-6.
        assert_eq!(standings[2].team_id, teams[3]);
        assert_eq!(standings[3].team_id, teams[1]);
        assert_eq!(standings[3].points, points.semi_finalist);
        assert!(standings[3].eliminated);
    }

    #[test]
    fn test_knockout_byes_do_not_count_as_played() {
        let bracket_id = Uuid::new_v4();
        let teams: Vec<TeamId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let matches = generator::generate(bracket_id, &teams, SeedingMethod::Manual, &mut rng)
            .unwrap()
            .matches;

        let standings = knockout_standings(bracket_id, &matches, &KnockoutPoints::default());
        let top_seed = standings.iter().find(|s| s.team_id == teams[0]).unwrap();
        assert_eq!(top_seed.played, 0);
        assert_eq!(top_seed.furthest_round, Some(2));
        assert_eq!(standings[0].team_id, teams[0]);
    }

    #[test]
    fn test_tier_points_for_early_rounds() {
        let points = KnockoutPoints::default();
        // Five rounds: round 1 and 2 exits fall outside the named tiers.
        assert_eq!(tier_points(1, 5, &points), 10);
        assert_eq!(tier_points(2, 5, &points), 15);
        assert_eq!(tier_points(3, 5, &points), points.quarter_finalist);
        assert_eq!(tier_points(6, 5, &points), points.winner);
    }
}
