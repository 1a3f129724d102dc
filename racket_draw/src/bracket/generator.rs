//! Single-elimination bracket generation.
//!
//! Seeds are padded to the next power of two with byes and placed so the top
//! seeds can only meet as late as possible. For eight teams the first round
//! reads `1v8, 4v5, 3v6, 2v7`.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::models::{BracketId, GeneratedBracket, RoundInfo, SeedingMethod, TeamId};
use crate::errors::{DrawError, DrawResult};
use crate::matches::{Match, MatchStatus, Side};

/// Human name of a knockout round
pub fn round_name(round: u32, total_rounds: u32) -> String {
    match total_rounds.saturating_sub(round) {
        0 => "Final".to_string(),
        1 => "Semifinals".to_string(),
        2 => "Quarterfinals".to_string(),
        3 => "Round of 16".to_string(),
        _ => format!("Round {round}"),
    }
}

/// Number of rounds needed for `team_count` teams, `ceil(log2(n))`
pub fn round_count(team_count: usize) -> u32 {
    team_count.max(1).next_power_of_two().trailing_zeros()
}

/// Seed numbers (1-based) in bracket line order for a power-of-two `size`.
///
/// Consecutive pairs of the result are the first-round pairings. Each
/// doubling step expands seed `s` into `s` and its mirror `len + 1 - s`,
/// flipping the orientation on every other pair.
pub fn seed_positions(size: usize) -> Vec<u32> {
    let mut order = vec![1u32];
    while order.len() < size {
        let next_len = (order.len() * 2) as u32;
        let mut next = Vec::with_capacity(next_len as usize);
        for (i, &seed) in order.iter().enumerate() {
            let mirror = next_len + 1 - seed;
            if i % 2 == 0 {
                next.extend([seed, mirror]);
            } else {
                next.extend([mirror, seed]);
            }
        }
        order = next;
    }
    order
}

/// Reject empty or duplicate team lists
pub fn validate_teams(team_ids: &[TeamId]) -> DrawResult<()> {
    if team_ids.is_empty() {
        return Err(DrawError::validation("Team list cannot be empty"));
    }

    let mut seen = HashSet::with_capacity(team_ids.len());
    for team in team_ids {
        if !seen.insert(team) {
            return Err(DrawError::validation(format!(
                "Duplicate team in team list: {team}"
            )));
        }
    }
    Ok(())
}

/// Generate a knockout bracket.
///
/// `team_ids` is treated as the seed order for `manual` and `ranking`
/// seeding; `random` shuffles it first with `rng`. Byes are resolved
/// immediately: the bye match is stored completed and its team already sits
/// in the second-round slot.
///
/// # Errors
///
/// * `DrawError::Validation` - Empty team list or duplicate team identifiers
pub fn generate<R: Rng + ?Sized>(
    bracket_id: BracketId,
    team_ids: &[TeamId],
    seeding: SeedingMethod,
    rng: &mut R,
) -> DrawResult<GeneratedBracket> {
    validate_teams(team_ids)?;

    let mut seeds = team_ids.to_vec();
    if seeding == SeedingMethod::Random {
        seeds.shuffle(rng);
    }

    let total_rounds = round_count(seeds.len());
    if total_rounds == 0 {
        return Ok(GeneratedBracket {
            rounds: Vec::new(),
            matches: Vec::new(),
        });
    }
    let size = 1usize << total_rounds;

    // Allocate every round up front so next-match ids are known.
    let mut rounds: Vec<Vec<Match>> = (1..=total_rounds)
        .map(|round| {
            let name = round_name(round, total_rounds);
            (0..(size >> round) as u32)
                .map(|slot| Match::new(bracket_id, round, name.clone(), slot))
                .collect()
        })
        .collect();

    for r in 0..rounds.len().saturating_sub(1) {
        let next_ids: Vec<_> = rounds[r + 1].iter().map(|m| m.id).collect();
        for m in rounds[r].iter_mut() {
            m.next_match_id = Some(next_ids[(m.slot / 2) as usize]);
            m.next_match_slot = Some(Side::for_pairing(m.slot));
        }
    }

    let seed_team = |seed: u32| seeds.get(seed as usize - 1).copied();
    let positions = seed_positions(size);
    let mut byes = Vec::new();

    for (i, pair) in positions.chunks(2).enumerate() {
        let (high, low) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
        let m = &mut rounds[0][i];
        m.team1 = seed_team(high);
        m.team2 = seed_team(low);

        if m.team2.is_none() {
            m.is_bye = true;
            m.status = MatchStatus::Completed;
            m.winner = Some(Side::One);
            byes.push((m.slot, m.team1));
        }
    }

    if rounds.len() > 1 {
        for (slot, team) in byes {
            let next = &mut rounds[1][(slot / 2) as usize];
            next.set_team(Side::for_pairing(slot), team);
        }
    }

    let round_infos = rounds
        .iter()
        .enumerate()
        .map(|(i, matches)| RoundInfo {
            number: i as u32 + 1,
            name: round_name(i as u32 + 1, total_rounds),
            match_count: matches.len() as u32,
        })
        .collect();

    log::debug!(
        "Generated bracket {} with {} teams over {} rounds",
        bracket_id,
        seeds.len(),
        total_rounds
    );

    Ok(GeneratedBracket {
        rounds: round_infos,
        matches: rounds.into_iter().flatten().collect(),
    })
}
