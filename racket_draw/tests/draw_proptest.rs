/// Property-based tests for bracket generation and score validation
///
/// These tests check structural invariants of generated brackets for any
/// team count, and validator behaviour over arbitrary set lists.
use std::collections::HashSet;

use proptest::prelude::*;
use racket_draw::bracket::generator::{generate, round_count, seed_positions};
use racket_draw::matches::score::{LEGAL_SET_SCORES, is_legal_set, validate};
use racket_draw::{MatchFormat, MatchStatus, SeedingMethod, SetScore, Side};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

// Strategy producing a legal set score for either side
fn legal_set_strategy() -> impl Strategy<Value = SetScore> {
    (0..LEGAL_SET_SCORES.len(), any::<bool>()).prop_map(|(i, flip)| {
        let (w, l) = LEGAL_SET_SCORES[i];
        if flip {
            SetScore::new(l, w)
        } else {
            SetScore::new(w, l)
        }
    })
}

fn format_strategy() -> impl Strategy<Value = MatchFormat> {
    prop_oneof![
        Just(MatchFormat::SingleSet),
        Just(MatchFormat::BestOfThree),
        Just(MatchFormat::BestOfFive),
    ]
}

proptest! {
    #[test]
    fn test_generated_structure(team_count in 1usize..=70, seed in any::<u64>()) {
        let teams: Vec<Uuid> = (0..team_count).map(|_| Uuid::new_v4()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let bracket = generate(Uuid::new_v4(), &teams, SeedingMethod::Random, &mut rng).unwrap();

        let rounds = round_count(team_count);
        prop_assert_eq!(bracket.rounds.len() as u32, rounds);

        // A bracket over 2^r slots has 2^r - 1 matches.
        let expected = if rounds == 0 { 0 } else { (1usize << rounds) - 1 };
        prop_assert_eq!(bracket.matches.len(), expected);

        let ids: HashSet<Uuid> = bracket.matches.iter().map(|m| m.id).collect();
        for m in &bracket.matches {
            if m.round == rounds {
                prop_assert!(m.next_match_id.is_none());
            } else {
                let next = m.next_match_id.expect("non-final match links forward");
                prop_assert!(ids.contains(&next));
                prop_assert_eq!(m.next_match_slot, Some(Side::for_pairing(m.slot)));
            }
        }

        if rounds == 0 {
            return Ok(());
        }

        // Every team appears in exactly one first-round match.
        let placed: Vec<Uuid> = bracket
            .matches
            .iter()
            .filter(|m| m.round == 1)
            .flat_map(|m| [m.team1, m.team2])
            .flatten()
            .collect();
        prop_assert_eq!(placed.len(), team_count);
        let unique: HashSet<Uuid> = placed.iter().copied().collect();
        prop_assert_eq!(unique.len(), team_count);

        let byes = bracket.matches.iter().filter(|m| m.is_bye).count();
        prop_assert_eq!(byes, (1usize << rounds) - team_count);
        for m in bracket.matches.iter().filter(|m| m.is_bye) {
            prop_assert_eq!(m.status, MatchStatus::Completed);
            prop_assert!(m.team2.is_none());
        }
    }

    #[test]
    fn test_seed_positions_pair_to_size_plus_one(power in 1u32..=7) {
        let size = 1usize << power;
        let positions = seed_positions(size);

        let unique: HashSet<u32> = positions.iter().copied().collect();
        prop_assert_eq!(unique.len(), size);
        for pair in positions.chunks(2) {
            prop_assert_eq!(pair[0] + pair[1], size as u32 + 1);
        }
    }

    #[test]
    fn test_validator_winner_reaches_required_sets(
        sets in prop::collection::vec(legal_set_strategy(), 1..8),
        format in format_strategy(),
    ) {
        match validate(&sets, format) {
            Ok(score) => {
                let required = format.sets_to_win();
                let (won, lost) = match score.winner {
                    Side::One => (score.team1_sets, score.team2_sets),
                    Side::Two => (score.team2_sets, score.team1_sets),
                };
                prop_assert_eq!(won, required);
                prop_assert!(lost < required);
                prop_assert!(score.sets.len() <= sets.len());
                prop_assert_eq!(&score.sets[..], &sets[..score.sets.len()]);
            }
            Err(_) => {
                // Only possible when no side reached the required sets.
                let one = sets.iter().filter(|s| s.team1 > s.team2).count();
                let two = sets.len() - one;
                let required = usize::from(format.sets_to_win());
                prop_assert!(one < required && two < required);
            }
        }
    }

    #[test]
    fn test_illegal_first_set_is_always_rejected(a in 0u8..=10, b in 0u8..=10) {
        let set = SetScore::new(a, b);
        prop_assume!(!is_legal_set(&set));
        prop_assert!(validate(&[set], MatchFormat::BestOfThree).is_err());
    }
}
