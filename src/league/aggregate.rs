//! Pure statistics aggregation: folds incoming deltas into persisted
//! running totals. No I/O happens here; the repository calls these
//! functions between its transactional read and write.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::models::{PlayerModel, TeamModel};

/// Per-game stat deltas for one player.
///
/// Wire field names match the original league JSON. Every counter is
/// lenient: missing fields default to 0 and non-numeric input coerces
/// to 0 rather than failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerStatDeltas {
    #[serde(rename = "Singles", default, deserialize_with = "lenient_i64")]
    pub singles: i64,
    #[serde(rename = "Doubles", default, deserialize_with = "lenient_i64")]
    pub doubles: i64,
    #[serde(rename = "Triples", default, deserialize_with = "lenient_i64")]
    pub triples: i64,
    #[serde(rename = "Dimes", default, deserialize_with = "lenient_i64")]
    pub walks: i64,
    #[serde(rename = "HRs", default, deserialize_with = "lenient_i64")]
    pub home_runs: i64,
    #[serde(rename = "AtBats", default, deserialize_with = "lenient_i64")]
    pub at_bats: i64,
    /// Replacement value, not a delta
    #[serde(default)]
    pub name: Option<String>,
}

/// Record deltas for one team. `games_behind` is an absolute replacement
/// value; when absent or non-numeric the stored value is left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamRecordDeltas {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub wins: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub losses: i64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub games_behind: Option<f64>,
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_i64(&value))
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Applies one game's worth of stat deltas to a player aggregate.
///
/// Hits count singles, doubles, triples and home runs; walks are not
/// at-bat outcomes and stay out of the hit total. The batting average is
/// recomputed from the new totals every time so it can never drift from
/// hits / at-bats. Every call counts as one game played, even when all
/// deltas are zero.
pub fn apply_player_deltas(current: &PlayerModel, deltas: &PlayerStatDeltas) -> PlayerModel {
    let mut next = current.clone();

    next.singles += deltas.singles;
    next.doubles += deltas.doubles;
    next.triples += deltas.triples;
    next.walks += deltas.walks;
    next.home_runs += deltas.home_runs;

    let hits_delta = deltas.singles + deltas.doubles + deltas.triples + deltas.home_runs;
    next.hits += hits_delta;
    next.at_bats += deltas.at_bats;
    next.games_played += 1;

    next.batting_average = if next.at_bats > 0 {
        next.hits as f64 / next.at_bats as f64
    } else {
        0.0
    };

    if let Some(name) = &deltas.name {
        next.name = name.clone();
    }

    next
}

/// Applies a win/loss record delta to a team aggregate.
///
/// Games played grows by the sum of both deltas (unlike the player path's
/// fixed +1), and the win percentage is recomputed on the 0-100 scale.
pub fn apply_team_deltas(current: &TeamModel, deltas: &TeamRecordDeltas) -> TeamModel {
    let mut next = current.clone();

    next.wins += deltas.wins;
    next.losses += deltas.losses;

    let games_played = resolve_games_played(current) + deltas.wins + deltas.losses;
    next.games_played = Some(games_played);

    next.win_pct = if games_played > 0 {
        next.wins as f64 / games_played as f64 * 100.0
    } else {
        0.0
    };

    if let Some(games_behind) = deltas.games_behind {
        next.games_behind = games_behind;
    }

    next
}

/// Normalizes a stored win percentage onto the 0-100 scale.
///
/// An earlier storage convention kept a 0-1 fraction; values at or below
/// 1.0 are treated as that legacy scale and multiplied by 100. The value
/// 1.0 is inherently ambiguous (100% as a fraction vs. 1% already
/// normalized) and resolves to 100.0 per the documented behavior.
pub fn normalize_win_pct(stored: f64) -> f64 {
    if stored <= 1.0 {
        stored * 100.0
    } else {
        stored
    }
}

/// Resolves the displayed games-played value for a team: the explicit
/// column when present, else the wins + losses sum for legacy rows.
pub fn resolve_games_played(team: &TeamModel) -> i64 {
    team.games_played.unwrap_or(team.wins + team.losses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn player() -> PlayerModel {
        PlayerModel::new(1, "Alice".to_string(), 1)
    }

    fn team() -> TeamModel {
        TeamModel::new(1, "Tigers".to_string())
    }

    #[test]
    fn player_deltas_accumulate_into_hits_excluding_walks() {
        let deltas = PlayerStatDeltas {
            singles: 2,
            doubles: 1,
            triples: 1,
            walks: 3,
            home_runs: 1,
            at_bats: 8,
            name: None,
        };

        let next = apply_player_deltas(&player(), &deltas);

        assert_eq!(next.singles, 2);
        assert_eq!(next.doubles, 1);
        assert_eq!(next.triples, 1);
        assert_eq!(next.walks, 3);
        assert_eq!(next.home_runs, 1);
        // Walks do not count towards hits
        assert_eq!(next.hits, 5);
        assert_eq!(next.at_bats, 8);
        assert_eq!(next.batting_average, 5.0 / 8.0);
    }

    #[test]
    fn two_game_scenario_matches_expected_totals() {
        // Game one: 2 singles in 4 at-bats
        let first = apply_player_deltas(
            &player(),
            &PlayerStatDeltas {
                singles: 2,
                at_bats: 4,
                ..Default::default()
            },
        );
        assert_eq!(first.hits, 2);
        assert_eq!(first.at_bats, 4);
        assert_eq!(first.batting_average, 0.5);
        assert_eq!(first.games_played, 1);

        // Game two: a double in 3 at-bats
        let second = apply_player_deltas(
            &first,
            &PlayerStatDeltas {
                doubles: 1,
                at_bats: 3,
                ..Default::default()
            },
        );
        assert_eq!(second.hits, 3);
        assert_eq!(second.at_bats, 7);
        assert_eq!(second.batting_average, 0.42857142857142855);
        assert_eq!(second.games_played, 2);
    }

    #[test]
    fn games_played_counts_calls_not_deltas() {
        // One call = one game, even for an all-zero "correction" payload
        let mut current = player();
        for _ in 0..5 {
            current = apply_player_deltas(&current, &PlayerStatDeltas::default());
        }
        assert_eq!(current.games_played, 5);
        assert_eq!(current.hits, 0);
        assert_eq!(current.batting_average, 0.0);
    }

    #[test]
    fn hits_equal_sum_of_hit_deltas_over_many_updates() {
        let sequences = [
            (3, 0, 0, 2, 1, 6),
            (0, 2, 1, 0, 0, 4),
            (1, 1, 1, 5, 1, 9),
            (0, 0, 0, 0, 0, 0),
        ];

        let mut current = player();
        let mut expected_hits = 0;
        let mut expected_at_bats = 0;
        for (singles, doubles, triples, walks, home_runs, at_bats) in sequences {
            current = apply_player_deltas(
                &current,
                &PlayerStatDeltas {
                    singles,
                    doubles,
                    triples,
                    walks,
                    home_runs,
                    at_bats,
                    name: None,
                },
            );
            expected_hits += singles + doubles + triples + home_runs;
            expected_at_bats += at_bats;

            // The invariant holds after every single update
            assert_eq!(current.hits, expected_hits);
            let expected_avg = if current.at_bats > 0 {
                current.hits as f64 / current.at_bats as f64
            } else {
                0.0
            };
            assert_eq!(current.batting_average, expected_avg);
        }

        assert_eq!(current.at_bats, expected_at_bats);
        assert_eq!(current.games_played, sequences.len() as i64);
    }

    #[test]
    fn average_is_zero_when_no_at_bats() {
        let next = apply_player_deltas(
            &player(),
            &PlayerStatDeltas {
                walks: 4,
                ..Default::default()
            },
        );
        assert_eq!(next.at_bats, 0);
        assert_eq!(next.batting_average, 0.0);
    }

    #[test]
    fn player_name_replaces_verbatim_when_present() {
        let next = apply_player_deltas(
            &player(),
            &PlayerStatDeltas {
                name: Some("  Alice B. ".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(next.name, "  Alice B. ");

        let unchanged = apply_player_deltas(&next, &PlayerStatDeltas::default());
        assert_eq!(unchanged.name, "  Alice B. ");
    }

    #[test]
    fn team_deltas_accumulate_record_and_recompute_pct() {
        let first = apply_team_deltas(
            &team(),
            &TeamRecordDeltas {
                wins: 3,
                losses: 1,
                games_behind: Some(2.5),
            },
        );
        assert_eq!(first.wins, 3);
        assert_eq!(first.losses, 1);
        assert_eq!(first.games_played, Some(4));
        assert_eq!(first.win_pct, 75.0);
        assert_eq!(first.games_behind, 2.5);

        let second = apply_team_deltas(
            &first,
            &TeamRecordDeltas {
                wins: 1,
                losses: 3,
                games_behind: None,
            },
        );
        assert_eq!(second.games_played, Some(8));
        assert_eq!(second.win_pct, 50.0);
        // Absent games_behind leaves the stored value untouched
        assert_eq!(second.games_behind, 2.5);
    }

    #[test]
    fn team_pct_is_zero_without_games() {
        let next = apply_team_deltas(&team(), &TeamRecordDeltas::default());
        assert_eq!(next.games_played, Some(0));
        assert_eq!(next.win_pct, 0.0);
    }

    #[test]
    fn team_deltas_resolve_legacy_null_games_played() {
        let mut legacy = team();
        legacy.wins = 4;
        legacy.losses = 2;
        legacy.games_played = None;

        let next = apply_team_deltas(
            &legacy,
            &TeamRecordDeltas {
                wins: 1,
                ..Default::default()
            },
        );
        assert_eq!(next.games_played, Some(7));
        assert_eq!(next.win_pct, 5.0 / 7.0 * 100.0);
    }

    #[rstest]
    #[case(0.5, 50.0)]
    #[case(0.75, 75.0)]
    #[case(75.0, 75.0)]
    #[case(0.0, 0.0)]
    // Boundary: a stored 1.0 is read as the legacy 100% fraction
    #[case(1.0, 100.0)]
    #[case(100.0, 100.0)]
    fn win_pct_normalization(#[case] stored: f64, #[case] displayed: f64) {
        assert_eq!(normalize_win_pct(stored), displayed);
    }

    #[test]
    fn games_played_resolution_prefers_explicit_column() {
        let mut t = team();
        t.wins = 9;
        t.losses = 1;
        t.games_played = Some(12); // drifted, but explicit wins
        assert_eq!(resolve_games_played(&t), 12);

        t.games_played = None;
        assert_eq!(resolve_games_played(&t), 10);
    }

    #[test]
    fn deltas_parse_leniently_from_json() {
        let deltas: PlayerStatDeltas = serde_json::from_str(
            r#"{
                "Singles": 2,
                "Doubles": "3",
                "Triples": "junk",
                "Dimes": null,
                "HRs": 1.9,
                "name": "Bob"
            }"#,
        )
        .unwrap();

        assert_eq!(deltas.singles, 2);
        assert_eq!(deltas.doubles, 3);
        // Non-numeric input coerces to 0 instead of failing
        assert_eq!(deltas.triples, 0);
        assert_eq!(deltas.walks, 0);
        // Fractional input truncates
        assert_eq!(deltas.home_runs, 1);
        // Missing field defaults to 0
        assert_eq!(deltas.at_bats, 0);
        assert_eq!(deltas.name.as_deref(), Some("Bob"));
    }

    #[test]
    fn team_deltas_parse_leniently_from_json() {
        let deltas: TeamRecordDeltas = serde_json::from_str(
            r#"{"wins": "2", "losses": true, "games_behind": "1.5"}"#,
        )
        .unwrap();
        assert_eq!(deltas.wins, 2);
        assert_eq!(deltas.losses, 0);
        assert_eq!(deltas.games_behind, Some(1.5));

        let no_gb: TeamRecordDeltas =
            serde_json::from_str(r#"{"wins": 1, "games_behind": "n/a"}"#).unwrap();
        // Non-numeric games_behind means "leave it untouched"
        assert_eq!(no_gb.games_behind, None);
    }
}
