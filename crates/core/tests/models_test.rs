use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rizbot_core::errors::BotError;
use rizbot_core::models::mafia::{
    MAX_PLAYERS, MafiaGame, NightOutcome, Phase, PhaseTimings, Role, VoteOutcome, Winner,
};
use rizbot_core::models::participants::{DEFAULT_TEAMS, ParticipantList};
use rstest::rstest;
use std::time::Duration;

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_register_keeps_ids_unique() {
    let mut list = ParticipantList::new();

    assert!(list.register("1"));
    assert!(list.register("2"));
    assert!(!list.register("1"));

    assert_eq!(list.ids(), ids(&["1", "2"]).as_slice());
}

#[test]
fn test_cancel_registration() {
    let mut list = ParticipantList::from_ids(["1", "2", "3"]);

    assert!(list.cancel("2"));
    assert!(!list.cancel("2"));
    assert_eq!(list.ids(), ids(&["1", "3"]).as_slice());
}

#[test]
fn test_from_ids_drops_duplicates_in_order() {
    let list = ParticipantList::from_ids(["5", "3", "5", "1", "3"]);
    assert_eq!(list.ids(), ids(&["5", "3", "1"]).as_slice());
}

#[rstest]
#[case(5, 2, vec![3, 2])]
#[case(6, 2, vec![3, 3])]
#[case(7, 3, vec![3, 2, 2])]
#[case(8, 3, vec![3, 3, 2])]
#[case(4, 4, vec![1, 1, 1, 1])]
fn test_divide_into_near_equal_groups(
    #[case] participants: usize,
    #[case] teams: usize,
    #[case] sizes: Vec<usize>,
) {
    let list = ParticipantList::from_ids((0..participants).map(|i| i.to_string()));

    let groups = list.divide(teams).unwrap();

    assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), sizes);
    // Groups are consecutive slices of the list.
    assert_eq!(groups.concat(), list.ids().to_vec());
}

#[test]
fn test_divide_defaults_and_rejections() {
    let list = ParticipantList::from_ids(["a", "b", "c"]);
    assert_eq!(list.divide(DEFAULT_TEAMS).unwrap(), vec![ids(&["a", "b"]), ids(&["c"])]);

    let err = list.divide(1).unwrap_err();
    assert_eq!(err.user_message(), Some("The number of teams must be at least two."));

    let err = list.divide(4).unwrap_err();
    assert!(matches!(err, BotError::Validation(_)));

    let err = ParticipantList::new().divide(2).unwrap_err();
    assert_eq!(err.user_message(), Some("The participants list is empty."));
}

#[test]
fn test_pretty_json_uses_four_space_indent() {
    let list = ParticipantList::from_ids(["123", "456"]);

    let json = String::from_utf8(list.to_pretty_json().unwrap()).unwrap();

    assert_eq!(json, "[\n    \"123\",\n    \"456\"\n]");
}

#[test]
fn test_from_json_slice_accepts_only_string_arrays() {
    let list = ParticipantList::from_json_slice(br#"["1", "2", "1"]"#).unwrap();
    assert_eq!(list.ids(), ids(&["1", "2"]).as_slice());

    assert!(ParticipantList::from_json_slice(br#"{"ids": []}"#).is_err());
    assert!(ParticipantList::from_json_slice(b"[1, 2]").is_err());
}

fn started_game(players: u64, murderers: usize) -> MafiaGame {
    let mut game = MafiaGame::new(1, murderers, 99).unwrap();
    for id in 2..=players {
        game.join(id).unwrap();
    }
    game.start(1, &mut StdRng::seed_from_u64(3)).unwrap();
    game
}

fn town_of(game: &MafiaGame) -> Vec<u64> {
    game.players()
        .iter()
        .copied()
        .filter(|id| game.role_of(*id) == Some(Role::Townsperson))
        .collect()
}

#[rstest]
#[case(0)]
#[case(4)]
fn test_murderer_count_is_bounded(#[case] murderers: usize) {
    assert!(MafiaGame::new(1, murderers, 99).is_err());
}

#[test]
fn test_lobby_join_rules() {
    let mut game = MafiaGame::new(1, 1, 99).unwrap();

    let err = game.join(1).unwrap_err();
    assert_eq!(err.user_message(), Some("You are already in the game!"));

    game.join(2).unwrap();
    assert_eq!(game.players(), &[1, 2]);
    assert_eq!(game.phase(), Phase::Lobby);
}

#[test]
fn test_lobby_is_capped() {
    let mut game = MafiaGame::new(1, 1, 99).unwrap();
    for id in 2..=MAX_PLAYERS as u64 {
        game.join(id).unwrap();
    }
    assert_eq!(game.players().len(), MAX_PLAYERS);

    let err = game.join(500).unwrap_err();
    assert_eq!(err.user_message(), Some("The game is full."));
}

#[test]
fn test_only_host_starts_with_enough_players() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut game = MafiaGame::new(1, 1, 99).unwrap();
    game.join(2).unwrap();

    let err = game.start(2, &mut rng).unwrap_err();
    assert_eq!(err.user_message(), Some("Only the host can start the game!"));

    let err = game.start(1, &mut rng).unwrap_err();
    assert_eq!(err.user_message(), Some("✋ Let more players join."));

    game.join(3).unwrap();
    game.start(1, &mut rng).unwrap();
    assert_eq!(game.phase(), Phase::RoleReveal);
    assert_eq!(game.murderers().len(), 1);
    assert_eq!(town_of(&game).len(), 2);
}

#[test]
fn test_dismiss_rules() {
    let mut game = MafiaGame::new(1, 1, 99).unwrap();
    game.join(2).unwrap();

    let err = game.dismiss(2, false).unwrap_err();
    assert_eq!(err.user_message(), Some("Only the host can stop the game!"));
    assert!(game.dismiss(2, true).is_ok());
    assert!(game.dismiss(1, false).is_ok());

    game.join(3).unwrap();
    game.start(1, &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(matches!(game.dismiss(1, false), Err(BotError::Conflict(_))));
}

#[test]
fn test_view_role_tracks_everyone() {
    let mut game = started_game(3, 1);

    let err = game.view_role(50).unwrap_err();
    assert_eq!(err.user_message(), Some("You haven't joined this game."));

    for id in 1..=3 {
        assert!(!game.everyone_viewed());
        let role = game.view_role(id).unwrap();
        assert!(role.is_alive());
        assert!(game.has_viewed_role(id));
    }
    assert!(game.everyone_viewed());

    assert!(game.finish_reveal());
    assert_eq!(game.phase(), Phase::Day);
    // Looking at a role again later does not restart the rounds.
    game.view_role(2).unwrap();
    assert!(!game.finish_reveal());
}

#[test]
fn test_briefings() {
    assert!(Role::Mafia.briefing().contains("**Murderer**"));
    assert!(Role::Townsperson.briefing().contains("**Townsperson**"));
}

#[test]
fn test_votes_require_living_voter_and_open_poll() {
    let mut game = started_game(4, 1);
    let town = town_of(&game);

    let err = game.cast_vote(town[0], town[1]).unwrap_err();
    assert_eq!(err.user_message(), Some("Voting is closed."));

    game.begin_voting();
    let err = game.cast_vote(50, town[1]).unwrap_err();
    assert_eq!(err.user_message(), Some("You are not allowed to vote."));

    game.cast_vote(town[0], town[1]).unwrap();
    game.cast_vote(town[0], town[2]).unwrap();
    assert_eq!(game.votes().get(&town[0]), Some(&town[2]));
}

#[test]
fn test_vote_outcomes() {
    let mut game = started_game(5, 1);
    let murderer = game.murderers()[0];
    let town = town_of(&game);

    game.begin_voting();
    assert_eq!(game.resolve_vote(), VoteOutcome::NoVotes);

    game.begin_voting();
    game.cast_vote(town[0], town[1]).unwrap();
    game.cast_vote(town[1], town[0]).unwrap();
    assert_eq!(game.resolve_vote(), VoteOutcome::Tie);
    assert_eq!(game.living_players().len(), 5);

    game.begin_voting();
    assert!(game.votes().is_empty());
    game.cast_vote(town[0], town[1]).unwrap();
    game.cast_vote(murderer, town[1]).unwrap();
    game.cast_vote(town[2], murderer).unwrap();
    assert_eq!(
        game.resolve_vote(),
        VoteOutcome::Eliminated { user_id: town[1], was_murderer: false }
    );
    assert_eq!(game.role_of(town[1]), Some(Role::Ghost));

    // Ghosts can no longer vote.
    game.begin_voting();
    let err = game.cast_vote(town[1], murderer).unwrap_err();
    assert_eq!(err.user_message(), Some("You are not allowed to vote."));
}

#[test]
fn test_night_target_rules() {
    let mut game = started_game(6, 2);
    let murderers = game.murderers();
    let town = town_of(&game);

    game.begin_night();
    let err = game.choose_target(town[0], town[1]).unwrap_err();
    assert_eq!(err.user_message(), Some("Only murderers can select a target."));

    let err = game.choose_target(murderers[0], murderers[1]).unwrap_err();
    assert_eq!(err.user_message(), Some("You cannot target another Mafia member."));

    let err = game.choose_target(50, town[0]).unwrap_err();
    assert_eq!(err.user_message(), Some("You are not allowed to kill."));

    game.choose_target(murderers[0], town[0]).unwrap();
    game.choose_target(murderers[1], town[1]).unwrap();
    assert_eq!(game.night_target(), Some(town[1]));

    assert_eq!(game.resolve_night(), NightOutcome::Killed(town[1]));
    assert_eq!(game.role_of(town[1]), Some(Role::Ghost));

    game.begin_night();
    assert_eq!(game.night_target(), None);
    assert_eq!(game.resolve_night(), NightOutcome::NoTarget);
}

#[test]
fn test_eliminated_murderer_cannot_kill() {
    let mut game = started_game(6, 2);
    let murderers = game.murderers();
    let town = town_of(&game);

    game.begin_voting();
    for voter in &town {
        game.cast_vote(*voter, murderers[0]).unwrap();
    }
    assert_eq!(
        game.resolve_vote(),
        VoteOutcome::Eliminated { user_id: murderers[0], was_murderer: true }
    );
    assert_eq!(game.role_of(murderers[0]), Some(Role::GhostMafia));

    game.begin_night();
    let err = game.choose_target(murderers[0], town[0]).unwrap_err();
    assert_eq!(err.user_message(), Some("You are not allowed to kill."));

    // Dead murderers still show up in the final reveal.
    assert_eq!(game.murderers(), murderers);
}

#[test]
fn test_win_conditions() {
    let mut game = started_game(4, 1);
    let murderer = game.murderers()[0];
    let town = town_of(&game);
    assert_eq!(game.winner(), None);

    game.begin_night();
    game.choose_target(murderer, town[0]).unwrap();
    game.resolve_night();
    // Two townsfolk against one murderer: still going.
    assert_eq!(game.winner(), None);

    game.begin_night();
    game.choose_target(murderer, town[1]).unwrap();
    game.resolve_night();
    assert_eq!(game.winner(), Some(Winner::Murderers));

    let summary = game.summary(Winner::Murderers);
    assert_eq!(summary.murderers, vec![murderer]);
    assert_eq!(summary.players, vec![1, 2, 3, 4]);
}

#[test]
fn test_civilians_win_when_no_murderer_lives() {
    let mut game = started_game(3, 1);
    let murderer = game.murderers()[0];

    game.begin_voting();
    for voter in town_of(&game) {
        game.cast_vote(voter, murderer).unwrap();
    }
    game.resolve_vote();

    assert_eq!(game.winner(), Some(Winner::Civilians));
    assert_eq!(Winner::Civilians.to_string(), "Civilians");
    assert_eq!(Winner::Murderers.to_string(), "Murderer(s)");
}

#[test]
fn test_phase_timings_from_seconds() {
    let timings: PhaseTimings = serde_json::from_str(r#"{"day_seconds": 5}"#).unwrap();

    assert_eq!(timings.day, Duration::from_secs(5));
    assert_eq!(timings.voting, Duration::from_secs(15));
    assert_eq!(timings.night, Duration::from_secs(20));
}
