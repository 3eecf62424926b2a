use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::position::Square;
use crate::search::MctsSetting;
use crate::selfplay::{select_action, SelfPlay};

/// Drives one episode to completion with uniform priors, choosing the
/// most-visited action for every move. Returns the winner and the number of
/// completed player turns.
fn play_episode(game: &mut SelfPlay, num_actions: usize) -> (i32, usize) {
    let mut done = game.step(None, 0.0, 0);
    assert!(!done);

    let mut best_action = 0;
    let mut player_steps = 0;
    while !done {
        if game.is_player_done() {
            done = game.step(None, 0.0, best_action);
        } else {
            let prior_probs = vec![0.1; num_actions];
            done = game.step(Some(&prior_probs), 0.0, best_action);
        }
        if game.is_player_done() {
            player_steps += 1;
            let mcts_result = game.get_search_result();
            let (action, _) = mcts_result
                .iter()
                .enumerate()
                .max_by_key(|&(_, visits)| *visits)
                .unwrap();
            best_action = action;
        }
    }
    (game.get_winner(), player_steps)
}

#[test]
fn small_board_draw_test() {
    // With enough simulations per move, 3x3 three-in-a-row always ends in
    // a draw on the full board
    let setting = MctsSetting::default().add_c_puct(1.0).add_num_search(20_000);
    let mut game = SelfPlay::new(3, 3, 3, setting, 1);

    let (winner, player_steps) = play_episode(&mut game, 9);
    assert_eq!(winner, -1);
    assert_eq!(player_steps, 9);
    assert_eq!(game.history().len(), 9);
    assert!(game.is_game_done());
    // Nine moves means player 0 made the last one
    assert_eq!(game.current_player(), 0);
}

#[test]
fn get_state_switches_view_test() {
    let setting = MctsSetting::default().add_num_search(50);
    let mut game = SelfPlay::new(5, 4, 2, setting, 7);
    let done = game.step(None, 0.0, 0);
    assert!(!done);

    // While searching, the observation is the leaf awaiting evaluation
    assert!(!game.is_player_done());
    let area = 5 * 5;
    assert_eq!(game.get_state().len(), (2 * 2 + 1) * area);

    // Drive the first player's search to completion
    while !game.is_player_done() {
        let prior_probs = vec![0.1; area];
        let done = game.step(Some(&prior_probs), 0.0, 0);
        assert!(!done);
    }

    // Now the observation is the true board, which is still empty
    let state = game.get_state();
    assert!(state[..2 * 2 * area].iter().all(|&value| value == 0));

    // And every cell of the empty board has a visit count
    let mcts_result = game.get_search_result();
    assert_eq!(mcts_result.iter().filter(|&&visits| visits >= 0).count(), area);

    // Greedy sampling picks a most-visited action
    let action = game.sample_action(None);
    let max_visits = *mcts_result.iter().max().unwrap();
    assert_eq!(mcts_result[action.index()], max_visits);
}

#[test]
fn reset_starts_new_episode_test() {
    let setting = MctsSetting::default().add_c_puct(1.0).add_num_search(2_000);
    let mut game = SelfPlay::new(3, 3, 3, setting, 3);
    play_episode(&mut game, 9);
    assert!(game.is_game_done());

    game.reset();
    assert!(!game.is_game_done());
    assert!(!game.is_player_done());
    assert!(game.history().is_empty());

    let (_, player_steps) = play_episode(&mut game, 9);
    assert!(player_steps > 0);
    assert!(game.is_game_done());
}

#[test]
fn select_action_test() {
    let actions_visits = vec![
        (Square::from_index(0), 10),
        (Square::from_index(1), 30),
        (Square::from_index(2), 20),
    ];
    let mut rng = SmallRng::seed_from_u64(0);

    // Greedy selection plays the most-visited action
    assert_eq!(
        select_action(&mut rng, None, &actions_visits),
        Square::from_index(1)
    );

    // Sampled selection always returns one of the candidates
    for _ in 0..20 {
        let sampled = select_action(&mut rng, Some(1.0), &actions_visits);
        assert!(actions_visits.iter().any(|&(action, _)| action == sampled));
    }
}

#[test]
#[should_panic]
fn winner_before_done_test() {
    let setting = MctsSetting::default().add_num_search(10);
    let game = SelfPlay::new(3, 3, 1, setting, 0);
    game.get_winner();
}
