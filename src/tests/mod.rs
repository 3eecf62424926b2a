#[cfg(test)]
mod envpool_tests;
#[cfg(test)]
mod selfplay_tests;

#[cfg(test)]
use crate::position::{Game, Square};
#[cfg(test)]
use crate::search::Mcts;

#[cfg(test)]
fn do_moves(game: &mut Game, actions: &[usize]) {
    for &action in actions {
        game.step(Square::from_index(action));
    }
}

/// Feeds uniform priors and a zero value until the search completes.
#[cfg(test)]
fn run_search_to_completion(mcts: &mut Mcts<Game>, num_actions: usize) {
    let mut done = mcts.search(None, 0.0);
    while !done {
        let prior_probs = vec![0.1; num_actions];
        done = mcts.search(Some(&prior_probs), 0.0);
    }
}
