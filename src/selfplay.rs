//! Two-player self-play orchestration: one shared game, two search engines
//! advancing in lockstep, and the visit-count statistics collected as
//! training targets.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::position::{winner_index, Game, Square};
use crate::search::{Mcts, MctsSetting};

impl Mcts<Game> {
    /// Feature encoding of the engine's game handle; see [`Mcts::position`].
    pub fn get_state(&self, num_player_planes: usize) -> Vec<i32> {
        self.position().encode(num_player_planes)
    }
}

/// A single self-play episode, advanced one external step at a time.
///
/// The episode alternates between two phases, tracked by `is_player_done`:
/// while it is unset, [`SelfPlay::step`] forwards evaluation results to the
/// active player's suspended search; once the search completes, it is set
/// and the next call consumes the caller's chosen action instead.
pub struct SelfPlay {
    board_size: usize,
    num_player_planes: usize,
    setting: MctsSetting,

    game: Game,
    players: [Mcts<Game>; 2],
    current_player: usize,
    winner: i32,
    is_player_done: bool,
    is_game_done: bool,

    actions_visits: Vec<(Square, u32)>,
    history: Vec<Square>,
    rng: SmallRng,
}

impl SelfPlay {
    pub fn new(
        board_size: usize,
        win_length: usize,
        num_player_planes: usize,
        setting: MctsSetting,
        seed: u64,
    ) -> Self {
        let game = Game::new(board_size, win_length);
        let max_actions = board_size * board_size;
        let players = [
            Mcts::new(game.clone(), setting.clone(), max_actions),
            Mcts::new(game.clone(), setting.clone(), max_actions),
        ];
        SelfPlay {
            board_size,
            num_player_planes,
            setting,
            game,
            players,
            current_player: 0,
            winner: -1,
            is_player_done: false,
            is_game_done: false,
            actions_visits: vec![],
            history: vec![],
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Starts the episode over with fresh engines.
    pub fn reset(&mut self) {
        self.game.reset();
        let max_actions = self.board_size * self.board_size;
        self.players = [
            Mcts::new(self.game.clone(), self.setting.clone(), max_actions),
            Mcts::new(self.game.clone(), self.setting.clone(), max_actions),
        ];
        self.current_player = 0;
        self.winner = -1;
        self.is_player_done = false;
        self.is_game_done = false;
        self.actions_visits.clear();
        self.history.clear();
    }

    /// Advances the episode by one external step. Returns whether the game
    /// finished.
    ///
    /// While the active player's search is running, `prior_probs` and
    /// `value` feed its suspended leaf and `selected_action` is ignored.
    /// Once the search has finished, the next call consumes
    /// `selected_action` as the move to play, applies it to the game and to
    /// both engines, and immediately starts the other player's search.
    pub fn step(
        &mut self,
        prior_probs: Option<&[f32]>,
        value: f32,
        selected_action: usize,
    ) -> bool {
        loop {
            if !self.is_player_done {
                let done = self.players[self.current_player].search(prior_probs, value);
                if !done {
                    return false;
                }
                self.actions_visits = self.players[self.current_player].get_result(false);
                self.is_player_done = true;
                return false;
            }

            let action = Square::from_index(selected_action);
            self.actions_visits.clear();
            self.is_player_done = false;
            self.history.push(action);
            self.game.step(action);
            // Both engines advance in lockstep so their snapshots stay equal
            // to the shared game
            for player in self.players.iter_mut() {
                player.step(action);
            }
            match self.game.check_finished() {
                Some(result) => {
                    self.winner = winner_index(result);
                    assert!(
                        self.winner == -1 || self.winner == self.current_player as i32,
                        "Winner {} is not the player who just moved",
                        self.winner
                    );
                    self.is_game_done = true;
                    return true;
                }
                None => {
                    self.current_player ^= 1;
                }
            }
        }
    }

    pub fn is_player_done(&self) -> bool {
        self.is_player_done
    }

    pub fn is_game_done(&self) -> bool {
        self.is_game_done
    }

    pub fn current_player(&self) -> usize {
        self.current_player
    }

    pub fn history(&self) -> &[Square] {
        &self.history
    }

    pub fn get_winner(&self) -> i32 {
        assert!(self.is_game_done, "Game is not done yet");
        self.winner
    }

    /// The observation for the current phase: while the active player is
    /// searching, the leaf position awaiting evaluation; once its search has
    /// finished, the true board as the training target's input.
    pub fn get_state(&self) -> Vec<i32> {
        if !self.is_player_done {
            self.players[self.current_player].get_state(self.num_player_planes)
        } else {
            self.game.encode(self.num_player_planes)
        }
    }

    /// Root visit count per action; actions outside the finished search's
    /// result are -1.
    pub fn get_search_result(&self) -> Vec<i32> {
        let mut visit_counts = vec![-1; self.board_size * self.board_size];
        for &(action, visits) in &self.actions_visits {
            visit_counts[action.index()] = visits as i32;
        }
        visit_counts
    }

    /// Draws the move to play from the visit distribution, for callers that
    /// let the driver pick its own moves. Requires a finished search.
    pub fn sample_action(&mut self, temperature: Option<f64>) -> Square {
        assert!(self.is_player_done, "No search result to sample from");
        select_action(&mut self.rng, temperature, &self.actions_visits)
    }

    /// Prints the game state, for verbose diagnostics.
    pub fn display(&self) {
        print!("{}", self.game);
        println!("Current player: {}", self.current_player);
        println!("Winner: {}", self.winner);
        print!("Actions:");
        for action in &self.history {
            print!(" {}", action);
        }
        println!();
    }
}

/// Selects an action from the visit counts, tending towards the most-visited
/// actions but with a random component.
/// If `temperature` is low (e.g. 0.1), it tends to choose the most-visited
/// action; at 1.0 it chooses an action proportional to its visit count.
/// `None` chooses greedily.
pub fn select_action<R: Rng>(
    rng: &mut R,
    temperature: Option<f64>,
    actions_visits: &[(Square, u32)],
) -> Square {
    if let Some(temperature) = temperature {
        let mut action_probabilities = Vec::with_capacity(actions_visits.len());
        let mut cumulative_prob = 0.0;

        for (action, visits) in actions_visits.iter() {
            cumulative_prob += (*visits as f64).powf(1.0 / temperature);
            action_probabilities.push((action, cumulative_prob));
        }

        let p = rng.gen_range(0.0..cumulative_prob);
        for (action, cumulative_prob) in action_probabilities {
            if cumulative_prob > p {
                return *action;
            }
        }
        unreachable!()
    } else {
        actions_visits
            .iter()
            .max_by_key(|&&(_, visits)| visits)
            .expect("No actions to select from")
            .0
    }
}
