//! Per-game adapter onto the batched step/observation interface, plus a
//! synchronous pool multiplexing many games behind it.
//!
//! The pool lets one caller drive a whole batch of self-play games: every
//! step it collects one suspended leaf observation per game, evaluates the
//! batch externally, and resumes each game with its own results.

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::search::MctsSetting;
use crate::selfplay::SelfPlay;

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
    pub board_size: usize,
    pub win_length: usize,
    pub num_player_planes: usize,
    pub c_puct: f32,
    pub num_search: u32,
    pub verbose_output: bool,
    /// Sampling temperature when the driver draws its own moves. Unused
    /// when the caller supplies `selected_action`.
    pub temp: f64,
    /// Root noise hyperparameters, reserved for training-time exploration.
    /// The adapter itself never applies them.
    pub dirichlet_alpha: f32,
    pub dirichlet_eps: f32,
    pub seed: u64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            board_size: 15,
            win_length: 5,
            num_player_planes: 4,
            c_puct: 1.0,
            num_search: 1000,
            verbose_output: false,
            temp: 1.0,
            dirichlet_alpha: 0.3,
            dirichlet_eps: 0.25,
            seed: 0,
        }
    }
}

/// Action inputs for one env step. `prior_probs` and `value` are consumed
/// while the env's search is running; `selected_action` once it has
/// finished.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvAction {
    pub env_id: usize,
    pub prior_probs: Vec<f32>,
    pub value: f32,
    pub selected_action: usize,
}

/// Observation written after every env step.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    pub env_id: usize,
    /// Feature planes, `(2 * num_player_planes + 1) * board_size²` values.
    pub state: Vec<i32>,
    /// Root visit count per action; meaningful only when `is_player_done`.
    pub mcts_result: Vec<i32>,
    pub is_player_done: bool,
    /// Number of completed player turns so far.
    pub player_step_count: i32,
    /// -1 until the game is done.
    pub winner: i32,
    pub done: bool,
}

/// One self-play game behind the step/observation interface.
pub struct GomokuEnv {
    config: EnvConfig,
    env_id: usize,
    game: SelfPlay,
    done: bool,
    player_step_count: i32,
}

impl GomokuEnv {
    pub fn new(config: EnvConfig, env_id: usize) -> Self {
        let game = Self::make_game(&config, env_id);
        GomokuEnv {
            config,
            env_id,
            game,
            done: false,
            player_step_count: 0,
        }
    }

    fn make_game(config: &EnvConfig, env_id: usize) -> SelfPlay {
        let setting = MctsSetting::default()
            .add_c_puct(config.c_puct)
            .add_num_search(config.num_search);
        SelfPlay::new(
            config.board_size,
            config.win_length,
            config.num_player_planes,
            setting,
            config.seed.wrapping_add(env_id as u64),
        )
    }

    pub fn env_id(&self) -> usize {
        self.env_id
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Starts a fresh episode and runs one empty step, leaving the first
    /// player's search suspended at its first leaf.
    pub fn reset(&mut self) -> Observation {
        self.game = Self::make_game(&self.config, self.env_id);
        self.done = self.game.step(None, 0.0, 0);
        self.player_step_count = 0;
        assert!(!self.done, "Game should not be done after reset");
        debug!("env {} reset", self.env_id);
        self.write_state()
    }

    pub fn step(&mut self, action: &EnvAction) -> Observation {
        assert!(
            !self.done,
            "Env {} stepped after the game finished",
            self.env_id
        );
        if self.game.is_player_done() {
            debug!("env {} plays action {}", self.env_id, action.selected_action);
            self.done = self.game.step(None, action.value, action.selected_action);
        } else {
            self.done = self.game.step(
                Some(&action.prior_probs),
                action.value,
                action.selected_action,
            );
        }
        self.write_state()
    }

    fn write_state(&mut self) -> Observation {
        let is_player_done = self.game.is_player_done();
        let mcts_result = if is_player_done {
            self.game.get_search_result()
        } else {
            vec![-1; self.config.board_size * self.config.board_size]
        };
        if is_player_done {
            self.player_step_count += 1;
        }
        let winner = if self.done { self.game.get_winner() } else { -1 };
        if self.done {
            assert_eq!(
                self.player_step_count as usize,
                self.game.history().len(),
                "Player step count should be equal to the number of moves played"
            );
            if self.config.verbose_output {
                println!("Player step count: {}", self.player_step_count);
                println!("Env id: {}", self.env_id);
                self.game.display();
                println!();
            }
        }
        Observation {
            env_id: self.env_id,
            state: self.game.get_state(),
            mcts_result,
            is_player_done,
            player_step_count: self.player_step_count,
            winner,
            done: self.done,
        }
    }
}

/// A synchronous pool of self-play games behind one step/observation
/// interface.
///
/// Games are fully independent; the thread-pool plumbing that runs them in
/// parallel belongs to the surrounding framework, not to this crate.
pub struct EnvPool {
    envs: Vec<GomokuEnv>,
}

impl EnvPool {
    pub fn new(config: EnvConfig, num_envs: usize) -> Self {
        debug!("creating pool of {} envs", num_envs);
        let envs = (0..num_envs)
            .map(|env_id| GomokuEnv::new(config.clone(), env_id))
            .collect();
        EnvPool { envs }
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    /// Resets every env, returning the initial observations.
    pub fn reset(&mut self) -> Vec<Observation> {
        self.envs.iter_mut().map(|env| env.reset()).collect()
    }

    /// Steps the addressed envs, returning one observation per action, in
    /// order.
    pub fn step(&mut self, actions: &[EnvAction]) -> Vec<Observation> {
        actions
            .iter()
            .map(|action| self.envs[action.env_id].step(action))
            .collect()
    }
}
