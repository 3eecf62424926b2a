//! The search core of an AlphaZero-style self-play pipeline for Gomoku.
//!
//! Many independent self-play games are multiplexed behind one
//! step/observation interface, each driven by a Monte Carlo Tree Search that
//! suspends at every unexpanded leaf so an external evaluator (the
//! policy/value network) can be invoked once per batch of leaf positions.
//!
//! # Examples
//!
//! Search a single position with uniform priors:
//!
//! ```
//! use gomoku_mcts::position::Game;
//! use gomoku_mcts::search::{Mcts, MctsSetting};
//!
//! let setting = MctsSetting::default().add_num_search(100);
//! let mut mcts = Mcts::new(Game::new(8, 5), setting, 8 * 8);
//!
//! let mut done = mcts.search(None, 0.0);
//! while !done {
//!     let prior_probs = vec![1.0 / 64.0; 64];
//!     done = mcts.search(Some(&prior_probs), 0.0);
//! }
//! assert_eq!(mcts.visits(), 100);
//! ```

pub mod envpool;
pub mod position;
pub mod search;
pub mod selfplay;
mod tests;

pub use search::{Mcts, MctsSetting};
