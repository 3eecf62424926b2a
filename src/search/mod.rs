//! Monte Carlo Tree Search with external evaluation.
//!
//! This implementation does not use rollouts or a built-in heuristic. The
//! search suspends at every unexpanded leaf and resumes once the caller has
//! obtained prior probabilities and a value estimate for it, typically from a
//! neural network evaluating a whole batch of suspended games at once.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::arena::Arena;
pub use self::mcts_core::Mcts;

pub mod arena;
mod mcts_core;

/// Conversion between moves and the dense action indices used to exchange
/// prior probabilities and visit counts with the external evaluator.
pub trait ActionIndex: Copy {
    fn from_action(action: usize) -> Self;
    fn action(self) -> usize;
}

/// Weight of the Dirichlet noise mixed into the root priors when enabled.
const DIRICHLET_EPSILON: f32 = 0.25;

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MctsSetting {
    c_puct: f32,
    num_search: u32,
    dirichlet: Option<f32>,
}

impl Default for MctsSetting {
    fn default() -> Self {
        MctsSetting {
            c_puct: 1.0,
            num_search: 1000,
            dirichlet: None,
        }
    }
}

impl MctsSetting {
    pub fn add_c_puct(mut self, c_puct: f32) -> Self {
        self.c_puct = c_puct;
        self
    }

    pub fn add_num_search(mut self, num_search: u32) -> Self {
        self.num_search = num_search;
        self
    }

    /// Mix Dirichlet noise into the root priors at expansion time.
    /// `alpha` is used to generate the noise; lower values generate more
    /// varied noise, values above 1 tend towards uniform outputs.
    pub fn add_dirichlet(mut self, alpha: f32) -> Self {
        self.dirichlet = Some(alpha);
        self
    }

    pub fn c_puct(&self) -> f32 {
        self.c_puct
    }

    pub fn num_search(&self) -> u32 {
        self.num_search
    }

    pub fn dirichlet(&self) -> Option<f32> {
        self.dirichlet
    }
}
