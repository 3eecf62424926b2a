//! The core of the MCTS search algorithm: per-node PUCT statistics, the
//! arena-backed tree and the resumable search state machine.

use board_game_traits::{GameResult, Position as PositionTrait};
use rand::distributions::Distribution;

use crate::search::arena::Arena;
use crate::search::{ActionIndex, MctsSetting, DIRICHLET_EPSILON};

/// Reference to a node in the node arena. Copy-cheap, never owns storage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct NodeId(u32);

/// Reference to a child list in the child-list arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct ListId(u32);

/// Per-node PUCT statistics.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
struct Puct {
    prior_prob: f32,
    q_value: f32,
    visit_count: u32,
    c_puct: f32,
}

impl Puct {
    fn new(prior_prob: f32, c_puct: f32) -> Self {
        Puct {
            prior_prob,
            q_value: 0.0,
            visit_count: 0,
            c_puct,
        }
    }

    /// Folds a new simulation result into the running mean.
    fn update(&mut self, v: f32) {
        self.visit_count += 1;
        self.q_value += (v - self.q_value) / self.visit_count as f32;
    }

    /// The node's selection score under its parent.
    fn value(&self, parent_visit_count: u32) -> f32 {
        self.q_value
            + self.c_puct * self.prior_prob * (parent_visit_count as f32).sqrt()
                / (1 + self.visit_count) as f32
    }
}

/// A single tree node. `action` is the move that leads into this node from
/// its parent; its value is unspecified for the root. A node is a leaf until
/// it has been expanded.
#[derive(Clone, Copy, Default, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Option<ListId>,
    action: u16,
    puct: Puct,
}

/// The two arenas backing a search tree.
///
/// Nodes are handed out one expansion at a time and released in bulk on
/// [`TreeArena::clear`]. Child lists keep the backing capacity of their
/// vectors across clears, so after the first few searches an expansion no
/// longer allocates.
struct TreeArena {
    nodes: Arena<Node>,
    child_lists: Arena<Vec<NodeId>>,
}

impl TreeArena {
    fn new(num_search: u32, max_actions: usize) -> Self {
        // Each simulation expands at most one leaf with at most
        // `max_actions` children; one extra slot for the root.
        TreeArena {
            nodes: Arena::new(num_search as usize * max_actions + 1),
            child_lists: Arena::new(num_search as usize),
        }
    }

    fn new_root(&self, c_puct: f32) -> NodeId {
        NodeId(self.nodes.add(Node {
            parent: None,
            children: None,
            action: 0,
            puct: Puct::new(0.0, c_puct),
        }))
    }

    fn clear(&self) {
        self.nodes.clear();
        self.child_lists.clear();
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).children.is_none()
    }

    fn action(&self, node: NodeId) -> u16 {
        self.nodes.get(node.0).action
    }

    /// Returns the child maximizing the PUCT score. Ties are broken by the
    /// first child encountered, which is stable given identical inputs.
    fn select_child(&self, node: NodeId) -> NodeId {
        let node_ref = self.nodes.get(node.0);
        let children = node_ref.children.expect("Select called on a leaf node");
        let parent_visit_count = node_ref.puct.visit_count;
        let mut best_value = f32::NEG_INFINITY;
        let mut selected_child = None;
        for &child in self.child_lists.get(children.0).iter() {
            let value = self.nodes.get(child.0).puct.value(parent_visit_count);
            if value > best_value {
                best_value = value;
                selected_child = Some(child);
            }
        }
        selected_child.expect("Node has no children")
    }

    /// Gives the leaf one child per `(action, prior)` pair.
    fn expand(&self, node: NodeId, actions_probs: &[(u16, f32)], c_puct: f32) {
        assert!(self.is_leaf(node), "Expand called on a non-leaf node");
        let list = ListId(self.child_lists.alloc());
        {
            let mut children = self.child_lists.get_mut(list.0);
            children.clear();
            for &(action, prior_prob) in actions_probs {
                let child = self.nodes.add(Node {
                    parent: Some(node),
                    children: None,
                    action,
                    puct: Puct::new(prior_prob, c_puct),
                });
                children.push(NodeId(child));
            }
        }
        self.nodes.get_mut(node.0).children = Some(list);
    }
}

/// A resumable Monte Carlo Tree Search over one game.
///
/// One logical search performs `num_search` simulations, but suspends at
/// every unexpanded leaf so an external evaluator can supply priors and a
/// value for it: [`Mcts::search`] returns `false` at the suspension and
/// consumes the evaluation on the next call.
pub struct Mcts<P: PositionTrait + Clone>
where
    P::Move: ActionIndex,
{
    setting: MctsSetting,
    arena: TreeArena,
    current_search: u32,
    root: NodeId,
    stat: P,
    env: P,
    selected: Option<NodeId>,
    // Reused between expansions to avoid allocations in the search loop
    temp_moves: Vec<P::Move>,
    temp_actions_probs: Vec<(u16, f32)>,
}

impl<P: PositionTrait + Clone> Mcts<P>
where
    P::Move: ActionIndex,
{
    /// `max_actions` bounds the number of legal moves in any position, and
    /// together with the simulation count determines the arena sizes.
    pub fn new(game: P, setting: MctsSetting, max_actions: usize) -> Self {
        let arena = TreeArena::new(setting.num_search(), max_actions);
        let root = arena.new_root(setting.c_puct());
        let env = game.clone();
        Mcts {
            setting,
            arena,
            current_search: 0,
            root,
            stat: game,
            env,
            selected: None,
            temp_moves: vec![],
            temp_actions_probs: vec![],
        }
    }

    /// Runs simulations until either an unexpanded leaf needs an external
    /// evaluation (returns `false`) or all `num_search` simulations have
    /// completed (returns `true`).
    ///
    /// When the previous call returned `false`, this call consumes the
    /// evaluator's output for the suspended leaf before continuing. A call
    /// with no suspension in progress ignores `prior_probs` and `value`.
    pub fn search(&mut self, prior_probs: Option<&[f32]>, value: f32) -> bool {
        if let (Some(leaf), Some(prior_probs)) = (self.selected, prior_probs) {
            self.selected = None;
            self.expand_node(leaf, prior_probs);
            self.backpropagate(leaf, value);
            self.current_search += 1;
        }

        while self.current_search < self.setting.num_search() {
            let (leaf, result) = self.select_node();
            let Some(result) = result else {
                self.selected = Some(leaf);
                return false;
            };
            // The side that moved into a terminal leaf has either won or
            // drawn; its value needs no evaluator.
            let value = if result == GameResult::Draw { 0.0 } else { 1.0 };
            self.backpropagate(leaf, value);
            self.current_search += 1;
        }
        true
    }

    /// Walks from the root to a leaf by PUCT score, mirroring each selection
    /// on the scratch game handle. Returns the leaf and its outcome, if any.
    fn select_node(&mut self) -> (NodeId, Option<GameResult>) {
        self.env.clone_from(&self.stat);
        let mut node = self.root;
        while !self.arena.is_leaf(node) {
            node = self.arena.select_child(node);
            self.env
                .do_move(P::Move::from_action(self.arena.action(node) as usize));
        }
        (node, self.env.game_result())
    }

    /// Expands the suspended leaf with one child per legal action, taking
    /// each child's prior from the evaluator's distribution. The scratch
    /// handle still holds the leaf position from the suspension.
    fn expand_node(&mut self, leaf: NodeId, prior_probs: &[f32]) {
        self.temp_moves.clear();
        self.env.generate_moves(&mut self.temp_moves);
        self.temp_actions_probs.clear();
        for mv in &self.temp_moves {
            let action = mv.action();
            self.temp_actions_probs.push((action as u16, prior_probs[action]));
        }
        if leaf == self.root {
            if let Some(alpha) = self.setting.dirichlet() {
                apply_dirichlet(&mut self.temp_actions_probs, DIRICHLET_EPSILON, alpha);
            }
        }
        self.arena
            .expand(leaf, &self.temp_actions_probs, self.setting.c_puct());
    }

    /// Backs the value up from the leaf through the root, negating at each
    /// hop: a child's win is its parent's loss.
    fn backpropagate(&mut self, leaf: NodeId, value: f32) {
        let mut node = leaf;
        let mut value = value;
        loop {
            let parent = {
                let mut node_ref = self.arena.nodes.get_mut(node.0);
                node_ref.puct.update(value);
                node_ref.parent
            };
            match parent {
                Some(parent_node) => {
                    value = -value;
                    node = parent_node;
                }
                None => break,
            }
        }
    }

    /// Visit counts of the root children.
    ///
    /// Unless `allow_partial` is set, the search must have completed.
    pub fn get_result(&self, allow_partial: bool) -> Vec<(P::Move, u32)> {
        let root = self.arena.nodes.get(self.root.0);
        assert!(
            allow_partial || root.puct.visit_count >= self.setting.num_search(),
            "Search result requested after {} of {} simulations",
            root.puct.visit_count,
            self.setting.num_search()
        );
        match root.children {
            None => vec![],
            Some(list) => self
                .arena
                .child_lists
                .get(list.0)
                .iter()
                .map(|&child| {
                    let child = self.arena.nodes.get(child.0);
                    (
                        P::Move::from_action(child.action as usize),
                        child.puct.visit_count,
                    )
                })
                .collect(),
        }
    }

    /// The engine's game handle. While a search is suspended this holds the
    /// selected leaf, i.e. the position the evaluator is being asked about.
    pub fn position(&self) -> &P {
        &self.env
    }

    /// The snapshot every simulation is restored from.
    pub fn root_position(&self) -> &P {
        &self.stat
    }

    pub fn visits(&self) -> u32 {
        self.arena.nodes.get(self.root.0).puct.visit_count
    }

    /// Advances the snapshot by one move and rebuilds the tree from scratch:
    /// both arenas are released in bulk and the next search starts from a
    /// fresh root. The subtree under `mv` is not reused.
    pub fn step(&mut self, mv: P::Move) {
        self.env.clone_from(&self.stat);
        self.env.do_move(mv);
        self.stat.clone_from(&self.env);
        self.arena.clear();
        self.root = self.arena.new_root(self.setting.c_puct());
        self.current_search = 0;
        self.selected = None;
    }

    /// Prints human-readable statistics for the root children.
    pub fn print_info(&self) {
        let root = self.arena.nodes.get(self.root.0);
        println!("Total visit count: {}", root.puct.visit_count);
        let Some(list) = root.children else {
            return;
        };
        for &child_id in self.arena.child_lists.get(list.0).iter() {
            let child = self.arena.nodes.get(child_id.0);
            println!(
                "  Action: {} Visit count: {} Q value: {} Value: {}",
                child.action,
                child.puct.visit_count,
                child.puct.q_value,
                child.puct.value(root.puct.visit_count)
            );
        }
    }

    /// Walks the whole tree checking that every expanded node has been
    /// visited exactly once more than all of its children together.
    #[cfg(test)]
    pub(crate) fn assert_visit_invariant(&self) {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let node_ref = self.arena.nodes.get(node.0);
            let Some(list) = node_ref.children else {
                continue;
            };
            let children = self.arena.child_lists.get(list.0);
            let child_visits: u32 = children
                .iter()
                .map(|&child| self.arena.nodes.get(child.0).puct.visit_count)
                .sum();
            assert_eq!(node_ref.puct.visit_count, child_visits + 1);
            stack.extend(children.iter().copied());
        }
    }
}

/// Mixes Dirichlet noise into the priors of a freshly expanded root.
/// The noise is given `epsilon` weight. `alpha` is used to generate the
/// noise; lower values generate more varied noise.
fn apply_dirichlet(actions_probs: &mut [(u16, f32)], epsilon: f32, alpha: f32) {
    let mut rng = rand::thread_rng();
    let dirichlet = rand_distr::Dirichlet::new_with_size(alpha, actions_probs.len()).unwrap();
    let noise_vec = dirichlet.sample(&mut rng);
    for ((_, prior_prob), eta) in actions_probs.iter_mut().zip(noise_vec) {
        *prior_prob = *prior_prob * (1.0 - epsilon) + epsilon * eta;
    }
}
