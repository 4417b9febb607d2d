//! The arena of explored nodes for one decision.
//!
//! Nodes live in an `ego_tree::Tree` and refer to their parent and children through
//! `NodeId` indices, so there is no ownership cycle between parents and children.

use crate::board::{Board, Move};
use crate::mcts_node::MctsNode;
use crate::random::RandomGenerator;
use ego_tree::{NodeId, NodeRef, Tree};
use tracing::trace;

/// Visit and reward totals of one root move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveStatistics {
    /// The root move these totals belong to.
    pub mv: Move,
    /// Visits of the child reached by `mv`.
    pub visits: u32,
    /// Sum of the normalised rewards backpropagated through that child.
    pub total_reward: f64,
}

impl MoveStatistics {
    /// Average reward per visit, `0.0` when the move was never visited.
    pub fn mean_reward(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_reward / f64::from(self.visits)
        }
    }
}

/// Owns every node reachable from the root board of one decision.
pub struct SearchTree {
    tree: Tree<MctsNode>,
}

impl SearchTree {
    /// Creates a tree holding only the root node for `board`.
    pub fn new(board: Board) -> Self {
        Self {
            tree: Tree::new(MctsNode::new(board)),
        }
    }

    /// Creates a tree with room for `capacity` nodes without reallocating.
    pub fn with_capacity(board: Board, capacity: usize) -> Self {
        Self {
            tree: Tree::with_capacity(MctsNode::new(board), capacity),
        }
    }

    /// Id of the root node.
    pub fn root_id(&self) -> NodeId {
        self.tree.root().id()
    }

    /// Data of the root node.
    pub fn root(&self) -> &MctsNode {
        self.tree.root().value()
    }

    /// Data of the node `id`, or `None` when the id belongs to another tree.
    pub fn node(&self, id: NodeId) -> Option<&MctsNode> {
        self.tree.get(id).map(|node| node.value())
    }

    /// Parent of `id`; `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.get(id)?.parent().map(|parent| parent.id())
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        self.tree.nodes().count()
    }

    /// The child reached from `id` by `mv`, if that move has been expanded.
    pub fn child_for(&self, id: NodeId, mv: Move) -> Option<NodeId> {
        self.tree
            .get(id)?
            .children()
            .find(|child| child.value().prev_move == Some(mv))
            .map(|child| child.id())
    }

    /// Descends from the root by UCT and returns the path, root first.
    ///
    /// Descent stops at the first node that still has untried moves, or at a terminal
    /// node. Only fully expanded nodes are descended through.
    pub fn select(&self, exploration_constant: f64) -> Vec<NodeId> {
        let mut current = self.tree.root();
        let mut path = vec![current.id()];

        loop {
            let node = current.value();
            if node.is_terminal() || node.has_untried_moves() {
                break;
            }

            let mut best: Option<(NodeRef<'_, MctsNode>, f64)> = None;
            for child in current.children() {
                let score = child.value().uct(node.visits, exploration_constant);
                if best.is_none_or(|(_, best_score)| score > best_score) {
                    best = Some((child, score));
                }
            }

            match best {
                Some((child, _)) => {
                    path.push(child.id());
                    current = child;
                }
                None => break,
            }
        }

        path
    }

    /// Expands the first untried move of `id`: slides, spawns a tile and attaches the
    /// resulting node. Returns `None` when `id` has nothing left to expand.
    pub fn expand<K: RandomGenerator>(&mut self, id: NodeId, rng: &mut K) -> Option<NodeId> {
        let mut node = self.tree.get_mut(id)?;
        let parent = node.value();
        if parent.untried.is_empty() {
            return None;
        }

        let mv = parent.untried.remove(0);
        let height = parent.height;
        let outcome = parent.board.apply_move(mv);
        let board = outcome.board.spawn_tile(rng).unwrap_or(outcome.board);

        let child = node.append(MctsNode::child(board, mv, outcome.gained, height));
        trace!(?mv, height = height + 1, gained = outcome.gained, "expanded node");
        Some(child.id())
    }

    /// Adds one visit and `reward` to every node on `path`, leaf first.
    pub fn backpropagate(&mut self, path: &[NodeId], reward: f64) {
        for &id in path.iter().rev() {
            if let Some(mut node) = self.tree.get_mut(id) {
                let data = node.value();
                data.visits += 1;
                data.total_reward += reward;
            }
        }
    }

    /// Statistics of every expanded root move, in `Move::ALL` order.
    pub fn root_statistics(&self) -> Vec<MoveStatistics> {
        let mut statistics: Vec<MoveStatistics> = self
            .tree
            .root()
            .children()
            .filter_map(|child| {
                let data = child.value();
                data.prev_move.map(|mv| MoveStatistics {
                    mv,
                    visits: data.visits,
                    total_reward: data.total_reward,
                })
            })
            .collect();
        statistics.sort_by_key(|s| s.mv);
        statistics
    }

    /// Copies the subtree under the root's `mv` child into a new tree rooted there.
    pub fn reroot(&self, mv: Move) -> Option<SearchTree> {
        let child_id = self.child_for(self.root_id(), mv)?;
        let child = self.tree.get(child_id)?;
        let offset = child.value().height;

        let mut root = child.value().clone();
        root.prev_move = None;
        root.gained = 0;
        root.height = 0;
        let mut tree = Tree::new(root);

        let mut stack = vec![(child_id, tree.root().id())];
        while let Some((source_id, target_id)) = stack.pop() {
            let Some(source) = self.tree.get(source_id) else {
                continue;
            };
            for source_child in source.children() {
                let mut data = source_child.value().clone();
                data.height -= offset;
                let Some(mut target) = tree.get_mut(target_id) else {
                    continue;
                };
                let copied = target.append(data).id();
                stack.push((source_child.id(), copied));
            }
        }

        let rerooted = SearchTree { tree };
        trace!(?mv, nodes = rerooted.node_count(), "rerooted search tree");
        Some(rerooted)
    }
}
