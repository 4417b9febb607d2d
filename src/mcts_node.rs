use crate::board::{Board, Move};

/// Represents a single node in the Monte Carlo search tree.
///
/// Parent and child links live in the tree's arena; a node only carries its own position
/// and statistics.
#[derive(Debug, Clone)]
pub struct MctsNode {
    /// The position this node represents, after the move and the tile spawn that led here.
    pub board: Board,
    /// The move that led to this node from its parent. `None` for the root node.
    pub prev_move: Option<Move>,
    /// Merged value gained by `prev_move`.
    pub gained: u64,
    /// The depth of the node in the tree.
    pub height: u32,
    /// The number of times this node has been visited during the search.
    pub visits: u32,
    /// Sum of all rollout rewards backpropagated through this node.
    pub total_reward: f64,
    /// Legal moves without a child yet, in `Move::ALL` order.
    pub untried: Vec<Move>,
    /// No legal move exists from `board`.
    pub terminal: bool,
}

impl MctsNode {
    pub fn new(board: Board) -> Self {
        let untried = board.legal_moves();
        MctsNode {
            board,
            prev_move: None,
            gained: 0,
            height: 0,
            visits: 0,
            total_reward: 0.0,
            terminal: untried.is_empty(),
            untried,
        }
    }

    /// Creates the node reached from a parent at `parent_height` by playing `mv`.
    pub fn child(board: Board, mv: Move, gained: u64, parent_height: u32) -> Self {
        MctsNode {
            prev_move: Some(mv),
            gained,
            height: parent_height + 1,
            ..MctsNode::new(board)
        }
    }

    /// `total_reward / visits`, zero for a node that was never visited.
    pub fn mean_reward(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_reward / f64::from(self.visits)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn has_untried_moves(&self) -> bool {
        !self.untried.is_empty()
    }

    /// UCT score of this node as a child of a parent with `parent_visits` visits.
    pub fn uct(&self, parent_visits: u32, exploration_constant: f64) -> f64 {
        if self.visits == 0 {
            return f64::INFINITY;
        }
        let visits = f64::from(self.visits);
        self.mean_reward()
            + exploration_constant * (f64::from(parent_visits).ln() / visits).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_lists_legal_moves() {
        let board = Board::from_rows([[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap();

        let node = MctsNode::new(board);

        assert_eq!(node.untried, vec![Move::Down, Move::Right]);
        assert_eq!(node.visits, 0);
        assert_eq!(node.mean_reward(), 0.0);
        assert!(!node.is_terminal());
    }

    #[test]
    fn child_inherits_height() {
        let board = Board::from_rows([[4, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 2], [0, 0, 0, 0]]).unwrap();

        let node = MctsNode::child(board, Move::Left, 4, 2);

        assert_eq!(node.height, 3);
        assert_eq!(node.prev_move, Some(Move::Left));
        assert_eq!(node.gained, 4);
    }

    #[test]
    fn uct_prefers_unvisited_then_balances() {
        let board = Board::from_rows([[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap();
        let mut rich = MctsNode::new(board);
        rich.visits = 10;
        rich.total_reward = 8.0;
        let mut poor = MctsNode::new(board);
        poor.visits = 2;
        poor.total_reward = 0.2;
        let fresh = MctsNode::new(board);

        assert_eq!(fresh.uct(12, 1.4), f64::INFINITY);
        assert!((rich.mean_reward() - 0.8).abs() < 1e-12);
        assert!(rich.uct(12, 0.0) > poor.uct(12, 0.0));
        assert!(poor.uct(12, 5.0) > rich.uct(12, 5.0));
    }
}
