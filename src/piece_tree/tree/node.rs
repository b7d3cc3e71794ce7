use std::mem;
use std::sync::Arc;

use super::piece::{Piece, Stats};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
    BlackBlack,
    NegativeBlack,
}

impl Color {
    #[inline]
    pub fn blacken(&mut self) {
        match *self {
            Color::Red => *self = Color::Black,
            Color::Black => *self = Color::BlackBlack,
            Color::BlackBlack => unreachable!(),
            Color::NegativeBlack => *self = Color::Red,
        }
    }

    #[inline]
    pub fn redden(&mut self) {
        match *self {
            Color::Red => *self = Color::NegativeBlack,
            Color::Black => *self = Color::Red,
            Color::BlackBlack => *self = Color::Black,
            Color::NegativeBlack => unreachable!(),
        }
    }
}

/// Red black tree node types. `Leaf` doubles as the shared nil child,
/// `BBLeaf` is the double-black leaf that appears transiently during
/// deletion.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    Leaf,
    BBLeaf,
    Internal(InternalNode),
}

impl Node {
    #[inline]
    pub fn new(color: Color, piece: Piece) -> Node {
        Node::Internal(InternalNode::new(color, piece))
    }

    #[inline]
    pub fn color(&self) -> Color {
        match self {
            Node::Internal(n) => n.color,
            Node::Leaf => Color::Black,
            Node::BBLeaf => Color::BlackBlack,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Node::Internal(_))
    }

    #[inline]
    pub fn redden(&mut self) {
        match self {
            Node::Leaf => unreachable!(),
            Node::BBLeaf => *self = Node::Leaf,
            Node::Internal(n) => n.redden(),
        }
    }

    #[inline]
    pub fn internal(&mut self) -> &mut InternalNode {
        match self {
            Node::Internal(n) => n,
            _ => unreachable!("expected an internal node"),
        }
    }

    #[inline]
    pub fn internal_ref(&self) -> Option<&InternalNode> {
        match self {
            Node::Internal(n) => Some(n),
            _ => None,
        }
    }

    /// Remove this node from the tree, leaving a (possibly double-black)
    /// leaf or pulling a child or in-order predecessor into its place.
    pub fn remove(&mut self) {
        match self {
            Node::Internal(n) => match (n.left.is_leaf(), n.right.is_leaf()) {
                (true, true) => match self.color() {
                    Color::Red => *self = Node::Leaf,
                    Color::Black => *self = Node::BBLeaf,
                    _ => unreachable!(),
                },
                (true, false) => {
                    if n.color == Color::Black && n.right.color() == Color::Red {
                        let mut right = n.take_right();
                        let right = Arc::make_mut(&mut right).internal();
                        mem::swap(n, right);
                        n.color = Color::Black;
                    }
                }
                (false, true) => {
                    if n.color == Color::Black && n.left.color() == Color::Red {
                        let mut left = n.take_left();
                        let left = Arc::make_mut(&mut left).internal();
                        mem::swap(n, left);
                        n.color = Color::Black;
                    }
                }
                (false, false) => {
                    let left = Arc::make_mut(&mut n.left);
                    let piece = left.remove_max();
                    n.left_stats -= piece.stats();
                    n.piece = piece;
                    n.bubble();
                }
            },
            _ => unreachable!(),
        }
    }

    /// Detach and return the piece of the in-order last node below.
    pub fn remove_max(&mut self) -> Piece {
        fn rec(node: &mut Node) -> Piece {
            match node {
                Node::Internal(n) => {
                    if n.right.is_leaf() {
                        let piece = n.piece.clone();
                        node.remove();
                        piece
                    } else {
                        let right = Arc::make_mut(&mut n.right);
                        let piece = rec(right);
                        n.bubble();
                        piece
                    }
                }
                _ => unreachable!(),
            }
        }

        rec(self)
    }
}

impl From<InternalNode> for Node {
    fn from(n: InternalNode) -> Self {
        Node::Internal(n)
    }
}

/// Internal node in the red black tree.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct InternalNode {
    pub(crate) left: Arc<Node>,
    pub(crate) right: Arc<Node>,
    pub(crate) color: Color,

    /// Data in the tree
    pub(crate) piece: Piece,
    /// Byte and line feed totals of the left subtree. These let lookups
    /// descend by offset or by line number without touching buffers.
    pub(crate) left_stats: Stats,
}

impl InternalNode {
    pub fn new(color: Color, piece: Piece) -> InternalNode {
        InternalNode {
            left: Arc::new(Node::Leaf),
            right: Arc::new(Node::Leaf),
            color,
            piece,
            left_stats: Stats::default(),
        }
    }

    /// Matt Might's deletion function. Bubbles up the BlackBlack nodes.
    pub fn bubble(&mut self) {
        use Color::BlackBlack as BB;

        if self.left.color() == BB || self.right.color() == BB {
            self.blacken();

            let left = Arc::make_mut(&mut self.left);
            left.redden();

            let right = Arc::make_mut(&mut self.right);
            right.redden();
        }

        self.balance();
    }

    #[inline]
    pub fn blacken(&mut self) {
        self.color.blacken();
    }

    #[inline]
    pub fn redden(&mut self) {
        self.color.redden();
    }

    #[inline]
    pub fn take_left(&mut self) -> Arc<Node> {
        mem::replace(&mut self.left, Arc::new(Node::Leaf))
    }

    #[inline]
    pub fn take_right(&mut self) -> Arc<Node> {
        mem::replace(&mut self.right, Arc::new(Node::Leaf))
    }

    /// Insert a piece as the in-order predecessor of this node.
    pub fn insert_left(&mut self, piece: Piece) {
        fn ins_right(node: &mut InternalNode, piece: Piece) {
            let right = Arc::make_mut(&mut node.right);
            match right {
                Node::Internal(r) => {
                    ins_right(r, piece);
                    r.balance();
                }
                _ => {
                    node.right = Arc::new(InternalNode::new(Color::Red, piece).into());
                }
            }
        }

        let left = Arc::make_mut(&mut self.left);

        match left {
            Node::Internal(l) => {
                ins_right(l, piece);
                l.balance();
            }
            _ => {
                self.left = Arc::new(InternalNode::new(Color::Red, piece).into());
            }
        }
    }

    /// Insert a piece as the in-order successor of this node.
    pub fn insert_right(&mut self, piece: Piece) {
        fn ins_left(node: &mut InternalNode, piece: Piece) {
            node.left_stats += piece.stats();

            let left = Arc::make_mut(&mut node.left);
            match left {
                Node::Internal(l) => {
                    ins_left(l, piece);
                    l.balance();
                }
                _ => {
                    node.left = Arc::new(InternalNode::new(Color::Red, piece).into());
                }
            }
        }

        let right = Arc::make_mut(&mut self.right);
        match right {
            Node::Internal(r) => {
                ins_left(r, piece);
                r.balance();
            }
            _ => {
                self.right = Arc::new(InternalNode::new(Color::Red, piece).into());
            }
        }
    }

    /// Balance function using Chris Okasakis insertion method and Matt
    /// Mights deletion method. Every case keeps `left_stats` in step with
    /// the re-linked subtrees.
    pub fn balance(&mut self) {
        use Color::{Black as B, NegativeBlack as NB, Red as R};

        #[inline]
        fn internal_color(n: &Arc<Node>) -> Option<Color> {
            match n.as_ref() {
                Node::Internal(n) => Some(n.color),
                _ => None,
            }
        }

        #[inline]
        fn internal_tree_colors(n: &Arc<Node>) -> (Option<Color>, Option<Color>, Option<Color>) {
            match n.as_ref() {
                Node::Internal(n) => {
                    let left = internal_color(&n.left);
                    let right = internal_color(&n.right);
                    (Some(n.color), left, right)
                }
                _ => (None, None, None),
            }
        }

        if self.color == R || self.color == NB {
            return;
        }

        // Color is Black or BlackBlack

        let (color_l, color_l_l, color_l_r) = internal_tree_colors(&self.left);
        let (color_r, color_r_l, color_r_r) = internal_tree_colors(&self.right);

        match (color_l, color_l_l, color_l_r, color_r, color_r_l, color_r_r) {
            // Okasakis insertion cases and Mights deletion combined as they
            // are very similar
            (Some(R), Some(R), ..) => {
                //       zB                     yR
                //      / \                    /  \
                //     yR   d                 xB   zB
                //    / \          ==>       / \   / \
                //   xR   c                 a   b c   d
                //  / \
                // a   b
                let mut y_ptr = self.take_left();
                let y = Arc::make_mut(&mut y_ptr).internal();
                let mut x_ptr = y.take_left();
                let x = Arc::make_mut(&mut x_ptr).internal();

                self.color.redden();
                y.color = B;
                x.color = B;

                self.left_stats -= y.piece.stats() + y.left_stats;

                mem::swap(&mut self.piece, &mut y.piece);
                mem::swap(&mut self.left_stats, &mut y.left_stats);
                mem::swap(&mut y.left, &mut y.right);
                mem::swap(&mut self.right, &mut y.right);

                self.left = x_ptr;
                self.right = y_ptr;
            }
            (Some(R), _, Some(R), ..) => {
                //       zB                     yR
                //      / \                    /  \
                //     xR   d                 xB   zB
                //    / \          ==>       / \   / \
                //   a   yR                 a   b c   d
                //      / \
                //     b   c
                let mut x_ptr = self.take_left();
                let x = Arc::make_mut(&mut x_ptr).internal();
                let mut y_ptr = x.take_right();
                let y = Arc::make_mut(&mut y_ptr).internal();

                self.redden();
                x.color = B;
                y.color = B;

                self.left_stats -=
                    x.piece.stats() + x.left_stats + y.left_stats + y.piece.stats();

                y.left_stats += x.piece.stats() + x.left_stats;

                mem::swap(&mut self.piece, &mut y.piece);
                mem::swap(&mut self.left_stats, &mut y.left_stats);
                mem::swap(&mut y.left, &mut y.right);
                mem::swap(&mut x.right, &mut y.right);
                mem::swap(&mut self.right, &mut y.right);

                self.right = y_ptr;
                self.left = x_ptr;
            }
            (.., Some(R), Some(R), _) => {
                //       xB                     yR
                //      / \                    /  \
                //     a   zR                 xB   zB
                //        /  \     ==>       / \   / \
                //       yR   d             a   b c   d
                //      / \
                //     b   c
                let mut z_ptr = self.take_right();
                let z = Arc::make_mut(&mut z_ptr).internal();
                let mut y_ptr = z.take_left();
                let y = Arc::make_mut(&mut y_ptr).internal();

                self.color.redden();
                z.color = B;
                y.color = B;

                z.left_stats -= y.left_stats + y.piece.stats();
                y.left_stats += self.left_stats + self.piece.stats();

                mem::swap(&mut self.piece, &mut y.piece);
                mem::swap(&mut self.left_stats, &mut y.left_stats);
                mem::swap(&mut z.left, &mut y.right);
                mem::swap(&mut y.left, &mut y.right);
                mem::swap(&mut self.left, &mut y.left);

                self.left = y_ptr;
                self.right = z_ptr;
            }
            (.., Some(R), _, Some(R)) => {
                //       xB                     yR
                //      / \                    /  \
                //     a   yR                 xB   zB
                //        /  \     ==>       / \   / \
                //       b    zR            a   b c   d
                //           /  \
                //          c    d
                let mut y_ptr = self.take_right();
                let y = Arc::make_mut(&mut y_ptr).internal();
                let mut z_ptr = y.take_right();
                let z = Arc::make_mut(&mut z_ptr).internal();

                self.color.redden();
                y.color = B;
                z.color = B;

                y.left_stats += self.left_stats + self.piece.stats();

                mem::swap(&mut self.piece, &mut y.piece);
                mem::swap(&mut self.left_stats, &mut y.left_stats);
                mem::swap(&mut y.left, &mut y.right);
                mem::swap(&mut self.left, &mut y.left);

                self.right = z_ptr;
                self.left = y_ptr;
            }
            // Mights negative black cases
            (.., Some(NB), Some(B), Some(B)) => {
                //        xBB                    yB
                //       / \                    /  \
                //      a   zNB                xB   zB
                //         /   \     ==>      / \   / \
                //        yB    wB           a   b c   wR
                //       / \   /  \                   /  \
                //      b   c d    e                 d    e
                //
                let mut z_ptr = self.take_right();
                let z = Arc::make_mut(&mut z_ptr).internal();
                let mut y_ptr = z.take_left();
                let y = Arc::make_mut(&mut y_ptr).internal();
                let mut w_ptr = z.take_right();
                let w = Arc::make_mut(&mut w_ptr).internal();

                self.color = B;
                z.color = B;
                y.color = B;
                w.color = R;

                z.left_stats -= y.piece.stats() + y.left_stats;
                y.left_stats = self.left_stats + y.left_stats + self.piece.stats();

                mem::swap(&mut self.piece, &mut y.piece);
                mem::swap(&mut self.left_stats, &mut y.left_stats);
                mem::swap(&mut y.left, &mut y.right);
                mem::swap(&mut y.left, &mut self.left);

                mem::swap(&mut self.left, &mut z.left);

                z.right = w_ptr;
                z.balance();

                self.left = y_ptr;
                self.right = z_ptr;
            }
            (Some(NB), Some(B), Some(B), ..) => {
                //        zBB                    yB
                //       /   \                  /  \
                //      xNB   d                xB   zB
                //    /    \         ==>      / \   / \
                //   wB    yB                wR  b c   d
                //  / \    / \              /  \
                // a'  b' b   c            a'   b'
                //
                let mut x_ptr = self.take_left();
                let x = Arc::make_mut(&mut x_ptr).internal();
                let mut w_ptr = x.take_left();
                let w = Arc::make_mut(&mut w_ptr).internal();
                let mut y_ptr = x.take_right();
                let y = Arc::make_mut(&mut y_ptr).internal();

                self.color = B;
                x.color = B;
                y.color = B;
                w.color = R;

                self.left_stats -=
                    x.piece.stats() + x.left_stats + y.piece.stats() + y.left_stats;

                y.left_stats += x.piece.stats() + x.left_stats;

                mem::swap(&mut self.piece, &mut y.piece);
                mem::swap(&mut self.left_stats, &mut y.left_stats);
                mem::swap(&mut y.left, &mut y.right);
                mem::swap(&mut self.right, &mut y.right);
                mem::swap(&mut self.right, &mut x.right);

                x.left = w_ptr;
                x.balance();

                self.left = x_ptr;
                self.right = y_ptr;
            }
            _ => {}
        }
    }
}
