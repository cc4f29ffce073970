use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace};

use crate::error::{JpegError, Result};
use crate::huffman_table::{HuffmanSpec, MAX_CODE_LENGTH};

/// Symbol held by the extra leaf that reserves the all-ones code.
const PLACEHOLDER: u16 = 256;

type NodeId = usize;

#[derive(Debug, Eq)]
pub(crate) struct HeapItem {
    freq: u64,
    order: usize,
    node: NodeId,
}

impl HeapItem {
    fn from(freq: u64, order: usize, node: NodeId) -> Self {
        HeapItem { freq, order, node }
    }
}

/// Reversed so `BinaryHeap` pops the lowest frequency first; ties go to the earlier node.
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .freq
            .cmp(&self.freq)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.order == other.order
    }
}

#[derive(Debug, Clone, Default)]
struct HuffmanNode {
    symbol: Option<u16>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

impl HuffmanNode {
    fn new_leaf(symbol: u16) -> Self {
        HuffmanNode {
            symbol: Some(symbol),
            ..Default::default()
        }
    }

    fn is_leaf(&self) -> bool {
        self.symbol.is_some()
    }
}

/// Frequency-driven Huffman tree with node references held as arena indices.
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    root: NodeId,
    depth: usize,
}

impl HuffmanTree {
    /// Builds a code for the 256 byte symbols, limited to 16-bit lengths, in which no real
    /// symbol receives the all-ones code of the longest length.
    ///
    /// A placeholder leaf weighted just below the most frequent symbol joins the merge. Once
    /// the tree is complete the rightmost (all-ones) leaf is dropped and its symbol moves into
    /// the placeholder's position.
    pub fn build(freqs: &[u32; 256]) -> Result<HuffmanSpec> {
        let max_freq = freqs.iter().copied().max().unwrap_or(0);
        if max_freq == 0 {
            return Ok(HuffmanSpec {
                counts: [0; MAX_CODE_LENGTH],
                symbols: vec![],
            });
        }

        let mut tree = Self::merge(freqs, max_freq);
        tree.setup_depths();

        while tree.depth > MAX_CODE_LENGTH {
            debug!("Huffman tree depth {} > {MAX_CODE_LENGTH}; adjusting leaves", tree.depth);
            tree.rebalance()?;
            tree.setup_depths();
        }

        tree.reserve_all_ones();
        Ok(tree.to_spec())
    }

    fn merge(freqs: &[u32; 256], max_freq: u32) -> Self {
        let mut nodes = vec![];
        let mut min_heap = BinaryHeap::new();

        let weights = freqs
            .iter()
            .enumerate()
            .map(|(symbol, &freq)| (symbol as u16, freq as u64))
            .chain(std::iter::once((PLACEHOLDER, max_freq.saturating_sub(1).max(1) as u64)));

        for (symbol, freq) in weights.filter(|(_, freq)| *freq > 0) {
            nodes.push(HuffmanNode::new_leaf(symbol));
            min_heap.push(HeapItem::from(freq, nodes.len() - 1, nodes.len() - 1));
        }

        while min_heap.len() > 1 {
            match (min_heap.pop(), min_heap.pop()) {
                (Some(left), Some(right)) => {
                    let parent = nodes.len();
                    nodes[left.node].parent = Some(parent);
                    nodes[right.node].parent = Some(parent);
                    nodes.push(HuffmanNode {
                        symbol: None,
                        left: Some(left.node),
                        right: Some(right.node),
                        parent: None,
                    });

                    min_heap.push(HeapItem::from(left.freq + right.freq, parent, parent));
                }
                _ => break,
            }
        }

        let root = min_heap.pop().map(|item| item.node).unwrap_or(0);

        HuffmanTree {
            nodes,
            root,
            depth: 0,
        }
    }

    /// Leaves grouped by depth, each level ordered left to right.
    fn leaves_by_level(&self) -> Vec<Vec<NodeId>> {
        let mut levels: Vec<Vec<NodeId>> = vec![];
        let mut stack = vec![(self.root, 0usize)];

        while let Some((id, level)) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                if levels.len() <= level {
                    levels.resize(level + 1, vec![]);
                }
                levels[level].push(id);
                continue;
            }
            if let Some(right) = node.right {
                stack.push((right, level + 1));
            }
            if let Some(left) = node.left {
                stack.push((left, level + 1));
            }
        }

        levels
    }

    fn setup_depths(&mut self) {
        self.depth = self.leaves_by_level().len().saturating_sub(1);
    }

    fn find_leaf_at_level(&self, level: usize) -> Option<NodeId> {
        self.leaves_by_level().get(level)?.first().copied()
    }

    /// Takes the two sibling leaves at the deepest level: the right one replaces their parent,
    /// the left one and the symbol of a shallower leaf hang off that leaf as a new pair.
    fn rebalance(&mut self) -> Result<()> {
        let depth = self.depth;
        let src = self
            .find_leaf_at_level(depth)
            .ok_or_else(|| JpegError::InvalidParameter("Huffman tree lost its deepest leaf".into()))?;
        let parent = self.nodes[src]
            .parent
            .ok_or_else(|| JpegError::InvalidParameter("Huffman tree root is a leaf".into()))?;

        let (Some(left), Some(right)) = (self.nodes[parent].left, self.nodes[parent].right) else {
            return Err(JpegError::InvalidParameter("unbalanced Huffman node".into()));
        };

        self.nodes[parent].symbol = self.nodes[right].symbol;
        self.nodes[parent].left = None;
        self.nodes[parent].right = None;

        let dest = (2..=depth)
            .find_map(|level| self.find_leaf_at_level(depth - level))
            .ok_or_else(|| JpegError::InvalidParameter("no leaf to host relocated pair".into()))?;

        self.nodes[right].symbol = self.nodes[dest].symbol.take();
        self.nodes[dest].left = Some(left);
        self.nodes[dest].right = Some(right);
        self.nodes[left].parent = Some(dest);
        self.nodes[right].parent = Some(dest);

        Ok(())
    }

    /// Removes the rightmost leaf and hands its symbol to the placeholder leaf.
    fn reserve_all_ones(&mut self) {
        let mut id = self.root;
        while let Some(right) = self.nodes[id].right {
            id = right;
        }

        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        self.nodes[parent].right = None;

        let removed = self.nodes[id].symbol;
        if let Some(placeholder) = self
            .nodes
            .iter()
            .position(|n| n.symbol == Some(PLACEHOLDER) && n.parent.is_some())
        {
            if placeholder != id {
                trace!("placeholder takes symbol {removed:?}");
                self.nodes[placeholder].symbol = removed;
            }
        }
        self.nodes[id].parent = None;
    }

    fn to_spec(&self) -> HuffmanSpec {
        let mut counts = [0u8; MAX_CODE_LENGTH];
        let mut symbols = vec![];

        for (level, leaves) in self.leaves_by_level().iter().enumerate().skip(1) {
            for &id in leaves {
                if let Some(symbol) = self.nodes[id].symbol.filter(|s| *s < PLACEHOLDER) {
                    counts[level - 1] += 1;
                    symbols.push(symbol as u8);
                }
            }
        }

        HuffmanSpec { counts, symbols }
    }
}
