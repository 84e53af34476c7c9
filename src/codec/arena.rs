use std::collections::VecDeque;

use crate::codec::CodecError;
use crate::constants::MAX_NODES;

/// Linked lists and trees are stored as flat node arenas with index links.
/// Indices only ever point at previously created nodes, so a value owns its
/// whole structure and cannot contain cycles.
#[derive(Clone, Debug, PartialEq)]
pub struct ListNode {
    pub val: i32,
    pub next: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListValue {
    nodes: Vec<ListNode>,
    head: Option<usize>,
}

impl ListValue {
    pub fn empty() -> Self {
        ListValue {
            nodes: Vec::new(),
            head: None,
        }
    }

    /// Array notation read left to right: each element becomes one node,
    /// chained in order. An empty slice yields the absent head.
    pub fn from_values(vals: &[i32]) -> Result<Self, CodecError> {
        if vals.len() > MAX_NODES {
            return Err(CodecError::TooManyNodes(vals.len()));
        }
        let nodes = vals
            .iter()
            .enumerate()
            .map(|(i, &val)| ListNode {
                val,
                next: (i + 1 < vals.len()).then_some(i + 1),
            })
            .collect();
        Ok(ListValue {
            nodes,
            head: (!vals.is_empty()).then_some(0),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Walks head to tail. Bounded by the node count, so a corrupted chain
    /// terminates instead of looping.
    pub fn values(&self) -> Vec<i32> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut cur = self.head;
        while let Some(i) = cur {
            if out.len() == self.nodes.len() {
                break;
            }
            let node = &self.nodes[i];
            out.push(node.val);
            cur = node.next;
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub val: i32,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeValue {
    nodes: Vec<TreeNode>,
    root: Option<usize>,
}

impl TreeValue {
    pub fn empty() -> Self {
        TreeValue {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Reconstructs a tree from level-order tokens where `None` marks an
    /// absent child. Proceeds breadth-first, consuming two tokens (left,
    /// right) per pending parent until the stream is exhausted. Non-null
    /// tokens left over once no parent can adopt them are malformed input.
    pub fn from_level_order(tokens: &[Option<i32>]) -> Result<Self, CodecError> {
        if tokens.len() > MAX_NODES {
            return Err(CodecError::TooManyNodes(tokens.len()));
        }
        let Some(Some(root_val)) = tokens.first().copied() else {
            return Ok(Self::empty());
        };

        let mut nodes = vec![TreeNode {
            val: root_val,
            left: None,
            right: None,
        }];
        let mut pending = VecDeque::from([0usize]);
        let mut i = 1;

        while i < tokens.len() {
            let Some(parent) = pending.pop_front() else {
                if tokens[i..].iter().all(Option::is_none) {
                    break;
                }
                return Err(CodecError::Malformed(
                    "level-order tokens continue past the last attachable parent".to_string(),
                ));
            };

            for is_right in [false, true] {
                if i >= tokens.len() {
                    break;
                }
                if let Some(val) = tokens[i] {
                    let idx = nodes.len();
                    nodes.push(TreeNode {
                        val,
                        left: None,
                        right: None,
                    });
                    if is_right {
                        nodes[parent].right = Some(idx);
                    } else {
                        nodes[parent].left = Some(idx);
                    }
                    pending.push_back(idx);
                }
                i += 1;
            }
        }

        Ok(TreeValue {
            nodes,
            root: Some(0),
        })
    }

    /// Inverse breadth-first walk emitting `None` for absent children,
    /// with trailing `None`s trimmed.
    pub fn to_level_order(&self) -> Vec<Option<i32>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root else {
            return out;
        };

        let mut queue = VecDeque::from([Some(root)]);
        let mut visited = 0usize;
        while let Some(slot) = queue.pop_front() {
            match slot {
                Some(i) => {
                    visited += 1;
                    if visited > self.nodes.len() {
                        break;
                    }
                    let node = &self.nodes[i];
                    out.push(Some(node.val));
                    queue.push_back(node.left);
                    queue.push_back(node.right);
                }
                None => out.push(None),
            }
        }

        while matches!(out.last(), Some(None)) {
            out.pop();
        }
        out
    }
}
