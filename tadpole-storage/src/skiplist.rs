//! The ordered key/value map at the heart of tadpole: a skiplist paired
//! with a hash set mirroring key membership.
//!
//! The reactor is single-threaded and every handler runs to completion
//! between polls (no other thread ever touches this structure), so
//! mutating operations simply take `&mut self` — there is no locking or
//! atomics here, unlike a concurrent skiplist.
//!
//! Nodes live in an arena (`Vec<Option<Node>>`) addressed by index rather
//! than behind individual heap pointers, so there is no unsafe code and
//! no dangling-reference risk. Deleted slots are pushed onto a free list
//! and reused by the next insert.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use tadpole_core::{Key, Value};

/// Maximum height of the skiplist, per §3/§4.1/§5.
pub const MAX_HEIGHT: usize = 16;

type NodeIdx = usize;

struct Node {
    key: Key,
    value: Value,
    /// `forward[i]` is the arena index of this node's successor at level `i`.
    forward: Vec<Option<NodeIdx>>,
}

/// The dual-indexed ordered map: a skiplist for ordered scans and O(log n)
/// search, plus a hash set mirroring key membership for O(1) existence
/// checks. The two structures are maintained in lockstep by every
/// mutating operation; see §3's "Ownership summary" and §8 property 1.
pub struct SkipMap {
    arena: Vec<Option<Node>>,
    free: Vec<NodeIdx>,
    /// `head[i]` is the arena index of the first node at level `i`.
    head: Vec<Option<NodeIdx>>,
    level: usize,
    length: usize,
    members: HashSet<Key>,
    rng: StdRng,
}

impl SkipMap {
    /// Creates an empty map. The height RNG is seeded once, here, from a
    /// process-unique source (§4.1: "seeded once at startup").
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            free: Vec::new(),
            head: vec![None; MAX_HEIGHT],
            level: 1,
            length: 0,
            members: HashSet::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Fair-coin height: start at 1, flip heads to keep growing, stop on
    /// tails, capped at `MAX_HEIGHT`. `P(h >= k) = 2^-(k-1)`.
    fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < MAX_HEIGHT && self.rng.gen_bool(0.5) {
            height += 1;
        }
        height
    }

    fn node(&self, idx: NodeIdx) -> &Node {
        self.arena[idx].as_ref().expect("arena slot must be occupied")
    }

    fn forward_at(&self, idx: Option<NodeIdx>, level: usize) -> Option<NodeIdx> {
        match idx {
            None => self.head[level],
            Some(i) => self.node(i).forward[level],
        }
    }

    /// Walks from the top level down, filling `update[i]` with the index
    /// of the last node at level `i` whose key is strictly less than
    /// `key` (or `None` for "the head"). Returns the successor of
    /// `update[0]`, which is the node matching `key` if present.
    fn find_predecessors(&self, key: &[u8], update: &mut [Option<NodeIdx>]) -> Option<NodeIdx> {
        let mut pred: Option<NodeIdx> = None;
        for level in (0..self.level).rev() {
            let mut curr = self.forward_at(pred, level);
            while let Some(c) = curr {
                if self.node(c).key.as_slice() < key {
                    pred = Some(c);
                    curr = self.forward_at(pred, level);
                } else {
                    break;
                }
            }
            update[level] = pred;
        }
        self.forward_at(pred, 0)
    }

    fn alloc(&mut self, node: Node) -> NodeIdx {
        if let Some(idx) = self.free.pop() {
            self.arena[idx] = Some(node);
            idx
        } else {
            self.arena.push(Some(node));
            self.arena.len() - 1
        }
    }

    /// If `key` is absent, links a new node at a randomly chosen height and
    /// adds `key` to the membership set. If `key` is already present,
    /// overwrites the value in place — no new node, no membership-set
    /// touch, and (deviating from the original C, see DESIGN.md) no
    /// change to `length`.
    pub fn insert(&mut self, key: Key, value: Value) {
        let mut update = vec![None; MAX_HEIGHT];
        if let Some(existing) = self.find_predecessors(&key, &mut update) {
            if self.node(existing).key == key {
                self.arena[existing].as_mut().unwrap().value = value;
                return;
            }
        }

        let height = self.random_height();
        if height > self.level {
            for slot in update.iter_mut().take(height).skip(self.level) {
                *slot = None;
            }
            self.level = height;
        }

        let mut forward = vec![None; height];
        for (level, slot) in forward.iter_mut().enumerate() {
            *slot = self.forward_at(update[level], level);
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            forward,
        });

        for level in 0..height {
            match update[level] {
                None => self.head[level] = Some(idx),
                Some(p) => self.arena[p].as_mut().unwrap().forward[level] = Some(idx),
            }
        }

        self.members.insert(key);
        self.length += 1;
    }

    /// Overwrites the value of an existing node. No-op (returns `false`)
    /// if the key is absent.
    pub fn replace(&mut self, key: &[u8], new_val: Value) -> bool {
        let mut update = vec![None; MAX_HEIGHT];
        match self.find_predecessors(key, &mut update) {
            Some(idx) if self.node(idx).key.as_slice() == key => {
                self.arena[idx].as_mut().unwrap().value = new_val;
                true
            }
            _ => false,
        }
    }

    /// Removes `key` from every level it appears at, releases the arena
    /// slot, drops the top level(s) that become empty, and removes `key`
    /// from the membership set. Returns whether `key` was present.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let mut update = vec![None; MAX_HEIGHT];
        let found = self.find_predecessors(key, &mut update);
        let idx = match found {
            Some(idx) if self.node(idx).key.as_slice() == key => idx,
            _ => return false,
        };

        let height = self.node(idx).forward.len();
        for level in 0..height {
            let next = self.node(idx).forward[level];
            match update[level] {
                None => self.head[level] = next,
                Some(p) => self.arena[p].as_mut().unwrap().forward[level] = next,
            }
        }

        while self.level > 1 && self.head[self.level - 1].is_none() {
            self.level -= 1;
        }

        self.members.remove(key);
        self.arena[idx] = None;
        self.free.push(idx);
        self.length -= 1;
        true
    }

    /// O(1) existence check via the membership set, independent of the
    /// skiplist walk `search` performs.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.members.contains(key)
    }

    /// Standard top-down skiplist walk; returns the stored value.
    pub fn search(&self, key: &[u8]) -> Option<&Value> {
        let mut pred: Option<NodeIdx> = None;
        for level in (0..self.level).rev() {
            let mut curr = self.forward_at(pred, level);
            while let Some(c) = curr {
                if self.node(c).key.as_slice() < key {
                    pred = Some(c);
                    curr = self.forward_at(pred, level);
                } else {
                    break;
                }
            }
        }
        let candidate = self.forward_at(pred, 0)?;
        let node = self.node(candidate);
        (node.key.as_slice() == key).then_some(&node.value)
    }

    /// The greatest key in the map. Defined only when the map is
    /// non-empty; walks `next[0]` to the last node rather than assuming
    /// the top level is populated (§9's second Open Question).
    pub fn max_key(&self) -> Option<&Key> {
        let mut curr = self.head[0]?;
        while let Some(next) = self.node(curr).forward[0] {
            curr = next;
        }
        Some(&self.node(curr).key)
    }

    /// The least key in the map (the first node at level 0).
    pub fn min_key(&self) -> Option<&Key> {
        self.head[0].map(|idx| &self.node(idx).key)
    }

    /// Ordered iterator over the keys `k` with `lo <= k <= hi`, walking
    /// level 0 from the first candidate. An optimized implementation
    /// descends to the first `k >= lo` in O(log n) before switching to
    /// a linear walk; this is that optimization.
    pub fn scan<'a>(&'a self, lo: &[u8], hi: &[u8]) -> impl Iterator<Item = &'a Key> + 'a {
        let mut pred: Option<NodeIdx> = None;
        for level in (0..self.level).rev() {
            let mut curr = self.forward_at(pred, level);
            while let Some(c) = curr {
                if self.node(c).key.as_slice() < lo {
                    pred = Some(c);
                    curr = self.forward_at(pred, level);
                } else {
                    break;
                }
            }
        }
        let start = self.forward_at(pred, 0);
        let hi = hi.to_vec();
        ScanIter {
            map: self,
            next: start,
            hi,
        }
    }

    /// Walks the entire level-0 chain in ascending order, used by
    /// snapshot save.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        let mut next = self.head[0];
        std::iter::from_fn(move || {
            let idx = next?;
            let node = self.node(idx);
            next = node.forward[0];
            Some((&node.key, &node.value))
        })
    }
}

impl Default for SkipMap {
    fn default() -> Self {
        Self::new()
    }
}

struct ScanIter<'a> {
    map: &'a SkipMap,
    next: Option<NodeIdx>,
    hi: Key,
}

impl<'a> Iterator for ScanIter<'a> {
    type Item = &'a Key;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.map.node(idx);
        if node.key > self.hi {
            self.next = None;
            return None;
        }
        self.next = node.forward[0];
        Some(&node.key)
    }
}
