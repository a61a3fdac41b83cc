//! Collision chains for the bucket grid.
//!
//! Nodes live in a generational arena (`SlotMap`) owned by the map; a chain
//! is threaded through the arena by `next`/`previous` keys. The grid cell's
//! head key is the only entry point into a chain. `previous` is a
//! non-owning back-link used for O(1) unlinking and never for traversal.

use crate::index::Index2d;
use core::borrow::Borrow;
use core::fmt;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    /// Arena key of a chain node.
    pub struct NodeKey;
}

#[derive(Debug)]
pub(crate) struct ChainNode<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) next: Option<NodeKey>,
    pub(crate) previous: Option<NodeKey>,
}

pub(crate) type Arena<K, V> = SlotMap<NodeKey, ChainNode<K, V>>;

/// Links `key -> value` in as the new head of the chain at `head`.
pub(crate) fn push_front<K, V>(
    arena: &mut Arena<K, V>,
    head: &mut Option<NodeKey>,
    key: K,
    value: V,
) -> NodeKey {
    let next = *head;
    let k = arena.insert(ChainNode {
        key,
        value,
        next,
        previous: None,
    });
    if let Some(n) = next {
        arena[n].previous = Some(k);
    }
    *head = Some(k);
    k
}

/// First node in the chain whose key equals `q`.
pub(crate) fn find<K, V, Q>(arena: &Arena<K, V>, head: Option<NodeKey>, q: &Q) -> Option<NodeKey>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    Links::new(arena, head)
        .find(|(_, node)| node.key.borrow() == q)
        .map(|(k, _)| k)
}

/// Splices node `k` out of the chain at `head` and frees it.
///
/// When `k` is the head, the cell is moved on to the node's successor.
pub(crate) fn unlink<K, V>(
    arena: &mut Arena<K, V>,
    head: &mut Option<NodeKey>,
    k: NodeKey,
) -> Option<(K, V)> {
    let node = arena.remove(k)?;
    match node.previous {
        Some(p) => arena[p].next = node.next,
        None => {
            debug_assert_eq!(
                *head,
                Some(k),
                "unlinked node without previous must be the head"
            );
            *head = node.next;
        }
    }
    if let Some(n) = node.next {
        arena[n].previous = node.previous;
    }
    Some((node.key, node.value))
}

/// Walks a chain from its head, yielding arena keys with their nodes.
pub(crate) struct Links<'a, K, V> {
    arena: &'a Arena<K, V>,
    cursor: Option<NodeKey>,
}

impl<'a, K, V> Links<'a, K, V> {
    #[inline]
    pub(crate) fn new(arena: &'a Arena<K, V>, head: Option<NodeKey>) -> Self {
        Self {
            arena,
            cursor: head,
        }
    }
}

impl<'a, K, V> Iterator for Links<'a, K, V> {
    type Item = (NodeKey, &'a ChainNode<K, V>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor?;
        let node = self.arena.get(k)?;
        self.cursor = node.next;
        Some((k, node))
    }
}

/// Entries of one grid cell, newest first.
pub struct Chain<'a, K, V> {
    links: Links<'a, K, V>,
}

impl<'a, K, V> Chain<'a, K, V> {
    pub(crate) fn new(arena: &'a Arena<K, V>, head: Option<NodeKey>) -> Self {
        Self {
            links: Links::new(arena, head),
        }
    }
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.links.next().map(|(_, n)| (&n.key, &n.value))
    }
}

/// A broken structural invariant of a bucket grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    HeadHasPrevious { cell: Index2d },
    BrokenBackLink { cell: Index2d },
    /// A link names a node that is no longer in the arena.
    DanglingLink { cell: Index2d },
    /// A node was reached a second time: a cycle, or two cells sharing it.
    SharedNode { cell: Index2d },
    MisplacedNode { cell: Index2d, expected: Index2d },
    SizeMismatch { counted: usize, reachable: usize },
    /// Nodes allocated in the arena but linked into no chain.
    Orphaned { orphaned: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::HeadHasPrevious { cell } => {
                write!(f, "chain head at {} has a previous link", cell)
            }
            InvariantViolation::BrokenBackLink { cell } => write!(
                f,
                "chain at {} has a node whose previous link does not point back",
                cell
            ),
            InvariantViolation::DanglingLink { cell } => {
                write!(f, "chain at {} links to a freed node", cell)
            }
            InvariantViolation::SharedNode { cell } => {
                write!(f, "node reached again from the chain at {}", cell)
            }
            InvariantViolation::MisplacedNode { cell, expected } => {
                write!(f, "node linked under {} hashes to {}", cell, expected)
            }
            InvariantViolation::SizeMismatch { counted, reachable } => write!(
                f,
                "size counter is {} but {} entries are reachable",
                counted, reachable
            ),
            InvariantViolation::Orphaned { orphaned } => write!(
                f,
                "{} entries are allocated but not linked into any chain",
                orphaned
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Verifies one chain and returns its length.
///
/// `seen` accumulates every node visited across calls, so a node reachable
/// from two cells (or twice from one, i.e. a cycle) is reported.
pub(crate) fn check_chain<K, V>(
    arena: &Arena<K, V>,
    head: Option<NodeKey>,
    cell: Index2d,
    seen: &mut SecondaryMap<NodeKey, ()>,
    mut home: impl FnMut(&K) -> Index2d,
) -> Result<usize, InvariantViolation> {
    let mut previous = None;
    let mut cursor = head;
    let mut len = 0;
    while let Some(k) = cursor {
        let node = arena
            .get(k)
            .ok_or(InvariantViolation::DanglingLink { cell })?;
        if seen.insert(k, ()).is_some() {
            return Err(InvariantViolation::SharedNode { cell });
        }
        if node.previous != previous {
            return Err(match previous {
                None => InvariantViolation::HeadHasPrevious { cell },
                Some(_) => InvariantViolation::BrokenBackLink { cell },
            });
        }
        let expected = home(&node.key);
        if expected != cell {
            return Err(InvariantViolation::MisplacedNode { cell, expected });
        }
        len += 1;
        previous = Some(k);
        cursor = node.next;
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: Index2d = Index2d { x: 0, y: 0 };

    fn keys(arena: &Arena<&'static str, i32>, head: Option<NodeKey>) -> Vec<&'static str> {
        Chain::new(arena, head).map(|(k, _)| *k).collect()
    }

    fn check(
        arena: &Arena<&'static str, i32>,
        head: Option<NodeKey>,
    ) -> Result<usize, InvariantViolation> {
        let mut seen = SecondaryMap::new();
        check_chain(arena, head, CELL, &mut seen, |_| CELL)
    }

    /// Invariant: pushing links at the head, so walking yields reverse insertion order.
    #[test]
    fn push_front_orders_newest_first() {
        let mut arena = Arena::with_key();
        let mut head = None;
        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            push_front(&mut arena, &mut head, k, i as i32);
        }
        assert_eq!(keys(&arena, head), vec!["c", "b", "a"]);
        assert_eq!(check(&arena, head), Ok(3));
    }

    #[test]
    fn find_resolves_by_equality() {
        let mut arena = Arena::with_key();
        let mut head = None;
        let a = push_front(&mut arena, &mut head, "a", 1);
        let b = push_front(&mut arena, &mut head, "b", 2);
        assert_eq!(find(&arena, head, "a"), Some(a));
        assert_eq!(find(&arena, head, "b"), Some(b));
        assert_eq!(find(&arena, head, "z"), None);
        assert_eq!(find::<&str, i32, str>(&arena, None, "a"), None);
    }

    /// Invariant: unlinking from the head, middle and tail keeps the remaining
    /// links mutually consistent.
    #[test]
    fn unlink_head_middle_tail() {
        let mut arena = Arena::with_key();
        let mut head = None;
        let a = push_front(&mut arena, &mut head, "a", 1);
        let b = push_front(&mut arena, &mut head, "b", 2);
        let c = push_front(&mut arena, &mut head, "c", 3);
        let d = push_front(&mut arena, &mut head, "d", 4);

        assert_eq!(unlink(&mut arena, &mut head, b), Some(("b", 2)));
        assert_eq!(keys(&arena, head), vec!["d", "c", "a"]);
        assert_eq!(check(&arena, head), Ok(3));

        assert_eq!(unlink(&mut arena, &mut head, d), Some(("d", 4)));
        assert_eq!(head, Some(c));
        assert_eq!(check(&arena, head), Ok(2));

        assert_eq!(unlink(&mut arena, &mut head, a), Some(("a", 1)));
        assert_eq!(keys(&arena, head), vec!["c"]);
        assert_eq!(arena[c].next, None);
        assert_eq!(check(&arena, head), Ok(1));

        assert_eq!(unlink(&mut arena, &mut head, c), Some(("c", 3)));
        assert_eq!(head, None);
        assert!(arena.is_empty());

        // Stale key: nothing to unlink.
        assert_eq!(unlink(&mut arena, &mut head, c), None);
    }

    #[test]
    fn check_detects_broken_back_link() {
        let mut arena = Arena::with_key();
        let mut head = None;
        let a = push_front(&mut arena, &mut head, "a", 1);
        push_front(&mut arena, &mut head, "b", 2);
        arena[a].previous = None;
        assert_eq!(
            check(&arena, head),
            Err(InvariantViolation::BrokenBackLink { cell: CELL })
        );
    }

    #[test]
    fn check_detects_head_with_previous() {
        let mut arena = Arena::with_key();
        let mut head = None;
        let a = push_front(&mut arena, &mut head, "a", 1);
        let b = push_front(&mut arena, &mut head, "b", 2);
        arena[b].previous = Some(a);
        assert_eq!(
            check(&arena, head),
            Err(InvariantViolation::HeadHasPrevious { cell: CELL })
        );
    }

    #[test]
    fn check_detects_cycle() {
        let mut arena = Arena::with_key();
        let mut head = None;
        let a = push_front(&mut arena, &mut head, "a", 1);
        let b = push_front(&mut arena, &mut head, "b", 2);
        arena[a].next = Some(b);
        assert_eq!(
            check(&arena, head),
            Err(InvariantViolation::SharedNode { cell: CELL })
        );
    }

    #[test]
    fn check_detects_misplaced_node() {
        let mut arena = Arena::with_key();
        let mut head = None;
        push_front(&mut arena, &mut head, "a", 1);
        let elsewhere = Index2d { x: 1, y: 0 };
        let mut seen = SecondaryMap::new();
        assert_eq!(
            check_chain(&arena, head, CELL, &mut seen, |_| elsewhere),
            Err(InvariantViolation::MisplacedNode {
                cell: CELL,
                expected: elsewhere
            })
        );
    }
}
