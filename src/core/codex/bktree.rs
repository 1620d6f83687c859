//! BK-tree metric index over edit distance.
//!
//! Nodes live in a flat arena and children are addressed by index, so both
//! insertion and search are plain loops with no recursion depth to worry
//! about. Children are kept in a `BTreeMap` keyed by edge distance, which lets
//! search pull exactly the edge window the triangle inequality allows.

use std::collections::BTreeMap;

use super::distance::distance;

#[derive(Debug, Clone)]
struct BkNode {
    key: String,
    /// Edge distance -> arena index of the child.
    children: BTreeMap<usize, usize>,
}

/// A key found by [`BkTree::search`] together with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BkMatch<'a> {
    pub key: &'a str,
    pub distance: usize,
}

/// Burkhard-Keller tree keyed by Levenshtein distance.
#[derive(Debug, Clone, Default)]
pub struct BkTree {
    nodes: Vec<BkNode>,
}

impl BkTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from keys in iteration order.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for key in keys {
            tree.insert(key.as_ref());
        }
        tree
    }

    /// Insert a key. Returns `false` if the key was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.nodes.is_empty() {
            self.nodes.push(BkNode {
                key: key.to_string(),
                children: BTreeMap::new(),
            });
            return true;
        }

        let mut current = 0;
        loop {
            let d = distance(key, &self.nodes[current].key);
            if d == 0 {
                return false;
            }

            match self.nodes[current].children.get(&d) {
                Some(&child) => current = child,
                None => {
                    let index = self.nodes.len();
                    self.nodes.push(BkNode {
                        key: key.to_string(),
                        children: BTreeMap::new(),
                    });
                    self.nodes[current].children.insert(d, index);
                    return true;
                }
            }
        }
    }

    /// Find every key within `threshold` edits of `query`.
    ///
    /// Results come back in traversal order, not sorted by distance.
    pub fn search(&self, query: &str, threshold: usize) -> Vec<BkMatch<'_>> {
        let mut matches = Vec::new();
        if self.nodes.is_empty() {
            return matches;
        }

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let d = distance(query, &node.key);
            if d <= threshold {
                matches.push(BkMatch {
                    key: &node.key,
                    distance: d,
                });
            }

            let low = d.saturating_sub(threshold);
            let high = d + threshold;
            stack.extend(node.children.range(low..=high).map(|(_, &child)| child));
        }

        matches
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all stored keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_keys(matches: &[BkMatch<'_>]) -> Vec<String> {
        let mut keys: Vec<String> = matches.iter().map(|m| m.key.to_string()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_empty_tree_search() {
        let tree = BkTree::new();
        assert!(tree.is_empty());
        assert!(tree.search("anything", 3).is_empty());
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut tree = BkTree::new();
        assert!(tree.insert("gandalf"));
        assert!(tree.insert("galadriel"));
        assert!(!tree.insert("gandalf"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_search_within_threshold() {
        let tree = BkTree::from_keys(["book", "books", "cake", "boo", "cape", "cart", "boon"]);

        let found = tree.search("bood", 1);
        assert_eq!(sorted_keys(&found), vec!["boo", "book", "boon"]);

        let exact = tree.search("cake", 0);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].distance, 0);
    }

    #[test]
    fn test_search_reports_distances() {
        let tree = BkTree::from_keys(["zordon", "zordona", "gordon"]);
        let found = tree.search("zordon", 1);
        for m in &found {
            assert_eq!(m.distance, distance("zordon", m.key));
        }
        assert_eq!(sorted_keys(&found), vec!["gordon", "zordon", "zordona"]);
    }

    #[test]
    fn test_keys_in_insertion_order() {
        let tree = BkTree::from_keys(["moria", "mordor", "moria"]);
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["moria", "mordor"]);
    }
}
