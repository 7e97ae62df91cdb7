//! Cluster relation between wardrobe parts
//!
//! Every inserted shelf or partition gets its own cluster. A cluster may hang
//! off a parent cluster (a shelf inserted next to a partition belongs to that
//! partition), and deleting a cluster takes all of its descendants with it.

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub u32);

#[derive(Debug, Default)]
pub struct ClusterManager {
    next_id: u32,
    parents: HashMap<ClusterId, Option<ClusterId>>,
}

impl ClusterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a cluster. An unknown parent is treated as no parent.
    pub fn create(&mut self, parent: Option<ClusterId>) -> ClusterId {
        let id = ClusterId(self.next_id);
        self.next_id += 1;

        let parent = parent.filter(|p| self.parents.contains_key(p));
        self.parents.insert(id, parent);
        id
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parent_of(&self, id: ClusterId) -> Option<ClusterId> {
        self.parents.get(&id).copied().flatten()
    }

    /// `root` followed by every descendant, breadth-first.
    pub fn collect_for_deletion(&self, root: ClusterId) -> Vec<ClusterId> {
        if !self.contains(root) {
            return Vec::new();
        }

        let mut collected = vec![root];
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            let mut children: Vec<ClusterId> = self
                .parents
                .iter()
                .filter(|(_, parent)| **parent == Some(current))
                .map(|(id, _)| *id)
                .collect();
            children.sort();

            for child in children {
                collected.push(child);
                queue.push_back(child);
            }
        }

        collected
    }

    pub fn forget(&mut self, ids: &[ClusterId]) {
        for id in ids {
            self.parents.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn clear(&mut self) {
        self.parents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_includes_descendants_only() {
        let mut clusters = ClusterManager::new();
        let root = clusters.create(None);
        let child = clusters.create(Some(root));
        let grandchild = clusters.create(Some(child));
        let sibling = clusters.create(None);

        assert_eq!(clusters.collect_for_deletion(root), vec![root, child, grandchild]);
        assert_eq!(clusters.collect_for_deletion(child), vec![child, grandchild]);
        assert_eq!(clusters.collect_for_deletion(sibling), vec![sibling]);
    }

    #[test]
    fn test_forget_and_unknown_parent() {
        let mut clusters = ClusterManager::new();
        let a = clusters.create(None);
        clusters.forget(&[a]);
        assert!(!clusters.contains(a));
        assert!(clusters.collect_for_deletion(a).is_empty());

        let orphan = clusters.create(Some(a));
        assert_eq!(clusters.parent_of(orphan), None);
        assert_eq!(clusters.len(), 1);
    }
}
