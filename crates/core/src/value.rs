//! C1: the value store. Values are never attached to DOM nodes directly; a
//! `ValuePool` is a side table (growable arena of `ValueMap`s, addressed by
//! 1-based index) keyed by node identity, as the design notes prescribe.

use std::collections::HashMap;

use itstool_dom::NodeId;
use itstool_dom::NodeRef;

/// An ordered (name, value) list with linear-scan, replace-in-place lookup.
/// No `HashMap` here: insertion order and the "no duplicate names" invariant
/// both matter, and the map is small (at most ~10 ITS attribute names).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    entries: Vec<(String, String)>,
}

impl ValueMap {
    pub fn new() -> Self {
        ValueMap::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Merges `other` into `self`: for each entry in `other`, overwrite a
    /// same-named entry in `self` if present, else append. Order preserved.
    pub fn merge(&mut self, other: &ValueMap) {
        for (name, value) in &other.entries {
            self.set(name.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (name, value) in iter {
            map.set(name, value);
        }
        map
    }
}

/// Identifies a DOM node (element/text/etc. or a synthetic attribute) for the
/// purposes of the side table, without requiring a borrow of the `Document`
/// the way `NodeRef` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Node(NodeId),
    Attribute(NodeId, usize),
}

impl<'a> From<NodeRef<'a>> for NodeKey {
    fn from(node: NodeRef<'a>) -> Self {
        match node {
            NodeRef::Node(_, id) => NodeKey::Node(id),
            NodeRef::Attribute(_, owner, index) => NodeKey::Attribute(owner, index),
        }
    }
}

/// The growable pool of `ValueMap`s, plus the node→index side table.
#[derive(Debug, Default)]
pub struct ValuePool {
    maps: Vec<ValueMap>,
    slots: HashMap<NodeKey, usize>,
}

impl ValuePool {
    pub fn new() -> Self {
        ValuePool::default()
    }

    /// Appends an empty `ValueMap` and returns its 1-based index.
    pub fn pool_alloc(&mut self) -> usize {
        self.maps.push(ValueMap::new());
        self.maps.len()
    }

    pub fn pool_get(&self, index: usize, name: &str) -> Option<&str> {
        if index == 0 {
            return None;
        }
        self.maps.get(index - 1)?.get(name)
    }

    fn slot_for(&mut self, node: impl Into<NodeKey>) -> usize {
        let key = node.into();
        if let Some(&index) = self.slots.get(&key) {
            return index;
        }
        let index = self.pool_alloc();
        self.slots.insert(key, index);
        index
    }

    /// Merges `values` into the `ValueMap` for `node`, allocating one if the
    /// node has not acquired any value yet.
    pub fn merge_into(&mut self, node: impl Into<NodeKey>, values: &ValueMap) {
        let index = self.slot_for(node);
        self.maps[index - 1].merge(values);
    }

    /// The value map for `node`, or `None` if it has never acquired a value.
    pub fn get_map(&self, node: impl Into<NodeKey>) -> Option<&ValueMap> {
        let index = *self.slots.get(&node.into())?;
        self.maps.get(index - 1)
    }

    pub fn get(&self, node: impl Into<NodeKey>, name: &str) -> Option<&str> {
        self.get_map(node)?.get(name)
    }

    /// Resets the pool for reuse against a new document. The rule set that
    /// owns this pool may be created once and applied to many documents;
    /// each document needs a fresh set of indices.
    pub fn reset(&mut self) {
        self.maps.clear();
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_same_name_and_appends_new() {
        let mut a = ValueMap::new();
        a.set("translate", "yes");
        a.set("space", "default");
        let mut b = ValueMap::new();
        b.set("translate", "no");
        b.set("locNote", "hi");
        a.merge(&b);
        assert_eq!(a.get("translate"), Some("no"));
        assert_eq!(a.get("space"), Some("default"));
        assert_eq!(a.get("locNote"), Some("hi"));
    }

    #[test]
    fn pool_allocates_one_based_indices_and_grows_by_append() {
        let mut pool = ValuePool::new();
        let a = pool.pool_alloc();
        let b = pool.pool_alloc();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn merge_into_same_node_reuses_its_slot() {
        let mut pool = ValuePool::new();
        let node = NodeKey::Node(7);
        let mut values = ValueMap::new();
        values.set("translate", "yes");
        pool.merge_into(node, &values);
        let mut more = ValueMap::new();
        more.set("space", "preserve");
        pool.merge_into(node, &more);
        assert_eq!(pool.get(node, "translate"), Some("yes"));
        assert_eq!(pool.get(node, "space"), Some("preserve"));
    }

    #[test]
    fn reset_clears_pool_and_slots() {
        let mut pool = ValuePool::new();
        let node = NodeKey::Node(1);
        let mut values = ValueMap::new();
        values.set("translate", "yes");
        pool.merge_into(node, &values);
        pool.reset();
        assert_eq!(pool.get(node, "translate"), None);
    }
}
