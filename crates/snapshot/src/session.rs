//! Recording session
//!
//! Holds the id registry and the mirror: a side table from live node handle
//! to the id it was last serialized (or rebuilt) with. The live tree itself
//! is never annotated.
//!
//! Handles are only unique inside one tree, so every binding is keyed by the
//! tree's identity as well. One session can record a page, rebuild into a
//! replica and record the page again without the two trees sharing entries.

use crate::host::LiveTree;
use crate::ids::IdRegistry;
use crate::types::{Id, IGNORED_NODE};
use ahash::AHashMap;
use std::hash::Hash;

/// Id → live node index produced by one snapshot or rebuild call
pub type IdNodeMap<K> = AHashMap<Id, K>;

#[derive(Debug, Clone)]
pub struct Session<K> {
    registry: IdRegistry,
    mirror: AHashMap<(u64, K), Id>,
}

impl<K: Copy + Eq + Hash> Session<K> {
    pub fn new() -> Self {
        Self {
            registry: IdRegistry::new(),
            mirror: AHashMap::new(),
        }
    }

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    pub fn next_id(&mut self) -> Id {
        self.registry.next_id()
    }

    /// Id the node was last serialized or rebuilt with
    pub fn id_of<T>(&self, tree: &T, node: K) -> Option<Id>
    where
        T: LiveTree<Node = K> + ?Sized,
    {
        self.mirror.get(&(tree.tree_id(), node)).copied()
    }

    pub fn is_ignored<T>(&self, tree: &T, node: K) -> bool
    where
        T: LiveTree<Node = K> + ?Sized,
    {
        self.id_of(tree, node) == Some(IGNORED_NODE)
    }

    pub fn bind<T>(&mut self, tree: &T, node: K, id: Id)
    where
        T: LiveTree<Node = K> + ?Sized,
    {
        self.mirror.insert((tree.tree_id(), node), id);
    }

    /// Raise the counter past an id that came from elsewhere (rebuild)
    pub fn observe(&mut self, id: Id) {
        self.registry.observe(id);
    }

    /// Drop a node's binding so its next snapshot mints a new id
    pub fn forget<T>(&mut self, tree: &T, node: K) -> Option<Id>
    where
        T: LiveTree<Node = K> + ?Sized,
    {
        self.mirror.remove(&(tree.tree_id(), node))
    }

    /// Start a new recording session: ids restart at 1, bindings are dropped
    pub fn reset(&mut self) {
        self.registry.reset();
        self.mirror.clear();
    }

    /// Number of bound live nodes, across every tree
    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }
}

impl<K: Copy + Eq + Hash> Default for Session<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{DomArena, NodeId};

    #[test]
    fn test_bind_and_reset() {
        let mut arena = DomArena::new();
        let doc = arena.create_document("about:blank");
        let text = arena.create_text(" ");

        let mut session: Session<NodeId> = Session::new();
        let id = session.next_id();
        session.bind(&arena, doc, id);
        session.bind(&arena, text, IGNORED_NODE);

        assert_eq!(session.id_of(&arena, doc), Some(1));
        assert!(session.is_ignored(&arena, text));
        assert_eq!(session.len(), 2);

        assert_eq!(session.forget(&arena, doc), Some(1));
        assert_eq!(session.id_of(&arena, doc), None);

        session.reset();
        assert!(session.is_empty());
        assert_eq!(session.next_id(), 1);
    }

    #[test]
    fn test_bindings_are_scoped_to_their_tree() {
        let mut page = DomArena::new();
        let page_doc = page.create_document("https://a.example/");
        let page_comment = page.create_comment("x");
        let mut replica = DomArena::new();
        let replica_doc = replica.create_document("https://b.example/");
        let replica_html = replica.create_element("html");
        // same slots, different trees
        assert_eq!((page_doc, page_comment), (replica_doc, replica_html));

        let mut session = Session::new();
        session.bind(&page, page_doc, 1);
        session.bind(&page, page_comment, IGNORED_NODE);

        assert_eq!(session.id_of(&replica, replica_doc), None);
        assert!(!session.is_ignored(&replica, replica_html));

        session.bind(&replica, replica_doc, 7);
        assert_eq!(session.id_of(&page, page_doc), Some(1));
        assert_eq!(session.id_of(&replica, replica_doc), Some(7));
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Session<u32>>();
    }
}
