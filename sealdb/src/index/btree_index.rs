use crate::collection::Document;
use crate::common::{PathCache, Value};
use crate::filter::Predicate;
use crate::index::{IndexDefinition, IndexDirection};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

/// Position of a node in the index arena.
pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug)]
enum NodeKind {
    Branch(BTreeMap<Value, NodeId>),
    Leaf(BTreeSet<String>),
}

#[derive(Debug)]
struct Node {
    parent: Option<(NodeId, Value)>,
    kind: NodeKind,
}

impl Node {
    fn branch(parent: Option<(NodeId, Value)>) -> Self {
        Node {
            parent,
            kind: NodeKind::Branch(BTreeMap::new()),
        }
    }

    fn leaf(parent: Option<(NodeId, Value)>) -> Self {
        Node {
            parent,
            kind: NodeKind::Leaf(BTreeSet::new()),
        }
    }

    fn is_empty(&self) -> bool {
        match &self.kind {
            NodeKind::Branch(children) => children.is_empty(),
            NodeKind::Leaf(ids) => ids.is_empty(),
        }
    }
}

/// Candidates produced by an index lookup.
///
/// `ids` satisfy every condition on the indexed keys. `overflow` holds the
/// documents whose indexed value is an array or a document; those are not
/// placed in the tree and must be checked against the query by the caller.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexLookup {
    pub ids: Vec<String>,
    pub overflow: Vec<String>,
}

/// A multi-level ordered index over a fixed list of fields.
///
/// Level `n` of the tree is keyed by the value of the `n`-th field of the
/// definition; the last level holds leaves of document ids. Nodes live in
/// an arena and refer to each other by [`NodeId`]. Each node remembers its
/// parent and the key it hangs under, so removing an id walks upwards from
/// its leaf and frees every node left empty. Freed slots are reused.
#[derive(Debug)]
pub struct BTreeIndex {
    definition: IndexDefinition,
    name: String,
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    reverse: HashMap<String, NodeId>,
    overflow: BTreeSet<String>,
}

impl BTreeIndex {
    pub fn new(definition: IndexDefinition) -> Self {
        let name = definition.name();
        BTreeIndex {
            definition,
            name,
            nodes: vec![Node::branch(None)],
            free: Vec::new(),
            reverse: HashMap::new(),
            overflow: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    /// Number of indexed documents, overflow included.
    pub fn len(&self) -> usize {
        self.reverse.len() + self.overflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::branch(None));
        self.free.clear();
        self.reverse.clear();
        self.overflow.clear();
    }

    /// Discards the current content and indexes `documents` from scratch.
    pub fn build<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) {
        let start = Instant::now();
        self.clear();
        let mut skipped = 0usize;
        for document in documents {
            if !self.insert(document) {
                skipped += 1;
            }
        }
        log::debug!(
            "Built index {} with {} entries ({} skipped) in {:?}",
            self.name,
            self.len(),
            skipped,
            start.elapsed()
        );
    }

    /// Places `document` in the index, relocating it if it was indexed
    /// before. Returns `false`, leaving the document out of the index, when
    /// an indexed field is absent or the document has no id.
    pub fn insert(&mut self, document: &Document) -> bool {
        let Some(id) = document.id() else {
            log::debug!("Document without id not indexed in {}", self.name);
            return false;
        };
        self.remove_id(id);

        let mut cache = PathCache::new(document);
        let mut keys = Vec::with_capacity(self.definition.fields().len());
        let mut overflow = false;
        for field in self.definition.fields() {
            match cache.get(field.path()) {
                Some(value) => {
                    overflow |= !value.is_scalar();
                    keys.push(value.clone());
                }
                None => {
                    log::debug!("Document {} lacks {}, not indexed in {}", id, field.path(), self.name);
                    return false;
                }
            }
        }

        if overflow {
            self.overflow.insert(id.to_string());
            return true;
        }

        let last = keys.len() - 1;
        let mut node = ROOT;
        for (level, key) in keys.into_iter().enumerate() {
            let existing = match &self.nodes[node].kind {
                NodeKind::Branch(children) => children.get(&key).copied(),
                NodeKind::Leaf(_) => None,
            };
            node = match existing {
                Some(child) => child,
                None => {
                    let parent = Some((node, key.clone()));
                    let child = if level == last {
                        self.allocate(Node::leaf(parent))
                    } else {
                        self.allocate(Node::branch(parent))
                    };
                    if let NodeKind::Branch(children) = &mut self.nodes[node].kind {
                        children.insert(key, child);
                    }
                    child
                }
            };
        }

        if let NodeKind::Leaf(ids) = &mut self.nodes[node].kind {
            ids.insert(id.to_string());
        }
        self.reverse.insert(id.to_string(), node);
        true
    }

    pub fn remove(&mut self, document: &Document) {
        match document.id() {
            Some(id) => {
                if !self.remove_id(id) {
                    log::debug!("Document {} not present in index {}", id, self.name);
                }
            }
            None => log::debug!("Document without id, nothing to remove from {}", self.name),
        }
    }

    /// Collects the ids satisfying `conditions`, one predicate list per
    /// index field in nesting order. An empty list accepts every key at its
    /// level.
    pub fn find(&self, conditions: &[Vec<&Predicate>]) -> IndexLookup {
        let mut ids = Vec::new();
        self.collect(ROOT, 0, conditions, &mut ids);
        IndexLookup {
            ids,
            overflow: self.overflow.iter().cloned().collect(),
        }
    }

    fn collect(&self, node: NodeId, level: usize, conditions: &[Vec<&Predicate>], out: &mut Vec<String>) {
        let children = match &self.nodes[node].kind {
            NodeKind::Leaf(ids) => {
                out.extend(ids.iter().cloned());
                return;
            }
            NodeKind::Branch(children) => children,
        };

        let predicates = conditions.get(level).map(Vec::as_slice).unwrap_or(&[]);
        if let [single] = predicates {
            if let Some(key) = single.exact_key() {
                if let Some(child) = children.get(key) {
                    self.collect(*child, level + 1, conditions, out);
                }
                return;
            }
        }

        let accepts = |key: &Value| predicates.iter().all(|p| p.test(Some(key)));
        let descending = self
            .definition
            .fields()
            .get(level)
            .is_some_and(|f| f.direction() == IndexDirection::Descending);
        if descending {
            for (key, child) in children.iter().rev() {
                if accepts(key) {
                    self.collect(*child, level + 1, conditions, out);
                }
            }
        } else {
            for (key, child) in children.iter() {
                if accepts(key) {
                    self.collect(*child, level + 1, conditions, out);
                }
            }
        }
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn remove_id(&mut self, id: &str) -> bool {
        if self.overflow.remove(id) {
            return true;
        }
        let Some(leaf) = self.reverse.remove(id) else {
            return false;
        };
        if let NodeKind::Leaf(ids) = &mut self.nodes[leaf].kind {
            ids.remove(id);
        }
        self.prune(leaf);
        true
    }

    /// Frees `node` and its ancestors while they are empty. The root stays.
    fn prune(&mut self, mut node: NodeId) {
        while node != ROOT && self.nodes[node].is_empty() {
            let Some((parent, key)) = self.nodes[node].parent.take() else {
                break;
            };
            self.nodes[node].kind = NodeKind::Leaf(BTreeSet::new());
            self.free.push(node);
            if let NodeKind::Branch(children) = &mut self.nodes[parent].kind {
                children.remove(&key);
            }
            node = parent;
        }
    }

    #[cfg(test)]
    fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}
