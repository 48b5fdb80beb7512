// src/tree/mod.rs

//! Tri-state selection tree
//!
//! The tree mirrors `solution → projects → configurations/assemblies →
//! libraries`. Nodes live in an arena owned by [`SelectionTree`]; a node owns
//! the list of its children's ids and keeps its parent's id only for upward
//! recomputation.
//!
//! A project with nothing to enumerate is itself a leaf; its checkbox is the
//! unconditional package reference.
//!
//! Two rules hold after every mutation:
//!
//! 1. A node with children is `Checked` iff all children are `Checked`,
//!    `Unchecked` iff all are `Unchecked`, and `Indeterminate` otherwise.
//! 2. Setting a node pushes that definite value to every descendant and
//!    recomputes every ancestor. `Indeterminate` is never pushed down.
//!
//! The tree is single-threaded: it is built once per session and mutated
//! only by the thread that owns it.

mod shape;

pub use shape::ShapeNode;

use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Checkbox state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckState {
    Checked,
    Unchecked,
    Indeterminate,
}

impl CheckState {
    pub fn is_checked(&self) -> bool {
        *self == Self::Checked
    }

    fn marker(&self) -> &'static str {
        match self {
            Self::Checked => "[x]",
            Self::Unchecked => "[ ]",
            Self::Indeterminate => "[-]",
        }
    }

    /// Summarize child states
    fn summarize(states: impl IntoIterator<Item = CheckState>) -> CheckState {
        let mut any_checked = false;
        let mut any_unchecked = false;
        for state in states {
            match state {
                Self::Checked => any_checked = true,
                Self::Unchecked => any_unchecked = true,
                Self::Indeterminate => return Self::Indeterminate,
            }
            if any_checked && any_unchecked {
                return Self::Indeterminate;
            }
        }
        if any_unchecked {
            Self::Unchecked
        } else {
            Self::Checked
        }
    }
}

impl From<bool> for CheckState {
    fn from(checked: bool) -> Self {
        if checked { Self::Checked } else { Self::Unchecked }
    }
}

/// What a node stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Solution,
    Project { directory: PathBuf },
    /// Native build configuration; name is the configuration name
    Configuration,
    /// Native library file within a configuration
    Library { configuration: String },
    /// Managed assembly file, configuration independent
    Assembly,
}

/// A node of the selection tree
#[derive(Debug, Clone)]
pub struct SelectionNode {
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    state: CheckState,
}

impl SelectionNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Project directory, for project nodes
    pub fn project_directory(&self) -> Option<&Path> {
        match &self.kind {
            NodeKind::Project { directory } => Some(directory),
            _ => None,
        }
    }
}

/// Emitted for every node whose state actually changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckedChanged {
    pub node: NodeId,
    pub old: CheckState,
    pub new: CheckState,
}

type Observer = Box<dyn FnMut(&CheckedChanged) + Send>;

/// Tri-state tree for one reconciliation session
pub struct SelectionTree {
    nodes: Vec<SelectionNode>,
    session: u64,
    incomplete: bool,
    observers: Vec<Observer>,
}

impl SelectionTree {
    /// Build a tree matching `shape`, seeding each leaf from `predicate`
    ///
    /// The predicate receives the leaf's name path below the root and its
    /// kind. Ancestors are computed bottom-up once; no change events fire
    /// during construction.
    pub fn build_from_seed<F>(shape: ShapeNode, mut predicate: F) -> Self
    where
        F: FnMut(&[String], &NodeKind) -> bool,
    {
        let mut tree = Self {
            nodes: Vec::with_capacity(shape.count()),
            session: 0,
            incomplete: false,
            observers: Vec::new(),
        };

        let mut path = Vec::new();
        tree.insert(shape, None, &mut path, &mut predicate);

        // Children always have larger ids than their parent
        for index in (0..tree.nodes.len()).rev() {
            if !tree.nodes[index].children.is_empty() {
                tree.nodes[index].state = tree.summarize(NodeId(index));
            }
        }

        tree
    }

    fn insert<F>(
        &mut self,
        shape: ShapeNode,
        parent: Option<NodeId>,
        path: &mut Vec<String>,
        predicate: &mut F,
    ) -> NodeId
    where
        F: FnMut(&[String], &NodeKind) -> bool,
    {
        let id = NodeId(self.nodes.len());
        let is_root = parent.is_none();
        if !is_root {
            path.push(shape.name.clone());
        }

        let state = if shape.children.is_empty() && !is_root {
            CheckState::from(predicate(path, &shape.kind))
        } else {
            CheckState::Unchecked
        };

        self.nodes.push(SelectionNode {
            name: shape.name,
            kind: shape.kind,
            parent,
            children: Vec::new(),
            state,
        });

        for child in shape.children {
            let child_id = self.insert(child, Some(id), path, predicate);
            self.nodes[id.0].children.push(child_id);
        }

        if !is_root {
            path.pop();
        }
        id
    }

    pub(crate) fn with_session(mut self, session: u64) -> Self {
        self.session = session;
        self
    }

    pub(crate) fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    /// Session this tree was built in
    pub fn session(&self) -> u64 {
        self.session
    }

    /// True if probing was cancelled before every project was visited
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> &SelectionNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&SelectionNode> {
        self.nodes.get(id.0)
    }

    pub fn state(&self, id: NodeId) -> CheckState {
        self.nodes[id.0].state
    }

    /// Register a callback for state changes
    pub fn subscribe(&mut self, observer: impl FnMut(&CheckedChanged) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Locate a node by its name path below the root
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        let mut current = self.root();
        for segment in path {
            current = *self.nodes[current.0]
                .children
                .iter()
                .find(|c| self.nodes[c.0].name == *segment)?;
        }
        Some(current)
    }

    /// Names from below the root down to `id`
    pub fn path_of(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                break;
            }
            path.push(self.nodes[node.0].name.as_str());
            current = self.nodes[node.0].parent;
        }
        path.reverse();
        path
    }

    /// Children of the root
    pub fn projects(&self) -> &[NodeId] {
        &self.nodes[0].children
    }

    /// All leaves in the subtree rooted at `id`, in tree order
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if node.children.is_empty() {
                leaves.push(current);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    fn summarize(&self, id: NodeId) -> CheckState {
        CheckState::summarize(
            self.nodes[id.0]
                .children
                .iter()
                .map(|c| self.nodes[c.0].state),
        )
    }

    /// Check or uncheck a node
    ///
    /// The value is applied to the node and all its descendants, then every
    /// ancestor is recomputed. Returns the changes in the order they were
    /// applied; setting a node to the state it already has returns nothing.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Vec<CheckedChanged> {
        let target = CheckState::from(checked);
        let mut changes = Vec::new();

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            if node.state != target {
                changes.push(CheckedChanged {
                    node: current,
                    old: node.state,
                    new: target,
                });
                node.state = target;
            }
            stack.extend(node.children.iter().rev());
        }

        let mut ancestor = self.nodes[id.0].parent;
        while let Some(current) = ancestor {
            let state = self.summarize(current);
            let node = &mut self.nodes[current.0];
            if node.state == state {
                // Nothing above can change either
                break;
            }
            changes.push(CheckedChanged {
                node: current,
                old: node.state,
                new: state,
            });
            node.state = state;
            ancestor = node.parent;
        }

        for change in &changes {
            for observer in &mut self.observers {
                observer(change);
            }
        }

        changes
    }

    /// Toggle by path; `None` if the path does not exist
    pub fn set_checked_path(&mut self, path: &[&str], checked: bool) -> Option<Vec<CheckedChanged>> {
        let id = self.find(path)?;
        Some(self.set_checked(id, checked))
    }

    /// Verify the tri-state summary rule over the whole tree
    pub fn is_consistent(&self) -> bool {
        (0..self.nodes.len()).all(|index| {
            let node = &self.nodes[index];
            node.children.is_empty() || node.state == self.summarize(NodeId(index))
        })
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.nodes[id.0];
        writeln!(
            f,
            "{:indent$}{} {}",
            "",
            node.state.marker(),
            node.name,
            indent = depth * 2
        )?;
        for child in &node.children {
            self.render(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }
        self.render(f, self.root(), 0)
    }
}

impl fmt::Debug for SelectionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionTree")
            .field("nodes", &self.nodes)
            .field("session", &self.session)
            .field("incomplete", &self.incomplete)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// solution → app → {Debug, Release} → {a.lib, b.lib}
    fn sample(seed: &[&str]) -> SelectionTree {
        let config = |name: &str| {
            ShapeNode::branch(
                name,
                NodeKind::Configuration,
                ["a.lib", "b.lib"]
                    .into_iter()
                    .map(|lib| {
                        ShapeNode::leaf(
                            lib,
                            NodeKind::Library {
                                configuration: name.to_string(),
                            },
                        )
                    })
                    .collect(),
            )
        };
        let shape = ShapeNode::branch(
            "solution",
            NodeKind::Solution,
            vec![ShapeNode::branch(
                "app",
                NodeKind::Project {
                    directory: PathBuf::from("app"),
                },
                vec![config("Debug"), config("Release")],
            )],
        );

        SelectionTree::build_from_seed(shape, |path, _| seed.contains(&path.join("/").as_str()))
    }

    // === Construction tests ===

    #[test]
    fn test_shape_count_matches_tree_len() {
        let shape = ShapeNode::branch(
            "solution",
            NodeKind::Solution,
            vec![
                ShapeNode::leaf("a", NodeKind::Assembly),
                ShapeNode::branch("b", NodeKind::Configuration, vec![ShapeNode::leaf("c", NodeKind::Assembly)]),
            ],
        );
        assert_eq!(shape.count(), 4);
        assert_eq!(SelectionTree::build_from_seed(shape, |_, _| false).len(), 4);
    }

    #[test]
    fn test_seed_all_unchecked() {
        let tree = sample(&[]);
        assert_eq!(tree.len(), 8);
        assert_eq!(tree.state(tree.root()), CheckState::Unchecked);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_seed_partial_is_indeterminate() {
        let tree = sample(&["app/Debug/a.lib"]);
        assert_eq!(tree.state(tree.find(&["app", "Debug"]).unwrap()), CheckState::Indeterminate);
        assert_eq!(tree.state(tree.find(&["app", "Release"]).unwrap()), CheckState::Unchecked);
        assert_eq!(tree.state(tree.find(&["app"]).unwrap()), CheckState::Indeterminate);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_seed_full_is_checked() {
        let tree = sample(&["app/Debug/a.lib", "app/Debug/b.lib", "app/Release/a.lib", "app/Release/b.lib"]);
        assert_eq!(tree.state(tree.root()), CheckState::Checked);
    }

    #[test]
    fn test_build_fires_no_events() {
        let events = Arc::new(Mutex::new(0));
        let mut tree = sample(&["app/Debug/a.lib"]);
        let counter = events.clone();
        tree.subscribe(move |_| *counter.lock().unwrap() += 1);
        assert_eq!(*events.lock().unwrap(), 0);
    }

    // === Propagation tests ===

    #[test]
    fn test_check_parent_checks_descendants() {
        let mut tree = sample(&[]);
        let debug = tree.find(&["app", "Debug"]).unwrap();
        tree.set_checked(debug, true);

        for leaf in tree.leaves(debug) {
            assert_eq!(tree.state(leaf), CheckState::Checked);
        }
        assert_eq!(tree.state(tree.find(&["app"]).unwrap()), CheckState::Indeterminate);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_uncheck_root_clears_everything() {
        let mut tree = sample(&["app/Debug/a.lib", "app/Release/b.lib"]);
        let root = tree.root();
        tree.set_checked(root, false);
        assert!(tree.leaves(root).iter().all(|l| tree.state(*l) == CheckState::Unchecked));
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_last_leaf_completes_ancestors() {
        let mut tree = sample(&["app/Debug/a.lib", "app/Release/a.lib", "app/Release/b.lib"]);
        let leaf = tree.find(&["app", "Debug", "b.lib"]).unwrap();
        tree.set_checked(leaf, true);
        assert_eq!(tree.state(tree.root()), CheckState::Checked);
    }

    #[test]
    fn test_indeterminate_never_pushed_down() {
        let mut tree = sample(&["app/Debug/a.lib"]);
        let app = tree.find(&["app"]).unwrap();
        assert_eq!(tree.state(app), CheckState::Indeterminate);

        let changes = tree.set_checked(app, true);
        assert!(changes.iter().all(|c| c.new != CheckState::Indeterminate));
        assert!(tree.leaves(app).iter().all(|l| tree.state(*l) == CheckState::Checked));
    }

    #[test]
    fn test_set_same_state_is_noop() {
        let mut tree = sample(&["app/Debug/a.lib"]);
        let leaf = tree.find(&["app", "Debug", "a.lib"]).unwrap();
        assert!(tree.set_checked(leaf, true).is_empty());
    }

    #[test]
    fn test_events_report_actual_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut tree = sample(&[]);
        let sink = seen.clone();
        tree.subscribe(move |change| sink.lock().unwrap().push(*change));

        let leaf = tree.find(&["app", "Debug", "a.lib"]).unwrap();
        let changes = tree.set_checked(leaf, true);

        // leaf, Debug, app, solution
        assert_eq!(changes.len(), 4);
        assert_eq!(*seen.lock().unwrap(), changes);
        assert_eq!(changes[0].node, leaf);
        assert_eq!(changes[0].old, CheckState::Unchecked);
        assert_eq!(changes[0].new, CheckState::Checked);
    }

    #[test]
    fn test_invariant_holds_across_toggle_sequence() {
        let mut tree = sample(&[]);
        let leaves = tree.leaves(tree.root());
        // Deterministic pseudo-random walk over leaves and inner nodes
        let mut seed: usize = 7;
        for step in 0..64 {
            seed = seed.wrapping_mul(31).wrapping_add(17) % 1009;
            let target = if step % 3 == 0 {
                NodeId(seed % tree.len())
            } else {
                leaves[seed % leaves.len()]
            };
            tree.set_checked(target, seed % 2 == 0);
            assert!(tree.is_consistent(), "inconsistent after step {}", step);
        }
    }

    // === Lookup and rendering ===

    #[test]
    fn test_find_and_path_of() {
        let tree = sample(&[]);
        let leaf = tree.find(&["app", "Release", "b.lib"]).unwrap();
        assert_eq!(tree.path_of(leaf), vec!["app", "Release", "b.lib"]);
        assert!(tree.find(&["app", "Profile"]).is_none());
        assert_eq!(tree.find(&[]), Some(tree.root()));
    }

    #[test]
    fn test_display_markers() {
        let tree = sample(&["app/Debug/a.lib"]);
        let text = tree.to_string();
        assert!(text.starts_with("[-] solution\n"));
        assert!(text.contains("      [x] a.lib\n"));
        assert!(text.contains("    [ ] Release\n"));
    }
}
