use std::collections::HashSet;
use std::sync::Arc;

use crate::remote::FileRecord;

/// Folder or file payload of a [`TreeNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Children in first-encounter order.
    Folder { children: Vec<TreeNode> },
    /// Leaf pointing back at the record it was built from.
    File { original: Arc<FileRecord> },
}

/// One path segment in the explorer tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    /// Path up to and including this segment.
    pub full_path: String,
    pub kind: NodeKind,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    pub fn original(&self) -> Option<&Arc<FileRecord>> {
        match &self.kind {
            NodeKind::File { original } => Some(original),
            NodeKind::Folder { .. } => None,
        }
    }
}

/// Fold a sorted list of records into a forest keyed by `/`-separated segments.
///
/// Sibling order follows input order, so sorted input gives sorted levels.
/// Input where a segment is used both as a file and as a folder is not
/// supported: the later record is left out of the tree.
pub fn build_tree(files: &[Arc<FileRecord>]) -> Vec<TreeNode> {
    let mut roots = Vec::new();
    for file in files {
        insert_file(&mut roots, file);
    }
    roots
}

fn insert_file(roots: &mut Vec<TreeNode>, file: &Arc<FileRecord>) {
    let segments: Vec<&str> = file.path.split('/').collect();
    let last = segments.len() - 1;
    let mut level = roots;
    let mut full_path = String::with_capacity(file.path.len());

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            full_path.push('/');
        }
        full_path.push_str(segment);
        let is_last = i == last;

        let index = match level.iter().position(|n| n.name == *segment) {
            Some(index) if !is_last && level[index].is_folder() => index,
            Some(_) => {
                tracing::warn!(path = %file.path, at = %full_path, "path collides with an existing node");
                return;
            }
            None if is_last => {
                level.push(TreeNode {
                    name: segment.to_string(),
                    full_path,
                    kind: NodeKind::File {
                        original: Arc::clone(file),
                    },
                });
                return;
            }
            None => {
                level.push(TreeNode {
                    name: segment.to_string(),
                    full_path: full_path.clone(),
                    kind: NodeKind::Folder {
                        children: Vec::new(),
                    },
                });
                level.len() - 1
            }
        };

        level = match &mut level[index].kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => return,
        };
    }
}

/// Number of file leaves in a forest.
pub fn leaf_count(nodes: &[TreeNode]) -> usize {
    nodes
        .iter()
        .map(|n| match &n.kind {
            NodeKind::Folder { children } => leaf_count(children),
            NodeKind::File { .. } => 1,
        })
        .sum()
}

/// Look up the record behind the leaf at `path`.
pub fn find_file<'a>(nodes: &'a [TreeNode], path: &str) -> Option<&'a Arc<FileRecord>> {
    for node in nodes {
        if node.is_folder() {
            if path.starts_with(&format!("{}/", node.full_path)) {
                return find_file(node.children(), path);
            }
        } else if node.full_path == path {
            return node.original();
        }
    }
    None
}

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone)]
pub struct FlatItem {
    pub name: String,
    pub full_path: String,
    pub is_folder: bool,
    pub depth: usize,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
}

/// State for the tree view.
#[derive(Debug, Default)]
pub struct TreeState {
    pub roots: Vec<TreeNode>,
    pub flat_items: Vec<FlatItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    expanded: HashSet<String>,
}

impl TreeState {
    /// Create view state over a freshly built forest.
    pub fn new(roots: Vec<TreeNode>, expand_all: bool) -> Self {
        let mut expanded = HashSet::new();
        if expand_all {
            collect_folders(&roots, &mut expanded);
        }
        let mut state = Self {
            roots,
            flat_items: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            expanded,
        };
        state.flatten();
        state
    }

    /// Rebuild the flat items list from the forest and clamp the selection.
    pub fn flatten(&mut self) {
        self.flat_items.clear();
        let count = self.roots.len();
        for (i, node) in self.roots.iter().enumerate() {
            Self::flatten_node(node, &self.expanded, &mut self.flat_items, 0, i + 1 == count);
        }
        if self.flat_items.is_empty() {
            self.selected_index = 0;
        } else if self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        }
    }

    fn flatten_node(
        node: &TreeNode,
        expanded: &HashSet<String>,
        items: &mut Vec<FlatItem>,
        depth: usize,
        is_last: bool,
    ) {
        let is_expanded = node.is_folder() && expanded.contains(&node.full_path);
        items.push(FlatItem {
            name: node.name.clone(),
            full_path: node.full_path.clone(),
            is_folder: node.is_folder(),
            depth,
            is_expanded,
            is_last_sibling: is_last,
        });

        if is_expanded {
            let children = node.children();
            for (i, child) in children.iter().enumerate() {
                Self::flatten_node(child, expanded, items, depth + 1, i + 1 == children.len());
            }
        }
    }

    pub fn selected_item(&self) -> Option<&FlatItem> {
        self.flat_items.get(self.selected_index)
    }

    /// Record behind the selected row, if it is a file.
    pub fn selected_file(&self) -> Option<Arc<FileRecord>> {
        let item = self.selected_item()?;
        if item.is_folder {
            return None;
        }
        find_file(&self.roots, &item.full_path).cloned()
    }

    /// Expand the currently selected folder.
    pub fn expand_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        if item.is_folder && !item.is_expanded {
            let path = item.full_path.clone();
            self.expanded.insert(path);
            self.flatten();
        }
    }

    /// Collapse the currently selected folder, or jump to its parent.
    pub fn collapse_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };

        if item.is_folder && item.is_expanded {
            let path = item.full_path.clone();
            self.expanded.remove(&path);
            self.flatten();
            return;
        }

        if let Some((parent, _)) = item.full_path.rsplit_once('/') {
            if let Some(i) = self.flat_items.iter().position(|it| it.full_path == parent) {
                self.selected_index = i;
            }
        }
    }

    /// Toggle the selected folder open or closed.
    pub fn toggle_selected(&mut self) {
        match self.selected_item() {
            Some(item) if item.is_folder && item.is_expanded => self.collapse_selected(),
            Some(item) if item.is_folder => self.expand_selected(),
            _ => {}
        }
    }

    /// Update the scroll offset to ensure the selected item is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }
}

fn collect_folders(nodes: &[TreeNode], out: &mut HashSet<String>) {
    for node in nodes {
        if let NodeKind::Folder { children } = &node.kind {
            out.insert(node.full_path.clone());
            collect_folders(children, out);
        }
    }
}
