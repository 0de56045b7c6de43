//! ASCII directory tree rendering.

use indexmap::IndexMap;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Prefix trie keyed by path segment. Children keep insertion order.
#[derive(Debug, Default)]
struct TreeNode {
    children: IndexMap<String, TreeNode>,
}

impl TreeNode {
    fn insert(&mut self, path: &str) {
        let mut current = self;
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            current = current.children.entry(segment.to_owned()).or_default();
        }
    }

    fn render(&self, prefix: &str, out: &mut String) {
        let last = self.children.len().saturating_sub(1);
        for (index, (name, child)) in self.children.iter().enumerate() {
            let is_last = index == last;
            out.push_str(prefix);
            out.push_str(if is_last { LAST_BRANCH } else { BRANCH });
            out.push_str(name);
            out.push('\n');

            let continuation = format!("{prefix}{}", if is_last { SPACE } else { PIPE });
            child.render(&continuation, out);
        }
    }
}

/// Render `paths` as a box-drawing tree, one node per line.
///
/// Siblings appear in first-seen order, not sorted. Leaves and directories are not
/// distinguished.
pub fn build_tree<I, S>(paths: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut root = TreeNode::default();
    for path in paths {
        root.insert(path.as_ref());
    }

    let mut rendered = String::new();
    root.render("", &mut rendered);
    rendered
}
