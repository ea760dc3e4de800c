//! ASCII tree rendering for tag forests.

use crate::models::{TagTemplate, TagTreeNode};

/// Render a tag forest as ASCII art.
///
/// Example output:
/// ```text
/// Machine Learning
/// ├── Supervised
/// │   ├── SVM
/// │   └── Random Forest
/// └── Unsupervised
/// ```
pub fn render_tree(nodes: &[TagTreeNode]) -> String {
    let templates: Vec<TagTemplate> = nodes.iter().map(TagTemplate::from).collect();
    render_templates(&templates)
}

/// Render identity-free trees, e.g. the `tag_tree` of an export document.
pub fn render_templates(nodes: &[TagTemplate]) -> String {
    let mut output = String::new();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        render_node(&mut output, node, "", is_last, true);
    }
    output
}

fn render_node(output: &mut String, node: &TagTemplate, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        output.push_str(&node.name);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push_str(&node.name);
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
