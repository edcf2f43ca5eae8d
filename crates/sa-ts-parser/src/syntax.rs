//! Small helpers over tree-sitter nodes.

use tree_sitter::Node;

/// Returns the source text covered by `node`.
#[inline]
pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Returns the byte offset of `node` as a resource position.
#[inline]
pub(crate) fn position(node: Node<'_>) -> u32 {
    offset_position(node.start_byte())
}

/// Offsets past `u32::MAX` saturate instead of wrapping onto earlier ones.
#[inline]
fn offset_position(offset: usize) -> u32 {
    u32::try_from(offset).unwrap_or(u32::MAX)
}

/// Returns the contents of a string literal without its quotes.
///
/// Template strings qualify only when they contain no substitutions.
/// Escape sequences are kept as written.
pub(crate) fn string_literal<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|child| child.kind() == "template_substitution")
            {
                return None;
            }
        }
        _ => return None,
    }

    let text = node_text(node, source);
    text.get(1..text.len().saturating_sub(1))
}

/// Returns `true` if `node` has a direct (possibly anonymous) child of `kind`.
pub(crate) fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|child| child.kind() == kind)
}

/// Strips parentheses, `as`/`satisfies` casts and non-null assertions.
pub(crate) fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    loop {
        match node.kind() {
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" => match node.named_child(0) {
                Some(inner) => node = inner,
                None => return node,
            },
            _ => return node,
        }
    }
}

/// Pre-order iterator over a node and all of its descendants.
pub(crate) struct Descendants<'tree> {
    stack: Vec<Node<'tree>>,
}

impl<'tree> Descendants<'tree> {
    pub(crate) fn new(root: Node<'tree>) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'tree> Iterator for Descendants<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for index in (0..node.child_count()).rev() {
            if let Some(child) = node.child(index) {
                self.stack.push(child);
            }
        }
        Some(node)
    }
}
