//! Copy-on-write traversal shared by every pass.
//!
//! [`rewrite_tree`] walks the red tree depth-first. Children are rebuilt before their parent is
//! offered to the rewriter, so a replacement template built from `rebuilt` already contains the
//! pass's own nested rewrites. Subtrees nobody touched keep their original green nodes.

use hotpatch_syntax::SyntaxNode;
use rowan::{GreenNode, NodeOrToken};

use crate::RewriteError;

pub trait SyntaxRewriter {
    /// Called before any child of `node` is visited.
    fn enter(&mut self, _node: &SyntaxNode) {}

    /// Called after `node` and all of its children were visited.
    fn leave(&mut self, _node: &SyntaxNode) {}

    /// Returns a replacement for `node`, or `None` to keep it.
    ///
    /// `original` is the node in the input tree and is the one to inspect for context (parents,
    /// siblings, ranges). `rebuilt` is its green node after the children were rewritten.
    fn rewrite(
        &mut self,
        original: &SyntaxNode,
        rebuilt: &GreenNode,
    ) -> Result<Option<GreenNode>, RewriteError>;
}

/// Runs `rewriter` over the tree rooted at `root` and returns the new root.
///
/// When nothing was rewritten the returned green node is `root`'s own.
pub fn rewrite_tree<R: SyntaxRewriter>(
    root: &SyntaxNode,
    rewriter: &mut R,
) -> Result<GreenNode, RewriteError> {
    Ok(rewrite_node(root, rewriter)?.unwrap_or_else(|| root.green().into_owned()))
}

fn rewrite_node<R: SyntaxRewriter>(
    node: &SyntaxNode,
    rewriter: &mut R,
) -> Result<Option<GreenNode>, RewriteError> {
    rewriter.enter(node);

    let mut replaced: Option<GreenNode> = None;
    for (index, child) in node.children_with_tokens().enumerate() {
        let NodeOrToken::Node(child) = child else {
            continue;
        };
        if let Some(new_child) = rewrite_node(&child, rewriter)? {
            let base = replaced.unwrap_or_else(|| node.green().into_owned());
            replaced = Some(base.replace_child(index, NodeOrToken::Node(new_child)));
        }
    }

    let rebuilt = replaced
        .clone()
        .unwrap_or_else(|| node.green().into_owned());
    let replacement = rewriter.rewrite(node, &rebuilt)?;

    rewriter.leave(node);
    Ok(replacement.or(replaced))
}
