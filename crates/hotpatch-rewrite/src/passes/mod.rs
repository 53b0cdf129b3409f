//! The rewrite passes. Each one is created for a single file, walks the tree once with
//! [`crate::rewrite_tree`], and is consumed by its `run` method.

mod return_type;
mod self_reference;
mod static_fields;

pub use return_type::ReturnTypeRewriter;
pub use self_reference::SelfReferenceRewriter;
pub use static_fields::StaticFieldAccessRewriter;

use hotpatch_syntax::{trimmed_text, SyntaxNode, TextRange};
use rowan::GreenNode;

use crate::{AppliedRewrite, RewriteRule};

fn applied(rule: RewriteRule, original: &SyntaxNode, replacement: &GreenNode) -> AppliedRewrite {
    let record = AppliedRewrite {
        rule,
        range: significant_range(original),
        original: trimmed_text(original),
        replacement: trimmed_text(&SyntaxNode::new_root(replacement.clone())),
    };
    tracing::debug!(
        target: "hotpatch.rewrite",
        pass = rule.pass_name(),
        rule = rule.rule_name(),
        start = record.range.start,
        end = record.range.end,
        original = %record.original,
        replacement = %record.replacement,
        "applied rewrite"
    );
    record
}

/// Range of `node` from its first to its last non-trivia token.
fn significant_range(node: &SyntaxNode) -> TextRange {
    let mut significant = node
        .descendants_with_tokens()
        .filter_map(|el| el.into_token())
        .filter(|tok| !tok.kind().is_trivia());
    let Some(first) = significant.next() else {
        return node.text_range().into();
    };
    let last = significant.last().unwrap_or_else(|| first.clone());
    TextRange {
        start: u32::from(first.text_range().start()),
        end: u32::from(last.text_range().end()),
    }
}
