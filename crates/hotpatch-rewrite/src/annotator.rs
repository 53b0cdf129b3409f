use hotpatch_syntax::{parse_csharp_expression, AstNode, Expression, SyntaxKind, SyntaxNode};
use rowan::{GreenNode, GreenToken, NodeOrToken};

use crate::{RewriteError, RewriteRule};

type GreenElement = NodeOrToken<GreenNode, GreenToken>;

/// Builds replacement expressions and decorates them.
///
/// Every pass owns one. Replacements are synthesised from text templates and parsed back with
/// the expression-fragment parser, so they are ordinary trees with correct node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteAnnotator {
    write_reason_as_comment: bool,
}

impl RewriteAnnotator {
    pub fn new(write_reason_as_comment: bool) -> Self {
        Self {
            write_reason_as_comment,
        }
    }

    pub fn writes_comments(&self) -> bool {
        self.write_reason_as_comment
    }

    /// `(target)(object)expr`
    pub fn cast_through(&self, target: &str, expr: &str) -> Result<GreenNode, RewriteError> {
        synthesize_expression(&cast_through_text(target, expr))
    }

    /// `((target)(object)expr)`, for use as a member-access receiver.
    pub fn parenthesized_cast_through(
        &self,
        target: &str,
        expr: &str,
    ) -> Result<GreenNode, RewriteError> {
        synthesize_expression(&format!("({})", cast_through_text(target, expr)))
    }

    /// `qualifier.name`
    pub fn qualified_access(&self, qualifier: &str, name: &str) -> Result<GreenNode, RewriteError> {
        synthesize_expression(&format!("{qualifier}.{name}"))
    }

    /// Moves `original`'s leading and trailing trivia onto `replacement`, and appends the rule
    /// comment in between when comments are enabled.
    pub fn finish(&self, rule: RewriteRule, original: &GreenNode, replacement: GreenNode) -> GreenNode {
        let comment = self
            .write_reason_as_comment
            .then(|| GreenToken::new(SyntaxKind::BlockComment.into(), &rule.comment()));
        attach_trivia(original, replacement, comment)
    }
}

pub fn cast_through_text(target: &str, expr: &str) -> String {
    format!("({target})(object){expr}")
}

/// Parses `template` as a single expression and returns its green node.
pub fn synthesize_expression(template: &str) -> Result<GreenNode, RewriteError> {
    let parse = parse_csharp_expression(template);
    if let Some(err) = parse.errors.first() {
        return Err(RewriteError::Synthesis {
            template: template.to_string(),
            message: err.message.clone(),
        });
    }
    let root = parse.syntax();
    let expr = root
        .children()
        .find_map(Expression::cast)
        .ok_or_else(|| RewriteError::Synthesis {
            template: template.to_string(),
            message: "no expression produced".to_string(),
        })?;
    Ok(expr.syntax().green().into_owned())
}

/// `replacement` carrying the leading and trailing trivia of `original`.
pub fn with_trivia_from(original: &GreenNode, replacement: GreenNode) -> GreenNode {
    attach_trivia(original, replacement, None)
}

fn attach_trivia(
    original: &GreenNode,
    replacement: GreenNode,
    comment: Option<GreenToken>,
) -> GreenNode {
    let (leading, trailing) = edge_trivia(original);
    if leading.is_empty() && trailing.is_empty() && comment.is_none() {
        return replacement;
    }

    let mut children: Vec<GreenElement> = leading.into_iter().map(NodeOrToken::Token).collect();
    children.extend(replacement.children().map(|child| match child {
        NodeOrToken::Node(node) => NodeOrToken::Node(node.to_owned()),
        NodeOrToken::Token(token) => NodeOrToken::Token(token.to_owned()),
    }));
    children.extend(comment.map(NodeOrToken::Token));
    children.extend(trailing.into_iter().map(NodeOrToken::Token));
    GreenNode::new(replacement.kind(), children)
}

/// Trivia tokens before the first and after the last significant token of `node`.
fn edge_trivia(node: &GreenNode) -> (Vec<GreenToken>, Vec<GreenToken>) {
    let tokens: Vec<_> = SyntaxNode::new_root(node.clone())
        .descendants_with_tokens()
        .filter_map(|el| el.into_token())
        .collect();
    let Some(first) = tokens.iter().position(|tok| !tok.kind().is_trivia()) else {
        let all = tokens.iter().map(|tok| tok.green().to_owned()).collect();
        return (all, Vec::new());
    };
    let last = tokens
        .iter()
        .rposition(|tok| !tok.kind().is_trivia())
        .unwrap_or(first);

    let leading = tokens[..first]
        .iter()
        .map(|tok| tok.green().to_owned())
        .collect();
    let trailing = tokens[last + 1..]
        .iter()
        .map(|tok| tok.green().to_owned())
        .collect();
    (leading, trailing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotpatch_syntax::debug_dump;

    fn text(green: &GreenNode) -> String {
        SyntaxNode::new_root(green.clone()).to_string()
    }

    fn expression(src: &str) -> GreenNode {
        synthesize_expression(src).unwrap()
    }

    #[test]
    fn cast_through_parses_as_nested_casts() {
        let annotator = RewriteAnnotator::new(false);
        let green = annotator.cast_through("Foo", "this").unwrap();
        assert_eq!(text(&green), "(Foo)(object)this");

        let node = SyntaxNode::new_root(green);
        assert_eq!(node.kind(), SyntaxKind::CastExpression);
        let inner = node.children().find(|n| n.kind() == SyntaxKind::CastExpression);
        assert!(inner.is_some(), "{}", debug_dump(&node));
    }

    #[test]
    fn cast_through_generic_target() {
        let annotator = RewriteAnnotator::new(false);
        let green = annotator.cast_through("Pair<K, V>", "this").unwrap();
        assert_eq!(text(&green), "(Pair<K, V>)(object)this");
        assert_eq!(
            SyntaxNode::new_root(green).kind(),
            SyntaxKind::CastExpression
        );
    }

    #[test]
    fn parenthesized_receiver() {
        let annotator = RewriteAnnotator::new(false);
        let green = annotator.parenthesized_cast_through("Foo", "this").unwrap();
        assert_eq!(text(&green), "((Foo)(object)this)");
        assert_eq!(
            SyntaxNode::new_root(green).kind(),
            SyntaxKind::ParenthesizedExpression
        );
    }

    #[test]
    fn broken_template_is_a_synthesis_error() {
        let err = synthesize_expression("Foo.").unwrap_err();
        assert!(matches!(err, RewriteError::Synthesis { ref template, .. } if template == "Foo."));

        let err = synthesize_expression("a b").unwrap_err();
        assert!(matches!(err, RewriteError::Synthesis { .. }));
    }

    #[test]
    fn trivia_moves_onto_replacement() {
        let original = expression("Count");
        let replacement = expression("Foo.Count");
        assert_eq!(text(&with_trivia_from(&original, replacement.clone())), "Foo.Count");

        // Trivia-carrying original: build `Count /*c*/ ` by hand.
        let original = GreenNode::new(
            SyntaxKind::NameExpression.into(),
            [
                NodeOrToken::Token(GreenToken::new(SyntaxKind::Whitespace.into(), " ")),
                NodeOrToken::Token(GreenToken::new(SyntaxKind::Identifier.into(), "Count")),
                NodeOrToken::Token(GreenToken::new(SyntaxKind::Whitespace.into(), " ")),
                NodeOrToken::Token(GreenToken::new(SyntaxKind::BlockComment.into(), "/*c*/")),
            ],
        );
        let moved = with_trivia_from(&original, replacement.clone());
        assert_eq!(text(&moved), " Foo.Count /*c*/");
        assert_eq!(
            SyntaxNode::new_root(moved).kind(),
            SyntaxKind::MemberAccessExpression
        );

        let annotated = RewriteAnnotator::new(true).finish(
            RewriteRule::BareStaticField,
            &original,
            replacement,
        );
        assert_eq!(
            text(&annotated),
            " Foo.Count/*StaticFieldAccessRewriter:BareIdentifier*/ /*c*/"
        );
    }

    #[test]
    fn disabled_comments_leave_replacement_structurally_unchanged() {
        let original = expression("this");
        let replacement = expression("(Foo)(object)this");
        let finished =
            RewriteAnnotator::new(false).finish(RewriteRule::ThisArgument, &original, replacement.clone());
        assert_eq!(finished, replacement);
    }
}
