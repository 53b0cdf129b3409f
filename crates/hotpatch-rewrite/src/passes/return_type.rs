use hotpatch_config::RewriteConfig;
use hotpatch_syntax::{
    text_without_trivia, trimmed_text, AstNode, CastExpression, Expression, MethodDeclaration,
    SyntaxKind, SyntaxNode, TypeDeclaration,
};
use rowan::GreenNode;

use crate::{
    rewrite_tree, AppliedRewrite, RewriteAnnotator, RewriteError, RewriteOutcome, RewriteRule,
    SyntaxRewriter,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Type {
        /// Printable name, `Pair<K, V>`.
        name: String,
        /// Name with whitespace removed, for comparison against return types.
        key: String,
    },
    Method {
        return_type: String,
    },
    /// Lambdas, local functions, constructors and accessors: a `return` inside belongs to
    /// something other than the enclosing method.
    Opaque,
}

/// Casts the value of `return` statements through `object` when the enclosing method returns
/// the enclosing type. Disabled unless `cast_same_typed_returns` is set.
pub struct ReturnTypeRewriter {
    enabled: bool,
    annotator: RewriteAnnotator,
    frames: Vec<Frame>,
    rewrites: Vec<AppliedRewrite>,
}

impl ReturnTypeRewriter {
    pub fn new(config: &RewriteConfig) -> Self {
        Self {
            enabled: config.cast_same_typed_returns,
            annotator: RewriteAnnotator::new(config.write_rewrite_reason_as_comment),
            frames: Vec::new(),
            rewrites: Vec::new(),
        }
    }

    pub fn run(mut self, root: &SyntaxNode) -> Result<RewriteOutcome, RewriteError> {
        if !self.enabled {
            return Ok(RewriteOutcome {
                green: root.green().into_owned(),
                rewrites: Vec::new(),
            });
        }
        let green = rewrite_tree(root, &mut self)?;
        tracing::debug!(
            target: "hotpatch.rewrite",
            pass = "ReturnTypeRewriter",
            rewrites = self.rewrites.len(),
            "pass finished"
        );
        Ok(RewriteOutcome {
            green,
            rewrites: self.rewrites,
        })
    }

    /// The enclosing type's printable name and comparison key, when the innermost frame is a
    /// method whose return type is that type.
    fn same_typed_target(&self) -> Option<(&str, &str)> {
        let Some(Frame::Method { return_type }) = self.frames.last() else {
            return None;
        };
        let (name, key) = self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Type { name, key } => Some((name.as_str(), key.as_str())),
            _ => None,
        })?;
        (return_type == key).then_some((name, key))
    }
}

fn frame_for(node: &SyntaxNode) -> Option<Frame> {
    if let Some(decl) = TypeDeclaration::cast(node.clone()) {
        let name = decl.qualifying_name()?;
        let key = name.split_whitespace().collect();
        return Some(Frame::Type { name, key });
    }
    if let Some(method) = MethodDeclaration::cast(node.clone()) {
        let return_type = method
            .return_type()
            .map(|ty| ty.text())
            .unwrap_or_default();
        return Some(Frame::Method { return_type });
    }
    matches!(
        node.kind(),
        SyntaxKind::LambdaExpression
            | SyntaxKind::LocalFunctionStatement
            | SyntaxKind::ConstructorDeclaration
            | SyntaxKind::DestructorDeclaration
            | SyntaxKind::OperatorDeclaration
            | SyntaxKind::PropertyDeclaration
            | SyntaxKind::IndexerDeclaration
            | SyntaxKind::EventDeclaration
    )
    .then_some(Frame::Opaque)
}

impl SyntaxRewriter for ReturnTypeRewriter {
    fn enter(&mut self, node: &SyntaxNode) {
        if let Some(frame) = frame_for(node) {
            self.frames.push(frame);
        }
    }

    fn leave(&mut self, node: &SyntaxNode) {
        if frame_for(node).is_some() {
            self.frames.pop();
        }
    }

    fn rewrite(
        &mut self,
        original: &SyntaxNode,
        rebuilt: &GreenNode,
    ) -> Result<Option<GreenNode>, RewriteError> {
        let is_return_value = original
            .parent()
            .is_some_and(|parent| parent.kind() == SyntaxKind::ReturnStatement);
        if !is_return_value {
            return Ok(None);
        }
        let Some(expr) = Expression::cast(original.clone()) else {
            return Ok(None);
        };
        let Some((target, key)) = self.same_typed_target() else {
            return Ok(None);
        };
        if is_cast_through(&expr, key) {
            return Ok(None);
        }

        let rebuilt_node = SyntaxNode::new_root(rebuilt.clone());
        let text = trimmed_text(&rebuilt_node);
        let operand = if needs_parentheses(&expr) {
            format!("({text})")
        } else {
            text
        };
        let replacement = self.annotator.cast_through(target, &operand)?;
        self.rewrites.push(super::applied(
            RewriteRule::SameTypedReturn,
            original,
            &replacement,
        ));
        Ok(Some(self.annotator.finish(
            RewriteRule::SameTypedReturn,
            rebuilt,
            replacement,
        )))
    }
}

/// `(T)(object)x` for the given comparison key of `T`.
fn is_cast_through(expr: &Expression, key: &str) -> bool {
    let Expression::CastExpression(outer) = expr else {
        return false;
    };
    let Some(Expression::CastExpression(inner)) = outer.expression() else {
        return false;
    };
    let type_text = |cast: &CastExpression| {
        cast.ty()
            .map(|ty| text_without_trivia(ty.syntax()))
            .unwrap_or_default()
    };
    type_text(outer) == key && type_text(&inner) == "object"
}

/// Operands that would not bind as a whole after a `(object)` prefix cast.
fn needs_parentheses(expr: &Expression) -> bool {
    !matches!(
        expr,
        Expression::LiteralExpression(_)
            | Expression::NameExpression(_)
            | Expression::ThisExpression(_)
            | Expression::BaseExpression(_)
            | Expression::ParenthesizedExpression(_)
            | Expression::ObjectCreationExpression(_)
            | Expression::ArrayCreationExpression(_)
            | Expression::InvocationExpression(_)
            | Expression::MemberAccessExpression(_)
            | Expression::ElementAccessExpression(_)
            | Expression::PostfixUnaryExpression(_)
            | Expression::TypeOfExpression(_)
            | Expression::SizeOfExpression(_)
            | Expression::DefaultExpression(_)
            | Expression::CheckedExpression(_)
            | Expression::TupleExpression(_)
            | Expression::PredefinedType(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_for_declarations() {
        let parse = hotpatch_syntax::parse_csharp(
            "class Box<T> { Box<T> Self() { Func<int> f = () => 1; return this; } }",
        );
        assert!(parse.errors.is_empty(), "{:?}", parse.errors);
        let frames: Vec<Frame> = parse
            .syntax()
            .descendants()
            .filter_map(|node| frame_for(&node))
            .collect();
        assert_eq!(
            frames,
            vec![
                Frame::Type {
                    name: "Box<T>".to_string(),
                    key: "Box<T>".to_string(),
                },
                Frame::Method {
                    return_type: "Box<T>".to_string(),
                },
                Frame::Opaque,
            ]
        );
    }

    #[test]
    fn disabled_pass_returns_input_unchanged() {
        let parse = hotpatch_syntax::parse_csharp("class Foo { Foo M() { return other; } }");
        let outcome = ReturnTypeRewriter::new(&RewriteConfig::default())
            .run(&parse.syntax())
            .unwrap();
        assert_eq!(outcome.green, parse.green);
        assert!(outcome.rewrites.is_empty());
    }
}
