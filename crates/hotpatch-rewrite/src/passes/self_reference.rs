use hotpatch_config::RewriteConfig;
use hotpatch_syntax::{
    Argument, AssignmentExpression, AstNode, InvocationExpression, MemberAccessExpression,
    SyntaxKind, SyntaxNode, TypeDeclaration,
};
use rowan::GreenNode;

use crate::{
    rewrite_tree, AppliedRewrite, RewriteAnnotator, RewriteError, RewriteOutcome, RewriteRule,
    SyntaxRewriter,
};

/// Rewrites `this` where the patched type's identity leaks out of the instance: as an argument,
/// as an assigned value, as the receiver of a call to a method the type does not declare itself,
/// and as a returned value.
pub struct SelfReferenceRewriter {
    annotator: RewriteAnnotator,
    types: Vec<TypeDeclaration>,
    rewrites: Vec<AppliedRewrite>,
}

impl SelfReferenceRewriter {
    pub fn new(config: &RewriteConfig) -> Self {
        Self {
            annotator: RewriteAnnotator::new(config.write_rewrite_reason_as_comment),
            types: Vec::new(),
            rewrites: Vec::new(),
        }
    }

    pub fn run(mut self, root: &SyntaxNode) -> Result<RewriteOutcome, RewriteError> {
        let green = rewrite_tree(root, &mut self)?;
        tracing::debug!(
            target: "hotpatch.rewrite",
            pass = "SelfReferenceRewriter",
            rewrites = self.rewrites.len(),
            "pass finished"
        );
        Ok(RewriteOutcome {
            green,
            rewrites: self.rewrites,
        })
    }
}

impl SyntaxRewriter for SelfReferenceRewriter {
    fn enter(&mut self, node: &SyntaxNode) {
        if let Some(decl) = TypeDeclaration::cast(node.clone()) {
            self.types.push(decl);
        }
    }

    fn leave(&mut self, node: &SyntaxNode) {
        if TypeDeclaration::can_cast(node.kind()) {
            self.types.pop();
        }
    }

    fn rewrite(
        &mut self,
        original: &SyntaxNode,
        rebuilt: &GreenNode,
    ) -> Result<Option<GreenNode>, RewriteError> {
        if original.kind() != SyntaxKind::ThisExpression {
            return Ok(None);
        }
        let Some(decl) = self.types.last() else {
            return Ok(None);
        };
        let Some(rule) = classify(original, decl) else {
            return Ok(None);
        };
        let Some(target) = decl.qualifying_name() else {
            return Ok(None);
        };

        let replacement = match rule {
            RewriteRule::ThisInvocationReceiver => {
                self.annotator.parenthesized_cast_through(&target, "this")?
            }
            _ => self.annotator.cast_through(&target, "this")?,
        };
        self.rewrites.push(super::applied(rule, original, &replacement));
        Ok(Some(self.annotator.finish(rule, rebuilt, replacement)))
    }
}

/// Which rule, if any, applies to the `this` expression `node` inside `decl`.
fn classify(node: &SyntaxNode, decl: &TypeDeclaration) -> Option<RewriteRule> {
    let parent = node.parent()?;
    match parent.kind() {
        // `ref this` must stay a variable reference.
        SyntaxKind::Argument => {
            let by_ref = Argument::cast(parent)?.is_by_reference();
            (!by_ref).then_some(RewriteRule::ThisArgument)
        }
        SyntaxKind::AssignmentExpression => {
            let assignment = AssignmentExpression::cast(parent)?;
            let is_rhs = assignment.rhs().is_some_and(|rhs| rhs.syntax() == node);
            is_rhs.then_some(RewriteRule::ThisAssignmentValue)
        }
        SyntaxKind::ReturnStatement => Some(RewriteRule::ThisReturnValue),
        SyntaxKind::MemberAccessExpression => {
            let access = MemberAccessExpression::cast(parent.clone())?;
            if !access.is_this_receiver() {
                return None;
            }
            let invocation = InvocationExpression::cast(parent.parent()?)?;
            let callee_is_access = invocation
                .callee()
                .is_some_and(|callee| callee.syntax() == &parent);
            if !callee_is_access {
                return None;
            }
            let method = access.name()?.name()?;
            let declared_here = decl.method_names().any(|name| name == method);
            (!declared_here).then_some(RewriteRule::ThisInvocationReceiver)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotpatch_syntax::parse_csharp;

    fn rules(src: &str) -> Vec<Option<RewriteRule>> {
        let parse = parse_csharp(src);
        assert!(parse.errors.is_empty(), "{:?}", parse.errors);
        let root = parse.syntax();
        root.descendants()
            .filter(|node| node.kind() == SyntaxKind::ThisExpression)
            .map(|node| {
                let decl = node.ancestors().find_map(TypeDeclaration::cast).unwrap();
                classify(&node, &decl)
            })
            .collect()
    }

    #[test]
    fn classifies_positions() {
        assert_eq!(
            rules(
                "class Foo : Base {
                    Foo other;
                    void Own() { }
                    Foo M() {
                        Log(this);
                        other = this;
                        this.Own();
                        this.Inherited();
                        this.other = null;
                        var same = this == other;
                        Swap(ref this);
                        return this;
                    }
                }"
            ),
            vec![
                Some(RewriteRule::ThisArgument),
                Some(RewriteRule::ThisAssignmentValue),
                None,
                Some(RewriteRule::ThisInvocationReceiver),
                None,
                None,
                None,
                Some(RewriteRule::ThisReturnValue),
            ]
        );
    }

    #[test]
    fn assignment_target_is_not_rewritten() {
        assert_eq!(
            rules("struct S { void Reset() { this = default; } }"),
            vec![None]
        );
    }
}
