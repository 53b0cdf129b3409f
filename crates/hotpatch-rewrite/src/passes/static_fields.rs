use hotpatch_config::{FieldVisibility, RewriteConfig};
use hotpatch_syntax::{
    AstNode, CatchClause, DeclarationExpression, ForEachStatement, ForStatement,
    IdentifierContext, LocalFunctionStatement, LocalVariableDeclarationStatement, NameExpression,
    Parameter, SyntaxKind, SyntaxNode, TypeDeclaration, UsingStatement,
};
use rowan::GreenNode;

use crate::{
    rewrite_tree, AppliedRewrite, RewriteAnnotator, RewriteError, RewriteOutcome, RewriteRule,
    ScopeMap, SyntaxRewriter,
};

/// Qualifies bare references to non-private static fields with their declaring type:
/// `Count++` becomes `Foo.Count++` inside `Foo`.
pub struct StaticFieldAccessRewriter {
    annotator: RewriteAnnotator,
    visibility: FieldVisibility,
    scopes: ScopeMap,
    types: Vec<TypeDeclaration>,
    rewrites: Vec<AppliedRewrite>,
}

impl StaticFieldAccessRewriter {
    pub fn new(config: &RewriteConfig) -> Self {
        Self {
            annotator: RewriteAnnotator::new(config.write_rewrite_reason_as_comment),
            visibility: config.field_visibility,
            scopes: ScopeMap::new(),
            types: Vec::new(),
            rewrites: Vec::new(),
        }
    }

    pub fn run(mut self, root: &SyntaxNode) -> Result<RewriteOutcome, RewriteError> {
        let green = rewrite_tree(root, &mut self)?;
        tracing::debug!(
            target: "hotpatch.rewrite",
            pass = "StaticFieldAccessRewriter",
            rewrites = self.rewrites.len(),
            "pass finished"
        );
        Ok(RewriteOutcome {
            green,
            rewrites: self.rewrites,
        })
    }
}

impl SyntaxRewriter for StaticFieldAccessRewriter {
    fn enter(&mut self, node: &SyntaxNode) {
        if let Some(decl) = TypeDeclaration::cast(node.clone()) {
            // Register before descending so uses above the declaration resolve too.
            self.scopes.register_type(&decl, self.visibility);
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
        let Some(name_expr) = NameExpression::cast(original.clone()) else {
            return Ok(None);
        };
        let Some(name) = name_expr.name() else {
            return Ok(None);
        };
        if !self.scopes.might_qualify(&name) {
            return Ok(None);
        }
        if name_expr.context() != IdentifierContext::Bare
            || name_expr.type_argument_list().is_some()
        {
            return Ok(None);
        }
        let Some(decl) = self.types.last() else {
            return Ok(None);
        };
        if !self.scopes.qualifies(decl, &name) || is_shadowed(original, &name) {
            return Ok(None);
        }
        let Some(qualifier) = decl.qualifying_name() else {
            return Ok(None);
        };

        let replacement = self.annotator.qualified_access(&qualifier, &name)?;
        self.rewrites.push(super::applied(
            RewriteRule::BareStaticField,
            original,
            &replacement,
        ));
        Ok(Some(self.annotator.finish(
            RewriteRule::BareStaticField,
            rebuilt,
            replacement,
        )))
    }
}

/// Whether a parameter or local between `node` and its enclosing type declares `name`.
fn is_shadowed(node: &SyntaxNode, name: &str) -> bool {
    for ancestor in node.ancestors().skip(1) {
        if TypeDeclaration::can_cast(ancestor.kind()) {
            return false;
        }
        let shadowed = match ancestor.kind() {
            SyntaxKind::MethodDeclaration
            | SyntaxKind::ConstructorDeclaration
            | SyntaxKind::OperatorDeclaration
            | SyntaxKind::IndexerDeclaration
            | SyntaxKind::LocalFunctionStatement
            | SyntaxKind::LambdaExpression => declares_parameter(&ancestor, name),
            SyntaxKind::AccessorDeclaration => name == "value" && has_implicit_value(&ancestor),
            SyntaxKind::CatchClause => CatchClause::cast(ancestor.clone())
                .and_then(|clause| clause.declaration())
                .and_then(|decl| decl.name_token())
                .is_some_and(|tok| tok.text() == name),
            SyntaxKind::ForStatement => ForStatement::cast(ancestor.clone())
                .and_then(|stmt| stmt.header())
                .and_then(|header| header.declaration())
                .is_some_and(|decl| decl.names().iter().any(|it| it == name)),
            SyntaxKind::ForEachStatement => ForEachStatement::cast(ancestor.clone())
                .is_some_and(|stmt| stmt.names().iter().any(|it| it == name)),
            SyntaxKind::UsingStatement => UsingStatement::cast(ancestor.clone())
                .and_then(|stmt| stmt.declaration())
                .is_some_and(|decl| decl.names().iter().any(|it| it == name)),
            SyntaxKind::Block | SyntaxKind::SwitchSection => {
                declares_local_before(&ancestor, node, name)
            }
            _ => false,
        };
        if shadowed {
            return true;
        }
    }
    false
}

fn declares_parameter(owner: &SyntaxNode, name: &str) -> bool {
    owner
        .children()
        .flat_map(|child| match child.kind() {
            SyntaxKind::ParameterList | SyntaxKind::BracketedParameterList => {
                child.children().collect::<Vec<_>>()
            }
            SyntaxKind::Parameter => vec![child],
            _ => Vec::new(),
        })
        .filter_map(Parameter::cast)
        .filter_map(|param| param.name_token())
        .any(|tok| tok.text() == name)
}

/// `set`, `init`, `add` and `remove` accessors bind an implicit `value` parameter.
fn has_implicit_value(accessor: &SyntaxNode) -> bool {
    accessor
        .children_with_tokens()
        .filter_map(|el| el.into_token())
        .any(|tok| {
            tok.kind() == SyntaxKind::Identifier
                && matches!(tok.text(), "set" | "init" | "add" | "remove")
        })
}

/// Locals of `scope` (a block or switch section) declared by statements that start before
/// `node`: declaration statements, local functions, and `out var`, pattern or deconstruction
/// variables that are not tucked inside a nested block `node` cannot see.
fn declares_local_before(scope: &SyntaxNode, node: &SyntaxNode, name: &str) -> bool {
    let node_range = node.text_range();
    scope
        .children()
        .take_while(|stmt| stmt.text_range().start() <= node_range.start())
        .any(|stmt| {
            if let Some(local) = LocalVariableDeclarationStatement::cast(stmt.clone()) {
                if local
                    .declaration()
                    .is_some_and(|decl| decl.names().iter().any(|it| it == name))
                {
                    return true;
                }
            }
            if let Some(func) = LocalFunctionStatement::cast(stmt.clone()) {
                if func.name_token().is_some_and(|tok| tok.text() == name) {
                    return true;
                }
            }
            stmt.descendants()
                .filter_map(DeclarationExpression::cast)
                .filter(|decl| decl.names().iter().any(|it| it == name))
                .any(|decl| visible_from(decl.syntax(), &stmt, node))
        })
}

/// A declaration expression under `stmt` is out of reach when a block or lambda between it and
/// `stmt` does not also contain `node`.
fn visible_from(decl: &SyntaxNode, stmt: &SyntaxNode, node: &SyntaxNode) -> bool {
    let node_range = node.text_range();
    decl.ancestors()
        .take_while(|anc| anc != stmt)
        .filter(|anc| matches!(anc.kind(), SyntaxKind::Block | SyntaxKind::LambdaExpression))
        .all(|anc| anc.text_range().contains_range(node_range))
}
