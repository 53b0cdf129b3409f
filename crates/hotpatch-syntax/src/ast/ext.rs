use crate::ast::AstNode;
use crate::{SyntaxKind, SyntaxNode, SyntaxToken};

/// Concatenated text of every non-trivia token under `node`.
///
/// Suitable for comparing type names (`List<int>` vs `List< int >`), not for printing code.
pub fn text_without_trivia(node: &SyntaxNode) -> String {
    let mut out = String::new();
    for tok in node
        .descendants_with_tokens()
        .filter_map(|el| el.into_token())
        .filter(|tok| !tok.kind().is_trivia())
    {
        out.push_str(tok.text());
    }
    out
}

/// Source text of `node` without its leading and trailing trivia.
pub fn trimmed_text(node: &SyntaxNode) -> String {
    let mut significant = node
        .descendants_with_tokens()
        .filter_map(|el| el.into_token())
        .filter(|tok| !tok.kind().is_trivia());
    let Some(first) = significant.next() else {
        return String::new();
    };
    let last = significant.last().unwrap_or_else(|| first.clone());
    let node_start = node.text_range().start();
    let range = text_size::TextRange::new(
        first.text_range().start() - node_start,
        last.text_range().end() - node_start,
    );
    node.text().slice(range).to_string()
}

/// Where a [`super::NameExpression`] sits relative to its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierContext {
    /// An unqualified reference (`Count`, `Count++`, `Log(Count)`).
    Bare,
    /// The member name right of `.`, `?.` or `::` (`Foo.Count`).
    MemberName,
    /// The member being set by an object initializer or attribute argument
    /// (`new Foo { Count = 1 }`, `[Range(Min = 0)]`). It names a member of another object.
    InitializerMember,
}

impl super::NameExpression {
    pub fn name(&self) -> Option<String> {
        self.ident_token().map(|tok| tok.text().to_string())
    }

    pub fn context(&self) -> IdentifierContext {
        let Some(parent) = self.syntax().parent() else {
            return IdentifierContext::Bare;
        };
        match parent.kind() {
            SyntaxKind::MemberAccessExpression => {
                let is_member = super::MemberAccessExpression::cast(parent)
                    .and_then(|access| access.name())
                    .is_some_and(|name| name.syntax() == self.syntax());
                if is_member {
                    IdentifierContext::MemberName
                } else {
                    IdentifierContext::Bare
                }
            }
            SyntaxKind::AssignmentExpression => {
                let is_lhs = parent
                    .first_child()
                    .is_some_and(|first| &first == self.syntax());
                let in_initializer = parent.parent().is_some_and(|grand| match grand.kind() {
                    SyntaxKind::InitializerExpression => is_member_initializer(&grand),
                    SyntaxKind::Argument => grand
                        .ancestors()
                        .any(|anc| anc.kind() == SyntaxKind::Attribute),
                    _ => false,
                });
                if is_lhs && in_initializer {
                    IdentifierContext::InitializerMember
                } else {
                    IdentifierContext::Bare
                }
            }
            _ => IdentifierContext::Bare,
        }
    }
}

/// An initializer whose assignments set members of the object being built: the braces of
/// `new Foo { .. }`, or of a nested `Member = { .. }` inside such an initializer.
fn is_member_initializer(init: &SyntaxNode) -> bool {
    let Some(owner) = init.parent() else {
        return false;
    };
    match owner.kind() {
        SyntaxKind::ObjectCreationExpression => true,
        SyntaxKind::AssignmentExpression => {
            let is_value = owner.first_child().is_some_and(|first| &first != init);
            is_value
                && owner.parent().is_some_and(|outer| {
                    outer.kind() == SyntaxKind::InitializerExpression
                        && is_member_initializer(&outer)
                })
        }
        _ => false,
    }
}

impl super::Modifiers {
    pub fn keywords(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.syntax()
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| !t.kind().is_trivia())
    }

    pub fn has(&self, kind: SyntaxKind) -> bool {
        self.keywords().any(|tok| tok.kind() == kind)
    }

    pub fn has_access_modifier(&self) -> bool {
        self.keywords().any(|tok| tok.kind().is_access_modifier())
    }
}

impl super::Name {
    pub fn text(&self) -> String {
        text_without_trivia(self.syntax())
    }
}

impl super::Type {
    /// Type text with trivia removed, for textual comparison.
    pub fn text(&self) -> String {
        text_without_trivia(self.syntax())
    }
}

impl super::TypeDeclaration {
    /// Name usable to refer to this type from inside its own body: `Foo`, or `Box<T>` for
    /// generic declarations.
    pub fn qualifying_name(&self) -> Option<String> {
        let name = self.name_token()?.text().to_string();
        let Some(params) = self.type_parameter_list() else {
            return Some(name);
        };
        let params: Vec<String> = params
            .type_parameters()
            .filter_map(|param| param.name_token())
            .map(|tok| tok.text().to_string())
            .collect();
        if params.is_empty() {
            return Some(name);
        }
        Some(format!("{name}<{}>", params.join(", ")))
    }

    pub fn is_static(&self) -> bool {
        self.modifiers()
            .is_some_and(|mods| mods.has(SyntaxKind::StaticKw))
    }

    /// Names of methods declared directly in this type's body (not inherited, not nested).
    pub fn method_names(&self) -> impl Iterator<Item = String> + '_ {
        self.body()
            .into_iter()
            .flat_map(|body| body.methods().collect::<Vec<_>>())
            .filter_map(|method| method.name_token())
            .map(|tok| tok.text().to_string())
    }
}

impl super::FieldDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers()
            .is_some_and(|mods| mods.has(SyntaxKind::StaticKw))
    }

    pub fn is_explicitly_private(&self) -> bool {
        self.modifiers()
            .is_some_and(|mods| mods.has(SyntaxKind::PrivateKw))
    }

    pub fn has_access_modifier(&self) -> bool {
        self.modifiers()
            .is_some_and(|mods| mods.has_access_modifier())
    }

    pub fn declarators(&self) -> impl Iterator<Item = super::VariableDeclarator> + '_ {
        self.declaration()
            .and_then(|decl| decl.declarator_list())
            .into_iter()
            .flat_map(|list| list.declarators().collect::<Vec<_>>())
    }

    /// Every name introduced by this declaration (`int a, b;` yields `a` and `b`).
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.declarators()
            .filter_map(|decl| decl.name_token())
            .map(|tok| tok.text().to_string())
    }
}

impl super::VariableDeclaration {
    pub fn names(&self) -> Vec<String> {
        self.declarator_list()
            .into_iter()
            .flat_map(|list| list.declarators().collect::<Vec<_>>())
            .filter_map(|decl| decl.name_token())
            .map(|tok| tok.text().to_string())
            .collect()
    }
}

impl super::DeclarationExpression {
    /// `out var a` yields `a`; `var (a, (b, c))` yields `a`, `b` and `c`.
    pub fn names(&self) -> Vec<String> {
        if let Some(tok) = self.name_token() {
            return vec![tok.text().to_string()];
        }
        self.syntax()
            .children()
            .filter(|child| child.kind() == SyntaxKind::ParenthesizedVariableDesignation)
            .flat_map(|designation| designation.descendants_with_tokens())
            .filter_map(|el| el.into_token())
            .filter(|tok| tok.kind() == SyntaxKind::Identifier)
            .map(|tok| tok.text().to_string())
            .collect()
    }
}

impl super::ForEachStatement {
    /// The loop variable, or every name of a `var (a, b)` deconstruction.
    pub fn names(&self) -> Vec<String> {
        if let Some(tok) = self.name_token() {
            return vec![tok.text().to_string()];
        }
        self.syntax()
            .children()
            .filter_map(super::DeclarationExpression::cast)
            .flat_map(|decl| decl.names())
            .collect()
    }
}

impl super::MethodDeclaration {
    pub fn parameters(&self) -> impl Iterator<Item = super::Parameter> + '_ {
        // `flat_map(|list| list.parameters())` would borrow the moved `list`.
        self.parameter_list()
            .into_iter()
            .flat_map(|list| list.parameters().collect::<Vec<_>>())
    }

    pub fn is_static(&self) -> bool {
        self.modifiers()
            .is_some_and(|mods| mods.has(SyntaxKind::StaticKw))
    }
}

impl super::MemberAccessExpression {
    pub fn is_this_receiver(&self) -> bool {
        matches!(self.expression(), Some(super::Expression::ThisExpression(_)))
    }
}

impl super::Argument {
    pub fn is_by_reference(&self) -> bool {
        self.syntax()
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .any(|tok| {
                matches!(
                    tok.kind(),
                    SyntaxKind::RefKw | SyntaxKind::OutKw | SyntaxKind::InKw
                )
            })
    }
}
