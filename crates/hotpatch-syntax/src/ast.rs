use crate::parser::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(syntax: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

pub mod support {
    use crate::ast::AstNode;
    use crate::parser::{SyntaxNode, SyntaxToken};
    use crate::syntax_kind::SyntaxKind;

    pub fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
        node.children().find_map(N::cast)
    }

    pub fn children<'a, N: AstNode + 'a>(node: &'a SyntaxNode) -> impl Iterator<Item = N> + 'a {
        node.children().filter_map(N::cast)
    }

    pub fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
        node.children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|tok| tok.kind() == kind)
    }

    pub fn tokens<'a>(
        node: &'a SyntaxNode,
        kind: SyntaxKind,
    ) -> impl Iterator<Item = SyntaxToken> + 'a {
        node.children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(move |tok| tok.kind() == kind)
    }

    /// The declared name among the node's direct children.
    ///
    /// Contextual keywords such as `record` are lexed as identifiers and precede the name, and
    /// explicit interface implementations (`IFoo.Bar`) put the member name last, so the last
    /// direct identifier wins.
    pub fn ident_token(node: &SyntaxNode) -> Option<SyntaxToken> {
        tokens(node, SyntaxKind::Identifier).last()
    }
}

mod ext;
mod nodes;

pub use ext::{text_without_trivia, trimmed_text, IdentifierContext};
pub use nodes::*;

impl CompilationUnit {
    /// Type declarations at any namespace depth, outermost first.
    pub fn type_declarations(&self) -> impl Iterator<Item = TypeDeclaration> + '_ {
        self.syntax()
            .descendants()
            .filter_map(TypeDeclaration::cast)
    }
}

/// First non-trivia token of `node`, if any.
pub fn first_significant_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.descendants_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|tok| !tok.kind().is_trivia())
}
