use std::collections::VecDeque;

use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, NodeOrToken};
use text_size::TextSize;

use crate::lexer::{lex_with_errors, Token};
use crate::syntax_kind::{CSharpLanguage, SyntaxKind};
use crate::{ParseError, TextRange};

pub type SyntaxNode = rowan::SyntaxNode<CSharpLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<CSharpLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<CSharpLanguage>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSharpParseResult {
    pub green: GreenNode,
    pub errors: Vec<ParseError>,
}

impl CSharpParseResult {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn token_at_offset(&self, offset: u32) -> rowan::TokenAtOffset<SyntaxToken> {
        self.syntax().token_at_offset(TextSize::from(offset))
    }
}

/// Parse a full C# compilation unit.
pub fn parse_csharp(input: &str) -> CSharpParseResult {
    let result = Parser::new(input).parse_compilation_unit();
    tracing::trace!(
        target: "hotpatch.syntax",
        len = input.len(),
        errors = result.errors.len(),
        "parsed compilation unit"
    );
    result
}

/// Parse a single C# expression.
///
/// The root is an [`SyntaxKind::ExpressionFragment`] whose first child node is the expression.
/// Anything after the expression (other than trivia) is reported as an error.
pub fn parse_csharp_expression(input: &str) -> CSharpParseResult {
    Parser::new(input).parse_expression_fragment()
}

// Binding powers. Larger binds tighter.
const ASSIGNMENT_BP: (u8, u8) = (1, 0);
const CONDITIONAL_BP: (u8, u8) = (2, 1);
const RELATIONAL_BP: u8 = 17;
const SHIFT_BP: u8 = 19;
const SWITCH_EXPRESSION_BP: u8 = 26;
const PREFIX_BP: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalStart {
    Variable,
    Function,
    None,
}

struct Parser<'a> {
    input: &'a str,
    tokens: VecDeque<Token>,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let (tokens, lex_errors) = lex_with_errors(input);
        let errors = lex_errors
            .into_iter()
            .map(|err| ParseError {
                message: err.message,
                range: err.range,
            })
            .collect();
        Self {
            input,
            tokens: VecDeque::from(tokens),
            builder: GreenNodeBuilder::new(),
            errors,
        }
    }

    fn parse_compilation_unit(mut self) -> CSharpParseResult {
        self.builder.start_node(SyntaxKind::CompilationUnit.into());
        self.parse_namespace_members(false);
        self.eat_trivia();
        self.expect(SyntaxKind::Eof, "expected end of file");
        self.builder.finish_node();

        CSharpParseResult {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    fn parse_expression_fragment(mut self) -> CSharpParseResult {
        self.builder
            .start_node(SyntaxKind::ExpressionFragment.into());
        self.parse_expression(0);
        self.eat_trivia();
        if !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::Error.into());
            self.error_here("unexpected input after expression");
            while !self.at(SyntaxKind::Eof) {
                self.bump_any();
            }
            self.builder.finish_node();
        }
        self.expect(SyntaxKind::Eof, "expected end of expression");
        self.builder.finish_node();

        CSharpParseResult {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // --- Declarations ---

    fn parse_namespace_members(&mut self, braced: bool) {
        loop {
            match self.current() {
                SyntaxKind::Eof => break,
                SyntaxKind::RBrace if braced => break,
                SyntaxKind::UsingKw if self.nth(1) != Some(SyntaxKind::LParen) => {
                    self.parse_using_directive()
                }
                SyntaxKind::Identifier
                    if self.nth_text(0) == "global" && self.nth(1) == Some(SyntaxKind::UsingKw) =>
                {
                    self.parse_using_directive()
                }
                SyntaxKind::ExternKw if self.nth_text(1) == "alias" => self.parse_using_directive(),
                SyntaxKind::NamespaceKw => self.parse_namespace_declaration(),
                _ if self.at_type_decl_start() => self.parse_type_declaration(),
                _ => self.recover_top_level(),
            }
        }
    }

    fn parse_using_directive(&mut self) {
        self.builder.start_node(SyntaxKind::UsingDirective.into());
        if self.at(SyntaxKind::ExternKw) {
            // `extern alias Foo;`
            self.bump();
            self.bump();
            self.expect_ident("expected alias name");
            self.expect(SyntaxKind::Semicolon, "expected `;` after extern alias");
            self.builder.finish_node();
            return;
        }
        if self.at(SyntaxKind::Identifier) {
            self.bump(); // global
        }
        self.expect(SyntaxKind::UsingKw, "expected `using`");
        if self.at(SyntaxKind::StaticKw) {
            self.bump();
        }
        if self.at(SyntaxKind::Identifier) && self.nth(1) == Some(SyntaxKind::Eq) {
            self.bump();
            self.bump();
            self.parse_type();
        } else {
            self.parse_name();
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` after using directive");
        self.builder.finish_node();
    }

    fn parse_namespace_declaration(&mut self) {
        self.builder
            .start_node(SyntaxKind::NamespaceDeclaration.into());
        self.expect(SyntaxKind::NamespaceKw, "expected `namespace`");
        self.parse_name();
        if self.at(SyntaxKind::Semicolon) {
            // File-scoped namespace: the rest of the file belongs to it.
            self.bump();
            self.parse_namespace_members(false);
        } else {
            self.builder.start_node(SyntaxKind::NamespaceBody.into());
            self.expect(SyntaxKind::LBrace, "expected `{`");
            self.parse_namespace_members(true);
            self.expect(SyntaxKind::RBrace, "expected `}`");
            self.builder.finish_node();
            if self.at(SyntaxKind::Semicolon) {
                self.bump();
            }
        }
        self.builder.finish_node();
    }

    fn parse_type_declaration(&mut self) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_modifiers();
        self.parse_type_declaration_inner(checkpoint);
    }

    fn parse_type_declaration_inner(&mut self, checkpoint: Checkpoint) {
        match self.current() {
            SyntaxKind::ClassKw => self.parse_class_like(checkpoint, SyntaxKind::ClassDeclaration),
            SyntaxKind::StructKw => {
                self.parse_class_like(checkpoint, SyntaxKind::StructDeclaration)
            }
            SyntaxKind::InterfaceKw => {
                self.parse_class_like(checkpoint, SyntaxKind::InterfaceDeclaration)
            }
            SyntaxKind::Identifier if self.at_record_start() => {
                self.parse_class_like(checkpoint, SyntaxKind::RecordDeclaration)
            }
            SyntaxKind::EnumKw => self.parse_enum_declaration(checkpoint),
            SyntaxKind::DelegateKw => self.parse_delegate_declaration(checkpoint),
            SyntaxKind::Semicolon => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::EmptyDeclaration.into());
                self.bump();
                self.builder.finish_node();
            }
            _ => {
                self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("expected type declaration");
                if !self.at(SyntaxKind::Eof) && !self.at(SyntaxKind::RBrace) {
                    self.bump_any();
                }
                self.recover_to(TOP_LEVEL_RECOVERY);
                self.builder.finish_node();
            }
        }
    }

    fn at_record_start(&self) -> bool {
        self.nth_text(0) == "record"
            && matches!(
                self.nth(1),
                Some(SyntaxKind::Identifier | SyntaxKind::ClassKw | SyntaxKind::StructKw)
            )
    }

    /// `class`, `struct`, `interface` and `record` share one shape.
    fn parse_class_like(&mut self, checkpoint: Checkpoint, decl_kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, decl_kind.into());
        self.bump(); // class / struct / interface / record
        if decl_kind == SyntaxKind::RecordDeclaration
            && matches!(self.current(), SyntaxKind::ClassKw | SyntaxKind::StructKw)
        {
            self.bump();
        }
        self.expect_ident("expected type name");
        if self.at(SyntaxKind::Less) {
            self.parse_type_parameter_list();
        }
        if self.at(SyntaxKind::LParen) {
            // Primary constructor parameters.
            self.parse_parameter_list();
        }
        if self.at(SyntaxKind::Colon) {
            self.parse_base_list();
        }
        while self.at_contextual("where") {
            self.parse_constraint_clause();
        }
        if self.at(SyntaxKind::LBrace) {
            self.parse_type_body();
        } else {
            self.expect(SyntaxKind::Semicolon, "expected `{` or `;`");
        }
        if self.at(SyntaxKind::Semicolon) {
            self.bump();
        }
        self.builder.finish_node();
    }

    fn parse_enum_declaration(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::EnumDeclaration.into());
        self.expect(SyntaxKind::EnumKw, "expected `enum`");
        self.expect_ident("expected enum name");
        if self.at(SyntaxKind::Colon) {
            self.parse_base_list();
        }

        self.builder.start_node(SyntaxKind::EnumBody.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::EnumMember.into());
            self.parse_modifiers();
            self.expect_ident("expected enum member name");
            if self.at(SyntaxKind::Eq) {
                self.bump();
                self.parse_expression(0);
            }
            self.builder.finish_node();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();

        if self.at(SyntaxKind::Semicolon) {
            self.bump();
        }
        self.builder.finish_node();
    }

    fn parse_delegate_declaration(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::DelegateDeclaration.into());
        self.expect(SyntaxKind::DelegateKw, "expected `delegate`");
        self.parse_type();
        self.expect_ident("expected delegate name");
        if self.at(SyntaxKind::Less) {
            self.parse_type_parameter_list();
        }
        self.parse_parameter_list();
        while self.at_contextual("where") {
            self.parse_constraint_clause();
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` after delegate declaration");
        self.builder.finish_node();
    }

    fn parse_type_parameter_list(&mut self) {
        self.builder
            .start_node(SyntaxKind::TypeParameterList.into());
        self.expect(SyntaxKind::Less, "expected `<`");
        while !self.at_closing_angle() && !self.at(SyntaxKind::Eof) {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::TypeParameter.into());
            while self.at(SyntaxKind::LBracket) {
                self.parse_attribute_list();
            }
            if matches!(self.current(), SyntaxKind::InKw | SyntaxKind::OutKw) {
                self.bump();
            }
            self.expect_ident("expected type parameter name");
            self.builder.finish_node();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect_gt();
        self.builder.finish_node();
    }

    fn parse_base_list(&mut self) {
        self.builder.start_node(SyntaxKind::BaseList.into());
        self.expect(SyntaxKind::Colon, "expected `:`");
        loop {
            self.parse_type();
            if self.at(SyntaxKind::LParen) {
                // `record R(int X) : Base(X)`
                self.parse_argument_list();
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.builder.finish_node();
    }

    fn parse_constraint_clause(&mut self) {
        self.builder
            .start_node(SyntaxKind::TypeConstraintClause.into());
        self.bump(); // where
        self.expect_ident("expected type parameter name");
        self.expect(SyntaxKind::Colon, "expected `:` in type constraint");
        loop {
            match self.current() {
                SyntaxKind::ClassKw | SyntaxKind::StructKw => {
                    self.bump();
                    if self.at(SyntaxKind::Question) {
                        self.bump();
                    }
                }
                SyntaxKind::NewKw => {
                    self.bump();
                    self.expect(SyntaxKind::LParen, "expected `(` after `new`");
                    self.expect(SyntaxKind::RParen, "expected `)`");
                }
                SyntaxKind::DefaultKw => self.bump(),
                _ => {
                    self.parse_type();
                }
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.builder.finish_node();
    }

    fn parse_type_body(&mut self) {
        self.builder.start_node(SyntaxKind::TypeBody.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let before = self.tokens.len();
            self.parse_member();
            self.ensure_progress(before, "unexpected token in type body");
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn parse_member(&mut self) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_modifiers();

        match self.current() {
            SyntaxKind::Semicolon => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::EmptyDeclaration.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::ClassKw
            | SyntaxKind::StructKw
            | SyntaxKind::InterfaceKw
            | SyntaxKind::EnumKw
            | SyntaxKind::DelegateKw => self.parse_type_declaration_inner(checkpoint),
            SyntaxKind::Identifier if self.at_record_start() => {
                self.parse_type_declaration_inner(checkpoint)
            }
            SyntaxKind::EventKw => self.parse_event_declaration(checkpoint),
            SyntaxKind::Tilde => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::DestructorDeclaration.into());
                self.bump();
                self.expect_ident("expected destructor name");
                self.parse_parameter_list();
                self.parse_function_body();
                self.builder.finish_node();
            }
            SyntaxKind::ImplicitKw | SyntaxKind::ExplicitKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::OperatorDeclaration.into());
                self.bump();
                self.expect(SyntaxKind::OperatorKw, "expected `operator`");
                self.parse_type();
                self.parse_parameter_list();
                self.parse_function_body();
                self.builder.finish_node();
            }
            SyntaxKind::Identifier if self.nth(1) == Some(SyntaxKind::LParen) => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ConstructorDeclaration.into());
                self.bump(); // name
                self.parse_parameter_list();
                if self.at(SyntaxKind::Colon) {
                    self.builder
                        .start_node(SyntaxKind::ConstructorInitializer.into());
                    self.bump();
                    if matches!(self.current(), SyntaxKind::BaseKw | SyntaxKind::ThisKw) {
                        self.bump();
                    } else {
                        self.error_here("expected `base` or `this`");
                    }
                    self.parse_argument_list();
                    self.builder.finish_node();
                }
                self.parse_function_body();
                self.builder.finish_node();
            }
            _ if self.at_type_start() => {
                self.eat_trivia();
                let type_checkpoint = self.builder.checkpoint();
                self.parse_type();
                self.parse_member_after_type(checkpoint, type_checkpoint);
            }
            _ => {
                self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("unexpected token in type body");
                self.recover_to_member_boundary();
                self.builder.finish_node();
            }
        }
    }

    fn parse_member_after_type(&mut self, checkpoint: Checkpoint, type_checkpoint: Checkpoint) {
        match self.current() {
            SyntaxKind::OperatorKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::OperatorDeclaration.into());
                self.bump();
                // The operator token itself; `>>` and friends are single tokens.
                if !self.at(SyntaxKind::LParen) && !self.at(SyntaxKind::Eof) {
                    self.bump();
                }
                self.parse_parameter_list();
                self.parse_function_body();
                self.builder.finish_node();
            }
            SyntaxKind::ThisKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::IndexerDeclaration.into());
                self.bump();
                self.parse_bracketed_parameter_list();
                self.parse_property_body();
                self.builder.finish_node();
            }
            SyntaxKind::Identifier => {
                let is_field = matches!(
                    self.nth(1),
                    Some(SyntaxKind::Eq | SyntaxKind::Semicolon | SyntaxKind::Comma | SyntaxKind::LBracket)
                        | None
                );
                if is_field {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::FieldDeclaration.into());
                    self.builder
                        .start_node_at(type_checkpoint, SyntaxKind::VariableDeclaration.into());
                    self.parse_variable_declarator_list();
                    self.builder.finish_node();
                    self.expect(SyntaxKind::Semicolon, "expected `;` after field declaration");
                    self.builder.finish_node();
                    return;
                }

                // Method or property; explicit interface implementations carry a dotted name.
                self.bump();
                while self.at(SyntaxKind::Dot) && self.nth(1) == Some(SyntaxKind::Identifier) {
                    self.bump();
                    self.bump();
                }
                match self.current() {
                    SyntaxKind::Less | SyntaxKind::LParen => {
                        self.builder
                            .start_node_at(checkpoint, SyntaxKind::MethodDeclaration.into());
                        if self.at(SyntaxKind::Less) {
                            self.parse_type_parameter_list();
                        }
                        self.parse_parameter_list();
                        while self.at_contextual("where") {
                            self.parse_constraint_clause();
                        }
                        self.parse_function_body();
                        self.builder.finish_node();
                    }
                    SyntaxKind::LBrace | SyntaxKind::FatArrow => {
                        self.builder
                            .start_node_at(checkpoint, SyntaxKind::PropertyDeclaration.into());
                        self.parse_property_body();
                        self.builder.finish_node();
                    }
                    _ => {
                        self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
                        self.error_here("expected `(`, `{` or `;` after member name");
                        self.recover_to_member_boundary();
                        self.builder.finish_node();
                    }
                }
            }
            _ => {
                self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("expected member name");
                self.recover_to_member_boundary();
                self.builder.finish_node();
            }
        }
    }

    fn parse_event_declaration(&mut self, checkpoint: Checkpoint) {
        self.bump(); // event
        self.eat_trivia();
        let type_checkpoint = self.builder.checkpoint();
        self.parse_type();
        let has_accessors = self.at(SyntaxKind::Identifier)
            && matches!(self.nth(1), Some(SyntaxKind::LBrace | SyntaxKind::Dot));
        if has_accessors {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::EventDeclaration.into());
            self.bump();
            while self.at(SyntaxKind::Dot) && self.nth(1) == Some(SyntaxKind::Identifier) {
                self.bump();
                self.bump();
            }
            self.parse_accessor_list();
        } else {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::EventFieldDeclaration.into());
            self.builder
                .start_node_at(type_checkpoint, SyntaxKind::VariableDeclaration.into());
            self.parse_variable_declarator_list();
            self.builder.finish_node();
            self.expect(SyntaxKind::Semicolon, "expected `;` after event declaration");
        }
        self.builder.finish_node();
    }

    /// Accessor list or `=> expr;`, plus an optional `= initializer;` after accessors.
    fn parse_property_body(&mut self) {
        if self.at(SyntaxKind::FatArrow) {
            self.parse_arrow_expression_clause();
            self.expect(SyntaxKind::Semicolon, "expected `;` after expression body");
            return;
        }
        self.parse_accessor_list();
        if self.at(SyntaxKind::Eq) {
            self.bump();
            self.parse_variable_initializer();
            self.expect(SyntaxKind::Semicolon, "expected `;` after property initializer");
        }
    }

    fn parse_accessor_list(&mut self) {
        self.builder.start_node(SyntaxKind::AccessorList.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let before = self.tokens.len();
            self.eat_trivia();
            self.builder
                .start_node(SyntaxKind::AccessorDeclaration.into());
            self.parse_modifiers();
            if self.at(SyntaxKind::Identifier)
                && matches!(self.nth_text(0), "get" | "set" | "init" | "add" | "remove")
            {
                self.bump();
                self.parse_function_body();
            } else {
                self.error_here("expected accessor");
            }
            self.builder.finish_node();
            self.ensure_progress(before, "unexpected token in accessor list");
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    /// `{ ... }`, `=> expr;` or `;`.
    fn parse_function_body(&mut self) {
        match self.current() {
            SyntaxKind::LBrace => self.parse_block(),
            SyntaxKind::FatArrow => {
                self.parse_arrow_expression_clause();
                self.expect(SyntaxKind::Semicolon, "expected `;` after expression body");
            }
            _ => {
                self.expect(SyntaxKind::Semicolon, "expected `;` or body");
            }
        }
    }

    fn parse_arrow_expression_clause(&mut self) {
        self.builder
            .start_node(SyntaxKind::ArrowExpressionClause.into());
        self.expect(SyntaxKind::FatArrow, "expected `=>`");
        self.parse_expression(0);
        self.builder.finish_node();
    }

    fn parse_modifiers(&mut self) {
        self.builder.start_node(SyntaxKind::Modifiers.into());
        loop {
            self.eat_trivia();
            match self.current() {
                SyntaxKind::LBracket => self.parse_attribute_list(),
                SyntaxKind::RefKw => self.bump(),
                // `event` starts its own member shape.
                SyntaxKind::EventKw => break,
                kind if kind.is_modifier_keyword()
                    && !matches!(kind, SyntaxKind::ImplicitKw | SyntaxKind::ExplicitKw) =>
                {
                    self.bump()
                }
                SyntaxKind::Identifier if self.at_contextual_modifier() => self.bump(),
                _ => break,
            }
        }
        self.builder.finish_node();
    }

    fn at_contextual_modifier(&self) -> bool {
        let next = self.nth(1);
        match self.nth_text(0) {
            "partial" => matches!(
                next,
                Some(
                    SyntaxKind::ClassKw
                        | SyntaxKind::StructKw
                        | SyntaxKind::InterfaceKw
                        | SyntaxKind::VoidKw
                        | SyntaxKind::Identifier
                )
            ),
            "async" => next.is_some_and(|kind| {
                kind == SyntaxKind::Identifier
                    || kind == SyntaxKind::VoidKw
                    || kind.is_predefined_type()
                    || kind.is_modifier_keyword()
            }) && self.nth(2) != Some(SyntaxKind::FatArrow),
            "file" | "required" => next.is_some_and(|kind| {
                kind.is_modifier_keyword()
                    || kind.is_predefined_type()
                    || matches!(
                        kind,
                        SyntaxKind::ClassKw | SyntaxKind::StructKw | SyntaxKind::Identifier
                    )
            }) && !matches!(self.nth(2), Some(SyntaxKind::Eq | SyntaxKind::Semicolon)),
            _ => false,
        }
    }

    fn parse_attribute_list(&mut self) {
        self.builder.start_node(SyntaxKind::AttributeList.into());
        self.expect(SyntaxKind::LBracket, "expected `[`");
        if matches!(self.current(), SyntaxKind::Identifier | SyntaxKind::ReturnKw)
            && self.nth(1) == Some(SyntaxKind::Colon)
        {
            // Attribute target (`assembly:`, `field:`, `return:`, ...).
            self.bump();
            self.bump();
        }
        while !self.at(SyntaxKind::RBracket) && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::Attribute.into());
            self.parse_name();
            if self.at(SyntaxKind::LParen) {
                self.parse_argument_list();
            }
            self.builder.finish_node();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RBracket, "expected `]`");
        self.builder.finish_node();
    }

    fn parse_name(&mut self) {
        self.builder.start_node(SyntaxKind::Name.into());
        self.expect_ident("expected name");
        while matches!(self.current(), SyntaxKind::Dot | SyntaxKind::DoubleColon)
            && self.nth(1) == Some(SyntaxKind::Identifier)
        {
            self.bump();
            self.bump();
        }
        if self.at(SyntaxKind::Less) {
            self.parse_type_argument_list();
        }
        self.builder.finish_node();
    }

    fn parse_parameter_list(&mut self) {
        self.builder.start_node(SyntaxKind::ParameterList.into());
        self.expect(SyntaxKind::LParen, "expected `(`");
        self.parse_parameters(SyntaxKind::RParen);
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    fn parse_bracketed_parameter_list(&mut self) {
        self.builder
            .start_node(SyntaxKind::BracketedParameterList.into());
        self.expect(SyntaxKind::LBracket, "expected `[`");
        self.parse_parameters(SyntaxKind::RBracket);
        self.expect(SyntaxKind::RBracket, "expected `]`");
        self.builder.finish_node();
    }

    fn parse_parameters(&mut self, close: SyntaxKind) {
        while !self.at(close) && !self.at(SyntaxKind::Eof) {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::Parameter.into());
            self.parse_parameter_modifiers();
            if self.at_type_start() {
                self.parse_type();
            } else {
                self.error_here("expected parameter type");
            }
            self.expect_ident("expected parameter name");
            if self.at(SyntaxKind::Eq) {
                self.bump();
                self.parse_expression(0);
            }
            self.builder.finish_node();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
    }

    fn parse_parameter_modifiers(&mut self) {
        self.builder.start_node(SyntaxKind::Modifiers.into());
        loop {
            match self.current() {
                SyntaxKind::LBracket => self.parse_attribute_list(),
                SyntaxKind::RefKw
                | SyntaxKind::OutKw
                | SyntaxKind::InKw
                | SyntaxKind::ParamsKw
                | SyntaxKind::ThisKw
                | SyntaxKind::ReadonlyKw => self.bump(),
                SyntaxKind::Identifier
                    if self.nth_text(0) == "scoped"
                        && self.nth(1).is_some_and(|k| {
                            k == SyntaxKind::Identifier
                                || k == SyntaxKind::RefKw
                                || k.is_predefined_type()
                        })
                        && self.nth(2) != Some(SyntaxKind::Comma)
                        && self.nth(2) != Some(SyntaxKind::RParen) =>
                {
                    self.bump()
                }
                _ => break,
            }
        }
        self.builder.finish_node();
    }

    fn parse_argument_list(&mut self) {
        self.builder.start_node(SyntaxKind::ArgumentList.into());
        self.expect(SyntaxKind::LParen, "expected `(`");
        self.parse_arguments(SyntaxKind::RParen);
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    fn parse_bracketed_argument_list(&mut self) {
        self.builder
            .start_node(SyntaxKind::BracketedArgumentList.into());
        self.expect(SyntaxKind::LBracket, "expected `[`");
        self.parse_arguments(SyntaxKind::RBracket);
        self.expect(SyntaxKind::RBracket, "expected `]`");
        self.builder.finish_node();
    }

    fn parse_arguments(&mut self, close: SyntaxKind) {
        while !self.at(close) && !self.at(SyntaxKind::Eof) {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::Argument.into());
            if self.at(SyntaxKind::Identifier) && self.nth(1) == Some(SyntaxKind::Colon) {
                // Named argument: the name is a plain token, not a reference.
                self.bump();
                self.bump();
            }
            let by_ref = matches!(
                self.current(),
                SyntaxKind::RefKw | SyntaxKind::OutKw | SyntaxKind::InKw
            );
            if by_ref {
                self.bump();
            }
            if by_ref && self.at_declaration_expression() {
                self.parse_declaration_expression();
            } else {
                self.parse_expression(0);
            }
            self.builder.finish_node();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
    }

    /// `Type name` as used by `out var x` and by declaration patterns.
    fn at_declaration_expression(&self) -> bool {
        let start = skip_trivia(&self.tokens, 0);
        if self.text_at(start) == "await" {
            return false;
        }
        let Some(after_type) = self.scan_type(start) else {
            return false;
        };
        let name = skip_trivia(&self.tokens, after_type);
        self.kind_at(name) == SyntaxKind::Identifier
            && !matches!(self.text_at(name), "and" | "or" | "when")
    }

    fn parse_declaration_expression(&mut self) {
        self.eat_trivia();
        self.builder
            .start_node(SyntaxKind::DeclarationExpression.into());
        self.parse_type();
        if self.at(SyntaxKind::LParen) {
            self.parse_variable_designation();
        } else {
            self.expect_ident("expected variable name");
        }
        self.builder.finish_node();
    }

    /// `int a` followed by `,` or `)` inside parentheses. Pointer types are excluded so that
    /// `(a * b, c)` stays a multiplication.
    fn at_tuple_declaration(&self) -> bool {
        let start = skip_trivia(&self.tokens, 0);
        let Some(after_type) = self.scan_type(start) else {
            return false;
        };
        if (start..after_type).any(|i| self.kind_at(i) == SyntaxKind::Star) {
            return false;
        }
        let name = skip_trivia(&self.tokens, after_type);
        if self.kind_at(name) != SyntaxKind::Identifier {
            return false;
        }
        let next = skip_trivia(&self.tokens, name + 1);
        matches!(self.kind_at(next), SyntaxKind::Comma | SyntaxKind::RParen)
    }

    /// `var (a, b)` heading a deconstruction assignment or a `foreach`.
    fn at_var_designation(&self) -> bool {
        let start = skip_trivia(&self.tokens, 0);
        if self.kind_at(start) != SyntaxKind::Identifier || self.text_at(start) != "var" {
            return false;
        }
        let open = skip_trivia(&self.tokens, start + 1);
        if self.kind_at(open) != SyntaxKind::LParen {
            return false;
        }
        self.scan_variable_designation(open).is_some_and(|end| {
            let next = skip_trivia(&self.tokens, end);
            matches!(self.kind_at(next), SyntaxKind::Eq | SyntaxKind::InKw)
        })
    }

    /// Scans `(a, (b, c))` from the `(` at raw token index `idx`.
    fn scan_variable_designation(&self, idx: usize) -> Option<usize> {
        let mut i = idx + 1;
        loop {
            i = skip_trivia(&self.tokens, i);
            match self.kind_at(i) {
                SyntaxKind::Identifier => i += 1,
                SyntaxKind::LParen => i = self.scan_variable_designation(i)?,
                _ => return None,
            }
            i = skip_trivia(&self.tokens, i);
            match self.kind_at(i) {
                SyntaxKind::Comma => i += 1,
                SyntaxKind::RParen => return Some(i + 1),
                _ => return None,
            }
        }
    }

    fn parse_variable_designation(&mut self) {
        self.eat_trivia();
        self.builder
            .start_node(SyntaxKind::ParenthesizedVariableDesignation.into());
        self.bump(); // (
        loop {
            if self.at(SyntaxKind::LParen) {
                self.parse_variable_designation();
            } else {
                self.expect_ident("expected variable name");
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    // --- Statements ---

    fn parse_block(&mut self) {
        self.builder.start_node(SyntaxKind::Block.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let before = self.tokens.len();
            self.parse_statement();
            self.ensure_progress(before, "unexpected token in block");
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn parse_statement(&mut self) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();
        match self.current() {
            SyntaxKind::LBrace => self.parse_block(),
            SyntaxKind::Semicolon => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::EmptyStatement.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::Identifier if self.nth(1) == Some(SyntaxKind::Colon) => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::LabeledStatement.into());
                self.bump();
                self.bump();
                self.parse_statement();
                self.builder.finish_node();
            }
            SyntaxKind::IfKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::IfStatement.into());
                self.bump();
                self.parse_parenthesized_condition();
                self.parse_embedded_statement();
                if self.at(SyntaxKind::ElseKw) {
                    self.bump();
                    self.parse_embedded_statement();
                }
                self.builder.finish_node();
            }
            SyntaxKind::SwitchKw => self.parse_switch_statement(checkpoint),
            SyntaxKind::ForKw => self.parse_for_statement(checkpoint),
            SyntaxKind::ForeachKw => self.parse_foreach_statement(checkpoint),
            SyntaxKind::WhileKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::WhileStatement.into());
                self.bump();
                self.parse_parenthesized_condition();
                self.parse_embedded_statement();
                self.builder.finish_node();
            }
            SyntaxKind::DoKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::DoStatement.into());
                self.bump();
                self.parse_embedded_statement();
                self.expect(SyntaxKind::WhileKw, "expected `while` after `do` body");
                self.parse_parenthesized_condition();
                self.expect(SyntaxKind::Semicolon, "expected `;` after do-while");
                self.builder.finish_node();
            }
            SyntaxKind::LockKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::LockStatement.into());
                self.bump();
                self.parse_parenthesized_condition();
                self.parse_embedded_statement();
                self.builder.finish_node();
            }
            SyntaxKind::UsingKw if self.nth(1) == Some(SyntaxKind::LParen) => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::UsingStatement.into());
                self.bump();
                self.expect(SyntaxKind::LParen, "expected `(`");
                if self.at_variable_declaration() {
                    self.parse_variable_declaration();
                } else {
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::RParen, "expected `)`");
                self.parse_embedded_statement();
                self.builder.finish_node();
            }
            SyntaxKind::TryKw => self.parse_try_statement(checkpoint),
            SyntaxKind::ReturnKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ReturnStatement.into());
                self.bump();
                if !self.at(SyntaxKind::Semicolon) {
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::Semicolon, "expected `;` after return");
                self.builder.finish_node();
            }
            SyntaxKind::ThrowKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ThrowStatement.into());
                self.bump();
                if !self.at(SyntaxKind::Semicolon) {
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::Semicolon, "expected `;` after throw");
                self.builder.finish_node();
            }
            SyntaxKind::BreakKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::BreakStatement.into());
                self.bump();
                self.expect(SyntaxKind::Semicolon, "expected `;` after break");
                self.builder.finish_node();
            }
            SyntaxKind::ContinueKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ContinueStatement.into());
                self.bump();
                self.expect(SyntaxKind::Semicolon, "expected `;` after continue");
                self.builder.finish_node();
            }
            SyntaxKind::GotoKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::GotoStatement.into());
                self.bump();
                match self.current() {
                    SyntaxKind::CaseKw => {
                        self.bump();
                        self.parse_expression(0);
                    }
                    SyntaxKind::DefaultKw => self.bump(),
                    _ => self.expect_ident("expected label"),
                }
                self.expect(SyntaxKind::Semicolon, "expected `;` after goto");
                self.builder.finish_node();
            }
            SyntaxKind::CheckedKw | SyntaxKind::UncheckedKw
                if self.nth(1) == Some(SyntaxKind::LBrace) =>
            {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::CheckedStatement.into());
                self.bump();
                self.parse_block();
                self.builder.finish_node();
            }
            SyntaxKind::UnsafeKw if self.nth(1) == Some(SyntaxKind::LBrace) => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::UnsafeStatement.into());
                self.bump();
                self.parse_block();
                self.builder.finish_node();
            }
            SyntaxKind::Identifier
                if self.nth_text(0) == "yield"
                    && matches!(self.nth(1), Some(SyntaxKind::ReturnKw | SyntaxKind::BreakKw)) =>
            {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::YieldStatement.into());
                self.bump();
                let is_return = self.at(SyntaxKind::ReturnKw);
                self.bump();
                if is_return {
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::Semicolon, "expected `;` after yield");
                self.builder.finish_node();
            }
            _ => match self.classify_local() {
                LocalStart::Variable => {
                    self.builder.start_node_at(
                        checkpoint,
                        SyntaxKind::LocalVariableDeclarationStatement.into(),
                    );
                    self.parse_local_modifiers();
                    self.parse_variable_declaration();
                    self.expect(SyntaxKind::Semicolon, "expected `;` after local declaration");
                    self.builder.finish_node();
                }
                LocalStart::Function => {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::LocalFunctionStatement.into());
                    self.parse_local_modifiers();
                    self.parse_type();
                    self.expect_ident("expected local function name");
                    if self.at(SyntaxKind::Less) {
                        self.parse_type_parameter_list();
                    }
                    self.parse_parameter_list();
                    while self.at_contextual("where") {
                        self.parse_constraint_clause();
                    }
                    self.parse_function_body();
                    self.builder.finish_node();
                }
                LocalStart::None => {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::ExpressionStatement.into());
                    self.parse_expression(0);
                    self.expect(SyntaxKind::Semicolon, "expected `;` after expression");
                    self.builder.finish_node();
                }
            },
        }
    }

    fn parse_embedded_statement(&mut self) {
        if self.at(SyntaxKind::Eof) || self.at(SyntaxKind::RBrace) {
            self.error_here("expected statement");
            return;
        }
        self.parse_statement();
    }

    fn parse_parenthesized_condition(&mut self) {
        self.expect(SyntaxKind::LParen, "expected `(`");
        self.parse_expression(0);
        self.expect(SyntaxKind::RParen, "expected `)`");
    }

    fn parse_local_modifiers(&mut self) {
        self.builder.start_node(SyntaxKind::Modifiers.into());
        while self.at_local_modifier(0) {
            self.bump();
        }
        self.builder.finish_node();
    }

    fn at_local_modifier(&self, n: usize) -> bool {
        match self.nth(n) {
            Some(
                SyntaxKind::ConstKw
                | SyntaxKind::RefKw
                | SyntaxKind::ReadonlyKw
                | SyntaxKind::StaticKw
                | SyntaxKind::UnsafeKw
                | SyntaxKind::ExternKw
                | SyntaxKind::UsingKw,
            ) => true,
            Some(SyntaxKind::Identifier) => {
                matches!(self.nth_text(n), "async" | "scoped")
                    && self.nth(n + 1).is_some_and(|kind| {
                        kind == SyntaxKind::Identifier
                            || kind == SyntaxKind::VoidKw
                            || kind == SyntaxKind::RefKw
                            || kind.is_predefined_type()
                    })
                    && !matches!(
                        self.nth(n + 2),
                        Some(SyntaxKind::Eq | SyntaxKind::Semicolon | SyntaxKind::FatArrow)
                    )
            }
            _ => false,
        }
    }

    /// Decides whether the upcoming statement declares a local variable or a local function.
    fn classify_local(&self) -> LocalStart {
        let mut n = 0;
        while self.at_local_modifier(n) {
            n += 1;
        }
        let Some(start) = self.raw_index_of_nth(n) else {
            return LocalStart::None;
        };
        if self.text_at(start) == "await" && self.kind_at(start) == SyntaxKind::Identifier {
            return LocalStart::None;
        }
        let Some(after_type) = self.scan_type(start) else {
            return LocalStart::None;
        };
        let name = skip_trivia(&self.tokens, after_type);
        if self.kind_at(name) != SyntaxKind::Identifier {
            return LocalStart::None;
        }
        let next = skip_trivia(&self.tokens, name + 1);
        match self.kind_at(next) {
            SyntaxKind::Eq | SyntaxKind::Semicolon | SyntaxKind::Comma => LocalStart::Variable,
            SyntaxKind::LParen | SyntaxKind::Less => LocalStart::Function,
            _ => LocalStart::None,
        }
    }

    fn at_variable_declaration(&self) -> bool {
        let start = skip_trivia(&self.tokens, 0);
        if self.text_at(start) == "await" {
            return false;
        }
        let Some(after_type) = self.scan_type(start) else {
            return false;
        };
        let name = skip_trivia(&self.tokens, after_type);
        if self.kind_at(name) != SyntaxKind::Identifier {
            return false;
        }
        let next = skip_trivia(&self.tokens, name + 1);
        matches!(
            self.kind_at(next),
            SyntaxKind::Eq | SyntaxKind::Semicolon | SyntaxKind::Comma
        )
    }

    fn parse_variable_declaration(&mut self) {
        self.eat_trivia();
        self.builder
            .start_node(SyntaxKind::VariableDeclaration.into());
        self.parse_type();
        self.parse_variable_declarator_list();
        self.builder.finish_node();
    }

    fn parse_variable_declarator_list(&mut self) {
        self.builder
            .start_node(SyntaxKind::VariableDeclaratorList.into());
        self.parse_variable_declarator();
        while self.at(SyntaxKind::Comma) {
            self.bump();
            self.parse_variable_declarator();
        }
        self.builder.finish_node();
    }

    fn parse_variable_declarator(&mut self) {
        self.eat_trivia();
        self.builder
            .start_node(SyntaxKind::VariableDeclarator.into());
        self.expect_ident("expected variable name");
        if self.at(SyntaxKind::LBracket) {
            // Fixed-size buffer.
            self.parse_bracketed_argument_list();
        }
        if self.at(SyntaxKind::Eq) {
            self.bump();
            if self.at(SyntaxKind::Semicolon) || self.at(SyntaxKind::Comma) {
                self.error_here("expected initializer expression");
            } else {
                self.parse_variable_initializer();
            }
        }
        self.builder.finish_node();
    }

    fn parse_variable_initializer(&mut self) {
        if self.at(SyntaxKind::LBrace) {
            self.parse_initializer_expression();
        } else {
            self.parse_expression(0);
        }
    }

    fn parse_switch_statement(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::SwitchStatement.into());
        self.bump();
        self.parse_parenthesized_condition();
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            if self.at_switch_label() {
                self.parse_switch_section();
            } else {
                self.builder.start_node(SyntaxKind::Error.into());
                self.error_here("expected `case` or `default`");
                self.bump_any();
                self.builder.finish_node();
            }
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn at_switch_label(&self) -> bool {
        match self.nth(0) {
            Some(SyntaxKind::CaseKw) => true,
            Some(SyntaxKind::DefaultKw) => self.nth(1) == Some(SyntaxKind::Colon),
            _ => false,
        }
    }

    fn parse_switch_section(&mut self) {
        self.eat_trivia();
        self.builder.start_node(SyntaxKind::SwitchSection.into());
        while self.at_switch_label() {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::SwitchLabel.into());
            if self.at(SyntaxKind::CaseKw) {
                self.bump();
                self.parse_pattern();
                if self.at_contextual("when") {
                    self.parse_when_clause();
                }
            } else {
                self.bump(); // default
            }
            self.expect(SyntaxKind::Colon, "expected `:` after switch label");
            self.builder.finish_node();
        }
        while !self.at_switch_label() && !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof)
        {
            let before = self.tokens.len();
            self.parse_statement();
            self.ensure_progress(before, "unexpected token in switch section");
        }
        self.builder.finish_node();
    }

    fn parse_when_clause(&mut self) {
        self.builder.start_node(SyntaxKind::WhenClause.into());
        self.bump(); // when
        self.parse_expression(0);
        self.builder.finish_node();
    }

    fn parse_for_statement(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::ForStatement.into());
        self.bump();
        self.builder.start_node(SyntaxKind::ForHeader.into());
        self.expect(SyntaxKind::LParen, "expected `(`");
        if !self.at(SyntaxKind::Semicolon) {
            if self.at_variable_declaration() {
                self.parse_variable_declaration();
            } else {
                self.parse_expression_list();
            }
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
        if !self.at(SyntaxKind::Semicolon) {
            self.parse_expression(0);
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
        if !self.at(SyntaxKind::RParen) {
            self.parse_expression_list();
        }
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
        self.parse_embedded_statement();
        self.builder.finish_node();
    }

    fn parse_expression_list(&mut self) {
        loop {
            self.parse_expression(0);
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
    }

    fn parse_foreach_statement(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::ForEachStatement.into());
        self.bump();
        self.expect(SyntaxKind::LParen, "expected `(`");
        if self.at(SyntaxKind::RefKw) {
            self.bump();
        }
        if self.at_var_designation() {
            self.parse_declaration_expression();
        } else {
            self.parse_type();
            self.expect_ident("expected loop variable name");
        }
        self.expect(SyntaxKind::InKw, "expected `in`");
        self.parse_expression(0);
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.parse_embedded_statement();
        self.builder.finish_node();
    }

    fn parse_try_statement(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::TryStatement.into());
        self.bump();
        self.parse_block();
        while self.at(SyntaxKind::CatchKw) {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::CatchClause.into());
            self.bump();
            if self.at(SyntaxKind::LParen) {
                self.builder
                    .start_node(SyntaxKind::CatchDeclaration.into());
                self.bump();
                self.parse_type();
                if self.at(SyntaxKind::Identifier) {
                    self.bump();
                }
                self.expect(SyntaxKind::RParen, "expected `)`");
                self.builder.finish_node();
            }
            if self.at_contextual("when") {
                self.builder.start_node(SyntaxKind::WhenClause.into());
                self.bump();
                self.parse_parenthesized_condition();
                self.builder.finish_node();
            }
            self.parse_block();
            self.builder.finish_node();
        }
        if self.at(SyntaxKind::FinallyKw) {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::FinallyClause.into());
            self.bump();
            self.parse_block();
            self.builder.finish_node();
        }
        self.builder.finish_node();
    }

    // --- Types ---

    /// Parses a type; returns `true` when it ends with an array rank specifier.
    fn parse_type(&mut self) -> bool {
        self.parse_type_inner(false)
    }

    /// Types after `as`/`is`: a trailing `?` is only nullable when no expression follows it.
    fn parse_expression_type(&mut self) -> bool {
        self.parse_type_inner(true)
    }

    fn parse_type_inner(&mut self, in_expression: bool) -> bool {
        self.eat_trivia();
        self.builder.start_node(SyntaxKind::Type.into());
        match self.current() {
            kind if kind.is_predefined_type() || kind == SyntaxKind::VoidKw => {
                self.builder.start_node(SyntaxKind::PredefinedType.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::LParen => {
                self.builder.start_node(SyntaxKind::TupleType.into());
                self.bump();
                while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
                    self.parse_type();
                    if self.at(SyntaxKind::Identifier) {
                        self.bump();
                    }
                    if !self.eat(SyntaxKind::Comma) {
                        break;
                    }
                }
                self.expect(SyntaxKind::RParen, "expected `)` in tuple type");
                self.builder.finish_node();
            }
            SyntaxKind::Identifier => {
                self.builder.start_node(SyntaxKind::NamedType.into());
                self.bump();
                loop {
                    if self.at(SyntaxKind::Less) {
                        self.parse_type_argument_list();
                    }
                    if matches!(self.current(), SyntaxKind::Dot | SyntaxKind::DoubleColon)
                        && self.nth(1) == Some(SyntaxKind::Identifier)
                    {
                        self.bump();
                        self.bump();
                        continue;
                    }
                    break;
                }
                self.builder.finish_node();
            }
            _ => {
                self.error_here("expected type");
            }
        }

        let mut is_array = false;
        loop {
            match self.current() {
                SyntaxKind::Question => {
                    if in_expression && self.nth(1).is_some_and(can_start_expression) {
                        break;
                    }
                    self.bump();
                }
                SyntaxKind::Star => self.bump(),
                SyntaxKind::LBracket
                    if matches!(self.nth(1), Some(SyntaxKind::RBracket | SyntaxKind::Comma)) =>
                {
                    self.bump();
                    while self.at(SyntaxKind::Comma) {
                        self.bump();
                    }
                    self.expect(SyntaxKind::RBracket, "expected `]`");
                    is_array = true;
                }
                _ => break,
            }
        }
        self.builder.finish_node();
        is_array
    }

    fn parse_type_argument_list(&mut self) {
        self.builder
            .start_node(SyntaxKind::TypeArgumentList.into());
        self.expect(SyntaxKind::Less, "expected `<`");
        while !self.at_closing_angle() && !self.at(SyntaxKind::Eof) {
            if self.at(SyntaxKind::Comma) {
                // Unbound generic (`typeof(Dictionary<,>)`).
                self.bump();
                continue;
            }
            self.parse_type();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect_gt();
        self.builder.finish_node();
    }

    fn at_closing_angle(&mut self) -> bool {
        matches!(
            self.current(),
            SyntaxKind::Greater | SyntaxKind::RightShift
        )
    }

    fn expect_gt(&mut self) {
        match self.current() {
            SyntaxKind::Greater => self.bump(),
            SyntaxKind::RightShift => {
                self.split_shift_as_greater();
                self.bump();
            }
            _ => self.error_here("expected `>`"),
        }
    }

    fn split_shift_as_greater(&mut self) {
        let Some(tok) = self.tokens.pop_front() else {
            return;
        };
        if tok.kind != SyntaxKind::RightShift {
            self.tokens.push_front(tok);
            return;
        }
        let start = tok.range.start;
        self.tokens.push_front(Token {
            kind: SyntaxKind::Greater,
            range: TextRange {
                start: start + 1,
                end: tok.range.end,
            },
        });
        self.tokens.push_front(Token {
            kind: SyntaxKind::Greater,
            range: TextRange {
                start,
                end: start + 1,
            },
        });
    }

    // --- Expressions ---

    fn parse_expression(&mut self, min_bp: u8) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();

        match self.current() {
            kind if kind.is_literal() => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::LiteralExpression.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::ThisKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ThisExpression.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::BaseKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::BaseExpression.into());
                self.bump();
                self.builder.finish_node();
            }
            kind if kind.is_predefined_type() => {
                // `int.Parse(..)`, `string.Empty`
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::PredefinedType.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::NewKw => self.parse_new_expression(checkpoint),
            SyntaxKind::TypeofKw | SyntaxKind::SizeofKw => {
                let kind = if self.at(SyntaxKind::TypeofKw) {
                    SyntaxKind::TypeOfExpression
                } else {
                    SyntaxKind::SizeOfExpression
                };
                self.builder.start_node_at(checkpoint, kind.into());
                self.bump();
                self.expect(SyntaxKind::LParen, "expected `(`");
                self.parse_type();
                self.expect(SyntaxKind::RParen, "expected `)`");
                self.builder.finish_node();
            }
            SyntaxKind::DefaultKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::DefaultExpression.into());
                self.bump();
                if self.at(SyntaxKind::LParen) {
                    self.bump();
                    self.parse_type();
                    self.expect(SyntaxKind::RParen, "expected `)`");
                }
                self.builder.finish_node();
            }
            SyntaxKind::CheckedKw | SyntaxKind::UncheckedKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::CheckedExpression.into());
                self.bump();
                self.parse_parenthesized_condition();
                self.builder.finish_node();
            }
            SyntaxKind::ThrowKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ThrowExpression.into());
                self.bump();
                self.parse_expression(0);
                self.builder.finish_node();
            }
            SyntaxKind::DelegateKw => self.parse_lambda_expression(checkpoint),
            SyntaxKind::Plus
            | SyntaxKind::Minus
            | SyntaxKind::Bang
            | SyntaxKind::Tilde
            | SyntaxKind::PlusPlus
            | SyntaxKind::MinusMinus
            | SyntaxKind::Caret
            | SyntaxKind::Amp
            | SyntaxKind::Star
            | SyntaxKind::RefKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::PrefixUnaryExpression.into());
                self.bump();
                self.parse_expression(PREFIX_BP);
                self.builder.finish_node();
            }
            SyntaxKind::Identifier => {
                let text = self.nth_text(0);
                if self.nth(1) == Some(SyntaxKind::FatArrow) {
                    self.parse_lambda_expression(checkpoint);
                } else if text == "async" && self.at_async_lambda() {
                    self.parse_lambda_expression(checkpoint);
                } else if text == "var" && self.at_var_designation() {
                    self.parse_declaration_expression();
                } else if text == "await" && self.nth(1).is_some_and(can_start_expression) {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::AwaitExpression.into());
                    self.bump();
                    self.parse_expression(PREFIX_BP);
                    self.builder.finish_node();
                } else {
                    self.parse_name_expression();
                }
            }
            SyntaxKind::LParen => {
                if self.is_lambda_paren(0) {
                    self.parse_lambda_expression(checkpoint);
                } else if self.is_cast_expression() {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::CastExpression.into());
                    self.bump();
                    self.parse_type();
                    self.expect(SyntaxKind::RParen, "expected `)` in cast");
                    self.parse_expression(PREFIX_BP);
                    self.builder.finish_node();
                } else {
                    self.bump();
                    self.parse_tuple_element();
                    let mut kind = SyntaxKind::ParenthesizedExpression;
                    while self.eat(SyntaxKind::Comma) {
                        kind = SyntaxKind::TupleExpression;
                        self.parse_tuple_element();
                    }
                    self.expect(SyntaxKind::RParen, "expected `)`");
                    self.builder.start_node_at(checkpoint, kind.into());
                    self.builder.finish_node();
                }
            }
            _ => {
                self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("expected expression");
                if !matches!(
                    self.current(),
                    SyntaxKind::Eof
                        | SyntaxKind::Semicolon
                        | SyntaxKind::RBrace
                        | SyntaxKind::RParen
                        | SyntaxKind::RBracket
                        | SyntaxKind::Comma
                ) {
                    self.bump_any();
                }
                self.builder.finish_node();
            }
        }

        loop {
            self.eat_trivia();
            let op = self.current();

            match op {
                SyntaxKind::LParen => {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::InvocationExpression.into());
                    self.parse_argument_list();
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::Dot | SyntaxKind::QuestionDot | SyntaxKind::DoubleColon => {
                    if self.nth(1) != Some(SyntaxKind::Identifier) {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::MemberAccessExpression.into());
                    self.bump();
                    self.parse_name_expression();
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::LBracket => {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::ElementAccessExpression.into());
                    self.parse_bracketed_argument_list();
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::PlusPlus | SyntaxKind::MinusMinus | SyntaxKind::Bang => {
                    // Postfix `!` is the null-forgiving operator.
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::PostfixUnaryExpression.into());
                    self.bump();
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::SwitchKw => {
                    if SWITCH_EXPRESSION_BP < min_bp {
                        break;
                    }
                    self.parse_switch_expression(checkpoint);
                    continue;
                }
                SyntaxKind::IsKw | SyntaxKind::AsKw => {
                    if RELATIONAL_BP < min_bp {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::BinaryExpression.into());
                    self.bump();
                    if op == SyntaxKind::IsKw {
                        self.parse_pattern();
                    } else {
                        self.parse_expression_type();
                    }
                    self.builder.finish_node();
                    continue;
                }
                _ => {}
            }

            if let Some((l_bp, r_bp, expr_kind)) = infix_binding_power(op) {
                if l_bp < min_bp {
                    break;
                }
                self.builder.start_node_at(checkpoint, expr_kind.into());
                self.bump();
                if expr_kind == SyntaxKind::AssignmentExpression && self.at(SyntaxKind::LBrace) {
                    // Nested object initializer: `Member = { ... }`.
                    self.parse_initializer_expression();
                } else {
                    self.parse_expression(r_bp);
                }
                self.builder.finish_node();
                continue;
            }

            if op == SyntaxKind::Question {
                let (l_bp, r_bp) = CONDITIONAL_BP;
                if l_bp < min_bp {
                    break;
                }
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ConditionalExpression.into());
                self.bump();
                self.parse_expression(0);
                self.expect(SyntaxKind::Colon, "expected `:` in conditional expression");
                self.parse_expression(r_bp);
                self.builder.finish_node();
                continue;
            }

            break;
        }
    }

    fn parse_tuple_element(&mut self) {
        if self.at(SyntaxKind::Identifier) && self.nth(1) == Some(SyntaxKind::Colon) {
            // Named tuple element: `(x: 1, y: 2)`.
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::Argument.into());
            self.bump();
            self.bump();
            self.parse_expression(0);
            self.builder.finish_node();
        } else if self.at_var_designation() || self.at_tuple_declaration() {
            // Deconstruction target: `(var a, int b) = ...`.
            self.parse_declaration_expression();
        } else {
            self.parse_expression(0);
        }
    }

    /// A single identifier, with type arguments when they disambiguate as such.
    fn parse_name_expression(&mut self) {
        self.eat_trivia();
        self.builder.start_node(SyntaxKind::NameExpression.into());
        self.expect_ident("expected name");
        if self.at(SyntaxKind::Less) && self.at_generic_name_arguments() {
            self.parse_type_argument_list();
        }
        self.builder.finish_node();
    }

    fn parse_new_expression(&mut self, checkpoint: Checkpoint) {
        self.bump(); // new
        let kind = match self.current() {
            SyntaxKind::LBracket => {
                // `new[] { ... }`
                self.bump();
                while self.at(SyntaxKind::Comma) {
                    self.bump();
                }
                self.expect(SyntaxKind::RBracket, "expected `]`");
                self.parse_initializer_expression();
                SyntaxKind::ArrayCreationExpression
            }
            SyntaxKind::LBrace => {
                // Anonymous object.
                self.parse_initializer_expression();
                SyntaxKind::ObjectCreationExpression
            }
            SyntaxKind::LParen => {
                // Target-typed `new()`.
                self.parse_argument_list();
                if self.at(SyntaxKind::LBrace) {
                    self.parse_initializer_expression();
                }
                SyntaxKind::ObjectCreationExpression
            }
            _ => {
                let is_array = self.parse_type();
                if self.at(SyntaxKind::LBracket) {
                    self.parse_bracketed_argument_list();
                    while self.at(SyntaxKind::LBracket)
                        && matches!(self.nth(1), Some(SyntaxKind::RBracket | SyntaxKind::Comma))
                    {
                        self.bump();
                        while self.at(SyntaxKind::Comma) {
                            self.bump();
                        }
                        self.expect(SyntaxKind::RBracket, "expected `]`");
                    }
                    if self.at(SyntaxKind::LBrace) {
                        self.parse_initializer_expression();
                    }
                    SyntaxKind::ArrayCreationExpression
                } else {
                    if self.at(SyntaxKind::LParen) {
                        self.parse_argument_list();
                    }
                    if self.at(SyntaxKind::LBrace) {
                        self.parse_initializer_expression();
                    } else if is_array {
                        self.error_here("expected array initializer");
                    }
                    if is_array {
                        SyntaxKind::ArrayCreationExpression
                    } else {
                        SyntaxKind::ObjectCreationExpression
                    }
                }
            }
        };
        self.builder.start_node_at(checkpoint, kind.into());
        self.builder.finish_node();
    }

    fn parse_initializer_expression(&mut self) {
        self.eat_trivia();
        self.builder
            .start_node(SyntaxKind::InitializerExpression.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            match self.current() {
                SyntaxKind::LBrace => self.parse_initializer_expression(),
                SyntaxKind::LBracket => {
                    // Indexer initializer: `[key] = value`.
                    let checkpoint = self.builder.checkpoint();
                    self.builder
                        .start_node(SyntaxKind::ElementAccessExpression.into());
                    self.parse_bracketed_argument_list();
                    self.builder.finish_node();
                    if self.at(SyntaxKind::Eq) {
                        self.builder
                            .start_node_at(checkpoint, SyntaxKind::AssignmentExpression.into());
                        self.bump();
                        self.parse_variable_initializer();
                        self.builder.finish_node();
                    }
                }
                _ => self.parse_expression(0),
            }
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn parse_lambda_expression(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::LambdaExpression.into());
        if self.at_contextual("async") {
            self.bump();
        }
        if self.at(SyntaxKind::DelegateKw) {
            // Anonymous method.
            self.bump();
            if self.at(SyntaxKind::LParen) {
                self.parse_parameter_list();
            }
            self.parse_block();
            self.builder.finish_node();
            return;
        }
        if self.at(SyntaxKind::LParen) {
            self.builder.start_node(SyntaxKind::ParameterList.into());
            self.bump();
            while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
                self.eat_trivia();
                self.builder.start_node(SyntaxKind::Parameter.into());
                self.parse_parameter_modifiers();
                let implicit = self.at(SyntaxKind::Identifier)
                    && matches!(self.nth(1), Some(SyntaxKind::Comma | SyntaxKind::RParen));
                if !implicit {
                    self.parse_type();
                }
                self.expect_ident("expected lambda parameter name");
                self.builder.finish_node();
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
            self.expect(SyntaxKind::RParen, "expected `)` in lambda parameters");
            self.builder.finish_node();
        } else {
            self.eat_trivia();
            self.builder.start_node(SyntaxKind::Parameter.into());
            self.expect_ident("expected lambda parameter");
            self.builder.finish_node();
        }
        self.expect(SyntaxKind::FatArrow, "expected `=>` in lambda");
        if self.at(SyntaxKind::LBrace) {
            self.parse_block();
        } else {
            self.parse_expression(0);
        }
        self.builder.finish_node();
    }

    fn at_async_lambda(&self) -> bool {
        match self.nth(1) {
            Some(SyntaxKind::Identifier) => self.nth(2) == Some(SyntaxKind::FatArrow),
            Some(SyntaxKind::DelegateKw) => true,
            Some(SyntaxKind::LParen) => self
                .raw_index_of_nth(1)
                .is_some_and(|idx| self.is_lambda_paren(idx)),
            _ => false,
        }
    }

    fn parse_switch_expression(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::SwitchExpression.into());
        self.bump(); // switch
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            self.eat_trivia();
            self.builder
                .start_node(SyntaxKind::SwitchExpressionArm.into());
            self.parse_pattern();
            if self.at_contextual("when") {
                self.parse_when_clause();
            }
            self.expect(SyntaxKind::FatArrow, "expected `=>` in switch arm");
            self.parse_expression(0);
            self.builder.finish_node();
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn parse_pattern(&mut self) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_primary_pattern();
        while self.at_contextual("and") || self.at_contextual("or") {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::BinaryExpression.into());
            self.bump();
            self.parse_primary_pattern();
            self.builder.finish_node();
        }
    }

    fn parse_primary_pattern(&mut self) {
        self.eat_trivia();
        match self.current() {
            SyntaxKind::Less | SyntaxKind::LessEq | SyntaxKind::Greater | SyntaxKind::GreaterEq => {
                self.builder
                    .start_node(SyntaxKind::RelationalPattern.into());
                self.bump();
                self.parse_expression(SHIFT_BP);
                self.builder.finish_node();
            }
            SyntaxKind::Identifier
                if self.nth_text(0) == "not"
                    && self.nth(1).is_some_and(|kind| {
                        can_start_expression(kind)
                            || matches!(
                                kind,
                                SyntaxKind::Less
                                    | SyntaxKind::LessEq
                                    | SyntaxKind::Greater
                                    | SyntaxKind::GreaterEq
                            )
                    }) =>
            {
                self.builder
                    .start_node(SyntaxKind::RelationalPattern.into());
                self.bump();
                self.parse_primary_pattern();
                self.builder.finish_node();
            }
            // `_ =>` in a switch arm is a discard, not a lambda.
            SyntaxKind::Identifier if self.nth(1) == Some(SyntaxKind::FatArrow) => {
                self.parse_name_expression()
            }
            _ if self.at_declaration_expression() => self.parse_declaration_expression(),
            kind if kind.is_predefined_type() => {
                self.parse_expression_type();
            }
            _ => self.parse_expression(SHIFT_BP),
        }
    }

    fn is_lambda_paren(&self, open: usize) -> bool {
        let open = skip_trivia(&self.tokens, open);
        if self.kind_at(open) != SyntaxKind::LParen {
            return false;
        }
        let after = skip_balanced_parens(&self.tokens, open);
        self.kind_at(skip_trivia(&self.tokens, after)) == SyntaxKind::FatArrow
    }

    /// `(T)x` disambiguation: the parenthesised tokens must form a type, and either the type
    /// is a built-in one or the token after `)` can only start an operand.
    fn is_cast_expression(&self) -> bool {
        let open = skip_trivia(&self.tokens, 0);
        let first = skip_trivia(&self.tokens, open + 1);
        let Some(after_type) = self.scan_type(first) else {
            return false;
        };
        let close = skip_trivia(&self.tokens, after_type);
        if self.kind_at(close) != SyntaxKind::RParen {
            return false;
        }
        let next = self.kind_at(skip_trivia(&self.tokens, close + 1));
        if self.kind_at(first).is_predefined_type() {
            return can_start_expression(next);
        }
        match next {
            SyntaxKind::Identifier
            | SyntaxKind::LParen
            | SyntaxKind::Tilde
            | SyntaxKind::Bang => true,
            SyntaxKind::AsKw | SyntaxKind::IsKw => false,
            kind => kind.is_literal() || kind.is_keyword(),
        }
    }

    /// `Name<...>` in expression position is a generic name only when the token after the
    /// closing `>` cannot continue a comparison.
    fn at_generic_name_arguments(&self) -> bool {
        let less = skip_trivia(&self.tokens, 0);
        let Some(after) = self.scan_type_arguments(less) else {
            return false;
        };
        let next = self.kind_at(skip_trivia(&self.tokens, after));
        matches!(
            next,
            SyntaxKind::LParen
                | SyntaxKind::RParen
                | SyntaxKind::RBracket
                | SyntaxKind::RBrace
                | SyntaxKind::Colon
                | SyntaxKind::Semicolon
                | SyntaxKind::Comma
                | SyntaxKind::Dot
                | SyntaxKind::QuestionDot
                | SyntaxKind::Question
                | SyntaxKind::EqEq
                | SyntaxKind::BangEq
                | SyntaxKind::Pipe
                | SyntaxKind::Caret
                | SyntaxKind::AmpAmp
                | SyntaxKind::PipePipe
                | SyntaxKind::Amp
                | SyntaxKind::LBracket
                | SyntaxKind::Eof
        )
    }

    /// Scans a type starting at raw token index `idx`; returns the index just past it.
    fn scan_type(&self, idx: usize) -> Option<usize> {
        let mut i = skip_trivia(&self.tokens, idx);
        let kind = self.kind_at(i);
        if kind.is_predefined_type() || kind == SyntaxKind::VoidKw {
            i += 1;
        } else if kind == SyntaxKind::LParen {
            i += 1;
            let mut elements = 0;
            loop {
                i = skip_trivia(&self.tokens, self.scan_type(i)?);
                if self.kind_at(i) == SyntaxKind::Identifier {
                    i = skip_trivia(&self.tokens, i + 1);
                }
                elements += 1;
                match self.kind_at(i) {
                    SyntaxKind::Comma => i += 1,
                    SyntaxKind::RParen => {
                        i += 1;
                        break;
                    }
                    _ => return None,
                }
            }
            if elements < 2 {
                return None;
            }
        } else if kind == SyntaxKind::Identifier {
            i += 1;
            loop {
                let next = skip_trivia(&self.tokens, i);
                if self.kind_at(next) == SyntaxKind::Less {
                    match self.scan_type_arguments(next) {
                        Some(end) => i = end,
                        None => break,
                    }
                }
                let next = skip_trivia(&self.tokens, i);
                if matches!(self.kind_at(next), SyntaxKind::Dot | SyntaxKind::DoubleColon) {
                    let segment = skip_trivia(&self.tokens, next + 1);
                    if self.kind_at(segment) == SyntaxKind::Identifier {
                        i = segment + 1;
                        continue;
                    }
                }
                break;
            }
        } else {
            return None;
        }

        loop {
            let next = skip_trivia(&self.tokens, i);
            match self.kind_at(next) {
                SyntaxKind::Question | SyntaxKind::Star => i = next + 1,
                SyntaxKind::LBracket => {
                    let mut j = skip_trivia(&self.tokens, next + 1);
                    while self.kind_at(j) == SyntaxKind::Comma {
                        j = skip_trivia(&self.tokens, j + 1);
                    }
                    if self.kind_at(j) != SyntaxKind::RBracket {
                        break;
                    }
                    i = j + 1;
                }
                _ => break,
            }
        }
        Some(i)
    }

    /// Token-level match of `<...>` containing only type-like tokens.
    fn scan_type_arguments(&self, idx: usize) -> Option<usize> {
        let mut depth: i32 = 0;
        let mut i = idx;
        loop {
            let kind = self.kind_at(i);
            match kind {
                _ if kind.is_trivia() => {}
                SyntaxKind::Less => depth += 1,
                SyntaxKind::Greater => depth -= 1,
                SyntaxKind::RightShift => depth -= 2,
                SyntaxKind::Identifier
                | SyntaxKind::Comma
                | SyntaxKind::Dot
                | SyntaxKind::DoubleColon
                | SyntaxKind::Question
                | SyntaxKind::LBracket
                | SyntaxKind::RBracket
                | SyntaxKind::LParen
                | SyntaxKind::RParen
                | SyntaxKind::Star
                | SyntaxKind::VoidKw => {}
                _ if kind.is_predefined_type() => {}
                _ => return None,
            }
            i += 1;
            if depth <= 0 {
                return (depth == 0).then_some(i);
            }
        }
    }

    // --- Recovery ---

    fn recover_top_level(&mut self) {
        self.builder.start_node(SyntaxKind::Error.into());
        self.error_here("unexpected token at top level");
        self.bump_any();
        self.recover_to(TOP_LEVEL_RECOVERY);
        self.builder.finish_node();
    }

    fn recover_to_member_boundary(&mut self) {
        self.recover_to(&[
            SyntaxKind::Semicolon,
            SyntaxKind::RBrace,
            SyntaxKind::LBrace,
            SyntaxKind::ClassKw,
            SyntaxKind::StructKw,
            SyntaxKind::InterfaceKw,
            SyntaxKind::EnumKw,
            SyntaxKind::PublicKw,
            SyntaxKind::PrivateKw,
            SyntaxKind::ProtectedKw,
            SyntaxKind::InternalKw,
            SyntaxKind::StaticKw,
            SyntaxKind::LBracket,
        ]);
        if self.at(SyntaxKind::Semicolon) {
            self.bump();
        } else if self.at(SyntaxKind::LBrace) {
            self.parse_block();
        }
    }

    fn recover_to(&mut self, recovery: &[SyntaxKind]) {
        while !self.at(SyntaxKind::Eof) {
            if recovery.contains(&self.current()) {
                break;
            }
            self.bump_any();
        }
    }

    /// Wraps one token in an error node when a loop body consumed nothing.
    fn ensure_progress(&mut self, before: usize, message: &str) {
        if self.tokens.len() == before && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::Error.into());
            self.error_here(message);
            self.bump_any();
            self.builder.finish_node();
        }
    }

    fn at_type_decl_start(&mut self) -> bool {
        match self.current() {
            SyntaxKind::LBracket
            | SyntaxKind::ClassKw
            | SyntaxKind::StructKw
            | SyntaxKind::InterfaceKw
            | SyntaxKind::EnumKw
            | SyntaxKind::DelegateKw
            | SyntaxKind::RefKw
            | SyntaxKind::Semicolon => true,
            SyntaxKind::Identifier => self.at_contextual_modifier() || self.at_record_start(),
            kind => kind.is_modifier_keyword(),
        }
    }

    fn at_type_start(&mut self) -> bool {
        let kind = self.current();
        kind.is_predefined_type()
            || matches!(
                kind,
                SyntaxKind::Identifier | SyntaxKind::VoidKw | SyntaxKind::LParen
            )
    }

    // --- Token plumbing ---

    fn current(&mut self) -> SyntaxKind {
        self.eat_trivia();
        self.tokens.front().map(|t| t.kind).unwrap_or(SyntaxKind::Eof)
    }

    fn nth(&self, n: usize) -> Option<SyntaxKind> {
        self.raw_index_of_nth(n).map(|idx| self.tokens[idx].kind)
    }

    fn nth_text(&self, n: usize) -> &'a str {
        self.raw_index_of_nth(n)
            .map(|idx| self.text_at(idx))
            .unwrap_or("")
    }

    fn raw_index_of_nth(&self, n: usize) -> Option<usize> {
        let mut remaining = n;
        for (idx, tok) in self.tokens.iter().enumerate() {
            if tok.kind.is_trivia() {
                continue;
            }
            if remaining == 0 {
                return Some(idx);
            }
            remaining -= 1;
        }
        None
    }

    fn kind_at(&self, idx: usize) -> SyntaxKind {
        self.tokens.get(idx).map_or(SyntaxKind::Eof, |t| t.kind)
    }

    fn text_at(&self, idx: usize) -> &'a str {
        self.tokens.get(idx).map_or("", |t| t.text(self.input))
    }

    fn at(&mut self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    fn at_contextual(&mut self, keyword: &str) -> bool {
        self.current() == SyntaxKind::Identifier && self.nth_text(0) == keyword
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_trivia(&mut self) {
        while self.tokens.front().is_some_and(|t| t.kind.is_trivia()) {
            self.bump_any();
        }
    }

    fn bump(&mut self) {
        self.eat_trivia();
        self.bump_any();
    }

    fn bump_any(&mut self) {
        if let Some(tok) = self.tokens.pop_front() {
            let text = tok.text(self.input);
            self.builder.token(tok.kind.into(), text);
        }
    }

    fn expect(&mut self, kind: SyntaxKind, message: &str) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            self.error_here(message);
            false
        }
    }

    fn expect_ident(&mut self, message: &str) {
        if self.at(SyntaxKind::Identifier) {
            self.bump();
        } else {
            self.error_here(message);
        }
    }

    fn error_here(&mut self, message: &str) {
        let range = self.current_range();
        self.errors.push(ParseError {
            message: message.to_string(),
            range,
        });
    }

    fn current_range(&mut self) -> TextRange {
        self.eat_trivia();
        self.tokens.front().map(|t| t.range).unwrap_or_else(|| {
            let end = self.input.len() as u32;
            TextRange { start: end, end }
        })
    }
}

const TOP_LEVEL_RECOVERY: &[SyntaxKind] = &[
    SyntaxKind::UsingKw,
    SyntaxKind::NamespaceKw,
    SyntaxKind::ClassKw,
    SyntaxKind::StructKw,
    SyntaxKind::InterfaceKw,
    SyntaxKind::EnumKw,
    SyntaxKind::PublicKw,
    SyntaxKind::InternalKw,
    SyntaxKind::LBracket,
    SyntaxKind::RBrace,
    SyntaxKind::Eof,
];

fn skip_trivia(tokens: &VecDeque<Token>, mut idx: usize) -> usize {
    while tokens.get(idx).is_some_and(|t| t.kind.is_trivia()) {
        idx += 1;
    }
    idx
}

/// Assumes `tokens[idx]` is `(`; returns the index just past its matching `)`.
fn skip_balanced_parens(tokens: &VecDeque<Token>, mut idx: usize) -> usize {
    let mut depth = 0usize;
    while let Some(tok) = tokens.get(idx) {
        match tok.kind {
            SyntaxKind::LParen => depth += 1,
            SyntaxKind::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx + 1;
                }
            }
            SyntaxKind::Eof => break,
            _ => {}
        }
        idx += 1;
    }
    idx
}

fn can_start_expression(kind: SyntaxKind) -> bool {
    kind.is_literal()
        || kind.is_predefined_type()
        || matches!(
            kind,
            SyntaxKind::Identifier
                | SyntaxKind::ThisKw
                | SyntaxKind::BaseKw
                | SyntaxKind::NewKw
                | SyntaxKind::TypeofKw
                | SyntaxKind::SizeofKw
                | SyntaxKind::DefaultKw
                | SyntaxKind::CheckedKw
                | SyntaxKind::UncheckedKw
                | SyntaxKind::DelegateKw
                | SyntaxKind::ThrowKw
                | SyntaxKind::LParen
                | SyntaxKind::Plus
                | SyntaxKind::Minus
                | SyntaxKind::Bang
                | SyntaxKind::Tilde
                | SyntaxKind::Caret
                | SyntaxKind::PlusPlus
                | SyntaxKind::MinusMinus
        )
}

fn infix_binding_power(op: SyntaxKind) -> Option<(u8, u8, SyntaxKind)> {
    let (l, r, kind) = match op {
        SyntaxKind::Star | SyntaxKind::Slash | SyntaxKind::Percent => {
            (23, 24, SyntaxKind::BinaryExpression)
        }
        SyntaxKind::Plus | SyntaxKind::Minus => (21, 22, SyntaxKind::BinaryExpression),
        SyntaxKind::LeftShift | SyntaxKind::RightShift => (SHIFT_BP, 20, SyntaxKind::BinaryExpression),
        SyntaxKind::Less | SyntaxKind::LessEq | SyntaxKind::Greater | SyntaxKind::GreaterEq => {
            (RELATIONAL_BP, 18, SyntaxKind::BinaryExpression)
        }
        SyntaxKind::EqEq | SyntaxKind::BangEq => (15, 16, SyntaxKind::BinaryExpression),
        SyntaxKind::Amp => (13, 14, SyntaxKind::BinaryExpression),
        SyntaxKind::Caret => (11, 12, SyntaxKind::BinaryExpression),
        SyntaxKind::Pipe => (9, 10, SyntaxKind::BinaryExpression),
        SyntaxKind::AmpAmp => (7, 8, SyntaxKind::BinaryExpression),
        SyntaxKind::PipePipe => (5, 6, SyntaxKind::BinaryExpression),
        // Null-coalescing is right-associative.
        SyntaxKind::QuestionQuestion => (4, 3, SyntaxKind::BinaryExpression),
        kind if kind.is_assignment_operator() => {
            (ASSIGNMENT_BP.0, ASSIGNMENT_BP.1, SyntaxKind::AssignmentExpression)
        }
        _ => return None,
    };
    Some((l, r, kind))
}

/// Indented `Kind "text"` dump of a tree, used by tests and `hotpatch parse`.
pub fn debug_dump(node: &SyntaxNode) -> String {
    fn go(node: &SyntaxNode, indent: usize, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "{:indent$}{:?}", "", node.kind(), indent = indent);
        for child in node.children_with_tokens() {
            match child {
                NodeOrToken::Node(n) => go(&n, indent + 2, out),
                NodeOrToken::Token(t) => {
                    let _ = writeln!(
                        out,
                        "{:indent$}{:?} {:?}",
                        "",
                        t.kind(),
                        t.text(),
                        indent = indent + 2
                    );
                }
            }
        }
    }

    let mut out = String::new();
    go(node, 0, &mut out);
    out
}
