//! Typed wrappers over [`SyntaxNode`]s.
//!
//! Each wrapper is a zero-cost view: casting checks the node kind, accessors walk direct
//! children.

use crate::ast::{support, AstNode};
use crate::parser::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

macro_rules! ast_node {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, PartialEq, Eq, Hash)]
            pub struct $name {
                syntax: SyntaxNode,
            }

            impl AstNode for $name {
                fn can_cast(kind: SyntaxKind) -> bool {
                    kind == SyntaxKind::$name
                }

                fn cast(syntax: SyntaxNode) -> Option<Self> {
                    Self::can_cast(syntax.kind()).then_some(Self { syntax })
                }

                fn syntax(&self) -> &SyntaxNode {
                    &self.syntax
                }
            }
        )*
    };
}

macro_rules! ast_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $($variant($variant),)*
        }

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                $($variant::can_cast(kind))||*
            }

            fn cast(syntax: SyntaxNode) -> Option<Self> {
                match syntax.kind() {
                    $(SyntaxKind::$variant => Some(Self::$variant($variant { syntax })),)*
                    _ => None,
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                match self {
                    $(Self::$variant(it) => it.syntax(),)*
                }
            }
        }
    };
}

ast_node! {
    CompilationUnit,
    NamespaceDeclaration,
    UsingDirective,
    Name,
    Modifiers,
    AttributeList,
    ClassDeclaration,
    StructDeclaration,
    InterfaceDeclaration,
    RecordDeclaration,
    EnumDeclaration,
    TypeParameterList,
    TypeParameter,
    BaseList,
    TypeBody,
    FieldDeclaration,
    EventFieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    PropertyDeclaration,
    AccessorDeclaration,
    ArrowExpressionClause,
    ParameterList,
    Parameter,
    Block,
    ReturnStatement,
    ExpressionStatement,
    LocalVariableDeclarationStatement,
    LocalFunctionStatement,
    ForStatement,
    ForHeader,
    ForEachStatement,
    UsingStatement,
    CatchClause,
    CatchDeclaration,
    VariableDeclaration,
    VariableDeclaratorList,
    VariableDeclarator,
    Type,
    TypeArgumentList,
    ArgumentList,
    BracketedArgumentList,
    Argument,
    LiteralExpression,
    NameExpression,
    ThisExpression,
    BaseExpression,
    ParenthesizedExpression,
    ObjectCreationExpression,
    ArrayCreationExpression,
    InitializerExpression,
    InvocationExpression,
    MemberAccessExpression,
    ElementAccessExpression,
    PrefixUnaryExpression,
    PostfixUnaryExpression,
    AwaitExpression,
    BinaryExpression,
    AssignmentExpression,
    ConditionalExpression,
    LambdaExpression,
    CastExpression,
    TypeOfExpression,
    SizeOfExpression,
    DefaultExpression,
    CheckedExpression,
    TupleExpression,
    ThrowExpression,
    SwitchExpression,
    DeclarationExpression,
    PredefinedType,
}

ast_enum! {
    /// Declarations whose body can hold fields and methods.
    TypeDeclaration {
        ClassDeclaration,
        StructDeclaration,
        InterfaceDeclaration,
        RecordDeclaration,
    }
}

ast_enum! {
    Expression {
        LiteralExpression,
        NameExpression,
        ThisExpression,
        BaseExpression,
        ParenthesizedExpression,
        ObjectCreationExpression,
        ArrayCreationExpression,
        InitializerExpression,
        InvocationExpression,
        MemberAccessExpression,
        ElementAccessExpression,
        PrefixUnaryExpression,
        PostfixUnaryExpression,
        AwaitExpression,
        BinaryExpression,
        AssignmentExpression,
        ConditionalExpression,
        LambdaExpression,
        CastExpression,
        TypeOfExpression,
        SizeOfExpression,
        DefaultExpression,
        CheckedExpression,
        TupleExpression,
        ThrowExpression,
        SwitchExpression,
        DeclarationExpression,
        PredefinedType,
    }
}

impl CompilationUnit {
    pub fn usings(&self) -> impl Iterator<Item = UsingDirective> + '_ {
        support::children::<UsingDirective>(&self.syntax)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = NamespaceDeclaration> + '_ {
        support::children::<NamespaceDeclaration>(&self.syntax)
    }
}

impl NamespaceDeclaration {
    pub fn name(&self) -> Option<Name> {
        support::child::<Name>(&self.syntax)
    }
}

impl UsingDirective {
    pub fn name(&self) -> Option<Name> {
        support::child::<Name>(&self.syntax)
    }

    pub fn is_static(&self) -> bool {
        support::token(&self.syntax, SyntaxKind::StaticKw).is_some()
    }
}

impl TypeDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child::<Modifiers>(self.syntax())
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(self.syntax())
    }

    pub fn type_parameter_list(&self) -> Option<TypeParameterList> {
        support::child::<TypeParameterList>(self.syntax())
    }

    pub fn base_list(&self) -> Option<BaseList> {
        support::child::<BaseList>(self.syntax())
    }

    pub fn body(&self) -> Option<TypeBody> {
        support::child::<TypeBody>(self.syntax())
    }
}

impl ClassDeclaration {
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn body(&self) -> Option<TypeBody> {
        support::child::<TypeBody>(&self.syntax)
    }
}

impl EnumDeclaration {
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl TypeParameterList {
    pub fn type_parameters(&self) -> impl Iterator<Item = TypeParameter> + '_ {
        support::children::<TypeParameter>(&self.syntax)
    }
}

impl TypeParameter {
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl BaseList {
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        support::children::<Type>(&self.syntax)
    }
}

impl TypeBody {
    pub fn fields(&self) -> impl Iterator<Item = FieldDeclaration> + '_ {
        support::children::<FieldDeclaration>(&self.syntax)
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodDeclaration> + '_ {
        support::children::<MethodDeclaration>(&self.syntax)
    }

    pub fn properties(&self) -> impl Iterator<Item = PropertyDeclaration> + '_ {
        support::children::<PropertyDeclaration>(&self.syntax)
    }

    pub fn nested_types(&self) -> impl Iterator<Item = TypeDeclaration> + '_ {
        support::children::<TypeDeclaration>(&self.syntax)
    }
}

impl FieldDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child::<Modifiers>(&self.syntax)
    }

    pub fn declaration(&self) -> Option<VariableDeclaration> {
        support::child::<VariableDeclaration>(&self.syntax)
    }
}

impl EventFieldDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child::<Modifiers>(&self.syntax)
    }

    pub fn declaration(&self) -> Option<VariableDeclaration> {
        support::child::<VariableDeclaration>(&self.syntax)
    }
}

impl MethodDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child::<Modifiers>(&self.syntax)
    }

    pub fn return_type(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn type_parameter_list(&self) -> Option<TypeParameterList> {
        support::child::<TypeParameterList>(&self.syntax)
    }

    pub fn parameter_list(&self) -> Option<ParameterList> {
        support::child::<ParameterList>(&self.syntax)
    }

    pub fn body(&self) -> Option<Block> {
        support::child::<Block>(&self.syntax)
    }

    pub fn expression_body(&self) -> Option<ArrowExpressionClause> {
        support::child::<ArrowExpressionClause>(&self.syntax)
    }
}

impl ConstructorDeclaration {
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn parameter_list(&self) -> Option<ParameterList> {
        support::child::<ParameterList>(&self.syntax)
    }

    pub fn body(&self) -> Option<Block> {
        support::child::<Block>(&self.syntax)
    }
}

impl PropertyDeclaration {
    pub fn property_type(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl AccessorDeclaration {
    pub fn keyword_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl ArrowExpressionClause {
    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl ParameterList {
    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        support::children::<Parameter>(&self.syntax)
    }
}

impl Parameter {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child::<Modifiers>(&self.syntax)
    }

    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl Block {
    pub fn l_brace_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::LBrace)
    }

    pub fn r_brace_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::RBrace)
    }
}

impl ReturnStatement {
    pub fn return_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::ReturnKw)
    }

    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl ExpressionStatement {
    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl LocalVariableDeclarationStatement {
    pub fn declaration(&self) -> Option<VariableDeclaration> {
        support::child::<VariableDeclaration>(&self.syntax)
    }
}

impl LocalFunctionStatement {
    pub fn return_type(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn parameter_list(&self) -> Option<ParameterList> {
        support::child::<ParameterList>(&self.syntax)
    }
}

impl ForStatement {
    pub fn header(&self) -> Option<ForHeader> {
        support::child::<ForHeader>(&self.syntax)
    }
}

impl ForHeader {
    pub fn declaration(&self) -> Option<VariableDeclaration> {
        support::child::<VariableDeclaration>(&self.syntax)
    }
}

impl ForEachStatement {
    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::Identifier)
    }
}

impl UsingStatement {
    pub fn declaration(&self) -> Option<VariableDeclaration> {
        support::child::<VariableDeclaration>(&self.syntax)
    }
}

impl CatchClause {
    pub fn declaration(&self) -> Option<CatchDeclaration> {
        support::child::<CatchDeclaration>(&self.syntax)
    }

    pub fn block(&self) -> Option<Block> {
        support::child::<Block>(&self.syntax)
    }
}

impl CatchDeclaration {
    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::Identifier)
    }
}

impl VariableDeclaration {
    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn declarator_list(&self) -> Option<VariableDeclaratorList> {
        support::child::<VariableDeclaratorList>(&self.syntax)
    }
}

impl VariableDeclaratorList {
    pub fn declarators(&self) -> impl Iterator<Item = VariableDeclarator> + '_ {
        support::children::<VariableDeclarator>(&self.syntax)
    }
}

impl VariableDeclarator {
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::Identifier)
    }

    pub fn initializer(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl TypeArgumentList {
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        support::children::<Type>(&self.syntax)
    }
}

impl ArgumentList {
    pub fn arguments(&self) -> impl Iterator<Item = Argument> + '_ {
        support::children::<Argument>(&self.syntax)
    }
}

impl BracketedArgumentList {
    pub fn arguments(&self) -> impl Iterator<Item = Argument> + '_ {
        support::children::<Argument>(&self.syntax)
    }
}

impl Argument {
    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }

    /// `name:` of a named argument.
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::Colon)?;
        support::token(&self.syntax, SyntaxKind::Identifier)
    }
}

impl LiteralExpression {
    pub fn token(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|tok| tok.kind().is_literal())
    }
}

impl NameExpression {
    pub fn ident_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::Identifier)
    }

    pub fn type_argument_list(&self) -> Option<TypeArgumentList> {
        support::child::<TypeArgumentList>(&self.syntax)
    }
}

impl ThisExpression {
    pub fn this_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::ThisKw)
    }
}

impl ParenthesizedExpression {
    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl ObjectCreationExpression {
    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn argument_list(&self) -> Option<ArgumentList> {
        support::child::<ArgumentList>(&self.syntax)
    }

    pub fn initializer(&self) -> Option<InitializerExpression> {
        support::child::<InitializerExpression>(&self.syntax)
    }
}

impl InitializerExpression {
    pub fn expressions(&self) -> impl Iterator<Item = Expression> + '_ {
        support::children::<Expression>(&self.syntax)
    }
}

impl InvocationExpression {
    pub fn callee(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }

    pub fn argument_list(&self) -> Option<ArgumentList> {
        support::child::<ArgumentList>(&self.syntax)
    }
}

impl MemberAccessExpression {
    /// The receiver left of the dot.
    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }

    pub fn operator_token(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|tok| {
                matches!(
                    tok.kind(),
                    SyntaxKind::Dot | SyntaxKind::QuestionDot | SyntaxKind::DoubleColon
                )
            })
    }

    /// The accessed member, always the last child node.
    pub fn name(&self) -> Option<NameExpression> {
        self.syntax.last_child().and_then(NameExpression::cast)
    }
}

impl ElementAccessExpression {
    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }

    pub fn argument_list(&self) -> Option<BracketedArgumentList> {
        support::child::<BracketedArgumentList>(&self.syntax)
    }
}

impl PrefixUnaryExpression {
    pub fn operand(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl PostfixUnaryExpression {
    pub fn operand(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl BinaryExpression {
    pub fn lhs(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }

    pub fn rhs(&self) -> Option<Expression> {
        support::children::<Expression>(&self.syntax).nth(1)
    }
}

impl AssignmentExpression {
    pub fn lhs(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }

    pub fn rhs(&self) -> Option<Expression> {
        support::children::<Expression>(&self.syntax).nth(1)
    }

    pub fn operator_token(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|tok| tok.kind().is_assignment_operator())
    }
}

impl ConditionalExpression {
    pub fn condition(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl LambdaExpression {
    pub fn parameter_list(&self) -> Option<ParameterList> {
        support::child::<ParameterList>(&self.syntax)
    }

    /// Parameters of either `(a, b) =>` or the single-parameter `a =>` form.
    pub fn parameters(&self) -> Vec<Parameter> {
        match self.parameter_list() {
            Some(list) => list.parameters().collect(),
            None => support::children::<Parameter>(&self.syntax).collect(),
        }
    }

    pub fn body(&self) -> Option<Block> {
        support::child::<Block>(&self.syntax)
    }
}

impl CastExpression {
    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn expression(&self) -> Option<Expression> {
        support::child::<Expression>(&self.syntax)
    }
}

impl DeclarationExpression {
    pub fn ty(&self) -> Option<Type> {
        support::child::<Type>(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::Identifier)
    }
}
