use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::{
    debug_dump, lex, lex_with_errors, parse_csharp, parse_csharp_expression, AstNode,
    CompilationUnit, SyntaxKind, SyntaxNode, TextRange,
};

fn dump_non_trivia(input: &str) -> Vec<(SyntaxKind, String)> {
    lex(input)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| (t.kind, t.text(input).to_string()))
        .collect()
}

fn descendants_of_kind(node: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
    node.descendants().filter(|n| n.kind() == kind).collect()
}

#[test]
fn syntax_kind_raw_roundtrip_is_total_for_valid_range() {
    use rowan::Language;

    for raw in 0..(SyntaxKind::__Last as u16) {
        let kind = <crate::CSharpLanguage as Language>::kind_from_raw(rowan::SyntaxKind(raw));
        assert_eq!(
            <crate::CSharpLanguage as Language>::kind_to_raw(kind).0,
            raw,
            "failed roundtrip for raw={raw}"
        );
    }
}

#[test]
fn syntax_kind_helper_classification_smoke_test() {
    assert!(SyntaxKind::ClassKw.is_keyword());
    assert!(SyntaxKind::StaticKw.is_modifier_keyword());
    assert!(SyntaxKind::PrivateKw.is_access_modifier());
    assert!(!SyntaxKind::StaticKw.is_access_modifier());
    assert!(SyntaxKind::IntKw.is_predefined_type());
    assert!(!SyntaxKind::VoidKw.is_predefined_type());
    assert!(SyntaxKind::QuestionQuestionEq.is_assignment_operator());
    assert!(SyntaxKind::BlockComment.is_trivia());
    assert!(!SyntaxKind::Identifier.is_keyword());
}

#[test]
fn lexer_keywords_literals_and_contextual_identifiers() {
    let input = "var x = 0xFF + 1_000u; float f = 1.5f; string s = @\"a\\b\";";
    assert_eq!(
        dump_non_trivia(input),
        vec![
            (SyntaxKind::Identifier, "var".into()),
            (SyntaxKind::Identifier, "x".into()),
            (SyntaxKind::Eq, "=".into()),
            (SyntaxKind::IntLiteral, "0xFF".into()),
            (SyntaxKind::Plus, "+".into()),
            (SyntaxKind::IntLiteral, "1_000u".into()),
            (SyntaxKind::Semicolon, ";".into()),
            (SyntaxKind::FloatKw, "float".into()),
            (SyntaxKind::Identifier, "f".into()),
            (SyntaxKind::Eq, "=".into()),
            (SyntaxKind::RealLiteral, "1.5f".into()),
            (SyntaxKind::Semicolon, ";".into()),
            (SyntaxKind::StringKw, "string".into()),
            (SyntaxKind::Identifier, "s".into()),
            (SyntaxKind::Eq, "=".into()),
            (SyntaxKind::StringLiteral, "@\"a\\b\"".into()),
            (SyntaxKind::Semicolon, ";".into()),
            (SyntaxKind::Eof, "".into()),
        ]
    );
}

#[test]
fn lexer_trivia_kinds() {
    let input = "#region A\n/// doc\n// line\n/* block */ x";
    let kinds: Vec<_> = lex(input).into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SyntaxKind::PreprocessorDirective,
            SyntaxKind::Whitespace,
            SyntaxKind::DocComment,
            SyntaxKind::Whitespace,
            SyntaxKind::LineComment,
            SyntaxKind::Whitespace,
            SyntaxKind::BlockComment,
            SyntaxKind::Whitespace,
            SyntaxKind::Identifier,
            SyntaxKind::Eof,
        ]
    );
}

#[test]
fn lexer_interpolated_string_is_one_token() {
    let input = "$\"count: {Count} and {\"nested\"}\"";
    let tokens = dump_non_trivia(input);
    assert_eq!(
        tokens,
        vec![
            (SyntaxKind::InterpolatedStringLiteral, input.to_string()),
            (SyntaxKind::Eof, "".into()),
        ]
    );
}

#[test]
fn lexer_reports_unterminated_string() {
    let (tokens, errors) = lex_with_errors("\"abc");
    assert_eq!(errors.len(), 1);
    assert_eq!(tokens.last().map(|t| t.kind), Some(SyntaxKind::Eof));
}

#[test]
fn lexer_question_dot_and_shift_tokens() {
    let kinds: Vec<_> = dump_non_trivia("a?.b >> c ?? d")
        .into_iter()
        .map(|(kind, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            SyntaxKind::Identifier,
            SyntaxKind::QuestionDot,
            SyntaxKind::Identifier,
            SyntaxKind::RightShift,
            SyntaxKind::Identifier,
            SyntaxKind::QuestionQuestion,
            SyntaxKind::Identifier,
            SyntaxKind::Eof,
        ]
    );
}

#[test]
fn parse_is_lossless() {
    let input = r#"using System;
using UnityEngine;

namespace Game
{
    // A comment before the class.
    public class Player : MonoBehaviour
    {
        public static int Count; /* trailing */
        private float _speed = 1.5f;

        void Update()
        {
            #if UNITY_EDITOR
            Count++;
            #endif
            var pos = transform.position;
            if (pos.x > 10) { Debug.Log($"far {pos.x}"); }
        }
    }
}
"#;
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    assert_eq!(parse.syntax().to_string(), input);
}

#[test]
fn parse_expression_member_access_shape() {
    let parse = parse_csharp_expression("Foo.Count");
    assert_eq!(parse.errors, Vec::new());
    let expected = r#"ExpressionFragment
  MemberAccessExpression
    NameExpression
      Identifier "Foo"
    Dot "."
    NameExpression
      Identifier "Count"
  Eof ""
"#;
    assert_eq!(debug_dump(&parse.syntax()), expected);
}

#[test]
fn parse_expression_cast_through_object() {
    let parse = parse_csharp_expression("((Foo)(object)this).BaseMethod()");
    assert_eq!(parse.errors, Vec::new());

    let root = parse.syntax();
    let expr = root.first_child().expect("expression");
    assert_eq!(expr.kind(), SyntaxKind::InvocationExpression);
    assert_eq!(descendants_of_kind(&root, SyntaxKind::CastExpression).len(), 2);
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::ParenthesizedExpression).len(),
        1
    );
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::ThisExpression).len(),
        1
    );
}

#[test]
fn parenthesized_name_followed_by_operator_is_not_a_cast() {
    let parse = parse_csharp_expression("(a) - b");
    assert_eq!(parse.errors, Vec::new());
    let expr = parse.syntax().first_child().expect("expression");
    assert_eq!(expr.kind(), SyntaxKind::BinaryExpression);
    assert_eq!(
        expr.first_child().map(|n| n.kind()),
        Some(SyntaxKind::ParenthesizedExpression)
    );
}

#[test]
fn predefined_type_in_parens_is_a_cast() {
    let parse = parse_csharp_expression("(int)-x");
    assert_eq!(parse.errors, Vec::new());
    let expr = parse.syntax().first_child().expect("expression");
    assert_eq!(expr.kind(), SyntaxKind::CastExpression);
}

#[test]
fn generic_name_vs_less_than() {
    let generic = parse_csharp_expression("Box<T>.Count");
    assert_eq!(generic.errors, Vec::new());
    let root = generic.syntax();
    assert_eq!(
        root.first_child().map(|n| n.kind()),
        Some(SyntaxKind::MemberAccessExpression)
    );
    assert_eq!(descendants_of_kind(&root, SyntaxKind::TypeArgumentList).len(), 1);

    let comparison = parse_csharp_expression("a < b");
    assert_eq!(comparison.errors, Vec::new());
    assert_eq!(
        comparison.syntax().first_child().map(|n| n.kind()),
        Some(SyntaxKind::BinaryExpression)
    );
}

#[test]
fn nested_generic_closing_shift_is_split() {
    let parse = parse_csharp("class A { List<List<int>> items; }");
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    assert_eq!(descendants_of_kind(&root, SyntaxKind::TypeArgumentList).len(), 2);
    assert_eq!(root.to_string(), "class A { List<List<int>> items; }");
}

#[test]
fn trailing_input_in_expression_is_an_error() {
    let parse = parse_csharp_expression("a b");
    assert_eq!(parse.errors.len(), 1);
    assert_eq!(parse.errors[0].range, TextRange { start: 2, end: 3 });
}

#[test]
fn local_declarations_and_expression_statements() {
    let input = "class A { void M() { int x = 1; Foo<int> y; x = 2; Count++; await Task.Yield(); } }";
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::LocalVariableDeclarationStatement).len(),
        2
    );
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::ExpressionStatement).len(),
        3
    );
    assert_eq!(descendants_of_kind(&root, SyntaxKind::AwaitExpression).len(), 1);
}

#[test]
fn local_function_and_lambdas() {
    let input = r#"class A {
    void M() {
        int Twice(int v) => v * 2;
        Func<int, int> f = x => x + 1;
        Action g = async () => { await Run(); };
        list.ForEach(delegate (int i) { Use(i); });
    }
}"#;
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    assert_eq!(descendants_of_kind(&root, SyntaxKind::LocalFunctionStatement).len(), 1);
    assert_eq!(descendants_of_kind(&root, SyntaxKind::LambdaExpression).len(), 3);
    assert_eq!(root.to_string(), input);
}

#[test]
fn member_shapes() {
    let input = r#"public partial class Box<T> : Base, IThing where T : class, new()
{
    public const int Max = 10;
    public static event Action Changed;
    public int Value { get; private set; } = 3;
    public int Double => Value * 2;
    public T this[int i] { get { return default; } }
    public Box(T item) : base(item) { }
    ~Box() { }
    public static Box<T> operator +(Box<T> a, Box<T> b) => a;
    public static implicit operator T(Box<T> b) => default(T);
    public override string ToString() => "box";
    private enum Kind { A, B = 2 }
    struct Inner { }
}"#;
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    for (kind, count) in [
        (SyntaxKind::FieldDeclaration, 1),
        (SyntaxKind::EventFieldDeclaration, 1),
        (SyntaxKind::PropertyDeclaration, 2),
        (SyntaxKind::IndexerDeclaration, 1),
        (SyntaxKind::ConstructorDeclaration, 1),
        (SyntaxKind::DestructorDeclaration, 1),
        (SyntaxKind::OperatorDeclaration, 2),
        (SyntaxKind::MethodDeclaration, 1),
        (SyntaxKind::EnumDeclaration, 1),
        (SyntaxKind::StructDeclaration, 1),
        (SyntaxKind::TypeConstraintClause, 1),
    ] {
        assert_eq!(
            descendants_of_kind(&root, kind).len(),
            count,
            "unexpected count for {kind:?}"
        );
    }
    assert_eq!(root.to_string(), input);
}

#[test]
fn statements_round_trip() {
    let input = r#"class A {
    IEnumerator Run() {
        for (int i = 0, j = 1; i < 10; i++, j--) { continue; }
        foreach (var item in items) Use(item);
        while (x) { break; }
        do { x--; } while (x > 0);
        switch (kind) {
            case Kind.A:
            case Kind.B when flag:
                return null;
            default:
                break;
        }
        try { Risky(); } catch (Exception e) when (e != null) { throw; } finally { Done(); }
        using (var s = Open()) { }
        lock (gate) { }
        yield return new WaitForSeconds(1f);
        yield break;
    }
}"#;
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    for kind in [
        SyntaxKind::ForStatement,
        SyntaxKind::ForEachStatement,
        SyntaxKind::WhileStatement,
        SyntaxKind::DoStatement,
        SyntaxKind::SwitchStatement,
        SyntaxKind::TryStatement,
        SyntaxKind::CatchClause,
        SyntaxKind::FinallyClause,
        SyntaxKind::UsingStatement,
        SyntaxKind::LockStatement,
    ] {
        assert_eq!(descendants_of_kind(&root, kind).len(), 1, "{kind:?}");
    }
    assert_eq!(descendants_of_kind(&root, SyntaxKind::YieldStatement).len(), 2);
    assert_eq!(descendants_of_kind(&root, SyntaxKind::SwitchLabel).len(), 3);
    assert_eq!(root.to_string(), input);
}

#[test]
fn patterns_and_switch_expressions() {
    let input = r#"class A {
    string M(object o) {
        if (o is string s && s.Length > 0) { return s; }
        if (o is not null) { }
        return o switch { int n when n > 0 => "pos", > 5 => "big", _ => "other" };
    }
}"#;
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    assert_eq!(descendants_of_kind(&root, SyntaxKind::DeclarationExpression).len(), 2);
    assert_eq!(descendants_of_kind(&root, SyntaxKind::SwitchExpressionArm).len(), 3);
    assert_eq!(root.to_string(), input);
}

#[test]
fn type_constraint_clauses() {
    let input = "class Box<T> where T : Base, new() { void M<U>() where U : class, IComparable<U> { } }";
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::TypeConstraintClause).len(),
        2
    );
    assert_eq!(root.to_string(), input);
}

#[test]
fn deconstruction_declares_variables() {
    let input = r#"class A {
    void M() {
        var (a, (b, _)) = Split();
        (var c, int d) = Pair();
        (x, y) = (y, x);
        foreach (var (k, v) in map) { }
        Use((n * m, o));
    }
}"#;
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    let names: Vec<Vec<String>> = descendants_of_kind(&root, SyntaxKind::DeclarationExpression)
        .into_iter()
        .filter_map(crate::DeclarationExpression::cast)
        .map(|decl| decl.names())
        .collect();
    assert_eq!(
        names,
        vec![
            vec!["a".to_string(), "b".to_string(), "_".to_string()],
            vec!["c".to_string()],
            vec!["d".to_string()],
            vec!["k".to_string(), "v".to_string()],
        ]
    );
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::ParenthesizedVariableDesignation).len(),
        3
    );
    assert_eq!(root.to_string(), input);
}

#[test]
fn object_and_array_creation() {
    let input =
        "class A { void M() { var a = new Foo { Count = 1 }; var b = new int[3]; var c = new[] { 1, 2 }; Foo d = new(); } }";
    let parse = parse_csharp(input);
    assert_eq!(parse.errors, Vec::new());
    let root = parse.syntax();
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::ObjectCreationExpression).len(),
        2
    );
    assert_eq!(
        descendants_of_kind(&root, SyntaxKind::ArrayCreationExpression).len(),
        2
    );
}

#[test]
fn file_scoped_namespace_owns_following_types() {
    let parse = parse_csharp("namespace Game;\nclass A { }\nclass B { }\n");
    assert_eq!(parse.errors, Vec::new());
    let unit = CompilationUnit::cast(parse.syntax()).expect("compilation unit");
    let ns = unit.namespaces().next().expect("namespace");
    assert_eq!(ns.name().map(|n| n.text()), Some("Game".to_string()));
    assert_eq!(descendants_of_kind(ns.syntax(), SyntaxKind::ClassDeclaration).len(), 2);
}

#[test]
fn malformed_input_recovers_and_stays_lossless() {
    let input = "class A { void M() { x = ; } int } class B { }";
    let parse = parse_csharp(input);
    assert!(!parse.errors.is_empty());
    let root = parse.syntax();
    assert_eq!(root.to_string(), input);
    assert_eq!(descendants_of_kind(&root, SyntaxKind::ClassDeclaration).len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parsing_never_loses_text(input in "[a-zA-Z0-9_ {}();=+.<>,:?!\"\n/*-]{0,80}") {
        let parse = parse_csharp(&input);
        prop_assert_eq!(parse.syntax().to_string(), input.clone());

        let expr = parse_csharp_expression(&input);
        prop_assert_eq!(expr.syntax().to_string(), input);
    }
}
