use hotpatch_rewrite::{ReturnTypeRewriter, RewriteConfig, RewriteRule};
use hotpatch_syntax::parse_csharp;
use pretty_assertions::assert_eq;

fn enabled() -> RewriteConfig {
    RewriteConfig {
        cast_same_typed_returns: true,
        ..RewriteConfig::default()
    }
}

fn rewrite_with(src: &str, config: &RewriteConfig) -> String {
    let parse = parse_csharp(src);
    assert!(parse.errors.is_empty(), "{:?}", parse.errors);
    ReturnTypeRewriter::new(config)
        .run(&parse.syntax())
        .unwrap()
        .text()
}

fn rewrite(src: &str) -> String {
    rewrite_with(src, &enabled())
}

#[test]
fn disabled_by_default() {
    let src = "class Foo { Foo Clone() { return copy; } }";
    assert_eq!(rewrite_with(src, &RewriteConfig::default()), src);
}

#[test]
fn casts_values_returned_as_the_enclosing_type() {
    assert_eq!(
        rewrite("class Foo { Foo Clone() { var copy = Make(); return copy; } }"),
        "class Foo { Foo Clone() { var copy = Make(); return (Foo)(object)copy; } }"
    );
}

#[test]
fn other_return_types_are_left_alone() {
    let src = r#"
class Foo {
    int Count() { return count; }
    Bar Other() { return bar; }
    void Done() { return; }
}
"#;
    assert_eq!(rewrite(src), src);
}

#[test]
fn compound_values_are_parenthesized() {
    assert_eq!(
        rewrite("class Foo { Foo Pick() { return a ?? b; } Foo Either() { return ok ? a : b; } }"),
        "class Foo { Foo Pick() { return (Foo)(object)(a ?? b); } Foo Either() { return (Foo)(object)(ok ? a : b); } }"
    );
}

#[test]
fn interior_trivia_is_kept_and_edges_stay_outside() {
    assert_eq!(
        rewrite("class Foo { Foo M() { return   a /* keep */ ?? b ; } }"),
        "class Foo { Foo M() { return   (Foo)(object)(a /* keep */ ?? b) ; } }"
    );
}

#[test]
fn lambdas_and_local_functions_have_their_own_returns() {
    let src = r#"
class Foo {
    Foo M() {
        Func<Foo> make = () => { return other; };
        Foo Local() { return other; }
        return other;
    }
}
"#;
    assert_eq!(
        rewrite(src),
        r#"
class Foo {
    Foo M() {
        Func<Foo> make = () => { return other; };
        Foo Local() { return other; }
        return (Foo)(object)other;
    }
}
"#
    );
}

#[test]
fn generic_return_types_compare_without_whitespace() {
    assert_eq!(
        rewrite("class Pair<K,V> { Pair< K, V > Swap() { return made; } }"),
        "class Pair<K,V> { Pair< K, V > Swap() { return (Pair<K, V>)(object)made; } }"
    );
}

#[test]
fn existing_cast_through_is_not_doubled() {
    let src = "class Foo { Foo M() { return (Foo)(object)this; } }";
    assert_eq!(rewrite(src), src);
}

#[test]
fn annotated_and_reported() {
    let config = RewriteConfig {
        write_rewrite_reason_as_comment: true,
        ..enabled()
    };
    let src = "class Foo { Foo M() { return other; } }";
    assert_eq!(
        rewrite_with(src, &config),
        "class Foo { Foo M() { return (Foo)(object)other/*ReturnTypeRewriter:ReturnValue*/; } }"
    );

    let parse = parse_csharp(src);
    let outcome = ReturnTypeRewriter::new(&config)
        .run(&parse.syntax())
        .unwrap();
    assert_eq!(outcome.rewrites.len(), 1);
    assert_eq!(outcome.rewrites[0].rule, RewriteRule::SameTypedReturn);
    assert_eq!(outcome.rewrites[0].original, "other");
}
