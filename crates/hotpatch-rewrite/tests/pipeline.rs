use hotpatch_rewrite::{
    cast_through_text, rewrite_source, synthesize_expression, AppliedRewrite, Pass,
    RewriteConfig, RewriteError, RewritePipeline,
};
use hotpatch_syntax::parse_csharp;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const PLAYER: &str = r#"using UnityEngine;

namespace Game
{
    public class Player : MonoBehaviour
    {
        public static int Alive;
        private static int nextId;
        public static Player Local;

        int id;

        void Awake()
        {
            id = nextId++;
            Alive += 1;
            Local = this;
            // Announce ourselves.
            Lobby.Join(this);
            this.StartCoroutine(Tick());
        }

        public Player Self()
        {
            return this;
        }

        void OnDestroy() => Alive--;
    }
}
"#;

#[test]
fn rewrites_a_unity_behaviour() {
    let outcome = rewrite_source(PLAYER, &RewriteConfig::default()).unwrap();
    assert_eq!(
        outcome.text(),
        r#"using UnityEngine;

namespace Game
{
    public class Player : MonoBehaviour
    {
        public static int Alive;
        private static int nextId;
        public static Player Local;

        int id;

        void Awake()
        {
            id = nextId++;
            Player.Alive += 1;
            Player.Local = (Player)(object)this;
            // Announce ourselves.
            Lobby.Join((Player)(object)this);
            ((Player)(object)this).StartCoroutine(Tick());
        }

        public Player Self()
        {
            return (Player)(object)this;
        }

        void OnDestroy() => Player.Alive--;
    }
}
"#
    );
    assert_eq!(outcome.rewrites.len(), 7);
}

#[test]
fn self_reference_and_return_passes_do_not_double_cast() {
    let config = RewriteConfig {
        cast_same_typed_returns: true,
        ..RewriteConfig::default()
    };
    let outcome = rewrite_source(
        "class Foo { Foo Self() { return this; } Foo Other() { return next; } }",
        &config,
    )
    .unwrap();
    assert_eq!(
        outcome.text(),
        "class Foo { Foo Self() { return (Foo)(object)this; } Foo Other() { return (Foo)(object)next; } }"
    );
}

#[test]
fn comment_toggle_only_changes_comments() {
    let plain = rewrite_source(PLAYER, &RewriteConfig::default())
        .unwrap()
        .text();
    let annotated = rewrite_source(
        PLAYER,
        &RewriteConfig {
            write_rewrite_reason_as_comment: true,
            ..RewriteConfig::default()
        },
    )
    .unwrap()
    .text();

    assert_ne!(plain, annotated);
    assert_eq!(strip_rewrite_comments(&annotated), plain);
}

#[test]
fn malformed_source_is_refused() {
    let err = rewrite_source("class Foo { void M( { }", &RewriteConfig::default()).unwrap_err();
    match err {
        RewriteError::InvalidInput { errors } => assert!(!errors.is_empty()),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn passes_can_be_selected() {
    let parse = parse_csharp(PLAYER);
    let pipeline =
        RewritePipeline::with_passes(RewriteConfig::default(), vec![Pass::SelfReference]);
    let outcome = pipeline.run(&parse.syntax()).unwrap();
    assert_eq!(outcome.rewrites.len(), 4);
    assert!(outcome.text().contains("            Alive += 1;"));

    let default = RewritePipeline::new(RewriteConfig::default());
    assert_eq!(default.passes(), &Pass::ALL);
}

#[test]
fn outcome_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<hotpatch_rewrite::RewriteOutcome>();
}

fn strip_rewrite_comments(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        let Some(len) = rest[start..].find("*/") else {
            break;
        };
        let comment = &rest[start..start + len + 2];
        out.push_str(&rest[..start]);
        if !comment.contains("Rewriter:") {
            out.push_str(comment);
        }
        rest = &rest[start + len + 2..];
    }
    out.push_str(rest);
    out
}

/// Applies every rewrite's replacement text over its original range.
fn splice(input: &str, rewrites: &[AppliedRewrite]) -> String {
    let mut out = input.to_string();
    let mut sorted: Vec<_> = rewrites.iter().collect();
    sorted.sort_by_key(|it| std::cmp::Reverse(it.range.start));
    for rewrite in sorted {
        out.replace_range(
            rewrite.range.start as usize..rewrite.range.end as usize,
            &rewrite.replacement,
        );
    }
    out
}

fn type_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r"[A-Z][A-Za-z0-9_]{0,8}")
        .unwrap()
        .prop_map(|name| format!("{name}Type"))
}

fn field_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r"[A-Z][A-Za-z0-9_]{0,8}")
        .unwrap()
        .prop_map(|name| format!("{name}Field"))
}

fn trivia() -> impl Strategy<Value = String> {
    const TRIVIA: &[&str] = &[
        " ",
        "  ",
        "\t",
        "\n",
        "\r\n",
        "\n    ",
        " /* c */ ",
        " // note\n",
        "\n#if DEBUG\n",
    ];
    proptest::sample::select(TRIVIA).prop_map(ToString::to_string)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn synthesis_parses_for_any_identifiers(ty in type_name(), field in field_name()) {
        let cast = cast_through_text(&ty, "this");
        let receiver = format!("({cast})");
        let qualified = format!("{ty}.{field}");
        let generic = cast_through_text(&format!("{ty}<T, U>"), "this");
        for template in [&cast, &receiver, &qualified, &generic] {
            let parsed = synthesize_expression(template);
            prop_assert!(parsed.is_ok(), "{}: {:?}", template, parsed);
        }
    }

    #[test]
    fn single_pass_output_is_input_plus_replacements(
        ty in type_name(),
        field in field_name(),
        w in proptest::collection::vec(trivia(), 6),
    ) {
        let src = format!(
            "class {ty} : Base {{{w0}public static int {field};{w1}void M(int p) {{{w2}{field}{w3}+= p;{w4}Log({w5}this);\n}} }}",
            w0 = w[0], w1 = w[1], w2 = w[2], w3 = w[3], w4 = w[4], w5 = w[5],
        );
        let parse = parse_csharp(&src);
        prop_assert!(parse.errors.is_empty(), "{:?}", parse.errors);

        for pass in [Pass::StaticFieldAccess, Pass::SelfReference] {
            let outcome = pass.run(&parse.syntax(), &RewriteConfig::default()).unwrap();
            prop_assert_eq!(outcome.rewrites.len(), 1);
            prop_assert_eq!(splice(&src, &outcome.rewrites), outcome.text());
        }

        let full = rewrite_source(&src, &RewriteConfig::default()).unwrap();
        prop_assert!(parse_csharp(&full.text()).errors.is_empty());
    }
}
