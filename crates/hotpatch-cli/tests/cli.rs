use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn hotpatch() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("hotpatch"))
}

const FOO: &str = "class Foo : Base { public static int Count; void Bump() { Count++; this.Inherited(); } }\n";

#[test]
fn help_mentions_commands() {
    hotpatch().arg("--help").assert().success().stdout(
        predicate::str::contains("rewrite").and(predicate::str::contains("parse")),
    );
}

#[test]
fn rewrite_prints_rewritten_source() {
    let temp = TempDir::new().unwrap();
    temp.child("Foo.cs").write_str(FOO).unwrap();

    hotpatch()
        .arg("rewrite")
        .arg(temp.child("Foo.cs").path())
        .assert()
        .success()
        .stdout(
            "class Foo : Base { public static int Count; void Bump() { Foo.Count++; ((Foo)(object)this).Inherited(); } }\n",
        );
}

#[test]
fn annotate_flag_and_config_file_enable_comments() {
    let temp = TempDir::new().unwrap();
    temp.child("Foo.cs").write_str(FOO).unwrap();

    hotpatch()
        .arg("rewrite")
        .arg("--annotate")
        .arg(temp.child("Foo.cs").path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Foo.Count/*StaticFieldAccessRewriter:BareIdentifier*/++",
        ));

    temp.child("hotpatch.toml")
        .write_str("[rewrite]\nwrite_rewrite_reason_as_comment = true\n")
        .unwrap();
    hotpatch()
        .arg("rewrite")
        .arg(temp.child("Foo.cs").path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "/*SelfReferenceRewriter:InvocationReceiver*/",
        ));
}

#[test]
fn json_report_lists_rewrites() {
    let temp = TempDir::new().unwrap();
    temp.child("Foo.cs").write_str(FOO).unwrap();

    let output = hotpatch()
        .arg("rewrite")
        .arg("--json")
        .arg(temp.child("Foo.cs").path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rewrites = v["rewrites"].as_array().unwrap();
    assert_eq!(rewrites.len(), 2);
    assert_eq!(rewrites[0]["rule"], "BareStaticField");
    assert_eq!(rewrites[1]["rule"], "ThisInvocationReceiver");
    assert!(v["output"].as_str().unwrap().contains("Foo.Count++"));
}

#[test]
fn implicit_private_flag_skips_unmodified_fields() {
    let temp = TempDir::new().unwrap();
    temp.child("Foo.cs")
        .write_str("class Foo { static int Hits; void M() { Hits++; } }\n")
        .unwrap();

    hotpatch()
        .arg("rewrite")
        .arg("--implicit-private")
        .arg(temp.child("Foo.cs").path())
        .assert()
        .success()
        .stdout("class Foo { static int Hits; void M() { Hits++; } }\n");
}

#[test]
fn parse_errors_exit_with_one() {
    let temp = TempDir::new().unwrap();
    temp.child("Broken.cs")
        .write_str("class Broken { void M( { }\n")
        .unwrap();

    hotpatch()
        .arg("rewrite")
        .arg(temp.child("Broken.cs").path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Broken.cs"));

    hotpatch()
        .arg("parse")
        .arg(temp.child("Broken.cs").path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error:"));
}

#[test]
fn parse_json_includes_tree() {
    let temp = TempDir::new().unwrap();
    temp.child("Foo.cs").write_str(FOO).unwrap();

    let output = hotpatch()
        .arg("parse")
        .arg("--json")
        .arg(temp.child("Foo.cs").path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(v["errors"].as_array().unwrap().is_empty());
    assert!(v["tree"].as_str().unwrap().starts_with("CompilationUnit"));
}

#[test]
fn bad_config_is_a_usage_failure() {
    let temp = TempDir::new().unwrap();
    temp.child("Foo.cs").write_str(FOO).unwrap();
    temp.child("custom.toml")
        .write_str("[rewrite]\nunknown_option = true\n")
        .unwrap();

    hotpatch()
        .arg("rewrite")
        .arg("--config")
        .arg(temp.child("custom.toml").path())
        .arg(temp.child("Foo.cs").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown_option"));
}

#[test]
fn missing_file_is_a_usage_failure() {
    hotpatch()
        .arg("rewrite")
        .arg("does/not/exist.cs")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read"));
}
