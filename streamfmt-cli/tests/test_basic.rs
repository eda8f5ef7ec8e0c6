use std::fs;
use std::io::Write;
use std::process::Command;

use insta_cmd::{assert_cmd_snapshot, get_cargo_bin};
use tempfile::NamedTempFile;

fn cli() -> Command {
    let mut cmd = Command::new(get_cargo_bin("streamfmt-cli"));
    cmd.env_remove("STREAMFMT_LOG");
    cmd
}

fn file_with_contents(contents: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .prefix("streamfmt-testfile--")
        .tempfile()
        .unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn test_render_with_data() {
    let data = file_with_contents(r#"{"service": {"shortName": "RD"}, "stream": {"name": "movie"}}"#);
    let tmpl = file_with_contents("[{service.shortName}] {stream.name|upper}");

    assert_cmd_snapshot!(
        cli().arg(tmpl.path()).arg(data.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    [RD] MOVIE

    ----- stderr -----
    "###);
}

#[test]
fn test_no_newline() {
    let tmpl = file_with_contents("{missing}x");

    assert_cmd_snapshot!(
        cli().arg("--no-newline").arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    x
    ----- stderr -----
    "###);
}

#[test]
fn test_defines() {
    let tmpl = file_with_contents("{stream.name} {stream.size|bytes} {if cached}cached{/if}");

    assert_cmd_snapshot!(
        cli()
            .arg("-D")
            .arg("stream.name=Movie")
            .arg("-D")
            .arg("stream.size:=1536")
            .arg("-D")
            .arg("cached")
            .arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    Movie 1.5 KB cached

    ----- stderr -----
    "###);
}

#[test]
fn test_defines_override_data() {
    let data = file_with_contents(r#"{"stream": {"name": "from data", "size": 2048}}"#);
    let tmpl = file_with_contents("{stream.name} {stream.size|bytes}");

    assert_cmd_snapshot!(
        cli()
            .arg("-D")
            .arg("stream.name=from define")
            .arg(tmpl.path())
            .arg(data.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    from define 2 KB

    ----- stderr -----
    "###);
}

#[test]
fn test_convert() {
    let tmpl = file_with_contents(r#"{stream.cached::istrue["C"||"U"]} {stream.size::bytes}"#);

    assert_cmd_snapshot!(
        cli().arg("--convert").arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    {if stream.cached}C{else}U{/if} {stream.size|bytes}

    ----- stderr -----
    "###);
}

#[test]
fn test_render_legacy() {
    let tmpl = file_with_contents(r#"{stream.cached::istrue["C"||"U"]} {stream.size::bytes}"#);

    assert_cmd_snapshot!(
        cli()
            .arg("--legacy")
            .arg("-D")
            .arg("stream.size:=1048576")
            .arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    U 1 MB

    ----- stderr -----
    "###);
}

#[test]
fn test_syntax_error() {
    let tmpl = file_with_contents("{if stream.cached}x");

    assert_cmd_snapshot!(
        cli().arg(tmpl.path()),
        @r###"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    error: syntax error: unclosed if block (at line 1, column 0, offset 0)
    "###);
}

#[test]
fn test_data_must_be_object() {
    let data = file_with_contents("[1, 2]");
    let tmpl = file_with_contents("{a}");

    assert_cmd_snapshot!(
        cli().arg(tmpl.path()).arg(data.path()),
        @r###"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    error: data must be a JSON object, got an array
    "###);
}

#[test]
fn test_invalid_define() {
    let tmpl = file_with_contents("{a}");

    assert_cmd_snapshot!(
        cli().arg("-D").arg("a:=[").arg(tmpl.path()),
        @r###"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    error: invalid raw value '[' (not valid JSON)

    caused by: EOF while parsing a list at line 1 column 1
    "###);
}

#[test]
fn test_limits() {
    let tmpl = file_with_contents("{if a}{if b}x{/if}{/if}");

    assert_cmd_snapshot!(
        cli().arg("--max-depth=1").arg(tmpl.path()),
        @r###"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    error: nesting too deep: if blocks nested deeper than 1 levels (at line 1, column 6, offset 6)
    "###);

    let tmpl = file_with_contents("{name}");
    assert_cmd_snapshot!(
        cli()
            .arg("--max-output=5")
            .arg("-D")
            .arg("name=hello world")
            .arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    hello

    ----- stderr -----
    "###);
}

#[test]
fn test_dump_tokens() {
    let tmpl = file_with_contents("a {b|upper}");

    assert_cmd_snapshot!(
        cli().arg("--dump=tokens").arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----
    TemplateData("a ") @ 1:0-1:2
    Expression("b|upper") @ 1:2-1:11
      Word("b") @ 1:3-1:4
      Pipe @ 1:4-1:5
      Word("upper") @ 1:5-1:10

    ----- stderr -----
    "###);
}

#[test]
fn test_output_file() {
    let tmpl = file_with_contents("{name|title}");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("title.txt");

    assert_cmd_snapshot!(
        cli()
            .arg("-D")
            .arg("name=the dark knight")
            .arg("-o")
            .arg(&out)
            .arg(tmpl.path()),
        @r###"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    "###);
    assert_eq!(fs::read_to_string(&out).unwrap(), "The Dark Knight\n");
}

#[test]
fn test_debug_logging() {
    let tmpl = file_with_contents("{name|notareal}");

    let output = cli()
        .env("STREAMFMT_LOG", "debug")
        .arg("-D")
        .arg("name=x")
        .arg(tmpl.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown modifier"), "{stderr}");
    assert!(stderr.contains("notareal"), "{stderr}");
}
