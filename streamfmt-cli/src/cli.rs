use std::path::PathBuf;

use clap::{arg, command, value_parser, ArgAction, Command};

pub(super) fn make_command() -> Command {
    command!()
        .args([
            arg!(-D --define <EXPR> "sets a context value by dotted path (key=value or key:=json)")
                .action(ArgAction::Append),
            arg!(--legacy "converts the template from the legacy dialect before rendering"),
            arg!(--convert "prints the converted legacy template instead of rendering")
                .conflicts_with("dump"),
            arg!(--dump <KIND> "dump internals of a template").value_parser(["ast", "tokens"]),
            arg!(--"max-depth" <DEPTH> "maximum nesting of if blocks")
                .value_parser(value_parser!(usize)),
            arg!(--"max-output" <BYTES> "maximum size of the rendered output")
                .value_parser(value_parser!(usize)),
            arg!(--"no-newline" "Do not output a newline"),
            arg!(-o --output <FILENAME> "path to the output file")
                .default_value("-")
                .value_parser(value_parser!(PathBuf)),
            arg!(template: [TEMPLATE] "path to the input template").default_value("-"),
            arg!(data: [DATA] "path to a JSON data file").value_parser(value_parser!(PathBuf)),
        ])
        .about("streamfmt-cli renders stream formatting templates and converts legacy ones.")
        .after_help("Set STREAMFMT_LOG=debug to see why a value rendered empty.")
}

#[test]
fn verify_cli() {
    make_command().debug_assert();
}
