use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Error};
use clap::ArgMatches;
use serde_json::{Map, Value as JsonValue};
use streamfmt::machinery::{parse_ast, tokenize, ExprTokenizer, Token};
use streamfmt::{Engine, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod cli;
mod output;

use self::output::{Output, STDIN_STDOUT};

const LOG_ENV: &str = "STREAMFMT_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(filter),
        )
        .init();
}

fn read_source(path: &Path, what: &str) -> Result<String, Error> {
    if path == Path::new(STDIN_STDOUT) {
        io::read_to_string(io::stdin()).with_context(|| format!("unable to read {what} from stdin"))
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("unable to read {what} file '{}'", path.display()))
    }
}

fn load_data(
    path: Option<&PathBuf>,
    template_from_stdin: bool,
) -> Result<Map<String, JsonValue>, Error> {
    let path = match path {
        Some(path) => path,
        None => return Ok(Map::new()),
    };
    if template_from_stdin && path == Path::new(STDIN_STDOUT) {
        bail!("cannot read both template and data from stdin");
    }
    let contents = read_source(path, "data")?;
    match serde_json::from_str(&contents).context("data is not valid JSON")? {
        JsonValue::Object(map) => Ok(map),
        other => bail!("data must be a JSON object, got {}", json_kind(&other)),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a bool",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn interpret_define(item: &str) -> Result<(&str, JsonValue), Error> {
    if let Some((key, raw_value)) = item.split_once(":=") {
        let value = serde_json::from_str(raw_value)
            .with_context(|| format!("invalid raw value '{raw_value}' (not valid JSON)"))?;
        Ok((key, value))
    } else if let Some((key, string_value)) = item.split_once('=') {
        Ok((key, JsonValue::from(string_value)))
    } else {
        Ok((item, JsonValue::Bool(true)))
    }
}

/// Sets a value at a dotted path, replacing anything in the way that is
/// not an object.
fn set_path(ctx: &mut Map<String, JsonValue>, key: &str, value: JsonValue) -> Result<(), Error> {
    let mut segments = key.split('.').peekable();
    let mut current = ctx;
    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            bail!("invalid define path '{key}'");
        }
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return Ok(());
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !slot.is_object() {
            *slot = JsonValue::Object(Map::new());
        }
        current = match slot.as_object_mut() {
            Some(map) => map,
            None => bail!("invalid define path '{key}'"),
        };
    }
    bail!("invalid define path '{key}'")
}

fn make_engine(matches: &ArgMatches) -> Engine {
    let mut engine = Engine::new();
    if let Some(depth) = matches.get_one::<usize>("max-depth") {
        engine.set_max_nesting_depth(*depth);
    }
    if let Some(len) = matches.get_one::<usize>("max-output") {
        engine.set_max_output_len(*len);
    }
    engine
}

fn dump_tokens(output: &mut Output, source: &str) -> Result<(), Error> {
    for (token, span) in tokenize(source) {
        writeln!(output, "{token:?}{span:?}")?;
        if let Token::Expression(inner) = token {
            let mut tokenizer = ExprTokenizer::new(inner, span);
            while let Some((expr_token, expr_span)) = tokenizer.next_token()? {
                writeln!(output, "  {expr_token:?}{expr_span:?}")?;
            }
        }
    }
    Ok(())
}

fn execute() -> Result<i32, Error> {
    let matches = cli::make_command().get_matches();

    let template_path = matches
        .get_one::<String>("template")
        .map_or(STDIN_STDOUT, |x| x.as_str());
    let template_from_stdin = template_path == STDIN_STDOUT;
    let mut source = read_source(Path::new(template_path), "template")?;
    let no_newline = matches.get_flag("no-newline");
    let mut output = Output::new(
        matches
            .get_one::<PathBuf>("output")
            .map_or(Path::new(STDIN_STDOUT), |x| x.as_path()),
    )?;

    if matches.get_flag("legacy") || matches.get_flag("convert") {
        tracing::debug!("converting legacy template");
        source = streamfmt::convert(&source);
    }

    let engine = make_engine(&matches);
    if matches.get_flag("convert") {
        output.write_text(&source, !no_newline)?;
    } else if let Some(dump) = matches.get_one::<String>("dump") {
        match dump.as_str() {
            "ast" => writeln!(output, "{:#?}", parse_ast(&source, engine.limits())?)?,
            "tokens" => dump_tokens(&mut output, &source)?,
            _ => unreachable!(),
        }
    } else {
        let mut ctx = load_data(matches.get_one::<PathBuf>("data"), template_from_stdin)?;
        if let Some(items) = matches.get_many::<String>("define") {
            for item in items {
                let (key, value) = interpret_define(item)?;
                set_path(&mut ctx, key, value)?;
            }
        }
        let tmpl = engine.parse(&source)?;
        let rendered = tmpl.render_value(&Value::from_serialize(&ctx));
        output.write_text(&rendered, !no_newline)?;
    }

    output.commit()?;
    Ok(0)
}

fn print_error(err: &Error) {
    eprintln!("error: {err}");
    let mut source_opt = err.source();
    while let Some(source) = source_opt {
        eprintln!();
        eprintln!("caused by: {source}");
        source_opt = source.source();
    }
}

fn main() {
    init_logging();
    match execute() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            print_error(&err);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_path() {
        let mut ctx = Map::new();
        set_path(&mut ctx, "stream.name", JsonValue::from("x")).unwrap();
        set_path(&mut ctx, "stream.size", JsonValue::from(5)).unwrap();
        set_path(&mut ctx, "flag", JsonValue::Bool(true)).unwrap();
        assert_eq!(
            JsonValue::Object(ctx.clone()).to_string(),
            r#"{"flag":true,"stream":{"name":"x","size":5}}"#
        );
        set_path(&mut ctx, "flag.inner", JsonValue::from(1)).unwrap();
        assert_eq!(ctx["flag"]["inner"], JsonValue::from(1));
        assert!(set_path(&mut ctx, "a..b", JsonValue::Null).is_err());
    }

    #[test]
    fn test_interpret_define() {
        assert_eq!(interpret_define("a=1").unwrap(), ("a", JsonValue::from("1")));
        assert_eq!(interpret_define("a:=1").unwrap(), ("a", JsonValue::from(1)));
        assert_eq!(interpret_define("a").unwrap(), ("a", JsonValue::Bool(true)));
        assert!(interpret_define("a:=[").is_err());
    }
}
