use std::fs;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use streamfmt::value::Value;
use streamfmt::{context, Engine, Limits};

use similar_asserts::assert_eq;

#[test]
fn test_inputs() {
    insta::glob!("inputs/*.txt", |path| {
        let contents = fs::read_to_string(path).unwrap();
        let mut iter = contents.splitn(3, "\n---\n");
        let ctx: Value = serde_json::from_str(iter.next().unwrap()).unwrap();
        let source = iter.next().unwrap();
        let expected = iter.next().unwrap();
        let expected = expected.strip_suffix('\n').unwrap_or(expected);

        let rendered = match streamfmt::parse(source) {
            Ok(tmpl) => streamfmt::render(&tmpl, &ctx),
            Err(err) => format!("!!!SYNTAX ERROR!!!\n{err}"),
        };
        assert_eq!(rendered, expected, "input file {}", path.display());
    });
}

#[test]
fn test_branch_selection() {
    let tmpl = streamfmt::parse("{if a}A{elif b}B{else}C{/if}").unwrap();
    let render = |a: bool, b: bool| tmpl.render(context!(a, b));
    assert_eq!(render(false, true), "B");
    assert_eq!(render(true, true), "A");
    assert_eq!(render(true, false), "A");
    assert_eq!(render(false, false), "C");

    let tmpl = streamfmt::parse("<{if a}A{elif b}B{/if}>").unwrap();
    assert_eq!(tmpl.render(context!(a => false, b => false)), "<>");
}

#[test]
fn test_nested_conditionals() {
    let tmpl = streamfmt::parse(
        "{if stream.cached}{if stream.size > 1000}big{else}small{/if} cached{else}uncached{/if}",
    )
    .unwrap();
    let render = |cached: bool, size: u64| tmpl.render(context!(stream => context!(cached, size)));
    assert_eq!(render(true, 5000), "big cached");
    assert_eq!(render(true, 10), "small cached");
    assert_eq!(render(false, 5000), "uncached");
}

#[test]
fn test_deterministic() {
    let tmpl = streamfmt::parse("{stream.name|title} {stream.tags|sort|join('/')}").unwrap();
    let ctx = context!(stream => context!(name => "the movie", tags => vec!["hdr", "dv", "atmos"]));
    let first = tmpl.render(&ctx);
    assert_eq!(first, "The Movie atmos/dv/hdr");
    assert_eq!(tmpl.render(&ctx), first);
}

#[test]
fn test_render_serializable() {
    #[derive(Serialize)]
    struct Stream {
        name: String,
        size: u64,
        languages: Vec<&'static str>,
        cached: Option<bool>,
    }

    let tmpl = streamfmt::parse(
        "{stream.name} {stream.size|bytes10} {stream.languages|length} {if stream.cached}⚡{else}-{/if}",
    )
    .unwrap();
    let stream = Stream {
        name: "Movie".into(),
        size: 1_500_000_000,
        languages: vec!["English", "Hindi", "Tamil"],
        cached: None,
    };
    assert_eq!(tmpl.render(context!(stream)), "Movie 1.5 GB 3 -");
}

#[test]
fn test_output_limit() {
    let mut engine = Engine::new();
    engine.set_max_output_len(8);
    let tmpl = engine.parse("héllo {name} and more").unwrap();
    assert_eq!(tmpl.limits().max_output_len, 8);
    assert_eq!(tmpl.render(context!(name => "wörld")), "héllo w");

    let tmpl = Engine::with_limits(Limits {
        max_output_len: 3,
        ..Limits::default()
    })
    .parse("{if a}éé{/if}")
    .unwrap();
    assert_eq!(tmpl.render(context!(a => true)), "é");
}

#[test]
fn test_modifier_chains_stay_within_output_limit() {
    let chain = "|replace('a', 'aaaaaaaaaa')".repeat(9);
    let mut engine = Engine::new();
    engine.set_max_output_len(100);
    let tmpl = engine.parse(&format!("{{s{chain}}}")).unwrap();
    assert_eq!(tmpl.render(context!(s => "a")), "a".repeat(100));

    let tmpl = engine
        .parse(&format!("{{if s{chain}|length = 100}}capped{{/if}}"))
        .unwrap();
    assert_eq!(tmpl.render(context!(s => "a")), "capped");

    let tmpl = streamfmt::parse(&format!("{{s{chain}|upper}}")).unwrap();
    assert_eq!(
        tmpl.render(context!(s => "a")).len(),
        Limits::default().max_output_len
    );
}

#[test]
fn test_literals_compare_as_written() {
    let tmpl = streamfmt::parse(
        "{if v = 1.10}eq{else}ne{/if} {if c = 007}eq{else}ne{/if} {if v > 1.09}newer{/if}",
    )
    .unwrap();
    assert_eq!(tmpl.render(context!(v => "1.10", c => "007")), "eq eq newer");
    assert_eq!(tmpl.render(context!(v => 1.1, c => 7)), "eq eq newer");
    assert_eq!(tmpl.render(context!(v => "1.1", c => "7")), "ne ne newer");
}

#[test]
fn test_nesting_limit() {
    let source = "{if a}".repeat(4) + "x" + &"{/if}".repeat(4);
    let mut engine = Engine::new();
    engine.set_max_nesting_depth(4);
    assert!(engine.parse(&source).is_ok());
    engine.set_max_nesting_depth(3);
    assert_eq!(
        engine.parse(&source).unwrap_err().kind(),
        streamfmt::ErrorKind::NestingTooDeep
    );
}

#[test]
fn test_render_str() {
    let engine = Engine::new();
    assert_eq!(
        engine
            .render_str("{a|comma}", context!(a => 1234567))
            .unwrap(),
        "1,234,567"
    );
    assert!(engine.render_str("{if a}", context!()).is_err());
}

#[test]
fn test_shared_across_threads() {
    let tmpl = Arc::new(streamfmt::parse("{n|string}-{if n > 1}many{else}one{/if}").unwrap());
    let handles = (0..4)
        .map(|n| {
            let tmpl = tmpl.clone();
            thread::spawn(move || tmpl.render(context!(n)))
        })
        .collect::<Vec<_>>();
    let results = handles
        .into_iter()
        .map(|x| x.join().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(results, vec!["0-one", "1-one", "2-many", "3-many"]);
}

#[test]
fn test_template_source() {
    let tmpl = streamfmt::parse("{a}").unwrap();
    assert_eq!(tmpl.source(), "{a}");
    assert_eq!(*tmpl.limits(), Limits::default());
}
