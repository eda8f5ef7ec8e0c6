#![no_main]
use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
#[serde(untagged)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, Value)| {
    let (source, value) = data;
    let tmpl = match streamfmt::parse(source) {
        Ok(tmpl) => tmpl,
        Err(_) => return,
    };
    let first = tmpl.render(&value);
    assert!(first.len() <= tmpl.limits().max_output_len);
    assert_eq!(first, tmpl.render(&value));
});
