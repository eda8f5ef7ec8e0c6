#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    let converted = streamfmt::convert(input);
    if let Err(err) = streamfmt::parse(&converted) {
        panic!("{input:?} converted to {converted:?} which does not parse: {err}");
    }
});
