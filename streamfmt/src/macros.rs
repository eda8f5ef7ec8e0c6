// `ok!` and `some!` are less bloaty alternatives to the standard library's try operator (`?`).
// Since we do not need type conversions in this crate we can fall back to much easier match
// patterns that compile faster and produce less bloaty code.

macro_rules! ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => return Err(err),
        }
    };
}

macro_rules! some {
    ($expr:expr) => {
        match $expr {
            Some(val) => val,
            None => return None,
        }
    };
}

// Render-time degradations are silent.  With the `tracing` feature they are at least
// visible as debug events, otherwise these compile to nothing.

#[cfg(feature = "tracing")]
macro_rules! debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// Hidden utility module for the [`context!`](crate::context!) macro.
#[doc(hidden)]
pub mod __context {
    use std::collections::BTreeMap;

    use crate::value::Value;

    #[inline(always)]
    pub fn make() -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    #[inline(always)]
    pub fn add(ctx: &mut BTreeMap<String, Value>, key: &'static str, value: Value) {
        ctx.insert(key.into(), value);
    }

    #[inline(always)]
    pub fn build(ctx: BTreeMap<String, Value>) -> Value {
        Value::from(ctx)
    }
}

/// Creates a render context from keys and values.
///
/// ```rust
/// # use streamfmt::context;
/// let ctx = context! {
///     stream => context! {
///         name => "Movie.2160p.HDR",
///         size => 1610612736u64,
///     },
///     service => context!(shortName => "RD"),
/// };
/// ```
///
/// If the variable name matches the key name the value can be omitted:
///
/// ```rust
/// # use streamfmt::context;
/// let addon = "streamfmt";
/// let ctx = context! { addon };
/// ```
///
/// Values are converted with [`Value::from_serialize`](crate::value::Value::from_serialize).
/// The return value is a map [`Value`](crate::value::Value).
#[macro_export]
macro_rules! context {
    () => {
        $crate::__context::build($crate::__context::make())
    };
    (
        $($key:ident $(=> $value:expr)?),* $(,)?
    ) => {{
        let mut ctx = $crate::__context::make();
        $(
            $crate::__context_pair!(ctx, $key $(=> $value)?);
        )*
        $crate::__context::build(ctx)
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! __context_pair {
    ($ctx:ident, $key:ident) => {{
        $crate::__context_pair!($ctx, $key => $key);
    }};
    ($ctx:ident, $key:ident => $value:expr) => {
        $crate::__context::add(
            &mut $ctx,
            stringify!($key),
            $crate::value::Value::from_serialize(&$value),
        );
    };
}
