//! Call arguments: a primary message followed by key/value pairs.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// A single argument passed to a log call.
///
/// Strings keep track of being strings so that values containing
/// whitespace can be quoted when rendered; everything else is displayed
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Str(String),
    Value(String),
}

impl Arg {
    pub fn display(value: impl fmt::Display) -> Self {
        Arg::Value(value.to_string())
    }

    pub fn debug(value: impl fmt::Debug) -> Self {
        Arg::Value(format!("{:?}", value))
    }

    /// Raw text of the argument, used for messages and keys.
    pub fn as_text(&self) -> &str {
        match self {
            Arg::Str(s) | Arg::Value(s) => s,
        }
    }

    /// Text of the argument when used as a value.
    pub fn render_value(&self) -> String {
        match self {
            Arg::Str(s) => quote_if_spaced(s),
            Arg::Value(s) => s.clone(),
        }
    }
}

pub(crate) fn quote_if_spaced(s: &str) -> String {
    if s.chars().any(char::is_whitespace) {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Str(value.clone())
    }
}

impl From<char> for Arg {
    fn from(value: char) -> Self {
        Arg::Str(value.to_string())
    }
}

macro_rules! display_args {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Value(value.to_string())
                }
            }
        )*
    };
}

display_args!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool);

/// Anything that can be turned into the argument list of a log call.
///
/// Implemented for a bare message, for tuples of up to twelve values
/// (`("message", "key", value, ...)`) and for prebuilt `Arg` lists.
pub trait IntoArgs {
    fn into_args(self) -> Vec<Arg>;
}

impl IntoArgs for &str {
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::from(self)]
    }
}

impl IntoArgs for String {
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::Str(self)]
    }
}

impl IntoArgs for &String {
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::from(self)]
    }
}

impl IntoArgs for Arg {
    fn into_args(self) -> Vec<Arg> {
        vec![self]
    }
}

impl IntoArgs for Vec<Arg> {
    fn into_args(self) -> Vec<Arg> {
        self
    }
}

impl IntoArgs for &[Arg] {
    fn into_args(self) -> Vec<Arg> {
        self.to_vec()
    }
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<Arg> {
        Vec::new()
    }
}

macro_rules! tuple_args {
    ($($name:ident),+) => {
        impl<$($name: Into<Arg>),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<Arg> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_args!(A);
tuple_args!(A, B);
tuple_args!(A, B, C);
tuple_args!(A, B, C, D);
tuple_args!(A, B, C, D, E);
tuple_args!(A, B, C, D, E, F);
tuple_args!(A, B, C, D, E, F, G);
tuple_args!(A, B, C, D, E, F, G, H);
tuple_args!(A, B, C, D, E, F, G, H, I);
tuple_args!(A, B, C, D, E, F, G, H, I, J);
tuple_args!(A, B, C, D, E, F, G, H, I, J, K);
tuple_args!(A, B, C, D, E, F, G, H, I, J, K, L);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Ordered key/value pairs attached to a record.
///
/// Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extras(Vec<KeyValue>);

impl Extras {
    pub fn new() -> Self {
        Extras(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(KeyValue { key: key.into(), value: value.into() });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|kv| kv.key == key).map(|kv| kv.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|kv| kv.key == key)
    }

    /// Replace the value of `key` in place, or append it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|kv| kv.key == key) {
            Some(kv) => kv.value = value,
            None => self.0.push(KeyValue { key: key.to_string(), value }),
        }
    }

    /// Remove every pair named `key`, returning the first value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.0.iter().position(|kv| kv.key == key).map(|i| self.0[i].value.clone());
        self.0.retain(|kv| kv.key != key);
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Pairs with `first` (if present) moved to the front.
    pub fn ordered_with_first<'a>(&'a self, first: &'a str) -> impl Iterator<Item = &'a KeyValue> {
        self.0
            .iter()
            .filter(move |kv| kv.key == first)
            .chain(self.0.iter().filter(move |kv| kv.key != first))
    }
}

impl Serialize for Extras {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for kv in &self.0 {
            map.serialize_entry(&kv.key, &kv.value)?;
        }
        map.end()
    }
}

/// Split call arguments into the message and its key/value extras.
///
/// The first argument is the message; the rest are taken two at a time.
/// A trailing key without a value is dropped.
pub fn parse_log_args(args: Vec<Arg>) -> (String, Extras) {
    let mut iter = args.into_iter();
    let message = match iter.next() {
        Some(arg) => arg.as_text().to_string(),
        None => return (String::new(), Extras::new()),
    };

    let mut extras = Extras::new();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        extras.push(key.as_text(), value.render_value());
    }
    (message, extras)
}
