//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Nested key/value configuration store consulted by the allocator, the
//! big-integer constructor, and the log sink. Backed by a parsed TOML
//! document; absent or wrong-typed entries silently fall back to the
//! caller-supplied default, matching the external `config.get_or_else`
//! contract the core was written against.

use crate::error::{Context as ErrContext, Error, Result};
use std::path::Path;

pub struct Config {
    root: toml::Value,
}

/// Values retrievable from the store via [`Config::get_or_else`].
pub trait FromConfigValue: Sized {
    fn from_value(value: &toml::Value) -> Option<Self>;
}

impl FromConfigValue for i64 {
    fn from_value(value: &toml::Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromConfigValue for u32 {
    fn from_value(value: &toml::Value) -> Option<Self> {
        value.as_integer().and_then(|i| u32::try_from(i).ok())
    }
}

impl FromConfigValue for usize {
    fn from_value(value: &toml::Value) -> Option<Self> {
        value.as_integer().and_then(|i| usize::try_from(i).ok())
    }
}

impl FromConfigValue for bool {
    fn from_value(value: &toml::Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromConfigValue for String {
    fn from_value(value: &toml::Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl Config {
    /// An empty store: every lookup falls through to its default.
    pub fn empty() -> Self {
        Config {
            root: toml::Value::Table(Default::default()),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let root = text
            .parse::<toml::Value>()
            .map_err(|e| Error::config(format!("invalid TOML: {e}")))?;
        Ok(Config { root })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::io(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&text).ctx("config.rs", "from_toml_file")
    }

    /// Looks up a `/`-separated path (`"core/BasicIntegerType/limits/min_log_length"`)
    /// and returns the default when the path is absent or the stored value
    /// does not convert to `T`.
    pub fn get_or_else<T: FromConfigValue>(&self, path: &str, default: T) -> T {
        let mut cur = &self.root;
        for segment in path.split('/') {
            match cur.get(segment) {
                Some(v) => cur = v,
                None => return default,
            }
        }
        T::from_value(cur).unwrap_or(default)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_falls_back_to_default() {
        let cfg = Config::empty();
        assert_eq!(cfg.get_or_else::<i64>("core/whatever", 7), 7);
    }

    #[test]
    fn present_path_overrides_default() {
        let cfg = Config::from_toml_str(
            "[core.BasicIntegerType.limits]\nmin_log_length = 4\nmax_log_length = 20\n",
        )
        .unwrap();
        assert_eq!(
            cfg.get_or_else::<i64>("core/BasicIntegerType/limits/min_log_length", 0),
            4
        );
        assert_eq!(
            cfg.get_or_else::<i64>("core/BasicIntegerType/limits/max_log_length", 0),
            20
        );
    }

    #[test]
    fn wrong_typed_entry_falls_back() {
        let cfg = Config::from_toml_str("[core]\nflag = \"not-a-bool\"\n").unwrap();
        assert_eq!(cfg.get_or_else::<bool>("core/flag", true), true);
    }
}
