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

//! Error kinds and the breadcrumb chain appended at each propagation site.

use std::fmt;

/// A single (file, function) breadcrumb appended where an error was
/// re-raised on its way to the caller.
pub type Breadcrumb = (&'static str, &'static str);

#[derive(Debug, thiserror::Error)]
pub enum Kind {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("length mismatch: {0}")]
    LengthMismatch(String),
    #[error("base mismatch: {0}")]
    BaseMismatch(String),
    #[error("DAG construction error: {0}")]
    DagConstruction(String),
    #[error("context error: {0}")]
    Context(String),
    #[error("allocation error: {0}")]
    Allocation(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("config error: {0}")]
    Config(String),
}

/// The crate's error type: a [`Kind`] plus the chain of (file, function)
/// breadcrumbs left by every `.context(...)` call along the way back to
/// the public boundary.
#[derive(Debug)]
pub struct Error {
    kind: Kind,
    trail: Vec<Breadcrumb>,
}

impl Error {
    pub fn new(kind: Kind) -> Self {
        Error {
            kind,
            trail: Vec::new(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(Kind::Parse(msg.into()))
    }

    pub fn length_mismatch(msg: impl Into<String>) -> Self {
        Self::new(Kind::LengthMismatch(msg.into()))
    }

    pub fn base_mismatch(msg: impl Into<String>) -> Self {
        Self::new(Kind::BaseMismatch(msg.into()))
    }

    pub fn dag_construction(msg: impl Into<String>) -> Self {
        Self::new(Kind::DagConstruction(msg.into()))
    }

    pub fn context(msg: impl Into<String>) -> Self {
        Self::new(Kind::Context(msg.into()))
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::new(Kind::Allocation(msg.into()))
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(Kind::Io(msg.into()))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(Kind::Config(msg.into()))
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Appends a breadcrumb and returns `self`, for use at `?`-propagation
    /// sites: `foo().map_err(|e| e.at("bigint.rs", "parse"))?`.
    pub fn at(mut self, file: &'static str, func: &'static str) -> Self {
        self.trail.push((file, func));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (file, func) in &self.trail {
            write!(f, "\n  at {file} ({func})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<Kind> for Error {
    fn from(kind: Kind) -> Self {
        Error::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait used at rethrow sites to append a breadcrumb without
/// unwrapping the error first, mirroring the source's file/function
/// breadcrumb macro.
pub trait Context<T> {
    fn ctx(self, file: &'static str, func: &'static str) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn ctx(self, file: &'static str, func: &'static str) -> Result<T> {
        self.map_err(|e| e.at(file, func))
    }
}
