use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

pub const MANUAL: &str = "manual";
pub const DEFAULT: &str = "default";
pub const DATE_ORDER: &str = "date-order";

/// Unique identifier of a number series (e.g. `SALES`, `P-INV`).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesCode(String);

impl SeriesCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SeriesCode {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for SeriesCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SeriesCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SeriesCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for SeriesCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SeriesCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

bitflags! {
    /// Behavioural switches of a series.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SeriesFlags: u8 {
        /// Callers may type a number by hand instead of allocating one.
        const MANUAL = 1 << 0;
        /// Numbers may be assigned automatically.
        const DEFAULT = 1 << 1;
        /// Usage dates handed to allocation must never go backwards.
        const DATE_ORDER = 1 << 2;
    }
}

impl SeriesFlags {
    fn names(self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.contains(Self::MANUAL) {
            names.push(MANUAL);
        }
        if self.contains(Self::DEFAULT) {
            names.push(DEFAULT);
        }
        if self.contains(Self::DATE_ORDER) {
            names.push(DATE_ORDER);
        }
        names
    }
}

impl From<&str> for SeriesFlags {
    fn from(s: &str) -> Self {
        match s {
            MANUAL => Self::MANUAL,
            DEFAULT => Self::DEFAULT,
            DATE_ORDER | "date_order" => Self::DATE_ORDER,
            "all" | "*" => Self::all(),
            _ => Self::empty(),
        }
    }
}

impl Serialize for SeriesFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.names().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SeriesFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut flags = Self::empty();
        for name in &names {
            let flag = Self::from(name.as_str());
            if flag.is_empty() {
                return Err(serde::de::Error::custom(format!("Unknown series flag '{name}'")));
            }
            flags |= flag;
        }
        Ok(flags)
    }
}

/// Type tag of a series. Informational only; the engine never branches on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    #[default]
    Normal,
    Sales,
    Purchase,
}

/// A number series definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub code: SeriesCode,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_flags")]
    pub flags: SeriesFlags,
    #[serde(default)]
    pub kind: SeriesKind,
}

const fn default_flags() -> SeriesFlags {
    SeriesFlags::DEFAULT
}

impl Series {
    /// Creates a series that allows automatic assignment only.
    pub fn new(code: impl Into<SeriesCode>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            flags: default_flags(),
            kind: SeriesKind::Normal,
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: SeriesFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: SeriesKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn manual_allowed(&self) -> bool {
        self.flags.contains(SeriesFlags::MANUAL)
    }

    #[must_use]
    pub const fn default_allowed(&self) -> bool {
        self.flags.contains(SeriesFlags::DEFAULT)
    }

    #[must_use]
    pub const fn date_order(&self) -> bool {
        self.flags.contains(SeriesFlags::DATE_ORDER)
    }
}
