//! Scalar leaf conversion between typed values and node text.
//!
//! Every leaf a mapping can place (attribute value, element text, node
//! content) goes through [`Scalar`]. Conversion is strict by default;
//! identifier-like types ([`Ulid`], [`Timestamp`], `scalar_enum!` enums)
//! are lenient and fall back to their default value instead of failing,
//! so hand-edited documents with a bad id or date degrade instead of
//! refusing to load.

use derive_more::{Deref, Display, From, FromStr};
use thiserror::Error as ThisError;

///
/// ScalarError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ScalarError {
    #[error("cannot parse '{text}' as {target}")]
    Parse { target: &'static str, text: String },
}

impl ScalarError {
    #[must_use]
    pub fn parse(target: &'static str, text: &str) -> Self {
        Self::Parse {
            target,
            text: text.to_string(),
        }
    }
}

///
/// Scalar
///
/// A leaf value the mapper can render to text and parse back.
///

pub trait Scalar: Default + Sized + 'static {
    /// Lenient scalars fall back to their default value on a failed parse.
    const LENIENT: bool = false;

    /// Render the value as node text. Absent values render as the empty
    /// string.
    fn render(&self) -> String;

    /// Strict conversion from node text.
    fn parse(text: &str) -> Result<Self, ScalarError>;

    /// Conversion with the leniency rule applied.
    fn parse_or_default(text: &str) -> Result<Self, ScalarError> {
        match Self::parse(text) {
            Err(_) if Self::LENIENT => Ok(Self::default()),
            other => other,
        }
    }
}

// ==========================================================================
// Primitive scalars
// ==========================================================================

macro_rules! impl_scalar_for_number {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                fn render(&self) -> String {
                    self.to_string()
                }

                fn parse(text: &str) -> Result<Self, ScalarError> {
                    text.trim()
                        .parse()
                        .map_err(|_| ScalarError::parse($name, text))
                }
            }
        )+
    };
}

impl_scalar_for_number! {
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    f32 => "f32",
    f64 => "f64",
}

impl Scalar for bool {
    fn render(&self) -> String {
        self.to_string()
    }

    fn parse(text: &str) -> Result<Self, ScalarError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ScalarError::parse("bool", text)),
        }
    }
}

impl Scalar for String {
    fn render(&self) -> String {
        self.clone()
    }

    fn parse(text: &str) -> Result<Self, ScalarError> {
        Ok(text.to_string())
    }
}

impl<T: Scalar> Scalar for Option<T> {
    const LENIENT: bool = T::LENIENT;

    fn render(&self) -> String {
        self.as_ref().map(Scalar::render).unwrap_or_default()
    }

    fn parse(text: &str) -> Result<Self, ScalarError> {
        if text.is_empty() {
            Ok(None)
        } else {
            T::parse(text).map(Some)
        }
    }
}

///
/// Ulid
///
/// Unique identifier scalar. Lenient: an unreadable id parses to nil.
///

#[derive(
    Clone, Copy, Debug, Deref, Display, Eq, From, FromStr, Hash, Ord, PartialEq, PartialOrd,
)]
#[repr(transparent)]
pub struct Ulid(ulid::Ulid);

impl Ulid {
    #[must_use]
    pub const fn nil() -> Self {
        Self(ulid::Ulid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Generate a ULID from the current timestamp and fresh randomness.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new())
    }

    #[must_use]
    pub const fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(ulid::Ulid::from_parts(timestamp_ms, random))
    }
}

impl Default for Ulid {
    fn default() -> Self {
        Self::nil()
    }
}

impl Scalar for Ulid {
    const LENIENT: bool = true;

    fn render(&self) -> String {
        self.to_string()
    }

    fn parse(text: &str) -> Result<Self, ScalarError> {
        text.trim()
            .parse()
            .map_err(|_| ScalarError::parse("Ulid", text))
    }
}

///
/// Timestamp
/// (in seconds)
///
/// Lenient: an unreadable timestamp parses to the epoch.
///

#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, FromStr, Hash, Ord, PartialEq, PartialOrd,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(u64::MIN);

    /// Construct from seconds.
    #[must_use]
    pub const fn from_seconds(secs: u64) -> Self {
        Self(secs)
    }

    /// Current wall-clock timestamp in seconds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[allow(clippy::cast_sign_loss)]
    pub fn parse_rfc3339(s: &str) -> Result<Self, ScalarError> {
        let dt = chrono::DateTime::parse_from_rfc3339(s)
            .map_err(|_| ScalarError::parse("Timestamp", s))?;
        let ts = dt.timestamp();
        if ts < 0 {
            return Err(ScalarError::parse("Timestamp", s));
        }

        Ok(Self(ts as u64))
    }

    /// Integer seconds first, RFC 3339 second.
    pub fn parse_flexible(s: &str) -> Result<Self, ScalarError> {
        if let Ok(n) = s.parse::<u64>() {
            return Ok(Self(n));
        }

        Self::parse_rfc3339(s)
    }
}

impl Scalar for Timestamp {
    const LENIENT: bool = true;

    fn render(&self) -> String {
        self.0.to_string()
    }

    fn parse(text: &str) -> Result<Self, ScalarError> {
        Self::parse_flexible(text.trim())
    }
}

///
/// scalar_enum
///
/// Declare a unit enum that maps through its variant names, leniently:
/// unknown text parses to the `#[default]` variant.
///

#[macro_export]
macro_rules! scalar_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),+
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(stringify!($variant))),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::scalar::ScalarError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    _ => Err($crate::scalar::ScalarError::parse(stringify!($name), s)),
                }
            }
        }

        impl $crate::scalar::Scalar for $name {
            const LENIENT: bool = true;

            fn render(&self) -> String {
                self.to_string()
            }

            fn parse(text: &str) -> Result<Self, $crate::scalar::ScalarError> {
                text.trim().parse()
            }
        }
    };
}

///
/// TESTS
///
