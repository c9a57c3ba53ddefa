//! Product category enumeration.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known [`ProductCategory`] name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid category: {0}")]
pub struct ParseCategoryError(pub String);

/// Category of a catalog product.
///
/// Serialized (JSON and database) as the variant name, e.g. `"KnittingThreads"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductCategory {
    KnittingThreads,
    Zippers,
    SewingThreads,
    Ribbons,
    Buttons,
    Laces,
}

impl ProductCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::KnittingThreads,
        Self::Zippers,
        Self::SewingThreads,
        Self::Ribbons,
        Self::Buttons,
        Self::Laces,
    ];

    /// The stored/serialized name of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KnittingThreads => "KnittingThreads",
            Self::Zippers => "Zippers",
            Self::SewingThreads => "SewingThreads",
            Self::Ribbons => "Ribbons",
            Self::Buttons => "Buttons",
            Self::Laces => "Laces",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

// Stored as TEXT, so delegate to `str`/`String` rather than a Postgres enum type.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ProductCategory {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ProductCategory {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ProductCategory {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}
