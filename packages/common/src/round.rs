#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three sequential competition stages.
///
/// Stored as a plain integer column in entities; this type exists so round
/// numbers coming in over the API are validated exactly once, at the edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Round {
    One,
    Two,
    Three,
}

impl Round {
    /// The round's wire/database number (1-3).
    pub fn number(self) -> i32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Rounds driven by the quiz session engine.
    pub fn is_quiz(self) -> bool {
        matches!(self, Self::One | Self::Two)
    }

    pub const ALL: &'static [Round] = &[Self::One, Self::Two, Self::Three];
}

/// Error when converting an out-of-range round number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid round number {0}: must be 1, 2 or 3")]
pub struct InvalidRound(pub i32);

impl TryFrom<i32> for Round {
    type Error = InvalidRound;

    fn try_from(n: i32) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(InvalidRound(other)),
        }
    }
}

impl From<Round> for i32 {
    fn from(round: Round) -> i32 {
        round.number()
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Language variant of a quiz question set.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in
/// SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "python"))]
    Python,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "c"))]
    C,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::C => "c",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two mutually exclusive Round 3 challenge tracks, chosen once
/// per participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Algorithmic problems solved as source code.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "dsa"))]
    Dsa,
    /// Front-end challenges solved as an HTML/CSS/JS bundle.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "web"))]
    Web,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dsa => "dsa",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid track string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid track '{0}': must be 'dsa' or 'web'")]
pub struct ParseTrackError(String);

impl FromStr for Track {
    type Err = ParseTrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dsa" => Ok(Self::Dsa),
            "web" => Ok(Self::Web),
            other => Err(ParseTrackError(other.to_string())),
        }
    }
}
