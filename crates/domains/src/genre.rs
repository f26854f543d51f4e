//! # Genre
//!
//! The closed set of genres a game can be listed under. Stored as lowercase
//! keys, shown to clients under their canonical display names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Serialized under its display name; deserialized through [`FromStr`], so
/// every spelling the parser accepts is accepted in JSON bodies too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Genre {
    Action,
    Adventure,
    #[serde(rename = "RPG")]
    Rpg,
    Strategy,
    Simulation,
    Sports,
    Racing,
    Puzzle,
    Shooter,
    Horror,
    Platformer,
    Fighting,
    Casual,
    Indie,
}

impl Genre {
    pub const ALL: [Genre; 14] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Rpg,
        Genre::Strategy,
        Genre::Simulation,
        Genre::Sports,
        Genre::Racing,
        Genre::Puzzle,
        Genre::Shooter,
        Genre::Horror,
        Genre::Platformer,
        Genre::Fighting,
        Genre::Casual,
        Genre::Indie,
    ];

    /// Lowercase key used by the persistence layer.
    pub fn key(self) -> &'static str {
        match self {
            Genre::Action => "action",
            Genre::Adventure => "adventure",
            Genre::Rpg => "rpg",
            Genre::Strategy => "strategy",
            Genre::Simulation => "simulation",
            Genre::Sports => "sports",
            Genre::Racing => "racing",
            Genre::Puzzle => "puzzle",
            Genre::Shooter => "shooter",
            Genre::Horror => "horror",
            Genre::Platformer => "platformer",
            Genre::Fighting => "fighting",
            Genre::Casual => "casual",
            Genre::Indie => "indie",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Genre::Rpg => "RPG",
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Strategy => "Strategy",
            Genre::Simulation => "Simulation",
            Genre::Sports => "Sports",
            Genre::Racing => "Racing",
            Genre::Puzzle => "Puzzle",
            Genre::Shooter => "Shooter",
            Genre::Horror => "Horror",
            Genre::Platformer => "Platformer",
            Genre::Fighting => "Fighting",
            Genre::Casual => "Casual",
            Genre::Indie => "Indie",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Genre {
    type Err = DomainError;

    /// Case-insensitive; unknown input is an error, never a default genre.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        let alias = match needle.as_str() {
            "role-playing" | "role playing" | "roleplaying" => Some(Genre::Rpg),
            "sport" => Some(Genre::Sports),
            "sim" => Some(Genre::Simulation),
            "platform" => Some(Genre::Platformer),
            _ => None,
        };
        alias
            .or_else(|| Genre::ALL.into_iter().find(|g| g.key() == needle))
            .ok_or_else(|| DomainError::InvalidGenre(s.to_string()))
    }
}

impl TryFrom<String> for Genre {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
