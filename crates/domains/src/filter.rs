//! # Game Filter
//!
//! Normalised search criteria. Every criterion is independent; `None` means
//! "do not narrow". Adapters translate the same semantics into their query
//! language, and [`GameFilter::matches`] is the reference predicate.

use crate::genre::Genre;
use crate::models::Game;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFilter {
    /// Lowercased substring of the game name, matched as given (whitespace
    /// included). Never empty when `Some`.
    pub name: Option<String>,
    /// Inclusive upper bound on price. Always `> 0` when `Some`.
    pub max_price: Option<f64>,
    pub genre: Option<Genre>,
}

impl GameFilter {
    /// Builds a filter, dropping criteria that would be no-ops
    /// (empty name, non-positive price).
    pub fn new(name: Option<&str>, max_price: Option<f64>, genre: Option<Genre>) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()).map(str::to_lowercase),
            max_price: max_price.filter(|p| *p > 0.0),
            genre,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.max_price.is_none() && self.genre.is_none()
    }

    pub fn matches(&self, game: &Game) -> bool {
        self.matches_name(game) && self.matches_price(game) && self.matches_genre(game)
    }

    fn matches_name(&self, game: &Game) -> bool {
        match &self.name {
            Some(needle) => game.name.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    fn matches_price(&self, game: &Game) -> bool {
        self.max_price.is_none_or(|max| game.price <= max)
    }

    fn matches_genre(&self, game: &Game) -> bool {
        self.genre.is_none_or(|genre| game.genre.contains(&genre))
    }
}
