//! # Core Traits (Ports)
//!
//! Any persistence adapter must implement these traits to be used by the
//! services. Each write method is one unit of work: it either commits fully or
//! leaves no trace.

use async_trait::async_trait;

use crate::errors::Result;
use crate::filter::GameFilter;
use crate::models::{Game, GameAggregate, NewGame, NewPurchase, Purchase};

/// Data persistence contract for games and their related collections.
///
/// Every listing method returns aggregates ordered by ascending id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// All games, optionally capped to the first `limit` in persistence order.
    async fn list_games(&self, limit: Option<i64>) -> Result<Vec<GameAggregate>>;
    async fn find_game(&self, id: i32) -> Result<Option<GameAggregate>>;
    /// Applies the filter inside the query.
    async fn filter_games(&self, filter: &GameFilter) -> Result<Vec<GameAggregate>>;
    async fn games_by_ids(&self, ids: &[i32]) -> Result<Vec<GameAggregate>>;
    async fn games_by_developer(&self, developer_id: i32) -> Result<Vec<GameAggregate>>;

    /// Inserts the game, its trailer video and its images atomically.
    async fn create_game(&self, game: NewGame) -> Result<i32>;
    /// Overwrites scalar columns. Returns `false` if no row was updated.
    async fn replace_game(&self, game: &Game) -> Result<bool>;
    async fn game_exists(&self, id: i32) -> Result<bool>;
    /// Removes the game and its owned collections, returning the removed row.
    async fn delete_game(&self, id: i32) -> Result<Option<Game>>;
}

/// Data persistence contract for purchases and their line items.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Raw purchase rows; line items are not loaded.
    async fn list_purchases(&self) -> Result<Vec<Purchase>>;
    /// Raw purchase row; line items are not loaded.
    async fn find_purchase(&self, id: i32) -> Result<Option<Purchase>>;
    /// Purchases of one user with their line items loaded.
    async fn purchases_for_user(&self, user_id: i32) -> Result<Vec<Purchase>>;

    /// Inserts the purchase, then every line item pointing at its new id.
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase>;
    /// Overwrites scalar columns. Returns `false` if no row was updated.
    async fn replace_purchase(&self, purchase: &Purchase) -> Result<bool>;
    async fn purchase_exists(&self, id: i32) -> Result<bool>;
    async fn delete_purchase(&self, id: i32) -> Result<Option<Purchase>>;
}
