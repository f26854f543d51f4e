//! # Domain Models
//!
//! These structs represent the persisted entities of the store.
//! Identifiers are database-assigned `i32` serials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::genre::Genre;

/// A game listing. Related collections live in [`GameAggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i32,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub genre: Vec<Genre>,
    /// The uploading developer; shares the id space of purchasing users.
    pub developer_id: i32,
}

/// Everything needed to insert a game; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub name: String,
    pub price: f64,
    pub genre: Vec<Genre>,
    pub developer_id: i32,
    /// Trailer path written as the game's first Video.
    pub trailer_url: Option<String>,
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Developer {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i32,
    pub game_id: i32,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i32,
    pub game_id: i32,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i32,
    pub game_id: i32,
    pub user_id: i32,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    pub game_id: i32,
    pub user_id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A game with every related collection eagerly loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct GameAggregate {
    pub game: Game,
    pub developer: Option<Developer>,
    pub images: Vec<Image>,
    pub videos: Vec<Video>,
    pub ratings: Vec<Rating>,
    pub comments: Vec<Comment>,
}

impl GameAggregate {
    /// An aggregate with no related rows loaded yet.
    pub fn bare(game: Game) -> Self {
        Self {
            game,
            developer: None,
            images: Vec::new(),
            videos: Vec::new(),
            ratings: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// A checkout by one user. `purchase_date` is always stamped by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    #[serde(default)]
    pub id: i32,
    pub user_id: i32,
    #[serde(default)]
    pub purchase_date: DateTime<Utc>,
    #[serde(default, alias = "purchaseItens")]
    pub purchase_items: Vec<PurchaseItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub purchase_id: i32,
    pub game_id: i32,
}

/// Insert payload for a purchase; line items get their parent id on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub user_id: i32,
    pub purchase_date: DateTime<Utc>,
    /// Game ids, one per line item.
    pub game_ids: Vec<i32>,
}
