//! Wire-level shapes exchanged with HTTP clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domains::Genre;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDto {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub genre: Vec<Genre>,
    pub developer: Option<DeveloperDto>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
    pub comments: Vec<CommentDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperDto {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub user_id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Genres as sent by clients: one string (optionally comma separated) or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenreField {
    One(String),
    Many(Vec<String>),
}

impl Default for GenreField {
    fn default() -> Self {
        GenreField::Many(Vec::new())
    }
}

impl GenreField {
    /// Non-blank genre names in the order given.
    pub fn names(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            GenreField::One(s) => s.split(',').collect(),
            GenreField::Many(v) => v.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUploadDto {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub genre: GenreField,
    pub developer_id: i32,
    #[serde(default)]
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Filter criteria; empty strings and a zero price mean "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameFilterDto {
    pub name: String,
    pub price: f64,
    pub genre: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGameDto {
    pub user_id: i32,
}
