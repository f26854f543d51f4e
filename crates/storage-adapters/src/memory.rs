//! # In-memory store
//!
//! A process-local implementation of both repository ports. All tables sit
//! behind one `RwLock`, so each write runs under a single guard and is atomic.
//! Foreign keys are checked the way the Postgres schema declares them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use domains::{
    Comment, Developer, DomainError, Game, GameAggregate, GameFilter, GameRepository, Image,
    NewGame, NewPurchase, Purchase, PurchaseItem, PurchaseRepository, Rating, Result, Video,
};

#[derive(Debug, Default)]
struct Tables {
    developers: BTreeMap<i32, Developer>,
    games: BTreeMap<i32, Game>,
    images: Vec<Image>,
    videos: Vec<Video>,
    ratings: Vec<Rating>,
    comments: Vec<Comment>,
    purchases: BTreeMap<i32, Purchase>,
    purchase_items: Vec<PurchaseItem>,
    last_id: i32,
}

impl Tables {
    /// One sequence for every table; ids stay unique and increasing.
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn aggregate(&self, game: &Game) -> GameAggregate {
        let id = game.id;
        GameAggregate {
            game: game.clone(),
            developer: self.developers.get(&game.developer_id).cloned(),
            images: self.images.iter().filter(|i| i.game_id == id).cloned().collect(),
            videos: self.videos.iter().filter(|v| v.game_id == id).cloned().collect(),
            ratings: self.ratings.iter().filter(|r| r.game_id == id).cloned().collect(),
            comments: self.comments.iter().filter(|c| c.game_id == id).cloned().collect(),
        }
    }

    fn aggregates<'a>(&self, games: impl Iterator<Item = &'a Game>) -> Vec<GameAggregate> {
        games.map(|g| self.aggregate(g)).collect()
    }

    fn require_game(&self, id: i32) -> Result<()> {
        if self.games.contains_key(&id) {
            Ok(())
        } else {
            Err(DomainError::Constraint(format!("game {id} does not exist")))
        }
    }

    /// The stored row without line items, as a raw purchase read returns it.
    fn raw_purchase(purchase: &Purchase) -> Purchase {
        Purchase {
            purchase_items: Vec::new(),
            ..purchase.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_developer(&self, name: &str, email: Option<&str>) -> i32 {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        t.developers.insert(
            id,
            Developer {
                id,
                name: name.to_string(),
                email: email.map(str::to_string),
            },
        );
        id
    }

    pub async fn insert_rating(&self, game_id: i32, user_id: i32, score: i32) -> Result<i32> {
        let mut t = self.tables.write().await;
        t.require_game(game_id)?;
        if !(0..=5).contains(&score) {
            return Err(DomainError::Constraint(format!("rating score {score} out of range")));
        }
        let id = t.next_id();
        t.ratings.push(Rating { id, game_id, user_id, score });
        Ok(id)
    }

    pub async fn insert_comment(
        &self,
        game_id: i32,
        user_id: i32,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i32> {
        let mut t = self.tables.write().await;
        t.require_game(game_id)?;
        let id = t.next_id();
        t.comments.push(Comment {
            id,
            game_id,
            user_id,
            text: text.to_string(),
            created_at,
        });
        Ok(id)
    }

    /// Every stored line item of a purchase.
    pub async fn purchase_items(&self, purchase_id: i32) -> Vec<PurchaseItem> {
        let t = self.tables.read().await;
        t.purchase_items
            .iter()
            .filter(|i| i.purchase_id == purchase_id)
            .cloned()
            .collect()
    }

    pub async fn videos(&self, game_id: i32) -> Vec<Video> {
        let t = self.tables.read().await;
        t.videos.iter().filter(|v| v.game_id == game_id).cloned().collect()
    }
}

#[async_trait]
impl GameRepository for MemoryStore {
    async fn list_games(&self, limit: Option<i64>) -> Result<Vec<GameAggregate>> {
        let t = self.tables.read().await;
        let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));
        Ok(t.aggregates(t.games.values().take(take)))
    }

    async fn find_game(&self, id: i32) -> Result<Option<GameAggregate>> {
        let t = self.tables.read().await;
        Ok(t.games.get(&id).map(|g| t.aggregate(g)))
    }

    async fn filter_games(&self, filter: &GameFilter) -> Result<Vec<GameAggregate>> {
        let t = self.tables.read().await;
        Ok(t.aggregates(t.games.values().filter(|g| filter.matches(g))))
    }

    async fn games_by_ids(&self, ids: &[i32]) -> Result<Vec<GameAggregate>> {
        let t = self.tables.read().await;
        Ok(t.aggregates(t.games.values().filter(|g| ids.contains(&g.id))))
    }

    async fn games_by_developer(&self, developer_id: i32) -> Result<Vec<GameAggregate>> {
        let t = self.tables.read().await;
        Ok(t.aggregates(t.games.values().filter(|g| g.developer_id == developer_id)))
    }

    async fn create_game(&self, game: NewGame) -> Result<i32> {
        let mut t = self.tables.write().await;
        if !t.developers.contains_key(&game.developer_id) {
            return Err(DomainError::Constraint(format!(
                "developer {} does not exist",
                game.developer_id
            )));
        }

        let id = t.next_id();
        t.games.insert(
            id,
            Game {
                id,
                name: game.name,
                price: game.price,
                genre: game.genre,
                developer_id: game.developer_id,
            },
        );
        if let Some(path) = game.trailer_url {
            let video_id = t.next_id();
            t.videos.push(Video { id: video_id, game_id: id, path });
        }
        for path in game.image_paths {
            let image_id = t.next_id();
            t.images.push(Image { id: image_id, game_id: id, path });
        }
        Ok(id)
    }

    async fn replace_game(&self, game: &Game) -> Result<bool> {
        let mut t = self.tables.write().await;
        if !t.developers.contains_key(&game.developer_id) {
            return Err(DomainError::Constraint(format!(
                "developer {} does not exist",
                game.developer_id
            )));
        }
        match t.games.get_mut(&game.id) {
            Some(row) => {
                *row = game.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn game_exists(&self, id: i32) -> Result<bool> {
        Ok(self.tables.read().await.games.contains_key(&id))
    }

    async fn delete_game(&self, id: i32) -> Result<Option<Game>> {
        let mut t = self.tables.write().await;
        if !t.games.contains_key(&id) {
            return Ok(None);
        }
        if t.purchase_items.iter().any(|i| i.game_id == id) {
            return Err(DomainError::Constraint(format!(
                "game {id} is referenced by purchases"
            )));
        }
        t.images.retain(|i| i.game_id != id);
        t.videos.retain(|v| v.game_id != id);
        t.ratings.retain(|r| r.game_id != id);
        t.comments.retain(|c| c.game_id != id);
        Ok(t.games.remove(&id))
    }
}

#[async_trait]
impl PurchaseRepository for MemoryStore {
    async fn list_purchases(&self) -> Result<Vec<Purchase>> {
        let t = self.tables.read().await;
        Ok(t.purchases.values().map(Tables::raw_purchase).collect())
    }

    async fn find_purchase(&self, id: i32) -> Result<Option<Purchase>> {
        let t = self.tables.read().await;
        Ok(t.purchases.get(&id).map(Tables::raw_purchase))
    }

    async fn purchases_for_user(&self, user_id: i32) -> Result<Vec<Purchase>> {
        let t = self.tables.read().await;
        Ok(t.purchases
            .values()
            .filter(|p| p.user_id == user_id)
            .map(|p| Purchase {
                purchase_items: t
                    .purchase_items
                    .iter()
                    .filter(|i| i.purchase_id == p.id)
                    .cloned()
                    .collect(),
                ..p.clone()
            })
            .collect())
    }

    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase> {
        let mut t = self.tables.write().await;
        for game_id in &purchase.game_ids {
            t.require_game(*game_id)?;
        }

        let id = t.next_id();
        let row = Purchase {
            id,
            user_id: purchase.user_id,
            purchase_date: purchase.purchase_date,
            purchase_items: Vec::new(),
        };
        t.purchases.insert(id, row.clone());

        let mut items = Vec::with_capacity(purchase.game_ids.len());
        for game_id in purchase.game_ids {
            let item = PurchaseItem {
                id: t.next_id(),
                purchase_id: id,
                game_id,
            };
            t.purchase_items.push(item.clone());
            items.push(item);
        }
        Ok(Purchase {
            purchase_items: items,
            ..row
        })
    }

    async fn replace_purchase(&self, purchase: &Purchase) -> Result<bool> {
        let mut t = self.tables.write().await;
        match t.purchases.get_mut(&purchase.id) {
            Some(row) => {
                row.user_id = purchase.user_id;
                row.purchase_date = purchase.purchase_date;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purchase_exists(&self, id: i32) -> Result<bool> {
        Ok(self.tables.read().await.purchases.contains_key(&id))
    }

    async fn delete_purchase(&self, id: i32) -> Result<Option<Purchase>> {
        let mut t = self.tables.write().await;
        let removed = t.purchases.remove(&id);
        if removed.is_some() {
            t.purchase_items.retain(|i| i.purchase_id != id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::Genre;

    fn new_game(developer_id: i32, name: &str) -> NewGame {
        NewGame {
            name: name.into(),
            price: 12.0,
            genre: vec![Genre::Puzzle],
            developer_id,
            trailer_url: Some(format!("{name}.mp4")),
            image_paths: vec![format!("{name}.png")],
        }
    }

    #[tokio::test]
    async fn create_game_writes_video_and_images() {
        let store = MemoryStore::new();
        let dev = store.insert_developer("Zachtronics", None).await;
        let id = store.create_game(new_game(dev, "Opus")).await.unwrap();

        let aggregate = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(aggregate.developer.unwrap().id, dev);
        assert_eq!(aggregate.videos[0].path, "Opus.mp4");
        assert_eq!(aggregate.images[0].path, "Opus.png");
    }

    #[tokio::test]
    async fn create_game_with_unknown_developer_writes_nothing() {
        let store = MemoryStore::new();
        let err = store.create_game(new_game(99, "Ghost")).await.unwrap_err();
        assert!(matches!(err, DomainError::Constraint(_)));
        assert!(store.list_games(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_respects_limit_and_insertion_order() {
        let store = MemoryStore::new();
        let dev = store.insert_developer("d", None).await;
        let mut ids = Vec::new();
        for n in 0..7 {
            ids.push(store.create_game(new_game(dev, &format!("g{n}"))).await.unwrap());
        }
        let first: Vec<i32> = store
            .list_games(Some(5))
            .await
            .unwrap()
            .iter()
            .map(|a| a.game.id)
            .collect();
        assert_eq!(first, ids[..5]);
    }

    #[tokio::test]
    async fn purchase_items_point_at_new_purchase() {
        let store = MemoryStore::new();
        let dev = store.insert_developer("d", None).await;
        let a = store.create_game(new_game(dev, "a")).await.unwrap();
        let b = store.create_game(new_game(dev, "b")).await.unwrap();

        let created = store
            .create_purchase(NewPurchase {
                user_id: 5,
                purchase_date: Utc::now(),
                game_ids: vec![a, b, a],
            })
            .await
            .unwrap();

        let items = store.purchase_items(created.id).await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.purchase_id == created.id));
        assert!(store.find_purchase(created.id).await.unwrap().unwrap().purchase_items.is_empty());
    }

    #[tokio::test]
    async fn purchased_game_cannot_be_deleted() {
        let store = MemoryStore::new();
        let dev = store.insert_developer("d", None).await;
        let a = store.create_game(new_game(dev, "a")).await.unwrap();
        let purchase = store
            .create_purchase(NewPurchase {
                user_id: 1,
                purchase_date: Utc::now(),
                game_ids: vec![a],
            })
            .await
            .unwrap();

        assert!(matches!(store.delete_game(a).await, Err(DomainError::Constraint(_))));
        store.delete_purchase(purchase.id).await.unwrap();
        assert!(store.purchase_items(purchase.id).await.is_empty());
        assert_eq!(store.delete_game(a).await.unwrap().unwrap().id, a);
        assert!(store.videos(a).await.is_empty());
    }
}
