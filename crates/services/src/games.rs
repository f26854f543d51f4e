//! # GameService
//!
//! Listing, filtering, ownership queries and CRUD over games.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use domains::{DomainError, Game, GameRepository, PurchaseRepository, Result};

use crate::dto::{GameDto, GameFilterDto, GameUploadDto};
use crate::mapper;

/// Number of games featured on the store front.
pub const SPOTLIGHT_COUNT: i64 = 5;

pub struct GameService {
    games: Arc<dyn GameRepository>,
    purchases: Arc<dyn PurchaseRepository>,
}

impl GameService {
    pub fn new(games: Arc<dyn GameRepository>, purchases: Arc<dyn PurchaseRepository>) -> Self {
        Self { games, purchases }
    }

    #[instrument(skip(self))]
    pub async fn list_games(&self) -> Result<Vec<GameDto>> {
        let games = self.games.list_games(None).await?;
        debug!(count = games.len(), "listed games");
        Ok(mapper::games_to_dtos(games))
    }

    #[instrument(skip(self))]
    pub async fn spotlights(&self) -> Result<Vec<GameDto>> {
        let games = self.games.list_games(Some(SPOTLIGHT_COUNT)).await?;
        Ok(mapper::games_to_dtos(games))
    }

    /// Returns a zero-or-one element list; a missing game is not an error.
    #[instrument(skip(self))]
    pub async fn get_game(&self, id: i32) -> Result<Vec<GameDto>> {
        if id < 0 {
            return Err(DomainError::invalid(format!("game id must not be negative, got {id}")));
        }
        let game = self.games.find_game(id).await?;
        Ok(game.into_iter().map(mapper::game_to_dto).collect())
    }

    #[instrument(skip(self))]
    pub async fn filter_games(&self, criteria: &GameFilterDto) -> Result<Vec<GameDto>> {
        let filter = mapper::filter_from_dto(criteria)?;
        let games = if filter.is_empty() {
            self.games.list_games(None).await?
        } else {
            self.games.filter_games(&filter).await?
        };
        debug!(count = games.len(), "filtered games");
        Ok(mapper::games_to_dtos(games))
    }

    /// Inserts the game together with its trailer video; returns the new id.
    #[instrument(skip(self, upload), fields(name = %upload.name))]
    pub async fn create_game(&self, upload: GameUploadDto) -> Result<i32> {
        let game = mapper::upload_to_new_game(upload)?;
        let id = self.games.create_game(game).await?;
        info!(game_id = id, "game created");
        Ok(id)
    }

    #[instrument(skip(self, game))]
    pub async fn replace_game(&self, id: i32, game: Game) -> Result<()> {
        if id != game.id {
            return Err(DomainError::invalid(format!(
                "route id {id} does not match body id {}",
                game.id
            )));
        }
        let game = mapper::replacement_game(game)?;
        if self.games.replace_game(&game).await? {
            info!(game_id = id, "game replaced");
            return Ok(());
        }
        if self.games.game_exists(id).await? {
            warn!(game_id = id, "game replace touched no row although it exists");
            Err(DomainError::ConcurrencyConflict { entity: "Game", id })
        } else {
            Err(DomainError::not_found("Game", id))
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_game(&self, id: i32) -> Result<Game> {
        let game = self
            .games
            .delete_game(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Game", id))?;
        info!(game_id = id, "game deleted");
        Ok(game)
    }

    /// Games bought by `user_id`, each listed once however often it was bought.
    #[instrument(skip(self))]
    pub async fn owned_games(&self, user_id: i32) -> Result<Vec<GameDto>> {
        let purchases = self.purchases.purchases_for_user(user_id).await?;
        let owned: BTreeSet<i32> = purchases
            .iter()
            .flat_map(|p| p.purchase_items.iter().map(|item| item.game_id))
            .collect();
        if owned.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = owned.into_iter().collect();
        let games = self.games.games_by_ids(&ids).await?;
        Ok(mapper::games_to_dtos(games))
    }

    #[instrument(skip(self))]
    pub async fn uploaded_games(&self, user_id: i32) -> Result<Vec<GameDto>> {
        let games = self.games.games_by_developer(user_id).await?;
        Ok(mapper::games_to_dtos(games))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        GameAggregate, Genre, MockGameRepository, MockPurchaseRepository, Purchase, PurchaseItem,
    };
    use mockall::predicate::eq;

    fn game(id: i32) -> Game {
        Game {
            id,
            name: format!("Game {id}"),
            price: 10.0,
            genre: vec![Genre::Action],
            developer_id: 1,
        }
    }

    fn service(games: MockGameRepository, purchases: MockPurchaseRepository) -> GameService {
        GameService::new(Arc::new(games), Arc::new(purchases))
    }

    fn purchase(id: i32, game_ids: &[i32]) -> Purchase {
        Purchase {
            id,
            user_id: 42,
            purchase_date: Utc::now(),
            purchase_items: game_ids
                .iter()
                .map(|&game_id| PurchaseItem { id: 0, purchase_id: id, game_id })
                .collect(),
        }
    }

    #[tokio::test]
    async fn negative_id_is_rejected_without_touching_storage() {
        let svc = service(MockGameRepository::new(), MockPurchaseRepository::new());
        let err = svc.get_game(-1).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn missing_game_yields_empty_list() {
        let mut games = MockGameRepository::new();
        games.expect_find_game().with(eq(7)).returning(|_| Ok(None));
        let svc = service(games, MockPurchaseRepository::new());
        assert!(svc.get_game(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn spotlights_request_five_games() {
        let mut games = MockGameRepository::new();
        games
            .expect_list_games()
            .with(eq(Some(SPOTLIGHT_COUNT)))
            .returning(|_| Ok((1..=5).map(|i| GameAggregate::bare(game(i))).collect()));
        let svc = service(games, MockPurchaseRepository::new());
        assert_eq!(svc.spotlights().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn empty_filter_lists_everything() {
        let mut games = MockGameRepository::new();
        games
            .expect_list_games()
            .with(eq(None))
            .returning(|_| Ok(vec![GameAggregate::bare(game(1))]));
        games.expect_filter_games().never();
        let svc = service(games, MockPurchaseRepository::new());
        let found = svc.filter_games(&GameFilterDto::default()).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn filter_is_pushed_to_the_repository() {
        let mut games = MockGameRepository::new();
        games
            .expect_filter_games()
            .withf(|f| f.name.as_deref() == Some("doom") && f.genre == Some(Genre::Shooter))
            .returning(|_| Ok(vec![]));
        let svc = service(games, MockPurchaseRepository::new());
        let criteria = GameFilterDto {
            name: "DOOM".into(),
            price: 0.0,
            genre: "shooter".into(),
        };
        assert!(svc.filter_games(&criteria).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_requires_matching_ids() {
        let svc = service(MockGameRepository::new(), MockPurchaseRepository::new());
        let err = svc.replace_game(1, game(2)).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn replace_rejects_invalid_listing_without_touching_storage() {
        let mut games = MockGameRepository::new();
        games.expect_replace_game().never();
        let svc = service(games, MockPurchaseRepository::new());

        let mut body = game(4);
        body.name = "  ".into();
        body.price = -50.0;
        let err = svc.replace_game(4, body).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn replace_of_vanished_game_is_not_found() {
        let mut games = MockGameRepository::new();
        games.expect_replace_game().returning(|_| Ok(false));
        games.expect_game_exists().with(eq(3)).returning(|_| Ok(false));
        let svc = service(games, MockPurchaseRepository::new());
        assert_eq!(
            svc.replace_game(3, game(3)).await.unwrap_err(),
            DomainError::not_found("Game", 3)
        );
    }

    #[tokio::test]
    async fn replace_conflict_on_existing_game_is_fatal() {
        let mut games = MockGameRepository::new();
        games.expect_replace_game().returning(|_| Ok(false));
        games.expect_game_exists().returning(|_| Ok(true));
        let svc = service(games, MockPurchaseRepository::new());
        assert_eq!(
            svc.replace_game(3, game(3)).await.unwrap_err(),
            DomainError::ConcurrencyConflict { entity: "Game", id: 3 }
        );
    }

    #[tokio::test]
    async fn delete_of_missing_game_is_not_found() {
        let mut games = MockGameRepository::new();
        games.expect_delete_game().returning(|_| Ok(None));
        let svc = service(games, MockPurchaseRepository::new());
        assert_eq!(
            svc.delete_game(11).await.unwrap_err(),
            DomainError::not_found("Game", 11)
        );
    }

    #[tokio::test]
    async fn owned_games_are_deduplicated_across_purchases() {
        let mut purchases = MockPurchaseRepository::new();
        purchases
            .expect_purchases_for_user()
            .with(eq(42))
            .returning(|_| Ok(vec![purchase(1, &[3, 1, 3]), purchase(2, &[1, 2])]));
        let mut games = MockGameRepository::new();
        games
            .expect_games_by_ids()
            .withf(|ids| ids == [1, 2, 3])
            .returning(|ids| Ok(ids.iter().map(|&i| GameAggregate::bare(game(i))).collect()));
        let svc = service(games, purchases);

        let owned = svc.owned_games(42).await.unwrap();
        let ids: Vec<i32> = owned.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn user_without_purchases_owns_nothing() {
        let mut purchases = MockPurchaseRepository::new();
        purchases.expect_purchases_for_user().returning(|_| Ok(vec![]));
        let mut games = MockGameRepository::new();
        games.expect_games_by_ids().never();
        let svc = service(games, purchases);
        assert!(svc.owned_games(5).await.unwrap().is_empty());
    }
}
