//! # Postgres store
//!
//! Implements the repository ports on top of a `PgPool`. Related collections
//! are eager-loaded with one `= ANY($1)` query per table, and every write runs
//! inside its own transaction.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use domains::{
    Comment, Developer, DomainError, Game, GameAggregate, GameFilter, GameRepository, Genre, Image,
    NewGame, NewPurchase, Purchase, PurchaseItem, PurchaseRepository, Rating, Result, Video,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const GAME_COLUMNS: &str = "id, name, price, genre, developer_id";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(map_sqlx)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(DomainError::storage)?;
        info!("database migrations applied");
        Ok(())
    }

    async fn fetch_games_by_ids(&self, ids: &[i32]) -> Result<Vec<Game>> {
        sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?
        .iter()
        .map(game_from_row)
        .collect()
    }

    /// Loads developer, images, videos, ratings and comments for `games`.
    async fn load_aggregates(&self, games: Vec<Game>) -> Result<Vec<GameAggregate>> {
        if games.is_empty() {
            return Ok(Vec::new());
        }
        let game_ids: Vec<i32> = games.iter().map(|g| g.id).collect();
        let mut developer_ids: Vec<i32> = games.iter().map(|g| g.developer_id).collect();
        developer_ids.sort_unstable();
        developer_ids.dedup();

        let mut developers: HashMap<i32, Developer> = HashMap::new();
        let rows = sqlx::query("SELECT id, name, email FROM developers WHERE id = ANY($1)")
            .bind(&developer_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        for row in &rows {
            let developer = Developer {
                id: row.try_get("id").map_err(map_sqlx)?,
                name: row.try_get("name").map_err(map_sqlx)?,
                email: row.try_get("email").map_err(map_sqlx)?,
            };
            developers.insert(developer.id, developer);
        }

        let mut images = group_by_game(
            self.children("SELECT id, game_id, path FROM images", &game_ids).await?,
            |row| {
                Ok(Image {
                    id: row.try_get("id")?,
                    game_id: row.try_get("game_id")?,
                    path: row.try_get("path")?,
                })
            },
            |i: &Image| i.game_id,
        )?;
        let mut videos = group_by_game(
            self.children("SELECT id, game_id, path FROM videos", &game_ids).await?,
            |row| {
                Ok(Video {
                    id: row.try_get("id")?,
                    game_id: row.try_get("game_id")?,
                    path: row.try_get("path")?,
                })
            },
            |v: &Video| v.game_id,
        )?;
        let mut ratings = group_by_game(
            self.children("SELECT id, game_id, user_id, score FROM ratings", &game_ids)
                .await?,
            |row| {
                Ok(Rating {
                    id: row.try_get("id")?,
                    game_id: row.try_get("game_id")?,
                    user_id: row.try_get("user_id")?,
                    score: row.try_get("score")?,
                })
            },
            |r: &Rating| r.game_id,
        )?;
        let mut comments = group_by_game(
            self.children(
                "SELECT id, game_id, user_id, text, created_at FROM comments",
                &game_ids,
            )
            .await?,
            |row| {
                Ok(Comment {
                    id: row.try_get("id")?,
                    game_id: row.try_get("game_id")?,
                    user_id: row.try_get("user_id")?,
                    text: row.try_get("text")?,
                    created_at: row.try_get("created_at")?,
                })
            },
            |c: &Comment| c.game_id,
        )?;

        Ok(games
            .into_iter()
            .map(|game| {
                let id = game.id;
                GameAggregate {
                    developer: developers.get(&game.developer_id).cloned(),
                    images: images.remove(&id).unwrap_or_default(),
                    videos: videos.remove(&id).unwrap_or_default(),
                    ratings: ratings.remove(&id).unwrap_or_default(),
                    comments: comments.remove(&id).unwrap_or_default(),
                    game,
                }
            })
            .collect())
    }

    async fn children(&self, select: &str, game_ids: &[i32]) -> Result<Vec<PgRow>> {
        sqlx::query(&format!("{select} WHERE game_id = ANY($1) ORDER BY id"))
            .bind(game_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn fetch_items(&self, purchase_ids: &[i32]) -> Result<Vec<PurchaseItem>> {
        sqlx::query(
            "SELECT id, purchase_id, game_id FROM purchase_items \
             WHERE purchase_id = ANY($1) ORDER BY id",
        )
        .bind(purchase_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?
        .iter()
        .map(item_from_row)
        .collect()
    }
}

#[async_trait]
impl GameRepository for PgStore {
    async fn list_games(&self, limit: Option<i64>) -> Result<Vec<GameAggregate>> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games ORDER BY id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        let games = rows.iter().map(game_from_row).collect::<Result<Vec<_>>>()?;
        self.load_aggregates(games).await
    }

    async fn find_game(&self, id: i32) -> Result<Option<GameAggregate>> {
        let games = self.fetch_games_by_ids(&[id]).await?;
        Ok(self.load_aggregates(games).await?.pop())
    }

    async fn filter_games(&self, filter: &GameFilter) -> Result<Vec<GameAggregate>> {
        debug!(?filter, "filtering games in query");
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games \
             WHERE ($1::text IS NULL OR strpos(lower(name), $1) > 0) \
               AND ($2::float8 IS NULL OR price <= $2) \
               AND ($3::text IS NULL OR $3 = ANY(genre)) \
             ORDER BY id"
        ))
        .bind(filter.name.as_deref())
        .bind(filter.max_price)
        .bind(filter.genre.map(Genre::key))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        let games = rows.iter().map(game_from_row).collect::<Result<Vec<_>>>()?;
        self.load_aggregates(games).await
    }

    async fn games_by_ids(&self, ids: &[i32]) -> Result<Vec<GameAggregate>> {
        let games = self.fetch_games_by_ids(ids).await?;
        self.load_aggregates(games).await
    }

    async fn games_by_developer(&self, developer_id: i32) -> Result<Vec<GameAggregate>> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE developer_id = $1 ORDER BY id"
        ))
        .bind(developer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        let games = rows.iter().map(game_from_row).collect::<Result<Vec<_>>>()?;
        self.load_aggregates(games).await
    }

    /// The game row, its trailer and its images commit together or not at all.
    async fn create_game(&self, game: NewGame) -> Result<i32> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let id: i32 = sqlx::query(
            "INSERT INTO games (name, price, genre, developer_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&game.name)
        .bind(game.price)
        .bind(genre_keys(&game.genre))
        .bind(game.developer_id)
        .fetch_one(&mut *tx)
        .await
        .and_then(|row| row.try_get("id"))
        .map_err(|e| {
            map_constraint(e, || format!("developer {} does not exist", game.developer_id))
        })?;

        if let Some(trailer) = &game.trailer_url {
            sqlx::query("INSERT INTO videos (game_id, path) VALUES ($1, $2)")
                .bind(id)
                .bind(trailer)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        }
        for path in &game.image_paths {
            sqlx::query("INSERT INTO images (game_id, path) VALUES ($1, $2)")
                .bind(id)
                .bind(path)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(id)
    }

    async fn replace_game(&self, game: &Game) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE games SET name = $2, price = $3, genre = $4, developer_id = $5 WHERE id = $1",
        )
        .bind(game.id)
        .bind(&game.name)
        .bind(game.price)
        .bind(genre_keys(&game.genre))
        .bind(game.developer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_constraint(e, || format!("developer {} does not exist", game.developer_id))
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn game_exists(&self, id: i32) -> Result<bool> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM games WHERE id = $1) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("found"))
            .map_err(map_sqlx)
    }

    async fn delete_game(&self, id: i32) -> Result<Option<Game>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let row = sqlx::query(&format!(
            "DELETE FROM games WHERE id = $1 RETURNING {GAME_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, || format!("game {id} is referenced by purchases")))?;
        let game = row.as_ref().map(game_from_row).transpose()?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(game)
    }
}

#[async_trait]
impl PurchaseRepository for PgStore {
    async fn list_purchases(&self) -> Result<Vec<Purchase>> {
        sqlx::query("SELECT id, user_id, purchase_date FROM purchases ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?
            .iter()
            .map(purchase_from_row)
            .collect()
    }

    async fn find_purchase(&self, id: i32) -> Result<Option<Purchase>> {
        sqlx::query("SELECT id, user_id, purchase_date FROM purchases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .as_ref()
            .map(purchase_from_row)
            .transpose()
    }

    async fn purchases_for_user(&self, user_id: i32) -> Result<Vec<Purchase>> {
        let mut purchases: Vec<Purchase> = sqlx::query(
            "SELECT id, user_id, purchase_date FROM purchases WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?
        .iter()
        .map(purchase_from_row)
        .collect::<Result<_>>()?;

        let ids: Vec<i32> = purchases.iter().map(|p| p.id).collect();
        let mut items: HashMap<i32, Vec<PurchaseItem>> = HashMap::new();
        for item in self.fetch_items(&ids).await? {
            items.entry(item.purchase_id).or_default().push(item);
        }
        for purchase in &mut purchases {
            purchase.purchase_items = items.remove(&purchase.id).unwrap_or_default();
        }
        Ok(purchases)
    }

    /// Inserts the purchase, then each line item carrying the new purchase id.
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let row = sqlx::query(
            "INSERT INTO purchases (user_id, purchase_date) VALUES ($1, $2) \
             RETURNING id, user_id, purchase_date",
        )
        .bind(purchase.user_id)
        .bind(purchase.purchase_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        let mut created = purchase_from_row(&row)?;

        for game_id in purchase.game_ids {
            let row = sqlx::query(
                "INSERT INTO purchase_items (purchase_id, game_id) VALUES ($1, $2) \
                 RETURNING id, purchase_id, game_id",
            )
            .bind(created.id)
            .bind(game_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_constraint(e, || format!("game {game_id} does not exist")))?;
            created.purchase_items.push(item_from_row(&row)?);
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(created)
    }

    async fn replace_purchase(&self, purchase: &Purchase) -> Result<bool> {
        let result =
            sqlx::query("UPDATE purchases SET user_id = $2, purchase_date = $3 WHERE id = $1")
                .bind(purchase.id)
                .bind(purchase.user_id)
                .bind(purchase.purchase_date)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn purchase_exists(&self, id: i32) -> Result<bool> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM purchases WHERE id = $1) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("found"))
            .map_err(map_sqlx)
    }

    async fn delete_purchase(&self, id: i32) -> Result<Option<Purchase>> {
        sqlx::query("DELETE FROM purchases WHERE id = $1 RETURNING id, user_id, purchase_date")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .as_ref()
            .map(purchase_from_row)
            .transpose()
    }
}

fn game_from_row(row: &PgRow) -> Result<Game> {
    let keys: Vec<String> = row.try_get("genre").map_err(map_sqlx)?;
    let genre = keys
        .iter()
        .map(|k| k.parse::<Genre>())
        .collect::<Result<Vec<_>>>()
        .map_err(|e| DomainError::storage(format!("corrupt genre column: {e}")))?;
    Ok(Game {
        id: row.try_get("id").map_err(map_sqlx)?,
        name: row.try_get("name").map_err(map_sqlx)?,
        price: row.try_get("price").map_err(map_sqlx)?,
        genre,
        developer_id: row.try_get("developer_id").map_err(map_sqlx)?,
    })
}

fn purchase_from_row(row: &PgRow) -> Result<Purchase> {
    Ok(Purchase {
        id: row.try_get("id").map_err(map_sqlx)?,
        user_id: row.try_get("user_id").map_err(map_sqlx)?,
        purchase_date: row.try_get("purchase_date").map_err(map_sqlx)?,
        purchase_items: Vec::new(),
    })
}

fn item_from_row(row: &PgRow) -> Result<PurchaseItem> {
    Ok(PurchaseItem {
        id: row.try_get("id").map_err(map_sqlx)?,
        purchase_id: row.try_get("purchase_id").map_err(map_sqlx)?,
        game_id: row.try_get("game_id").map_err(map_sqlx)?,
    })
}

fn genre_keys(genre: &[Genre]) -> Vec<&'static str> {
    genre.iter().map(|g| g.key()).collect()
}

fn group_by_game<T>(
    rows: Vec<PgRow>,
    decode: impl Fn(&PgRow) -> std::result::Result<T, sqlx::Error>,
    game_id: impl Fn(&T) -> i32,
) -> Result<HashMap<i32, Vec<T>>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for row in &rows {
        let value = decode(row).map_err(map_sqlx)?;
        grouped.entry(game_id(&value)).or_default().push(value);
    }
    Ok(grouped)
}

fn map_sqlx(err: sqlx::Error) -> DomainError {
    map_constraint(err, || "the request conflicts with stored data".to_string())
}

/// Constraint violations become `Constraint` carrying `conflict`; the database
/// text names tables and constraints, so it is only logged. Everything else is
/// an opaque storage failure.
fn map_constraint(err: sqlx::Error, conflict: impl FnOnce() -> String) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() || db.is_unique_violation() || db.is_check_violation() {
            warn!(
                constraint = db.constraint().unwrap_or("-"),
                detail = db.message(),
                "constraint violation"
            );
            return DomainError::Constraint(conflict());
        }
    }
    DomainError::storage(err)
}
