//! # PurchaseService
//!
//! CRUD over purchases. Records are returned raw, without DTO mapping.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use domains::{DomainError, NewPurchase, Purchase, PurchaseRepository, Result};

pub struct PurchaseService {
    purchases: Arc<dyn PurchaseRepository>,
}

impl PurchaseService {
    pub fn new(purchases: Arc<dyn PurchaseRepository>) -> Self {
        Self { purchases }
    }

    #[instrument(skip(self))]
    pub async fn list_purchases(&self) -> Result<Vec<Purchase>> {
        self.purchases.list_purchases().await
    }

    #[instrument(skip(self))]
    pub async fn get_purchase(&self, id: i32) -> Result<Purchase> {
        self.purchases
            .find_purchase(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Purchase", id))
    }

    /// Stamps the purchase date with the server clock, ignoring any client
    /// value, and inserts the purchase with its line items.
    #[instrument(skip(self, purchase), fields(user_id = purchase.user_id))]
    pub async fn create_purchase(&self, purchase: Purchase) -> Result<Purchase> {
        if purchase.user_id < 0 {
            return Err(DomainError::invalid("user id must not be negative"));
        }
        if let Some(item) = purchase.purchase_items.iter().find(|i| i.game_id < 0) {
            return Err(DomainError::invalid(format!(
                "purchase item references invalid game id {}",
                item.game_id
            )));
        }

        let new_purchase = NewPurchase {
            user_id: purchase.user_id,
            purchase_date: Utc::now(),
            game_ids: purchase.purchase_items.iter().map(|i| i.game_id).collect(),
        };
        let created = self.purchases.create_purchase(new_purchase).await?;
        info!(
            purchase_id = created.id,
            items = created.purchase_items.len(),
            "purchase created"
        );
        Ok(created)
    }

    #[instrument(skip(self, purchase))]
    pub async fn replace_purchase(&self, id: i32, purchase: Purchase) -> Result<()> {
        if id != purchase.id {
            return Err(DomainError::invalid(format!(
                "route id {id} does not match body id {}",
                purchase.id
            )));
        }
        if self.purchases.replace_purchase(&purchase).await? {
            info!(purchase_id = id, "purchase replaced");
            return Ok(());
        }
        if self.purchases.purchase_exists(id).await? {
            warn!(purchase_id = id, "purchase replace touched no row although it exists");
            Err(DomainError::ConcurrencyConflict { entity: "Purchase", id })
        } else {
            Err(DomainError::not_found("Purchase", id))
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_purchase(&self, id: i32) -> Result<Purchase> {
        let purchase = self
            .purchases
            .delete_purchase(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Purchase", id))?;
        info!(purchase_id = id, "purchase deleted");
        Ok(purchase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use domains::{MockPurchaseRepository, PurchaseItem};
    use mockall::predicate::eq;

    fn client_purchase(game_ids: &[i32]) -> Purchase {
        Purchase {
            id: 0,
            user_id: 8,
            purchase_date: DateTime::UNIX_EPOCH,
            purchase_items: game_ids
                .iter()
                .map(|&game_id| PurchaseItem { id: 0, purchase_id: 0, game_id })
                .collect(),
        }
    }

    fn stored(new: NewPurchase) -> Purchase {
        Purchase {
            id: 77,
            user_id: new.user_id,
            purchase_date: new.purchase_date,
            purchase_items: new
                .game_ids
                .iter()
                .enumerate()
                .map(|(i, &game_id)| PurchaseItem {
                    id: i as i32 + 1,
                    purchase_id: 77,
                    game_id,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_stamps_server_time() {
        let before = Utc::now();
        let mut repo = MockPurchaseRepository::new();
        repo.expect_create_purchase()
            .withf(|p| p.user_id == 8 && p.game_ids == vec![1, 2])
            .returning(|p| Ok(stored(p)));
        let svc = PurchaseService::new(Arc::new(repo));

        let created = svc.create_purchase(client_purchase(&[1, 2])).await.unwrap();
        assert_eq!(created.id, 77);
        assert!(created.purchase_date >= before);
        assert!(created.purchase_date - before < Duration::seconds(5));
        assert!(created.purchase_items.iter().all(|i| i.purchase_id == 77));
    }

    #[tokio::test]
    async fn create_rejects_negative_game_ids() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_create_purchase().never();
        let svc = PurchaseService::new(Arc::new(repo));
        let err = svc.create_purchase(client_purchase(&[1, -4])).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn get_missing_purchase_is_not_found() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_find_purchase().with(eq(5)).returning(|_| Ok(None));
        let svc = PurchaseService::new(Arc::new(repo));
        assert_eq!(
            svc.get_purchase(5).await.unwrap_err(),
            DomainError::not_found("Purchase", 5)
        );
    }

    #[tokio::test]
    async fn delete_missing_purchase_is_not_found() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_delete_purchase().returning(|_| Ok(None));
        let svc = PurchaseService::new(Arc::new(repo));
        assert_eq!(
            svc.delete_purchase(404).await.unwrap_err(),
            DomainError::not_found("Purchase", 404)
        );
    }

    #[tokio::test]
    async fn replace_follows_not_found_or_fatal_policy() {
        let mut repo = MockPurchaseRepository::new();
        repo.expect_replace_purchase().returning(|_| Ok(false));
        repo.expect_purchase_exists().with(eq(1)).returning(|_| Ok(true));
        repo.expect_purchase_exists().with(eq(2)).returning(|_| Ok(false));
        let svc = PurchaseService::new(Arc::new(repo));

        let mut body = client_purchase(&[]);
        body.id = 1;
        assert_eq!(
            svc.replace_purchase(1, body.clone()).await.unwrap_err(),
            DomainError::ConcurrencyConflict { entity: "Purchase", id: 1 }
        );
        body.id = 2;
        assert_eq!(
            svc.replace_purchase(2, body.clone()).await.unwrap_err(),
            DomainError::not_found("Purchase", 2)
        );
        assert!(matches!(
            svc.replace_purchase(3, body).await.unwrap_err(),
            DomainError::InvalidRequest(_)
        ));
    }
}
