use std::sync::Arc;

use chrono::Utc;
use fba_ledger::db::DbPool;
use fba_ledger::entities::product;
use fba_ledger::events::EventSender;
use fba_ledger::handlers::AppServices;
use fba_ledger::migrator::Migrator;
use fba_ledger::services::fifo::CostBasis;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Fresh in-memory database with the full schema applied.
///
/// `max_connections(1)` is required: every connection to `sqlite::memory:`
/// is its own empty database.
pub async fn test_db() -> Arc<DbPool> {
    let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
    opts.max_connections(1);
    let db = Database::connect(opts).await.expect("sqlite connect");
    Migrator::up(&db, None).await.expect("migrations");
    Arc::new(db)
}

/// Event sender whose receiver is drained in the background.
pub fn drained_event_sender() -> EventSender {
    let (tx, mut rx) = mpsc::channel(128);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    EventSender::new(tx)
}

pub async fn test_services(db: Arc<DbPool>) -> AppServices {
    AppServices::new(db, drained_event_sender(), CostBasis::FirstBatch)
}

pub async fn seed_product(db: &DbPool, team_id: Uuid, sku: &str) -> Uuid {
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        team_id: Set(team_id),
        sku: Set(sku.to_owned()),
        name: Set(format!("Product {sku}")),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed product");
    id
}
