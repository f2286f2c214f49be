use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::warn;
use uuid::Uuid;

use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;

/// Resolves a product under the caller's team. Every ledger operation passes
/// through here before touching batches. A product that does not exist and a
/// product owned by another team both surface as `NotFound`, so cross-tenant
/// probing cannot distinguish them. Connection-generic so callers can run it
/// inside their own transactions.
pub async fn resolve_for_team<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    team_id: Uuid,
) -> Result<product::Model, ServiceError> {
    let product = Product::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    match product {
        Some(p) if p.team_id == team_id => Ok(p),
        Some(p) => {
            // Logged for operators; the caller sees the same NotFound a
            // missing id would produce.
            warn!(
                %product_id,
                requesting_team = %team_id,
                owning_team = %p.team_id,
                "Cross-tenant product access rejected"
            );
            Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )))
        }
        None => Err(ServiceError::NotFound(format!(
            "Product {} not found",
            product_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrator::Migrator;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
    use sea_orm_migration::MigratorTrait;

    async fn setup() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
        opts.max_connections(1);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed(db: &DatabaseConnection, team_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            team_id: Set(team_id),
            sku: Set("SKU-9".into()),
            name: Set("Gadget".into()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn resolves_products_owned_by_the_team() {
        let db = setup().await;
        let team = Uuid::new_v4();
        let product_id = seed(&db, team).await;

        let found = resolve_for_team(&db, product_id, team).await.unwrap();
        assert_eq!(found.id, product_id);
    }

    #[tokio::test]
    async fn cross_tenant_hit_is_indistinguishable_from_missing() {
        let db = setup().await;
        let owning_team = Uuid::new_v4();
        let product_id = seed(&db, owning_team).await;

        let other_team = Uuid::new_v4();
        let cross = resolve_for_team(&db, product_id, other_team)
            .await
            .unwrap_err();
        let missing = resolve_for_team(&db, Uuid::new_v4(), other_team)
            .await
            .unwrap_err();

        match (&cross, &missing) {
            (ServiceError::NotFound(_), ServiceError::NotFound(_)) => {}
            other => panic!("expected NotFound for both, got {:?}", other),
        }
    }
}
