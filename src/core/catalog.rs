//! Category catalog - Recyclable categories offered in the booking and rate views.
//!
//! Reads are ordered by creation time and cached under a single fixed key.
//! [`categories_or_empty`] is the degraded variant used by forms, which show an
//! empty selection list instead of failing.

use crate::{
    cache::{QueryCache, QueryKey},
    config::catalog::CatalogConfig,
    entities::{ScrapCategory, scrap_category},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Cache operation name for the category list.
pub const CATEGORIES_OPERATION: &str = "scrap-categories";

/// Retrieves all categories in creation order.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<scrap_category::Model>> {
    ScrapCategory::find()
        .order_by_asc(scrap_category::Column::CreatedAt)
        .order_by_asc(scrap_category::Column::Name)
        .all(db)
        .await
        .map_err(Error::fetch("categories"))
}

/// Cached variant of [`list_categories`].
pub async fn cached_categories(
    db: &DatabaseConnection,
    cache: &QueryCache,
) -> Result<Vec<scrap_category::Model>> {
    cache
        .get_or_fetch(QueryKey::fixed(CATEGORIES_OPERATION), || {
            list_categories(db)
        })
        .await
}

/// Category list for selection widgets; a failed read yields an empty list.
pub async fn categories_or_empty(
    db: &DatabaseConnection,
    cache: &QueryCache,
) -> Vec<scrap_category::Model> {
    cached_categories(db, cache).await.unwrap_or_else(|e| {
        warn!("Showing empty category list: {e}");
        Vec::new()
    })
}

/// Finds a category by its id.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: Uuid,
) -> Result<Option<scrap_category::Model>> {
    ScrapCategory::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Error::fetch("category"))
}

/// Finds a category by its exact name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<scrap_category::Model>> {
    ScrapCategory::find()
        .filter(scrap_category::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Error::fetch("category"))
}

/// Creates a category. The name is trimmed and must not be empty.
pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
    icon: Option<String>,
    description: Option<String>,
) -> Result<scrap_category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::MissingFields {
            fields: vec!["name"],
        });
    }

    let category = scrap_category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        unit: Set(unit.to_string()),
        icon: Set(icon),
        description: Set(description),
        created_at: Set(chrono::Utc::now()),
    };

    category.insert(db).await.map_err(|e| Error::write(&e))
}

/// Inserts every configured category whose name is not in the catalog yet.
///
/// Returns the number of categories created.
pub async fn seed_categories(db: &DatabaseConnection, config: &CatalogConfig) -> Result<usize> {
    let mut created = 0;
    for entry in &config.categories {
        if get_category_by_name(db, entry.name.trim()).await?.is_some() {
            continue;
        }
        create_category(
            db,
            &entry.name,
            &entry.unit,
            entry.icon.clone(),
            entry.description.clone(),
        )
        .await?;
        created += 1;
    }
    info!(
        "Seeded {created} of {} configured categories",
        config.categories.len()
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::catalog::CategoryConfig;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn seed_entry(name: &str) -> CategoryConfig {
        CategoryConfig {
            name: name.to_string(),
            unit: "kg".to_string(),
            icon: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_list_categories_in_creation_order() -> Result<()> {
        let db = setup_test_db().await?;
        let glass = create_test_category_at(&db, "Glass", 0).await?;
        let paper = create_test_category_at(&db, "Paper", 1).await?;
        let metal = create_test_category_at(&db, "Metal", 2).await?;

        let categories = list_categories(&db).await?;
        let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![glass.id, paper.id, metal.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cached_categories_survive_new_inserts_until_invalidated() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = test_cache();
        create_test_category(&db, "Paper").await?;

        assert_eq!(cached_categories(&db, &cache).await?.len(), 1);
        create_test_category(&db, "Plastic").await?;
        assert_eq!(cached_categories(&db, &cache).await?.len(), 1);

        cache.invalidate(&QueryKey::fixed(CATEGORIES_OPERATION)).await;
        assert_eq!(cached_categories(&db, &cache).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_read_degrades_to_empty_list() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("permission denied".to_string())])
            .into_connection();
        let cache = test_cache();

        let direct = list_categories(&db).await;
        assert!(matches!(direct, Err(Error::DataFetch { .. })));

        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("permission denied".to_string())])
            .into_connection();
        assert!(categories_or_empty(&db, &cache).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_category_rejects_blank_name() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_category(&db, "   ", "kg", None, None).await;
        assert!(matches!(result, Err(Error::MissingFields { .. })));
    }

    #[tokio::test]
    async fn test_seed_categories_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config = CatalogConfig {
            categories: vec![seed_entry("Paper"), seed_entry("Metal")],
        };

        assert_eq!(seed_categories(&db, &config).await?, 2);
        assert_eq!(seed_categories(&db, &config).await?, 0);
        assert_eq!(list_categories(&db).await?.len(), 2);
        assert!(get_category_by_name(&db, "Metal").await?.is_some());
        Ok(())
    }
}
