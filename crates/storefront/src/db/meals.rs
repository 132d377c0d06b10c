//! Meal catalog repository.

use serde::Deserialize;
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use instant_meal_core::{Meal, MealCategory, MealDraft, MealId, MealPatch};

use super::RepositoryError;

const MEAL_COLUMNS: &str = "id, name, cuisine, category, price, image, description, \
                            ingredients, created_at, updated_at";

/// Column a meal listing can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MealSortKey {
    Name,
    Cuisine,
    Category,
    Price,
    #[default]
    CreatedAt,
}

impl MealSortKey {
    const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Cuisine => "cuisine",
            Self::Category => "category",
            Self::Price => "price",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering of a meal listing.
///
/// Without an explicit direction, creation time sorts newest first and every
/// other column sorts ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MealOrder {
    pub key: MealSortKey,
    pub direction: Option<SortDirection>,
}

impl MealOrder {
    fn direction(self) -> SortDirection {
        self.direction.unwrap_or(match self.key {
            MealSortKey::CreatedAt => SortDirection::Desc,
            _ => SortDirection::Asc,
        })
    }

    /// `ORDER BY` clause. Both parts come from closed enums, never from input text.
    fn to_sql(self) -> String {
        format!(
            "ORDER BY {} {}, id ASC",
            self.key.column(),
            self.direction().keyword()
        )
    }
}

/// Build a case-insensitive pattern that matches `term` literally.
fn literal_pattern(term: &str) -> String {
    regex::escape(term.trim())
}

/// Result of [`MealRepository::load_catalog`].
#[derive(Debug)]
pub struct CatalogLoad {
    /// Meals deleted before loading.
    pub removed: u64,
    /// Meals inserted, in input order.
    pub inserted: Vec<Meal>,
}

async fn insert_meal<'e, E>(executor: E, draft: &MealDraft) -> Result<Meal, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO storefront.meal \
             (id, name, cuisine, category, price, image, description, ingredients) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {MEAL_COLUMNS}"
    );

    sqlx::query_as::<_, Meal>(&sql)
        .bind(MealId::generate())
        .bind(&draft.name)
        .bind(&draft.cuisine)
        .bind(draft.category)
        .bind(draft.price)
        .bind(&draft.image)
        .bind(&draft.description)
        .bind(&draft.ingredients)
        .fetch_one(executor)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "meal"))
}

/// Repository for meal catalog operations.
pub struct MealRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MealRepository<'a> {
    /// Create a new meal repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: &MealDraft) -> Result<Meal, RepositoryError> {
        insert_meal(self.pool, draft).await
    }

    /// Insert a batch of drafts in one transaction, optionally deleting every
    /// existing meal first. Either the whole batch lands or nothing changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction is rolled back.
    #[instrument(skip(self, drafts), fields(meals = drafts.len()))]
    pub async fn load_catalog(
        &self,
        drafts: &[MealDraft],
        clear_existing: bool,
    ) -> Result<CatalogLoad, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = if clear_existing {
            sqlx::query("DELETE FROM storefront.meal")
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };

        let mut inserted = Vec::with_capacity(drafts.len());
        for draft in drafts {
            inserted.push(insert_meal(&mut *tx, draft).await?);
        }

        tx.commit().await?;

        Ok(CatalogLoad { removed, inserted })
    }

    /// Every meal in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, order: MealOrder) -> Result<Vec<Meal>, RepositoryError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM storefront.meal {}",
            order.to_sql()
        );

        let meals = sqlx::query_as::<_, Meal>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(meals)
    }

    /// Get a meal by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(meal_id = %id))]
    pub async fn get(&self, id: MealId) -> Result<Option<Meal>, RepositoryError> {
        let sql = format!("SELECT {MEAL_COLUMNS} FROM storefront.meal WHERE id = $1");

        let meal = sqlx::query_as::<_, Meal>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(meal)
    }

    /// Meals in the same category as `meal`, excluding `meal` itself, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, meal), fields(meal_id = %meal.id, category = %meal.category))]
    pub async fn related(&self, meal: &Meal, limit: i64) -> Result<Vec<Meal>, RepositoryError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM storefront.meal \
             WHERE category = $1 AND id <> $2 \
             ORDER BY created_at DESC, id ASC \
             LIMIT $3"
        );

        let meals = sqlx::query_as::<_, Meal>(&sql)
            .bind(meal.category)
            .bind(meal.id)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(meals)
    }

    /// Meals of one category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn list_by_category(
        &self,
        category: MealCategory,
    ) -> Result<Vec<Meal>, RepositoryError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM storefront.meal \
             WHERE category = $1 \
             {}",
            MealOrder::default().to_sql()
        );

        let meals = sqlx::query_as::<_, Meal>(&sql)
            .bind(category)
            .fetch_all(self.pool)
            .await?;

        Ok(meals)
    }

    /// Meals whose name or cuisine contains `term`, ignoring case.
    ///
    /// The term is matched literally; regex metacharacters in it are escaped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<Meal>, RepositoryError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM storefront.meal \
             WHERE name ~* $1 OR cuisine ~* $1 \
             ORDER BY name ASC, id ASC \
             LIMIT $2"
        );

        let meals = sqlx::query_as::<_, Meal>(&sql)
            .bind(literal_pattern(term))
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(meals)
    }

    /// Apply a validated patch. Returns `None` if the meal does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, patch), fields(meal_id = %id))]
    pub async fn update(
        &self,
        id: MealId,
        patch: &MealPatch,
    ) -> Result<Option<Meal>, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.meal SET \
                 name = COALESCE($2, name), \
                 cuisine = COALESCE($3, cuisine), \
                 category = COALESCE($4, category), \
                 price = COALESCE($5, price), \
                 image = COALESCE($6, image), \
                 description = COALESCE($7, description), \
                 ingredients = COALESCE($8, ingredients), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {MEAL_COLUMNS}"
        );

        let meal = sqlx::query_as::<_, Meal>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.cuisine.as_deref())
            .bind(patch.category)
            .bind(patch.price)
            .bind(patch.image.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.ingredients.as_deref())
            .fetch_optional(self.pool)
            .await?;

        Ok(meal)
    }

    /// Delete a meal. Returns the number of rows removed (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    #[instrument(skip(self), fields(meal_id = %id))]
    pub async fn delete(&self, id: MealId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.meal WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
