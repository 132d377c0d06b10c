//! Seed the meal catalog from a YAML file.
//!
//! The file is a list of meals in the same shape the API accepts:
//!
//! ```yaml
//! - name: Paneer Butter Masala
//!   cuisine: North Indian
//!   category: Veg
//!   price: 249
//!   image: https://images.example.com/paneer.jpg
//!   description: Cottage cheese in a buttery tomato gravy.
//!   ingredients: paneer, tomato, butter, cream, spices
//! ```
//!
//! Every entry is validated before the database is touched.

use std::path::Path;

use tracing::{error, info};

use instant_meal_core::{MealDraft, MealError};
use instant_meal_storefront::db::{self, MealRepository};

/// Errors from reading a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),
}

/// Parse and validate a catalog file's contents.
///
/// Returns the normalized drafts, or every validation failure as
/// `(entry index, error)`.
fn parse_catalog(content: &str) -> Result<Vec<MealDraft>, CatalogErrors> {
    let drafts: Vec<MealDraft> = serde_yaml::from_str(content).map_err(CatalogErrors::Yaml)?;

    let mut valid = Vec::with_capacity(drafts.len());
    let mut errors = Vec::new();
    for (index, draft) in drafts.into_iter().enumerate() {
        match draft.validate() {
            Ok(draft) => valid.push(draft),
            Err(err) => errors.push((index, err)),
        }
    }

    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(CatalogErrors::Invalid(errors))
    }
}

#[derive(Debug)]
enum CatalogErrors {
    Yaml(serde_yaml::Error),
    Invalid(Vec<(usize, MealError)>),
}

/// Seed meals from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog
/// * `clear_existing` - If true, delete every existing meal first
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or a database operation fails. A database failure
/// leaves the catalog as it was.
pub async fn meals(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url().ok_or("INSTANT_MEAL_DATABASE_URL not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_string()).into());
    }

    info!(path = %file_path, "Loading meals from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let drafts = match parse_catalog(&content) {
        Ok(drafts) => drafts,
        Err(CatalogErrors::Yaml(err)) => return Err(SeedError::Yaml(err).into()),
        Err(CatalogErrors::Invalid(errors)) => {
            error!("Catalog validation failed:");
            for (index, err) in &errors {
                error!("  - entry {index}: {err}");
            }
            return Err(SeedError::Invalid(errors.len()).into());
        }
    };

    info!(meals = drafts.len(), "Catalog validated successfully");

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    // Wipe and inserts share one transaction
    let loaded = MealRepository::new(&pool)
        .load_catalog(&drafts, clear_existing)
        .await?;

    if clear_existing {
        info!(removed = loaded.removed, "Cleared existing meals");
    }
    for meal in &loaded.inserted {
        info!(meal_id = %meal.id, name = %meal.name, "Inserted meal");
    }

    info!("Seeding complete!");
    info!("  Meals inserted: {}", loaded.inserted.len());

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const PANEER: &str = "
- name: '  Paneer Butter Masala '
  cuisine: North Indian
  category: veg
  price: 249
  image: https://images.example.com/paneer.jpg
  description: Cottage cheese in a buttery tomato gravy.
  ingredients: paneer, tomato, butter
";

    #[test]
    fn test_parse_catalog_normalizes_entries() {
        let drafts = parse_catalog(PANEER).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "Paneer Butter Masala");
        assert_eq!(drafts[0].category.as_str(), "Veg");
    }

    #[test]
    fn test_parse_catalog_reports_every_invalid_entry() {
        let content = format!(
            "{PANEER}
- name: ''
  cuisine: Italian
  category: Veg
  price: 300
  image: https://images.example.com/pizza.jpg
  description: Pizza.
  ingredients: dough
- name: Cold Coffee
  cuisine: Cafe
  category: Drinks
  price: 120
  image: not-a-url
  description: Iced.
  ingredients: coffee, milk
"
        );

        match parse_catalog(&content) {
            Err(CatalogErrors::Invalid(errors)) => {
                let indices: Vec<_> = errors.iter().map(|(i, _)| *i).collect();
                assert_eq!(indices, vec![1, 2]);
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_catalog_rejects_unknown_category() {
        let content = PANEER.replace("category: veg", "category: Fusion");
        assert!(matches!(parse_catalog(&content), Err(CatalogErrors::Yaml(_))));
    }
}
