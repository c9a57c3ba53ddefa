//! Seed the catalog from a YAML file.
//!
//! Every entry is validated with the same rules the API applies before the
//! database is touched. Products whose name already exists are skipped, so
//! the command can be re-run safely.
//!
//! # File format
//!
//! ```yaml
//! products:
//!   - name: Merino Wool
//!     category: KnittingThreads
//!     colors:
//!       - code: RED01
//!         stock: 25
//!       - code: NAVY
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use stocks_api::config::database_url_from_env;
use stocks_api::db::{self, PgStore, Store};
use stocks_api::models::{NewColor, NewProduct};
use stocks_api::validation;

/// Catalog file contents.
#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub colors: Vec<SeedColor>,
}

#[derive(Debug, Deserialize)]
pub struct SeedColor {
    pub code: String,
    #[serde(default)]
    pub stock: i32,
}

/// A validated product ready to insert.
#[derive(Debug)]
pub struct ValidProduct {
    pub product: NewProduct,
    pub colors: Vec<NewColor>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("catalog has {} invalid entries:\n{}", .0.len(), .0.join("\n"))]
    Invalid(Vec<String>),
}

/// Validate every product and color, reporting all problems at once.
///
/// # Errors
///
/// Returns `SeedError::Invalid` listing each failing field.
pub fn validate_catalog(catalog: &SeedCatalog) -> Result<Vec<ValidProduct>, SeedError> {
    let mut problems = Vec::new();
    let mut valid = Vec::with_capacity(catalog.products.len());

    for (i, entry) in catalog.products.iter().enumerate() {
        let product = validation::new_product(&entry.name, &entry.category)
            .map_err(|errors| {
                for e in errors.errors() {
                    problems.push(format!("products[{i}].{}: {}", e.field, e.message));
                }
            })
            .ok();

        let mut colors = Vec::with_capacity(entry.colors.len());
        for (j, color) in entry.colors.iter().enumerate() {
            match validation::new_color(&color.code, color.stock) {
                Ok(color) => colors.push(color),
                Err(errors) => {
                    for e in errors.errors() {
                        problems.push(format!(
                            "products[{i}].colors[{j}].{}: {}",
                            e.field, e.message
                        ));
                    }
                }
            }
        }

        let mut seen: Vec<String> = Vec::new();
        for color in &colors {
            let code = color.code.to_lowercase();
            if seen.contains(&code) {
                problems.push(format!(
                    "products[{i}].colors: duplicate code '{}'",
                    color.code
                ));
            }
            seen.push(code);
        }

        if let Some(product) = product {
            valid.push(ValidProduct { product, colors });
        }
    }

    let mut names: Vec<String> = Vec::new();
    for entry in &valid {
        let name = entry.product.name.to_lowercase();
        if names.contains(&name) {
            problems.push(format!("duplicate product name '{}'", entry.product.name));
        }
        names.push(name);
    }

    if problems.is_empty() {
        Ok(valid)
    } else {
        Err(SeedError::Invalid(problems))
    }
}

/// Outcome of a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub skipped: usize,
    pub colors: usize,
}

/// Insert validated products into a store, skipping existing names.
///
/// # Errors
///
/// Returns the first store error.
pub async fn apply(
    store: &dyn Store,
    products: Vec<ValidProduct>,
) -> Result<SeedSummary, db::RepositoryError> {
    let mut summary = SeedSummary::default();

    for entry in products {
        if store.product_name_exists(&entry.product.name, None).await? {
            warn!(name = %entry.product.name, "Product exists, skipping");
            summary.skipped += 1;
            continue;
        }

        let product = store.insert_product(&entry.product).await?;
        for color in &entry.colors {
            store.insert_color(product.id, color).await?;
            summary.colors += 1;
        }
        info!(name = %product.name, colors = entry.colors.len(), "Product created");
        summary.created += 1;
    }

    Ok(summary)
}

/// Seed the catalog from `file_path`.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog
/// * `dry_run` - Validate only, don't connect to the database
///
/// # Errors
///
/// Returns an error if the file can't be read or parsed, any entry is
/// invalid, or database operations fail.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog");
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: SeedCatalog = serde_yaml::from_str(&content)?;
    let products = validate_catalog(&catalog)?;
    info!(products = products.len(), "Catalog is valid");

    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let database_url = database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    let store = PgStore::new(pool);

    let summary = apply(&store, products).await?;
    info!(
        created = summary.created,
        skipped = summary.skipped,
        colors = summary.colors,
        "Seeding complete"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stocks_api::db::MemoryStore;

    use super::*;

    const CATALOG: &str = r"
products:
  - name: Merino Wool
    category: KnittingThreads
    colors:
      - code: RED01
        stock: 25
      - code: NAVY
  - name: Brass Zipper
    category: Zippers
";

    fn parse(yaml: &str) -> SeedCatalog {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_and_validate() {
        let products = validate_catalog(&parse(CATALOG)).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].colors.len(), 2);
        assert_eq!(products[0].colors[1].stock_count, 0);
        assert!(products[1].colors.is_empty());
    }

    #[test]
    fn test_every_problem_is_listed() {
        let yaml = r"
products:
  - name: X
    category: Hats
    colors:
      - code: RED-1
        stock: -4
  - name: Silk
    category: Ribbons
    colors:
      - code: blue
      - code: BLUE
";
        let SeedError::Invalid(problems) = validate_catalog(&parse(yaml)).unwrap_err();
        assert!(problems.iter().any(|p| p.starts_with("products[0].name")));
        assert!(problems.iter().any(|p| p.starts_with("products[0].category")));
        assert!(problems.iter().any(|p| p.starts_with("products[0].colors[0].code")));
        assert!(
            problems
                .iter()
                .any(|p| p.starts_with("products[0].colors[0].existingQuantity"))
        );
        assert!(problems.iter().any(|p| p.contains("duplicate code 'BLUE'")));
    }

    #[test]
    fn test_duplicate_product_names_rejected() {
        let yaml = r"
products:
  - name: Silk
    category: Ribbons
  - name: SILK
    category: Laces
";
        assert!(validate_catalog(&parse(yaml)).is_err());
    }

    #[tokio::test]
    async fn test_apply_skips_existing_products() {
        let store = MemoryStore::new();

        let first = apply(&store, validate_catalog(&parse(CATALOG)).unwrap())
            .await
            .unwrap();
        assert_eq!(
            first,
            SeedSummary {
                created: 2,
                skipped: 0,
                colors: 2
            }
        );

        let second = apply(&store, validate_catalog(&parse(CATALOG)).unwrap())
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.list_products().await.unwrap().len(), 2);
    }
}
