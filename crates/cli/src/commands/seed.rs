//! Seed the category tree from a YAML file.
//!
//! ```yaml
//! - name: Electronics
//!   display_order: 1
//!   children:
//!     - name: Phones
//!     - name: Laptops
//!       image_url: https://cdn.bazaar.test/laptops.png
//! - name: Books
//! ```
//!
//! Categories that already exist under the same parent are reused, so the
//! command can be re-run after extending the file.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info};

use bazaar_core::CategoryId;
use bazaar_server::db::{self, PgStore};
use bazaar_server::models::Category;
use bazaar_server::services::CatalogService;
use bazaar_server::services::catalog::CategoryInput;

use super::database_url;

/// One node of the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub children: Vec<Self>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub existing: usize,
}

/// Seed categories from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn categories(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading categories from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let tree: Vec<CategorySeed> = serde_yaml::from_str(&content)?;

    let errors = validate(&tree);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let catalog = CatalogService::new(Arc::new(PgStore::new(pool)));
    let summary = seed_tree(&catalog, &tree).await?;

    info!("Seeding complete!");
    info!("  Categories created: {}", summary.created);
    info!("  Categories already present: {}", summary.existing);

    Ok(())
}

/// Create every category of `tree` that does not exist yet, parents first.
///
/// # Errors
///
/// Returns the first service error encountered.
pub async fn seed_tree(
    catalog: &CatalogService,
    tree: &[CategorySeed],
) -> Result<SeedSummary, bazaar_server::services::ServiceError> {
    let mut known = catalog.list_categories().await?;
    let mut summary = SeedSummary::default();

    // Depth-first with an explicit stack; each entry carries its parent id.
    let mut pending: Vec<(Option<CategoryId>, &CategorySeed)> =
        tree.iter().rev().map(|seed| (None, seed)).collect();

    while let Some((parent_id, seed)) = pending.pop() {
        let name = seed.name.trim();
        let id = if let Some(existing) = find(&known, parent_id, name) {
            summary.existing += 1;
            existing.id
        } else {
            let category = catalog
                .create_category(CategoryInput {
                    name: name.to_string(),
                    parent_id,
                    image_url: seed.image_url.clone(),
                    display_order: seed.display_order,
                })
                .await?;
            info!(category_id = %category.id, name, "Created category");
            summary.created += 1;
            let id = category.id;
            known.push(category);
            id
        };

        pending.extend(seed.children.iter().rev().map(|child| (Some(id), child)));
    }

    Ok(summary)
}

fn find<'a>(
    known: &'a [Category],
    parent_id: Option<CategoryId>,
    name: &str,
) -> Option<&'a Category> {
    known
        .iter()
        .find(|c| c.parent_id == parent_id && c.name.eq_ignore_ascii_case(name))
}

/// Check the whole file before anything is written.
#[must_use]
pub fn validate(tree: &[CategorySeed]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut pending: Vec<(String, &CategorySeed)> =
        tree.iter().map(|seed| (String::new(), seed)).collect();

    while let Some((path, seed)) = pending.pop() {
        let name = seed.name.trim();
        let here = if path.is_empty() {
            name.to_string()
        } else {
            format!("{path} > {name}")
        };

        if name.is_empty() {
            errors.push(format!("blank category name under '{path}'"));
        }

        let mut seen = std::collections::HashSet::new();
        for child in &seed.children {
            if !seen.insert(child.name.trim().to_lowercase()) {
                errors.push(format!(
                    "duplicate category '{}' under '{here}'",
                    child.name.trim()
                ));
            }
        }

        pending.extend(seed.children.iter().map(|child| (here.clone(), child)));
    }

    errors
}
