//! Seed the catalogue with demo products.
//!
//! Idempotent: products are matched by name and existing rows (including
//! their stock) are left untouched.

use rust_decimal::Decimal;
use tracing::info;

use atelier_core::Price;
use atelier_storefront::db::products::{NewProduct, ProductRepository};

use super::{CommandError, connect};

/// `(name, description, price, stock)`
const DEMO_CATALOGUE: &[(&str, &str, &str, i32)] = &[
    ("Test Product", "A test product for development", "99.99", 10),
    ("Silk Twill Scarf", "Hand-rolled edges, 90 x 90 cm", "450.00", 25),
    ("Calfskin Tote", "Unlined calfskin with palladium hardware", "2850.00", 5),
    ("Cashmere Wrap", "Double-faced grade-A cashmere", "1200.00", 12),
    ("Gold Signet Ring", "18k yellow gold, made to order", "3400.00", 3),
];

/// Build the demo catalogue.
fn demo_products() -> Result<Vec<NewProduct>, CommandError> {
    DEMO_CATALOGUE
        .iter()
        .map(|&(name, description, price, stock)| {
            let amount: Decimal = price
                .parse()
                .map_err(|e| CommandError::SeedData(format!("{name}: {e}")))?;
            let price =
                Price::new(amount).map_err(|e| CommandError::SeedData(format!("{name}: {e}")))?;
            Ok(NewProduct {
                name: name.to_string(),
                description: description.to_string(),
                price,
                stock,
            })
        })
        .collect()
}

/// Insert demo products that are not already present.
///
/// Returns the number of products inserted.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn catalogue() -> Result<usize, CommandError> {
    let products = demo_products()?;
    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let mut inserted = 0;
    for product in &products {
        if repo.insert_if_absent(product).await? {
            info!(name = %product.name, price = %product.price, stock = product.stock, "Inserted product");
            inserted += 1;
        }
    }

    info!(
        inserted,
        skipped = products.len() - inserted,
        "Seeding complete!"
    );
    Ok(inserted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalogue_is_valid() {
        let products = demo_products().unwrap();
        assert_eq!(products.len(), DEMO_CATALOGUE.len());
        assert!(products.iter().all(|p| p.stock >= 0));
        assert_eq!(products[0].price, Price::from_cents(9999).unwrap());
    }

    #[test]
    fn test_demo_names_unique() {
        let mut names: Vec<&str> = DEMO_CATALOGUE.iter().map(|p| p.0).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEMO_CATALOGUE.len());
    }
}
