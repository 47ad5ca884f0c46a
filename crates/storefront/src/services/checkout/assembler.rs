//! Order assembly: validate the submitted forms, normalise the cart and
//! price it against the catalogue.
//!
//! Everything here is read-only. Stock is not enforced at this stage; the
//! transaction coordinator re-reads it under lock.

use std::collections::HashMap;

use atelier_core::{CardExpiry, CardNumber, Email, ProductId, Quantity};

use super::CheckoutError;
use super::request::{CartItemInput, PaymentForm, PlaceOrderRequest, ShippingForm};
use crate::db::CatalogStore;
use crate::models::{OrderDraft, OrderLine, PaymentDetails, Product, ShippingDetails};

/// Builds [`OrderDraft`]s from raw requests.
pub struct OrderAssembler<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: CatalogStore + ?Sized> OrderAssembler<'a, C> {
    /// Create an assembler reading prices from `catalog`.
    #[must_use]
    pub const fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Validate and price a request.
    ///
    /// Form and cart validation run before the catalogue is queried.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `InvalidShippingInfo`, `InvalidPaymentInfo`,
    /// `InvalidQuantity` or `ProductNotFound` for bad input, and
    /// `Transaction` if the catalogue cannot be read.
    pub async fn assemble(&self, request: &PlaceOrderRequest) -> Result<OrderDraft, CheckoutError> {
        if request.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let shipping = validate_shipping(&request.shipping_info)?;
        let payment = validate_payment(&request.payment_info)?;
        let cart = normalize_items(&request.items)?;

        let ids: Vec<ProductId> = cart.iter().map(|(id, _)| *id).collect();
        let catalog: HashMap<ProductId, Product> = self
            .catalog
            .find_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let lines = cart
            .into_iter()
            .map(|(product_id, quantity)| {
                let product = catalog
                    .get(&product_id)
                    .ok_or(CheckoutError::ProductNotFound(product_id))?;
                Ok(OrderLine {
                    product_id,
                    product_name: product.name.clone(),
                    quantity,
                    unit_price: product.price,
                })
            })
            .collect::<Result<Vec<_>, CheckoutError>>()?;

        Ok(OrderDraft {
            lines,
            shipping,
            payment,
        })
    }
}

/// Trim every shipping field and require it to be non-empty.
fn validate_shipping(form: &ShippingForm) -> Result<ShippingDetails, CheckoutError> {
    fn required(field: &'static str, value: &str) -> Result<String, CheckoutError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CheckoutError::shipping(field, "is required"));
        }
        Ok(value.to_owned())
    }

    let first_name = required("firstName", &form.first_name)?;
    let last_name = required("lastName", &form.last_name)?;
    let email = Email::parse(&form.email).map_err(|e| CheckoutError::shipping("email", e))?;
    let address = required("address", &form.address)?;
    let city = required("city", &form.city)?;
    let postal_code = required("postalCode", &form.postal_code)?;

    Ok(ShippingDetails {
        first_name,
        last_name,
        email,
        address,
        city,
        postal_code,
    })
}

/// Validate the card and keep only its masked form.
fn validate_payment(form: &PaymentForm) -> Result<PaymentDetails, CheckoutError> {
    if form.card_number.trim().is_empty() {
        return Err(CheckoutError::payment("cardNumber", "is required"));
    }
    let card =
        CardNumber::parse(&form.card_number).map_err(|e| CheckoutError::payment("cardNumber", e))?;
    let expiry = CardExpiry::parse(&form.expiry_date)
        .map_err(|e| CheckoutError::payment("expiryDate", e))?;

    Ok(PaymentDetails {
        masked_card_number: card.mask(),
        expiry,
    })
}

/// Merge lines naming the same product, keeping first-seen order.
fn normalize_items(items: &[CartItemInput]) -> Result<Vec<(ProductId, Quantity)>, CheckoutError> {
    let mut merged: Vec<(ProductId, Quantity)> = Vec::with_capacity(items.len());

    for item in items {
        let invalid = || CheckoutError::InvalidQuantity {
            product_id: item.product_id,
            quantity: item.quantity,
        };
        let quantity = Quantity::new(item.quantity).map_err(|_| invalid())?;

        match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, existing)) => *existing = existing.checked_add(quantity).map_err(|_| invalid())?,
            None => merged.push((item.product_id, quantity)),
        }
    }

    Ok(merged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use atelier_core::Price;

    use crate::db::RepositoryError;

    struct Catalog(Vec<Product>);

    #[async_trait]
    impl CatalogStore for Catalog {
        async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
            Ok(self
                .0
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }
    }

    fn catalog() -> Catalog {
        Catalog(vec![
            Product {
                id: ProductId::new(1),
                name: "Silk Scarf".to_string(),
                price: Price::from_cents(5000).unwrap(),
                stock: 5,
            },
            Product {
                id: ProductId::new(2),
                name: "Leather Tote".to_string(),
                price: Price::from_cents(125_000).unwrap(),
                stock: 1,
            },
        ])
    }

    fn item(product: i32, quantity: i64) -> CartItemInput {
        CartItemInput {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    fn request(items: Vec<CartItemInput>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items,
            shipping_info: ShippingForm {
                first_name: " Ada ".to_string(),
                last_name: "Lovelace".to_string(),
                email: "Ada@Example.com".to_string(),
                address: "1 Analytical Way".to_string(),
                city: "London".to_string(),
                postal_code: "N1 9GU".to_string(),
            },
            payment_info: PaymentForm {
                card_number: "4242-4242 4242-4242".to_string(),
                expiry_date: "12/29".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_assemble_prices_from_catalogue() {
        let catalog = catalog();
        let draft = OrderAssembler::new(&catalog)
            .assemble(&request(vec![item(1, 2)]))
            .await
            .unwrap();

        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.lines[0].unit_price, Price::from_cents(5000).unwrap());
        assert_eq!(draft.total(), Price::from_cents(10_000).unwrap());
        assert_eq!(draft.shipping.first_name, "Ada");
        assert_eq!(draft.shipping.email.as_str(), "ada@example.com");
        assert_eq!(draft.payment.masked_card_number.as_str(), "****4242");
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let catalog = catalog();
        let err = OrderAssembler::new(&catalog)
            .assemble(&request(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_blank_shipping_field_rejected() {
        let catalog = catalog();
        let mut req = request(vec![item(1, 1)]);
        req.shipping_info.city = "   ".to_string();

        let err = OrderAssembler::new(&catalog).assemble(&req).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidShippingInfo { field: "city", .. }
        ));
    }

    #[tokio::test]
    async fn test_email_without_at_rejected() {
        let catalog = catalog();
        let mut req = request(vec![item(1, 1)]);
        req.shipping_info.email = "ada.example.com".to_string();

        let err = OrderAssembler::new(&catalog).assemble(&req).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidShippingInfo { field: "email", .. }
        ));
    }

    #[tokio::test]
    async fn test_short_card_rejected() {
        let catalog = catalog();
        let mut req = request(vec![item(1, 1)]);
        req.payment_info.card_number = "4242 4242 4242 42".to_string();

        let err = OrderAssembler::new(&catalog).assemble(&req).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidPaymentInfo {
                field: "cardNumber",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_bad_expiry_rejected() {
        let catalog = catalog();
        for expiry in ["1229", "13/29", "12/2029", ""] {
            let mut req = request(vec![item(1, 1)]);
            req.payment_info.expiry_date = expiry.to_string();

            let err = OrderAssembler::new(&catalog).assemble(&req).await.unwrap_err();
            assert!(
                matches!(
                    err,
                    CheckoutError::InvalidPaymentInfo {
                        field: "expiryDate",
                        ..
                    }
                ),
                "expiry {expiry:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected() {
        let catalog = catalog();
        for quantity in [0, -3] {
            let err = OrderAssembler::new(&catalog)
                .assemble(&request(vec![item(1, quantity)]))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CheckoutError::InvalidQuantity { quantity: q, .. } if q == quantity
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let catalog = catalog();
        let err = OrderAssembler::new(&catalog)
            .assemble(&request(vec![item(1, 1), item(99, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == ProductId::new(99)));
    }

    #[tokio::test]
    async fn test_duplicate_lines_merged_in_first_seen_order() {
        let catalog = catalog();
        let draft = OrderAssembler::new(&catalog)
            .assemble(&request(vec![item(2, 1), item(1, 1), item(2, 2)]))
            .await
            .unwrap();

        let lines: Vec<(i32, i32)> = draft
            .lines
            .iter()
            .map(|l| (l.product_id.as_i32(), l.quantity.get()))
            .collect();
        assert_eq!(lines, vec![(2, 3), (1, 1)]);
    }

    #[test]
    fn test_merged_overflow_rejected() {
        let items = [item(1, i64::from(i32::MAX)), item(1, 1)];
        let err = normalize_items(&items).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidQuantity { .. }));
    }
}
