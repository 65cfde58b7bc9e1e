use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CategoryId, DomainError, DomainResult, Money, ProductId, SupplierId};

/// A product in the registry.
///
/// Attributes change through [`Product::apply_patch`]; the on-hand quantity only
/// changes through [`Product::with_quantity`], which the stock engine calls while
/// holding the product's stock lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: Option<String>,
    sku: Option<String>,
    barcode: Option<String>,
    category_id: Option<CategoryId>,
    supplier_id: Option<SupplierId>,
    price: Money,
    cost_price: Option<Money>,
    quantity: i64,
    min_stock: i64,
    unit: String,
    location: Option<String>,
    image_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: register a new product.
///
/// `opening_quantity` is not written to the product directly; the registry books it
/// through the stock engine so the ledger accounts for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub price: Money,
    #[serde(default)]
    pub cost_price: Option<Money>,
    #[serde(default)]
    pub opening_quantity: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewProduct {
    /// Minimal command: a named product with a price and nothing else.
    pub fn named(name: impl Into<String>, price: Money, occurred_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sku: None,
            barcode: None,
            category_id: None,
            supplier_id: None,
            price,
            cost_price: None,
            opening_quantity: 0,
            min_stock: 0,
            unit: None,
            location: None,
            image_url: None,
            occurred_at,
        }
    }
}

/// Command: edit product attributes. `None` leaves a field unchanged.
///
/// There is deliberately no quantity field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub price: Option<Money>,
    pub cost_price: Option<Money>,
    pub min_stock: Option<i64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }
}

fn normalized(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn ensure_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

fn ensure_price(price: Money, field: &str) -> DomainResult<()> {
    if price.is_negative() {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

fn ensure_min_stock(min_stock: i64) -> DomainResult<()> {
    if min_stock < 0 {
        return Err(DomainError::validation("min_stock cannot be negative"));
    }
    Ok(())
}

impl Product {
    /// Build a product from a creation command. The quantity starts at zero.
    pub fn create(id: ProductId, cmd: &NewProduct) -> DomainResult<Self> {
        ensure_name(&cmd.name)?;
        ensure_price(cmd.price, "price")?;
        if let Some(cost) = cmd.cost_price {
            ensure_price(cost, "cost_price")?;
        }
        ensure_min_stock(cmd.min_stock)?;
        if cmd.opening_quantity < 0 {
            return Err(DomainError::validation("opening quantity cannot be negative"));
        }

        Ok(Self {
            id,
            name: cmd.name.trim().to_string(),
            description: normalized(cmd.description.clone()),
            sku: normalized(cmd.sku.clone()),
            barcode: normalized(cmd.barcode.clone()),
            category_id: cmd.category_id,
            supplier_id: cmd.supplier_id,
            price: cmd.price,
            cost_price: cmd.cost_price,
            quantity: 0,
            min_stock: cmd.min_stock,
            unit: normalized(cmd.unit.clone()).unwrap_or_else(|| "unit".to_string()),
            location: normalized(cmd.location.clone()),
            image_url: normalized(cmd.image_url.clone()),
            is_active: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn cost_price(&self) -> Option<Money> {
        self.cost_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `0 < quantity <= min_stock`, only when a threshold is configured.
    pub fn is_low_stock(&self) -> bool {
        self.min_stock > 0 && self.quantity > 0 && self.quantity <= self.min_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity <= 0
    }

    /// Value of on-hand stock at list price (saturating).
    pub fn stock_value(&self) -> Money {
        Money::new(self.price.minor_units().saturating_mul(self.quantity))
    }

    /// Case-insensitive match on name, SKU or barcode.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [Some(self.name.as_str()), self.sku(), self.barcode()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Return a copy with the given on-hand quantity.
    ///
    /// Refuses negative quantities; this is the last line of the non-negative
    /// invariant after the stock engine's own check.
    pub fn with_quantity(&self, quantity: i64, at: DateTime<Utc>) -> DomainResult<Product> {
        if quantity < 0 {
            return Err(DomainError::InsufficientStock {
                product_id: self.id.to_string(),
                available: self.quantity,
                requested: self.quantity - quantity,
            });
        }
        let mut next = self.clone();
        next.quantity = quantity;
        next.updated_at = at;
        Ok(next)
    }

    /// Apply an attribute patch. Never touches quantity.
    pub fn apply_patch(&self, patch: &ProductPatch, at: DateTime<Utc>) -> DomainResult<Product> {
        let mut next = self.clone();
        if patch.is_empty() {
            return Ok(next);
        }

        if let Some(name) = &patch.name {
            ensure_name(name)?;
            next.name = name.trim().to_string();
        }
        if let Some(price) = patch.price {
            ensure_price(price, "price")?;
            next.price = price;
        }
        if let Some(cost) = patch.cost_price {
            ensure_price(cost, "cost_price")?;
            next.cost_price = Some(cost);
        }
        if let Some(min_stock) = patch.min_stock {
            ensure_min_stock(min_stock)?;
            next.min_stock = min_stock;
        }
        if patch.description.is_some() {
            next.description = normalized(patch.description.clone());
        }
        if patch.sku.is_some() {
            next.sku = normalized(patch.sku.clone());
        }
        if patch.barcode.is_some() {
            next.barcode = normalized(patch.barcode.clone());
        }
        if let Some(category_id) = patch.category_id {
            next.category_id = Some(category_id);
        }
        if let Some(supplier_id) = patch.supplier_id {
            next.supplier_id = Some(supplier_id);
        }
        if let Some(unit) = normalized(patch.unit.clone()) {
            next.unit = unit;
        }
        if patch.location.is_some() {
            next.location = normalized(patch.location.clone());
        }
        if patch.image_url.is_some() {
            next.image_url = normalized(patch.image_url.clone());
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }

        next.updated_at = at;
        Ok(next)
    }

    /// Soft delete: the row stays so ledger history keeps resolving.
    pub fn deactivate(&self, at: DateTime<Utc>) -> Product {
        let mut next = self.clone();
        next.is_active = false;
        next.updated_at = at;
        next
    }
}
