//! Process wiring: configuration, services and the optional demo catalog.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockledger_core::{CategoryId, Money};
use stockledger_infra::{
    InMemoryInventoryStore, InventoryConfig, InventoryServices, InventoryStore, ServiceResult,
};
use stockledger_products::{NewProduct, Product, ProductStats};

pub struct App {
    pub config: InventoryConfig,
    pub services: InventoryServices<Arc<InMemoryInventoryStore>>,
    store: Arc<InMemoryInventoryStore>,
}

impl App {
    /// Wire the services over a fresh in-memory store and seed it if configured.
    pub fn bootstrap(config: InventoryConfig, at: DateTime<Utc>) -> anyhow::Result<Self> {
        let store = Arc::new(InMemoryInventoryStore::new());
        let app = Self {
            services: InventoryServices::with_limits(Arc::clone(&store), config.page_limits()),
            store,
            config,
        };

        if app.config.seed_demo {
            let seeded = app.seed_demo_catalog(at)?;
            tracing::info!("demo catalog seeded with {} products", seeded.len());
        }
        Ok(app)
    }

    /// Load the demo catalog, unless the store already holds products.
    pub fn seed_demo_catalog(&self, at: DateTime<Utc>) -> ServiceResult<Vec<Product>> {
        if !self.store.products()?.is_empty() {
            tracing::info!("store not empty, skipping demo catalog");
            return Ok(Vec::new());
        }

        let categories: Vec<(&str, CategoryId)> = DEMO_CATEGORIES.iter().map(|name| (*name, CategoryId::new())).collect();
        let category_of = |name: &str| categories.iter().find(|(n, _)| *n == name).map(|(_, id)| *id);

        DEMO_PRODUCTS
            .iter()
            .map(|demo| {
                let cmd = NewProduct {
                    description: Some(demo.description.to_string()),
                    sku: Some(demo.sku.to_string()),
                    category_id: category_of(demo.category),
                    cost_price: Some(Money::new(demo.cost_price)),
                    opening_quantity: demo.quantity,
                    min_stock: demo.min_stock,
                    unit: Some(demo.unit.to_string()),
                    ..NewProduct::named(demo.name, Money::new(demo.price), at)
                };
                self.services.registry.create_product(cmd)
            })
            .collect()
    }

    pub fn snapshot(&self) -> ServiceResult<Snapshot> {
        Ok(Snapshot {
            stats: self.services.registry.stats()?,
            low_stock: self.services.registry.low_stock()?,
            out_of_stock: self.services.registry.out_of_stock()?,
        })
    }
}

/// Inventory health report printed by the binary.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub stats: ProductStats,
    pub low_stock: Vec<Product>,
    pub out_of_stock: Vec<Product>,
}

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    sku: &'static str,
    category: &'static str,
    price: i64,
    cost_price: i64,
    quantity: i64,
    min_stock: i64,
    unit: &'static str,
}

const DEMO_CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Food & Beverages", "Office Supplies", "Other"];

const DEMO_PRODUCTS: [DemoProduct; 8] = [
    DemoProduct {
        name: "iPhone 15 Pro",
        description: "Latest Apple smartphone",
        sku: "SKU-001",
        category: "Electronics",
        price: 19_999_000,
        cost_price: 18_000_000,
        quantity: 25,
        min_stock: 5,
        unit: "unit",
    },
    DemoProduct {
        name: "Samsung Galaxy S24",
        description: "Samsung flagship phone",
        sku: "SKU-002",
        category: "Electronics",
        price: 15_999_000,
        cost_price: 14_000_000,
        quantity: 30,
        min_stock: 5,
        unit: "unit",
    },
    DemoProduct {
        name: "Kaos Polos Hitam",
        description: "Kaos cotton combed 30s",
        sku: "SKU-003",
        category: "Clothing",
        price: 75_000,
        cost_price: 45_000,
        quantity: 100,
        min_stock: 20,
        unit: "pcs",
    },
    DemoProduct {
        name: "Kemeja Formal Putih",
        description: "Kemeja kerja pria",
        sku: "SKU-004",
        category: "Clothing",
        price: 250_000,
        cost_price: 150_000,
        quantity: 50,
        min_stock: 10,
        unit: "pcs",
    },
    DemoProduct {
        name: "Kopi Arabica 250gr",
        description: "Kopi arabica premium",
        sku: "SKU-005",
        category: "Food & Beverages",
        price: 85_000,
        cost_price: 50_000,
        quantity: 200,
        min_stock: 30,
        unit: "pack",
    },
    DemoProduct {
        name: "Teh Celup Box",
        description: "Teh celup isi 25",
        sku: "SKU-006",
        category: "Food & Beverages",
        price: 15_000,
        cost_price: 8_000,
        quantity: 150,
        min_stock: 25,
        unit: "box",
    },
    DemoProduct {
        name: "Pulpen Pilot",
        description: "Pulpen hitam 0.5mm",
        sku: "SKU-007",
        category: "Office Supplies",
        price: 12_000,
        cost_price: 7_000,
        quantity: 500,
        min_stock: 100,
        unit: "pcs",
    },
    DemoProduct {
        name: "Buku Tulis A5",
        description: "Buku tulis 100 lembar",
        sku: "SKU-008",
        category: "Office Supplies",
        price: 8_000,
        cost_price: 4_500,
        quantity: 300,
        min_stock: 50,
        unit: "pcs",
    },
];
