//! Typed access to the document store.
//!
//! # Responsibilities
//! - Name the collections the API operates on
//! - Keep handler code free of raw collection-name strings

pub mod models;

use mongodb::{Collection, Database};

use models::{Order, Product, User};

/// Thin façade over the selected database.
#[derive(Clone)]
pub struct Store {
    database: Database,
}

impl Store {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection("users")
    }

    pub fn products(&self) -> Collection<Product> {
        self.database.collection("products")
    }

    pub fn orders(&self) -> Collection<Order> {
        self.database.collection("orders")
    }
}
