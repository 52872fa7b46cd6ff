// Food cart kept between visits

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    availability::round_cents,
    catalog::FoodItem,
    store::{load_collection, save_collection, KeyValueStore, StoreError, CART_KEY},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub item: FoodItem,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.item.price * self.quantity as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // Adding an item already in the cart bumps its quantity. Returns false,
    // leaving the cart untouched, for a zero quantity or one that would overflow the line.
    pub fn add(&mut self, item: FoodItem, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        match self.items.iter_mut().find(|line| line.item.id == item.id) {
            Some(line) => match line.quantity.checked_add(quantity) {
                Some(total) => line.quantity = total,
                None => return false,
            },
            None => self.items.push(CartItem { item, quantity }),
        }
        true
    }

    pub fn remove(&mut self, item_id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.item.id != item_id);
        self.items.len() != before
    }

    // A quantity of zero drops the line
    pub fn update_quantity(&mut self, item_id: u64, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(item_id);
        }
        match self.items.iter_mut().find(|line| line.item.id == item_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    // Takes the ordered quantities back out, keeping anything added since the snapshot
    pub fn remove_ordered(&mut self, ordered: &[CartItem]) -> bool {
        let mut changed = false;
        for placed in ordered {
            if let Some(line) = self.items.iter_mut().find(|line| line.item.id == placed.item.id) {
                line.quantity = line.quantity.saturating_sub(placed.quantity);
                changed = true;
            }
        }
        self.items.retain(|line| line.quantity > 0);
        changed
    }

    pub fn subtotal(&self) -> f64 {
        round_cents(self.items.iter().map(CartItem::line_total).sum())
    }

    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

pub struct CartService {
    store: Arc<dyn KeyValueStore>,
    cart: Mutex<Cart>,
}

impl CartService {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let items: Vec<CartItem> = load_collection(store.as_ref(), CART_KEY).await?;
        Ok(Self {
            store,
            cart: Mutex::new(Cart::from_items(items)),
        })
    }

    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    // Ok(false) when the cart refused the quantity
    pub async fn add(&self, item: FoodItem, quantity: u32) -> Result<bool, StoreError> {
        debug!(item_id = item.id, quantity, "add to cart");
        self.mutate(|cart| cart.add(item, quantity)).await
    }

    pub async fn remove(&self, item_id: u64) -> Result<bool, StoreError> {
        self.mutate(|cart| cart.remove(item_id)).await
    }

    pub async fn update_quantity(&self, item_id: u64, quantity: u32) -> Result<bool, StoreError> {
        self.mutate(|cart| cart.update_quantity(item_id, quantity)).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|cart| {
            cart.clear();
            true
        })
        .await
        .map(|_| ())
    }

    pub async fn remove_ordered(&self, ordered: &[CartItem]) -> Result<bool, StoreError> {
        self.mutate(|cart| cart.remove_ordered(ordered)).await
    }

    // Applies `change` and persists; the cart is restored if the write fails
    async fn mutate<F>(&self, change: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Cart) -> bool,
    {
        let mut cart = self.cart.lock().await;
        let previous = cart.clone();
        if !change(&mut *cart) {
            return Ok(false);
        }
        if let Err(e) = save_collection(self.store.as_ref(), CART_KEY, cart.items()).await {
            *cart = previous;
            return Err(e);
        }
        Ok(true)
    }
}
