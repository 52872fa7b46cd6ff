// Food orders: checkout validation, pricing and the delivery status progression

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::{
    auth::User,
    availability::round_cents,
    cart::{Cart, CartItem},
    config::PricingConfig,
    notify::{Classify, FailureKind},
    store::{load_collection, save_collection, IdGenerator, KeyValueStore, StoreError, ORDERS_KEY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    // Pending -> Preparing -> Delivered, and Pending -> Cancelled
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Preparing)
                | (OrderStatus::Preparing, OrderStatus::Delivered)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Cash,
    Card,
}

// Card details are format-checked only; nothing is charged or stored
#[derive(Debug, Clone, Default)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvc: String,
}

#[derive(Debug, Clone)]
pub enum PaymentMethod {
    Cash,
    Card(CardDetails),
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentKind {
        match self {
            PaymentMethod::Cash => PaymentKind::Cash,
            PaymentMethod::Card(_) => PaymentKind::Card,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub payment: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub total: f64,
}

impl OrderSummary {
    pub fn for_subtotal(subtotal: f64, pricing: &PricingConfig) -> Self {
        let tax = round_cents(subtotal * pricing.tax_rate);
        Self {
            subtotal,
            delivery_fee: pricing.delivery_fee,
            tax,
            total: round_cents(subtotal + pricing.delivery_fee + tax),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub items: Vec<CartItem>,
    pub total_amount: f64,
    pub address: String,
    pub phone: String,
    pub payment_method: PaymentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Orders for delivery require a minimum purchase of ${minimum:.2} (cart is ${subtotal:.2})")]
    BelowMinimum { subtotal: f64, minimum: f64 },

    #[error("Please login to place an order")]
    NotAuthenticated,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Please enter your card details")]
    MissingCardDetails,

    #[error("Please enter a valid 16-digit card number")]
    InvalidCardNumber,

    #[error("Order {0} not found")]
    NotFound(u64),

    #[error("Order {id} is {status} and cannot be cancelled")]
    NotCancellable { id: u64, status: OrderStatus },

    #[error("Order {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: u64,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order {0} belongs to another customer")]
    NotOwner(u64),

    #[error("Only staff can update order status")]
    NotPermitted,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Classify for OrderError {
    fn kind(&self) -> FailureKind {
        match self {
            OrderError::NotFound(_)
            | OrderError::NotCancellable { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::NotOwner(_)
            | OrderError::NotPermitted => FailureKind::State,
            OrderError::Storage(_) => FailureKind::Internal,
            _ => FailureKind::Validation,
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::MissingField(field));
    }
    Ok(())
}

fn validate_card(card: &CardDetails) -> Result<(), OrderError> {
    if card.number.trim().is_empty() || card.expiry.trim().is_empty() || card.cvc.trim().is_empty() {
        return Err(OrderError::MissingCardDetails);
    }
    let digits: String = card.number.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(OrderError::InvalidCardNumber);
    }
    Ok(())
}

pub struct OrderService {
    store: Arc<dyn KeyValueStore>,
    pricing: PricingConfig,
    orders: Mutex<Vec<Order>>,
    ids: IdGenerator,
}

impl OrderService {
    pub async fn load(store: Arc<dyn KeyValueStore>, pricing: PricingConfig) -> Result<Self, StoreError> {
        let orders: Vec<Order> = load_collection(store.as_ref(), ORDERS_KEY).await?;
        let max_id = orders.iter().map(|o| o.id).max().unwrap_or(0);
        info!(orders = orders.len(), "order service loaded");

        Ok(Self {
            store,
            pricing,
            orders: Mutex::new(orders),
            ids: IdGenerator::starting_after(max_id),
        })
    }

    pub fn summary(&self, cart: &Cart) -> OrderSummary {
        OrderSummary::for_subtotal(cart.subtotal(), &self.pricing)
    }

    // Validates the checkout and stores a `Pending` order for the cart contents.
    #[instrument(skip_all)]
    pub async fn create_order(
        &self,
        requester: Option<&User>,
        cart: &Cart,
        details: CheckoutDetails,
    ) -> Result<Order, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let summary = self.summary(cart);
        if summary.subtotal < self.pricing.minimum_subtotal {
            return Err(OrderError::BelowMinimum {
                subtotal: summary.subtotal,
                minimum: self.pricing.minimum_subtotal,
            });
        }

        let user = requester.ok_or(OrderError::NotAuthenticated)?;

        required(&details.name, "name")?;
        required(&details.email, "email")?;
        required(&details.phone, "phone")?;
        required(&details.address, "address")?;
        if let PaymentMethod::Card(card) = &details.payment {
            validate_card(card)?;
        }

        let order = Order {
            id: self.ids.next_id(),
            user_id: user.id,
            items: cart.items().to_vec(),
            total_amount: summary.total,
            address: details.address.trim().to_string(),
            phone: details.phone.trim().to_string(),
            payment_method: details.payment.kind(),
            notes: details.notes.filter(|n| !n.trim().is_empty()),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let mut orders = self.orders.lock().await;
        orders.push(order.clone());
        if let Err(e) = save_collection(self.store.as_ref(), ORDERS_KEY, orders.as_slice()).await {
            orders.pop();
            return Err(e.into());
        }

        info!(order_id = order.id, user_id = user.id, total = order.total_amount, "order placed");
        Ok(order)
    }

    // Cancels an order that the kitchen has not started on.
    pub async fn cancel_order(&self, id: u64) -> Result<Order, OrderError> {
        let mut orders = self.orders.lock().await;
        let index = orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(OrderError::NotFound(id))?;

        let status = orders[index].status;
        if status != OrderStatus::Pending {
            warn!(order_id = id, %status, "cancel refused");
            return Err(OrderError::NotCancellable { id, status });
        }

        self.set_status(&mut orders, index, OrderStatus::Cancelled).await
    }

    pub async fn update_order_status(&self, id: u64, next: OrderStatus) -> Result<Order, OrderError> {
        let mut orders = self.orders.lock().await;
        let index = orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(OrderError::NotFound(id))?;

        let from = orders[index].status;
        if !from.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { id, from, to: next });
        }

        self.set_status(&mut orders, index, next).await
    }

    async fn set_status(
        &self,
        orders: &mut Vec<Order>,
        index: usize,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        let previous = orders[index].status;
        orders[index].status = next;
        if let Err(e) = save_collection(self.store.as_ref(), ORDERS_KEY, orders.as_slice()).await {
            orders[index].status = previous;
            return Err(e.into());
        }

        info!(order_id = orders[index].id, from = %previous, to = %next, "order status changed");
        Ok(orders[index].clone())
    }

    pub async fn get(&self, id: u64) -> Option<Order> {
        self.orders.lock().await.iter().find(|o| o.id == id).cloned()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.orders.lock().await.clone()
    }

    pub async fn orders_for_user(&self, user_id: u64, status: Option<OrderStatus>) -> Vec<Order> {
        self.orders
            .lock()
            .await
            .iter()
            .filter(|o| o.user_id == user_id)
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::Role, catalog::Catalog, store::MemoryStore};

    fn customer() -> User {
        User {
            id: 2,
            name: "Test User".into(),
            email: "user@example.com".into(),
            role: Role::User,
            phone: Some("123-456-7890".into()),
            address: Some("123 Main St, City".into()),
        }
    }

    fn cart_with(lines: &[(u64, u32)]) -> Cart {
        let catalog = Catalog::seeded();
        let mut cart = Cart::default();
        for &(id, quantity) in lines {
            cart.add(catalog.food_by_id(id).unwrap().clone(), quantity);
        }
        cart
    }

    fn details(payment: PaymentMethod) -> CheckoutDetails {
        CheckoutDetails {
            name: "Test User".into(),
            email: "user@example.com".into(),
            phone: "123-456-7890".into(),
            address: "123 Main St, City".into(),
            payment,
            notes: None,
        }
    }

    async fn service() -> OrderService {
        OrderService::load(Arc::new(MemoryStore::new()), PricingConfig::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_status_progression() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));

        assert!(!Preparing.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Preparing));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_summary_adds_fee_and_tax() {
        let summary = OrderSummary::for_subtotal(20.00, &PricingConfig::default());
        assert_eq!(summary.delivery_fee, 3.00);
        assert_eq!(summary.tax, 2.00);
        assert_eq!(summary.total, 25.00);
    }

    #[tokio::test]
    async fn test_create_order_totals_and_persists() {
        let service = service().await;
        // 2 x 16.99 = 33.98, tax 3.40, fee 3.00
        let cart = cart_with(&[(6, 2)]);

        let order = service
            .create_order(Some(&customer()), &cart, details(PaymentMethod::Cash))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 40.38);
        assert_eq!(order.payment_method, PaymentKind::Cash);
        assert_eq!(service.orders_for_user(2, None).await, vec![order]);
    }

    #[tokio::test]
    async fn test_checkout_validation() {
        let service = service().await;
        let user = customer();

        let err = service
            .create_order(Some(&user), &Cart::default(), details(PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EmptyCart));

        let err = service
            .create_order(Some(&user), &cart_with(&[(11, 1)]), details(PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::BelowMinimum { .. }));

        let cart = cart_with(&[(5, 1)]);
        let err = service
            .create_order(None, &cart, details(PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotAuthenticated));

        let mut no_address = details(PaymentMethod::Cash);
        no_address.address.clear();
        let err = service.create_order(Some(&user), &cart, no_address).await.unwrap_err();
        assert!(matches!(err, OrderError::MissingField("address")));

        let err = service
            .create_order(Some(&user), &cart, details(PaymentMethod::Card(CardDetails::default())))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::MissingCardDetails));

        let short_card = CardDetails {
            number: "4242 4242 4242".into(),
            expiry: "12/30".into(),
            cvc: "123".into(),
        };
        let err = service
            .create_order(Some(&user), &cart, details(PaymentMethod::Card(short_card)))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidCardNumber));

        assert!(service.orders().await.is_empty());

        let card = CardDetails {
            number: "4242 4242 4242 4242".into(),
            expiry: "12/30".into(),
            cvc: "123".into(),
        };
        let order = service
            .create_order(Some(&user), &cart, details(PaymentMethod::Card(card)))
            .await
            .unwrap();
        assert_eq!(order.payment_method, PaymentKind::Card);
    }

    #[tokio::test]
    async fn test_cancel_only_pending_orders() {
        let service = service().await;
        let user = customer();
        let cart = cart_with(&[(4, 2)]);

        let pending = service
            .create_order(Some(&user), &cart, details(PaymentMethod::Cash))
            .await
            .unwrap();
        let preparing = service
            .create_order(Some(&user), &cart, details(PaymentMethod::Cash))
            .await
            .unwrap();
        service
            .update_order_status(preparing.id, OrderStatus::Preparing)
            .await
            .unwrap();

        let err = service.cancel_order(preparing.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::NotCancellable { status: OrderStatus::Preparing, .. }
        ));
        assert_eq!(err.kind(), FailureKind::State);

        let cancelled = service.cancel_order(pending.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(service.cancel_order(pending.id).await.is_err());
        assert!(matches!(service.cancel_order(1).await, Err(OrderError::NotFound(1))));
    }

    #[tokio::test]
    async fn test_update_status_follows_progression() {
        let service = service().await;
        let order = service
            .create_order(Some(&customer()), &cart_with(&[(7, 1)]), details(PaymentMethod::Cash))
            .await
            .unwrap();

        let err = service
            .update_order_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        service.update_order_status(order.id, OrderStatus::Preparing).await.unwrap();
        let delivered = service
            .update_order_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        let filtered = service
            .orders_for_user(2, Some(OrderStatus::Delivered))
            .await;
        assert_eq!(filtered.len(), 1);
        assert!(service
            .orders_for_user(2, Some(OrderStatus::Pending))
            .await
            .is_empty());
    }
}
