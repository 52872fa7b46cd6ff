// The boundary presentation code talks to. Every operation reports a plain
// success flag and leaves a notification describing the outcome.

use std::{fmt::Display, sync::Arc};

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{AuthService, ProfileUpdate, User},
    availability::StayRange,
    booking::{Booking, BookingError, BookingRequest, BookingService, BookingStatus},
    cart::{Cart, CartService},
    catalog::{Catalog, Room},
    config::AppConfig,
    notify::{Classify, FailureKind, Notification, Notifier},
    order::{CheckoutDetails, Order, OrderError, OrderService, OrderStatus, OrderSummary},
    store::{FileStore, KeyValueStore},
};

pub struct Storefront {
    catalog: Arc<Catalog>,
    auth: AuthService,
    bookings: BookingService,
    orders: OrderService,
    cart: CartService,
    notifier: Notifier,
    // Token of the signed-in account on this device
    session: Mutex<Option<Uuid>>,
}

impl Storefront {
    // Production setup: JSON files under the configured data directory
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let store = FileStore::open(&config.store.data_dir).await?;
        Self::with_store(Arc::new(store), config).await
    }

    pub async fn with_store(store: Arc<dyn KeyValueStore>, config: &AppConfig) -> anyhow::Result<Self> {
        let catalog = Arc::new(Catalog::seeded());
        Ok(Self {
            auth: AuthService::load(store.clone(), config.auth.clone()).await?,
            bookings: BookingService::load(store.clone(), catalog.clone()).await?,
            orders: OrderService::load(store.clone(), config.pricing.clone()).await?,
            cart: CartService::load(store).await?,
            catalog,
            notifier: Notifier::new(),
            session: Mutex::new(None),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn notifications(&self) -> &Notifier {
        &self.notifier
    }

    // --- accounts ---

    pub async fn login(&self, email: &str, password: &str) -> bool {
        let result = self.auth.login(email, password).await;
        match self.settle(result, "Login Failed") {
            Some(session) => {
                self.notifier.push(Notification::success(
                    "Welcome back",
                    format!("Signed in as {}", session.user.name),
                ));
                self.replace_session(session.token);
                true
            }
            None => false,
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str, confirm_password: &str) -> bool {
        let result = self.auth.register(name, email, password, confirm_password).await;
        match self.settle(result, "Registration Failed") {
            Some(session) => {
                self.notifier.push(Notification::success(
                    "Account created",
                    format!("Welcome, {}", session.user.name),
                ));
                self.replace_session(session.token);
                true
            }
            None => false,
        }
    }

    pub fn logout(&self) {
        if let Some(token) = self.session.lock().take() {
            self.auth.logout(&token);
        }
    }

    // The signed-in user, if the session is still valid.
    pub async fn current_user(&self) -> Option<User> {
        let token = (*self.session.lock())?;
        match self.auth.authenticate(&token).await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "dropping stale session");
                self.session.lock().take();
                None
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current_user().await.is_some()
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> bool {
        let token = *self.session.lock();
        let Some(token) = token else {
            return self.refuse("Update Failed", "No user logged in");
        };
        let result = self.auth.update_profile(&token, update).await;
        self.settle(result, "Update Failed")
            .map(|_| {
                self.notifier.push(Notification::success(
                    "Profile updated",
                    "Your profile has been updated successfully.",
                ))
            })
            .is_some()
    }

    // --- rooms ---

    pub async fn is_available(&self, room_id: u64, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.bookings.is_available(room_id, check_in, check_out).await
    }

    // Rooms free for the whole stay; an invalid stay yields nothing
    pub async fn available_rooms(&self, check_in: NaiveDate, check_out: NaiveDate) -> Vec<Room> {
        match StayRange::new(check_in, check_out) {
            Ok(range) => self.bookings.available_rooms(&range).await,
            Err(_) => Vec::new(),
        }
    }

    pub async fn create_booking(&self, request: BookingRequest) -> bool {
        let user = self.current_user().await;
        let result = self.bookings.create_booking(user.as_ref(), request).await;
        let title = match &result {
            Err(BookingError::NotAuthenticated) => "Login Required",
            Err(BookingError::MissingField(_)) => "Missing Information",
            Err(BookingError::Unavailable { .. }) => "Room Unavailable",
            _ => "Booking Failed",
        };
        match self.settle(result, title) {
            Some(booking) => {
                self.notifier.push(Notification::success(
                    "Booking confirmed",
                    format!(
                        "{} from {} to {}, total ${:.2}",
                        booking.room.name, booking.check_in_date, booking.check_out_date, booking.total_price
                    ),
                ));
                true
            }
            None => false,
        }
    }

    // Guests cancel their own bookings; admins can cancel any
    pub async fn cancel_booking(&self, id: u64) -> bool {
        let Some(user) = self.current_user().await else {
            return self.refuse("Login Required", BookingError::NotAuthenticated);
        };

        let result = match self.bookings.get(id).await {
            None => Err(BookingError::NotFound(id)),
            Some(b) if b.user_id != user.id && !user.is_admin() => Err(BookingError::NotOwner(id)),
            Some(_) => self.bookings.cancel_booking(id).await,
        };
        self.settle(result, "Error")
            .map(|_| {
                self.notifier.push(Notification::success(
                    "Booking cancelled",
                    "Your booking has been cancelled successfully.",
                ))
            })
            .is_some()
    }

    pub async fn my_bookings(&self, status: Option<BookingStatus>) -> Vec<Booking> {
        match self.current_user().await {
            Some(user) => self.bookings.bookings_for_user(user.id, status).await,
            None => Vec::new(),
        }
    }

    // --- food cart ---

    pub async fn add_to_cart(&self, item_id: u64, quantity: u32) -> bool {
        let Some(item) = self.catalog.food_by_id(item_id).cloned() else {
            return self.refuse("Not Found", format!("Menu item {item_id} not found"));
        };
        let name = item.name.clone();
        let result = self.cart.add(item, quantity).await;
        match self.settle(result, "Cart Error") {
            Some(true) => {
                self.notifier.push(Notification::success(
                    "Added to cart",
                    format!("{quantity} x {name} added to your cart"),
                ));
                true
            }
            Some(false) => self.refuse("Cart Error", format!("Cannot add {quantity} x {name} to your cart")),
            None => false,
        }
    }

    pub async fn remove_from_cart(&self, item_id: u64) -> bool {
        let result = self.cart.remove(item_id).await;
        self.settle(result, "Cart Error").unwrap_or(false)
    }

    pub async fn update_cart_quantity(&self, item_id: u64, quantity: u32) -> bool {
        let result = self.cart.update_quantity(item_id, quantity).await;
        self.settle(result, "Cart Error").unwrap_or(false)
    }

    pub async fn clear_cart(&self) -> bool {
        let result = self.cart.clear().await;
        self.settle(result, "Cart Error").is_some()
    }

    pub async fn cart(&self) -> Cart {
        self.cart.snapshot().await
    }

    pub async fn cart_summary(&self) -> OrderSummary {
        self.orders.summary(&self.cart.snapshot().await)
    }

    // --- orders ---

    // Places an order for the current cart. On success the ordered lines leave the
    // cart; items added while the order was being placed stay.
    pub async fn create_order(&self, details: CheckoutDetails) -> bool {
        let user = self.current_user().await;
        let cart = self.cart.snapshot().await;
        let result = self.orders.create_order(user.as_ref(), &cart, details).await;
        let title = match &result {
            Err(OrderError::MissingField(_)) => "Missing Information",
            Err(OrderError::MissingCardDetails) => "Missing Payment Information",
            Err(OrderError::InvalidCardNumber) => "Invalid Card Number",
            Err(OrderError::NotAuthenticated) => "Login Required",
            _ => "Order Failed",
        };
        let Some(order) = self.settle(result, title) else {
            return false;
        };

        if let Err(e) = self.cart.remove_ordered(&order.items).await {
            warn!(order_id = order.id, error = %e, "order placed but cart not updated");
        }
        self.notifier.push(Notification::success(
            "Order placed",
            format!("Order #{} total ${:.2}", order.id, order.total_amount),
        ));
        true
    }

    // Customers cancel their own pending orders; admins can cancel any pending order
    pub async fn cancel_order(&self, id: u64) -> bool {
        let Some(user) = self.current_user().await else {
            return self.refuse("Login Required", OrderError::NotAuthenticated);
        };

        let result = match self.orders.get(id).await {
            None => Err(OrderError::NotFound(id)),
            Some(o) if o.user_id != user.id && !user.is_admin() => Err(OrderError::NotOwner(id)),
            Some(_) => self.orders.cancel_order(id).await,
        };
        let title = match &result {
            Err(OrderError::NotCancellable { .. }) => "Unable to cancel",
            _ => "Error",
        };
        self.settle(result, title)
            .map(|_| {
                self.notifier.push(Notification::success(
                    "Order cancelled",
                    "Your order has been cancelled successfully.",
                ))
            })
            .is_some()
    }

    // Kitchen staff move orders along; requires an admin session
    pub async fn update_order_status(&self, id: u64, status: OrderStatus) -> bool {
        let result = match self.current_user().await {
            Some(user) if user.is_admin() => self.orders.update_order_status(id, status).await,
            Some(_) => Err(OrderError::NotPermitted),
            None => Err(OrderError::NotAuthenticated),
        };
        self.settle(result, "Update Failed")
            .map(|order| {
                self.notifier.push(Notification::success(
                    "Order updated",
                    format!("Order #{} is now {}", order.id, order.status),
                ))
            })
            .is_some()
    }

    pub async fn my_orders(&self, status: Option<OrderStatus>) -> Vec<Order> {
        match self.current_user().await {
            Some(user) => self.orders.orders_for_user(user.id, status).await,
            None => Vec::new(),
        }
    }

    // --- helpers ---

    fn replace_session(&self, token: Uuid) {
        if let Some(previous) = self.session.lock().replace(token) {
            self.auth.logout(&previous);
        }
    }

    // Turns a service result into an option, raising a failure notification on error
    fn settle<T, E>(&self, result: Result<T, E>, title: &str) -> Option<T>
    where
        E: Classify + Display,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let kind = e.kind();
                warn!(?kind, error = %e, "{title}");
                let description = match kind {
                    FailureKind::Internal => "Something went wrong. Please try again.".to_string(),
                    _ => e.to_string(),
                };
                self.notifier.push(Notification::failure(title, description));
                None
            }
        }
    }

    fn refuse(&self, title: &str, reason: impl Display) -> bool {
        self.notifier.push(Notification::failure(title, reason.to_string()));
        false
    }
}
