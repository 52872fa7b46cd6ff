// Hotel and restaurant storefront: room bookings, a food cart and orders

pub mod auth;
pub mod availability;
pub mod booking;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod notify;
pub mod order;
pub mod store;
pub mod storefront;
pub mod telemetry;

// Re-export key types for convenience
pub use auth::{AuthError, AuthService, ProfileUpdate, Role, Session, User};
pub use availability::{is_room_available, stay_price, StayRange};
pub use booking::{Booking, BookingError, BookingRequest, BookingService, BookingStatus};
pub use cart::{Cart, CartItem, CartService};
pub use catalog::{Catalog, FoodItem, Room, RoomType};
pub use config::AppConfig;
pub use notify::{FailureKind, Notification, Notifier};
pub use order::{CheckoutDetails, Order, OrderError, OrderService, OrderStatus, PaymentMethod};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use storefront::Storefront;
