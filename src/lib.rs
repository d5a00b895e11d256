//! Single-restaurant shopping cart store with local persistence and change
//! subscriptions.

mod aggregate;
pub use aggregate::Aggregate;
mod cart;
pub use cart::{
    Cart, CartCommand, CartError, CartEvent, CartItem, MenuItem, RestaurantConflict,
};
mod checkout;
mod command;
mod error;
mod money;
mod snapshot;
mod storage;
mod store;

pub use checkout::{OrderSummary, PricingConfig};
pub use command::CommandContext;
pub use error::{CheckoutError, ExecuteError};
pub use money::Money;
pub use snapshot::{DEFAULT_STORAGE_KEY, load_snapshot, save_snapshot};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{AddOutcome, CartStore, CartStoreBuilder, ListenerId, PendingAdd};
