//! The cart store: one authoritative cart shared by every view.
//!
//! A [`CartStore`] is opened via [`CartStoreBuilder`], which picks the
//! storage backend, the storage key, and the checkout pricing. On open the
//! store restores the cart saved under that key, falling back to an empty
//! cart when nothing usable is stored.
//!
//! Every mutation runs the same pipeline while holding the write lock:
//! decide events with [`Aggregate::handle`], fold them into a candidate
//! state, persist the candidate, and only then commit it and publish it to
//! subscribers. A failed write leaves the in-memory cart untouched.

use std::fmt;
use std::io;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use tokio::sync::watch;

use crate::aggregate::Aggregate;
use crate::cart::{Cart, CartCommand, CartEvent, CartItem, MenuItem, RestaurantConflict};
use crate::checkout::{OrderSummary, PricingConfig};
use crate::command::CommandContext;
use crate::error::{CheckoutError, ExecuteError};
use crate::money::Money;
use crate::snapshot::{DEFAULT_STORAGE_KEY, load_snapshot, save_snapshot};
use crate::storage::{KeyValueStorage, MemoryStorage};

/// Callback invoked with the new cart after every successful mutation.
type Listener = Arc<dyn Fn(&Cart) + Send + Sync>;

/// Identifies a listener registered with [`CartStore::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

/// How a confirmed-or-not [`CartStore::add_item`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The item is in the cart.
    Added,
    /// The customer declined to discard the other restaurant's items.
    /// Nothing changed.
    Cancelled,
}

/// Shared handle to the cart.
///
/// Each view (menu, cart page, checkout page, navigation badge) holds its own
/// clone; all clones see the same cart. `Clone` is cheap -- all internal
/// state is `Arc`-wrapped.
///
/// # Examples
///
/// ```
/// use cartfold::{CartStore, MemoryStorage, MenuItem, Money};
///
/// let store = CartStore::open(MemoryStorage::new());
/// let pizza = MenuItem::new("item1", "Margherita", Money::from_cents(1299), "1", "Luigi's");
///
/// store.add_item(pizza.clone(), |_| true).unwrap();
/// store.add_item(pizza, |_| true).unwrap();
///
/// assert_eq!(store.item_count(), 2);
/// assert_eq!(store.cart_total(), Money::from_cents(2598));
/// ```
#[derive(Clone)]
pub struct CartStore {
    state: Arc<RwLock<Cart>>,
    storage: Arc<dyn KeyValueStorage>,
    storage_key: Arc<str>,
    pricing: PricingConfig,
    changes: Arc<watch::Sender<Cart>>,
    listeners: Arc<RwLock<ListenerRegistry>>,
}

// Manual `Debug` because the storage backend and listeners are trait objects.
impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("storage_key", &self.storage_key)
            .field("pricing", &self.pricing)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a builder for configuring a [`CartStore`].
    pub fn builder() -> CartStoreBuilder {
        CartStoreBuilder::new()
    }

    /// Open a store over `storage` with the default key and pricing.
    pub fn open(storage: impl KeyValueStorage) -> Self {
        CartStoreBuilder::new().storage(storage).open()
    }

    // -- mutations ----------------------------------------------------------

    /// Run a command against the cart.
    ///
    /// A command that produces no events (unknown id, unchanged quantity,
    /// clearing an empty cart) is a no-op: nothing is written and nobody is
    /// notified.
    ///
    /// # Returns
    ///
    /// The events that were applied.
    ///
    /// # Errors
    ///
    /// - [`ExecuteError::Domain`] if the cart rejects the command.
    /// - [`ExecuteError::Io`] if the new cart cannot be persisted.
    pub fn execute(
        &self,
        cmd: CartCommand,
        ctx: &CommandContext,
    ) -> Result<Vec<CartEvent>, ExecuteError> {
        self.transact(ctx, |cart| {
            tracing::debug!(command = ?cmd, "handling command");
            let events = cart.handle(cmd)?;
            Ok::<_, ExecuteError>((events.clone(), events))
        })
    }

    /// Start adding one of `item`, returning a pending operation the caller
    /// must [`proceed`](PendingAdd::proceed) with or
    /// [`cancel`](PendingAdd::cancel).
    ///
    /// If the cart holds another restaurant's items,
    /// [`PendingAdd::conflict`] describes what proceeding would discard, so
    /// the view can ask the customer first.
    pub fn request_add(&self, item: MenuItem) -> PendingAdd {
        let conflict = self.read().conflict_with(&item);
        PendingAdd {
            store: self.clone(),
            item,
            conflict,
        }
    }

    /// Add one of `item`, asking `confirm` before discarding another
    /// restaurant's items.
    ///
    /// `confirm` is only called when there is a conflict. Returning `false`
    /// aborts the whole operation with no state change.
    ///
    /// # Errors
    ///
    /// See [`execute`](CartStore::execute).
    pub fn add_item(
        &self,
        item: MenuItem,
        confirm: impl FnOnce(&RestaurantConflict) -> bool,
    ) -> Result<AddOutcome, ExecuteError> {
        let pending = self.request_add(item);
        if pending.conflict().is_some_and(|conflict| !confirm(conflict)) {
            pending.cancel();
            return Ok(AddOutcome::Cancelled);
        }
        pending.proceed()?;
        Ok(AddOutcome::Added)
    }

    /// Remove the line for `id`. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Io`] if the new cart cannot be persisted.
    pub fn remove_item(&self, id: &str) -> Result<(), ExecuteError> {
        let cmd = CartCommand::RemoveItem { id: id.to_owned() };
        self.execute(cmd, &CommandContext::default()).map(drop)
    }

    /// Set the quantity of the line for `id`.
    ///
    /// Zero or below removes the line; values above `u32::MAX` saturate.
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Io`] if the new cart cannot be persisted.
    pub fn update_quantity(&self, id: &str, quantity: i64) -> Result<(), ExecuteError> {
        let cmd = CartCommand::UpdateQuantity {
            id: id.to_owned(),
            quantity,
        };
        self.execute(cmd, &CommandContext::default()).map(drop)
    }

    /// Empty the cart and forget its restaurant.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Io`] if the new cart cannot be persisted.
    pub fn clear_cart(&self) -> Result<(), ExecuteError> {
        self.execute(CartCommand::Clear, &CommandContext::default())
            .map(drop)
    }

    /// Price the cart and empty it, as the final step of placing an order.
    ///
    /// Submitting the order anywhere is the caller's business; the store
    /// only hands back what was ordered.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::SignInRequired`] if `ctx` has no actor.
    /// - [`CheckoutError::EmptyCart`] if there is nothing to order.
    /// - [`CheckoutError::Execute`] if the emptied cart cannot be persisted;
    ///   the cart is left as it was.
    pub fn checkout(&self, ctx: &CommandContext) -> Result<OrderSummary, CheckoutError> {
        if !ctx.is_signed_in() {
            tracing::debug!("checkout refused: no signed-in user");
            return Err(CheckoutError::SignInRequired);
        }

        let summary = self.transact(ctx, |cart| {
            let summary =
                OrderSummary::from_cart(cart, &self.pricing).ok_or(CheckoutError::EmptyCart)?;
            let events = cart.handle(CartCommand::Clear).map_err(ExecuteError::from)?;
            Ok::<_, CheckoutError>((events, summary))
        })?;

        tracing::info!(
            restaurant_id = %summary.restaurant_id,
            total = %summary.total,
            "checked out"
        );
        Ok(summary)
    }

    // -- queries ------------------------------------------------------------

    /// A copy of the current cart.
    pub fn snapshot(&self) -> Cart {
        self.read().clone()
    }

    /// The current lines, in insertion order.
    pub fn items(&self) -> Vec<CartItem> {
        self.read().items.clone()
    }

    /// The restaurant the cart belongs to, if any.
    pub fn restaurant_id(&self) -> Option<String> {
        self.read().restaurant_id.clone()
    }

    pub fn restaurant_name(&self) -> Option<String> {
        self.read().restaurant_name.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sum of `price * quantity`; zero for an empty cart.
    pub fn cart_total(&self) -> Money {
        self.read().total()
    }

    /// Sum of quantities; zero for an empty cart.
    pub fn item_count(&self) -> u64 {
        self.read().item_count()
    }

    /// The priced breakdown of the cart, or `None` when it is empty.
    pub fn order_summary(&self) -> Option<OrderSummary> {
        OrderSummary::from_cart(&self.read(), &self.pricing)
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// The storage key the cart is persisted under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    // -- observation --------------------------------------------------------

    /// Watch the cart.
    ///
    /// The receiver starts at the current cart and is updated after every
    /// successful mutation. Async views can await
    /// [`changed`](watch::Receiver::changed); sync views can poll
    /// [`borrow`](watch::Receiver::borrow).
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.changes.subscribe()
    }

    /// Register a callback invoked with the new cart after every successful
    /// mutation.
    ///
    /// Callbacks run on the mutating thread after the store's lock is
    /// released, so they may read from (or mutate) the store.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Cart) + Send + Sync + 'static,
    {
        let mut registry = self.listeners.write().expect("listener RwLock poisoned");
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(listener)));
        id
    }

    /// Unregister a callback. Returns `false` if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registry = self.listeners.write().expect("listener RwLock poisoned");
        let before = registry.entries.len();
        registry.entries.retain(|(entry, _)| *entry != id);
        registry.entries.len() != before
    }

    // -- internals ----------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, Cart> {
        self.state.read().expect("cart state RwLock poisoned")
    }

    /// Decide, persist, commit, notify.
    ///
    /// `decide` sees the current cart and returns the events to apply plus
    /// a value handed back to the caller. The write lock is held from the
    /// decision until the commit.
    fn transact<T, E>(
        &self,
        ctx: &CommandContext,
        decide: impl FnOnce(&Cart) -> Result<(Vec<CartEvent>, T), E>,
    ) -> Result<T, E>
    where
        E: From<io::Error>,
    {
        let _span = tracing::debug_span!(
            "execute",
            actor = ?ctx.actor,
            correlation_id = ?ctx.correlation_id,
        )
        .entered();

        let mut state = self.state.write().expect("cart state RwLock poisoned");
        let (events, output) = decide(&*state)?;
        if events.is_empty() {
            tracing::debug!("command produced no events");
            return Ok(output);
        }

        let next = state.clone().fold(&events);
        if let Err(e) = save_snapshot(self.storage.as_ref(), &self.storage_key, &next) {
            tracing::error!(
                key = %self.storage_key,
                error = %e,
                "failed to persist cart; change discarded"
            );
            return Err(e.into());
        }

        *state = next.clone();
        self.changes.send_replace(next.clone());
        drop(state);

        tracing::info!(
            count = events.len(),
            item_count = next.item_count(),
            "events applied"
        );
        self.notify(&next);
        Ok(output)
    }

    fn notify(&self, cart: &Cart) {
        let listeners: Vec<Listener> = {
            let registry = self.listeners.read().expect("listener RwLock poisoned");
            registry
                .entries
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        for listener in listeners {
            listener(cart);
        }
    }
}

/// An add waiting for the customer's decision.
///
/// Created by [`CartStore::request_add`]. Nothing changes until
/// [`proceed`](PendingAdd::proceed) is called; dropping it (or calling
/// [`cancel`](PendingAdd::cancel)) abandons the add.
#[must_use = "a pending add does nothing until `proceed` is called"]
#[derive(Debug)]
pub struct PendingAdd {
    store: CartStore,
    item: MenuItem,
    conflict: Option<RestaurantConflict>,
}

impl PendingAdd {
    /// What proceeding would discard, if the cart belongs to another
    /// restaurant.
    pub fn conflict(&self) -> Option<&RestaurantConflict> {
        self.conflict.as_ref()
    }

    /// The item being added.
    pub fn item(&self) -> &MenuItem {
        &self.item
    }

    /// Apply the add, discarding the conflicting restaurant's items if there
    /// was a conflict.
    ///
    /// Only the restaurant shown in [`conflict`](PendingAdd::conflict) may be
    /// discarded. If the cart has since moved to yet another restaurant, or
    /// a conflict appeared after the request, the add is rejected and the
    /// cart is left alone.
    ///
    /// # Errors
    ///
    /// - [`ExecuteError::Domain`] if the confirmation is stale.
    /// - [`ExecuteError::Io`] if the new cart cannot be persisted.
    pub fn proceed(self) -> Result<Vec<CartEvent>, ExecuteError> {
        let discard = self.conflict.map(|conflict| conflict.current_id);
        let cmd = CartCommand::AddItem {
            item: self.item,
            discard,
        };
        self.store.execute(cmd, &CommandContext::default())
    }

    /// Abandon the add.
    pub fn cancel(self) {
        tracing::debug!(item_id = %self.item.id, "add cancelled");
    }
}

/// Builder for configuring and opening a [`CartStore`].
///
/// # Examples
///
/// ```
/// use cartfold::{CartStore, MemoryStorage, PricingConfig};
///
/// let store = CartStore::builder()
///     .storage(MemoryStorage::new())
///     .storage_key("cart-guest")
///     .pricing(PricingConfig::default())
///     .open();
/// assert!(store.is_empty());
/// assert_eq!(store.storage_key(), "cart-guest");
/// ```
pub struct CartStoreBuilder {
    storage: Option<Arc<dyn KeyValueStorage>>,
    storage_key: String,
    pricing: PricingConfig,
}

impl Default for CartStoreBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            pricing: PricingConfig::default(),
        }
    }
}

impl CartStoreBuilder {
    /// Create a builder with in-memory storage, key `"cart"`, and default
    /// pricing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage backend.
    pub fn storage(mut self, storage: impl KeyValueStorage) -> Self {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(storage);
        self.storage = Some(storage);
        self
    }

    /// Set the key the cart is persisted under.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the fees used by [`CartStore::order_summary`] and
    /// [`CartStore::checkout`].
    pub fn pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    /// Restore the saved cart and build the store.
    ///
    /// Never fails: an empty slot, a corrupt document, or a storage read
    /// error all start the store with an empty cart.
    pub fn open(self) -> CartStore {
        let storage: Arc<dyn KeyValueStorage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::new()),
        };

        let cart = match load_snapshot::<Cart>(storage.as_ref(), &self.storage_key) {
            Ok(Some(cart)) => {
                tracing::debug!(
                    key = %self.storage_key,
                    item_count = cart.item_count(),
                    "restored cart"
                );
                cart
            }
            Ok(None) => Cart::default(),
            Err(e) => {
                tracing::error!(
                    key = %self.storage_key,
                    error = %e,
                    "failed to read stored cart; starting empty"
                );
                Cart::default()
            }
        };

        let (changes, _) = watch::channel(cart.clone());
        CartStore {
            state: Arc::new(RwLock::new(cart)),
            storage,
            storage_key: Arc::from(self.storage_key),
            pricing: self.pricing,
            changes: Arc::new(changes),
            listeners: Arc::new(RwLock::new(ListenerRegistry::default())),
        }
    }
}
