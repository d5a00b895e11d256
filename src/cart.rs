//! Cart aggregate -- the items a customer is about to order.
//!
//! A cart only ever holds items from one restaurant. The restaurant is set by
//! the first item and cleared when the last item leaves. Adding an item from
//! a different restaurant is refused unless the caller explicitly authorizes
//! discarding the current restaurant's items.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::Money;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A menu item offered for adding to the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Menu item identifier, unique within a cart.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Display-only image reference.
    #[serde(default)]
    pub image_url: String,
    /// Restaurant offering the item.
    pub restaurant_id: String,
    /// Display name of the restaurant offering the item.
    pub restaurant_name: String,
}

impl MenuItem {
    /// Create a menu item with no image.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        restaurant_id: impl Into<String>,
        restaurant_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image_url: String::new(),
            restaurant_id: restaurant_id.into(),
            restaurant_name: restaurant_name.into(),
        }
    }

    /// Set the image reference.
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }
}

/// A line in the cart: a menu item and how many of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    /// Always at least 1.
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
    pub restaurant_id: String,
    pub restaurant_name: String,
}

impl CartItem {
    fn from_menu_item(item: MenuItem, quantity: u32) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            quantity,
            image_url: item.image_url,
            restaurant_id: item.restaurant_id,
            restaurant_name: item.restaurant_name,
        }
    }

    /// `price * quantity`.
    pub fn line_total(&self) -> Money {
        self.price.times(u64::from(self.quantity))
    }
}

/// The cart.
///
/// Serializes to the persisted record
/// `{"items": [...], "restaurantId": ..., "restaurantName": ...}`. Missing
/// fields decode as empty so older or partial records still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in insertion order, unique by `id`.
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Owning restaurant; `None` iff `items` is empty.
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub restaurant_name: Option<String>,
}

impl Cart {
    /// Whether the cart holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by menu item id.
    pub fn item(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Sum of `price * quantity` over all lines.
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities over all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// The conflict adding `item` would cause, if the cart belongs to a
    /// different restaurant.
    pub fn conflict_with(&self, item: &MenuItem) -> Option<RestaurantConflict> {
        if self.is_empty() {
            return None;
        }
        let current_id = self.restaurant_id.as_deref()?;
        (current_id != item.restaurant_id).then(|| RestaurantConflict {
            current_id: current_id.to_owned(),
            current_name: self.restaurant_name.clone().unwrap_or_default(),
            requested_id: item.restaurant_id.clone(),
            requested_name: item.restaurant_name.clone(),
        })
    }

    fn item_mut(&mut self, id: &str) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    fn reset(&mut self) {
        self.items.clear();
        self.restaurant_id = None;
        self.restaurant_name = None;
    }
}

/// A cross-restaurant add awaiting the customer's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantConflict {
    /// Restaurant whose items are in the cart.
    pub current_id: String,
    pub current_name: String,
    /// Restaurant of the item being added.
    pub requested_id: String,
    pub requested_name: String,
}

impl RestaurantConflict {
    /// Confirmation prompt naming both restaurants.
    pub fn message(&self) -> String {
        format!(
            "Your cart contains items from {}. Would you like to clear your cart \
             and add items from {} instead?",
            self.current_name, self.requested_name
        )
    }
}

impl fmt::Display for RestaurantConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cart holds items from restaurant '{}', cannot add from '{}'",
            self.current_id, self.requested_id
        )
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands accepted by the [`Cart`] aggregate.
#[derive(Debug, Clone)]
pub enum CartCommand {
    /// Add one of `item`.
    ///
    /// `discard` names the restaurant whose items the customer agreed to
    /// throw away. It only takes effect when it matches the cart's current
    /// restaurant.
    AddItem {
        item: MenuItem,
        discard: Option<String>,
    },
    /// Remove a line entirely.
    RemoveItem { id: String },
    /// Set a line's quantity; zero or below removes the line.
    UpdateQuantity { id: String, quantity: i64 },
    /// Empty the cart.
    Clear,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Domain events produced by the [`Cart`] aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// All lines and the restaurant were dropped.
    Cleared,
    /// The cart now belongs to this restaurant.
    RestaurantSelected {
        restaurant_id: String,
        restaurant_name: String,
    },
    /// A new line with quantity 1.
    ItemAdded { item: CartItem },
    /// An existing line gained one unit.
    QuantityIncremented { id: String },
    QuantitySet { id: String, quantity: u32 },
    /// A line was removed; removing the last line also drops the restaurant.
    ItemRemoved { id: String },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from [`CartCommand`] handling and cart validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The item belongs to another restaurant and discarding the current
    /// cart was not authorized.
    #[error("{0}")]
    RestaurantConflict(RestaurantConflict),
    /// A cart that violates its invariants (e.g. read back from storage).
    #[error("invalid cart state: {0}")]
    InvalidState(String),
}

// ---------------------------------------------------------------------------
// Aggregate impl
// ---------------------------------------------------------------------------

impl Aggregate for Cart {
    type Command = CartCommand;
    type DomainEvent = CartEvent;
    type Error = CartError;

    fn handle(&self, cmd: CartCommand) -> Result<Vec<CartEvent>, CartError> {
        match cmd {
            CartCommand::AddItem { item, discard } => {
                let mut events = Vec::new();
                let mut starts_empty = self.is_empty();

                if let Some(conflict) = self.conflict_with(&item) {
                    if discard.as_deref() != Some(conflict.current_id.as_str()) {
                        return Err(CartError::RestaurantConflict(conflict));
                    }
                    events.push(CartEvent::Cleared);
                    starts_empty = true;
                }

                if starts_empty {
                    events.push(CartEvent::RestaurantSelected {
                        restaurant_id: item.restaurant_id.clone(),
                        restaurant_name: item.restaurant_name.clone(),
                    });
                }

                if !starts_empty && self.item(&item.id).is_some() {
                    events.push(CartEvent::QuantityIncremented { id: item.id });
                } else {
                    events.push(CartEvent::ItemAdded {
                        item: CartItem::from_menu_item(item, 1),
                    });
                }
                Ok(events)
            }
            CartCommand::RemoveItem { id } => {
                if self.item(&id).is_none() {
                    return Ok(vec![]);
                }
                Ok(vec![CartEvent::ItemRemoved { id }])
            }
            CartCommand::UpdateQuantity { id, quantity } => {
                let Some(current) = self.item(&id) else {
                    return Ok(vec![]);
                };
                if quantity <= 0 {
                    return Ok(vec![CartEvent::ItemRemoved { id }]);
                }
                let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                if current.quantity == quantity {
                    return Ok(vec![]);
                }
                Ok(vec![CartEvent::QuantitySet { id, quantity }])
            }
            CartCommand::Clear => {
                if self.is_empty() && self.restaurant_id.is_none() {
                    return Ok(vec![]);
                }
                Ok(vec![CartEvent::Cleared])
            }
        }
    }

    fn apply(mut self, event: &CartEvent) -> Self {
        match event {
            CartEvent::Cleared => self.reset(),
            CartEvent::RestaurantSelected {
                restaurant_id,
                restaurant_name,
            } => {
                self.restaurant_id = Some(restaurant_id.clone());
                self.restaurant_name = Some(restaurant_name.clone());
            }
            CartEvent::ItemAdded { item } => self.items.push(item.clone()),
            CartEvent::QuantityIncremented { id } => {
                if let Some(item) = self.item_mut(id) {
                    item.quantity = item.quantity.saturating_add(1);
                }
            }
            CartEvent::QuantitySet { id, quantity } => {
                if let Some(item) = self.item_mut(id) {
                    item.quantity = *quantity;
                }
            }
            CartEvent::ItemRemoved { id } => {
                self.items.retain(|item| item.id != *id);
                if self.items.is_empty() {
                    self.reset();
                }
            }
        }
        self
    }

    fn validate(&self) -> Result<(), CartError> {
        if self.restaurant_id.is_some() != self.restaurant_name.is_some() {
            return Err(CartError::InvalidState(
                "restaurant id and name must be set together".into(),
            ));
        }

        let Some(restaurant_id) = self.restaurant_id.as_deref() else {
            if self.items.is_empty() {
                return Ok(());
            }
            return Err(CartError::InvalidState(
                "items present without a restaurant".into(),
            ));
        };
        if self.items.is_empty() {
            return Err(CartError::InvalidState(
                "restaurant set on an empty cart".into(),
            ));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if item.restaurant_id != restaurant_id {
                return Err(CartError::InvalidState(format!(
                    "item '{}' belongs to restaurant '{}', cart belongs to '{restaurant_id}'",
                    item.id, item.restaurant_id
                )));
            }
            if item.quantity == 0 {
                return Err(CartError::InvalidState(format!(
                    "item '{}' has zero quantity",
                    item.id
                )));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(CartError::InvalidState(format!(
                    "duplicate item '{}'",
                    item.id
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
