//! Order pricing shown on the cart and checkout pages.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::money::Money;

/// Fees added on top of the cart subtotal.
///
/// # Examples
///
/// ```
/// use cartfold::{Money, PricingConfig};
///
/// let pricing = PricingConfig {
///     service_fee_percent: 15,
///     ..PricingConfig::default()
/// };
/// assert_eq!(pricing.delivery_fee, Money::from_cents(399));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat delivery fee per order.
    ///
    /// Default: 3.99.
    pub delivery_fee: Money,

    /// Service fee as a percentage of the subtotal, rounded half-up to the
    /// cent.
    ///
    /// Default: 10.
    pub service_fee_percent: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_fee: Money::from_cents(399),
            service_fee_percent: 10,
        }
    }
}

/// Priced breakdown of a non-empty cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub items: Vec<CartItem>,
    pub item_count: u64,
    /// Sum of line totals.
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    /// `subtotal + delivery_fee + service_fee`.
    pub total: Money,
}

impl OrderSummary {
    /// Price `cart` under `pricing`. Returns `None` for an empty cart.
    pub fn from_cart(cart: &Cart, pricing: &PricingConfig) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        let subtotal = cart.total();
        let service_fee = subtotal.percent(pricing.service_fee_percent);
        Some(Self {
            restaurant_id: cart.restaurant_id.clone()?,
            restaurant_name: cart.restaurant_name.clone().unwrap_or_default(),
            items: cart.items.clone(),
            item_count: cart.item_count(),
            subtotal,
            delivery_fee: pricing.delivery_fee,
            service_fee,
            total: subtotal + pricing.delivery_fee + service_fee,
        })
    }
}
