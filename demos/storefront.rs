//! Walk through a storefront session against a file-backed cart.
//!
//! Run with: `cargo run --example storefront`

use cartfold::{AddOutcome, CartStore, CommandContext, FileStorage, MenuItem, Money};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use a temporary directory as the device's local storage.
    let tmp = tempfile::tempdir()?;
    let store = CartStore::open(FileStorage::new(tmp.path()));

    // The navigation badge follows every change.
    store.add_listener(|cart| println!("badge: {}", cart.item_count()));

    let margherita = MenuItem::new(
        "item1",
        "Margherita Pizza",
        Money::from_cents(1299),
        "1",
        "Pizza Palace",
    );
    let garlic_knots = MenuItem::new(
        "item2",
        "Garlic Knots",
        Money::from_cents(599),
        "1",
        "Pizza Palace",
    );
    let tonkotsu = MenuItem::new(
        "item9",
        "Tonkotsu Ramen",
        Money::from_cents(1600),
        "2",
        "Ramen House",
    );

    store.add_item(margherita.clone(), |_| true)?;
    store.add_item(margherita, |_| true)?;
    store.add_item(garlic_knots, |_| true)?;
    println!("cart total: {}", store.cart_total());

    // A different restaurant: the customer says no.
    let outcome = store.add_item(tonkotsu.clone(), |conflict| {
        println!("prompt: {}", conflict.message());
        false
    })?;
    assert_eq!(outcome, AddOutcome::Cancelled);

    // The cart page bumps the garlic knots, then drops them.
    store.update_quantity("item2", 3)?;
    store.remove_item("item2")?;

    // A fresh process sees the same cart.
    let reopened = CartStore::open(FileStorage::new(tmp.path()));
    assert_eq!(reopened.snapshot(), store.snapshot());

    if let Some(summary) = store.order_summary() {
        println!(
            "subtotal {} + delivery {} + service {} = {}",
            summary.subtotal, summary.delivery_fee, summary.service_fee, summary.total
        );
    }

    let summary = store.checkout(&CommandContext::default().with_actor("demo-user"))?;
    println!(
        "ordered {} item(s) from {} for {}",
        summary.item_count, summary.restaurant_name, summary.total
    );

    // Now the ramen goes in without a prompt.
    store.add_item(tonkotsu, |_| unreachable!("cart is empty"))?;
    assert_eq!(store.restaurant_id().as_deref(), Some("2"));

    println!("all assertions passed");
    Ok(())
}
