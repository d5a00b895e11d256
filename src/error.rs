//! Crate-level error types for cart mutations and checkout.

use crate::cart::CartError;

/// Error returned when executing a command against the cart fails.
///
/// In both cases the in-memory cart is left exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// Command rejected by cart logic.
    ///
    /// In practice this is a cross-restaurant add whose confirmation no
    /// longer matches the cart.
    #[error(transparent)]
    Domain(#[from] CartError),

    /// The new cart could not be written to local storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by [`CartStore::checkout`](crate::CartStore::checkout).
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// There is nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Checkout needs a signed-in user.
    #[error("sign in required to check out")]
    SignInRequired,

    /// Clearing the cart after checkout failed.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        Self::Execute(ExecuteError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::RestaurantConflict;

    #[test]
    fn execute_error_domain_displays_inner() {
        let err = ExecuteError::from(CartError::InvalidState("broken".into()));
        assert_eq!(err.to_string(), "invalid cart state: broken");
    }

    #[test]
    fn execute_error_conflict_names_both_restaurants() {
        let err = ExecuteError::from(CartError::RestaurantConflict(RestaurantConflict {
            current_id: "1".into(),
            current_name: "Luigi's".into(),
            requested_id: "2".into(),
            requested_name: "Ramen Bar".into(),
        }));
        let msg = err.to_string();
        assert!(msg.contains("'1'") && msg.contains("'2'"), "got: {msg}");
    }

    #[test]
    fn execute_error_io_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = ExecuteError::from(io_err);
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn checkout_error_io_wraps_execute() {
        let io_err = std::io::Error::other("disk full");
        let err = CheckoutError::from(io_err);
        assert!(matches!(err, CheckoutError::Execute(ExecuteError::Io(_))));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn checkout_error_display() {
        assert_eq!(CheckoutError::EmptyCart.to_string(), "cart is empty");
        assert_eq!(
            CheckoutError::SignInRequired.to_string(),
            "sign in required to check out"
        );
    }

    // Errors cross thread boundaries when a view hands the store to a
    // background task.
    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<ExecuteError>();
            assert_send_sync::<CheckoutError>();
        }
    };
}
