//! Checkout handlers.

mod errors;
mod start_checkout;

pub use errors::CheckoutError;
pub use start_checkout::{
    CheckoutSessionInitiator, CheckoutSettings, CheckoutStarted, StartCheckoutCommand,
};
