use err_derive::Error;

use crate::catalog::CanteenId;

/// Requests the services refuse to carry out. Anything else that goes
/// wrong is a storage failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error(display = "unknown canteen: {}", _0)]
    UnknownCanteen(CanteenId),
    #[error(display = "menu item not found: {}", _0)]
    UnknownMenuItem(String),
    #[error(display = "order not found: {}", _0)]
    UnknownOrder(String),
    #[error(display = "menu item {} is not sold by {}", _0, _1)]
    WrongCanteen(String, CanteenId),
    #[error(display = "menu item {} is not available", _0)]
    Unavailable(String),
    #[error(display = "customer name must not be empty")]
    MissingCustomerName,
    #[error(display = "an order needs at least one item")]
    EmptyOrder,
    #[error(display = "quantity of {} must be positive", _0)]
    ZeroQuantity(String),
    #[error(display = "order total is too large")]
    TotalTooLarge,
    #[error(display = "price must be positive")]
    InvalidPrice,
    #[error(display = "username must not be empty")]
    MissingUsername,
    #[error(display = "username already taken: {}", _0)]
    UsernameTaken(String),
    #[error(display = "status of order {} kept changing underneath us", _0)]
    Contended(String),
}

impl Rejection {
    pub fn is_not_found(&self) -> bool {
        match self {
            Rejection::UnknownCanteen(_)
            | Rejection::UnknownMenuItem(_)
            | Rejection::UnknownOrder(_) => true,
            _ => false,
        }
    }

    /// Refusals caused by other writers rather than by the request itself.
    pub fn is_conflict(&self) -> bool {
        match self {
            Rejection::Contended(_) => true,
            _ => false,
        }
    }
}
