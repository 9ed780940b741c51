// Account lifecycle
pub mod users;

// Catalog and shopping
pub mod cart;
pub mod catalog;

// Orders and hosted checkout
pub mod checkout;
pub mod orders;
pub mod reference;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::{CheckoutOutcome, CheckoutService};
pub use orders::OrderService;
pub use users::UserService;
