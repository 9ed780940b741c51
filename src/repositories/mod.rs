//! Query helpers over sea-orm. Every function takes the connection to run on
//! so services can compose them inside one transaction.

pub mod cart_repository;
pub mod catalog_repository;
pub mod order_repository;
pub mod payment_repository;
pub mod user_repository;

pub use cart_repository::CartRepository;
pub use catalog_repository::CatalogRepository;
pub use order_repository::{OrderRepository, OrderWithItems, SellerOrderLine};
pub use payment_repository::PaymentRepository;
pub use user_repository::UserRepository;
