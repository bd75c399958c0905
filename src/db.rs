pub mod coupon_repo;
pub use coupon_repo::{CouponStore, PgCouponRepository};
pub mod customer_repo;
pub use customer_repo::{CustomerStore, PgCustomerRepository};
pub mod order_repo;
pub use order_repo::{OrderStore, PgOrderRepository};
pub mod kv_store;
pub use kv_store::{FileKvStore, KeyValueStore, MemoryKvStore};
pub mod memory;
pub use memory::{MemoryCouponStore, MemoryCustomerStore, MemoryOrderStore};
