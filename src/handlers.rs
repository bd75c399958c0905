pub mod admin;
pub mod cart;
pub mod coupons;
pub mod loyalty;
pub mod orders;
pub mod profile;
