pub mod admin;
pub mod cart;
pub mod coupon;
pub mod loyalty;
pub mod menu;
pub mod order;
pub mod profile;
