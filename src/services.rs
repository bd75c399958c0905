pub mod admin_auth;
pub mod cart_service;
pub mod client_storage;
pub mod coupon_service;
pub mod loyalty;
pub mod order_message;
pub mod order_service;
pub mod pricing;
