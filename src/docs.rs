// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Cart ---
        handlers::cart::get_cart,
        handlers::cart::get_count,
        handlers::cart::add_item,
        handlers::cart::update_quantity,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,

        // --- Profile ---
        handlers::profile::get_profile,
        handlers::profile::save_profile,
        handlers::profile::delete_profile,
        handlers::profile::seen_promotions,
        handlers::profile::mark_promotion_seen,

        // --- Orders ---
        handlers::orders::submit_whatsapp,
        handlers::orders::call_shop,

        // --- Loyalty ---
        handlers::loyalty::my_account,
        handlers::loyalty::get_account,

        // --- Coupons ---
        handlers::coupons::activate_offer,

        // --- Admin ---
        handlers::admin::login,
        handlers::admin::logout,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_status,
        handlers::loyalty::bulk_sync,
        handlers::loyalty::flush_cache,
        handlers::loyalty::invalidate_cache_entry,
        handlers::loyalty::unlink,
        handlers::coupons::redeem,
    ),
    components(
        schemas(
            // --- Cardápio / carrinho ---
            models::menu::ProductCategory,
            models::menu::Product,
            models::menu::ModificationCategory,
            models::menu::Modification,
            models::cart::CartItem,
            models::cart::Cart,
            models::cart::CartCount,
            handlers::cart::AddCartItemPayload,
            handlers::cart::UpdateQuantityPayload,

            // --- Perfil ---
            models::profile::BuyerProfile,

            // --- Pedidos ---
            models::order::OrderStatus,
            models::order::OrderSource,
            models::order::Fulfillment,
            models::order::PaymentMethod,
            models::order::BuyerIdentity,
            models::order::DeliveryDetails,
            models::order::ModificationSnapshot,
            models::order::OrderLine,
            models::order::Order,
            models::order::CheckoutRequest,
            models::order::Dispatch,
            handlers::orders::UpdateStatusPayload,

            // --- Fidelidade ---
            models::loyalty::CustomerProfile,
            models::loyalty::LoyaltyTier,
            models::loyalty::SyncStatus,
            models::loyalty::LoyaltyAccount,
            models::loyalty::BulkSyncFailure,
            models::loyalty::BulkSyncReport,
            handlers::loyalty::CacheInvalidation,

            // --- Cupons ---
            models::coupon::CouponStatus,
            models::coupon::Coupon,
            models::coupon::ActivateOfferPayload,
            models::coupon::ActivatedCoupon,
            models::coupon::RedeemCouponPayload,
            models::coupon::RedemptionOutcome,

            // --- Admin ---
            models::admin::AdminLoginPayload,
            models::admin::AuthResponse,
        )
    ),
    tags(
        (name = "Cart", description = "Carrinho da sessão"),
        (name = "Profile", description = "Perfil do comprador e promoções vistas"),
        (name = "Orders", description = "Envio de pedidos (WhatsApp / telefone)"),
        (name = "Loyalty", description = "Pontos de fidelidade (CRM externo)"),
        (name = "Coupons", description = "Ativação de ofertas"),
        (name = "Admin", description = "Painel da pizzaria")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
