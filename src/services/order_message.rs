// src/services/order_message.rs

use std::fmt::Write;

use rust_decimal::Decimal;

use crate::{
    models::order::{Fulfillment, NewOrder},
    services::pricing::format_eur,
};

// =============================================================================
//  TEXTO DO PEDIDO (enviado para a pizzaria via WhatsApp)
// =============================================================================

/// Resumo legível do pedido, em italiano (é o que a pizzaria lê no WhatsApp).
pub fn summary(order: &NewOrder) -> String {
    let mut text = String::from("🍕 *NUOVO ORDINE*\n\n");

    // `write!` em String não falha
    if let Some(buyer) = &order.buyer {
        let _ = writeln!(text, "👤 *Cliente:* {}", buyer.full_name());
        let _ = writeln!(text, "📞 *Telefono:* {}", buyer.phone.trim());
        if let Some(email) = buyer.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            let _ = writeln!(text, "📧 *Email:* {}", email);
        }
        text.push('\n');
    }

    match order.fulfillment {
        Some(Fulfillment::Delivery) => {
            text.push_str("🛵 *Consegna a domicilio*\n");
            if let Some(delivery) = &order.delivery {
                let _ = writeln!(text, "📍 {}, {}", delivery.street, delivery.city);
                let _ = writeln!(text, "🔔 Citofono: {}", delivery.doorbell);
                let _ = writeln!(text, "🕒 Orario: {}", delivery.requested_time);
            }
            text.push('\n');
        }
        Some(Fulfillment::Pickup) => text.push_str("🏃 *Ritiro in pizzeria*\n\n"),
        None => {}
    }

    text.push_str("*Ordine:*\n");
    for line in &order.lines {
        let line_total = line.unit_price * Decimal::from(line.quantity);
        let _ = writeln!(text, "• {}x {} ({})", line.quantity, line.name, format_eur(line_total));
        for modification in &line.modifications {
            let _ = writeln!(text, "   + {}", modification.name);
        }
        if let Some(notes) = &line.notes {
            let _ = writeln!(text, "   📝 {}", notes);
        }
    }

    let _ = write!(text, "\n💰 *Totale: {}*", format_eur(order.total));

    if let Some(payment) = order.payment_method {
        let _ = write!(text, "\n💳 Pagamento: {}", payment.label());
    }
    if let Some(notes) = order.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let _ = write!(text, "\n🗒️ Note: {}", notes);
    }

    text
}

// =============================================================================
//  DEEP LINKS
// =============================================================================

/// `https://wa.me/<número>?text=<mensagem codificada>`. O wa.me só aceita
/// dígitos no número (sem '+', espaços ou traços).
pub fn whatsapp_link(number: &str, text: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!("https://wa.me/{}?text={}", digits, urlencoding::encode(text))
}

/// `tel:+39...` para o discador do aparelho.
pub fn phone_link(number: &str) -> String {
    let dialable: String = number
        .chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '+'))
        .map(|(_, c)| c)
        .collect();
    format!("tel:{}", dialable)
}
