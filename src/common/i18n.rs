// src/common/i18n.rs

// Tabela fixa de mensagens visíveis ao cliente. O idioma padrão da loja é
// italiano; qualquer idioma desconhecido cai no inglês.
const MESSAGES: &[(&str, &str, &str)] = &[
    // (código, italiano, inglês)
    ("validation_error", "Uno o più campi non sono validi.", "One or more fields are invalid."),
    ("empty_cart", "Il carrello è vuoto.", "The cart is empty."),
    (
        "missing_buyer_identity",
        "Nome e telefono sono obbligatori.",
        "Name and phone number are required.",
    ),
    (
        "missing_delivery_field",
        "Per la consegna servono via, città, citofono e orario.",
        "Delivery requires street, city, doorbell name and time.",
    ),
    ("order_not_found", "Ordine non trovato.", "Order not found."),
    ("customer_not_found", "Cliente non trovato.", "Customer not found."),
    (
        "missing_session",
        "Sessione cliente mancante (header x-session-id).",
        "Missing client session (x-session-id header).",
    ),
    (
        "coupon_daily_limit",
        "Hai già attivato un'offerta oggi. Riprova domani!",
        "You already activated an offer today. Try again tomorrow!",
    ),
    ("coupon_not_found", "Codice coupon inesistente.", "Unknown coupon code."),
    ("coupon_already_used", "Coupon già utilizzato.", "Coupon already used."),
    (
        "coupon_redemption_daily_limit",
        "Il cliente ha già usato un coupon oggi.",
        "The customer already redeemed a coupon today.",
    ),
    ("invalid_credentials", "Password non valida.", "Invalid password."),
    (
        "invalid_token",
        "Sessione amministratore non valida o scaduta.",
        "Admin session is invalid or expired.",
    ),
    ("internal_error", "Si è verificato un errore imprevisto.", "An unexpected error occurred."),
    // --- validação de campos ---
    ("required", "Campo obbligatorio.", "Required field."),
    ("invalid_email", "Email non valida.", "Invalid email."),
    ("invalid_quantity", "Quantità non valida.", "Invalid quantity."),
    ("invalid_code", "Codice non valido.", "Invalid code."),
];

pub fn translate(key: &str, lang: &str) -> String {
    let Some((_, it, en)) = MESSAGES.iter().find(|(code, _, _)| *code == key) else {
        // Sem tradução: devolve a própria chave para não esconder o problema
        return key.to_string();
    };

    match lang {
        "it" => (*it).to_string(),
        _ => (*en).to_string(),
    }
}
