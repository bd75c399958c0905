// src/services/cart_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        cart::{Cart, CartItem},
        menu::{Modification, Product},
    },
    services::{client_storage::ClientStorage, pricing},
};

// Separador usado quando duas adições da mesma linha trazem observações
pub const NOTES_SEPARATOR: &str = " | ";

// Teto por linha; o badge e os totais nunca estouram
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Produto + IDs dos extras ordenados, comparados campo a campo.
pub type LineKey = (String, Vec<String>);

// =============================================================================
//  OPERAÇÕES PURAS (carrinho entra, carrinho novo sai)
// =============================================================================

/// Chave de identidade de uma linha: produto + IDs dos extras ordenados.
/// As observações não fazem parte da chave.
pub fn line_key(product_id: &str, modifications: &[Modification]) -> LineKey {
    let mut ids: Vec<String> = modifications.iter().map(|m| m.id.clone()).collect();
    ids.sort_unstable();
    ids.dedup();
    (product_id.to_string(), ids)
}

fn item_key(item: &CartItem) -> LineKey {
    line_key(&item.product.id, &item.modifications)
}

// Monta o carrinho sempre recalculando o total do zero
fn with_items(items: Vec<CartItem>) -> Cart {
    let total = pricing::cart_total(&items);
    Cart { items, total }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn merge_notes(current: Option<String>, incoming: Option<String>) -> Option<String> {
    match (current, incoming) {
        (Some(current), Some(incoming)) => Some(format!("{current}{NOTES_SEPARATOR}{incoming}")),
        (current, None) => current,
        (None, incoming) => incoming,
    }
}

// Extras são um conjunto: repetições do mesmo ID são descartadas
fn unique_modifications(modifications: Vec<Modification>) -> Vec<Modification> {
    let mut unique: Vec<Modification> = Vec::with_capacity(modifications.len());
    for modification in modifications {
        if !unique.iter().any(|m| m.id == modification.id) {
            unique.push(modification);
        }
    }
    unique
}

/// Adiciona um produto. Se já existir uma linha com a mesma chave, soma a
/// quantidade e concatena as observações; senão cria uma linha nova.
/// Quantidade zero é tratada como 1 e nenhuma linha passa de `MAX_LINE_QUANTITY`.
pub fn add_item(
    cart: &Cart,
    product: Product,
    quantity: u32,
    notes: Option<String>,
    modifications: Vec<Modification>,
) -> Cart {
    let quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
    let notes = clean_notes(notes);
    let modifications = unique_modifications(modifications);
    let key = line_key(&product.id, &modifications);

    let mut items = cart.items.clone();
    match items.iter_mut().find(|item| item_key(item) == key) {
        Some(existing) => {
            existing.quantity = existing.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            existing.notes = merge_notes(existing.notes.take(), notes);
        }
        None => items.push(CartItem {
            product,
            quantity,
            notes,
            modifications,
        }),
    }

    with_items(items)
}

/// Quantidade <= 0 remove a linha. Índice fora do carrinho não altera nada.
pub fn update_quantity(cart: &Cart, index: usize, new_quantity: i64) -> Cart {
    if new_quantity <= 0 {
        return remove_item(cart, index);
    }
    if index >= cart.items.len() {
        tracing::debug!("Índice {} fora do carrinho ({} linhas), ignorando", index, cart.items.len());
        return cart.clone();
    }

    let quantity = u32::try_from(new_quantity)
        .unwrap_or(MAX_LINE_QUANTITY)
        .min(MAX_LINE_QUANTITY);
    let mut items = cart.items.clone();
    if let Some(item) = items.get_mut(index) {
        item.quantity = quantity;
    }
    with_items(items)
}

/// Remove a linha do índice. Índice fora do carrinho não altera nada.
pub fn remove_item(cart: &Cart, index: usize) -> Cart {
    if index >= cart.items.len() {
        tracing::debug!("Índice {} fora do carrinho ({} linhas), ignorando", index, cart.items.len());
        return cart.clone();
    }

    let mut items = cart.items.clone();
    items.remove(index);
    with_items(items)
}

/// Soma das quantidades (badge do carrinho).
pub fn item_count(cart: &Cart) -> u32 {
    // Carrinhos antigos no armazenamento podem trazer qualquer quantidade
    cart.items
        .iter()
        .fold(0_u32, |count, item| count.saturating_add(item.quantity))
}

// =============================================================================
//  SERVIÇO (operação pura + gravação na sessão)
// =============================================================================

#[derive(Clone)]
pub struct CartService {
    storage: ClientStorage,
}

impl CartService {
    pub fn new(storage: ClientStorage) -> Self {
        Self { storage }
    }

    pub fn cart(&self, session: Uuid) -> Cart {
        self.storage.load_cart(session)
    }

    pub fn item_count(&self, session: Uuid) -> u32 {
        item_count(&self.cart(session))
    }

    // Cada mutação grava o resultado antes de retornar
    fn mutate(&self, session: Uuid, op: impl FnOnce(&Cart) -> Cart) -> Result<Cart, AppError> {
        let current = self.storage.load_cart(session);
        let next = op(&current);
        self.storage.save_cart(session, &next)?;
        Ok(next)
    }

    pub fn add_item(
        &self,
        session: Uuid,
        product: Product,
        quantity: u32,
        notes: Option<String>,
        modifications: Vec<Modification>,
    ) -> Result<Cart, AppError> {
        self.mutate(session, |cart| add_item(cart, product, quantity, notes, modifications))
    }

    pub fn update_quantity(&self, session: Uuid, index: usize, quantity: i64) -> Result<Cart, AppError> {
        self.mutate(session, |cart| update_quantity(cart, index, quantity))
    }

    pub fn remove_item(&self, session: Uuid, index: usize) -> Result<Cart, AppError> {
        self.mutate(session, |cart| remove_item(cart, index))
    }

    pub fn clear(&self, session: Uuid) -> Result<Cart, AppError> {
        self.storage.clear_cart(session)?;
        Ok(Cart::default())
    }
}
