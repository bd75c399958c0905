// src/services/pricing.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::cart::CartItem;

// Funções puras de preço. Toda a aritmética é em `Decimal`, o arredondamento
// para 2 casas acontece só na exibição.

/// Preço base do produto + soma dos extras.
pub fn unit_price(item: &CartItem) -> Decimal {
    item.product.price + item.modifications.iter().map(|m| m.price).sum::<Decimal>()
}

pub fn line_total(item: &CartItem) -> Decimal {
    unit_price(item) * Decimal::from(item.quantity)
}

pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(line_total).sum()
}

// Ex: 14 -> "€14.00"
pub fn format_eur(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("€{:.2}", rounded)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal::Decimal;

    use crate::models::{
        cart::CartItem,
        menu::{Modification, ModificationCategory, Product, ProductCategory},
    };

    pub fn product(id: &str, name: &str, price: Decimal) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            price,
            category: ProductCategory::Classiche,
            available: true,
            image_url: None,
        }
    }

    pub fn margherita() -> Product {
        product("margherita", "Margherita", Decimal::new(500, 2))
    }

    pub fn modification(id: &str, name: &str, price: Decimal) -> Modification {
        Modification {
            id: id.to_string(),
            name: name.to_string(),
            price,
            category: ModificationCategory::Formaggi,
            available: true,
        }
    }

    pub fn bufala() -> Modification {
        modification("bufala", "Mozzarella di Bufala", Decimal::new(200, 2))
    }

    pub fn rucola() -> Modification {
        Modification {
            category: ModificationCategory::Verdure,
            ..modification("rucola", "Rucola", Decimal::new(50, 2))
        }
    }

    pub fn item(product: Product, quantity: u32, modifications: Vec<Modification>) -> CartItem {
        CartItem {
            product,
            quantity,
            notes: None,
            modifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn margherita_with_bufala_costs_seven_each() {
        let line = item(margherita(), 2, vec![bufala()]);
        assert_eq!(unit_price(&line), Decimal::new(700, 2));
        assert_eq!(line_total(&line), Decimal::new(1400, 2));
        assert_eq!(cart_total(&[line]), Decimal::new(1400, 2));
    }

    #[test]
    fn cart_total_is_order_independent() {
        let a = item(margherita(), 1, vec![]);
        let b = item(margherita(), 1, vec![rucola()]);
        let c = item(product("diavola", "Diavola", Decimal::new(650, 2)), 3, vec![bufala()]);

        let forward = cart_total(&[a.clone(), b.clone(), c.clone()]);
        let backward = cart_total(&[c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward, Decimal::new(3600, 2));
    }

    #[test]
    fn repeated_small_extras_do_not_drift() {
        let extras: Vec<_> = (0..30)
            .map(|i| modification(&format!("m{i}"), "Extra", Decimal::new(10, 2)))
            .collect();
        let line = item(product("base", "Base", Decimal::new(10, 2)), 10, extras);
        assert_eq!(line_total(&line), Decimal::new(3100, 2));
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn formats_two_decimal_places() {
        assert_eq!(format_eur(Decimal::new(14, 0)), "€14.00");
        assert_eq!(format_eur(Decimal::new(10505, 3)), "€10.51");
    }
}
