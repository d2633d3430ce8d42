//! Exchange asset code <-> standard asset code translation.

use std::collections::HashMap;

/// Static exception table for one exchange. Keys are exchange codes, values
/// the standard codes. Codes without an exception map to themselves.
#[derive(Debug, Clone, Default)]
pub struct SymbolTranslator {
    to_standard: HashMap<String, String>,
    to_exchange: HashMap<String, String>,
}

impl SymbolTranslator {
    pub fn new<'a>(exceptions: impl IntoIterator<Item = (&'a str, &'a str)>) -> SymbolTranslator {
        let mut translator = SymbolTranslator::default();
        for (exchange_code, standard_code) in exceptions {
            let exchange_code = exchange_code.to_uppercase();
            let standard_code = standard_code.to_uppercase();
            translator
                .to_exchange
                .entry(standard_code.clone())
                .or_insert_with(|| exchange_code.clone());
            translator.to_standard.insert(exchange_code, standard_code);
        }
        translator
    }

    pub fn to_standard_code(&self, exchange_code: &str) -> String {
        let code = exchange_code.to_uppercase();
        match self.to_standard.get(&code) {
            Some(standard) => standard.clone(),
            None => code,
        }
    }

    pub fn to_exchange_code(&self, standard_code: &str) -> String {
        let code = standard_code.to_uppercase();
        match self.to_exchange.get(&code) {
            Some(exchange) => exchange.clone(),
            None => code,
        }
    }

    pub fn is_exception(&self, exchange_code: &str) -> bool {
        self.to_standard.contains_key(&exchange_code.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraken_like() -> SymbolTranslator {
        SymbolTranslator::new([("XXBT", "BTC"), ("ZUSD", "USD"), ("XXDG", "XDG")])
    }

    #[test]
    fn maps_both_directions() {
        let t = kraken_like();
        assert_eq!(t.to_standard_code("xxbt"), "BTC");
        assert_eq!(t.to_exchange_code("btc"), "XXBT");
        assert_eq!(t.to_exchange_code("USD"), "ZUSD");
    }

    #[test]
    fn unmapped_codes_round_trip() {
        let t = kraken_like();
        for code in ["ADA", "DOT", "USDT", "LINK"] {
            assert_eq!(t.to_exchange_code(&t.to_standard_code(code)), code);
        }
    }

    #[test]
    fn separator_placeholder_maps_to_empty() {
        let t = SymbolTranslator::new([("-", "")]);
        assert_eq!(t.to_standard_code("-"), "");
        assert_eq!(t.to_exchange_code(""), "-");
        assert_eq!(t.to_standard_code("eth"), "ETH");
    }
}
