/// Ordered set of tracked currency codes
use std::collections::HashSet;

use crate::error::{FxError, Result};

#[derive(Debug, Clone)]
pub struct TrackedCurrencies {
    ordered: Vec<String>,
    lookup: HashSet<String>,
}

impl TrackedCurrencies {
    /// Build from configured codes, keeping first-occurrence order
    pub fn new<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered = Vec::new();
        let mut lookup = HashSet::new();

        for code in codes {
            let code = code.as_ref().trim();
            if !is_currency_code(code) {
                return Err(FxError::InvalidParameter(format!(
                    "'{}' is not a three-letter currency code",
                    code
                )));
            }
            if lookup.insert(code.to_string()) {
                ordered.push(code.to_string());
            }
        }

        if ordered.is_empty() {
            return Err(FxError::InvalidParameter(
                "tracked currency list is empty".to_string(),
            ));
        }

        Ok(TrackedCurrencies { ordered, lookup })
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lookup.contains(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_order_and_drops_repeats() {
        let tracked = TrackedCurrencies::new(["USD", "JPY", "USD", "GBP"]).unwrap();
        assert_eq!(tracked.iter().collect::<Vec<_>>(), vec!["USD", "JPY", "GBP"]);
        assert_eq!(tracked.len(), 3);
        assert!(tracked.contains("JPY"));
        assert!(!tracked.contains("EUR"));
    }

    #[test]
    fn test_rejects_bad_codes() {
        assert!(TrackedCurrencies::new(["usd"]).is_err());
        assert!(TrackedCurrencies::new(["US"]).is_err());
        assert!(TrackedCurrencies::new(Vec::<String>::new()).is_err());
    }
}
