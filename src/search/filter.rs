//! Allow-list filter restricting results to Mexican retailers.

use tracing::{debug, info};
use url::Url;

use super::provider::RawResult;

/// Major Mexican retailers, matched as substrings of the lowercase merchant name.
const MEXICAN_STORES: &[&str] = &[
    "walmart",
    "bodega aurrera",
    "superama",
    "sams club",
    "sam's",
    "soriana",
    "chedraui",
    "la comer",
    "city market",
    "heb",
    "costco",
    "mercado libre",
    "amazon.com.mx",
    "liverpool",
    "palacio de hierro",
    "coppel",
    "elektra",
    "sanborns",
    "7-eleven",
    "oxxo",
    "farmacias guadalajara",
    "farmacia del ahorro",
    "benavides",
    "fresko",
    "city club",
    "smart",
    "alsuper",
];

/// Non-Mexican top-level domains.
const BLOCKED_TLDS: &[&str] = &[".es", ".fr", ".de", ".uk", ".eu"];

/// URL fragments that identify European pharmacy resellers.
const BLOCKED_MARKERS: &[&str] = &["valencia", "parafarmacia", "farmacia-"];

/// Outcome of checking a single result against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVerdict {
    Mexican,
    BlockedDomain,
    UnknownStore,
}

/// Classify one result by URL and merchant name.
pub fn classify(result: &RawResult) -> StoreVerdict {
    let url = result.url.to_lowercase();
    let host = Url::parse(&url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));

    let blocked_tld = match &host {
        Some(h) => BLOCKED_TLDS.iter().any(|tld| h.ends_with(tld)),
        None => BLOCKED_TLDS.iter().any(|tld| url.contains(tld)),
    };
    if blocked_tld || BLOCKED_MARKERS.iter().any(|m| url.contains(m)) {
        return StoreVerdict::BlockedDomain;
    }

    let merchant = result.merchant.to_lowercase();
    let known_store = MEXICAN_STORES.iter().any(|store| merchant.contains(store));
    let mx_domain = match &host {
        Some(h) => h.ends_with(".mx"),
        None => url.contains(".com.mx"),
    };

    if known_store || mx_domain {
        StoreVerdict::Mexican
    } else {
        StoreVerdict::UnknownStore
    }
}

/// Keep only results from Mexican stores, preserving order.
pub fn filter_mexican_stores(results: Vec<RawResult>) -> Vec<RawResult> {
    let total = results.len();
    let kept: Vec<RawResult> = results
        .into_iter()
        .filter(|result| match classify(result) {
            StoreVerdict::Mexican => true,
            verdict => {
                debug!(url = %result.url, merchant = %result.merchant, ?verdict, "Dropping result");
                false
            }
        })
        .collect();

    info!(kept = kept.len(), blocked = total - kept.len(), "Filtered results to Mexican stores");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(merchant: &str, url: &str) -> RawResult {
        RawResult {
            title: "Producto".to_string(),
            price: "10.00".to_string(),
            url: url.to_string(),
            desc: None,
            merchant: merchant.to_string(),
        }
    }

    #[test]
    fn test_known_store_is_kept() {
        let r = result("Walmart", "https://www.walmart.com/ip/123");
        assert_eq!(classify(&r), StoreVerdict::Mexican);
    }

    #[test]
    fn test_mx_domain_is_kept_for_unknown_merchant() {
        let r = result("Tiendita", "https://tiendita.com.mx/producto");
        assert_eq!(classify(&r), StoreVerdict::Mexican);
    }

    #[test]
    fn test_spanish_domain_is_dropped_even_for_known_store() {
        let r = result("Costco", "https://www.costco.es/leche");
        assert_eq!(classify(&r), StoreVerdict::BlockedDomain);
    }

    #[test]
    fn test_pharmacy_marker_is_dropped() {
        let r = result("Farmacia", "https://www.parafarmacia-online.com.mx/x");
        assert_eq!(classify(&r), StoreVerdict::BlockedDomain);
    }

    #[test]
    fn test_foreign_unknown_store_is_dropped() {
        let r = result("Target", "https://www.target.com/p/1");
        assert_eq!(classify(&r), StoreVerdict::UnknownStore);
    }

    #[test]
    fn test_path_containing_es_is_not_blocked() {
        let r = result("Soriana", "https://www.soriana.com/aguas.essence/p/1");
        assert_eq!(classify(&r), StoreVerdict::Mexican);
    }

    #[test]
    fn test_filter_preserves_order() {
        let results = vec![
            result("Soriana", "https://www.soriana.com/a"),
            result("Amazon", "https://www.amazon.es/b"),
            result("Chedraui", "https://www.chedraui.com.mx/c"),
            result("Ebay", "https://www.ebay.com/d"),
        ];

        let kept = filter_mexican_stores(results);
        let merchants: Vec<&str> = kept.iter().map(|r| r.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["Soriana", "Chedraui"]);
    }
}
