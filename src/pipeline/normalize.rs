//! Feed item normalization.
//!
//! The feed returns heterogeneous, partially-overlapping item schemas, so
//! raw items stay untyped JSON and every field is extracted through an
//! ordered fallback chain. Items without any recognizable id are rejected;
//! everything else degrades field by field.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{Coords, DedupKey, Listing, ListingId, Query};

/// Substituted when no price field parses.
pub const PRICE_UNAVAILABLE: &str = "No price available";

/// Substituted when no title field is present.
pub const TITLE_UNAVAILABLE: &str = "No title available";

/// Normalize one raw feed item into a Listing, or reject it.
///
/// Rejection happens only when the id fallback chain comes up empty; a
/// permalink cannot be built without an id, whatever the dedup strategy.
pub fn normalize(raw: &Value, query: &Query, item_base_url: &str) -> Option<Listing> {
    let link_id = id_from_chain(raw)?;

    let id = match query.dedup_key {
        DedupKey::Id => link_id.clone(),
        DedupKey::DateAdded => date_added_id(raw).unwrap_or_else(|| link_id.clone()),
    };

    let title = first_text(raw, &["title", "title_1", "street"])
        .unwrap_or_else(|| TITLE_UNAVAILABLE.to_string());
    let price = format_price(first_present(raw, &["price", "price_value", "priceText"]));
    let link = format!("{}/{}", item_base_url.trim_end_matches('/'), link_id);

    Some(Listing {
        id,
        title,
        price,
        query_name: query.name.clone(),
        link,
        coords: extract_coords(raw),
    })
}

/// Stable id under the fallback chain of known spellings.
fn id_from_chain(raw: &Value) -> Option<ListingId> {
    ["id", "item_id", "itemId"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(value_id))
}

/// `date_added` as a deduplication key; weaker than a real id.
fn date_added_id(raw: &Value) -> Option<ListingId> {
    raw.get("date_added").and_then(value_id)
}

fn value_id(value: &Value) -> Option<ListingId> {
    match value {
        Value::Number(n) => n.as_i64().map(ListingId::Num),
        Value::String(s) if !s.trim().is_empty() => Some(ListingId::Text(s.clone())),
        _ => None,
    }
}

/// First present, non-empty string among the given keys.
fn first_text(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        raw.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// First present, non-null (and for strings non-empty) value.
fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        raw.get(*key).filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    })
}

/// Format a raw price value for display.
///
/// Numeric values and digit runs inside text both normalize to the same
/// thousands-separated shekel string; anything unparseable becomes the
/// unavailable marker. Never panics on malformed input.
pub fn format_price(raw: Option<&Value>) -> String {
    let Some(value) = raw else {
        return PRICE_UNAVAILABLE.to_string();
    };

    match value {
        Value::Number(n) => {
            if let Some(amount) = n.as_i64() {
                format_shekels(amount)
            } else if let Some(amount) = n.as_f64() {
                format_shekels(amount.trunc() as i64)
            } else {
                PRICE_UNAVAILABLE.to_string()
            }
        }
        Value::String(text) => {
            static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
            let digit_run = DIGIT_RUN.get_or_init(|| {
                Regex::new(r"\d+").expect("digit-run pattern is valid")
            });

            let digits: String = digit_run
                .find_iter(text)
                .map(|m| m.as_str())
                .collect();
            match digits.parse::<i64>() {
                Ok(amount) => format_shekels(amount),
                Err(_) => PRICE_UNAVAILABLE.to_string(),
            }
        }
        _ => PRICE_UNAVAILABLE.to_string(),
    }
}

fn format_shekels(amount: i64) -> String {
    format!("{} ₪", thousands(amount))
}

fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 { format!("-{}", out) } else { out }
}

/// Coordinates from the nested `coordinates` object, falling back to
/// top-level latitude/longitude fields.
fn extract_coords(raw: &Value) -> Option<Coords> {
    let (lat, lon) = match raw.get("coordinates") {
        Some(c) => (c.get("latitude"), c.get("longitude")),
        None => (raw.get("latitude"), raw.get("longitude")),
    };
    Some(Coords {
        latitude: lat?.as_f64()?,
        longitude: lon?.as_f64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(dedup_key: DedupKey) -> Query {
        Query {
            name: "Florentin".to_string(),
            max_pages: 10,
            dedup_key,
            filters: Default::default(),
        }
    }

    const LINK_BASE: &str = "https://www.yad2.co.il/item";

    #[test]
    fn test_rejects_item_without_any_id() {
        let raw = json!({"title": "Herzl 10", "price": 3200});
        assert!(normalize(&raw, &query(DedupKey::Id), LINK_BASE).is_none());
    }

    #[test]
    fn test_id_fallback_chain() {
        let by_item_id = json!({"item_id": 7, "title": "a"});
        let by_camel = json!({"itemId": "x9", "title": "a"});

        let first = normalize(&by_item_id, &query(DedupKey::Id), LINK_BASE).unwrap();
        assert_eq!(first.id, ListingId::Num(7));
        assert_eq!(first.link, "https://www.yad2.co.il/item/7");

        let second = normalize(&by_camel, &query(DedupKey::Id), LINK_BASE).unwrap();
        assert_eq!(second.id, ListingId::Text("x9".into()));
    }

    #[test]
    fn test_title_fallback_chain() {
        let by_title = json!({"id": 1, "title": "A", "street": "B"});
        let by_street = json!({"id": 1, "title": "", "street": "B"});
        let missing = json!({"id": 1});

        assert_eq!(
            normalize(&by_title, &query(DedupKey::Id), LINK_BASE).unwrap().title,
            "A"
        );
        assert_eq!(
            normalize(&by_street, &query(DedupKey::Id), LINK_BASE).unwrap().title,
            "B"
        );
        assert_eq!(
            normalize(&missing, &query(DedupKey::Id), LINK_BASE).unwrap().title,
            TITLE_UNAVAILABLE
        );
    }

    #[test]
    fn test_price_normalization_is_idempotent_safe() {
        // All three shapes of the same price normalize identically.
        assert_eq!(format_price(Some(&json!(3200))), "3,200 ₪");
        assert_eq!(format_price(Some(&json!("3,200"))), "3,200 ₪");
        assert_eq!(format_price(Some(&json!("3200 ₪"))), "3,200 ₪");
    }

    #[test]
    fn test_price_fallbacks_never_panic() {
        assert_eq!(format_price(None), PRICE_UNAVAILABLE);
        assert_eq!(format_price(Some(&json!(""))), PRICE_UNAVAILABLE);
        assert_eq!(format_price(Some(&json!("call us"))), PRICE_UNAVAILABLE);
        assert_eq!(format_price(Some(&json!(null))), PRICE_UNAVAILABLE);
        assert_eq!(format_price(Some(&json!([1, 2]))), PRICE_UNAVAILABLE);
        // A digit run too long for i64 degrades instead of overflowing.
        assert_eq!(
            format_price(Some(&json!("99999999999999999999999"))),
            PRICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_price_field_fallback_chain() {
        let raw = json!({"id": 1, "price_value": 1234567});
        let listing = normalize(&raw, &query(DedupKey::Id), LINK_BASE).unwrap();
        assert_eq!(listing.price, "1,234,567 ₪");
    }

    #[test]
    fn test_date_added_dedup_strategy() {
        let raw = json!({"id": 5, "date_added": "2026-08-01 10:30:00"});
        let listing = normalize(&raw, &query(DedupKey::DateAdded), LINK_BASE).unwrap();
        assert_eq!(listing.id, ListingId::Text("2026-08-01 10:30:00".into()));
        // The permalink still uses the real id.
        assert_eq!(listing.link, "https://www.yad2.co.il/item/5");

        // Missing date_added falls back to the id chain.
        let plain = json!({"id": 5});
        let fallback = normalize(&plain, &query(DedupKey::DateAdded), LINK_BASE).unwrap();
        assert_eq!(fallback.id, ListingId::Num(5));
    }

    #[test]
    fn test_coordinates_extraction() {
        let nested = json!({
            "id": 1,
            "coordinates": {"latitude": 32.06, "longitude": 34.77}
        });
        let listing = normalize(&nested, &query(DedupKey::Id), LINK_BASE).unwrap();
        assert_eq!(
            listing.coords,
            Some(Coords { latitude: 32.06, longitude: 34.77 })
        );

        let none = json!({"id": 1, "coordinates": {"latitude": 32.06}});
        assert!(normalize(&none, &query(DedupKey::Id), LINK_BASE).unwrap().coords.is_none());
    }
}
