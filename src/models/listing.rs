//! Normalized listing data.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::escape_html;

/// Deduplication key for one listing.
///
/// The feed reports ids as bare numbers or strings; both shapes are kept
/// as-is so the seen file stays a flat JSON array of scalars.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum ListingId {
    Num(i64),
    Text(String),
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingId::Num(n) => write!(f, "{}", n),
            ListingId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Geographic coordinates attached to a listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

/// A normalized listing ready for notification.
///
/// Derived read-only from one raw feed item; only `id` is ever persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Deduplication identity (per the query's dedup key strategy)
    pub id: ListingId,

    /// Street / title line, raw (escaped at message-build time)
    pub title: String,

    /// Display price, already formatted
    pub price: String,

    /// Display name of the query that matched this listing
    pub query_name: String,

    /// Permalink to the listing
    pub link: String,

    /// Coordinates, when the feed item carries them
    pub coords: Option<Coords>,
}

impl Listing {
    /// Build the Telegram HTML message body for this listing.
    ///
    /// Title and query name are user-controlled feed text, so the HTML
    /// reserved characters are escaped before interpolation.
    pub fn message_html(&self) -> String {
        format!(
            "<b>נמצאה דירה חדשה המתאימה לך!</b>\n\n\
             <b>רחוב:</b> {title}\n\
             <b>מחיר:</b> {price}\n\
             <b>שכונת:</b> {area}\n\n\
             <a href=\"{link}\">קישור לפוסט</a>",
            title = escape_html(&self.title),
            price = self.price,
            area = escape_html(&self.query_name),
            link = self.link,
        )
    }
}
