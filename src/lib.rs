// src/lib.rs

//! flatwatch library: fetch -> deduplicate -> notify pipeline for
//! paginated real-estate feeds.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
