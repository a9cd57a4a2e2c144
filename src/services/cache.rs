//! Time-boxed cache of invoice-list responses, keyed by the exact
//! `(from, to)` date range. No range-overlap reuse across keys.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::models::{CacheMeta, Invoice};
use crate::utils::now_rfc3339;

struct CacheEntry {
    invoices: Vec<Invoice>,
    cached_at: Instant,
    cached_at_wall: String,
}

pub struct InvoiceCache {
    ttl: Duration,
    entries: HashMap<(NaiveDate, NaiveDate), CacheEntry>,
}

impl InvoiceCache {
    pub fn new(ttl: Duration) -> Self {
        InvoiceCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Return the cached list for this exact range, if any. A stale entry
    /// is still returned, with `expired = true` — expiry is surfaced to
    /// the caller, never hidden; refreshing is the caller's decision.
    pub fn lookup(&self, from: NaiveDate, to: NaiveDate) -> Option<(Vec<Invoice>, CacheMeta)> {
        let entry = self.entries.get(&(from, to))?;
        let elapsed = entry.cached_at.elapsed();
        let expired = elapsed >= self.ttl;
        let remaining_seconds = if expired {
            0.0
        } else {
            (self.ttl - elapsed).as_secs_f64()
        };

        Some((
            entry.invoices.clone(),
            CacheMeta {
                cached_at: entry.cached_at_wall.clone(),
                expired,
                remaining_seconds,
            },
        ))
    }

    /// Store a freshly fetched list, overwriting any previous entry for
    /// the range.
    pub fn store(&mut self, from: NaiveDate, to: NaiveDate, invoices: Vec<Invoice>) -> CacheMeta {
        let meta = CacheMeta {
            cached_at: now_rfc3339(),
            expired: false,
            remaining_seconds: self.ttl.as_secs_f64(),
        };
        self.entries.insert(
            (from, to),
            CacheEntry {
                invoices,
                cached_at: Instant::now(),
                cached_at_wall: meta.cached_at.clone(),
            },
        );
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(id: &str) -> Invoice {
        Invoice {
            id: id.to_string(),
            billing_number: None,
            title: None,
            partner_id: None,
            partner_name: None,
            billing_date: None,
            due_date: None,
            sales_date: None,
            total_amount: 0,
            subtotal: 0,
            tax: 0,
            tag_names: Vec::new(),
            payment_status: String::new(),
            posting_status: String::new(),
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
        )
    }

    #[test]
    fn fresh_entry_reports_decreasing_ttl() {
        let (from, to) = range();
        let mut cache = InvoiceCache::new(Duration::from_secs(60));
        cache.store(from, to, vec![invoice("inv-1")]);

        let (_, first) = cache.lookup(from, to).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let (_, second) = cache.lookup(from, to).unwrap();

        assert!(!first.expired);
        assert!(!second.expired);
        assert!(second.remaining_seconds < first.remaining_seconds);
    }

    #[test]
    fn stale_entry_is_served_but_flagged() {
        let (from, to) = range();
        let mut cache = InvoiceCache::new(Duration::from_millis(10));
        cache.store(from, to, vec![invoice("inv-1")]);

        std::thread::sleep(Duration::from_millis(25));
        let (invoices, meta) = cache.lookup(from, to).unwrap();

        assert_eq!(invoices.len(), 1);
        assert!(meta.expired);
        assert_eq!(meta.remaining_seconds, 0.0);
    }

    #[test]
    fn store_overwrites_previous_entry() {
        let (from, to) = range();
        let mut cache = InvoiceCache::new(Duration::from_secs(60));
        cache.store(from, to, vec![invoice("inv-1")]);
        cache.store(from, to, vec![invoice("inv-2"), invoice("inv-3")]);

        let (invoices, meta) = cache.lookup(from, to).unwrap();
        assert_eq!(invoices.len(), 2);
        assert!(!meta.expired);
    }

    #[test]
    fn ranges_do_not_share_entries() {
        let (from, to) = range();
        let mut cache = InvoiceCache::new(Duration::from_secs(60));
        cache.store(from, to, vec![invoice("inv-1")]);

        let other_to = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
        assert!(cache.lookup(from, other_to).is_none());
    }
}
