//! Per-client diagnostic record store.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;

use crate::diagnostics::category::{Category, CategoryRegistry};

/// One diagnostic record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    pub short: String,
    pub long: Option<String>,
}

/// Everything recorded for one client address.
#[derive(Debug, Clone, Default)]
pub struct ClientLog {
    pub connections: u64,
    pub records: Vec<LogRecord>,
}

/// Category-gated diagnostic log keyed by client address.
///
/// Entries live for the whole process; nothing is ever evicted.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    registry: CategoryRegistry,
    clients: DashMap<IpAddr, ClientLog>,
}

impl DiagnosticLog {
    pub fn new(registry: CategoryRegistry) -> Self {
        Self {
            registry,
            clients: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.registry.is_enabled(category)
    }

    /// Append a record for `client`.
    ///
    /// Does nothing, and allocates nothing, when `category` is disabled.
    pub fn log(&self, client: IpAddr, category: Category, short: &str, long: Option<&str>) {
        if !self.registry.is_enabled(category) {
            return;
        }
        let record = LogRecord {
            timestamp: Utc::now(),
            category,
            short: short.to_string(),
            long: long.map(str::to_string),
        };
        self.for_client(client).records.push(record);
    }

    /// The log for `client`, created on first use.
    pub fn for_client(&self, client: IpAddr) -> RefMut<'_, IpAddr, ClientLog> {
        self.clients.entry(client).or_default()
    }

    /// Count one more handled request from `client`.
    pub fn record_connection(&self, client: IpAddr) {
        self.for_client(client).connections += 1;
    }

    /// Total number of records across all clients.
    pub fn count_all(&self) -> usize {
        self.clients.iter().map(|entry| entry.records.len()).sum()
    }

    /// A copy of every client's log, ordered by address.
    pub fn export(&self) -> Vec<(IpAddr, ClientLog)> {
        let mut clients: Vec<_> = self
            .clients
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        clients.sort_by_key(|(addr, _)| *addr);
        clients
    }

    /// A sink bound to one client, handed to plugins.
    pub fn sink(&self, client: IpAddr) -> DiagnosticSink<'_> {
        DiagnosticSink { log: self, client }
    }
}

/// Where plugins write diagnostics while transforming one response.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticSink<'a> {
    log: &'a DiagnosticLog,
    client: IpAddr,
}

impl<'a> DiagnosticSink<'a> {
    pub fn log(&self, category: Category, short: &str, long: Option<&str>) {
        self.log.log(self.client, category, short, long);
    }

    /// Check before building an expensive `long` text.
    pub fn is_enabled(&self, category: Category) -> bool {
        self.log.is_enabled(category)
    }

    pub fn client(&self) -> IpAddr {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_disabled_category_stores_nothing() {
        let mut registry = CategoryRegistry::all_enabled();
        registry.set(Category::Upstream, false);
        let log = DiagnosticLog::new(registry);

        for _ in 0..1000 {
            log.log(addr(1), Category::Upstream, "body", Some("<huge/>"));
        }

        assert_eq!(log.count_all(), 0);
        // Gated calls must not even create the client entry.
        assert!(log.export().is_empty());
    }

    #[test]
    fn test_count_all_sums_clients() {
        let log = DiagnosticLog::new(CategoryRegistry::all_enabled());
        log.log(addr(1), Category::Request, "a", None);
        log.log(addr(1), Category::Response, "b", Some("long"));
        log.log(addr(2), Category::Request, "c", None);

        assert_eq!(log.count_all(), 3);
        let exported = log.export();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].0, addr(1));
        assert_eq!(exported[0].1.records[1].long.as_deref(), Some("long"));
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let log = DiagnosticLog::new(CategoryRegistry::all_enabled());
        for i in 0..5 {
            log.log(addr(3), Category::Plugin, &format!("step {}", i), None);
        }
        let client = log.for_client(addr(3));
        let shorts: Vec<_> = client.records.iter().map(|r| r.short.as_str()).collect();
        assert_eq!(shorts, ["step 0", "step 1", "step 2", "step 3", "step 4"]);
    }

    #[test]
    fn test_connection_counter() {
        let log = DiagnosticLog::new(CategoryRegistry::with_defaults());
        log.record_connection(addr(4));
        log.record_connection(addr(4));
        assert_eq!(log.for_client(addr(4)).connections, 2);
        assert_eq!(log.count_all(), 0);
    }

    #[test]
    fn test_sink_writes_to_its_client() {
        let log = DiagnosticLog::new(CategoryRegistry::all_enabled());
        let sink = log.sink(addr(5));
        sink.log(Category::Plugin, "hello", None);
        assert_eq!(sink.client(), addr(5));
        assert_eq!(log.for_client(addr(5)).records.len(), 1);
    }
}
