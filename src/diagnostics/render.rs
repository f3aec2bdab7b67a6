//! HTML rendering of the diagnostic log for `GET` on unknown paths.

use std::fmt::Write;

use crate::diagnostics::log::DiagnosticLog;

/// Render the whole log as a self-contained HTML page.
pub fn render_page(log: &DiagnosticLog) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Interception proxy log</title></head><body>\n",
    );

    page.push_str("<h1>Categories</h1>\n<table>\n");
    for category in log.registry().categories() {
        let _ = writeln!(
            page,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            category.name(),
            if category.enabled { "on" } else { "off" },
            escape(category.description()),
        );
    }
    page.push_str("</table>\n");

    let clients = log.export();
    let _ = writeln!(page, "<h1>Clients ({})</h1>", clients.len());
    for (addr, client) in clients {
        let _ = writeln!(
            page,
            "<h2>{} &mdash; {} requests, {} records</h2>\n<ol>",
            addr,
            client.connections,
            client.records.len()
        );
        for record in &client.records {
            let _ = write!(
                page,
                "<li><code>{}</code> [{}] {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.category,
                escape(&record.short),
            );
            if let Some(long) = &record.long {
                let _ = write!(page, "<pre>{}</pre>", escape(long));
            }
            page.push_str("</li>\n");
        }
        page.push_str("</ol>\n");
    }

    page.push_str("</body></html>\n");
    page
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Category, CategoryRegistry};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_page_escapes_payloads() {
        let log = DiagnosticLog::new(CategoryRegistry::all_enabled());
        let client = IpAddr::V4(Ipv4Addr::LOCALHOST);
        log.record_connection(client);
        log.log(client, Category::Response, "sent", Some("<Brand code=\"A&B\"/>"));

        let page = render_page(&log);
        assert!(page.contains("127.0.0.1"));
        assert!(page.contains("&lt;Brand code=&quot;A&amp;B&quot;/&gt;"));
        assert!(!page.contains("<Brand"));
    }
}
