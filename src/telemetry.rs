//! Per-worker metrics and snapshot export (component U), §4.18.
//!
//! Each worker owns one [`WorkerMetrics`] (plain `u64` counters —
//! touched only by that worker, so no atomics needed); the management
//! plane periodically collects a [`Snapshot`] across all workers for
//! the CLI `stats` command and the REST `/metrics`/`/stats` routes.

use std::collections::HashMap;

use crate::error::DropReason;

#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tcp_connections_opened: u64,
    pub tcp_connections_closed: u64,
    pub tcp_retransmits: u64,
    pub arp_requests_sent: u64,
    pub arp_replies_received: u64,
    pub icmp_echo_sent: u64,
    pub icmp_echo_received: u64,
    pub drops: HashMap<&'static str, u64>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        let key: &'static str = match reason {
            DropReason::BadIpChecksum => "bad_ip_checksum",
            DropReason::Fragment => "fragment",
            DropReason::NotForUs => "not_for_us",
            DropReason::BadIcmpParse => "bad_icmp_parse",
            DropReason::BadTcpParse => "bad_tcp_parse",
            DropReason::BadHttpParse => "bad_http_parse",
            DropReason::RingOverflow => "ring_overflow",
            DropReason::SynQueueFull => "syn_queue_full",
            DropReason::PortPoolExhausted => "port_pool_exhausted",
            DropReason::NicTxDropped => "nic_tx_dropped",
            DropReason::Other => "other",
        };
        *self.drops.entry(key).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub workers: Vec<WorkerMetrics>,
}

impl Snapshot {
    pub fn totals(&self) -> WorkerMetrics {
        let mut total = WorkerMetrics::new();
        for w in &self.workers {
            total.rx_packets += w.rx_packets;
            total.rx_bytes += w.rx_bytes;
            total.tx_packets += w.tx_packets;
            total.tx_bytes += w.tx_bytes;
            total.tcp_connections_opened += w.tcp_connections_opened;
            total.tcp_connections_closed += w.tcp_connections_closed;
            total.tcp_retransmits += w.tcp_retransmits;
            total.arp_requests_sent += w.arp_requests_sent;
            total.arp_replies_received += w.arp_replies_received;
            total.icmp_echo_sent += w.icmp_echo_sent;
            total.icmp_echo_received += w.icmp_echo_received;
            for (k, v) in &w.drops {
                *total.drops.entry(k).or_insert(0) += v;
            }
        }
        total
    }

    /// JSON export for the REST `/metrics` route and the CLI `stats`
    /// command's machine-readable form.
    pub fn export_json(&self) -> String {
        let total = self.totals();
        serde_json::json!({
            "workers": self.workers.len(),
            "rx_packets": total.rx_packets,
            "rx_bytes": total.rx_bytes,
            "tx_packets": total.tx_packets,
            "tx_bytes": total.tx_bytes,
            "tcp_connections_opened": total.tcp_connections_opened,
            "tcp_connections_closed": total.tcp_connections_closed,
            "tcp_retransmits": total.tcp_retransmits,
            "arp_requests_sent": total.arp_requests_sent,
            "arp_replies_received": total.arp_replies_received,
            "icmp_echo_sent": total.icmp_echo_sent,
            "icmp_echo_received": total.icmp_echo_received,
            "drops": total.drops,
        })
        .to_string()
    }

    /// Hand-rolled Prometheus text exposition. No `prometheus` crate is
    /// in the dependency stack and the format needed (a handful of
    /// counters, no histograms) doesn't warrant adding one.
    pub fn export_prometheus(&self) -> String {
        let total = self.totals();
        let mut out = String::new();
        let mut line = |name: &str, help: &str, value: u64| {
            out.push_str(&format!("# HELP netgen_{name} {help}\n"));
            out.push_str(&format!("# TYPE netgen_{name} counter\n"));
            out.push_str(&format!("netgen_{name} {value}\n"));
        };
        line("rx_packets_total", "Packets received across all workers", total.rx_packets);
        line("rx_bytes_total", "Bytes received across all workers", total.rx_bytes);
        line("tx_packets_total", "Packets transmitted across all workers", total.tx_packets);
        line("tx_bytes_total", "Bytes transmitted across all workers", total.tx_bytes);
        line("tcp_connections_opened_total", "TCP connections opened", total.tcp_connections_opened);
        line("tcp_connections_closed_total", "TCP connections closed", total.tcp_connections_closed);
        line("tcp_retransmits_total", "TCP segments retransmitted", total.tcp_retransmits);
        for (reason, count) in &total.drops {
            out.push_str(&format!(
                "netgen_drops_total{{reason=\"{reason}\"}} {count}\n"
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_across_workers() {
        let mut a = WorkerMetrics::new();
        a.rx_packets = 10;
        let mut b = WorkerMetrics::new();
        b.rx_packets = 5;
        let snap = Snapshot { workers: vec![a, b] };
        assert_eq!(snap.totals().rx_packets, 15);
    }

    #[test]
    fn record_drop_increments_the_right_bucket() {
        let mut m = WorkerMetrics::new();
        m.record_drop(DropReason::Fragment);
        m.record_drop(DropReason::Fragment);
        m.record_drop(DropReason::BadIpChecksum);
        assert_eq!(*m.drops.get("fragment").unwrap(), 2);
        assert_eq!(*m.drops.get("bad_ip_checksum").unwrap(), 1);
    }

    #[test]
    fn json_export_is_valid_json() {
        let snap = Snapshot { workers: vec![WorkerMetrics::new()] };
        let s = snap.export_json();
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["workers"], 1);
    }

    #[test]
    fn prometheus_export_includes_help_and_type_lines() {
        let snap = Snapshot { workers: vec![WorkerMetrics::new()] };
        let s = snap.export_prometheus();
        assert!(s.contains("# HELP netgen_rx_packets_total"));
        assert!(s.contains("# TYPE netgen_rx_packets_total counter"));
    }
}
