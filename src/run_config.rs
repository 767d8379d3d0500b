//! Run configuration: load/validate/persist (component R), §4.15.
//! Grounded on the source's `config_mgr.c`, re-expressed as a
//! `serde`-derived document rather than a hand-rolled key/value parser.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub flows: Vec<FlowConfig>,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub mgmt: MgmtConfig,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub name: String,
    pub protocol: String, // "icmp_echo" | "udp" | "tcp_syn" | "http"
    pub dst_ip: String,
    #[serde(default)]
    pub dst_port: u16,
    /// Source IP range a flow's connections are spread across;
    /// `src_ip_lo == src_ip_hi` pins a single source address.
    #[serde(default = "default_src_ip")]
    pub src_ip_lo: String,
    #[serde(default = "default_src_ip")]
    pub src_ip_hi: String,
    /// 802.1Q tag; 0 disables tagging.
    #[serde(default)]
    pub vlan_id: u16,
    #[serde(default)]
    pub enable_tls: bool,
    #[serde(default)]
    pub sni: String,
    #[serde(default)]
    pub http_url: String,
    #[serde(default)]
    pub http_host: String,
    /// 0 sends a GET; non-zero sends a POST with a synthetic body of
    /// this length.
    #[serde(default)]
    pub http_body_len: usize,
    #[serde(default)]
    pub icmp_ping: bool,
    #[serde(default = "default_pps")]
    pub packets_per_second: u32,
    #[serde(default = "default_payload_len")]
    pub payload_len: usize,
}

fn default_pps() -> u32 {
    1000
}

fn default_payload_len() -> usize {
    64
}

fn default_src_ip() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    Unlimited,
    Constant,
}

impl Default for LoadMode {
    fn default() -> Self {
        LoadMode::Unlimited
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default)]
    pub target_cps: u64,
    #[serde(default)]
    pub target_rps: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub mode: LoadMode,
}

fn default_max_concurrent() -> u32 {
    1024
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            target_cps: 0,
            target_rps: 0,
            max_concurrent: default_max_concurrent(),
            duration_secs: None,
            mode: LoadMode::Unlimited,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MgmtConfig {
    /// `0` disables the REST listener entirely.
    #[serde(default = "default_rest_port")]
    pub rest_port: u16,
    #[serde(default = "default_cli_prompt")]
    pub cli_prompt: String,
}

fn default_rest_port() -> u16 {
    9090
}

fn default_cli_prompt() -> String {
    "netgen> ".to_string()
}

impl Default for MgmtConfig {
    fn default() -> Self {
        MgmtConfig { rest_port: default_rest_port(), cli_prompt: default_cli_prompt() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert: String,
    pub key: String,
    #[serde(default)]
    pub ca: String,
}

impl RunConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: RunConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).expect("RunConfig is always serializable")
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_json_string()).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Validates the loaded document against §4.15's rules, mirroring
    /// `config_mgr.c`'s own sanity checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flows.is_empty() {
            return Err(ConfigError::NoFlows);
        }
        for (index, flow) in self.flows.iter().enumerate() {
            if flow.dst_ip.is_empty() || flow.dst_ip == "0.0.0.0" {
                return Err(ConfigError::MissingDstIp { index });
            }
            if flow.dst_port == 0 && !flow.icmp_ping {
                return Err(ConfigError::MissingDstPort { index });
            }
        }
        if self.load.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "flows": [
                {"name": "ping-dst", "protocol": "icmp_echo", "dst_ip": "10.0.0.2", "icmp_ping": true}
            ]
        }"#
    }

    #[test]
    fn loads_with_defaults_filled_in() {
        let cfg = RunConfig::from_json_str(sample_json()).unwrap();
        assert_eq!(cfg.flows[0].packets_per_second, 1000);
        assert_eq!(cfg.load.max_concurrent, 1024);
        assert_eq!(cfg.mgmt.rest_port, 9090);
        assert_eq!(cfg.mgmt.cli_prompt, "netgen> ");
    }

    #[test]
    fn flow_schema_accepts_every_spec_field() {
        let json = r#"{
            "flows": [{
                "name": "web", "protocol": "http", "dst_ip": "10.0.0.2", "dst_port": 443,
                "src_ip_lo": "10.0.1.1", "src_ip_hi": "10.0.1.255", "vlan_id": 100,
                "enable_tls": true, "sni": "example.test",
                "http_url": "/", "http_host": "example.test", "http_body_len": 256
            }],
            "mgmt": {"rest_port": 0, "cli_prompt": "ng> "}
        }"#;
        let cfg = RunConfig::from_json_str(json).unwrap();
        let flow = &cfg.flows[0];
        assert_eq!(flow.vlan_id, 100);
        assert!(flow.enable_tls);
        assert_eq!(flow.sni, "example.test");
        assert_eq!(flow.http_body_len, 256);
        assert_eq!(cfg.mgmt.rest_port, 0);
        assert_eq!(cfg.mgmt.cli_prompt, "ng> ");
    }

    #[test]
    fn empty_flows_is_rejected() {
        let err = RunConfig::from_json_str(r#"{"flows": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoFlows));
    }

    #[test]
    fn missing_dst_port_without_icmp_ping_is_rejected() {
        let json = r#"{"flows": [{"name": "x", "protocol": "udp", "dst_ip": "10.0.0.2"}]}"#;
        let err = RunConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDstPort { index: 0 }));
    }

    #[test]
    fn roundtrips_through_json_serialization() {
        let cfg = RunConfig::from_json_str(sample_json()).unwrap();
        let text = cfg.to_json_string();
        let reparsed = RunConfig::from_json_str(&text).unwrap();
        assert_eq!(reparsed.flows[0].name, "ping-dst");
    }
}
