//! tsh-config
//!
//! Settings for the console: built-in defaults, overlaid by one operator YAML
//! file, canonicalized to JSON and hashed. The typed [`Settings`] is derived
//! from the merged document.
//!
//! YAML never carries credentials. It names env vars; [`secrets`] resolves
//! them once at startup.

pub mod secrets;

pub use secrets::{resolve_credentials, CredentialEnvNames, Credentials, SigningError};

use std::collections::BTreeMap;
use std::fs;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Leaf strings starting with one of these abort the load with
/// `CONFIG_SECRET_DETECTED`.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
];

/// Base layer. The operator file overrides any subset of it.
pub const DEFAULTS_YAML: &str = r#"
venue:
  mode: paper
  rest_base_url: "https://api.prime.coinbase.com"
  ws_url: "wss://ws-feed.prime.coinbase.com"
  ticker_base_url: "https://api.exchange.coinbase.com"
  portfolio_id: ""
products:
  - ETH-USD
  - LTC-USD
price_poll_interval_secs: 10
max_order_notional: "50000"
feed:
  idle_timeout_secs: 10
  reconnect_delay_secs: 5
paper:
  balances:
    USD: "100000"
    ETH: "10"
    LTC: "100"
credentials:
  access_key_env: TSH_ACCESS_KEY
  secret_env: TSH_SIGNING_KEY
  passphrase_env: TSH_PASSPHRASE
  svc_account_id_env: TSH_SVC_ACCOUNT_ID
"#;

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Merge YAML docs in order: earlier docs are base, later docs override.
pub fn merge_yaml_layers(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json =
        serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(|val| val.as_str()) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueMode {
    /// In-memory venue; no network order routing.
    Paper,
    /// Signed REST against the prime venue.
    Prime,
}

impl VenueMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueMode::Paper => "paper",
            VenueMode::Prime => "prime",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueSettings {
    pub mode: VenueMode,
    pub rest_base_url: String,
    pub ws_url: String,
    pub ticker_base_url: String,
    pub portfolio_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    pub idle_timeout_secs: u64,
    pub reconnect_delay_secs: u64,
}

/// Starting state of the in-memory venue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperSettings {
    /// Asset symbol -> amount.
    #[serde(default)]
    pub balances: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub venue: VenueSettings,
    /// Products polled for prices and covered by fat-finger checks.
    pub products: Vec<String>,
    pub price_poll_interval_secs: u64,
    pub max_order_notional: Decimal,
    pub feed: FeedSettings,
    #[serde(default)]
    pub paper: PaperSettings,
    pub credentials: CredentialEnvNames,
}

impl Settings {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let s: Settings = serde_json::from_value(config_json.clone())
            .context("config does not match the settings schema")?;
        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<()> {
        if self.products.is_empty() {
            bail!("CONFIG_INVALID: products must not be empty");
        }
        if self.price_poll_interval_secs == 0 {
            bail!("CONFIG_INVALID: price_poll_interval_secs must be > 0");
        }
        if self.feed.idle_timeout_secs == 0 {
            bail!("CONFIG_INVALID: feed.idle_timeout_secs must be > 0");
        }
        if self.max_order_notional <= Decimal::ZERO {
            bail!("CONFIG_INVALID: max_order_notional must be > 0");
        }
        if self.venue.mode == VenueMode::Prime && self.venue.portfolio_id.trim().is_empty() {
            bail!("CONFIG_INVALID: venue.portfolio_id is required in prime mode");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub config_hash: String,
    pub canonical_json: String,
}

/// Defaults overlaid by the operator file at `path`, if any.
pub fn load_settings(path: Option<&str>) -> Result<LoadedSettings> {
    let overlay = match path {
        Some(p) => Some(
            fs::read_to_string(p).with_context(|| format!("failed to read settings file: {p}"))?,
        ),
        None => None,
    };
    let mut docs = vec![DEFAULTS_YAML];
    if let Some(raw) = overlay.as_deref() {
        docs.push(raw);
    }
    load_settings_from_strings(&docs)
}

pub fn load_settings_from_strings(yaml_docs: &[&str]) -> Result<LoadedSettings> {
    let loaded = merge_yaml_layers(yaml_docs)?;
    let settings = Settings::from_config_json(&loaded.config_json)?;
    Ok(LoadedSettings {
        settings,
        config_hash: loaded.config_hash,
        canonical_json: loaded.canonical_json,
    })
}
