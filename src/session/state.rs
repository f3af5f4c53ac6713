//! WalletState - immutable snapshot mapped from provider-defined raw state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::paths::defaults;
use crate::provider::RawWalletState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub token: String,
    /// Decimal string; balances can exceed what JSON numbers carry safely.
    pub amount: String,
}

/// Point-in-time wallet state. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub address: Option<String>,
    pub public_key: Option<String>,
    pub chain_id: String,
    pub balances: Vec<Balance>,
    pub is_connected: bool,
    pub is_locked: bool,
    pub observed_at: DateTime<Utc>,
}

impl WalletState {
    pub fn from_raw(raw: &RawWalletState, chain_id: &str) -> Self {
        let v = raw.as_value();
        let address = derive_address(v);
        Self {
            is_connected: address.is_some(),
            address,
            public_key: first_str(v, &[&["coinPublicKey"], &["publicKey"]]),
            chain_id: chain_id.to_string(),
            balances: derive_balances(v),
            is_locked: v.get("isLocked").and_then(Value::as_bool).unwrap_or(false),
            observed_at: Utc::now(),
        }
    }

    pub fn balance(&self, token: &str) -> Option<&str> {
        self.balances.iter().find(|b| b.token == token).map(|b| b.amount.as_str())
    }
}

fn non_empty(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(String::from)
}

/// First non-empty string found along any of the given paths.
fn first_str(v: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| path.iter().try_fold(v, |cur, key| cur.get(*key)).and_then(non_empty))
}

/// Providers disagree on where the address lives; try the shapes seen in the wild.
pub fn derive_address(v: &Value) -> Option<String> {
    first_str(v, &[&["address"]])
        .or_else(|| v.get("addresses").and_then(|a| a.get(0)).and_then(non_empty))
        .or_else(|| v.pointer("/wallet/addresses/0").and_then(non_empty))
        .or_else(|| first_str(v, &[&["account", "address"], &["changeAddress"]]))
}

/// Non-negative integer amount. Fractional, negative and non-numeric values
/// are skipped.
fn amount_of(v: &Value) -> Option<u128> {
    let amount = match v {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if amount.is_none() && !v.is_null() {
        tracing::debug!("Skipping UTXO amount {} (not a non-negative integer)", v);
    }
    amount
}

fn utxo_amount(u: &Value) -> u128 {
    u.get("amount")
        .and_then(amount_of)
        .or_else(|| u.get("value").and_then(amount_of))
        .or_else(|| {
            u.get("assets")?.as_array()?.iter().find_map(|a| {
                let unit = a.get("unit").or_else(|| a.get("asset"))?.as_str()?;
                if unit.to_ascii_lowercase().contains(defaults::DUST_TOKEN) { a.get("quantity").and_then(amount_of) } else { None }
            })
        })
        .unwrap_or(0)
}

/// `balances` object entries when present, else a `tdust` total summed from UTXOs.
pub fn derive_balances(v: &Value) -> Vec<Balance> {
    if let Some(map) = v.get("balances").and_then(Value::as_object) {
        return map
            .iter()
            .filter_map(|(token, amount)| {
                let amount = match amount {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some(Balance { token: token.clone(), amount })
            })
            .collect();
    }
    let utxos = v.get("utxos").or_else(|| v.pointer("/wallet/utxos")).and_then(Value::as_array);
    let total = utxos.map_or(Some(0), |us| us.iter().map(utxo_amount).try_fold(0u128, u128::checked_add));
    match total {
        Some(0) => Vec::new(),
        Some(total) => vec![Balance { token: defaults::DUST_TOKEN.into(), amount: total.to_string() }],
        None => {
            tracing::warn!("UTXO {} total overflows; omitting balance", defaults::DUST_TOKEN);
            Vec::new()
        }
    }
}
