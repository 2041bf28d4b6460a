use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Block as returned by `eth_getBlockByNumber` with full transaction bodies
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Block {
    #[serde(deserialize_with = "quantity::deserialize")]
    pub number: u64,
    pub hash: Option<B256>,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub timestamp: u64,
    pub transactions: Vec<TransactionRecord>,
}

/// One observed chain transaction
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    #[serde(rename = "blockNumber", deserialize_with = "quantity::deserialize")]
    pub block_number: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Receipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: B256,
    #[serde(rename = "blockNumber", default, deserialize_with = "quantity::deserialize_opt")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub status: Option<u64>,
    #[serde(rename = "gasUsed", default, deserialize_with = "quantity::deserialize_opt")]
    pub gas_used: Option<u64>,
}

impl Receipt {
    /// Post-Byzantium status flag: 1 = success
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}

/// Call object for `eth_estimateGas`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// Hex `QUANTITY` fields ("0x1b4") as plain integers
pub(crate) mod quantity {
    use serde::{Deserialize, Deserializer};

    pub fn parse(hex_str: &str) -> Result<u64, String> {
        let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        u64::from_str_radix(hex_without_prefix, 16)
            .map_err(|e| format!("Failed to parse hex '{}' to u64: {}", hex_str, e))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_deserialization() {
        let raw = json!({
            "number": "0x3e8",
            "hash": "0x8f9b6b0d1f6ad8d02e4f4a4ea4a9a1e3c0d6a4fbbf1e0a6c3a0f7d2b1c4e5f60",
            "timestamp": "0x65a1b2c3",
            "transactions": [{
                "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "from": "0x2222222222222222222222222222222222222222",
                "to": "0x3EF50D6213F36EB88B994FA6C78277B328216D52",
                "value": "0x4563918244f40000",
                "input": "0x",
                "blockNumber": "0x3e8"
            }]
        });

        let block: Block = serde_json::from_value(raw).expect("block should parse");
        assert_eq!(block.number, 1000);
        assert_eq!(block.transactions.len(), 1);

        let tx = &block.transactions[0];
        assert_eq!(tx.block_number, 1000);
        assert_eq!(tx.value, U256::from(5_000_000_000_000_000_000u64));
        assert!(tx.input.is_empty());
        // Upper-case hex parses to the same address as the lower-case form
        let expected: Address = "0x3ef50d6213f36eb88b994fa6c78277b328216d52".parse().unwrap();
        assert_eq!(tx.to, Some(expected));
    }

    #[test]
    fn test_contract_creation_has_no_recipient() {
        let raw = json!({
            "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "from": "0x2222222222222222222222222222222222222222",
            "to": null,
            "value": "0x0",
            "input": "0x6080",
            "blockNumber": "0x1"
        });

        let tx: TransactionRecord = serde_json::from_value(raw).unwrap();
        assert!(tx.to.is_none());
        assert_eq!(tx.input.len(), 2);
    }

    #[test]
    fn test_receipt_status() {
        let ok: Receipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x10",
            "status": "0x1",
            "gasUsed": "0x5208"
        }))
        .unwrap();
        assert!(ok.succeeded());
        assert_eq!(ok.gas_used, Some(21000));

        let reverted: Receipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "status": "0x0"
        }))
        .unwrap();
        assert!(!reverted.succeeded());
        assert_eq!(reverted.block_number, None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(quantity::parse("0x1234").unwrap(), 0x1234u64);
        assert_eq!(quantity::parse("1234").unwrap(), 0x1234u64);
        assert_eq!(quantity::parse("0x0").unwrap(), 0u64);
        assert!(quantity::parse("invalid").is_err());
    }
}
