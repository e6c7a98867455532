use ethcontract::U256;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// The transaction status marking a mined, successful transaction.
pub const SUCCESS_STATUS: &str = "success";

/// Structural problems with an inbound notification body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MalformedEvent {
    InvalidRecord,
    MissingDestination,
}

impl MalformedEvent {
    pub fn message(self) -> &'static str {
        match self {
            MalformedEvent::InvalidRecord => "Invalid record data",
            MalformedEvent::MissingDestination => {
                "Destination address is required and must be a string"
            }
        }
    }
}

impl Display for MalformedEvent {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for MalformedEvent {}

/// A transaction notification as delivered by the trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionEvent {
    pub dest: String,
    pub status: Option<String>,
    pub data: Value,
}

impl TransactionEvent {
    /// Extracts the transaction record from a notification body of the form
    /// `{"record": {"dest": .., "status": .., "data": ..}}`.
    pub fn from_body(body: &Value) -> Result<Self, MalformedEvent> {
        let record = body
            .get("record")
            .and_then(Value::as_object)
            .ok_or(MalformedEvent::InvalidRecord)?;
        let dest = record
            .get("dest")
            .and_then(Value::as_str)
            .filter(|dest| !dest.is_empty())
            .ok_or(MalformedEvent::MissingDestination)?;

        Ok(TransactionEvent {
            dest: dest.to_owned(),
            status: record
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_owned),
            data: record.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    /// Returns true if the transaction was sent to `address`. Addresses are
    /// compared ignoring case since checksummed and lower case hex are both
    /// common.
    pub fn targets(&self, address: &str) -> bool {
        self.dest.eq_ignore_ascii_case(address)
    }

    pub fn is_successful(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS_STATUS)
    }

    /// The metadata update carried by the transaction, if the payload has one.
    pub fn metadata_update(&self) -> Option<MetadataUpdate> {
        MetadataUpdate::deserialize(&self.data).ok()
    }
}

/// Payload of a `MetadataUpdate(uint256 _tokenId)` on the profile contract.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetadataUpdate {
    #[serde(rename = "_tokenId")]
    pub token_id: TokenId,
}

/// A profile token identifier.
///
/// Kept exactly as received: string payloads are taken verbatim and numbers
/// keep their decimal digits.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    /// Interprets the identifier as a `uint256`, either in decimal or `0x`
    /// prefixed hex notation.
    pub fn as_u256(&self) -> Option<U256> {
        let value = self.0.trim();
        match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) if !hex.is_empty() && hex.len() <= 64 => hex.parse().ok(),
            Some(_) => None,
            None if value.is_empty() => None,
            None => U256::from_dec_str(value).ok(),
        }
    }
}

impl Display for TokenId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(value) => Ok(TokenId(value)),
            Value::Number(value) => Ok(TokenId(value.to_string())),
            other => Err(de::Error::custom(format!(
                "expected string or number token id, got {}",
                other
            ))),
        }
    }
}
