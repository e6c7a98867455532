use super::TokenId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The field identifying the owner of a profile.
pub const ACCOUNT_FIELD: &str = "account";

/// The field a stored profile keeps its token identifier in.
pub const TOKEN_ID_FIELD: &str = "token_id";

/// Profile metadata as published by the profile owner. Only the `account`
/// field is interpreted, everything else is passed through untouched.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Profile(pub Map<String, Value>);

impl Profile {
    pub fn account(&self) -> Option<&str> {
        self.0.get(ACCOUNT_FIELD).and_then(Value::as_str)
    }
}

/// A row of the profile store: the profile fields together with the token
/// identifier they were resolved from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProfileRecord(Map<String, Value>);

impl ProfileRecord {
    pub fn new(profile: Profile, token_id: &TokenId) -> Self {
        let Profile(mut fields) = profile;
        fields.insert(TOKEN_ID_FIELD.to_owned(), Value::String(token_id.0.clone()));
        ProfileRecord(fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn account(&self) -> Option<&str> {
        self.field(ACCOUNT_FIELD).and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}
