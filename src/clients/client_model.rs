use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row of the clients list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub clientname: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub commission: String,
}

impl ClientRecord {
    pub fn to_ref(&self) -> ClientRef {
        ClientRef {
            id: self.id.clone(),
            name: self.clientname.clone(),
        }
    }
}

/// The client a staged file is uploaded for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: String,
    pub name: String,
}

/// Body of the create-client request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewClient {
    pub company_name: String,
    pub commission: String,
}

/// The backend is loose about whether ids and commissions are strings or
/// numbers; normalise both to text.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
