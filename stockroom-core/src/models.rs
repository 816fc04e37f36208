use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog entry describing a kind of part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The single stock-count record owned by a part type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub part_type_id: i64,
    pub current_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A part together with its owning part type, as returned by list queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartWithType {
    #[serde(flatten)]
    pub part: Part,
    pub part_type: PartType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Add,
    Remove,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Add => "add",
            TransactionType::Remove => "remove",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown transaction type: {0}")]
pub struct ParseTransactionTypeError(pub String);

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(TransactionType::Add),
            "remove" => Ok(TransactionType::Remove),
            other => Err(ParseTransactionTypeError(other.to_string())),
        }
    }
}

/// Immutable audit record of one add or remove event against a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub part_id: i64,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub user_name: String,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this transaction on the part's count.
    pub fn delta(&self) -> i64 {
        match self.transaction_type {
            TransactionType::Add => self.quantity,
            TransactionType::Remove => -self.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionWithType {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub part_type_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction(transaction_type: TransactionType) -> Transaction {
        Transaction {
            id: 1,
            part_id: 3,
            transaction_type,
            quantity: 4,
            user_name: "dana".to_string(),
            reason: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!("add".parse::<TransactionType>().unwrap(), TransactionType::Add);
        assert_eq!("remove".parse::<TransactionType>().unwrap(), TransactionType::Remove);
        assert!("ADD".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_delta_sign() {
        assert_eq!(sample_transaction(TransactionType::Add).delta(), 4);
        assert_eq!(sample_transaction(TransactionType::Remove).delta(), -4);
    }

    #[test]
    fn test_transaction_with_type_serializes_flat() {
        let entry = TransactionWithType {
            transaction: sample_transaction(TransactionType::Remove),
            part_type_name: "Bolt".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["transaction_type"], "remove");
        assert_eq!(json["part_type_name"], "Bolt");
        assert_eq!(json["part_id"], 3);
        assert!(json.get("transaction").is_none());
    }

    #[test]
    fn test_part_with_type_serializes_flat() {
        let now = Utc::now();
        let entry = PartWithType {
            part: Part { id: 9, part_type_id: 2, current_count: 12, created_at: now },
            part_type: PartType {
                id: 2,
                name: "Bolt".to_string(),
                description: None,
                created_at: now,
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["current_count"], 12);
        assert_eq!(json["part_type"]["name"], "Bolt");
        assert!(json.get("part").is_none());
    }
}
