//! Caller input for ledger mutations.
//!
//! Each record validates itself before the ledger hands it to a repository.
//! `validated` trims required strings and turns blank optional strings into
//! `None`, so repositories only ever see normalized input.

use serde::{Deserialize, Serialize};

use crate::{LedgerError, LedgerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPartType {
    pub name: String,
    pub description: Option<String>,
}

impl NewPartType {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self { name: name.into(), description }
    }

    pub fn validated(self) -> LedgerResult<Self> {
        Ok(Self {
            name: required("name", self.name)?,
            description: optional(self.description),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAddition {
    pub part_id: i64,
    pub quantity: i64,
    pub user_name: String,
    pub description: Option<String>,
}

impl StockAddition {
    pub fn validated(self) -> LedgerResult<Self> {
        Ok(Self {
            part_id: positive_id("part_id", self.part_id)?,
            quantity: positive_quantity(self.quantity)?,
            user_name: required("user_name", self.user_name)?,
            description: optional(self.description),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRemoval {
    pub part_id: i64,
    pub quantity: i64,
    pub user_name: String,
    pub reason: String,
    pub description: Option<String>,
}

impl StockRemoval {
    pub fn validated(self) -> LedgerResult<Self> {
        Ok(Self {
            part_id: positive_id("part_id", self.part_id)?,
            quantity: positive_quantity(self.quantity)?,
            user_name: required("user_name", self.user_name)?,
            reason: required("reason", self.reason)?,
            description: optional(self.description),
        })
    }
}

pub(crate) fn positive_id(field: &str, id: i64) -> LedgerResult<i64> {
    if id <= 0 {
        return Err(LedgerError::validation(format!("{} must be a positive integer", field)));
    }
    Ok(id)
}

/// Largest quantity accepted in a single add or remove.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

fn positive_quantity(quantity: i64) -> LedgerResult<i64> {
    if quantity <= 0 {
        return Err(LedgerError::validation("Quantity must be positive"));
    }
    if quantity > MAX_QUANTITY {
        return Err(LedgerError::validation(format!(
            "Quantity must not exceed {}",
            MAX_QUANTITY
        )));
    }
    Ok(quantity)
}

fn required(field: &str, value: String) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
