//! Subcommand handlers
//!
//! Each handler returns the JSON document the binary prints, so the same
//! handlers are usable from tests without capturing stdout.

pub mod grants;
pub mod queue;
pub mod token;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
