//! Variable binding.
//!
//! Host values are serialized to JSON, their shape inferred, then coerced
//! into engine values. Only a top-level object can be bound.

use std::collections::BTreeMap;

use serde::Serialize;
use stratum_engine::{implied_type, Value};

use crate::error::{PlatformError, PlatformResult};

/// Convert `vars` into a name to value map.
pub fn bind<T: Serialize + ?Sized>(vars: &T) -> PlatformResult<BTreeMap<String, Value>> {
    let json = serde_json::to_value(vars).map_err(|e| PlatformError::Binding(e.to_string()))?;
    let ty = implied_type(&json).map_err(|e| PlatformError::Binding(e.to_string()))?;
    match Value::convert(&json, &ty).map_err(|e| PlatformError::Binding(e.to_string()))? {
        Value::Object(fields) => Ok(fields),
        other => Err(PlatformError::Binding(format!(
            "expected an object of variables, found {}",
            other.type_name()
        ))),
    }
}
