//! Query rendering and value conversion for the Bolt runner.

use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
};
use serde_json::Value;

use quiver_core::{CallKind, ProcedureCall};

/// Renders the Cypher text for a procedure or function call.
pub(crate) fn render(call: &ProcedureCall) -> String {
    let body = call.body.as_deref().unwrap_or("");
    match call.kind {
        CallKind::Procedure => {
            let yields = if call.yields.is_empty() {
                String::new()
            } else {
                format!(" YIELD {}", call.yields.join(", "))
            };
            format!("CALL {}({body}){yields}", call.endpoint)
        }
        CallKind::Function => format!("RETURN {}({body})", call.endpoint),
    }
}

/// Converts a JSON parameter value to a Bolt value.
pub(crate) fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => BoltType::String(BoltString::new(s)),
        Value::Array(items) => {
            let mut list = BoltList::default();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::default();
            for (key, item) in map {
                bolt.put(BoltString::new(key), json_to_bolt(item));
            }
            BoltType::Map(bolt)
        }
    }
}
