use serde::de::DeserializeOwned;
use serde_json::json;

use crate::ipc::error::err;
use crate::ipc::types::Request;

/// Trimmed string parameter; blank counts as missing.
pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn require_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    param_str(req, key).ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Optional class number; null and absent are both `None`.
pub fn param_class_level(req: &Request, key: &str) -> Result<Option<u8>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must be a class number", key),
                    Some(json!({ "value": v })),
                )
            }),
    }
}

/// Deserialize `params[key]` into a typed value.
pub fn parse_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(value) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(value.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid {}: {}", key, e),
            None,
        )
    })
}

pub fn no_workspace(req: &Request) -> serde_json::Value {
    err(&req.id, "no_workspace", "select a workspace first", None)
}
