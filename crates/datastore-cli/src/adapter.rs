//! Line-oriented JSON adapter.
//!
//! Maps one JSON request per line onto [`DataStore`] calls and renders the
//! outcome as one JSON response per line. Update notifications become
//! `Updated` signal lines addressed by object path.
//!
//! ```text
//! → {"id":1,"method":"create","params":{"data":"hello","properties":{"title":"Foo"}}}
//! ← {"id":1,"result":"/org/laptop/sugar/DataStore/Object/1"}
//! ← {"signal":"Updated","object":"/org/laptop/sugar/DataStore/Object/1","data":true,"properties":{},"deleted":false}
//! ```
//!
//! | method           | params                     | result            |
//! |------------------|----------------------------|-------------------|
//! | `get`            | `uid`                      | object path       |
//! | `create`         | `data`, `properties`       | object path       |
//! | `delete`         | `object`                   | `0`               |
//! | `find`           | `properties`               | object paths      |
//! | `get_data`       | `object`                   | byte array        |
//! | `set_data`       | `object`, `data`           | `0`               |
//! | `get_properties` | `object`, `keys`           | key → value       |
//! | `set_properties` | `object`, `properties`     | `0`               |

use std::collections::BTreeMap;

use datastore_core::{
    DataStore, DataValue, EventSink, Properties, StoreError, Uid, UpdateEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::object_path::{object_path, uid_from_path};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One request line.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// One response line: exactly one of `result` or `error` is present.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

/// `Updated` notification line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub signal: &'static str,
    pub object: String,
    pub data: bool,
    pub properties: BTreeMap<String, String>,
    pub deleted: bool,
}

impl From<&UpdateEvent> for Signal {
    fn from(event: &UpdateEvent) -> Self {
        Self {
            signal: "Updated",
            object: object_path(event.uid),
            data: event.data_changed,
            properties: event.properties_changed.clone(),
            deleted: event.deleted,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of one request.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl AdapterError {
    /// Stable name clients match on.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(StoreError::NotFound { .. }) => "NotFoundError",
            Self::Store(StoreError::UnsupportedDataType { .. }) => "UnsupportedDataType",
            Self::Store(StoreError::ReservedKey { .. }) => "ReservedKeyError",
            Self::Store(StoreError::InvalidQuery { .. }) => "InvalidQueryError",
            Self::Store(err) if err.is_transient() => "TransientError",
            Self::Store(_) => "InternalError",
            Self::InvalidRequest(_) => "InvalidRequest",
        }
    }
}

type AdapterResult<T> = Result<T, AdapterError>;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Serves requests against one store, one at a time.
pub struct Dispatcher<S: EventSink> {
    store: DataStore<S>,
}

impl<S: EventSink> Dispatcher<S> {
    pub fn new(store: DataStore<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DataStore<S> {
        &self.store
    }

    /// Release the store.
    pub fn into_store(self) -> DataStore<S> {
        self.store
    }

    /// Parse and serve one request line.
    pub fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(&request),
            Err(err) => error_response(
                Value::Null,
                &AdapterError::InvalidRequest(format!("malformed request: {err}")),
            ),
        }
    }

    /// Serve a parsed request.
    pub fn handle(&self, request: &Request) -> Response {
        match self.dispatch(&request.method, &request.params) {
            Ok(result) => Response {
                id: request.id.clone(),
                result: Some(result),
                error: None,
            },
            Err(err) => {
                info!(method = %request.method, kind = err.kind(), %err, "request failed");
                error_response(request.id.clone(), &err)
            }
        }
    }

    fn dispatch(&self, method: &str, params: &Value) -> AdapterResult<Value> {
        debug!(method, "dispatching request");
        match method {
            "get" => {
                let uid = param_uid(params)?;
                Ok(json!(object_path(self.store.get(uid)?)))
            }
            "create" => {
                let data = param_data(params)?;
                let props = param_properties(params, false)?;
                Ok(json!(object_path(self.store.create(data, &props)?)))
            }
            "delete" => {
                self.store.delete(param_object(params)?)?;
                Ok(json!(0))
            }
            "find" => {
                let filter = param_properties(params, false)?;
                let paths: Vec<String> = self
                    .store
                    .find(&filter)?
                    .into_iter()
                    .map(object_path)
                    .collect();
                Ok(json!(paths))
            }
            "get_data" => {
                let data = self.store.get_data(param_object(params)?)?;
                Ok(json!(data))
            }
            "set_data" => {
                let uid = param_object(params)?;
                self.store.set_data(uid, param_data(params)?)?;
                Ok(json!(0))
            }
            "get_properties" => {
                let uid = param_object(params)?;
                let keys = param_keys(params)?;
                Ok(json!(self.store.get_properties(uid, &keys)?))
            }
            "set_properties" => {
                let uid = param_object(params)?;
                let props = param_properties(params, true)?;
                self.store.set_properties(uid, &props)?;
                Ok(json!(0))
            }
            other => Err(AdapterError::InvalidRequest(format!(
                "unknown method {other}"
            ))),
        }
    }
}

fn error_response(id: Value, err: &AdapterError) -> Response {
    Response {
        id,
        result: None,
        error: Some(ErrorBody {
            kind: err.kind(),
            message: err.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Parameter extraction
// ---------------------------------------------------------------------------

fn field<'a>(params: &'a Value, name: &str) -> Option<&'a Value> {
    params.as_object().and_then(|map| map.get(name))
}

fn param_uid(params: &Value) -> AdapterResult<Uid> {
    field(params, "uid")
        .and_then(Value::as_i64)
        .ok_or_else(|| AdapterError::InvalidRequest("`uid` must be an integer".into()))
}

fn param_object(params: &Value) -> AdapterResult<Uid> {
    let path = field(params, "object")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::InvalidRequest("`object` must be an object path".into()))?;
    uid_from_path(path)
        .ok_or_else(|| AdapterError::InvalidRequest(format!("invalid object path {path}")))
}

fn param_data(params: &Value) -> AdapterResult<DataValue> {
    let value = field(params, "data")
        .cloned()
        .ok_or_else(|| AdapterError::InvalidRequest("missing `data`".into()))?;
    Ok(DataValue::try_from(value)?)
}

/// `properties` as a key → value map. Optional unless `required`.
fn param_properties(params: &Value, required: bool) -> AdapterResult<Properties> {
    let map = match field(params, "properties") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None if !required => Map::new(),
        _ => {
            return Err(AdapterError::InvalidRequest(
                "`properties` must be a map".into(),
            ));
        }
    };
    map.into_iter()
        .map(|(key, value)| Ok((key, DataValue::try_from(value)?)))
        .collect()
}

fn param_keys(params: &Value) -> AdapterResult<Vec<String>> {
    match field(params, "keys") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AdapterError::InvalidRequest("`keys` must be strings".into()))
            })
            .collect(),
        Some(_) => Err(AdapterError::InvalidRequest(
            "`keys` must be a list".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Logs each update instead of delivering it; used by one-shot commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn updated(&self, event: &UpdateEvent) {
        info!(
            object = %object_path(event.uid),
            data = event.data_changed,
            deleted = event.deleted,
            "Updated"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use datastore_core::{Database, EventBus};

    use super::*;

    fn dispatcher() -> (Dispatcher<EventBus>, tokio::sync::broadcast::Receiver<std::sync::Arc<UpdateEvent>>) {
        let bus = EventBus::new(16);
        let rx = bus.subscribe();
        let db = Database::open_in_memory().unwrap();
        let store = DataStore::with_database(db, bus).unwrap();
        (Dispatcher::new(store), rx)
    }

    fn call(d: &Dispatcher<EventBus>, request: Value) -> Value {
        let response = d.handle_line(&request.to_string());
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn create_then_read_back() {
        let (d, _rx) = dispatcher();

        let created = call(
            &d,
            json!({"id": 1, "method": "create", "params": {"data": [104, 105], "properties": {"title": "Foo", "rating": 5}}}),
        );
        assert_eq!(created["id"], 1);
        let path = created["result"].as_str().unwrap().to_string();
        assert_eq!(path, object_path(1));

        let data = call(&d, json!({"id": 2, "method": "get_data", "params": {"object": path}}));
        assert_eq!(data["result"], json!([104, 105]));

        let props = call(
            &d,
            json!({"id": 3, "method": "get_properties", "params": {"object": path, "keys": []}}),
        );
        assert_eq!(props["result"], json!({"title": "Foo", "rating": "5", "uid": "1"}));
    }

    #[test]
    fn get_returns_path_or_not_found() {
        let (d, _rx) = dispatcher();
        call(&d, json!({"id": 1, "method": "create", "params": {"data": "x"}}));

        let found = call(&d, json!({"id": 2, "method": "get", "params": {"uid": 1}}));
        assert_eq!(found["result"], json!(object_path(1)));

        let missing = call(&d, json!({"id": 3, "method": "get", "params": {"uid": 9}}));
        assert_eq!(missing["error"]["kind"], "NotFoundError");
        assert!(missing.get("result").is_none());
    }

    #[test]
    fn find_returns_paths() {
        let (d, _rx) = dispatcher();
        call(&d, json!({"method": "create", "params": {"data": "", "properties": {"title": "Foo"}}}));
        call(&d, json!({"method": "create", "params": {"data": "", "properties": {"author": "Bar"}}}));

        let found = call(
            &d,
            json!({"id": 1, "method": "find", "params": {"properties": {"title": "Foo", "author": "Bar"}}}),
        );
        assert_eq!(found["result"], json!([object_path(1), object_path(2)]));

        let blank = call(
            &d,
            json!({"id": 2, "method": "find", "params": {"properties": {"title": ""}}}),
        );
        assert_eq!(blank["error"]["kind"], "InvalidQueryError");
    }

    #[test]
    fn error_kinds_are_mapped() {
        let (d, _rx) = dispatcher();
        call(&d, json!({"method": "create", "params": {"data": "x"}}));
        let path = object_path(1);

        let reserved = call(
            &d,
            json!({"id": 1, "method": "set_properties", "params": {"object": path, "properties": {"uid": "99"}}}),
        );
        assert_eq!(reserved["error"]["kind"], "ReservedKeyError");

        let bad_data = call(
            &d,
            json!({"id": 2, "method": "set_data", "params": {"object": path, "data": 1.5}}),
        );
        assert_eq!(bad_data["error"]["kind"], "UnsupportedDataType");

        let bad_path = call(
            &d,
            json!({"id": 3, "method": "get_data", "params": {"object": "/not/a/path"}}),
        );
        assert_eq!(bad_path["error"]["kind"], "InvalidRequest");

        let unknown = call(&d, json!({"id": 4, "method": "explode"}));
        assert_eq!(unknown["error"]["kind"], "InvalidRequest");
    }

    #[test]
    fn malformed_line_is_invalid_request() {
        let (d, _rx) = dispatcher();
        let response = serde_json::to_value(d.handle_line("{not json")).unwrap();
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["kind"], "InvalidRequest");
    }

    #[test]
    fn set_properties_requires_a_map() {
        let (d, _rx) = dispatcher();
        call(&d, json!({"method": "create", "params": {"data": "x"}}));

        let response = call(
            &d,
            json!({"id": 1, "method": "set_properties", "params": {"object": object_path(1)}}),
        );
        assert_eq!(response["error"]["kind"], "InvalidRequest");
    }

    #[test]
    fn mutations_emit_updated_signals() {
        let (d, mut rx) = dispatcher();
        call(&d, json!({"method": "create", "params": {"data": "x"}}));
        call(&d, json!({"method": "delete", "params": {"object": object_path(1)}}));

        let signals: Vec<Signal> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| Signal::from(event.as_ref()))
            .collect();
        assert_eq!(signals.len(), 2);
        assert!(signals[0].data && !signals[0].deleted);
        assert!(signals[1].deleted && !signals[1].data);
        assert_eq!(signals[1].object, object_path(1));

        let line = serde_json::to_value(&signals[1]).unwrap();
        assert_eq!(line["signal"], "Updated");
        assert_eq!(line["properties"], json!({}));
    }
}
