use std::cell::Cell;

use log::debug;
use reqwest::blocking::{ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::store::{Document, DocumentStore, Filter, StoreError};

/// Error code a document server uses for unique index violations.
const DUPLICATE_KEY: i64 = 11000;

#[derive(Serialize, Debug)]
struct JsonReq {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u32,
}

#[derive(Deserialize, Debug)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcError> for StoreError {
    fn from(value: RpcError) -> Self {
        if value.code == DUPLICATE_KEY {
            let data = value.data.unwrap_or(Value::Null);
            let field = |key: &str| data.get(key).and_then(Value::as_str).unwrap_or("unknown").to_owned();

            return Self::Duplicate {
                field: field("field"),
                value: field("value"),
            };
        }

        Self::Server {
            code: value.code,
            message: value.message,
        }
    }
}

#[derive(Deserialize)]
struct Modified {
    modified: usize,
}

#[derive(Deserialize)]
struct Deleted {
    deleted: usize,
}

fn get_builder(config: &Config) -> ClientBuilder {
    ClientBuilder::new().danger_accept_invalid_certs(!config.verify_host)
}

fn get_response(client: &reqwest::blocking::Client, request_url: &str, req: &JsonReq) -> Result<Response, StoreError> {
    match client.post(request_url).json(&req).send() {
        Ok(r) => {
            if r.status().is_success() {
                Ok(r)
            } else {
                Err(StoreError::Request(format!("Server responded with code {}", r.status())))
            }
        }
        Err(e) => Err(StoreError::Request(e.to_string())),
    }
}

/// Document store reached over JSON-RPC 2.0.
pub struct RemoteStore {
    client: reqwest::blocking::Client,
    request_number: Cell<u32>,
    host: String,
    token: String,
}

impl RemoteStore {
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        if config.host.is_empty() {
            return Err(StoreError::Request("No host configured for the remote backend".to_owned()));
        }

        Ok(Self {
            client: get_builder(config)
                .build()
                .map_err(|error| StoreError::Request(error.to_string()))?,
            request_number: Cell::new(1),
            host: config.host.clone(),
            token: config.token.clone(),
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, collection: &str, mut params: Value) -> Result<T, StoreError> {
        if let Some(params) = params.as_object_mut() {
            params.insert("authToken".to_owned(), Value::from(self.token.as_str()));
            params.insert("collection".to_owned(), Value::from(collection));
        }

        let req = JsonReq {
            jsonrpc: String::from("2.0"),
            method: method.to_owned(),
            params,
            id: self.request_number.get(),
        };
        self.request_number.set(self.request_number.get() + 1);

        debug!("Sending request to {}:\n{:#?}\n", self.host, req);

        let json: Value = get_response(&self.client, &self.host, &req)?
            .json()
            .map_err(|_| StoreError::Request("Server response did not contain JSON".to_owned()))?;

        debug!("Received response:\n{:#?}\n", json);

        let response: RpcResponse = serde_json::from_value(json)?;
        match (response.result, response.error) {
            (_, Some(error)) => Err(error.into()),
            (Some(result), None) => Ok(serde_json::from_value(result)?),
            (None, None) => Ok(serde_json::from_value(Value::Null)?),
        }
    }
}

impl DocumentStore for RemoteStore {
    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.call("findOne", collection, json!({ "filter": filter.to_query() }))
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.call("find", collection, json!({ "filter": filter.to_query() }))
    }

    fn insert(&self, collection: &str, record: Document) -> Result<Document, StoreError> {
        self.call("insert", collection, json!({ "record": record }))
    }

    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError> {
        self.call::<Modified>(
            "updateOne",
            collection,
            json!({ "filter": filter.to_query(), "patch": { "$set": patch } }),
        )
        .map(|result| result.modified)
    }

    fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError> {
        self.call::<Modified>(
            "updateMany",
            collection,
            json!({ "filter": filter.to_query(), "patch": { "$set": patch } }),
        )
        .map(|result| result.modified)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        self.call::<Deleted>("deleteOne", collection, json!({ "filter": filter.to_query() }))
            .map(|result| result.deleted)
    }

    fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.call::<Value>("ensureIndex", collection, json!({ "field": field, "unique": true }))
            .map(|_| ())
    }
}
