/*
 * Copyright 2021 the alarmdotcom_sdk developers
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
//! JSON:API document codec.
//!
//! Alarm.com's Ember front end speaks mostly RFC-compliant JSON:API with two
//! quirks this module absorbs: resource ids sometimes arrive as JSON numbers
//! (always exposed as strings here), and a handful of endpoints answer with
//! a non-JSON:API "mini" envelope `{value, errors, meta}` instead of a
//! document.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Deserializes a resource id that may arrive as a string or a number.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// `{type, id}` pair identifying a resource in a relationship or linkage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Linkage inside a relationship: absent, to-one (possibly null), or to-many.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Linkage {
    One(Option<ResourceIdentifier>),
    Many(Vec<ResourceIdentifier>),
}

/// Relationship object. At least one of `data`, `links`, `meta` is present
/// on the wire; shapes with none are rejected at the document level.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// A single JSON:API resource object.
///
/// Attributes are kept as a raw map: typed decoding happens in
/// [`crate::models`], and the raw resource is preserved for diffing and for
/// re-serialization after WebSocket-driven mutations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Resource {
    /// The single resource identifier under relationship `key`, if the
    /// relationship exists and its data is a non-null to-one linkage.
    pub fn has_one(&self, key: &str) -> Option<&ResourceIdentifier> {
        match self.relationships.as_ref()?.get(key)?.data.as_ref()? {
            Linkage::One(one) => one.as_ref(),
            Linkage::Many(_) => None,
        }
    }

    /// All resource identifiers under relationship `key`.
    pub fn has_many(&self, key: &str) -> Vec<&ResourceIdentifier> {
        match self
            .relationships
            .as_ref()
            .and_then(|rels| rels.get(key))
            .and_then(|rel| rel.data.as_ref())
        {
            Some(Linkage::Many(many)) => many.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Ids of every related resource across all relationships.
    pub fn all_related_ids(&self) -> std::collections::HashSet<String> {
        let mut ids = std::collections::HashSet::new();
        for rel in self.relationships.iter().flat_map(|rels| rels.values()) {
            match &rel.data {
                Some(Linkage::One(Some(one))) => {
                    ids.insert(one.id.clone());
                }
                Some(Linkage::Many(many)) => {
                    ids.extend(many.iter().map(|ri| ri.id.clone()));
                }
                _ => {}
            }
        }
        ids
    }
}

/// Error object carried by failure documents and mini envelopes.
///
/// `code` arrives as a string in documents and as an integer in mini
/// envelopes; it is normalized to a string.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    #[serde(
        default,
        deserialize_with = "opt_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn code_u16(&self) -> Option<u16> {
        self.code.as_deref().and_then(|code| code.parse().ok())
    }
}

/// Primary data of a success document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DocumentData {
    Many(Vec<Resource>),
    One(Resource),
}

impl DocumentData {
    pub fn into_vec(self) -> Vec<Resource> {
        match self {
            DocumentData::One(resource) => vec![resource],
            DocumentData::Many(resources) => resources,
        }
    }

    pub fn as_slice(&self) -> &[Resource] {
        match self {
            DocumentData::One(resource) => std::slice::from_ref(resource),
            DocumentData::Many(resources) => resources,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SuccessDocument {
    pub data: DocumentData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<Value>,
}

impl SuccessDocument {
    /// Included resources of the given wire type.
    pub fn included_of(&self, kind: &str) -> Vec<&Resource> {
        self.included.iter().filter(|r| r.kind == kind).collect()
    }

    /// The single primary resource, or an error when the document carries a
    /// collection.
    pub fn single(self) -> Result<Resource> {
        match self.data {
            DocumentData::One(resource) => Ok(resource),
            DocumentData::Many(_) => Err(Error::unexpected(
                "expected a single resource, got a collection",
            )),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FailureDocument {
    pub errors: Vec<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetaDocument {
    pub meta: Map<String, Value>,
}

/// A parsed JSON:API document, discriminated by shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Success(SuccessDocument),
    Failure(FailureDocument),
    Meta(MetaDocument),
}

impl Document {
    /// Classifies and parses a response body.
    ///
    /// Shape rules: a non-empty `errors` member makes the document a
    /// failure; otherwise a `data` member makes it a success; a body with
    /// only `meta` is a meta document. Anything else is rejected.
    pub fn parse(body: &str) -> Result<Document> {
        let value: Value = serde_json::from_str(body)
            .map_err(|err| Error::unexpected(format!("response was not JSON: {}", err)))?;
        Document::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Document> {
        let object = match &value {
            Value::Object(object) => object,
            _ => return Err(Error::unexpected("JSON:API document was not an object")),
        };

        let has_errors = object
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| !errors.is_empty())
            .unwrap_or(false);

        if has_errors {
            let failure: FailureDocument = serde_json::from_value(value)
                .map_err(|err| Error::unexpected(format!("malformed failure document: {}", err)))?;
            return Ok(Document::Failure(failure));
        }

        if object.contains_key("data") {
            let success: SuccessDocument = serde_json::from_value(value)
                .map_err(|err| Error::unexpected(format!("malformed success document: {}", err)))?;
            return Ok(Document::Success(success));
        }

        if object.contains_key("meta") {
            let meta: MetaDocument = serde_json::from_value(value)
                .map_err(|err| Error::unexpected(format!("malformed meta document: {}", err)))?;
            return Ok(Document::Meta(meta));
        }

        Err(Error::unexpected(
            "response is not a recognizable JSON:API document",
        ))
    }
}

/// Non-JSON:API success/error wrapper used by the WebSocket token and OTP
/// endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MiniEnvelope {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl MiniEnvelope {
    pub fn parse(body: &str) -> Result<MiniEnvelope> {
        serde_json::from_str(body)
            .map_err(|err| Error::unexpected(format!("malformed mini envelope: {}", err)))
    }

    /// Whether the envelope carries errors; a non-empty `errors` list makes
    /// the response a failure regardless of `value`.
    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The `value` member as a string, if present.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// A string member of `meta`, e.g. the WebSocket `endpoint`.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"page(?:\[|%5[Bb])number(?:\]|%5[Dd])=(\d+)").unwrap());

/// Extracts the `page[number]` query parameter from a pagination link.
pub fn page_number(link: &str) -> Option<u32> {
    PAGE_NUMBER
        .captures(link)
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_parse_single_resource_document() {
        let body = r#"{
            "data": {
                "id": 12345,
                "type": "devices/light",
                "attributes": {"description": "Porch", "state": 2},
                "relationships": {
                    "system": {"data": {"id": "1", "type": "systems/system"}},
                    "stateInfo": {"data": null}
                }
            },
            "included": []
        }"#;

        let doc = match Document::parse(body).unwrap() {
            Document::Success(doc) => doc,
            other => panic!("expected success document, got {:?}", other),
        };
        let resource = doc.single().unwrap();
        assert_eq!(resource.id, "12345");
        assert_eq!(resource.kind, "devices/light");
        assert_eq!(resource.has_one("system").unwrap().id, "1");
        assert_eq!(resource.has_one("stateInfo"), None);
    }

    #[test]
    fn must_parse_collection_and_included() {
        let body = r#"{
            "data": [
                {"id": "1-1", "type": "devices/sensor", "attributes": {}},
                {"id": "1-2", "type": "devices/sensor", "attributes": {}}
            ],
            "included": [
                {"id": "1", "type": "systems/system", "attributes": {}}
            ]
        }"#;

        let doc = match Document::parse(body).unwrap() {
            Document::Success(doc) => doc,
            other => panic!("expected success document, got {:?}", other),
        };
        assert_eq!(doc.data.as_slice().len(), 2);
        assert_eq!(doc.included_of("systems/system").len(), 1);
        assert_eq!(doc.included_of("devices/light").len(), 0);
    }

    #[test]
    fn must_classify_failures_before_data() {
        let body = r#"{"data": null, "errors": [{"code": 401}, {"code": "403"}]}"#;
        let failure = match Document::parse(body).unwrap() {
            Document::Failure(failure) => failure,
            other => panic!("expected failure document, got {:?}", other),
        };
        let codes: Vec<u16> = failure.errors.iter().filter_map(ApiError::code_u16).collect();
        assert_eq!(codes, vec![401, 403]);
    }

    #[test]
    fn must_reject_unknown_shapes() {
        for body in ["[1, 2]", "{}", r#"{"value": 3}"#, "\"nope\""] {
            assert!(matches!(
                Document::parse(body),
                Err(Error::UnexpectedResponse { .. })
            ));
        }
    }

    #[test]
    fn must_treat_empty_errors_as_success() {
        let body = r#"{"data": [], "errors": []}"#;
        assert!(matches!(
            Document::parse(body).unwrap(),
            Document::Success(_)
        ));
    }

    #[test]
    fn must_round_trip_success_documents() {
        let body = r#"{
            "data": {
                "id": "1-7",
                "type": "devices/light",
                "attributes": {"state": 2, "lightLevel": 80},
                "relationships": {"system": {"data": {"id": "1", "type": "systems/system"}}}
            },
            "included": [{"id": "1", "type": "systems/system", "attributes": {}}],
            "meta": {"pageCount": 1}
        }"#;

        let parsed: Value = serde_json::from_str(body).unwrap();
        let doc = Document::from_value(parsed.clone()).unwrap();
        let encoded = match doc {
            Document::Success(success) => serde_json::to_value(success).unwrap(),
            other => panic!("expected success document, got {:?}", other),
        };
        assert_eq!(encoded, parsed);
    }

    #[test]
    fn must_collect_all_related_ids() {
        let body = r#"{
            "id": "p1",
            "type": "devices/partition",
            "attributes": {},
            "relationships": {
                "system": {"data": {"id": "1", "type": "systems/system"}},
                "sensors": {"data": [
                    {"id": "1-2", "type": "devices/sensor"},
                    {"id": "1-3", "type": "devices/sensor"}
                ]},
                "linksOnly": {"links": {"self": "https://example.invalid"}}
            }
        }"#;
        let resource: Resource = serde_json::from_str(body).unwrap();
        let ids = resource.all_related_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("1") && ids.contains("1-2") && ids.contains("1-3"));
    }

    #[test]
    fn must_demote_mini_envelope_with_errors() {
        let envelope =
            MiniEnvelope::parse(r#"{"value": "token", "errors": [{"code": 409}]}"#).unwrap();
        assert!(envelope.is_failure());

        let ok = MiniEnvelope::parse(
            r#"{"value": "token", "errors": [], "meta": {"endpoint": "wss://example.invalid"}}"#,
        )
        .unwrap();
        assert!(!ok.is_failure());
        assert_eq!(ok.value_str(), Some("token"));
        assert_eq!(ok.meta_str("endpoint"), Some("wss://example.invalid"));
    }

    #[test]
    fn must_extract_page_numbers() {
        assert_eq!(
            page_number("https://www.alarm.com/web/api/devices/sensors?page[number]=3"),
            Some(3)
        );
        assert_eq!(
            page_number("https://www.alarm.com/web/api/devices/sensors?page%5Bnumber%5D=12"),
            Some(12)
        );
        assert_eq!(page_number("https://www.alarm.com/web/api/devices/sensors"), None);
    }
}
