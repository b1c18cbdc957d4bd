use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Postman v2.x collection. Fields the runner does not interpret are kept in
/// `extras` so a prepared collection serializes back without losing data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Collection {
    #[serde(skip_serializing_if = "CollectionInfo::is_empty")]
    pub info: CollectionInfo,
    pub item: Vec<Item>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variable: Vec<Variable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event: Vec<Event>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl CollectionInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.extras.is_empty()
    }
}

/// Either a folder (`item` is set) or a request leaf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<Item>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event: Vec<Event>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Item {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Concatenated source of every `test` script attached to this item.
    pub fn test_script(&self) -> String {
        self.event
            .iter()
            .filter(|event| event.listen == "test")
            .filter_map(|event| event.script.as_ref())
            .map(Script::source)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub url: RequestUrl,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: default_method(),
            url: RequestUrl::default(),
            header: Vec::new(),
            body: None,
            extras: Map::new(),
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestUrl {
    Raw(String),
    Detailed(UrlObject),
}

impl Default for RequestUrl {
    fn default() -> Self {
        RequestUrl::Raw(String::new())
    }
}

impl RequestUrl {
    pub fn raw(&self) -> String {
        match self {
            RequestUrl::Raw(raw) => raw.clone(),
            RequestUrl::Detailed(detailed) => detailed.to_raw(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl UrlObject {
    /// Prefers `raw`; otherwise rebuilds the URL from its structured parts.
    pub fn to_raw(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }

        let mut url = String::new();
        if let Some(protocol) = self.extras.get("protocol").and_then(Value::as_str) {
            url.push_str(protocol);
            url.push_str("://");
        }
        url.push_str(&join_parts(self.extras.get("host"), "."));
        if let Some(port) = self.extras.get("port").and_then(Value::as_str) {
            url.push(':');
            url.push_str(port);
        }
        let path = join_parts(self.extras.get("path"), "/");
        if !path.is_empty() {
            url.push('/');
            url.push_str(&path);
        }

        let query: Vec<String> = self
            .extras
            .get("query")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter(|param| !param.get("disabled").and_then(Value::as_bool).unwrap_or(false))
                    .filter_map(|param| {
                        let key = param.get("key").and_then(Value::as_str)?;
                        let value = param.get("value").and_then(Value::as_str).unwrap_or("");
                        Some(format!("{key}={value}"))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

fn join_parts(value: Option<&Value>, separator: &str) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(separator),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    Raw,
    Urlencoded,
    Formdata,
    File,
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urlencoded: Option<Vec<FormParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formdata: Option<Vec<FormParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Body {
    pub fn mode(&self) -> Option<BodyMode> {
        let mode = self.mode.as_deref()?;
        Some(match mode {
            "raw" => BodyMode::Raw,
            "urlencoded" => BodyMode::Urlencoded,
            "formdata" => BodyMode::Formdata,
            "file" => BodyMode::File,
            _ => BodyMode::Other,
        })
    }

    /// Language hint of a raw body (`options.raw.language`), e.g. `json`.
    pub fn raw_language(&self) -> Option<&str> {
        self.options
            .as_ref()?
            .get("raw")?
            .get("language")?
            .as_str()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormParam {
    pub key: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<FileSource>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl FormParam {
    pub fn is_file(&self) -> bool {
        self.kind.as_deref() == Some("file")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSource {
    Single(String),
    Multiple(Vec<String>),
}

impl FileSource {
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            FileSource::Single(path) => vec![PathBuf::from(path)],
            FileSource::Multiple(paths) => paths.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub listen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<ScriptSource>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Script {
    pub fn source(&self) -> String {
        match &self.exec {
            Some(ScriptSource::Lines(lines)) => lines.join("\n"),
            Some(ScriptSource::Text(text)) => text.clone(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptSource {
    Lines(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Variable {
    pub key: String,
    /// `Some(Value::Null)` for an explicit `null`, `None` when absent.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Variable {
    pub fn value_string(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// A request leaf together with the names of the folders that contain it.
#[derive(Debug, Clone)]
pub struct RequestRef<'a> {
    pub folders: Vec<&'a str>,
    pub item: &'a Item,
    pub request: &'a Request,
}

impl<'a> RequestRef<'a> {
    pub fn display_path(&self) -> String {
        let mut parts = self.folders.clone();
        parts.push(self.item.name());
        parts.join(" / ")
    }
}

impl Collection {
    pub fn name(&self) -> &str {
        self.info.name.as_deref().unwrap_or("collection")
    }

    /// Request leaves in execution order (depth-first, document order).
    pub fn requests(&self) -> Vec<RequestRef<'_>> {
        let mut out = Vec::new();
        let mut stack: Vec<(Vec<&str>, &Item)> =
            self.item.iter().rev().map(|item| (Vec::new(), item)).collect();

        while let Some((folders, item)) = stack.pop() {
            if let Some(children) = &item.item {
                let mut path = folders.clone();
                path.push(item.name());
                stack.extend(children.iter().rev().map(|child| (path.clone(), child)));
                continue;
            }
            if let Some(request) = &item.request {
                out.push(RequestRef {
                    folders,
                    item,
                    request,
                });
            }
        }

        out
    }

    /// Enabled collection-level variables, in declaration order.
    pub fn variables(&self) -> Vec<(String, String)> {
        self.variable
            .iter()
            .filter(|var| !var.disabled)
            .filter_map(|var| Some((var.key.clone(), var.value_string()?)))
            .collect()
    }
}
