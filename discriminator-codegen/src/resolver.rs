/// Reference resolution for `$ref`.
///
/// A `RefResolver` owns the root document it resolves against, so callers
/// pass only the base URI in effect and the reference string. References are
/// canonicalized to `<uri>#<fragment>`; the canonical form is what the
/// compiler uses as the definition key.
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

/// Stand-in base for documents without an absolute `$id`, so relative
/// references still resolve by RFC 3986 rules.
const RELATIVE_ROOT: &str = "json-schema:///";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no schema document with id '{0}'")]
    UnknownDocument(String),
    #[error("JSON pointer '{pointer}' not found in '{document}'")]
    PointerNotFound { document: String, pointer: String },
    #[error("anchor '{anchor}' not found in '{document}'")]
    AnchorNotFound { document: String, anchor: String },
}

/// A successfully resolved reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub schema: &'a Value,
    /// Base URI in effect inside `schema`.
    pub base_id: String,
    /// Canonical `<uri>#<fragment>` form of the reference.
    pub key: String,
}

pub trait RefResolver {
    /// The document compilation starts from.
    fn root(&self) -> &Value;

    /// Base URI of the root document (its `$id`, or empty).
    fn root_id(&self) -> &str;

    fn resolve(&self, base_id: &str, reference: &str) -> Result<Resolved<'_>, ResolveError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DocRef {
    Root,
    External(String),
}

/// Resolves references within the root document and any documents
/// registered with [`LocalResolver::with_document`]. Nothing is fetched.
#[derive(Debug, Clone)]
pub struct LocalResolver {
    root: Value,
    root_id: String,
    documents: HashMap<String, Value>,
    /// Absolute `$id` (fragment stripped) -> location of the identified schema.
    ids: Locations,
    /// `<uri>#<anchor>` -> location of the anchored schema.
    anchors: Locations,
}

impl LocalResolver {
    pub fn new(root: Value) -> Self {
        let root_id = root
            .get("$id")
            .and_then(Value::as_str)
            .map(|id| rebase("", id))
            .unwrap_or_default();
        let mut ids = HashMap::new();
        let mut anchors = HashMap::new();
        index(&root, &DocRef::Root, &root_id, &mut ids, &mut anchors);
        Self {
            root,
            root_id,
            documents: HashMap::new(),
            ids,
            anchors,
        }
    }

    /// Register an external document under `uri`. Its own `$id`, when
    /// present, is resolved against `uri`.
    pub fn with_document(mut self, uri: &str, schema: Value) -> Self {
        let uri = rebase("", uri);
        let base = match schema.get("$id").and_then(Value::as_str) {
            Some(id) => rebase(&uri, id),
            None => uri.clone(),
        };
        let doc = DocRef::External(uri.clone());
        self.ids.insert(uri.clone(), (doc.clone(), String::new()));
        index(&schema, &doc, &base, &mut self.ids, &mut self.anchors);
        self.documents.insert(uri, schema);
        self
    }

    fn document(&self, doc: &DocRef) -> Option<&Value> {
        match doc {
            DocRef::Root => Some(&self.root),
            DocRef::External(uri) => self.documents.get(uri),
        }
    }

    fn locate(&self, doc: &DocRef, pointer: &str) -> Option<&Value> {
        self.document(doc)?.pointer(pointer)
    }
}

impl RefResolver for LocalResolver {
    fn root(&self) -> &Value {
        &self.root
    }

    fn root_id(&self) -> &str {
        &self.root_id
    }

    fn resolve(&self, base_id: &str, reference: &str) -> Result<Resolved<'_>, ResolveError> {
        let target = join(base_id, reference);
        let (uri, fragment) = split_fragment(&target);

        let (schema, base) = if fragment.starts_with('/') || fragment.is_empty() {
            let located = if uri == self.root_id {
                Some((DocRef::Root, String::new()))
            } else {
                self.ids.get(uri).cloned()
            };
            let (doc, prefix) =
                located.ok_or_else(|| ResolveError::UnknownDocument(uri.to_string()))?;
            let pointer = format!("{prefix}{}", percent_decode_str(fragment).decode_utf8_lossy());
            let schema =
                self.locate(&doc, &pointer)
                    .ok_or_else(|| ResolveError::PointerNotFound {
                        document: uri.to_string(),
                        pointer: fragment.to_string(),
                    })?;
            (schema, uri.to_string())
        } else {
            let (doc, pointer) = self
                .anchors
                .get(&format!("{uri}#{fragment}"))
                .ok_or_else(|| ResolveError::AnchorNotFound {
                    document: uri.to_string(),
                    anchor: fragment.to_string(),
                })?;
            let schema = self
                .locate(doc, pointer)
                .ok_or_else(|| ResolveError::UnknownDocument(uri.to_string()))?;
            (schema, uri.to_string())
        };

        let base_id = match schema.get("$id").and_then(Value::as_str) {
            Some(id) => rebase(&base, id),
            None => base,
        };

        tracing::trace!(reference, base = base_id.as_str(), "resolved reference");

        Ok(Resolved {
            schema,
            base_id,
            key: format!("{uri}#{fragment}"),
        })
    }
}

type Locations = HashMap<String, (DocRef, String)>;

/// Record every embedded `$id` and `$anchor` below `schema`.
fn index(schema: &Value, doc: &DocRef, base: &str, ids: &mut Locations, anchors: &mut Locations) {
    let mut stack = vec![(schema, base.to_string(), String::new())];
    while let Some((value, base, pointer)) = stack.pop() {
        match value {
            Value::Object(obj) => {
                let mut base = base;
                if let Some(id) = obj.get("$id").and_then(Value::as_str) {
                    base = rebase(&base, id);
                    ids.entry(base.clone())
                        .or_insert_with(|| (doc.clone(), pointer.clone()));
                }
                if let Some(anchor) = obj.get("$anchor").and_then(Value::as_str) {
                    anchors.insert(format!("{base}#{anchor}"), (doc.clone(), pointer.clone()));
                }
                for (key, child) in obj {
                    // Literal data, not subschemas.
                    if matches!(key.as_str(), "const" | "enum" | "default" | "examples") {
                        continue;
                    }
                    stack.push((child, base.clone(), format!("{pointer}/{}", escape_pointer(key))));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    stack.push((child, base.clone(), format!("{pointer}/{i}")));
                }
            }
            _ => {}
        }
    }
}

/// Join a reference against a base URI.
pub fn join(base: &str, reference: &str) -> String {
    let base = strip_fragment(base);
    if reference.starts_with('#') {
        return format!("{base}{reference}");
    }
    let joined = match Url::parse(base) {
        Ok(base) => base.join(reference),
        Err(_) => Url::parse(RELATIVE_ROOT)
            .and_then(|root| root.join(base))
            .and_then(|base| base.join(reference)),
    };
    match joined {
        Ok(url) => {
            let url = url.as_str();
            url.strip_prefix(RELATIVE_ROOT).unwrap_or(url).to_string()
        }
        Err(_) => reference.to_string(),
    }
}

/// Base URI in effect inside a schema whose `$id` is `id`.
pub fn rebase(base: &str, id: &str) -> String {
    strip_fragment(&join(base, id)).to_string()
}

fn split_fragment(uri: &str) -> (&str, &str) {
    match uri.find('#') {
        Some(i) => (&uri[..i], &uri[i + 1..]),
        None => (uri, ""),
    }
}

fn strip_fragment(uri: &str) -> &str {
    split_fragment(uri).0
}

/// Escape one JSON pointer segment (RFC 6901).
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
