//! Operation metadata and protocol version.

use http::{Method, Version};

/// Description of one API operation: the method and path it answers plus
/// the metadata a schema generator would publish.
///
/// Paths use `{name}` parameters, e.g. `/widgets/{id}`.
#[derive(Clone, Debug)]
pub struct Operation {
    pub operation_id: String,
    pub method: Method,
    pub path: String,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl Operation {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            operation_id: String::new(),
            method,
            path: path.into(),
            summary: String::new(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = operation_id.into();
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Protocol a request was received over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtoVersion {
    /// e.g. `"HTTP/1.1"`.
    pub proto: String,
    pub major: u8,
    pub minor: u8,
}

impl From<Version> for ProtoVersion {
    fn from(version: Version) -> Self {
        let (proto, major, minor) = match version {
            Version::HTTP_09 => ("HTTP/0.9", 0, 9),
            Version::HTTP_10 => ("HTTP/1.0", 1, 0),
            Version::HTTP_2  => ("HTTP/2.0", 2, 0),
            Version::HTTP_3  => ("HTTP/3.0", 3, 0),
            _                => ("HTTP/1.1", 1, 1),
        };
        Self { proto: proto.to_owned(), major, minor }
    }
}
