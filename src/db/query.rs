use serde_json::json;

/// A composable predicate for document listings. Encoded to the backend's
/// JSON query representation and sent as a repeated `queries[]` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Keep documents whose attribute equals the value.
    Equal {
        attribute: String,
        value: serde_json::Value,
    },
    /// Full-text match on one attribute.
    Search { attribute: String, term: String },
    /// Order by an attribute, newest first.
    OrderDesc { attribute: String },
    /// Cap the number of documents returned.
    Limit(u32),
    /// Return the page following the document with this id.
    CursorAfter(String),
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Query::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn search(attribute: impl Into<String>, term: impl Into<String>) -> Self {
        Query::Search {
            attribute: attribute.into(),
            term: term.into(),
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Query::OrderDesc {
            attribute: attribute.into(),
        }
    }

    pub fn limit(n: u32) -> Self {
        Query::Limit(n)
    }

    pub fn cursor_after(id: impl Into<String>) -> Self {
        Query::CursorAfter(id.into())
    }

    /// Wire encoding of this predicate.
    pub fn encode(&self) -> String {
        let value = match self {
            Query::Equal { attribute, value } => json!({
                "method": "equal",
                "attribute": attribute,
                "values": [value],
            }),
            Query::Search { attribute, term } => json!({
                "method": "search",
                "attribute": attribute,
                "values": [term],
            }),
            Query::OrderDesc { attribute } => json!({
                "method": "orderDesc",
                "attribute": attribute,
            }),
            Query::Limit(n) => json!({
                "method": "limit",
                "values": [n],
            }),
            Query::CursorAfter(id) => json!({
                "method": "cursorAfter",
                "values": [id],
            }),
        };
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_encodes_attribute_and_value() {
        let encoded = Query::equal("accountId", "a1").encode();
        assert_eq!(
            encoded,
            r#"{"attribute":"accountId","method":"equal","values":["a1"]}"#
        );
    }

    #[test]
    fn search_encodes_term() {
        let encoded = Query::search("caption", "golden hour").encode();
        assert_eq!(
            encoded,
            r#"{"attribute":"caption","method":"search","values":["golden hour"]}"#
        );
    }

    #[test]
    fn order_desc_carries_no_values() {
        let encoded = Query::order_desc("$createdAt").encode();
        assert_eq!(encoded, r#"{"attribute":"$createdAt","method":"orderDesc"}"#);
    }

    #[test]
    fn limit_encodes_number_unquoted() {
        let encoded = Query::limit(20).encode();
        assert_eq!(encoded, r#"{"method":"limit","values":[20]}"#);
    }

    #[test]
    fn cursor_after_encodes_document_id() {
        let encoded = Query::cursor_after("p5").encode();
        assert_eq!(encoded, r#"{"method":"cursorAfter","values":["p5"]}"#);
    }
}
