//! Document parsing and per-cell indexing

use cellmap_types::{CellXY, Claim, ClaimType, Document, DocumentType, Release};
use hashbrown::HashMap;
use serde_json::Value;
use time::OffsetDateTime;

use super::EngineError;

/// Result of the single classification pass over the input documents.
#[derive(Debug, Default)]
pub struct DocumentIndex<'a> {
    /// Every document covering each cell, in input order
    pub cells: HashMap<CellXY, Vec<&'a Document>>,
    pub exterior_claims: Vec<&'a Claim>,
    pub releases: Vec<&'a Release>,
}

/// Index the documents that exist at `at`.
///
/// Every claim is validated first, including ones created after `at`, so a
/// malformed log fails regardless of the query time.
pub fn index_documents(
    documents: &[Document],
    at: OffsetDateTime,
) -> Result<DocumentIndex<'_>, EngineError> {
    let invalid = documents.iter().find_map(|doc| match doc {
        Document::Claim(claim) if claim.updates.is_empty() => Some(claim),
        _ => None,
    });
    if let Some(claim) = invalid {
        return Err(EngineError::ClaimWithoutUpdates {
            claim_id: claim.id.clone(),
        });
    }

    let mut index = DocumentIndex::default();

    for doc in documents.iter().filter(|doc| doc.created_at() <= at) {
        match doc {
            Document::Claim(claim) if claim.claim_type == ClaimType::Exterior => {
                index.exterior_claims.push(claim);
            }
            Document::Claim(_) => {}
            Document::Release(release) => index.releases.push(release),
        }

        for cell in doc.cells() {
            let covering = index.cells.entry(*cell).or_default();
            // A document naming the same cell twice is listed once
            if covering.last().is_some_and(|last| std::ptr::eq(*last, doc)) {
                continue;
            }
            covering.push(doc);
        }
    }

    Ok(index)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse one stored document, rejecting any type other than CLAIM or RELEASE.
pub fn parse_document(value: Value) -> Result<Document, EngineError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();

    let tag = match value.get("type") {
        Some(Value::String(tag)) => tag.clone(),
        Some(other) => {
            return Err(EngineError::UnknownDocumentType {
                id,
                kind: other.to_string(),
            });
        }
        None => return Err(EngineError::MissingDocumentType { id }),
    };

    let document_type = DocumentType::from_tag(&tag)
        .ok_or_else(|| EngineError::UnknownDocumentType {
            id: id.clone(),
            kind: tag,
        })?;

    serde_json::from_value(value).map_err(|source| EngineError::InvalidDocument {
        id,
        kind: document_type.as_str(),
        source,
    })
}

/// Parse a JSON text holding either one document or an array of them.
pub fn parse_documents(json: &str) -> Result<Vec<Document>, EngineError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(values) => values.into_iter().map(parse_document).collect(),
        value @ Value::Object(_) => Ok(vec![parse_document(value)?]),
        other => Err(EngineError::UnexpectedJson {
            found: json_kind(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{claim, claim_doc, release_doc, t};
    use cellmap_types::ClaimStatus;

    #[test]
    fn test_index_groups_documents_by_cell() {
        let docs = vec![
            claim_doc("ext", ClaimType::Exterior, &[(0, 0), (0, 1)], ClaimStatus::InProgress),
            claim_doc("int", ClaimType::Interior, &[(0, 1)], ClaimStatus::NotStarted),
            release_doc("rel", "TR", &[(0, 1), (5, 5)], None),
        ];
        let index = index_documents(&docs, t(1)).unwrap();

        assert_eq!(index.cells.len(), 3);
        let ids: Vec<&str> = index.cells[&CellXY::new(0, 1)].iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["ext", "int", "rel"]);
        assert_eq!(index.exterior_claims.len(), 1);
        assert_eq!(index.exterior_claims[0].id, "ext");
        assert_eq!(index.releases.len(), 1);
    }

    #[test]
    fn test_index_drops_documents_created_later() {
        let mut later = claim("later", ClaimType::Exterior, &[(1, 1)], &[(ClaimStatus::Done, t(5))]);
        later.created_at = t(5);
        let docs = vec![Document::Claim(later)];

        assert!(index_documents(&docs, t(4)).unwrap().cells.is_empty());
        assert_eq!(index_documents(&docs, t(5)).unwrap().cells.len(), 1);
    }

    #[test]
    fn test_index_lists_repeated_cell_once() {
        let docs = vec![claim_doc("dup", ClaimType::Quest, &[(2, 2), (2, 2)], ClaimStatus::Done)];
        let index = index_documents(&docs, t(1)).unwrap();
        assert_eq!(index.cells[&CellXY::new(2, 2)].len(), 1);
    }

    #[test]
    fn test_index_rejects_claim_without_updates() {
        let mut empty = claim("empty", ClaimType::Interior, &[(0, 0)], &[]);
        empty.created_at = t(100);
        let docs = vec![Document::Claim(empty)];

        assert!(matches!(
            index_documents(&docs, t(1)),
            Err(EngineError::ClaimWithoutUpdates { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let json = r#"{"type": "REDO", "id": "redo-1", "date": "2021-01-01T00:00:00Z"}"#;
        let err = parse_documents(json).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnknownDocumentType { ref id, ref kind } if id == "redo-1" && kind == "REDO"
        ));

        let err = parse_documents(r#"[{"id": "x"}]"#).unwrap_err();
        assert!(matches!(err, EngineError::MissingDocumentType { .. }));
    }

    #[test]
    fn test_parse_rejects_fractional_cells() {
        let json = r#"{
            "type": "RELEASE",
            "id": "bad",
            "date": "2021-01-01T00:00:00Z",
            "releasedCells": [{"x": 0.5, "y": 1}],
            "creator": "TR",
            "startDate": "2021-01-01T00:00:00Z"
        }"#;
        let err = parse_documents(json).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidDocument { kind: "RELEASE", .. }
        ));
    }

    #[test]
    fn test_parse_accepts_object_or_array() {
        let one = r#"{
            "type": "RELEASE",
            "id": "vvardenfell",
            "date": "2002-05-01T00:00:00Z",
            "releasedCells": [{"x": 0, "y": 0}],
            "creator": "BETHESDA",
            "startDate": "2002-05-01T00:00:00Z",
            "releaseDate": "2002-05-01T00:00:00Z"
        }"#;
        assert_eq!(parse_documents(one).unwrap().len(), 1);
        assert_eq!(parse_documents(&format!("[{one}, {one}]")).unwrap().len(), 2);
        assert!(matches!(
            parse_documents("42"),
            Err(EngineError::UnexpectedJson { found: "a number" })
        ));
        assert!(matches!(parse_documents("{"), Err(EngineError::Json(_))));
    }
}
