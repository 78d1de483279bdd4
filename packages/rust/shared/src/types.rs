//! Core domain types shared across the ingestion pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RecordKind
// ---------------------------------------------------------------------------

/// The record collections the pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Bill,
    PlenarySitting,
    Mp,
    Question,
    CommitteeReport,
}

impl RecordKind {
    /// The store collection name backing this record type.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Bill => "bills",
            Self::PlenarySitting => "plenary_sittings",
            Self::Mp => "mps",
            Self::Question => "questions",
            Self::CommitteeReport => "committee_reports",
        }
    }

    /// All known record kinds, in collection-name order.
    pub fn all() -> [RecordKind; 5] {
        [
            Self::Bill,
            Self::CommitteeReport,
            Self::Mp,
            Self::PlenarySitting,
            Self::Question,
        ]
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bills" => Ok(Self::Bill),
            "plenary_sittings" => Ok(Self::PlenarySitting),
            "mps" => Ok(Self::Mp),
            "questions" => Ok(Self::Question),
            "committee_reports" => Ok(Self::CommitteeReport),
            other => Err(format!("unknown collection {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// ParseItem
// ---------------------------------------------------------------------------

/// One unit of parsed output destined for the merge engine: a target record
/// type plus the raw fields a scrape collaborator extracted from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseItem {
    /// Target record type.
    pub kind: RecordKind,
    /// Raw field object; keys must belong to the record type's template.
    pub fields: serde_json::Value,
}

impl ParseItem {
    pub fn new(kind: RecordKind, fields: serde_json::Value) -> Self {
        Self { kind, fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrip() {
        for kind in RecordKind::all() {
            let parsed: RecordKind = kind.collection().parse().expect("parse kind");
            assert_eq!(parsed, kind);
        }
        assert!("bogus".parse::<RecordKind>().is_err());
    }

    #[test]
    fn parse_item_serialization() {
        let item = ParseItem::new(
            RecordKind::Bill,
            serde_json::json!({"identifier": "23.01.060.023-2015", "title": "A bill"}),
        );
        let json = serde_json::to_string(&item).expect("serialize");
        let parsed: ParseItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.kind, RecordKind::Bill);
        assert_eq!(parsed.fields["identifier"], "23.01.060.023-2015");
    }
}
