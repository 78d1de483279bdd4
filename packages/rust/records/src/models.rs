//! The five record types: bills, plenary sittings, members, written
//! questions, and committee reports. Each carries a template, an identity
//! derivation, and an explicit list of merge stages.
//!
//! Stage lists run in order against the store. The first stage receives
//! the incoming fields flattened to dotted paths and compacted; every
//! later stage receives the document as persisted by the stage before it,
//! so it can reconcile what the union pass accumulated.

use std::sync::LazyLock;

use serde_json::{Value, json};

use parldata_shared::{ParldataError, RecordKind, Result};
use parldata_text::slugify;

use crate::schema::RecordSchema;
use crate::update::{SortKey, UpdateDoc, get_path};

/// One merge stage: current state in, batched update out.
pub type StageFn = fn(&Value) -> UpdateDoc;

pub struct Model {
    pub schema: RecordSchema,
    stages: &'static [StageFn],
    identity: fn(&Value) -> Result<String>,
    seed_extras: Option<fn(&mut Value)>,
}

impl Model {
    /// Derive the natural identity of a record from its fields.
    pub fn identity(&self, fields: &Value) -> Result<String> {
        (self.identity)(fields)
    }

    /// Build the first-insert document: template, overlay, validation,
    /// then any per-type bookkeeping.
    pub fn seed(&self, fields: &Value) -> Result<Value> {
        let mut doc = self.schema.seed(fields)?;
        if let Some(extras) = self.seed_extras {
            extras(&mut doc);
        }
        Ok(doc)
    }

    pub fn stages(&self) -> &'static [StageFn] {
        self.stages
    }
}

/// Look up the model for a record kind.
pub fn model(kind: RecordKind) -> &'static Model {
    match kind {
        RecordKind::Bill => &BILL,
        RecordKind::PlenarySitting => &PLENARY_SITTING,
        RecordKind::Mp => &MP,
        RecordKind::Question => &QUESTION,
        RecordKind::CommitteeReport => &COMMITTEE_REPORT,
    }
}

// ---------------------------------------------------------------------------
// Shared stage plumbing
// ---------------------------------------------------------------------------

/// Build the union-then-set stage every accretive record starts with:
/// array fields named in `union_paths` grow by set union, everything else
/// is assigned outright.
fn set_and_union(incoming: &Value, union_paths: &[&str]) -> UpdateDoc {
    let mut update = UpdateDoc::new();
    let Some(map) = incoming.as_object() else {
        return update;
    };
    for (path, value) in map {
        let unioned = union_paths.contains(&path.as_str());
        match value {
            Value::Array(elements) if unioned => {
                update = update.add_to_set(path, elements.iter().cloned());
            }
            _ => update = update.set(path, value.clone()),
        }
    }
    update
}

/// Assign every incoming field outright; single-stage records where a
/// later revision of the source page supersedes the earlier one.
fn replace_all(incoming: &Value) -> UpdateDoc {
    set_and_union(incoming, &[])
}

fn required_str<'a>(fields: &'a Value, path: &str, kind: RecordKind) -> Result<&'a str> {
    get_path(fields, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ParldataError::validation(format!(
                "cannot derive {kind} identity without {path:?}"
            ))
        })
}

fn identity_token(fields: &Value, path: &str) -> String {
    match get_path(fields, path) {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// The filename of a URL sans its extension.
fn url_stem(url: &str) -> &str {
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

// ---------------------------------------------------------------------------
// Bills
// ---------------------------------------------------------------------------

static BILL: LazyLock<Model> = LazyLock::new(|| Model {
    schema: RecordSchema {
        kind: RecordKind::Bill,
        template: json!({
            "_sources": [],
            "actions": [],
            "identifier": null,
            "title": null,
            "titles": [],
        }),
        required: &["_sources", "identifier", "title"],
    },
    stages: &[bill_accumulate, bill_settle_title],
    identity: |fields| {
        Ok(required_str(fields, "identifier", RecordKind::Bill)?.to_string())
    },
    seed_extras: Some(|doc| {
        let title = doc["title"].clone();
        doc["titles"] = Value::Array(vec![title]);
    }),
});

/// Titles union under `titles`; `title` itself is settled in the next
/// stage once every spelling has been accumulated.
fn bill_accumulate(incoming: &Value) -> UpdateDoc {
    let mut update = UpdateDoc::new();
    let Some(map) = incoming.as_object() else {
        return update;
    };
    for (path, value) in map {
        match (path.as_str(), value) {
            ("title", title) => {
                update = update.add_to_set("titles", [title.clone()]);
            }
            ("_sources" | "actions", Value::Array(elements)) => {
                update = update.add_to_set(path, elements.iter().cloned());
            }
            _ => update = update.set(path, value.clone()),
        }
    }
    update
}

/// Pick the most specific title: of all recorded spellings ordered by
/// (final token, remainder), the last one. Longer qualified variants of
/// the same law name sort after their stems.
fn bill_settle_title(current: &Value) -> UpdateDoc {
    let mut titles: Vec<String> = current
        .get("titles")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    titles.sort_by_key(|title| {
        let (head, tail) = match title.rfind(' ') {
            Some(space) => (&title[..space], &title[space + 1..]),
            None => ("", title.as_str()),
        };
        (tail.to_string(), head.to_string())
    });

    let mut update = UpdateDoc::new()
        .sort("_sources", SortKey::Canonical)
        .sort("actions", SortKey::ByField("at_plenary_id"));
    if let Some(most_specific) = titles.last() {
        update = update
            .set("title", json!(most_specific))
            .set("titles", json!(titles));
    }
    update
}

// ---------------------------------------------------------------------------
// Plenary sittings
// ---------------------------------------------------------------------------

static PLENARY_SITTING: LazyLock<Model> = LazyLock::new(|| Model {
    schema: RecordSchema {
        kind: RecordKind::PlenarySitting,
        template: json!({
            "_sources": [],
            "agenda": {"cap1": [], "cap2": [], "cap4": []},
            "attendees": [],
            "date": null,
            "links": [],
            "parliamentary_period": null,
            "session": null,
            "sitting": null,
        }),
        required: &["_sources", "date", "parliamentary_period"],
    },
    stages: &[plenary_sitting_accumulate, plenary_sitting_settle],
    identity: |fields| {
        Ok(format!(
            "{}_{}_{}_{}",
            identity_token(fields, "date"),
            identity_token(fields, "parliamentary_period"),
            identity_token(fields, "session"),
            identity_token(fields, "sitting"),
        ))
    },
    seed_extras: None,
});

/// Debate (cap1) and bill (cap4) agenda items and document links union;
/// the question-time chapter (cap2) is republished whole, so it replaces.
fn plenary_sitting_accumulate(incoming: &Value) -> UpdateDoc {
    set_and_union(incoming, &["_sources", "agenda.cap1", "agenda.cap4", "links"])
}

fn plenary_sitting_settle(_current: &Value) -> UpdateDoc {
    UpdateDoc::new()
        .sort("_sources", SortKey::Canonical)
        .sort("agenda.cap1", SortKey::Canonical)
        .sort("agenda.cap4", SortKey::Canonical)
        .sort("links", SortKey::ByField("type"))
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

static MP: LazyLock<Model> = LazyLock::new(|| Model {
    schema: RecordSchema {
        kind: RecordKind::Mp,
        template: json!({
            "_sources": [],
            "birth_date": null,
            "email": null,
            "gender": null,
            "image": null,
            "images": [],
            "links": [],
            "name": null,
            "other_names": [],
            "tenures": [],
        }),
        required: &["_sources", "name"],
    },
    stages: &[mp_accumulate, mp_settle],
    identity: |fields| {
        let name = required_str(fields, "name.el", RecordKind::Mp)?;
        Ok(slugify(name))
    },
    seed_extras: None,
});

fn mp_accumulate(incoming: &Value) -> UpdateDoc {
    set_and_union(incoming, &["_sources", "other_names", "images", "links"])
}

fn mp_settle(_current: &Value) -> UpdateDoc {
    UpdateDoc::new()
        .sort("_sources", SortKey::Canonical)
        .sort("other_names", SortKey::Canonical)
}

// ---------------------------------------------------------------------------
// Written questions
// ---------------------------------------------------------------------------

static QUESTION: LazyLock<Model> = LazyLock::new(|| Model {
    schema: RecordSchema {
        kind: RecordKind::Question,
        template: json!({
            "_position_on_page": null,
            "_sources": [],
            "answers": [],
            "by": [],
            "date": null,
            "heading": null,
            "identifier": null,
            "text": null,
        }),
        required: &[
            "_position_on_page",
            "_sources",
            "date",
            "heading",
            "identifier",
            "text",
        ],
    },
    stages: &[replace_all],
    identity: |fields| {
        let identifier = required_str(fields, "identifier", RecordKind::Question)?;
        let position = identity_token(fields, "_position_on_page");
        Ok(format!("{identifier}_{position}"))
    },
    seed_extras: None,
});

// ---------------------------------------------------------------------------
// Committee reports
// ---------------------------------------------------------------------------

static COMMITTEE_REPORT: LazyLock<Model> = LazyLock::new(|| Model {
    schema: RecordSchema {
        kind: RecordKind::CommitteeReport,
        template: json!({
            "_sources": [],
            "attendees": [],
            "date_circulated": null,
            "date_prepared": null,
            "relates_to": [],
            "text": null,
            "title": null,
            "url": null,
        }),
        required: &["_sources", "title", "url"],
    },
    stages: &[replace_all],
    identity: |fields| {
        let url = required_str(fields, "url", RecordKind::CommitteeReport)?;
        let date = match get_path(fields, "date_circulated") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => "_".to_string(),
        };
        Ok(format!("{date}_{}", url_stem(url)))
    },
    seed_extras: None,
});
