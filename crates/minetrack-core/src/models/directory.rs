//! Directory record models
//!
//! Each category has its own flat record shape. Records arrive from the
//! remote source as camelCase JSON and are stored one row per record; the
//! remote identifier (`source_id`) is not unique and is never used as a key.

use serde::{Deserialize, Deserializer, Serialize};

use super::Category;
use crate::error::{Error, Result};

/// A nationally issued mining permit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalPermit {
    #[serde(deserialize_with = "source_id")]
    pub source_id: String,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub contractor: Option<String>,
    #[serde(default)]
    pub commodity: Option<String>,
    #[serde(default)]
    pub area_hectares: Option<f64>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
}

/// A locally issued (provincial/municipal) permit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPermit {
    #[serde(deserialize_with = "source_id")]
    pub source_id: String,
    #[serde(default)]
    pub permit_number: Option<String>,
    #[serde(default)]
    pub permittee: Option<String>,
    #[serde(default)]
    pub commodity: Option<String>,
    #[serde(default)]
    pub area_hectares: Option<f64>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub permit_type: Option<String>,
    #[serde(default)]
    pub date_issued: Option<String>,
}

/// A reported illegal-mining hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotIncident {
    #[serde(deserialize_with = "source_id")]
    pub source_id: String,
    #[serde(default)]
    pub complaint_number: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub commodity: Option<String>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub incident_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_reported: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A record from any of the three directory categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum DirectoryRecord {
    National(NationalPermit),
    Local(LocalPermit),
    #[serde(rename = "hotspots")]
    Hotspot(HotspotIncident),
}

impl DirectoryRecord {
    /// Decode one remote record for the given category.
    ///
    /// Fails with `InvalidInput` for malformed records (not an object, no
    /// identifier, wrongly typed fields).
    pub fn from_wire(category: Category, value: &serde_json::Value) -> Result<Self> {
        let Some(fields) = value.as_object() else {
            return Err(Error::InvalidInput(format!(
                "malformed {category} record: not an object"
            )));
        };
        let value = serde_json::Value::Object(canonical_fields(category, fields));
        let decoded = match category {
            Category::National => NationalPermit::deserialize(&value).map(Self::National),
            Category::Local => LocalPermit::deserialize(&value).map(Self::Local),
            Category::Hotspots => HotspotIncident::deserialize(&value).map(Self::Hotspot),
        };
        let record = decoded
            .map_err(|error| Error::InvalidInput(format!("malformed {category} record: {error}")))?;
        if record.source_id().trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "malformed {category} record: empty source id"
            )));
        }
        Ok(record)
    }

    pub const fn category(&self) -> Category {
        match self {
            Self::National(_) => Category::National,
            Self::Local(_) => Category::Local,
            Self::Hotspot(_) => Category::Hotspots,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::National(permit) => &permit.source_id,
            Self::Local(permit) => &permit.source_id,
            Self::Hotspot(incident) => &incident.source_id,
        }
    }

    pub fn province(&self) -> Option<&str> {
        match self {
            Self::National(permit) => permit.province.as_deref(),
            Self::Local(permit) => permit.province.as_deref(),
            Self::Hotspot(incident) => incident.province.as_deref(),
        }
    }

    /// Primary reference number (contract, permit or complaint number).
    pub fn reference_number(&self) -> Option<&str> {
        match self {
            Self::National(permit) => permit.contract_number.as_deref(),
            Self::Local(permit) => permit.permit_number.as_deref(),
            Self::Hotspot(incident) => incident.complaint_number.as_deref(),
        }
    }

    /// Holder or subject name.
    pub fn holder_name(&self) -> Option<&str> {
        match self {
            Self::National(permit) => permit.contractor.as_deref(),
            Self::Local(permit) => permit.permittee.as_deref(),
            Self::Hotspot(incident) => incident.subject_name.as_deref(),
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            Self::National(permit) => permit.status.as_deref(),
            Self::Local(permit) => permit.status.as_deref(),
            Self::Hotspot(incident) => incident.status.as_deref(),
        }
    }
}

/// A stored directory row: the record plus replica bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Local row id (insertion order within a sync batch)
    pub row_id: i64,
    /// When this row was written by a sync (Unix ms)
    pub synced_at: i64,
    #[serde(flatten)]
    pub record: DirectoryRecord,
}

/// Keys that may carry the remote identifier, in order of precedence.
const SOURCE_ID_KEYS: [&str; 3] = ["sourceId", "id", "_id"];

/// Category-specific key that the generic `type` field falls back to.
const fn type_key(category: Category) -> &'static str {
    match category {
        Category::National => "contractType",
        Category::Local => "permitType",
        Category::Hotspots => "incidentType",
    }
}

/// Collapse identifier and type spellings into the single key each struct
/// field expects. `sourceId` wins over `id`, which wins over `_id`; `type`
/// only fills the category's type field when that key is absent.
fn canonical_fields(
    category: Category,
    fields: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    let mut canonical = fields.clone();
    let source_id = SOURCE_ID_KEYS
        .iter()
        .find_map(|key| fields.get(*key).filter(|value| !value.is_null()))
        .cloned();
    for key in SOURCE_ID_KEYS {
        canonical.remove(key);
    }
    if let Some(source_id) = source_id {
        canonical.insert("sourceId".to_string(), source_id);
    }

    let generic_type = canonical.remove("type");
    let specific = type_key(category);
    if let Some(generic_type) = generic_type {
        if !canonical.contains_key(specific) {
            canonical.insert(specific.to_string(), generic_type);
        }
    }
    canonical
}

/// Accept string or numeric identifiers; the remote source emits both.
fn source_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text.trim().to_string(),
        RawId::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_national_permit_with_aliases() {
        let record = DirectoryRecord::from_wire(
            Category::National,
            &json!({
                "_id": "abc",
                "contractNumber": "MPSA-001",
                "contractor": "Acme Mining",
                "province": "Cavite",
                "type": "MPSA",
                "areaHectares": 12.5
            }),
        )
        .unwrap();

        let DirectoryRecord::National(permit) = record else {
            panic!("expected national permit");
        };
        assert_eq!(permit.source_id, "abc");
        assert_eq!(permit.contract_type.as_deref(), Some("MPSA"));
        assert_eq!(permit.area_hectares, Some(12.5));
    }

    #[test]
    fn accepts_numeric_source_id() {
        let record =
            DirectoryRecord::from_wire(Category::Local, &json!({ "id": 42, "permittee": "X" }))
                .unwrap();
        assert_eq!(record.source_id(), "42");
        assert_eq!(record.category(), Category::Local);
    }

    #[test]
    fn identifier_keys_follow_precedence() {
        let record = DirectoryRecord::from_wire(
            Category::National,
            &json!({ "_id": "65f0a1", "id": "N-7", "sourceId": "N-1", "province": "Cavite" }),
        )
        .unwrap();
        assert_eq!(record.source_id(), "N-1");

        let record = DirectoryRecord::from_wire(
            Category::Local,
            &json!({ "_id": "mongo", "id": 7 }),
        )
        .unwrap();
        assert_eq!(record.source_id(), "7");

        let record =
            DirectoryRecord::from_wire(Category::Hotspots, &json!({ "_id": "65f0a1" })).unwrap();
        assert_eq!(record.source_id(), "65f0a1");
    }

    #[test]
    fn specific_type_key_wins_over_generic_type() {
        let record = DirectoryRecord::from_wire(
            Category::National,
            &json!({ "sourceId": "N-1", "contractType": "MPSA", "type": "FTAA" }),
        )
        .unwrap();
        let DirectoryRecord::National(permit) = record else {
            panic!("expected national permit");
        };
        assert_eq!(permit.contract_type.as_deref(), Some("MPSA"));

        let record = DirectoryRecord::from_wire(
            Category::Hotspots,
            &json!({ "id": "H-1", "type": "Quarry" }),
        )
        .unwrap();
        let DirectoryRecord::Hotspot(incident) = record else {
            panic!("expected hotspot incident");
        };
        assert_eq!(incident.incident_type.as_deref(), Some("Quarry"));
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(DirectoryRecord::from_wire(Category::Hotspots, &json!("nope")).is_err());
        assert!(DirectoryRecord::from_wire(Category::Hotspots, &json!({ "province": "X" })).is_err());
        assert!(DirectoryRecord::from_wire(Category::Hotspots, &json!({ "id": "  " })).is_err());
        assert!(
            DirectoryRecord::from_wire(Category::Hotspots, &json!({ "id": "1", "latitude": "north" }))
                .is_err()
        );
    }
}
