//! Metadata records that trigger extraction, and the results written back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestionError, Result};

/// Key whose presence marks a manual re-run from text (no OCR).
pub const MANUAL_OVERRIDE_MARKER: &str = "unique_req_text";

/// Registry number as found in the metadata, kept in its original JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryNumber {
    Text(String),
    Number(serde_json::Number),
}

/// A downloaded metadata object before the full typed decode.
///
/// Only `cod_documento` and the override marker are read up front: a
/// manual re-run needs nothing else, so its other fields may be absent.
#[derive(Debug, Clone)]
pub struct MetadataFile {
    object: String,
    value: Value,
    /// Document code, base name of both the PDF and the result object
    pub cod_documento: String,
    /// Set when the object carried [`MANUAL_OVERRIDE_MARKER`]
    pub manual_override: bool,
}

#[derive(Deserialize)]
struct DocumentCode {
    cod_documento: String,
}

impl MetadataFile {
    /// Parse a metadata object. `object` only labels decode errors.
    ///
    /// The override marker counts as present whatever its value, `null`
    /// included.
    pub fn from_slice(object: &str, bytes: &[u8]) -> Result<Self> {
        let raw: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|e| decode_error(object, e))?;
        let manual_override = raw.contains_key(MANUAL_OVERRIDE_MARKER);

        let value = Value::Object(raw);
        let code = DocumentCode::deserialize(&value).map_err(|e| decode_error(object, e))?;

        Ok(Self {
            object: object.to_string(),
            value,
            cod_documento: code.cod_documento,
            manual_override,
        })
    }

    /// Decode every field needed to build a result.
    pub fn record(&self) -> Result<MetadataRecord> {
        let mut record =
            MetadataRecord::deserialize(&self.value).map_err(|e| decode_error(&self.object, e))?;
        record.manual_override = self.manual_override;
        Ok(record)
    }
}

fn decode_error(object: &str, source: serde_json::Error) -> IngestionError {
    IngestionError::MetadataDecode {
        object: object.to_string(),
        source,
    }
}

/// Descriptor accompanying a PDF.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataRecord {
    pub id_legislatura: i64,
    pub num_registro: RegistryNumber,
    /// Document code, base name of both the PDF and the result object
    pub cod_documento: String,
    /// Set when the raw object carried [`MANUAL_OVERRIDE_MARKER`]
    #[serde(skip)]
    pub manual_override: bool,
}

impl MetadataRecord {
    /// Parse and fully decode a metadata object in one step.
    pub fn from_slice(object: &str, bytes: &[u8]) -> Result<Self> {
        MetadataFile::from_slice(object, bytes)?.record()
    }

    /// `{cod_documento}.pdf`
    pub fn pdf_object_name(&self) -> String {
        format!("{}.pdf", self.cod_documento)
    }

    /// `{cod_documento}.json`
    pub fn target_object_name(&self) -> String {
        format!("{}.json", self.cod_documento)
    }
}

/// Extracted text plus passthrough metadata, written once per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id_legislatura: i64,
    pub camara: u8,
    pub num_registro: RegistryNumber,
    pub cod_documento: String,
    pub texto: String,
}

impl ResultRecord {
    pub fn from_metadata(metadata: &MetadataRecord, texto: String, chamber_one: i64) -> Self {
        Self {
            id_legislatura: metadata.id_legislatura,
            camara: chamber_for(metadata.id_legislatura, chamber_one),
            num_registro: metadata.num_registro.clone(),
            cod_documento: metadata.cod_documento.clone(),
            texto,
        }
    }
}

/// Chamber 1 for the configured legislature, chamber 2 for everything else.
pub fn chamber_for(id_legislatura: i64, chamber_one: i64) -> u8 {
    if id_legislatura == chamber_one {
        1
    } else {
        2
    }
}
