// models/src/medical/medicine.rs

use serde::{Deserialize, Serialize};

use crate::errors::{require, ValidationResult};

/// A catalog medicine. `serial_no` is generated by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub serial_no: i64,
    pub brand_name: String,
    pub drug_name: String,
    /// Dosage form, e.g. "tablet" or "syrup".
    #[serde(rename = "type")]
    pub dosage_form: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicine {
    pub brand_name: Option<String>,
    pub drug_name: Option<String>,
    #[serde(rename = "type")]
    pub dosage_form: Option<String>,
    pub description: Option<String>,
}

impl NewMedicine {
    pub fn new(brand_name: &str, drug_name: &str, dosage_form: &str, description: &str) -> Self {
        NewMedicine {
            brand_name: Some(brand_name.to_string()),
            drug_name: Some(drug_name.to_string()),
            dosage_form: Some(dosage_form.to_string()),
            description: Some(description.to_string()),
        }
    }

    /// Returns a copy with required fields trimmed and optional blanks dropped.
    pub fn validate(&self) -> ValidationResult<NewMedicine> {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Ok(NewMedicine {
            brand_name: Some(require("brandName", self.brand_name.as_deref())?),
            drug_name: Some(require("drugName", self.drug_name.as_deref())?),
            dosage_form: optional(&self.dosage_form),
            description: optional(&self.description),
        })
    }
}

/// Catalog rows installed by `medipal seed`.
pub fn seed_catalog() -> Vec<NewMedicine> {
    vec![
        NewMedicine::new("Crocin", "Paracetamol + Caffeine", "tablet", "Relief of headache and mild fever"),
        NewMedicine::new("Cherrycough", "Diphenhydramine hydrochloride", "syrup", "Cough and respiratory congestion relief"),
        NewMedicine::new("Otrivin", "Xylometazoline", "drop", "Nasal decongestant"),
    ]
}
