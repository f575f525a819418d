use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Monitoring category of an antipsychotic prescription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrugCategory {
    Standard,
    SpecialGroup,
    Hdat,
}

/// Drug names that upgrade a declared STANDARD order to SPECIAL_GROUP.
pub const SPECIAL_GROUP_DRUGS: &[&str] = &["chlorpromazine", "clozapine", "olanzapine"];

/// Per-order flags carried alongside the prescription.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationFlags {
    pub is_clozapine: bool,
    pub is_olanzapine: bool,
    pub is_chlorpromazine: bool,
    pub is_hdat: bool,
}

/// One prescription of an antipsychotic for one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationOrder {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub drug_name: String,
    pub drug_category: DrugCategory,
    pub start_date: NaiveDate,
    pub stop_date: Option<NaiveDate>,
    pub dose: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<String>,
    pub flags: MedicationFlags,
    pub source_system: Option<String>,
    pub source_id: Option<String>,
}

impl MedicationOrder {
    pub fn new(
        patient_id: Uuid,
        drug_name: impl Into<String>,
        drug_category: DrugCategory,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            drug_name: drug_name.into(),
            drug_category,
            start_date,
            stop_date: None,
            dose: None,
            route: None,
            frequency: None,
            flags: MedicationFlags::default(),
            source_system: None,
            source_id: None,
        }
    }

    pub fn drug_name_lower(&self) -> String {
        self.drug_name.trim().to_lowercase()
    }

    pub fn is_clozapine(&self) -> bool {
        self.flags.is_clozapine || self.drug_name_lower() == "clozapine"
    }

    pub fn is_hdat(&self) -> bool {
        self.flags.is_hdat || self.drug_category == DrugCategory::Hdat
    }

    /// Effective category for schedule expansion. The HDAT flag or category
    /// wins; otherwise special-group drug names upgrade a declared
    /// STANDARD order; the declared category stands last.
    pub fn effective_category(&self) -> DrugCategory {
        if self.is_hdat() {
            return DrugCategory::Hdat;
        }
        if SPECIAL_GROUP_DRUGS.contains(&self.drug_name_lower().as_str()) {
            return DrugCategory::SpecialGroup;
        }
        self.drug_category
    }
}
