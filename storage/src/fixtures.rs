// storage/src/fixtures.rs

use models::medical::{
    seed_catalog, DosageType, MedicineEntryInput, MedicineTiming, PatientDetails, PrescriptionInput, TimeOfDay,
    ValidatedRegistration,
};
use tempfile::TempDir;

use crate::Storage;

pub struct Ids {
    pub doctor: String,
    pub other_doctor: String,
    pub medicines: Vec<i64>,
}

pub fn registration(registration_no: &str, email: &str) -> ValidatedRegistration {
    ValidatedRegistration {
        registration_no: registration_no.to_string(),
        name: format!("Dr. {}", registration_no),
        specialisation: "General Medicine".to_string(),
        contact_number: "9876543210".to_string(),
        email: email.to_string(),
        password: "s3cret!".to_string(),
        license_image_url: None,
    }
}

/// Two verified doctors and the seed catalog.
pub async fn seeded() -> (Storage, Ids) {
    seed(Storage::in_memory().await.unwrap()).await
}

/// Same data in a database file under `dir`, with a full connection pool.
pub async fn seeded_file(dir: &TempDir) -> (Storage, Ids) {
    let url = format!("sqlite://{}", dir.path().join("medipal.db").display());
    seed(Storage::connect(&url).await.unwrap()).await
}

async fn seed(storage: Storage) -> (Storage, Ids) {
    for (reg, email) in [("REG-1", "one@example.com"), ("REG-2", "two@example.com")] {
        storage.insert_doctor(&registration(reg, email), "hash").await.unwrap();
        storage.toggle_doctor_verification(reg).await.unwrap();
    }
    storage.seed_medicines(&seed_catalog()).await.unwrap();
    let medicines = storage.list_medicines().await.unwrap().iter().map(|m| m.serial_no).collect();
    (
        storage,
        Ids {
            doctor: "REG-1".to_string(),
            other_doctor: "REG-2".to_string(),
            medicines,
        },
    )
}

pub fn entry(medicine_id: i64, times: &[(TimeOfDay, f64)]) -> MedicineEntryInput {
    MedicineEntryInput {
        medicine_id,
        dosage_type: DosageType::Tablet,
        duration: 5,
        instruction: Some("after food".to_string()),
        times: times
            .iter()
            .map(|&(time_of_day, dosage)| MedicineTiming { time_of_day, dosage })
            .collect(),
    }
}

/// One medicine (the first catalog row), taken morning and night.
pub fn prescription_input(phone: &str) -> PrescriptionInput {
    PrescriptionInput {
        patient_contact: Some(phone.to_string()),
        patient_details: PatientDetails {
            name: Some("Asha".to_string()),
            age: Some(34),
            diagnosis: Some("Viral fever".to_string()),
            ..Default::default()
        },
        medicines: vec![entry(1, &[(TimeOfDay::Morning, 1.0), (TimeOfDay::Night, 1.0)])],
    }
}
