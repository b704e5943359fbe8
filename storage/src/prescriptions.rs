// storage/src/prescriptions.rs

//! Prescription authoring, claim and reuse.
//!
//! The patient association column holds one of three things: nothing, a
//! `temp_<millis>` placeholder written by reuse, or a real phone number.
//! Claims may only replace the first two, enforced by a conditional update
//! rather than a read followed by a write.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use models::errors::{require, MedipalError, MedipalResult, ValidationError};
use models::identifiers::{PatientAssociation, PhoneNumber, PLACEHOLDER_PREFIX};
use models::medical::{
    claimant, DoctorSummary, DosageType, Medicine, MedicineEntryInput, MedicineTiming, Prescription,
    PrescriptionDetails, PrescriptionEntry, PrescriptionInput, TimeOfDay,
};
use sqlx::{FromRow, SqliteConnection};
use tracing::{debug, info};

use crate::medicines::medicine_exists;
use crate::patients::{fetch_patient, insert_patient_if_absent};
use crate::{corrupt, Storage};

#[derive(Debug, FromRow)]
struct PrescriptionRow {
    id: String,
    doctor_reg_no: String,
    patient_phone: Option<String>,
    diagnosis: Option<String>,
    created_on: DateTime<Utc>,
    signature: Option<String>,
}

impl From<PrescriptionRow> for Prescription {
    fn from(row: PrescriptionRow) -> Self {
        Prescription {
            id: row.id,
            doctor_reg_no: row.doctor_reg_no,
            is_used_by: row.patient_phone,
            diagnosis: row.diagnosis,
            created_on: row.created_on,
            signature: row.signature,
        }
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: i64,
    dosage_type: String,
    duration: i64,
    instruction: Option<String>,
    serial_no: i64,
    brand_name: String,
    drug_name: String,
    dosage_form: Option<String>,
    description: Option<String>,
}

#[derive(Debug, FromRow)]
struct TimingRow {
    entry_id: i64,
    time_of_day: String,
    dosage: f64,
}

const PRESCRIPTION_COLUMNS: &str = "id, doctor_reg_no, patient_phone, diagnosis, created_on, signature";

/// LIKE pattern matching any placeholder association, `_` escaped with `\`.
fn placeholder_pattern() -> String {
    format!("{}%", PLACEHOLDER_PREFIX.replace('_', "\\_"))
}

async fn fetch_prescription(conn: &mut SqliteConnection, id: &str) -> MedipalResult<Option<Prescription>> {
    let row: Option<PrescriptionRow> =
        sqlx::query_as(&format!("SELECT {} FROM prescriptions WHERE id = ?", PRESCRIPTION_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Prescription::from))
}

async fn require_prescription(conn: &mut SqliteConnection, id: &str) -> MedipalResult<Prescription> {
    fetch_prescription(conn, id)
        .await?
        .ok_or_else(|| MedipalError::not_found(format!("prescription {}", id)))
}

fn ensure_author(prescription: &Prescription, caller: &str) -> MedipalResult<()> {
    if prescription.doctor_reg_no == caller {
        Ok(())
    } else {
        Err(MedipalError::forbidden(format!(
            "prescription {} belongs to another doctor",
            prescription.id
        )))
    }
}

/// Writes entries and their timings. Every medicine id must exist.
async fn insert_entries(
    conn: &mut SqliteConnection,
    prescription_id: &str,
    entries: &[MedicineEntryInput],
) -> MedipalResult<()> {
    for entry in entries {
        if !medicine_exists(conn, entry.medicine_id).await? {
            return Err(ValidationError::UnknownMedicine(entry.medicine_id).into());
        }
        let (entry_id,): (i64,) = sqlx::query_as(
            "INSERT INTO prescription_medicines (prescription_id, medicine_id, dosage_type, duration, instruction) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(prescription_id)
        .bind(entry.medicine_id)
        .bind(entry.dosage_type.as_str())
        .bind(entry.duration)
        .bind(entry.instruction.as_deref().map(str::trim).filter(|i| !i.is_empty()))
        .fetch_one(&mut *conn)
        .await?;

        for timing in &entry.times {
            sqlx::query("INSERT INTO medicine_timings (entry_id, time_of_day, dosage) VALUES (?, ?, ?)")
                .bind(entry_id)
                .bind(timing.time_of_day.as_str())
                .bind(timing.dosage)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

async fn load_entries(conn: &mut SqliteConnection, prescription_id: &str) -> MedipalResult<Vec<PrescriptionEntry>> {
    let rows: Vec<EntryRow> = sqlx::query_as(
        "SELECT e.id, e.dosage_type, e.duration, e.instruction, \
                m.serial_no, m.brand_name, m.drug_name, m.dosage_form, m.description \
         FROM prescription_medicines e JOIN medicines m ON m.serial_no = e.medicine_id \
         WHERE e.prescription_id = ? ORDER BY e.id",
    )
    .bind(prescription_id)
    .fetch_all(&mut *conn)
    .await?;

    let timing_rows: Vec<TimingRow> = sqlx::query_as(
        "SELECT t.entry_id, t.time_of_day, t.dosage FROM medicine_timings t \
         JOIN prescription_medicines e ON e.id = t.entry_id \
         WHERE e.prescription_id = ? ORDER BY t.id",
    )
    .bind(prescription_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut timings: HashMap<i64, Vec<MedicineTiming>> = HashMap::new();
    for row in timing_rows {
        let time_of_day = row.time_of_day.parse::<TimeOfDay>().map_err(|_| corrupt(&row.time_of_day))?;
        timings.entry(row.entry_id).or_default().push(MedicineTiming {
            time_of_day,
            dosage: row.dosage,
        });
    }

    rows.into_iter()
        .map(|row| -> MedipalResult<PrescriptionEntry> {
            Ok(PrescriptionEntry {
                id: row.id,
                dosage_type: row.dosage_type.parse::<DosageType>().map_err(|_| corrupt(&row.dosage_type))?,
                duration: row.duration,
                instruction: row.instruction,
                times: timings.remove(&row.id).unwrap_or_default(),
                medicine: Medicine {
                    serial_no: row.serial_no,
                    brand_name: row.brand_name,
                    drug_name: row.drug_name,
                    dosage_form: row.dosage_form,
                    description: row.description,
                },
            })
        })
        .collect()
}

async fn load_details(conn: &mut SqliteConnection, prescription: Prescription) -> MedipalResult<PrescriptionDetails> {
    let doctor: Option<(String, String, String, String)> = sqlx::query_as(
        "SELECT registration_no, name, specialisation, contact_number FROM doctors WHERE registration_no = ?",
    )
    .bind(&prescription.doctor_reg_no)
    .fetch_optional(&mut *conn)
    .await?;
    let (registration_no, name, specialisation, contact_number) =
        doctor.ok_or_else(|| corrupt(format!("prescription {} has no doctor", prescription.id)))?;

    let patient = match prescription.association() {
        PatientAssociation::Claimed(phone) => fetch_patient(conn, &phone).await?,
        _ => None,
    };
    let medicine_list = load_entries(conn, &prescription.id).await?;

    Ok(PrescriptionDetails {
        doctor: DoctorSummary {
            registration_no,
            name,
            specialisation,
            contact_number,
        },
        patient,
        medicine_list,
        prescription,
    })
}

impl Storage {
    /// Creates a prescription for `doctor_reg_no`, inserting the patient if
    /// absent. Patient, prescription, entries and timings are one transaction.
    pub async fn create_prescription(
        &self,
        doctor_reg_no: &str,
        input: &PrescriptionInput,
    ) -> MedipalResult<PrescriptionDetails> {
        let doctor_reg_no = require("doctorId", Some(doctor_reg_no))?;
        let phone = input.validate()?;

        let mut tx = self.begin_write().await?;
        let doctor: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM doctors WHERE registration_no = ?")
            .bind(&doctor_reg_no)
            .fetch_optional(&mut *tx)
            .await?;
        if doctor.is_none() {
            return Err(MedipalError::not_found(format!("doctor {}", doctor_reg_no)));
        }

        insert_patient_if_absent(&mut tx, &input.patient_details.to_patient(&phone)).await?;

        let id = Prescription::new_id();
        sqlx::query(
            "INSERT INTO prescriptions (id, doctor_reg_no, patient_phone, diagnosis, created_on) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&doctor_reg_no)
        .bind(phone.as_ref())
        .bind(input.patient_details.diagnosis())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        insert_entries(&mut tx, &id, &input.medicines).await?;

        let prescription = require_prescription(&mut tx, &id).await?;
        let details = load_details(&mut tx, prescription).await?;
        tx.commit().await?;

        info!("Doctor {} created prescription {} for {}", doctor_reg_no, id, phone);
        Ok(details)
    }

    /// Replaces patient, diagnosis and the whole medicine list of a
    /// prescription. Only its author may do this.
    pub async fn update_prescription(
        &self,
        id: &str,
        caller: &str,
        input: &PrescriptionInput,
    ) -> MedipalResult<PrescriptionDetails> {
        let mut tx = self.begin_write().await?;
        let existing = require_prescription(&mut tx, id).await?;
        ensure_author(&existing, caller)?;
        let phone = input.validate()?;

        insert_patient_if_absent(&mut tx, &input.patient_details.to_patient(&phone)).await?;
        sqlx::query("UPDATE prescriptions SET patient_phone = ?, diagnosis = ? WHERE id = ?")
            .bind(phone.as_ref())
            .bind(input.patient_details.diagnosis())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // Timings go with their entries.
        sqlx::query("DELETE FROM prescription_medicines WHERE prescription_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_entries(&mut tx, id, &input.medicines).await?;

        let prescription = require_prescription(&mut tx, id).await?;
        let details = load_details(&mut tx, prescription).await?;
        tx.commit().await?;

        info!("Doctor {} updated prescription {}", caller, id);
        Ok(details)
    }

    /// Deletes a prescription. The author may always delete it; anyone,
    /// including an anonymous caller, may while the association is still a
    /// placeholder.
    pub async fn delete_prescription(&self, id: &str, caller: Option<&str>) -> MedipalResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM prescriptions WHERE id = ? AND (doctor_reg_no = ? OR patient_phone LIKE ? ESCAPE '\\')",
        )
        .bind(id)
        .bind(caller)
        .bind(placeholder_pattern())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if deleted > 0 {
            info!("Deleted prescription {}", id);
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        match fetch_prescription(&mut conn, id).await? {
            None => Err(MedipalError::not_found(format!("prescription {}", id))),
            Some(_) => Err(MedipalError::forbidden(format!("prescription {} cannot be deleted by this caller", id))),
        }
    }

    /// Clones the medicine list of one of the caller's prescriptions into a new
    /// prescription with a placeholder association and no diagnosis.
    pub async fn reuse_prescription(&self, id: &str, caller: &str) -> MedipalResult<PrescriptionDetails> {
        let mut tx = self.begin_write().await?;
        let source = require_prescription(&mut tx, id).await?;
        ensure_author(&source, caller)?;
        let entries: Vec<MedicineEntryInput> = load_entries(&mut tx, id).await?.iter().map(|e| e.to_input()).collect();

        let new_id = Prescription::new_id();
        let placeholder = PatientAssociation::placeholder_now();
        sqlx::query(
            "INSERT INTO prescriptions (id, doctor_reg_no, patient_phone, diagnosis, created_on) VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(&new_id)
        .bind(&source.doctor_reg_no)
        .bind(placeholder.as_stored())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        insert_entries(&mut tx, &new_id, &entries).await?;

        let prescription = require_prescription(&mut tx, &new_id).await?;
        let details = load_details(&mut tx, prescription).await?;
        tx.commit().await?;

        info!("Prescription {} reused as {}", id, new_id);
        Ok(details)
    }

    /// Associates a prescription with a patient phone number, creating the
    /// patient if needed. Only an empty or placeholder association is
    /// replaced; an already claimed prescription comes back unchanged. The
    /// result carries the doctor, patient and medicine list for the claimant.
    pub async fn claim_prescription(
        &self,
        prescription_id: &str,
        phone_number: &str,
    ) -> MedipalResult<PrescriptionDetails> {
        let prescription_id = require("prescriptionId", Some(prescription_id))?;
        let phone = PhoneNumber::new(phone_number)?;

        let mut tx = self.begin_write().await?;
        require_prescription(&mut tx, &prescription_id).await?;
        insert_patient_if_absent(&mut tx, &claimant(&phone)).await?;

        let claimed = sqlx::query(
            "UPDATE prescriptions SET patient_phone = ? \
             WHERE id = ? AND (patient_phone IS NULL OR patient_phone = '' OR patient_phone LIKE ? ESCAPE '\\')",
        )
        .bind(phone.as_ref())
        .bind(&prescription_id)
        .bind(placeholder_pattern())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let prescription = require_prescription(&mut tx, &prescription_id).await?;
        let details = load_details(&mut tx, prescription).await?;
        tx.commit().await?;

        if claimed > 0 {
            info!("Prescription {} claimed by {}", prescription_id, phone);
        } else {
            debug!("Prescription {} already claimed, claim by {} ignored", prescription_id, phone);
        }
        Ok(details)
    }

    pub async fn get_prescription(&self, id: &str) -> MedipalResult<PrescriptionDetails> {
        let mut conn = self.pool.acquire().await?;
        let prescription = require_prescription(&mut conn, id).await?;
        load_details(&mut conn, prescription).await
    }

    /// All prescriptions claimed by `phone_number`, newest first. An empty
    /// result is `NotFound`.
    pub async fn list_prescriptions_for_patient(&self, phone_number: &str) -> MedipalResult<Vec<PrescriptionDetails>> {
        let phone = PhoneNumber::new(phone_number)?;
        let found = self.list_where("patient_phone = ?", phone.as_ref()).await?;
        if found.is_empty() {
            return Err(MedipalError::not_found(format!("prescriptions for {}", phone)));
        }
        Ok(found)
    }

    /// A doctor's own prescriptions, newest first.
    pub async fn list_prescriptions_for_doctor(&self, doctor_reg_no: &str) -> MedipalResult<Vec<PrescriptionDetails>> {
        self.list_where("doctor_reg_no = ?", doctor_reg_no).await
    }

    async fn list_where(&self, filter: &str, value: &str) -> MedipalResult<Vec<PrescriptionDetails>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<PrescriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM prescriptions WHERE {} ORDER BY created_on DESC, rowid DESC",
            PRESCRIPTION_COLUMNS, filter
        ))
        .bind(value)
        .fetch_all(&mut *conn)
        .await?;

        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            details.push(load_details(&mut conn, row.into()).await?);
        }
        Ok(details)
    }

    /// Stores the author's signature on a prescription.
    pub async fn sign_prescription(&self, id: &str, caller: &str, signature: Option<&str>) -> MedipalResult<Prescription> {
        let signature = require("signature", signature)?;
        let mut tx = self.begin_write().await?;
        let existing = require_prescription(&mut tx, id).await?;
        ensure_author(&existing, caller)?;
        sqlx::query("UPDATE prescriptions SET signature = ? WHERE id = ?")
            .bind(&signature)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let signed = require_prescription(&mut tx, id).await?;
        tx.commit().await?;
        Ok(signed)
    }
}
