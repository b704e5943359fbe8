// storage/src/patients.rs

use models::errors::{MedipalError, MedipalResult};
use models::identifiers::PhoneNumber;
use models::medical::{EmergencyContact, NewEmergencyContact, Pagination, Patient};
use sqlx::{FromRow, SqliteConnection};
use tracing::{debug, info};

use crate::Storage;

#[derive(Debug, FromRow)]
pub(crate) struct PatientRow {
    phone_number: String,
    name: String,
    age: Option<i64>,
    gender: Option<String>,
    city: Option<String>,
    state: String,
    country: String,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            phone_number: row.phone_number,
            name: row.name,
            age: row.age,
            gender: row.gender,
            city: row.city,
            state: row.state,
            country: row.country,
        }
    }
}

#[derive(Debug, FromRow)]
struct ContactRow {
    id: i64,
    patient_phone: String,
    name: String,
    relation: String,
    phone_number: String,
}

impl From<ContactRow> for EmergencyContact {
    fn from(row: ContactRow) -> Self {
        EmergencyContact {
            id: row.id,
            patient_phone: row.patient_phone,
            name: row.name,
            relation: row.relation,
            phone_number: row.phone_number,
        }
    }
}

const PATIENT_COLUMNS: &str = "phone_number, name, age, gender, city, state, country";

/// Inserts `patient` unless a row with the same phone number exists. An
/// existing row is left exactly as it is.
pub(crate) async fn insert_patient_if_absent(conn: &mut SqliteConnection, patient: &Patient) -> MedipalResult<bool> {
    let inserted = sqlx::query(
        "INSERT INTO patients (phone_number, name, age, gender, city, state, country) VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(phone_number) DO NOTHING",
    )
    .bind(&patient.phone_number)
    .bind(&patient.name)
    .bind(patient.age)
    .bind(&patient.gender)
    .bind(&patient.city)
    .bind(&patient.state)
    .bind(&patient.country)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if inserted > 0 {
        debug!("Created patient {}", patient.phone_number);
    }
    Ok(inserted > 0)
}

pub(crate) async fn fetch_patient(conn: &mut SqliteConnection, phone_number: &str) -> MedipalResult<Option<Patient>> {
    let row: Option<PatientRow> =
        sqlx::query_as(&format!("SELECT {} FROM patients WHERE phone_number = ?", PATIENT_COLUMNS))
            .bind(phone_number)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Patient::from))
}

impl Storage {
    pub async fn get_patient(&self, phone_number: &str) -> MedipalResult<Option<Patient>> {
        let mut conn = self.pool.acquire().await?;
        fetch_patient(&mut conn, phone_number).await
    }

    pub async fn list_patients(&self, page: Pagination) -> MedipalResult<Vec<Patient>> {
        let (limit, offset) = page.bounds();
        let rows: Vec<PatientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM patients ORDER BY name, phone_number LIMIT ? OFFSET ?",
            PATIENT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Patient::from).collect())
    }

    /// Deletes a patient with their emergency contacts and prescriptions in one
    /// transaction.
    pub async fn delete_patient(&self, phone_number: &str) -> MedipalResult<()> {
        let mut tx = self.begin_write().await?;
        if fetch_patient(&mut tx, phone_number).await?.is_none() {
            return Err(MedipalError::not_found(format!("patient {}", phone_number)));
        }

        sqlx::query("DELETE FROM emergency_contacts WHERE patient_phone = ?")
            .bind(phone_number)
            .execute(&mut *tx)
            .await?;
        let prescriptions = sqlx::query("DELETE FROM prescriptions WHERE patient_phone = ?")
            .bind(phone_number)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM patients WHERE phone_number = ?")
            .bind(phone_number)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Deleted patient {} and {} prescriptions", phone_number, prescriptions);
        Ok(())
    }

    pub async fn list_emergency_contacts(&self, patient_phone: &str) -> MedipalResult<Vec<EmergencyContact>> {
        if self.get_patient(patient_phone).await?.is_none() {
            return Err(MedipalError::not_found(format!("patient {}", patient_phone)));
        }
        let rows: Vec<ContactRow> = sqlx::query_as(
            "SELECT id, patient_phone, name, relation, phone_number FROM emergency_contacts WHERE patient_phone = ? ORDER BY id",
        )
        .bind(patient_phone)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EmergencyContact::from).collect())
    }

    pub async fn add_emergency_contact(
        &self,
        patient_phone: &str,
        contact: &NewEmergencyContact,
    ) -> MedipalResult<EmergencyContact> {
        let (name, relation, phone): (String, String, PhoneNumber) = contact.validate()?;
        if self.get_patient(patient_phone).await?.is_none() {
            return Err(MedipalError::not_found(format!("patient {}", patient_phone)));
        }
        let row: ContactRow = sqlx::query_as(
            "INSERT INTO emergency_contacts (patient_phone, name, relation, phone_number) VALUES (?, ?, ?, ?) \
             RETURNING id, patient_phone, name, relation, phone_number",
        )
        .bind(patient_phone)
        .bind(name)
        .bind(relation)
        .bind(phone.as_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
