// storage/src/doctors.rs

use models::errors::{MedipalError, MedipalResult};
use models::medical::{Doctor, DoctorUpdate, Pagination, Role, ValidatedRegistration};
use sqlx::FromRow;
use tracing::{debug, info};

use crate::{unique_or_db, Storage};

#[derive(Debug, FromRow)]
struct DoctorRow {
    registration_no: String,
    name: String,
    specialisation: String,
    contact_number: String,
    email: String,
    password_hash: String,
    license_image_url: Option<String>,
    is_verified: bool,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Doctor {
            registration_no: row.registration_no,
            name: row.name,
            specialisation: row.specialisation,
            contact_number: row.contact_number,
            email: row.email,
            password_hash: row.password_hash,
            license_image_url: row.license_image_url,
            is_verified: row.is_verified,
        }
    }
}

const DOCTOR_COLUMNS: &str = "registration_no, name, specialisation, contact_number, email, \
                              password_hash, license_image_url, is_verified";

impl Storage {
    /// Inserts a pending (unverified) doctor.
    pub async fn insert_doctor(&self, registration: &ValidatedRegistration, password_hash: &str) -> MedipalResult<Doctor> {
        if self.find_doctor_by_email(&registration.email).await?.is_some() {
            return Err(MedipalError::DuplicateEntity(format!("doctor with email {}", registration.email)));
        }
        if self.get_doctor(&registration.registration_no).await?.is_some() {
            return Err(MedipalError::DuplicateEntity(format!(
                "doctor with registration number {}",
                registration.registration_no
            )));
        }

        sqlx::query(
            "INSERT INTO doctors (registration_no, name, specialisation, contact_number, email, password_hash, license_image_url, is_verified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&registration.registration_no)
        .bind(&registration.name)
        .bind(&registration.specialisation)
        .bind(&registration.contact_number)
        .bind(&registration.email)
        .bind(password_hash)
        .bind(&registration.license_image_url)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, format!("doctor {}", registration.registration_no)))?;

        info!("Registered doctor {}", registration.registration_no);
        self.get_doctor(&registration.registration_no)
            .await?
            .ok_or_else(|| MedipalError::Internal("doctor vanished after insert".into()))
    }

    pub async fn get_doctor(&self, registration_no: &str) -> MedipalResult<Option<Doctor>> {
        let row: Option<DoctorRow> =
            sqlx::query_as(&format!("SELECT {} FROM doctors WHERE registration_no = ?", DOCTOR_COLUMNS))
                .bind(registration_no)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Doctor::from))
    }

    /// Emails are stored lowercased, so the lookup lowercases too.
    pub async fn find_doctor_by_email(&self, email: &str) -> MedipalResult<Option<Doctor>> {
        let row: Option<DoctorRow> = sqlx::query_as(&format!("SELECT {} FROM doctors WHERE email = ?", DOCTOR_COLUMNS))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Doctor::from))
    }

    pub async fn list_doctors(&self, page: Pagination) -> MedipalResult<Vec<Doctor>> {
        let (limit, offset) = page.bounds();
        let rows: Vec<DoctorRow> = sqlx::query_as(&format!(
            "SELECT {} FROM doctors ORDER BY name, registration_no LIMIT ? OFFSET ?",
            DOCTOR_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Doctor::from).collect())
    }

    /// Flips the verification flag in one statement and returns the new value.
    pub async fn toggle_doctor_verification(&self, registration_no: &str) -> MedipalResult<bool> {
        let flipped: Option<(bool,)> =
            sqlx::query_as("UPDATE doctors SET is_verified = NOT is_verified WHERE registration_no = ? RETURNING is_verified")
                .bind(registration_no)
                .fetch_optional(&self.pool)
                .await?;
        match flipped {
            Some((is_verified,)) => {
                info!("Doctor {} verification is now {}", registration_no, is_verified);
                Ok(is_verified)
            }
            None => Err(MedipalError::not_found(format!("doctor {}", registration_no))),
        }
    }

    /// Partial profile edit. Only name, specialisation, contact number and email.
    pub async fn update_doctor(&self, registration_no: &str, update: &DoctorUpdate) -> MedipalResult<Doctor> {
        let update = update.validate()?;
        let mut doctor = self
            .get_doctor(registration_no)
            .await?
            .ok_or_else(|| MedipalError::not_found(format!("doctor {}", registration_no)))?;
        if update.is_empty() {
            return Ok(doctor);
        }

        if let Some(email) = &update.email {
            if let Some(owner) = self.find_doctor_by_email(email).await? {
                if owner.registration_no != registration_no {
                    return Err(MedipalError::DuplicateEntity(format!("doctor with email {}", email)));
                }
            }
        }

        update.apply_to(&mut doctor);
        sqlx::query(
            "UPDATE doctors SET name = ?, specialisation = ?, contact_number = ?, email = ? WHERE registration_no = ?",
        )
        .bind(&doctor.name)
        .bind(&doctor.specialisation)
        .bind(&doctor.contact_number)
        .bind(&doctor.email)
        .bind(registration_no)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, format!("doctor with email {}", doctor.email)))?;

        debug!("Updated profile of doctor {}", registration_no);
        Ok(doctor)
    }

    /// Removes a doctor with everything they own: prescriptions (entries and
    /// timings follow by cascade) and sessions. One transaction.
    pub async fn delete_doctor(&self, registration_no: &str) -> MedipalResult<()> {
        let mut tx = self.begin_write().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM doctors WHERE registration_no = ?")
            .bind(registration_no)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(MedipalError::not_found(format!("doctor {}", registration_no)));
        }

        let prescriptions = sqlx::query("DELETE FROM prescriptions WHERE doctor_reg_no = ?")
            .bind(registration_no)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM sessions WHERE subject = ? AND role != ?")
            .bind(registration_no)
            .bind(Role::Admin.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM doctors WHERE registration_no = ?")
            .bind(registration_no)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Deleted doctor {} and {} prescriptions", registration_no, prescriptions);
        Ok(())
    }
}
