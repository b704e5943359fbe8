// storage/src/medicines.rs

use models::errors::MedipalResult;
use models::medical::{Medicine, NewMedicine};
use sqlx::{FromRow, SqliteConnection};
use tracing::info;

use crate::Storage;

#[derive(Debug, FromRow)]
pub(crate) struct MedicineRow {
    pub serial_no: i64,
    pub brand_name: String,
    pub drug_name: String,
    pub dosage_form: Option<String>,
    pub description: Option<String>,
}

impl From<MedicineRow> for Medicine {
    fn from(row: MedicineRow) -> Self {
        Medicine {
            serial_no: row.serial_no,
            brand_name: row.brand_name,
            drug_name: row.drug_name,
            dosage_form: row.dosage_form,
            description: row.description,
        }
    }
}

pub(crate) async fn medicine_exists(conn: &mut SqliteConnection, serial_no: i64) -> MedipalResult<bool> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT serial_no FROM medicines WHERE serial_no = ?")
        .bind(serial_no)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

impl Storage {
    /// The catalog, ordered by brand name.
    pub async fn list_medicines(&self) -> MedipalResult<Vec<Medicine>> {
        let rows: Vec<MedicineRow> = sqlx::query_as(
            "SELECT serial_no, brand_name, drug_name, dosage_form, description FROM medicines ORDER BY brand_name, serial_no",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Medicine::from).collect())
    }

    pub async fn get_medicine(&self, serial_no: i64) -> MedipalResult<Option<Medicine>> {
        let row: Option<MedicineRow> = sqlx::query_as(
            "SELECT serial_no, brand_name, drug_name, dosage_form, description FROM medicines WHERE serial_no = ?",
        )
        .bind(serial_no)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Medicine::from))
    }

    pub async fn add_medicine(&self, medicine: &NewMedicine) -> MedipalResult<Medicine> {
        let medicine = medicine.validate()?;
        let row: MedicineRow = sqlx::query_as(
            "INSERT INTO medicines (brand_name, drug_name, dosage_form, description) VALUES (?, ?, ?, ?) \
             RETURNING serial_no, brand_name, drug_name, dosage_form, description",
        )
        .bind(&medicine.brand_name)
        .bind(&medicine.drug_name)
        .bind(&medicine.dosage_form)
        .bind(&medicine.description)
        .fetch_one(&self.pool)
        .await?;
        info!("Added medicine {} ({})", row.brand_name, row.serial_no);
        Ok(row.into())
    }

    /// Installs catalog rows whose brand name is not present yet. Returns how
    /// many were inserted, so running the seed twice is harmless.
    pub async fn seed_medicines(&self, catalog: &[NewMedicine]) -> MedipalResult<usize> {
        let mut tx = self.begin_write().await?;
        let mut inserted = 0;
        for medicine in catalog {
            let medicine = medicine.validate()?;
            let result = sqlx::query(
                "INSERT INTO medicines (brand_name, drug_name, dosage_form, description) \
                 SELECT ?, ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM medicines WHERE brand_name = ?)",
            )
            .bind(&medicine.brand_name)
            .bind(&medicine.drug_name)
            .bind(&medicine.dosage_form)
            .bind(&medicine.description)
            .bind(&medicine.brand_name)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::{MedipalError, ValidationError};
    use models::medical::seed_catalog;

    #[tokio::test]
    async fn seeding_twice_inserts_once() {
        let storage = Storage::in_memory().await.unwrap();
        assert_eq!(storage.seed_medicines(&seed_catalog()).await.unwrap(), 3);
        assert_eq!(storage.seed_medicines(&seed_catalog()).await.unwrap(), 0);

        let brands: Vec<String> = storage.list_medicines().await.unwrap().into_iter().map(|m| m.brand_name).collect();
        assert_eq!(brands, vec!["Cherrycough", "Crocin", "Otrivin"]);
    }

    #[tokio::test]
    async fn added_medicine_gets_a_serial_number() {
        let storage = Storage::in_memory().await.unwrap();
        let added = storage
            .add_medicine(&NewMedicine::new("Dolo", "Paracetamol", "tablet", "Fever"))
            .await
            .unwrap();
        assert_eq!(storage.get_medicine(added.serial_no).await.unwrap(), Some(added));
    }

    #[tokio::test]
    async fn medicine_without_drug_name_is_rejected() {
        let storage = Storage::in_memory().await.unwrap();
        let incomplete = NewMedicine {
            brand_name: Some("Dolo".into()),
            ..Default::default()
        };
        assert!(matches!(
            storage.add_medicine(&incomplete).await,
            Err(MedipalError::Validation(ValidationError::MissingField(_)))
        ));
    }
}
