pub mod admin;
pub mod doctor;
pub mod emergency_contact;
pub mod login;
pub mod medicine;
pub mod patient;
pub mod prescription;
pub mod role;

pub use admin::{default_admin_email, Admin};
pub use doctor::{validate_email, Doctor, DoctorSummary, DoctorUpdate, NewDoctor, ValidatedRegistration};
pub use emergency_contact::{EmergencyContact, NewEmergencyContact};
pub use login::{AdminLogin, DoctorLogin, OtpRequest, OtpVerification, SessionGrant};
pub use medicine::{seed_catalog, Medicine, NewMedicine};
pub use patient::{claimant, Pagination, Patient, PatientDetails, DEFAULT_PATIENT_NAME, UNKNOWN_REGION};
pub use prescription::{
    validate_entries, ClaimRequest, DosageType, MedicineEntryInput, MedicineTiming, Prescription, PrescriptionDetails,
    PrescriptionEntry, PrescriptionInput, SignatureRequest, TimeOfDay,
};
pub use role::Role;
