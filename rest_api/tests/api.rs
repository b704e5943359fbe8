// rest_api/tests/api.rs

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use models::errors::MedipalResult;
use models::medical::seed_catalog;
use notifications_service::RecordingMailer;
use rest_api::{router, AppState, FileHost, UploadedFile};
use security::SessionKeys;
use serde_json::{json, Value};
use storage::Storage;
use tower::ServiceExt;

const PATIENT_PHONE: &str = "9999999999";

struct StubHost;

#[async_trait]
impl FileHost for StubHost {
    async fn upload(&self, folder: &str, file: UploadedFile) -> MedipalResult<String> {
        Ok(format!("https://files.example/{}/{}", folder, file.file_name))
    }
}

struct TestApp {
    app: Router,
    storage: Storage,
    mailer: RecordingMailer,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_mailer(RecordingMailer::new()).await
    }

    async fn with_mailer(mailer: RecordingMailer) -> Self {
        let storage = Storage::in_memory().await.unwrap();
        storage.seed_medicines(&seed_catalog()).await.unwrap();
        security::setup_admin("root", "admin-pass", None, &storage).await.unwrap();

        let state = AppState {
            storage: storage.clone(),
            keys: SessionKeys::new("integration-test-secret-0123456789abcdef").unwrap(),
            mailer: Arc::new(mailer.clone()),
            file_host: Arc::new(StubHost),
        };
        TestApp {
            app: router(state),
            storage,
            mailer,
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send_text(method, uri, token, body.map(|b| b.to_string())).await
    }

    /// Like `send`, but the body goes out exactly as written.
    async fn send_text(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, registration_no: &str, email: &str) {
        let (status, body) = self
            .send(
                Method::POST,
                "/register",
                None,
                Some(json!({
                    "name": format!("Dr. {}", registration_no),
                    "specialisation": "General Medicine",
                    "contactNumber": "9876543210",
                    "email": email,
                    "password": "s3cret!",
                    "confirmPassword": "s3cret!",
                    "registrationNo": registration_no,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["isVerified"], json!(false));
        assert!(body.get("passwordHash").is_none());
    }

    async fn login(&self, registration_no: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "registrationNo": registration_no, "password": "s3cret!" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["role"].as_str().unwrap().to_string(),
        )
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/admin/login",
                None,
                Some(json!({ "username": "root", "password": "admin-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn verify(&self, registration_no: &str) {
        let admin = self.admin_token().await;
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/admin/doctors/{}/verify", registration_no),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["isVerified"], json!(true));
    }

    /// Registers, verifies and logs in a doctor.
    async fn verified_doctor(&self, registration_no: &str, email: &str) -> String {
        self.register(registration_no, email).await;
        self.verify(registration_no).await;
        let (token, role) = self.login(registration_no).await;
        assert_eq!(role, "doctor");
        token
    }

    async fn first_medicine(&self, token: &str) -> i64 {
        let (status, body) = self.send(Method::GET, "/medicines", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body[0]["serialNo"].as_i64().unwrap()
    }
}

fn prescription_body(medicine_id: i64) -> Value {
    json!({
        "patientContact": PATIENT_PHONE,
        "patientDetails": { "name": "Asha", "age": 34, "diagnosis": "Viral fever" },
        "medicines": [{
            "medicineId": medicine_id,
            "dosageType": "tablet",
            "duration": 5,
            "instruction": "After food",
            "times": [
                { "timeOfDay": "morning", "dosage": 1.0 },
                { "timeOfDay": "night", "dosage": 0.5 }
            ]
        }]
    })
}

#[tokio::test]
async fn doctor_lifecycle_from_registration_to_claim() {
    let app = TestApp::new().await;

    app.register("REG-1", "one@example.com").await;
    let (_, role) = app.login("REG-1").await;
    assert_eq!(role, "unverified");

    app.verify("REG-1").await;
    let notice = app.mailer.last_to("one@example.com").await.unwrap();
    assert!(notice.subject.contains("verified"));

    let (token, role) = app.login("REG-1").await;
    assert_eq!(role, "doctor");

    let medicine_id = app.first_medicine(&token).await;
    let (status, created) = app
        .send(Method::POST, "/prescriptions", Some(&token), Some(prescription_body(medicine_id)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["medicineList"].as_array().unwrap().len(), 1);
    assert_eq!(created["medicineList"][0]["times"].as_array().unwrap().len(), 2);

    let (status, claimed) = app
        .send(
            Method::POST,
            "/prescriptions/claim",
            None,
            Some(json!({ "prescriptionId": id, "phoneNumber": PATIENT_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", claimed);
    assert_eq!(claimed["isUsedBy"], json!(PATIENT_PHONE));
    assert_eq!(claimed["doctor"]["registrationNo"], json!("REG-1"));
    assert_eq!(claimed["patient"]["phoneNumber"], json!(PATIENT_PHONE));
    assert_eq!(claimed["medicineList"].as_array().unwrap().len(), 1);

    let (status, listed) = app
        .send(Method::GET, &format!("/prescriptions?phone={}", PATIENT_PHONE), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["id"], json!(id));

    let other = app.verified_doctor("REG-2", "two@example.com").await;
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/prescriptions/{}", id),
            Some(&other),
            Some(prescription_body(medicine_id)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn placeholder_copies_can_be_deleted_by_anyone_until_claimed() {
    let app = TestApp::new().await;
    let token = app.verified_doctor("REG-1", "one@example.com").await;
    let medicine_id = app.first_medicine(&token).await;

    let (_, original) = app
        .send(Method::POST, "/prescriptions", Some(&token), Some(prescription_body(medicine_id)))
        .await;
    let original_id = original["id"].as_str().unwrap().to_string();

    let (status, copy) = app
        .send(Method::POST, &format!("/prescriptions/{}/reuse", original_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", copy);
    let copy_id = copy["id"].as_str().unwrap().to_string();
    assert!(copy["isUsedBy"].as_str().unwrap().starts_with("temp_"));

    let (status, _) = app.send(Method::DELETE, &format!("/prescriptions/{}", copy_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, &format!("/prescriptions/{}", copy_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, second) = app
        .send(Method::POST, &format!("/prescriptions/{}/reuse", original_id), Some(&token), None)
        .await;
    let second_id = second["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(
            Method::POST,
            "/prescriptions/claim",
            None,
            Some(json!({ "prescriptionId": second_id, "phoneNumber": "8888888888" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::DELETE, &format!("/prescriptions/{}", second_id), None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(Method::DELETE, &format!("/prescriptions/{}", second_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unverified_doctors_cannot_author() {
    let app = TestApp::new().await;
    app.register("REG-1", "one@example.com").await;
    let (token, _) = app.login("REG-1").await;

    let (status, body) = app
        .send(Method::POST, "/prescriptions", Some(&token), Some(prescription_body(1)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], json!("error"));

    let (status, session) = app.send(Method::GET, "/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["role"], json!("unverified"));
}

#[tokio::test]
async fn bad_credentials_and_missing_sessions() {
    let app = TestApp::new().await;
    app.register("REG-1", "one@example.com").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "registrationNo": "REG-1", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Invalid credentials"));

    let (status, _) = app.send(Method::GET, "/admin/doctors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, _) = app.login("REG-1").await;
    let (status, _) = app.send(Method::GET, "/admin/doctors", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let app = TestApp::new().await;
    let token = app.verified_doctor("REG-1", "one@example.com").await;

    let mut body = prescription_body(1);
    body["medicines"][0]["times"] = json!([]);
    let (status, error) = app.send(Method::POST, "/prescriptions", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], json!("medicines[0].times"));

    let (status, _) = app
        .send(Method::POST, "/prescriptions", Some(&token), Some(prescription_body(9_999)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::GET, "/prescriptions?phone=7777777777", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn undecodable_bodies_are_validation_errors() {
    let app = TestApp::new().await;
    let token = app.verified_doctor("REG-1", "one@example.com").await;

    let mut body = prescription_body(1);
    body["medicines"][0]["dosageType"] = json!("syrup");
    let (status, error) = app.send(Method::POST, "/prescriptions", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", error);
    assert_eq!(error["status"], json!("error"));
    assert_eq!(error["field"], json!("body"));
    assert!(error["message"].as_str().unwrap().contains("dosageType"));

    let mut body = prescription_body(1);
    body["medicines"][0]["medicineId"] = json!("first");
    let (status, error) = app.send(Method::POST, "/prescriptions", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], json!("body"));

    let (status, error) = app
        .send_text(Method::POST, "/prescriptions/claim", None, Some("{\"prescriptionId\": ".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], json!("body"));

    let (status, error) = app
        .send_text(Method::POST, "/login", None, Some("not json".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["field"], json!("body"));
}

#[tokio::test]
async fn verification_toggle_survives_an_undeliverable_notice() {
    let app = TestApp::with_mailer(RecordingMailer::failing()).await;
    app.register("REG-1", "one@example.com").await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .send(Method::POST, "/admin/doctors/REG-1/verify", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["isVerified"], json!(true));
    assert!(app.mailer.sent().await.is_empty());

    let doctor = app.storage.get_doctor("REG-1").await.unwrap().unwrap();
    assert!(doctor.is_verified);
}

#[tokio::test]
async fn admin_manages_doctors_and_patients() {
    let app = TestApp::new().await;
    let token = app.verified_doctor("REG-1", "one@example.com").await;
    let medicine_id = app.first_medicine(&token).await;
    app.send(Method::POST, "/prescriptions", Some(&token), Some(prescription_body(medicine_id)))
        .await;
    let admin = app.admin_token().await;

    let (status, doctors) = app.send(Method::GET, "/admin/doctors", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doctors.as_array().unwrap().len(), 1);

    let (status, patients) = app.send(Method::GET, "/admin/patients?limit=10", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patients[0]["phoneNumber"], json!(PATIENT_PHONE));

    let contacts = format!("/admin/patients/{}/contacts", PATIENT_PHONE);
    let (status, _) = app
        .send(
            Method::POST,
            &contacts,
            Some(&admin),
            Some(json!({ "name": "Ravi", "relation": "Brother", "phoneNumber": "9123456780" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, listed) = app.send(Method::GET, &contacts, Some(&admin), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = app
        .send(
            Method::PATCH,
            "/admin/doctors/REG-1",
            Some(&admin),
            Some(json!({ "specialisation": "Paediatrics" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["specialisation"], json!("Paediatrics"));
    assert_eq!(updated["isVerified"], json!(true));

    let (status, _) = app.send(Method::DELETE, "/admin/doctors/REG-1", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/medicines", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::DELETE, &format!("/admin/patients/{}", PATIENT_PHONE), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.storage.get_patient(PATIENT_PHONE).await.unwrap().is_none());
}

#[tokio::test]
async fn password_reset_over_http() {
    let app = TestApp::new().await;
    app.register("REG-1", "one@example.com").await;

    let (status, _) = app
        .send(Method::POST, "/password-reset", None, Some(json!({ "email": "one@example.com" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let mail = app.mailer.last_to("one@example.com").await.unwrap();
    let otp = mail
        .body
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 6)
        .unwrap()
        .to_string();

    let reset = json!({ "email": "one@example.com", "otp": otp, "newPassword": "brand-new" });
    let (status, _) = app.send(Method::PUT, "/password-reset", None, Some(reset.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::PUT, "/password-reset", None, Some(reset)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "registrationNo": "REG-1", "password": "brand-new" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn multipart_upload_returns_the_hosted_url() {
    let app = TestApp::new().await;
    let boundary = "medipal-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"license.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/uploads/license")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["url"], json!("https://files.example/doctor_licenses/license.png"));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
