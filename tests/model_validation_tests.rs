use learning_portal::{
    guards::{GuardOutcome, Navigation, Role, View},
    models::{
        CertificationWorkflow, ErrorEnvelope, Section, SectionOutline, Subsection, WebhookAck,
    },
};
use serde_json::{Value, json};
use uuid::Uuid;

#[test]
fn test_section_outline_flattens_section_fields() {
    // The client reads section fields and `subsections` off the same object.
    let section_id = Uuid::new_v4();
    let outline = SectionOutline {
        section: Section {
            id: section_id,
            course_id: Uuid::new_v4(),
            title: "Basics".to_string(),
            position: 1,
        },
        subsections: vec![Subsection {
            id: Uuid::new_v4(),
            section_id,
            title: "Hello".to_string(),
            content: None,
            video_url: None,
            position: 1,
        }],
    };

    let value = serde_json::to_value(&outline).unwrap();
    assert_eq!(value["title"], "Basics");
    assert_eq!(value["id"], json!(section_id));
    assert!(value.get("section").is_none());
    assert_eq!(value["subsections"].as_array().unwrap().len(), 1);
}

#[test]
fn test_guard_outcome_wire_format() {
    let outcome = GuardOutcome {
        view: View::AccessDenied,
        navigation: Some(Navigation::replace("/")),
    };

    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({ "view": "access_denied", "navigation": { "to": "/", "replace": true } })
    );

    let rendered = serde_json::to_value(GuardOutcome::render(View::SignIn)).unwrap();
    assert_eq!(rendered, json!({ "view": "sign_in", "navigation": null }));
}

#[test]
fn test_role_uses_profile_spelling() {
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    assert_eq!(Role::from_profile(Role::Student.as_str()), Some(Role::Student));
    assert_eq!(Role::from_profile("Admin"), None);
}

#[test]
fn test_webhook_envelopes() {
    let ack = WebhookAck {
        success: true,
        message: "Exam results processed successfully".to_string(),
    };
    assert_eq!(
        serde_json::to_string(&ack).unwrap(),
        r#"{"success":true,"message":"Exam results processed successfully"}"#
    );

    let error = ErrorEnvelope {
        error: "Missing required fields: user_id and level".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&error).unwrap(),
        json!({ "error": "Missing required fields: user_id and level" })
    );
}

#[test]
fn test_workflow_keeps_exam_results_verbatim() {
    let results = json!({ "answers": [1, null, "c"], "meta": { "duration": 1800 } });
    let workflow = CertificationWorkflow {
        exam_results_json: Some(results.clone()),
        ..Default::default()
    };

    let value: Value = serde_json::to_value(&workflow).unwrap();
    assert_eq!(value["exam_results_json"], results);

    let back: CertificationWorkflow = serde_json::from_value(value).unwrap();
    assert_eq!(back, workflow);
}
