use carepoint_core::draft_keys;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::{RecordId, split_full_name};
use carepoint_core::models::snapshot::{FieldValue, FormSnapshot};
use jiff::civil::date;

#[test]
fn empty_text_is_blank() {
    let mut snap = FormSnapshot::new();
    snap.set("personal.middle_name", "   ");
    snap.set("personal.full_name", "John Doe");

    assert!(snap.is_blank("personal.middle_name"));
    assert!(snap.is_blank("personal.unset"));
    assert!(!snap.is_blank("personal.full_name"));
    assert_eq!(snap.text("personal.middle_name"), None);
    assert_eq!(snap.text("personal.full_name"), Some("John Doe"));
}

#[test]
fn dates_serialize_as_iso_strings() {
    let mut snap = FormSnapshot::new();
    snap.set("personal.date_of_birth", date(1990, 1, 1));
    snap.set("billing.consultation_fee", 500.0);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["personal.date_of_birth"], "1990-01-01");
    assert_eq!(json["billing.consultation_fee"], 500.0);
}

#[test]
fn dates_come_back_as_text_until_revived() {
    let mut snap = FormSnapshot::new();
    snap.set("personal.date_of_birth", date(1990, 1, 1));
    snap.set("personal.full_name", "2024-01-01");

    let json = serde_json::to_string(&snap).unwrap();
    let mut back: FormSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(
        back.get("personal.date_of_birth"),
        Some(&FieldValue::Text("1990-01-01".to_string()))
    );

    let revived = back.revive_dates(["personal.date_of_birth"]);
    assert_eq!(revived, 1);
    assert_eq!(back, snap);
    // Not a date path, so it stays text even though it looks like one.
    assert_eq!(back.text("personal.full_name"), Some("2024-01-01"));
}

#[test]
fn unparseable_date_text_is_left_alone() {
    let mut snap = FormSnapshot::new();
    snap.set("admission.admission_date", "next tuesday");
    assert_eq!(snap.revive_dates(["admission.admission_date"]), 0);
    assert_eq!(snap.text("admission.admission_date"), Some("next tuesday"));
}

#[test]
fn null_and_lists_round_trip() {
    let mut snap = FormSnapshot::new();
    snap.set("consultation.symptoms", vec!["fever".to_string(), "cough".to_string()]);
    snap.set("consultation.notes", FieldValue::Empty);
    snap.set("consultation.follow_up_required", true);

    let json = serde_json::to_string(&snap).unwrap();
    let back: FormSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}

#[test]
fn full_name_splits_on_first_whitespace() {
    assert_eq!(
        split_full_name("John Doe"),
        ("John".to_string(), "Doe".to_string())
    );
    assert_eq!(
        split_full_name("  Mary   Ann Lee "),
        ("Mary".to_string(), "Ann Lee".to_string())
    );
    assert_eq!(split_full_name("Cher"), ("Cher".to_string(), String::new()));
}

#[test]
fn keys_and_identifiers() {
    assert_eq!(
        draft_keys::draft("dr-42", FormType::OpdVisit),
        "draft:dr-42:opd_visit"
    );
    assert!(draft_keys::draft("u1", FormType::PatientAdmission)
        .starts_with(&draft_keys::owner_prefix("u1")));
    assert_eq!("vitals".parse::<SectionKey>().unwrap(), SectionKey::Vitals);
    assert_eq!(
        "doctor_registration".parse::<FormType>().unwrap(),
        FormType::DoctorRegistration
    );
    assert!("ward_round".parse::<FormType>().is_err());
}

#[test]
fn record_ids_parse_and_key() {
    let id = RecordId::new();
    assert_eq!(id.to_string().parse::<RecordId>().unwrap(), id);
    assert_eq!(draft_keys::record(id), format!("record:{id}"));
    assert!("not-a-uuid".parse::<RecordId>().is_err());
    assert_eq!(format!("{:<8}|", FormType::OpdVisit), "opd_visit|");
    assert_eq!(format!("{:<12}|", SectionKey::Vitals), "vitals      |");
}
