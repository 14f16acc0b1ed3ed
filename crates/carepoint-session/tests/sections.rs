use std::collections::BTreeSet;

use carepoint_core::models::draft::UiState;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::snapshot::FormSnapshot;
use carepoint_forms::definition;
use carepoint_forms::forms::{billing, patient_admission as adm, vitals};
use carepoint_forms::rules::ValidationContext;
use carepoint_session::error::NavigationError;
use carepoint_session::sections::SectionTracker;
use jiff::civil::date;

fn ctx() -> ValidationContext {
    ValidationContext::at(date(2024, 1, 1))
}

fn tracker() -> SectionTracker {
    SectionTracker::new(definition(FormType::PatientAdmission))
}

fn registration(s: &mut FormSnapshot) {
    s.set(adm::FULL_NAME, "Asha Rao");
    s.set(adm::DATE_OF_BIRTH, date(1975, 3, 9));
    s.set(adm::GENDER, "Female");
    s.set(adm::PHONE, "9876543210");
}

fn complete_admission() -> FormSnapshot {
    let mut s = definition(FormType::PatientAdmission).defaults();
    registration(&mut s);
    s.set(adm::ADMISSION_DATE, date(2024, 1, 2));
    s.set(adm::WARD, "General");
    s.set(adm::ATTENDING_DOCTOR, "Dr. Mehta");
    s.set(adm::REASON, "Observation after fall");
    s.set(vitals::PULSE, 88.0);
    s.set(billing::CONSULTATION_FEE, 500.0);
    s
}

#[test]
fn sections_follow_form_order() {
    let t = tracker();
    assert_eq!(
        t.sections(),
        &[
            SectionKey::Registration,
            SectionKey::Admission,
            SectionKey::Vitals,
            SectionKey::Billing
        ]
    );
    assert_eq!(t.current(), SectionKey::Registration);
    assert!(t.is_expanded(SectionKey::Registration));
    assert!(!t.is_expanded(SectionKey::Billing));
}

#[test]
fn complete_snapshot_validates_every_section() {
    let t = tracker();
    let s = complete_admission();
    for key in t.sections() {
        assert!(t.is_section_valid(*key, &s, &ctx()), "{key} should be valid");
    }
}

#[test]
fn active_section_earns_half_credit() {
    let mut t = tracker();
    let mut s = definition(FormType::PatientAdmission).defaults();
    assert_eq!(t.completion_percentage(&s, &ctx()), 0);

    registration(&mut s);
    // 0.5 of 4 sections
    assert_eq!(t.completion_percentage(&s, &ctx()), 13);

    t.advance(&s, &ctx()).unwrap();
    assert_eq!(t.current(), SectionKey::Admission);
    assert_eq!(t.completion_percentage(&s, &ctx()), 25);
}

#[test]
fn completion_is_monotonic_and_capped() {
    let mut t = tracker();
    let s = complete_admission();
    let mut seen = vec![t.completion_percentage(&s, &ctx())];
    for _ in 0..t.sections().len() {
        t.advance(&s, &ctx()).unwrap();
        seen.push(t.completion_percentage(&s, &ctx()));
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.iter().all(|p| *p <= 100));

    // Advancing on the last section stays put.
    assert_eq!(t.current(), SectionKey::Billing);
    assert_eq!(t.advance(&s, &ctx()).unwrap(), SectionKey::Billing);
    assert_eq!(t.completion_percentage(&s, &ctx()), 100);
}

#[test]
fn advance_is_gated_but_jump_is_not() {
    let mut t = tracker();
    let s = definition(FormType::PatientAdmission).defaults();

    let err = t.advance(&s, &ctx()).unwrap_err();
    match err {
        NavigationError::Blocked { section, errors } => {
            assert_eq!(section, SectionKey::Registration);
            assert!(errors.contains(adm::FULL_NAME));
            assert!(errors.contains(adm::PHONE));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(t.current(), SectionKey::Registration);
    assert!(t.completed().is_empty());

    assert_eq!(t.jump_to(SectionKey::Billing).unwrap(), SectionKey::Billing);
    assert_eq!(t.current(), SectionKey::Billing);
    assert!(t.completed().is_empty());
}

#[test]
fn jump_to_section_outside_form_fails() {
    let mut t = tracker();
    let err = t.jump_to(SectionKey::Professional).unwrap_err();
    assert!(matches!(err, NavigationError::UnknownSection(SectionKey::Professional)));
    assert_eq!(t.current(), SectionKey::Registration);
}

#[test]
fn retreat_steps_back_and_stops_at_first() {
    let mut t = tracker();
    let s = complete_admission();
    t.advance(&s, &ctx()).unwrap();
    t.advance(&s, &ctx()).unwrap();
    assert_eq!(t.retreat(), SectionKey::Admission);
    assert_eq!(t.retreat(), SectionKey::Registration);
    assert_eq!(t.retreat(), SectionKey::Registration);
    // Going back does not undo completion.
    assert_eq!(t.completed().len(), 2);
}

#[test]
fn advance_rechecks_completed_sections() {
    let mut t = tracker();
    let mut s = complete_admission();
    t.advance(&s, &ctx()).unwrap();
    assert!(t.is_complete(SectionKey::Registration));

    s.remove(adm::PHONE);
    t.advance(&s, &ctx()).unwrap();
    assert!(!t.is_complete(SectionKey::Registration));
    assert!(t.is_complete(SectionKey::Admission));
}

#[test]
fn mark_complete_requires_validity_and_is_idempotent() {
    let mut t = tracker();
    let empty = FormSnapshot::new();
    assert!(!t.mark_section_complete(SectionKey::Registration, &empty, &ctx()));

    let s = complete_admission();
    assert!(t.mark_section_complete(SectionKey::Registration, &s, &ctx()));
    assert!(t.mark_section_complete(SectionKey::Registration, &s, &ctx()));
    assert_eq!(t.completed().len(), 1);
    assert!(!t.mark_section_complete(SectionKey::Schedule, &s, &ctx()));
}

#[test]
fn toggle_expanded_flips() {
    let mut t = tracker();
    assert!(t.toggle_expanded(SectionKey::Vitals));
    assert!(t.is_expanded(SectionKey::Vitals));
    assert!(!t.toggle_expanded(SectionKey::Vitals));
    assert!(!t.is_expanded(SectionKey::Vitals));
}

#[test]
fn restore_keeps_only_sections_that_still_validate() {
    let mut t = tracker();
    let mut s = complete_admission();
    s.remove(adm::WARD);
    let saved = UiState {
        current_section: SectionKey::Vitals,
        completed_sections: [SectionKey::Registration, SectionKey::Admission]
            .into_iter()
            .collect::<BTreeSet<_>>(),
    };
    t.restore(&saved, &s, &ctx());

    assert_eq!(t.current(), SectionKey::Vitals);
    assert!(t.is_complete(SectionKey::Registration));
    assert!(!t.is_complete(SectionKey::Admission));
    assert!(t.is_expanded(SectionKey::Vitals));

    let ui = t.ui_state();
    assert_eq!(ui.current_section, SectionKey::Vitals);
    assert_eq!(ui.completed_sections.len(), 1);

    t.reset();
    assert_eq!(t.current(), SectionKey::Registration);
    assert!(t.completed().is_empty());
}
