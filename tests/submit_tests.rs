use serde_json::{Value, json};
use workorder_intake::review::flatten::{FlattenLimits, FormField, LeafKind, flatten};
use workorder_intake::review::form::ReviewForm;
use workorder_intake::staging::staged_file::IncomingFile;
use workorder_intake::submit::submitter::{
    SubmitOutcome, Submitter, payload_fingerprint, write_backup,
};
use workorder_intake::submit::unflatten::{collect, resolve_path, unflatten};
use workorder_intake::submit::validate::{missing_paths, validate};
use workorder_intake::upload::transport::{MockReply, MockTransport};
use workorder_intake::upload::uploader::NoopObserver;
use workorder_intake::workflow::cycle::CycleState;
use workorder_intake::workflow::error::IntakeError;
use workorder_intake::workflow::profile::{WorkflowProfile, builtin_profiles, work_order_template};
use workorder_intake::workflow::session::{ReviewSession, SessionSettings};

const BASE: &str = "http://backend:5000";
const WEBHOOK: &str = "http://hooks/orders";

fn required(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

// =========================================================================
// Unflattening
// =========================================================================

#[test]
fn string_leaves_survive_flatten_and_unflatten() {
    let doc = json!({
        "shippingname": "Bob",
        "propertymanagerdetails": {"paymentbuyeremail": "a@b.c", "deep": {"x": "1"}},
        "type": ""
    });
    let fields = flatten(&doc, &FlattenLimits::default()).unwrap();
    assert_eq!(unflatten(&fields), doc);
}

#[test]
fn number_bool_and_null_leaves_survive_flatten_and_unflatten() {
    let doc = json!({
        "a": {"n": 5, "ok": true, "rate": 1.25, "gone": null},
        "s": "x",
        "neg": -3
    });
    let fields = flatten(&doc, &FlattenLimits::default()).unwrap();
    assert_eq!(unflatten(&fields), doc);
}

#[test]
fn edited_number_keeps_its_type_while_it_parses() {
    let doc = json!({"qty": 5, "urgent": false});
    let mut form = ReviewForm::from_document(&doc, &FlattenLimits::default()).unwrap();

    form.set_field("qty", " 12 ").unwrap();
    form.set_field("urgent", "true").unwrap();
    assert_eq!(unflatten(&form.fields), json!({"qty": 12, "urgent": true}));

    form.set_field("qty", "twelve").unwrap();
    form.set_field("urgent", "yes").unwrap();
    assert_eq!(
        unflatten(&form.fields),
        json!({"qty": "twelve", "urgent": "yes"})
    );
}

#[test]
fn empty_text_restores_a_null_leaf() {
    let fields = vec![
        FormField::new("gone", "").with_kind(LeafKind::Null),
        FormField::new("note", "").with_kind(LeafKind::Text),
    ];
    assert_eq!(unflatten(&fields), json!({"gone": null, "note": ""}));
}

#[test]
fn edited_values_land_at_their_paths() {
    let fields = vec![
        FormField::new("a.b", "1"),
        FormField::new("a.c", "2"),
        FormField::new("d", "3"),
    ];
    assert_eq!(unflatten(&fields), json!({"a": {"b": "1", "c": "2"}, "d": "3"}));
}

#[test]
fn collect_fills_template_and_keeps_extras() {
    let template = json!({"email": "", "pm": {"name": "", "phone": ""}, "type": ""});
    let fields = vec![
        FormField::new("pm.name", "Ann"),
        FormField::new("extra", "kept"),
    ];

    let payload = collect(&fields, template);
    assert_eq!(
        payload,
        json!({
            "email": "",
            "pm": {"name": "Ann", "phone": ""},
            "type": "",
            "extra": "kept"
        })
    );
}

#[test]
fn scalar_in_the_way_is_replaced_by_an_object() {
    let template = json!({"pm": "flat"});
    let payload = collect(&[FormField::new("pm.name", "Ann")], template);
    assert_eq!(payload, json!({"pm": {"name": "Ann"}}));
}

#[test]
fn non_object_seed_starts_empty() {
    let payload = collect(&[FormField::new("a", "1")], json!(["x"]));
    assert_eq!(payload, json!({"a": "1"}));
}

#[test]
fn resolve_path_walks_objects_only() {
    let payload = json!({"a": {"b": "1"}, "s": "x"});
    assert_eq!(resolve_path(&payload, "a.b"), Some(&json!("1")));
    assert_eq!(resolve_path(&payload, "a"), Some(&json!({"b": "1"})));
    assert_eq!(resolve_path(&payload, "s.t"), None);
    assert_eq!(resolve_path(&payload, "missing"), None);
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn validation_checks_presence_not_content() {
    let payload = json!({"paymentponumber": "", "pm": {"email": ""}});
    assert!(validate(&payload, &required(&["paymentponumber", "pm.email"])).is_ok());
}

#[test]
fn validation_lists_every_missing_path_in_order() {
    let payload = json!({"shippingname": "Bob"});
    let req = required(&["paymentponumber", "shippingname", "pm.email"]);

    assert_eq!(missing_paths(&payload, &req), vec!["paymentponumber", "pm.email"]);
    let err = validate(&payload, &req).unwrap_err();
    assert_eq!(err.to_string(), "Missing required fields: paymentponumber, pm.email");
}

#[test]
fn gpt_template_satisfies_its_own_required_fields() {
    let profile = builtin_profiles().remove("gpt").unwrap();
    assert!(validate(&work_order_template(), &profile.required_fields).is_ok());
}

// =========================================================================
// Webhook outcomes
// =========================================================================

#[test]
fn webhook_json_reply_is_accepted() {
    let transport =
        MockTransport::new().on_post(WEBHOOK, MockReply::json(200, json!({"id": 9})));
    let outcome = Submitter::new(&transport, WEBHOOK).submit(&json!({"a": "1"}));

    assert_eq!(outcome, SubmitOutcome::Accepted(json!({"id": 9})));
    assert!(outcome.message().starts_with("Data submitted successfully!"));
    assert_eq!(transport.requests()[0].json, Some(json!({"a": "1"})));
}

#[test]
fn webhook_success_with_unreadable_body_still_succeeds() {
    for body in ["", "OK"] {
        let transport = MockTransport::new().on_post(WEBHOOK, MockReply::text(200, body));
        let outcome = Submitter::new(&transport, WEBHOOK).submit(&json!({}));
        assert_eq!(outcome, SubmitOutcome::AcceptedUnreadable);
        assert!(outcome.is_success());
    }
}

#[test]
fn webhook_rejection_and_unreachable_are_failures() {
    let transport = MockTransport::new()
        .on_post(WEBHOOK, MockReply::json(422, json!({"message": "bad po"})));
    let outcome = Submitter::new(&transport, WEBHOOK).submit(&json!({}));
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected {
            status: 422,
            message: "bad po".into()
        }
    );
    assert_eq!(outcome.message(), "Error: webhook answered HTTP 422: bad po");

    let transport = MockTransport::new().on_post(WEBHOOK, MockReply::Fail("timed out".into()));
    let outcome = Submitter::new(&transport, WEBHOOK).submit(&json!({}));
    assert!(matches!(outcome, SubmitOutcome::TransportFailed(_)));
    assert!(!outcome.is_success());
    assert!(outcome.message().starts_with("Failed to submit data:"));
}

// =========================================================================
// Backups
// =========================================================================

#[test]
fn backup_is_named_by_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let payload = json!({"paymentponumber": "PO-1"});

    let path = write_backup(&payload, &dir.path().join("backups")).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name, format!("submission-{}.json", &payload_fingerprint(&payload)[..12]));

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, payload);
}

#[test]
fn fingerprint_is_sha1_hex() {
    let fp = payload_fingerprint(&json!({}));
    assert_eq!(fp.len(), 40);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(fp, payload_fingerprint(&json!({"a": 1})));
}

// =========================================================================
// Session submit flow
// =========================================================================

fn reviewing_session<'a>(
    transport: &'a MockTransport,
    profile: WorkflowProfile,
    settings: SessionSettings,
) -> ReviewSession<'a> {
    let mut session = ReviewSession::new(transport, profile, settings);
    session
        .stage(vec![IncomingFile::from_bytes("a.pdf", vec![1; 16])])
        .unwrap();
    session.upload(&mut NoopObserver).unwrap();
    session
}

#[test]
fn missing_required_field_blocks_the_webhook() {
    let transport = MockTransport::new()
        .on_upload("a.pdf", MockReply::json(200, json!({"result": {"name": "Bob"}})));
    let profile = WorkflowProfile {
        required_fields: required(&["paymentponumber"]),
        ..WorkflowProfile::new("/upload")
    };
    let mut session = reviewing_session(&transport, profile, SessionSettings::new(BASE, WEBHOOK));

    let err = session.submit().unwrap_err();
    assert!(matches!(err, IntakeError::Validation { .. }));
    assert_eq!(session.state(), CycleState::Reviewing);
    assert!(session
        .notifier()
        .errors()
        .any(|n| n.message == "Missing required fields: paymentponumber"));
    assert!(transport.requests().iter().all(|r| r.method != "POST"));
}

#[test]
fn template_profile_submits_edited_payload() {
    let transport = MockTransport::new()
        .on_upload(
            "a.pdf",
            MockReply::json(200, json!({"result": {"shippingname": "Bob", "note": "x"}})),
        )
        .on_post(WEBHOOK, MockReply::json(200, json!({"ok": true})));
    let profile = builtin_profiles().remove("light-gpt").unwrap();
    let mut session = reviewing_session(&transport, profile, SessionSettings::new(BASE, WEBHOOK));

    session.edit("shippingname", "Robert").unwrap();
    let outcome = session.submit().unwrap();
    assert!(outcome.is_success());
    assert_eq!(session.state(), CycleState::Idle);
    assert!(session.active_review().is_none());

    let posted = transport
        .requests()
        .into_iter()
        .find(|r| r.method == "POST")
        .and_then(|r| r.json)
        .unwrap();
    assert_eq!(posted["shippingname"], "Robert");
    assert_eq!(posted["note"], "x");
    assert_eq!(posted["propertymanagerdetails"]["paymentbuyeremail"], "");
}

#[test]
fn failed_submission_keeps_the_form_open() {
    let transport = MockTransport::new()
        .on_upload("a.pdf", MockReply::json(200, json!({"result": {"name": "Bob"}})))
        .on_post(WEBHOOK, MockReply::json(500, json!({"message": "down"})));
    let mut session = reviewing_session(
        &transport,
        WorkflowProfile::new("/upload"),
        SessionSettings::new(BASE, WEBHOOK),
    );

    let outcome = session.submit().unwrap();
    assert!(!outcome.is_success());
    assert_eq!(session.state(), CycleState::Reviewing);
    assert_eq!(session.active_review().unwrap().field("name").unwrap().value, "Bob");
}

#[test]
fn backup_profile_writes_before_posting() {
    let dir = tempfile::tempdir().unwrap();
    let transport = MockTransport::new()
        .on_upload("a.pdf", MockReply::json(200, json!({"result": {"name": "Bob"}})))
        .on_post(WEBHOOK, MockReply::text(200, ""));
    let profile = WorkflowProfile {
        backup_before_submit: true,
        ..WorkflowProfile::new("/upload")
    };
    let mut settings = SessionSettings::new(BASE, WEBHOOK);
    settings.backup_dir = Some(dir.path().to_path_buf());

    let mut session = reviewing_session(&transport, profile, settings);
    let outcome = session.submit().unwrap();
    assert_eq!(outcome, SubmitOutcome::AcceptedUnreadable);

    let backups: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(backups.len(), 1);
}

#[test]
fn several_successes_queue_their_reviews() {
    let transport = MockTransport::new()
        .on_upload("a.pdf", MockReply::json(200, json!({"result": {"n": "a"}})))
        .on_upload("b.pdf", MockReply::json(200, json!({"result": {"n": "b"}})))
        .on_post(WEBHOOK, MockReply::json(200, json!({})));
    let mut session = ReviewSession::new(
        &transport,
        WorkflowProfile::new("/upload"),
        SessionSettings::new(BASE, WEBHOOK),
    );
    session
        .stage(vec![
            IncomingFile::from_bytes("a.pdf", vec![1; 4]),
            IncomingFile::from_bytes("b.pdf", vec![1; 4]),
        ])
        .unwrap();
    session.upload(&mut NoopObserver).unwrap();
    assert_eq!(session.pending_reviews(), 2);

    session.submit().unwrap();
    assert_eq!(session.state(), CycleState::Reviewing);
    assert_eq!(session.pending_reviews(), 1);

    session.discard().unwrap();
    assert_eq!(session.state(), CycleState::Idle);
    assert_eq!(session.pending_reviews(), 0);
}

#[test]
fn saved_payload_can_be_resumed_and_submitted() {
    let transport = MockTransport::new().on_post(WEBHOOK, MockReply::json(201, json!({})));
    let mut session = ReviewSession::new(
        &transport,
        WorkflowProfile::new("/upload"),
        SessionSettings::new(BASE, WEBHOOK),
    );

    let form = ReviewForm::from_document(&json!({"a": {"b": "1"}}), &FlattenLimits::default())
        .unwrap();
    session.resume(form).unwrap();
    assert_eq!(session.state(), CycleState::Reviewing);

    session.edit("a.b", "2").unwrap();
    assert_eq!(session.collect().unwrap(), json!({"a": {"b": "2"}}));
    assert!(session.submit().unwrap().is_success());
    assert_eq!(session.state(), CycleState::Idle);
}
