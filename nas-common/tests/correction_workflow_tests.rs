//! Integration tests for the correction workflow
//!
//! Covers version preconditions, all-or-nothing persistence and concurrent
//! corrections made through one service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nas_common::correction::diff_to_text;
use nas_common::endpoint::Endpoint;
use nas_common::events::{EventBus, NotificationEvent};
use nas_common::expression::{ExpressionError, NoExpressions};
use nas_common::store::{InMemoryStore, Record, SearchFields, Store};
use nas_common::{
    Answer, AssessmentService, Correction, CorrectionRequest, Error, Form, Precondition, Response,
};
use serde_json::{json, Value};

fn form() -> Form {
    serde_json::from_value(json!({
        "$schema": "https://example.com/form.schema.json",
        "$id": "https://example.com/form/f1",
        "sections": [
            {
                "id": "basicInfo",
                "title": "Basic information",
                "questions": [
                    { "id": "name", "title": "Name", "required": true, "format": { "type": "text" } },
                    { "id": "region", "title": "Region", "format": { "type": "region", "regions": [
                        { "id": "lesvos", "locality": "Lesvos", "countryCode": "GR" },
                        { "id": "calais", "locality": "Calais", "countryCode": "FR" }
                    ] } }
                ]
            },
            {
                "id": "lesvosInfo",
                "title": "Lesvos details",
                "questions": [
                    { "id": "camp", "title": "Camp", "required": "basicInfo.region = 'lesvos'",
                      "format": { "type": "text" } }
                ]
            }
        ]
    }))
    .unwrap()
}

fn service() -> AssessmentService {
    AssessmentService::new(
        Endpoint::new("https://example.com/").unwrap(),
        Arc::new(NoExpressions),
        EventBus::new(100),
    )
}

async fn submitted(service: &AssessmentService) -> String {
    service.create_form("f1", form()).await.unwrap();
    service
        .submit(
            "f1",
            Response::new()
                .with("basicInfo", "name", Answer::text("Alex"))
                .with("basicInfo", "region", Answer::text("calais")),
        )
        .await
        .unwrap()
        .id
}

fn request(
    service: &AssessmentService,
    submission_id: &str,
    response: Response,
) -> CorrectionRequest {
    CorrectionRequest {
        form: service.endpoint().form_uri("f1"),
        submission: service.endpoint().submission_uri(submission_id),
        response,
    }
}

fn rename(to: &str) -> Response {
    Response::new().with("basicInfo", "name", Answer::text(to))
}

#[tokio::test]
async fn test_versions_advance_one_by_one() {
    let service = service();
    let id = submitted(&service).await;

    for (version, name) in [(1, "A"), (2, "B"), (3, "C")] {
        service
            .correct(&id, request(&service, &id, rename(name)), &Precondition::Version(version), "admin@example.com")
            .await
            .unwrap();
        let current = service.current(&id).await.unwrap();
        assert_eq!(current.version, version + 1);
        assert_eq!(current.response.answer("basicInfo", "name"), Some(&Answer::text(name)));
    }

    let corrections = service.corrections(&id).await.unwrap();
    let versions: Vec<u32> = corrections.iter().map(|r| r.data.submission_version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_rejected_attempt_leaves_state_unchanged() {
    let service = service();
    let id = submitted(&service).await;
    service
        .correct(&id, request(&service, &id, rename("Sam")), &Precondition::Version(1), "admin@example.com")
        .await
        .unwrap();
    let before = service.current(&id).await.unwrap();

    for declared in [
        Precondition::Version(1),
        Precondition::Version(3),
        Precondition::Missing,
        Precondition::parse(Some("two")),
    ] {
        let err = service
            .correct(&id, request(&service, &id, rename("Nope")), &declared, "admin@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { expected: 2, .. }), "{:?}", err);
        assert!(err.is_expected());
    }

    assert_eq!(service.current(&id).await.unwrap(), before);
}

#[tokio::test]
async fn test_conflict_message_names_expected_version() {
    let service = service();
    let id = submitted(&service).await;

    let err = service
        .correct(&id, request(&service, &id, rename("X")), &Precondition::Version(5), "admin@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Expected correction for submission version 1, got 5");
}

#[tokio::test]
async fn test_concurrent_corrections_accept_exactly_one() {
    let service = Arc::new(service());
    let id = submitted(&service).await;

    let attempts = (0..8).map(|i| {
        let service = service.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let request = request(&service, &id, rename(&format!("Writer {}", i)));
            service
                .correct(&id, request, &Precondition::Version(1), "admin@example.com")
                .await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let accepted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(Error::Conflict { expected: 2, .. }))))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(service.current(&id).await.unwrap().version, 2);
}

#[tokio::test]
async fn test_correction_validated_against_current_form_rules() {
    let engine = |expression: &str, response: &Response| -> Result<Value, ExpressionError> {
        match expression {
            "basicInfo.region = 'lesvos'" => Ok(Value::Bool(
                response.answer("basicInfo", "region") == Some(&Answer::text("lesvos")),
            )),
            other => Err(ExpressionError::Compile(other.to_string())),
        }
    };
    let service = AssessmentService::new(
        Endpoint::new("https://example.com/").unwrap(),
        Arc::new(engine),
        EventBus::new(10),
    );
    let id = submitted(&service).await;

    // Moving to lesvos makes the camp required
    let move_to_lesvos = Response::new().with("basicInfo", "region", Answer::text("lesvos"));
    let err = service
        .correct(&id, request(&service, &id, move_to_lesvos.clone()), &Precondition::Version(1), "admin@example.com")
        .await
        .unwrap_err();
    let Error::InvalidResponse(report) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(report.failures().collect::<Vec<_>>(), vec![("lesvosInfo", "camp")]);

    let with_camp = move_to_lesvos.with("lesvosInfo", "camp", Answer::text("Kara Tepe"));
    service
        .correct(&id, request(&service, &id, with_camp), &Precondition::Version(1), "admin@example.com")
        .await
        .unwrap();
    assert_eq!(service.current(&id).await.unwrap().version, 2);
}

#[tokio::test]
async fn test_correction_event_carries_audit_diff() {
    let service = service();
    let id = submitted(&service).await;
    let mut rx = service.events().subscribe();

    service
        .correct(
            &id,
            request(
                &service,
                &id,
                rename("Alexis").with("basicInfo", "region", Answer::text("lesvos")),
            ),
            &Precondition::parse(Some("1")),
            "admin@example.com",
        )
        .await
        .unwrap();

    let NotificationEvent::CorrectionCreated { form, diff, submission_uri, .. } = rx.recv().await.unwrap() else {
        panic!("expected correction event");
    };
    assert_eq!(submission_uri, service.endpoint().submission_uri(&id));
    assert_eq!(
        diff_to_text(&form, &diff),
        "- Basic information: Name\n  OLD: Alex\n  NEW: Alexis\n\n\
         - Basic information: Region\n  OLD: calais\n  NEW: lesvos\n"
    );
}

#[tokio::test]
async fn test_diff_compares_resolved_states() {
    let service = service();
    let id = submitted(&service).await;
    let mut rx = service.events().subscribe();

    service
        .correct(&id, request(&service, &id, rename("B")), &Precondition::Version(1), "admin@example.com")
        .await
        .unwrap();
    service
        .correct(&id, request(&service, &id, rename("C")), &Precondition::Version(2), "admin@example.com")
        .await
        .unwrap();

    let _ = rx.recv().await.unwrap();
    let NotificationEvent::CorrectionCreated { diff, .. } = rx.recv().await.unwrap() else {
        panic!("expected correction event");
    };
    assert_eq!(
        serde_json::to_value(&diff).unwrap(),
        json!({ "basicInfo": { "name": { "old": "B", "new": "C" } } })
    );

    let (_, overall) = service.submission_diff(&id).await.unwrap();
    assert_eq!(
        serde_json::to_value(&overall).unwrap(),
        json!({ "basicInfo": { "name": { "old": "Alex", "new": "C" } } })
    );
}

/// Correction store whose writes always fail
struct ReadOnlyCorrections(InMemoryStore<Correction>);

#[async_trait]
impl Store<Correction> for ReadOnlyCorrections {
    async fn persist(&self, _id: &str, _data: Correction) -> nas_common::Result<()> {
        Err(Error::Storage("disk full at /var/lib/nas".to_string()))
    }

    async fn get(&self, id: &str) -> nas_common::Result<Option<Record<Correction>>> {
        self.0.get(id).await
    }

    async fn find_all(&self, search: &SearchFields) -> nas_common::Result<Vec<Record<Correction>>> {
        self.0.find_all(search).await
    }
}

#[tokio::test]
async fn test_failed_persist_leaves_no_correction() {
    let service = AssessmentService::with_stores(
        Endpoint::new("https://example.com/").unwrap(),
        Arc::new(NoExpressions),
        EventBus::new(100),
        Arc::new(InMemoryStore::new("form")),
        Arc::new(InMemoryStore::new("submission")),
        Arc::new(ReadOnlyCorrections(InMemoryStore::new("correction"))),
    );
    let id = submitted(&service).await;
    let mut rx = service.events().subscribe();

    let err = service
        .correct(&id, request(&service, &id, rename("Sam")), &Precondition::Version(1), "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert!(!err.is_expected());
    let message = err.public_message();
    assert!(message.starts_with("Internal failure (ref "));
    assert!(!message.contains("/var/lib/nas"));

    let current = service.current(&id).await.unwrap();
    assert_eq!(current.version, 1);
    assert_eq!(current.response.answer("basicInfo", "name"), Some(&Answer::text("Alex")));
    assert!(rx.try_recv().is_err());

    // A retry must reach the store again rather than wait on the lock
    let retry = tokio::time::timeout(
        Duration::from_secs(5),
        service.correct(&id, request(&service, &id, rename("Sam")), &Precondition::Version(1), "admin"),
    )
    .await
    .expect("correction lock still held after failed persist");
    assert!(matches!(retry, Err(Error::Storage(_))));
}
