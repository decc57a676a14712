mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rxscan::config::NerConfig;
use rxscan::error::RxError;
use rxscan::intelligence::{EntityExtractor, MedicineExtractor, NerApiClient, NerEntity};
use rxscan::models::{FormattedText, Strategy};

use common::{ner_config, NER_PATH};

fn text(lines: &[&str]) -> FormattedText {
    lines.iter().copied().collect()
}

async fn names(extractor: &EntityExtractor, input: &FormattedText) -> Vec<String> {
    extractor
        .extract(input)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect()
}

#[tokio::test]
async fn test_word_pieces_are_merged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(NER_PATH))
        .and(header("Authorization", "Bearer hf_test"))
        .and(body_json(json!({ "inputs": "Par acetamol 500 mg" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_group": "ORG", "score": 0.91, "word": "Par", "start": 0, "end": 3 },
            { "entity_group": "ORG", "score": 0.88, "word": "##acetamol", "start": 4, "end": 12 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = EntityExtractor::new(&ner_config(&server.uri()));
    let found = names(&extractor, &text(&["Par acetamol 500 mg"])).await;

    assert_eq!(found, vec!["Paracetamol"]);
}

#[tokio::test]
async fn test_request_sends_newline_joined_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(NER_PATH))
        .and(body_json(json!({ "inputs": "Dr. Mehta\nCrocin Advance 650 mg" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = EntityExtractor::new(&ner_config(&server.uri()));
    let found = names(&extractor, &text(&["Dr. Mehta", "Crocin Advance 650 mg"])).await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_groups_filtered_and_deduplicated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(NER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_group": "PER", "word": "Mehta" },
            { "entity_group": "LOC", "word": "Pune" },
            { "entity_group": "MISC", "word": "Crocin" },
            { "entity_group": "ORG", "word": "Azi" },
            { "entity_group": "ORG", "word": "##thral" },
            { "entity_group": "MISC", "word": "crocin" }
        ])))
        .mount(&server)
        .await;

    let extractor = EntityExtractor::new(&ner_config(&server.uri()));
    let candidates = extractor
        .extract(&text(&["Dr. Mehta, Pune", "Crocin", "Azithral"]))
        .await
        .unwrap();

    let found: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(found, vec!["Mehta", "Crocin", "Azithral"]);
    assert!(candidates.iter().all(|c| c.source == Strategy::Entity));
}

#[tokio::test]
async fn test_non_200_is_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(NER_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Model dslim/bert-base-NER is currently loading",
            "estimated_time": 20.0
        })))
        .mount(&server)
        .await;

    let extractor = EntityExtractor::new(&ner_config(&server.uri()));
    let err = extractor.extract(&text(&["Crocin"])).await.unwrap_err();

    match &err {
        RxError::Service { status, message } => {
            assert_eq!(*status, Some(503));
            assert!(message.contains("currently loading"), "{message}");
        }
        other => panic!("expected service error, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid token" })))
        .mount(&server)
        .await;

    let extractor = EntityExtractor::new(&ner_config(&server.uri()));
    let err = extractor.extract(&text(&["Crocin"])).await.unwrap_err();
    assert!(matches!(err, RxError::Service { status: Some(401), .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_error_object_with_200_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "oops" })))
        .mount(&server)
        .await;

    let client = NerApiClient::new(&ner_config(&server.uri())).unwrap();
    let err = client.recognize("Crocin").await.unwrap_err();
    assert!(err.to_string().contains("Malformed entity recognition response"), "{err}");
}

#[tokio::test]
async fn test_client_returns_typed_entities() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "entity_group": "ORG", "word": "Dolo", "score": 0.7 }
        ])))
        .mount(&server)
        .await;

    let client = NerApiClient::new(&ner_config(&server.uri())).unwrap();
    let entities = client.recognize("Dolo 650").await.unwrap();
    assert_eq!(entities, vec![NerEntity::new("ORG", "Dolo")]);
}

#[tokio::test]
async fn test_empty_text_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let extractor = EntityExtractor::new(&ner_config(&server.uri()));
    let found = extractor.extract(&FormattedText::default()).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_without_token_is_unavailable() {
    let config = NerConfig {
        api_token: None,
        ..NerConfig::default()
    };
    let extractor = EntityExtractor::new(&config);

    assert!(!extractor.is_available());
    let err = extractor.extract(&text(&["Crocin"])).await.unwrap_err();
    assert!(matches!(err, RxError::ServiceUnavailable(_)));
}
