use idea4gift::gift::GiftOffer;
use idea4gift::store::{GiftSearchRecord, GiftSearchStore, HttpRecordStore, LogStore, StoreError};
use idea4gift::{Gender, Language, Profile};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record() -> GiftSearchRecord {
    let mut profile = Profile {
        recipient_name: "Anna".to_string(),
        age: "25".to_string(),
        gender: Some(Gender::Female),
        ..Profile::default()
    };
    profile.add_interest("Books");
    profile.add_photos(vec!["/uploads/shelf.png".to_string()]);

    let offer: GiftOffer = serde_json::from_value(json!({
        "name": "E-reader",
        "category": "books",
        "price_range": "9 000 ₽"
    }))
    .unwrap();
    GiftSearchRecord::new(&profile, Language::English, vec![offer])
}

#[tokio::test]
async fn test_http_store_posts_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/entities/GiftSearch"))
        .and(body_partial_json(json!({
            "recipient_name": "Anna",
            "age": 25,
            "gender": "female",
            "interests": ["Books"],
            "budget_min": 2000,
            "budget_max": 10000,
            "photo_urls": ["/uploads/shelf.png"],
            "generated_gifts": [{ "name": "E-reader", "category": "books" }]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpRecordStore::new(format!("{}/entities/GiftSearch", server.uri()));
    store.save(&record()).await.unwrap();
}

#[tokio::test]
async fn test_http_store_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = HttpRecordStore::new(server.uri());
    let err = store.save(&record()).await.unwrap_err();

    assert!(matches!(err, StoreError::Status { .. }));
}

#[tokio::test]
async fn test_log_store_always_succeeds() {
    LogStore.save(&record()).await.unwrap();
}
