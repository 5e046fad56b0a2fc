use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt; // for `oneshot`

use restock_core::{paths::report_path, paths::store_path, StoreId, StoreInfo};
use restock_docstore::{fields::store_info_fields, MemoryDocumentStore, ReportDocument};
use restock_renderer::Renderer;
use restock_web::{router, AppState};

async fn app() -> (Router, Arc<MemoryDocumentStore>) {
    let docs = Arc::new(MemoryDocumentStore::new());
    docs.insert(
        &store_path(&StoreId::from("11007")).unwrap(),
        store_info_fields(&StoreInfo {
            name: "Book <Cafe>".into(),
            address: String::new(),
        }),
    )
    .await;
    let state = AppState::new(docs.clone(), Renderer::new().unwrap());
    (router(state), docs)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_report(store: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/report")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("store={store}")))
        .unwrap()
}

#[tokio::test]
async fn known_store_shows_details_and_report_button() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/?store=11007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Book &lt;Cafe&gt;"));
    assert!(html.contains("未設定"), "blank address is shown as unset");
    assert!(html.contains(r#"name="store" value="11007""#));
    assert!(html.contains("最後の1冊を報告する"));
}

#[tokio::test]
async fn missing_store_param_offers_manual_entry() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"id="error-message""#));
    assert!(html.contains("店舗IDが指定されていません"));
    assert!(html.contains(r#"id="manual-input""#));
}

#[tokio::test]
async fn unknown_store_is_not_found_with_prefilled_entry() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/?store=33999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let html = body_text(response).await;
    assert!(html.contains("店舗ID: 33999 の情報が見つかりません"));
    assert!(html.contains(r#"value="33999""#));
}

#[tokio::test]
async fn lookup_failure_renders_inline_error() {
    let (app, docs) = app().await;
    docs.fail_with_transient("stores").await;
    let response = app.oneshot(get("/?store=11007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response)
        .await
        .contains("店舗情報の取得中にエラーが発生しました。"));
}

#[tokio::test]
async fn posting_a_report_records_it_and_thanks() {
    let (app, docs) = app().await;
    let response = app.oneshot(post_report("11007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("ご報告ありがとうございました"));

    let path = report_path(&StoreId::from("11007")).unwrap();
    let snapshot = docs.snapshot().await;
    let report = ReportDocument::from_fields(&path, &snapshot[&path.to_string()]).unwrap();
    assert_eq!(report.store_id, StoreId::from("11007"));
}

#[tokio::test]
async fn blank_report_is_rejected_without_writing() {
    let (app, docs) = app().await;
    let response = app.oneshot(post_report("")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("有効な店舗IDを入力してください。"));
    assert_eq!(docs.snapshot().await.len(), 1);
}

#[tokio::test]
async fn failed_report_write_renders_inline_error() {
    let (app, docs) = app().await;
    docs.fail_with_transient("restock-reports").await;
    let response = app.oneshot(post_report("11007")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let html = body_text(response).await;
    assert!(html.contains("報告の送信中にエラーが発生しました"));
    assert!(html.contains(r#"id="manual-input""#));
}

#[tokio::test]
async fn malformed_store_query_is_rejected_without_a_read() {
    for uri in ["/?store=..%2Fstores%2F11007", "/?store=a%2Fb", "/?store=1100x"] {
        let (app, docs) = app().await;
        let response = app.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let html = body_text(response).await;
        assert!(html.contains("有効な店舗IDを入力してください。"));
        assert!(!html.contains("stores/11007"));
        assert_eq!(docs.reads(), 0);
    }
}

#[tokio::test]
async fn traversal_in_report_form_leaves_store_document_intact() {
    let (app, docs) = app().await;
    let before = docs.snapshot().await;

    let response = app
        .oneshot(post_report("..%2Fstores%2F11007"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("有効な店舗IDを入力してください。"));
    assert_eq!(docs.snapshot().await, before);
}
