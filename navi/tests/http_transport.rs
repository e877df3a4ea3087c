use axum::routing::post;
use axum::Router;
use futures::StreamExt;
use navi::client::HttpTransport;
use shared::{ChatTransport, Message};
use tokio::net::TcpListener;

async fn serve(body: &'static [u8]) -> HttpTransport {
    let app = Router::new().route("/api/chat", post(move || async move { body }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    HttpTransport::new(format!("http://{addr}/api/chat")).unwrap()
}

async fn collect(transport: &HttpTransport) -> String {
    let chunks = transport.send(&[Message::user("hi")]).await.unwrap();
    chunks.map(|chunk| chunk.unwrap()).collect::<Vec<_>>().await.concat()
}

#[tokio::test]
async fn multibyte_text_survives_the_transport() {
    let transport = serve("こんにちは".as_bytes()).await;

    assert_eq!(collect(&transport).await, "こんにちは");
}

#[tokio::test]
async fn truncated_trailing_sequence_is_flushed_at_end_of_body() {
    // "ok" followed by the first two bytes of "あ".
    let transport = serve(b"ok\xE3\x81").await;

    assert_eq!(collect(&transport).await, "ok\u{FFFD}");
}
