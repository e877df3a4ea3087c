use futures::{stream, StreamExt};
use gloo_net::http::Request;
use js_sys::{Reflect, Uint8Array};
use shared::{ChatRequest, ChatTransport, ChunkStream, Message, TransportError, Utf8Decoder};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

/// Posts the history with `fetch` and reads the reply body as it arrives.
pub struct FetchTransport {
    url: String,
}

impl FetchTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait(?Send)]
impl ChatTransport for FetchTransport {
    async fn send(&self, messages: &[Message]) -> Result<ChunkStream, TransportError> {
        let body = ChatRequest {
            messages: messages.to_vec(),
        };

        let response = Request::post(&self.url)
            .json(&body)
            .map_err(|err| TransportError::Encode(err.to_string()))?
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        if !response.ok() {
            return Err(TransportError::from_status(response.status()));
        }

        let body = response.body().ok_or(TransportError::NoBody)?;
        let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();

        Ok(read_chunks(reader))
    }
}

fn field(object: &JsValue, name: &str) -> JsValue {
    Reflect::get(object, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
}

fn read_chunks(reader: ReadableStreamDefaultReader) -> ChunkStream {
    stream::unfold(
        Some((reader, Utf8Decoder::new())),
        |state| async move {
            let (reader, mut decoder) = state?;

            match JsFuture::from(reader.read()).await {
                Err(err) => Some((Err(TransportError::Network(format!("{err:?}"))), None)),
                Ok(result) => {
                    if field(&result, "done").as_bool().unwrap_or(true) {
                        return Some((Ok(decoder.finish()), None));
                    }

                    let bytes = Uint8Array::new(&field(&result, "value")).to_vec();
                    let text = decoder.push(&bytes);
                    Some((Ok(text), Some((reader, decoder))))
                }
            }
        },
    )
    .boxed_local()
}
