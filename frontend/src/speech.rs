use js_sys::{Array, Function, Reflect};
use shared::speech::{CaptureConfig, CaptureError, CaptureHandle, CaptureProvider, TranscriptSegment};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{SpeechRecognition, SpeechRecognitionEvent};
use yew::Callback;

/// What the recognizer reports back to the owning view.
pub enum SpeechEvent {
    Results(Vec<TranscriptSegment>),
    Error(String),
    End,
}

/// The browser's Web Speech recognizer, when it has one.
pub struct WebSpeech {
    constructor: Function,
    on_event: Callback<SpeechEvent>,
}

impl WebSpeech {
    /// Finds the recognizer constructor, prefixed or not.
    pub fn probe(on_event: Callback<SpeechEvent>) -> Option<Self> {
        let window = web_sys::window()?;

        ["SpeechRecognition", "webkitSpeechRecognition"]
            .into_iter()
            .filter_map(|name| Reflect::get(&window, &JsValue::from_str(name)).ok())
            .find_map(|value| value.dyn_into::<Function>().ok())
            .map(|constructor| Self {
                constructor,
                on_event,
            })
    }
}

pub struct WebSpeechHandle {
    recognition: SpeechRecognition,
    _on_result: Closure<dyn FnMut(SpeechRecognitionEvent)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
    _on_end: Closure<dyn FnMut()>,
}

impl CaptureHandle for WebSpeechHandle {
    fn stop(&mut self) {
        self.recognition.stop();
    }

    fn abort(&mut self) {
        self.recognition.abort();
    }
}

impl Drop for WebSpeechHandle {
    fn drop(&mut self) {
        // Detach before the closures are freed.
        self.recognition.set_onresult(None);
        self.recognition.set_onerror(None);
        self.recognition.set_onend(None);
    }
}

fn segments(event: &SpeechRecognitionEvent) -> Vec<TranscriptSegment> {
    let Some(results) = event.results() else {
        return vec![];
    };

    (event.result_index()..results.length())
        .filter_map(|index| results.get(index))
        .filter_map(|result| {
            let alternative = result.get(0)?;
            Some(TranscriptSegment {
                text: alternative.transcript(),
                is_final: result.is_final(),
            })
        })
        .collect()
}

impl CaptureProvider for WebSpeech {
    type Handle = WebSpeechHandle;

    fn open(&self, config: &CaptureConfig) -> Result<WebSpeechHandle, CaptureError> {
        let recognition: SpeechRecognition = Reflect::construct(&self.constructor, &Array::new())
            .map_err(|err| CaptureError::Platform(format!("{err:?}")))?
            .unchecked_into();

        recognition
            .set_continuous(config.continuous)
            .map_err(|err| CaptureError::Platform(format!("{err:?}")))?;
        recognition.set_interim_results(config.interim_results);
        recognition.set_lang(&config.locale);

        let on_event = self.on_event.clone();
        let on_result = Closure::<dyn FnMut(SpeechRecognitionEvent)>::new(move |event| {
            on_event.emit(SpeechEvent::Results(segments(&event)));
        });

        let on_event = self.on_event.clone();
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let code = Reflect::get(&event, &JsValue::from_str("error"))
                .ok()
                .and_then(|code| code.as_string())
                .unwrap_or_default();
            on_event.emit(SpeechEvent::Error(code));
        });

        let on_event = self.on_event.clone();
        let on_end = Closure::<dyn FnMut()>::new(move || on_event.emit(SpeechEvent::End));

        recognition.set_onresult(Some(on_result.as_ref().unchecked_ref()));
        recognition.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        recognition.set_onend(Some(on_end.as_ref().unchecked_ref()));

        recognition
            .start()
            .map_err(|err| CaptureError::Platform(format!("{err:?}")))?;

        Ok(WebSpeechHandle {
            recognition,
            _on_result: on_result,
            _on_error: on_error,
            _on_end: on_end,
        })
    }
}
