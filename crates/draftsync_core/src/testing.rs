//! Fakes shared by unit tests.

use std::sync::{Arc, Mutex};

use crate::credentials::StaticCredentials;
use crate::editor::MemoryEditor;
use crate::events::SyncEvent;
use crate::future::BoxFuture;
use crate::orchestrator::SyncOrchestrator;
use crate::remote::{ConditionalClient, RawResponse, RemoteRequest, RemoteTransport};
use crate::store::MemoryItemStore;

pub(crate) const KEY: &str = "doc";
pub(crate) const URL: &str = "https://pod.example/notes/doc";

/// A request the fake transport received.
#[derive(Debug, Clone)]
pub(crate) struct Seen {
    pub method: &'static str,
    pub request: RemoteRequest,
    pub body: Option<String>,
}

/// Replays canned responses in order; fails like a dropped connection once
/// the script runs out.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<Vec<RawResponse>>,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<RawResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn reply(
        &self,
        method: &'static str,
        request: &RemoteRequest,
        body: Option<&str>,
    ) -> Result<RawResponse, String> {
        self.seen.lock().unwrap().push(Seen {
            method,
            request: request.clone(),
            body: body.map(str::to_string),
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err("connection reset".to_string());
        }
        Ok(responses.remove(0))
    }
}

impl RemoteTransport for ScriptedTransport {
    fn get<'a>(&'a self, request: &'a RemoteRequest) -> BoxFuture<'a, Result<RawResponse, String>> {
        Box::pin(async move { self.reply("GET", request, None) })
    }

    fn put<'a>(
        &'a self,
        request: &'a RemoteRequest,
        body: &'a str,
        _media_type: &'a str,
    ) -> BoxFuture<'a, Result<RawResponse, String>> {
        Box::pin(async move { self.reply("PUT", request, Some(body)) })
    }
}

/// An orchestrator over in-memory fakes, with `KEY` registered at `URL`.
pub(crate) struct Harness {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub editor: Arc<MemoryEditor>,
    pub transport: Arc<ScriptedTransport>,
    pub store: MemoryItemStore,
    pub events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl Harness {
    pub fn new(responses: Vec<RawResponse>) -> Self {
        let editor = Arc::new(MemoryEditor::new());
        let transport = ScriptedTransport::new(responses);
        let store = MemoryItemStore::new();
        let client = ConditionalClient::new(
            transport.clone(),
            Arc::new(StaticCredentials::bearer("token")),
        );
        let orchestrator =
            SyncOrchestrator::new(editor.clone(), Arc::new(store.clone()), client);
        orchestrator.register(KEY, URL);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        orchestrator.events().subscribe(Arc::new(move |event: &SyncEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        Self {
            orchestrator: Arc::new(orchestrator),
            editor,
            transport,
            store,
            events,
        }
    }

    pub fn count_events(&self, matches: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(e)).count()
    }
}
