use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::api::{ApiError, NewNote, Note, NotesApi, NotesPage};
use crate::query::FetchTicket;

/// Side effect requested by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List(FetchTicket),
    /// `submission` ties the result back to the form that sent it.
    Create { submission: u64, payload: NewNote },
    Delete(i64),
}

#[derive(Debug)]
pub enum Response {
    Listed {
        ticket: FetchTicket,
        result: Result<NotesPage, ApiError>,
    },
    Created {
        submission: u64,
        result: Result<Note, ApiError>,
    },
    Deleted {
        note_id: i64,
        result: Result<(), ApiError>,
    },
}

impl Response {
    /// The response for a request that failed before reaching the service.
    pub fn failed(request: Request, err: ApiError) -> Self {
        match request {
            Request::List(ticket) => Response::Listed {
                ticket,
                result: Err(err),
            },
            Request::Create { submission, .. } => Response::Created {
                submission,
                result: Err(err),
            },
            Request::Delete(note_id) => Response::Deleted {
                note_id,
                result: Err(err),
            },
        }
    }
}

pub fn execute(api: &dyn NotesApi, request: Request) -> Response {
    match request {
        Request::List(ticket) => {
            let result = api.list(&ticket.key.list_params());
            Response::Listed { ticket, result }
        }
        Request::Create {
            submission,
            payload,
        } => Response::Created {
            submission,
            result: api.create(&payload),
        },
        Request::Delete(note_id) => Response::Deleted {
            note_id,
            result: api.delete(note_id),
        },
    }
}

/// Runs blocking API calls off the event-loop thread. Each request gets its
/// own short-lived thread; responses come back in completion order, which
/// is why listing results carry their [`FetchTicket`].
pub struct ApiWorker {
    api: Arc<dyn NotesApi>,
    tx: Sender<Response>,
    rx: Receiver<Response>,
}

impl ApiWorker {
    pub fn new(api: Arc<dyn NotesApi>) -> Self {
        let (tx, rx) = unbounded();
        Self { api, tx, rx }
    }

    pub fn dispatch(&self, request: Request) {
        let name = match &request {
            Request::List(_) => "notes-list",
            Request::Create { .. } => "notes-create",
            Request::Delete(_) => "notes-delete",
        };
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let job = request.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let response = execute(api.as_ref(), job);
                if tx.send(response).is_err() {
                    tracing::debug!("response dropped, event loop already gone");
                }
            });
        if let Err(err) = spawned {
            tracing::error!(?err, "failed to spawn api worker thread");
            self.report_failure(request, ApiError::Dispatch(err.to_string()));
        }
    }

    /// Queues a failure so the coordinator unwinds in-flight bookkeeping for
    /// a request that never ran.
    fn report_failure(&self, request: Request, err: ApiError) {
        let _ = self.tx.send(Response::failed(request, err));
    }

    pub fn dispatch_all(&self, requests: impl IntoIterator<Item = Request>) {
        for request in requests {
            self.dispatch(request);
        }
    }

    pub fn drain(&self) -> Vec<Response> {
        self.rx.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Response> {
        match self.rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
