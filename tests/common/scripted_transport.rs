//! Push transport that plays back a script of open outcomes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc;

use realtime_sync::stream::FrameStream;
use realtime_sync::{EventTransport, TransportError};

pub type FrameSender = mpsc::UnboundedSender<Result<String, TransportError>>;

pub enum Outcome {
    /// Open succeeds; frames come from the paired sender.
    Open(mpsc::UnboundedReceiver<Result<String, TransportError>>),
    /// Open fails with the given error.
    Refuse(TransportError),
}

impl Outcome {
    pub fn stream() -> (FrameSender, Outcome) {
        let (tx, rx) = mpsc::unbounded();
        (tx, Outcome::Open(rx))
    }
}

/// Once the script is exhausted every open is refused.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            urls: Mutex::default(),
        })
    }

    /// Queue another outcome behind the current script.
    pub fn push(&self, outcome: Outcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// URLs of every open attempt, in order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&self, url: &str) -> Result<FrameStream, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Outcome::Open(frames)) => {
                let frames: FrameStream = Box::pin(frames);
                Ok(frames)
            }
            Some(Outcome::Refuse(err)) => Err(err),
            None => Err(TransportError::Connection("connection refused".into())),
        }
    }
}
