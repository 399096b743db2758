//! Test doubles shared by the service tests
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::protocol::{ClientSink, ConnectionResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Binary(Bytes),
    Text(String),
    Close,
}

/// Client sink that records every frame it is asked to send
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
        self.notify.notify_waiters();
    }

    /// Wait until some recorded event matches, failing after ten seconds
    pub async fn wait_for(&self, predicate: impl Fn(&SinkEvent) -> bool) {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let notified = self.notify.notified();
                if self.events().iter().any(&predicate) {
                    return;
                }
                notified.await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out, recorded events: {:?}", self.events()));
    }

    /// Wait until the concatenated binary output contains `needle`
    pub async fn wait_for_output(&self, needle: &str) {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let notified = self.notify.notified();
                if self.output().contains(needle) {
                    return;
                }
                notified.await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}, output: {:?}", self.output()));
    }

    pub fn output(&self) -> String {
        let bytes: Vec<u8> = self
            .events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Binary(data) => Some(data.to_vec()),
                _ => None,
            })
            .flatten()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send_binary(&self, data: Bytes) -> ConnectionResult<()> {
        self.push(SinkEvent::Binary(data));
        Ok(())
    }

    async fn send_text(&self, message: String) -> ConnectionResult<()> {
        self.push(SinkEvent::Text(message));
        Ok(())
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.push(SinkEvent::Close);
        Ok(())
    }
}
