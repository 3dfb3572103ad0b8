//! Scripted provider for agent tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use filechat_core::error::ProviderError;
use filechat_core::message::Message;
use filechat_core::provider::{
    Provider, ProviderRequest, ProviderResponse, StreamChunk, StreamReceiver, Usage,
};
use tokio::sync::mpsc;

/// One scripted reply per call, in order. Records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    chunks: Option<(Vec<String>, Option<ProviderError>)>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            chunks: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn streaming(chunks: Vec<&str>) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.chunks = Some((chunks.into_iter().map(String::from).collect(), None));
        provider
    }

    pub fn streaming_then_error(chunks: Vec<&str>, error: ProviderError) -> Self {
        let mut provider = Self::streaming(chunks);
        if let Some((_, tail)) = provider.chunks.as_mut() {
            *tail = Some(error);
        }
        provider
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("(no more scripted replies)".into()))?;
        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<StreamReceiver, ProviderError> {
        let Some((chunks, tail)) = self.chunks.clone() else {
            let response = self.complete(request).await?;
            let (tx, rx) = mpsc::channel(2);
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(response.message.text()),
                    done: true,
                    usage: response.usage,
                }))
                .await;
            return Ok(rx);
        };

        self.requests.lock().unwrap().push(request);
        let (tx, rx) = mpsc::channel(chunks.len() + 2);
        for content in chunks {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(content),
                    done: false,
                    usage: None,
                }))
                .await;
        }
        let last = match tail {
            Some(error) => Err(error),
            None => Ok(StreamChunk {
                content: None,
                done: true,
                usage: None,
            }),
        };
        let _ = tx.send(last).await;
        Ok(rx)
    }
}
