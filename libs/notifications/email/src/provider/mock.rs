//! Recording provider for tests and dry runs

use super::EmailProvider;
use crate::error::{EmailError, EmailResult};
use crate::models::ProviderMessage;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Provider that captures messages instead of delivering them
#[derive(Clone, Default)]
pub struct MockProvider {
    sent: Arc<Mutex<Vec<ProviderMessage>>>,
    failure_message: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider that always fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failure_message: Some(message.into()),
        }
    }

    /// Get all captured messages
    pub async fn sent_messages(&self) -> Vec<ProviderMessage> {
        self.sent.lock().await.clone()
    }

    /// Get the count of captured messages
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Check if a message was addressed to a specific recipient
    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent
            .lock()
            .await
            .iter()
            .any(|m| m.destination.to_addresses.iter().any(|a| a == address))
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    async fn send_email(&self, message: &ProviderMessage) -> EmailResult<bool> {
        if let Some(failure) = &self.failure_message {
            return Err(EmailError::Delivery(failure.clone()));
        }

        self.sent.lock().await.push(message.clone());
        Ok(true)
    }

    async fn health_check(&self) -> EmailResult<()> {
        match &self.failure_message {
            Some(_) => Err(EmailError::Delivery("Mock health check failed".to_string())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
