//! Resend-compatible HTTP send client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use rockstar_core::naming::{attachment_filename, resolve_recipient_name};

use crate::compose::{admin_email, user_email, Attachment, EmailMessage};
use crate::{Mailer, MailerError, NotifyRequest, SendReport, SentEmail};

/// Default API base when `RESEND_API_BASE` is not overridden.
pub const DEFAULT_API_BASE: &str = "https://api.resend.com";

/// HTTP client for the email provider's `POST /emails` endpoint.
pub struct ResendMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from_address: String,
    admin_address: String,
    app_url: Option<String>,
}

impl ResendMailer {
    pub fn new(
        base_url: String,
        api_key: String,
        from_address: String,
        admin_address: String,
        app_url: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from_address,
            admin_address,
            app_url,
        }
    }

    /// Download the generated image and wrap it as a base64 attachment.
    ///
    /// Any failure (network, non-2xx, body read) degrades to `None`; the
    /// caller falls back to embedding the link in the body.
    async fn fetch_attachment(&self, url: &str, filename: String) -> Option<Attachment> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, error = %e, "Image fetch for attachment failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url, status = %response.status(), "Image fetch returned non-2xx");
            return None;
        }
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url, error = %e, "Image body read failed");
                return None;
            }
        };

        Some(Attachment {
            filename,
            content: BASE64.encode(&bytes),
        })
    }

    /// Send one assembled message; returns the provider message id.
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, MailerError> {
        let mut payload = json!({
            "from": self.from_address,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });
        if let Some(attachment) = &message.attachment {
            payload["attachments"] = json!([{
                "filename": attachment.filename,
                "content": attachment.content,
            }]);
        }

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MailerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;
        Ok(data
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned))
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_run_ready(&self, request: &NotifyRequest) -> Result<SendReport, MailerError> {
        let name = resolve_recipient_name(
            request.user_name.as_deref(),
            request.name.as_deref(),
            request.surname.as_deref(),
        );

        let filename = attachment_filename(&name, &request.image_url);
        let attachment = self.fetch_attachment(&request.image_url, filename).await;
        let attached = attachment.is_some();

        let user = user_email(
            &name,
            &request.email,
            &request.image_url,
            request.scene.as_deref(),
            attachment.clone(),
            self.app_url.as_deref(),
        );
        let admin = admin_email(
            &name,
            &self.admin_address,
            &request.email,
            &request.image_url,
            request.scene.as_deref(),
            attachment,
        );

        let mut results = Vec::with_capacity(2);
        for message in [&user, &admin] {
            let id = self.send(message).await?;
            results.push(SentEmail {
                to: message.to.clone(),
                id,
            });
        }

        tracing::info!(
            to = %request.email,
            attached,
            "Run-ready notification sent (user + admin copy)"
        );

        Ok(SendReport { results, attached })
    }
}
