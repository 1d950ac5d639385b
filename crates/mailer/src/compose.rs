//! Pure email composition.
//!
//! Copy is the product's Spanish-language wording. Composition never does
//! IO, so the link-fallback behavior is testable without a provider.

use rockstar_core::naming::RecipientName;

/// An assembled message ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

/// A base64-encoded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// Base64-encoded file content.
    pub content: String,
}

/// The requester-facing notification.
///
/// When `attachment` is `None` the body embeds the download link instead;
/// the attachment is best-effort by design.
pub fn user_email(
    name: &RecipientName,
    to: &str,
    image_url: &str,
    scene: Option<&str>,
    attachment: Option<Attachment>,
    app_url: Option<&str>,
) -> EmailMessage {
    let scene_phrase = scene
        .map(|s| format!("tocando <strong>{s}</strong> "))
        .unwrap_or_default();

    let image_paragraph = if attachment.is_some() {
        "Adjuntamos tu imagen generada.".to_string()
    } else {
        format!(
            "Aquí puedes descargar tu imagen:<br><a href=\"{image_url}\" target=\"_blank\">{image_url}</a>"
        )
    };

    let footer_link = app_url
        .map(|url| format!("<br/><a href=\"{url}\">{url}</a>"))
        .unwrap_or_default();

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 640px; margin: 0 auto;\">\
         <h1 style=\"color:#e63946;text-align:center;\">¡Bienvenido a School of Rock!</h1>\
         <p style=\"font-size:16px;\">Hola {display},</p>\
         <p style=\"font-size:16px;\">Tu transformación como estrella de rock {scene_phrase}está completa.</p>\
         <p style=\"font-size:16px;\">{image_paragraph}</p>\
         <p style=\"font-size:14px;color:#666;margin-top:30px;\">Saludos,<br/>Sexto Básico - Coyancura{footer_link}</p>\
         </div>",
        display = name.display,
    );

    EmailMessage {
        to: to.to_string(),
        subject: format!("¡Tu foto como Rockstar está lista, {}!", name.first),
        html,
        attachment,
    }
}

/// The admin copy: recipient, link, and scene for the record.
pub fn admin_email(
    name: &RecipientName,
    admin_address: &str,
    requester_email: &str,
    image_url: &str,
    scene: Option<&str>,
    attachment: Option<Attachment>,
) -> EmailMessage {
    let scene_suffix = scene.map(|s| format!(" ({s})")).unwrap_or_default();

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 640px; margin: 0 auto;\">\
         <p>Se generó una imagen para <b>{display}</b> ({requester_email}).</p>\
         <p>Link de la imagen: <a href=\"{image_url}\" target=\"_blank\">{image_url}</a></p>\
         <p>Escena: {scene}</p>\
         </div>",
        display = name.display,
        scene = scene.unwrap_or("N/D"),
    );

    EmailMessage {
        to: admin_address.to_string(),
        subject: format!(
            "Copia admin – Imagen generada: {}{scene_suffix}",
            name.display
        ),
        html,
        attachment,
    }
}
