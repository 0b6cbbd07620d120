//! Transactional email for customers.
//!
//! Uses SMTP via lettre with Askama HTML and plain-text templates. Without
//! SMTP configuration the service is disabled: sends are skipped and
//! logged at INFO so order updates never fail on mail.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use sapa_core::{Locale, OrderStatus};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::views::status_label;

/// HTML template for the order status email.
#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusEmailHtml<'a> {
    email: &'a OrderStatusEmail<'a>,
    status: &'a str,
    is_vi: bool,
}

/// Plain text template for the order status email.
#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusEmailText<'a> {
    email: &'a OrderStatusEmail<'a>,
    status: &'a str,
    is_vi: bool,
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    store_name: &'a str,
    shop_url: &'a str,
    is_vi: bool,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    store_name: &'a str,
    shop_url: &'a str,
    is_vi: bool,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// What a customer is told when their order changes status.
#[derive(Debug, Clone)]
pub struct OrderStatusEmail<'a> {
    pub to: &'a str,
    pub customer_name: &'a str,
    pub order_number: &'a str,
    pub status: OrderStatus,
    /// Formatted order total.
    pub total: &'a str,
    /// Operator note, shown when present.
    pub note: Option<&'a str>,
    pub store_name: &'a str,
}

/// A rendered message, before addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OrderStatusEmail<'_> {
    /// Subject and bodies in `locale`.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    pub fn render(&self, locale: Locale) -> Result<RenderedEmail, EmailError> {
        let status = status_label(self.status, locale);
        let is_vi = locale == Locale::Vi;
        let subject = if is_vi {
            format!("Đơn hàng #{}: {status}", self.order_number)
        } else {
            format!("Order #{} is now {status}", self.order_number)
        };
        Ok(RenderedEmail {
            subject,
            text: OrderStatusEmailText {
                email: self,
                status,
                is_vi,
            }
            .render()?,
            html: OrderStatusEmailHtml {
                email: self,
                status,
                is_vi,
            }
            .render()?,
        })
    }
}

/// Render the welcome email in `locale`.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn render_welcome(
    name: &str,
    store_name: &str,
    shop_url: &str,
    locale: Locale,
) -> Result<RenderedEmail, EmailError> {
    let is_vi = locale == Locale::Vi;
    let subject = if is_vi {
        format!("Chào mừng bạn đến với {store_name}")
    } else {
        format!("Welcome to {store_name}")
    };
    Ok(RenderedEmail {
        subject,
        text: WelcomeEmailText {
            name,
            store_name,
            shop_url,
            is_vi,
        }
        .render()?,
        html: WelcomeEmailHtml {
            name,
            store_name,
            shop_url,
            is_vi,
        }
        .render()?,
    })
}

#[derive(Clone)]
struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<Mailer>,
    locale: Locale,
}

impl EmailService {
    /// Create the service; `None` configuration yields a disabled service.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be set up.
    pub fn new(config: Option<&EmailConfig>, locale: Locale) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            tracing::info!("SMTP not configured; customer emails are disabled");
            return Ok(Self::disabled(locale));
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Some(Mailer {
                transport,
                from_address: config.from_address.clone(),
            }),
            locale,
        })
    }

    /// A service that never sends.
    #[must_use]
    pub const fn disabled(locale: Locale) -> Self {
        Self {
            mailer: None,
            locale,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Tell a customer their order moved to a new status.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_status_update(
        &self,
        email: &OrderStatusEmail<'_>,
    ) -> Result<(), EmailError> {
        let rendered = email.render(self.locale)?;
        self.send_multipart_email(email.to, &rendered).await
    }

    /// Greet a new customer.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome(
        &self,
        to: &str,
        name: &str,
        store_name: &str,
        shop_url: &str,
    ) -> Result<(), EmailError> {
        let rendered = render_welcome(name, store_name, shop_url, self.locale)?;
        self.send_multipart_email(to, &rendered).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        rendered: &RenderedEmail,
    ) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %to, subject = %rendered.subject, "SMTP not configured; email skipped");
            return Ok(());
        };

        let email = Message::builder()
            .from(
                mailer
                    .from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(mailer.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(&rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.html.clone()),
                    ),
            )?;

        mailer.transport.send(email).await?;

        tracing::info!(to = %to, subject = %rendered.subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shipped<'a>(note: Option<&'a str>) -> OrderStatusEmail<'a> {
        OrderStatusEmail {
            to: "lan@sapa.vn",
            customer_name: "Nguyễn Lan",
            order_number: "SP-1001",
            status: OrderStatus::Shipped,
            total: "230.000 ₫",
            note,
            store_name: "Sapa Shop",
        }
    }

    #[test]
    fn test_order_status_email_in_vietnamese() {
        let rendered = shipped(Some("Mã vận đơn GHN123")).render(Locale::Vi).unwrap();
        assert_eq!(rendered.subject, "Đơn hàng #SP-1001: Đang giao");
        assert!(rendered.text.contains("Nguyễn Lan"));
        assert!(rendered.text.contains("Mã vận đơn GHN123"));
        assert!(rendered.html.contains("230.000 ₫"));
    }

    #[test]
    fn test_order_status_email_in_english_without_note() {
        let rendered = shipped(None).render(Locale::En).unwrap();
        assert_eq!(rendered.subject, "Order #SP-1001 is now Shipped");
        assert!(!rendered.text.contains("Note"));
    }

    #[test]
    fn test_html_body_escapes_customer_input() {
        let mut email = shipped(None);
        email.customer_name = "<b>Lan</b>";
        let rendered = email.render(Locale::En).unwrap();
        assert!(!rendered.html.contains("<b>Lan</b>"));
    }

    #[test]
    fn test_welcome_email() {
        let rendered = render_welcome("An", "Sapa Shop", "https://sapa.vn", Locale::En).unwrap();
        assert_eq!(rendered.subject, "Welcome to Sapa Shop");
        assert!(rendered.html.contains("https://sapa.vn"));
    }

    #[tokio::test]
    async fn test_disabled_service_skips_sending() {
        let service = EmailService::disabled(Locale::Vi);
        assert!(!service.is_enabled());
        service.send_order_status_update(&shipped(None)).await.unwrap();
        service
            .send_welcome("an@sapa.vn", "An", "Sapa Shop", "https://sapa.vn")
            .await
            .unwrap();
    }
}
