//! Outgoing email.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use scrapjobs_common::config::EmailSettings;
use scrapjobs_common::{AppError, AppResult};

use crate::models::{Job, ResumeAnalysis};

/// Sends analysis results to users.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send the analysis of `job` to `address`.
    async fn send_analysis_email(
        &self,
        address: &str,
        job: &Job,
        analysis: &ResumeAnalysis,
    ) -> AppResult<()>;
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
}

/// SMTP mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from settings.
    ///
    /// With credentials the relay is reached over STARTTLS; without them the
    /// connection is plain, for local relays.
    pub fn from_settings(settings: &EmailSettings) -> AppResult<Self> {
        let address = settings
            .from_address
            .parse()
            .map_err(|e| AppError::Config(format!("invalid email.from_address: {e}")))?;
        let from = Mailbox::new(Some(settings.from_name.clone()), address);

        let transport = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
                    .map_err(|e| AppError::Config(format!("invalid SMTP relay: {e}")))?
                    .port(settings.smtp_port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
                .port(settings.smtp_port)
                .build(),
        };

        Ok(Self { transport, from })
    }

    /// Send an email.
    pub async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::Validation(format!("invalid recipient {}: {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body,
                message.html_body,
            ))
            .map_err(|e| AppError::Internal(format!("failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP send failed: {e}")))?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_analysis_email(
        &self,
        address: &str,
        job: &Job,
        analysis: &ResumeAnalysis,
    ) -> AppResult<()> {
        self.send(render_analysis_email(address, job, analysis)).await
    }
}

/// Escape text for interpolation into HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap HTML content in a basic email layout.
#[must_use]
pub fn wrap_html(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        a {{ color: #007bff; }}
        blockquote {{ margin: 10px 0; padding: 10px 20px; border-left: 4px solid #e9ecef; background: #f8f9fa; }}
        pre {{ white-space: pre-wrap; background: #f8f9fa; padding: 10px; }}
    </style>
</head>
<body>
    {content}
    <hr style="margin-top: 40px; border: none; border-top: 1px solid #e9ecef;">
    <p style="font-size: 12px; color: #6c757d;">
        You receive this email because you subscribed to job alerts for this site.
    </p>
</body>
</html>"#
    )
}

/// Render the analysis email for a job.
#[must_use]
pub fn render_analysis_email(address: &str, job: &Job, analysis: &ResumeAnalysis) -> EmailMessage {
    let m = &analysis.match_analysis;
    let subject = format!("New match: {}", job.title);

    let mut text = format!(
        "{title} at {company} ({location})\n{link}\n\nScore: {score:.0}/100 ({quality})\n{summary}\n",
        title = job.title,
        company = job.company,
        location = job.location,
        link = job.link,
        score = m.overall_score_numeric,
        quality = m.overall_score_qualitative,
        summary = m.summary,
    );
    let mut html = format!(
        "<h2><a href=\"{link}\">{title}</a></h2>\
         <p>{company} &middot; {location}</p>\
         <h3>Score: {score:.0}/100 ({quality})</h3><p>{summary}</p>",
        link = escape_html(&job.link),
        title = escape_html(&job.title),
        company = escape_html(&job.company),
        location = escape_html(&job.location),
        score = m.overall_score_numeric,
        quality = escape_html(&m.overall_score_qualitative),
        summary = escape_html(&m.summary),
    );

    if !analysis.strengths_for_this_job.is_empty() {
        text.push_str("\nStrengths:\n");
        html.push_str("<h3>Strengths</h3><ul>");
        for s in &analysis.strengths_for_this_job {
            text.push_str(&format!("- {}: {}\n", s.point, s.relevance_to_job));
            html.push_str(&format!(
                "<li><strong>{}</strong>: {}</li>",
                escape_html(&s.point),
                escape_html(&s.relevance_to_job)
            ));
        }
        html.push_str("</ul>");
    }

    if !analysis.gaps_and_improvement_areas.is_empty() {
        text.push_str("\nGaps:\n");
        html.push_str("<h3>Gaps</h3><ul>");
        for g in &analysis.gaps_and_improvement_areas {
            text.push_str(&format!("- {} ({})\n", g.area_description, g.job_requirement_impacted));
            html.push_str(&format!(
                "<li>{} <em>({})</em></li>",
                escape_html(&g.area_description),
                escape_html(&g.job_requirement_impacted)
            ));
        }
        html.push_str("</ul>");
    }

    if !analysis.actionable_resume_suggestions.is_empty() {
        text.push_str("\nSuggestions:\n");
        html.push_str("<h3>Suggestions</h3><ul>");
        for s in &analysis.actionable_resume_suggestions {
            text.push_str(&format!(
                "- [{}] {}\n  Example: {}\n  Why: {}\n",
                s.curriculum_section_to_apply, s.suggestion, s.example_wording, s.reasoning_for_this_job
            ));
            html.push_str(&format!(
                "<li><strong>{}</strong>: {}<blockquote>{}</blockquote><small>{}</small></li>",
                escape_html(&s.curriculum_section_to_apply),
                escape_html(&s.suggestion),
                escape_html(&s.example_wording),
                escape_html(&s.reasoning_for_this_job)
            ));
        }
        html.push_str("</ul>");
    }

    if !analysis.final_considerations.is_empty() {
        text.push_str(&format!("\n{}\n", analysis.final_considerations));
        html.push_str(&format!(
            "<h3>Final considerations</h3><p>{}</p>",
            escape_html(&analysis.final_considerations)
        ));
    }

    EmailMessage {
        to: address.to_string(),
        subject,
        text_body: text,
        html_body: wrap_html(&html),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{MatchAnalysis, Strength, Suggestion};
    use chrono::Utc;

    fn job() -> Job {
        Job {
            id: 1,
            site_id: 1,
            title: "Rust <Backend> Engineer".to_string(),
            location: "Remote".to_string(),
            company: "Acme & Co".to_string(),
            link: "https://jobs.example/1".to_string(),
            requisition_id: 1,
            description: None,
            last_seen_at: Utc::now(),
        }
    }

    fn analysis() -> ResumeAnalysis {
        ResumeAnalysis {
            match_analysis: MatchAnalysis {
                overall_score_numeric: 87.0,
                overall_score_qualitative: "Strong".to_string(),
                summary: "Solid systems background".to_string(),
            },
            strengths_for_this_job: vec![Strength {
                point: "Tokio".to_string(),
                relevance_to_job: "Async services".to_string(),
            }],
            actionable_resume_suggestions: vec![Suggestion {
                suggestion: "Quantify impact".to_string(),
                curriculum_section_to_apply: "Experience".to_string(),
                example_wording: "Cut p99 latency by 40%".to_string(),
                reasoning_for_this_job: "Performance focus".to_string(),
            }],
            ..ResumeAnalysis::default()
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_analysis_email() {
        let message = render_analysis_email("ada@example.com", &job(), &analysis());

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "New match: Rust <Backend> Engineer");
        assert!(message.text_body.contains("Score: 87/100 (Strong)"));
        assert!(message.text_body.contains("Example: Cut p99 latency by 40%"));
        assert!(message.html_body.contains("Rust &lt;Backend&gt; Engineer"));
        assert!(message.html_body.contains("Acme &amp; Co"));
        assert!(message.html_body.contains("https://jobs.example/1"));
        assert!(!message.html_body.contains("<h3>Gaps</h3>"));
    }

    #[test]
    fn test_mailer_rejects_invalid_sender() {
        let settings = EmailSettings {
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            username: None,
            password: None,
            from_address: "not an address".to_string(),
            from_name: "ScrapJobs".to_string(),
        };
        assert!(matches!(
            SmtpMailer::from_settings(&settings),
            Err(AppError::Config(_))
        ));
    }
}
