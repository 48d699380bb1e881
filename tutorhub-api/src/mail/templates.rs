//! HTML email templates
//!
//! Templates are compiled into the binary and rendered by replacing
//! `{{Placeholder}}` markers with HTML-escaped values.

use super::EmailMessage;

const REGISTRATION_APPROVED: &str = include_str!("../../templates/registration_approved.html");
const REGISTRATION_REJECTED: &str = include_str!("../../templates/registration_rejected.html");
const TUTOR_REQUEST_RECEIVED: &str = include_str!("../../templates/tutor_request_received.html");
const TUTOR_REQUEST_ANSWERED: &str = include_str!("../../templates/tutor_request_answered.html");

/// Replace each `{{name}}` with its escaped value
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |body, (name, value)| {
        body.replace(&format!("{{{{{}}}}}", name), &escape_html(value))
    })
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Credentials for a newly approved tutor
pub fn registration_approved(to: &str, full_name: &str, password: &str, login_url: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your TutorHub tutor account is ready".to_string(),
        html_body: render(
            REGISTRATION_APPROVED,
            &[
                ("FullName", full_name),
                ("Email", to),
                ("Password", password),
                ("LoginUrl", login_url),
            ],
        ),
    }
}

pub fn registration_rejected(to: &str, full_name: &str, reason: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your TutorHub registration request".to_string(),
        html_body: render(
            REGISTRATION_REJECTED,
            &[("FullName", full_name), ("Reason", reason)],
        ),
    }
}

pub fn tutor_request_received(
    to: &str,
    tutor_name: &str,
    parent_name: &str,
    child_name: &str,
    description: &str,
    link: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("New tutoring request from {}", parent_name),
        html_body: render(
            TUTOR_REQUEST_RECEIVED,
            &[
                ("TutorName", tutor_name),
                ("ParentName", parent_name),
                ("ChildName", child_name),
                ("Description", description),
                ("Link", link),
            ],
        ),
    }
}

pub fn tutor_request_answered(
    to: &str,
    parent_name: &str,
    tutor_name: &str,
    child_name: &str,
    approved: bool,
    rejection_reason: Option<&str>,
    link: &str,
) -> EmailMessage {
    let (decision, details) = if approved {
        ("accepted", "The tutor will prepare a student profile and a weekly schedule for you to confirm.".to_string())
    } else {
        ("declined", format!("Reason: {}", rejection_reason.unwrap_or("-")))
    };

    EmailMessage {
        to: to.to_string(),
        subject: format!("{} has answered your tutoring request", tutor_name),
        html_body: render(
            TUTOR_REQUEST_ANSWERED,
            &[
                ("ParentName", parent_name),
                ("TutorName", tutor_name),
                ("ChildName", child_name),
                ("Decision", decision),
                ("Details", &details),
                ("Link", link),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render("{{A}} and {{A}} and {{B}}", &[("A", "x"), ("B", "y")]);
        assert_eq!(out, "x and x and y");
    }

    #[test]
    fn test_render_escapes_values() {
        let out = render("<p>{{Name}}</p>", &[("Name", "<script>&\"")]);
        assert_eq!(out, "<p>&lt;script&gt;&amp;&quot;</p>");
    }

    #[test]
    fn test_approved_email_has_credentials_and_no_leftover_markers() {
        let email = registration_approved("t@example.com", "Tam", "Secret#123", "http://localhost/login");
        assert_eq!(email.to, "t@example.com");
        assert!(email.html_body.contains("Secret#123"));
        assert!(email.html_body.contains("Tam"));
        assert!(!email.html_body.contains("{{"));
    }

    #[test]
    fn test_answered_email_mentions_reason_when_declined() {
        let email = tutor_request_answered(
            "p@example.com",
            "Parent",
            "Tutor",
            "Kid",
            false,
            Some("Schedule is full"),
            "http://localhost/requests",
        );
        assert!(email.html_body.contains("declined"));
        assert!(email.html_body.contains("Schedule is full"));
        assert!(!email.html_body.contains("{{"));
    }
}
