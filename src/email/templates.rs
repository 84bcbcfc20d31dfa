//! HTML bodies for transactional emails.
//!
//! Every interpolated value is HTML-escaped; usernames are user-controlled and
//! end up in the recipient's inbox.

use chrono::{Datelike, Utc};

pub const WELCOME_SUBJECT: &str = "Welcome to TruthLens AI! 🛡️";
pub const PASSWORD_RESET_SUBJECT: &str = "Reset Your Password - TruthLens AI";

const BASE_STYLE: &str = r#"
            body {
                font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
                background-color: #f4f4f5;
                margin: 0;
                padding: 0;
            }
            .container {
                max-width: 600px;
                margin: 40px auto;
                background-color: #ffffff;
                border-radius: 12px;
                overflow: hidden;
                box-shadow: 0 4px 6px rgba(0, 0, 0, 0.05);
            }
            .header {
                background-color: #18181b;
                padding: 30px;
                text-align: center;
                color: #ffffff;
            }
            .logo-icon {
                display: inline-flex;
                align-items: center;
                justify-content: center;
                width: 40px;
                height: 40px;
                background-color: #2563eb;
                border-radius: 8px;
                margin-bottom: 10px;
                color: white;
                font-size: 24px;
                font-weight: bold;
            }
            .brand-name {
                font-size: 24px;
                font-weight: 700;
                color: #ffffff;
                margin-top: 10px;
                display: block;
            }
            .content {
                padding: 40px;
                color: #3f3f46;
                line-height: 1.6;
            }
            .h1 {
                color: #18181b;
                font-size: 24px;
                font-weight: 600;
                margin-bottom: 20px;
                margin-top: 0;
            }
            .button {
                display: block;
                width: fit-content;
                min-width: 200px;
                margin: 30px auto;
                padding: 14px 28px;
                background-color: #2563eb;
                color: #ffffff !important;
                text-decoration: none;
                font-weight: 600;
                text-align: center;
                border-radius: 8px;
            }
            .footer {
                background-color: #f4f4f5;
                padding: 24px;
                text-align: center;
                color: #71717a;
                font-size: 14px;
                border-top: 1px solid #e4e4e7;
            }"#;

const RESET_STYLE: &str = r#"
            .note {
                font-size: 13px;
                color: #71717a;
                margin-top: 24px;
                text-align: center;
            }"#;

const WELCOME_STYLE: &str = r#"
            .features {
                display: grid;
                grid-template-columns: 1fr 1fr;
                gap: 20px;
                margin-top: 30px;
            }
            .feature-item {
                background-color: #f8fafc;
                padding: 15px;
                border-radius: 8px;
                font-size: 14px;
            }
            .feature-icon {
                font-size: 20px;
                margin-bottom: 8px;
                display: block;
            }"#;

/// Escapes text for use in HTML element content and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, extra_style: &str, content: &str) -> String {
    let year = Utc::now().year();
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="UTF-8">
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
        <title>{title}</title>
        <style>{BASE_STYLE}{extra_style}
        </style>
    </head>
    <body>
        <div class="container">
            <div class="header">
                <div class="logo-icon">🛡️</div>
                <span class="brand-name">TruthLens AI</span>
            </div>
            <div class="content">{content}
            </div>
            <div class="footer">
                <p>&copy; {year} TruthLens AI. All rights reserved.</p>
                <p>Secure. Accurate. Truthful.</p>
            </div>
        </div>
    </body>
</html>
"#
    )
}

/// Password reset email pointing at `reset_link`.
pub fn password_reset(reset_link: &str) -> String {
    let link = escape_html(reset_link);
    let content = format!(
        r#"
                <h1 class="h1">Reset Your Password</h1>
                <p>Hello,</p>
                <p>We received a request to reset the password for your TruthLens AI account. If you didn't make this request, you can safely ignore this email.</p>

                <a href="{link}" class="button">Reset Password</a>

                <p>This password reset link will expire in 15 minutes.</p>

                <div class="note">
                    <p>If the button doesn't work, copy and paste this link into your browser:</p>
                    <p style="word-break: break-all; color: #2563eb;">{link}</p>
                </div>"#
    );
    layout("Reset Your Password", RESET_STYLE, &content)
}

/// Welcome email for a freshly registered `username`.
pub fn welcome(username: &str, dashboard_url: &str) -> String {
    let username = escape_html(username);
    let dashboard_url = escape_html(dashboard_url);
    let content = format!(
        r#"
                <h1 class="h1">Welcome aboard, {username}!</h1>
                <p>We're thrilled to have you join TruthLens AI, your premier platform for deepfake detection and media verification.</p>

                <p>You now have access to our advanced analysis tools designed to help you separate truth from fabrication.</p>

                <div class="features">
                    <div class="feature-item">
                        <span class="feature-icon">🔍</span>
                        <strong>DeepFake Detection</strong><br>Analyze videos and images for manipulation.
                    </div>
                    <div class="feature-item">
                        <span class="feature-icon">📝</span>
                        <strong>Text Analysis</strong><br>Detect AI-generated text and fake news.
                    </div>
                </div>

                <a href="{dashboard_url}" class="button">Go to Dashboard</a>

                <p>Get started by uploading your first media file for analysis!</p>"#
    );
    layout("Welcome to TruthLens AI", WELCOME_STYLE, &content)
}
