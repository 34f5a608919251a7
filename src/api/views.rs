//! Minimal HTML pages served by the portal itself.
//!
//! Dashboard content is produced by the embedded dashboard applications; these
//! pages only cover the portal shell, the login form and error pages.

use super::handlers::{
    auth::{flash::Flash, login_location},
    pages::DashboardApp,
};

const NAV: [(&str, &str); 5] = [
    ("Portal Home", "/"),
    ("Dash Dashboard", "/dash-dashboard"),
    ("Taipy Dashboard", "/taipy-dashboard"),
    ("About", "/about"),
    ("Logout", "/logout"),
];

/// Escape text for HTML element content and quoted attributes.
pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn layout(title: &str, nav: bool, body: &str) -> String {
    let nav = if nav {
        let links: String = NAV
            .iter()
            .map(|(name, href)| format!(r#"<li><a href="{href}">{name}</a></li>"#))
            .collect();
        format!("<nav><ul>{links}</ul></nav>")
    } else {
        String::new()
    };
    let title = escape_html(title);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
{nav}
<main>
{body}
</main>
</body>
</html>
"#
    )
}

#[must_use]
pub fn login(flash: Option<Flash>, next: &str) -> String {
    let message = flash.map_or_else(String::new, |flash| {
        format!(r#"<p class="flash">{}</p>"#, escape_html(flash.message()))
    });
    let action = escape_html(&login_location(next));

    layout(
        "Login",
        false,
        &format!(
            r#"<h1>Login</h1>
{message}
<p>Sign in with your Windows account.</p>
<form method="post" action="{action}">
<button type="submit">Sign in</button>
</form>"#
        ),
    )
}

#[must_use]
pub fn index(username: &str, apps: &[DashboardApp]) -> String {
    let cards: String = apps
        .iter()
        .map(|app| {
            format!(
                r#"<li><a href="{}">{}</a> {}</li>"#,
                app.mount,
                escape_html(app.name),
                escape_html(app.description)
            )
        })
        .collect();

    layout(
        "Dashboard Portal",
        true,
        &format!(
            "<h1>Dashboard Portal</h1>\n<p>Welcome, {}.</p>\n<ul>{cards}</ul>",
            escape_html(username)
        ),
    )
}

#[must_use]
pub fn about(username: &str) -> String {
    layout(
        "About",
        true,
        &format!(
            "<h1>About</h1>\n<p>Signed in as {}.</p>\n<p>This portal hosts the Dash and Taipy dashboards behind a single sign-on wall.</p>",
            escape_html(username)
        ),
    )
}

#[must_use]
pub fn dashboard(app: &DashboardApp, username: &str, path: &str) -> String {
    layout(
        app.name,
        true,
        &format!(
            r#"<h1>{}</h1>
<p>{}</p>
<div id="dashboard-root" data-path="{}" data-user="{}"></div>"#,
            escape_html(app.name),
            escape_html(app.description),
            escape_html(path),
            escape_html(username)
        ),
    )
}

#[must_use]
pub fn negotiate_challenge(login_location: &str) -> String {
    layout(
        "Sign in required",
        false,
        &format!(
            r#"<h1>Sign in required</h1>
<p>Your browser did not offer Windows credentials. <a href="{}">Sign in here</a>.</p>"#,
            escape_html(login_location)
        ),
    )
}

#[must_use]
pub fn error_page() -> String {
    layout(
        "Error",
        false,
        r#"<h1>Something went wrong</h1>
<p>The request could not be completed. Please try again later.</p>
<p><a href="/">Back to the portal</a></p>"#,
    )
}

#[must_use]
pub fn not_found() -> String {
    layout(
        "Not Found",
        false,
        r#"<h1>Page not found</h1>
<p><a href="/">Back to the portal</a></p>"#,
    )
}
