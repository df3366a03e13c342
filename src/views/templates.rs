//! HTML for the listing, login and error pages.
//!
//! Pages are assembled with plain string building; every value coming from
//! storage or the request is passed through [`html_escape`].

use crate::models::entity::Entity;
use axum::http::StatusCode;

const STYLE: &str = concat!(
    "body{font-family:monospace;margin:2em}",
    "table{border-collapse:collapse}",
    "td{padding:0 1.5em 0 0;white-space:nowrap}",
    "td.size{text-align:right}",
    "a{text-decoration:none}",
    "a:hover{text-decoration:underline}",
    ".muted{color:#888}"
);

/// Render the directory listing page.
pub fn render_listing(display_path: &str, flush_url: &str, entities: &[Entity]) -> String {
    let mut html = page_head(&format!("Index of {}", display_path));
    html.push_str(&format!(
        "<h1>Index of {}</h1>",
        html_escape(display_path)
    ));
    html.push_str(&format!(
        r#"<p class="muted"><a href="{}">refresh</a></p>"#,
        html_escape(flush_url)
    ));
    html.push_str("<table>");
    if display_path != "/" {
        html.push_str(r#"<tr><td><a href="../">../</a></td><td></td><td></td></tr>"#);
    }

    for entity in entities {
        match entity {
            Entity::Folder(folder) => {
                html.push_str(&format!(
                    r#"<tr class="dir"><td><a href="{}">{}</a></td><td></td><td class="size">-</td></tr>"#,
                    html_escape(&folder.url),
                    html_escape(&folder.name)
                ));
            }
            Entity::File(file) => {
                html.push_str(&format!(
                    r#"<tr class="file ext-{}"><td><a href="{}">{}</a></td><td>{}</td><td class="size">{}</td></tr>"#,
                    html_escape(&file.extension),
                    html_escape(&file.url),
                    html_escape(&file.name),
                    nbsp(&html_escape(&file.last_modified)),
                    nbsp(&html_escape(&file.size))
                ));
            }
        }
    }

    html.push_str("</table>");
    html.push_str(&page_tail());
    html
}

/// Render the shared-password form. `failed` adds a notice after a wrong
/// password.
pub fn render_login(display_path: &str, failed: bool) -> String {
    let mut html = page_head("Login");
    html.push_str(&format!(
        "<h1>Index of {}</h1>",
        html_escape(display_path)
    ));
    if failed {
        html.push_str(r#"<p class="muted">Wrong password.</p>"#);
    }
    html.push_str(concat!(
        r#"<form method="post">"#,
        r#"<input type="password" name="password" autofocus> "#,
        r#"<input type="submit" value="Log in">"#,
        "</form>"
    ));
    html.push_str(&page_tail());
    html
}

/// Render a minimal error page for failed requests.
pub fn render_error(status: StatusCode, message: &str) -> String {
    let mut html = page_head(&status.to_string());
    html.push_str(&format!("<h1>{}</h1>", html_escape(&status.to_string())));
    html.push_str(&format!("<p>{}</p>", html_escape(message)));
    html.push_str(&page_tail());
    html
}

/// Replace spaces with non-breaking spaces so padded columns keep their width.
pub fn nbsp(value: &str) -> String {
    value.replace(' ', "&nbsp;")
}

pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn page_head(title: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html><head>",
            r#"<meta charset="utf-8">"#,
            "<title>{}</title>",
            "<style>{}</style>",
            "</head><body>"
        ),
        html_escape(title),
        STYLE
    )
}

fn page_tail() -> String {
    "</body></html>".to_string()
}
