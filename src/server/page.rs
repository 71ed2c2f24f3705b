//! Informational landing page.

use chrono::{DateTime, Utc};

/// Render the `GET /` page.
pub fn render_status_page(service_name: &str, now: DateTime<Utc>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{name}</title>
<style>
body {{ font-family: sans-serif; max-width: 40em; margin: 3em auto; color: #222; }}
code {{ background: #f2f2f2; padding: 0.1em 0.3em; }}
</style>
</head>
<body>
<h1>{name}</h1>
<p>License authorization service for XZip. Server time: {time}</p>
<h2>Endpoints</h2>
<ul>
<li><code>POST /authorize</code> &mdash; validate a license key</li>
<li><code>GET /health</code> &mdash; liveness</li>
<li><code>POST /admin/addkey</code> &mdash; issue a key</li>
<li><code>GET /admin/stats</code> &mdash; key statistics</li>
</ul>
</body>
</html>
"#,
        name = escape_html(service_name),
        time = now.to_rfc3339(),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_page_lists_endpoints() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let page = render_status_page("xzip-authd", now);
        assert!(page.contains("<h1>xzip-authd</h1>"));
        assert!(page.contains("POST /authorize"));
        assert!(page.contains("2025-01-15T12:00:00+00:00"));
    }

    #[test]
    fn test_service_name_escaped() {
        let page = render_status_page("<script>", Utc::now());
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<h1><script>"));
    }
}
