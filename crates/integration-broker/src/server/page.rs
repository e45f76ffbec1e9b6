//! HTML returned to the provider popup after a completed authorization.

/// Page that closes the popup window it is loaded in.
pub fn render_close_page(provider: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{provider} connected</title>
</head>
<body>
<p>{provider} connected. You can close this window.</p>
<script>window.close();</script>
</body>
</html>"#,
        provider = html_escape(provider),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("xss")</script>"#),
            "&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_close_page() {
        let html = render_close_page("notion");
        assert!(html.contains("window.close()"));
        assert!(html.contains("notion connected"));
    }
}
