//! Page rendering
//!
//! Plain string templates. Every interpolated value goes through `escape`.

use monzo_api::{Account, Transaction};
use monzo_auth::Credentials;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{} - Monzo Viewer</title>\n</head>\n<body>\n<h1>{}</h1>\n{}\n<p><a href=\"/index.html\">Home</a></p>\n</body>\n</html>\n",
        escape(title),
        escape(title),
        body
    )
}

/// Minor units to a `12.34 GBP` style string.
fn money(minor: i64, currency: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02} {}", abs / 100, abs % 100, escape(currency))
}

pub fn not_found() -> String {
    layout("Page Not Found", "<p>The page you requested does not exist.</p>")
}

pub fn error_page(message: &str) -> String {
    layout("Something went wrong", &format!("<p>{}</p>", escape(message)))
}

pub fn unconfigured_index() -> String {
    layout(
        "Monzo Viewer",
        "<p>No Monzo account is connected yet.</p>\n<p><a href=\"/auth_step_one.html\">Connect an account</a></p>",
    )
}

pub fn index(accounts: &[Account], selected: Option<(&str, &[Transaction])>) -> String {
    let mut body = String::from("<h2>Accounts</h2>\n<table>\n<tr><th>Type</th><th>Description</th><th>Created</th><th>Status</th><th></th></tr>\n");
    for account in accounts {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href=\"/index.html?accounts={}&amp;transactions=1\">Transactions</a></td></tr>\n",
            escape(account.account_type()),
            escape(&account.description),
            account.created.format("%Y-%m-%d"),
            if account.closed { "Closed" } else { "Open" },
            escape(&account.id),
        ));
    }
    body.push_str("</table>\n");

    if let Some((account_id, transactions)) = selected {
        body.push_str(&format!(
            "<h2>Last 7 days for {}</h2>\n",
            escape(account_id)
        ));
        if transactions.is_empty() {
            body.push_str("<p>No transactions to show.</p>\n");
        } else {
            body.push_str("<table>\n<tr><th>Date</th><th>Description</th><th>Amount</th><th>Category</th></tr>\n");
            for tx in transactions {
                body.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    tx.created.format("%Y-%m-%d %H:%M"),
                    escape(&tx.description),
                    money(tx.amount, &tx.currency),
                    escape(&tx.category),
                ));
            }
            body.push_str("</table>\n");
        }
    }
    layout("Monzo Viewer", &body)
}

/// Form for client id and secret. Re-rendered with `error` and the values
/// already typed when step two is missing a field.
pub fn auth_step_one(redirect_url: &str, error: Option<&str>, client_id: &str) -> String {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default();
    let body = format!(
        "{error}<p>Create an OAuth client at the Monzo developer portal with this redirect URL:</p>\n<pre>{}</pre>\n<form method=\"post\" action=\"/auth_step_two.html\">\n<label>Client ID <input name=\"client_id\" value=\"{}\"></label><br>\n<label>Client secret <input name=\"client_secret\" type=\"password\"></label><br>\n<button type=\"submit\">Continue</button>\n</form>",
        escape(redirect_url),
        escape(client_id),
    );
    layout("Connect to Monzo", &body)
}

pub fn auth_step_two(authorization_url: &str) -> String {
    let body = format!(
        "<p>Sign in to Monzo to grant access, then approve the request in the Monzo app.</p>\n<p><a href=\"{}\">Authorize with Monzo</a></p>",
        escape(authorization_url)
    );
    layout("Authorize", &body)
}

pub fn auth_tokens(credentials: &Credentials, redirect_url: &str) -> String {
    let body = format!(
        "<p>Authentication complete. The tokens below have been saved.</p>\n<table>\n<tr><th>Client ID</th><td>{}</td></tr>\n<tr><th>Redirect URL</th><td>{}</td></tr>\n<tr><th>Access token</th><td><code>{}</code></td></tr>\n<tr><th>Expiry</th><td>{}</td></tr>\n<tr><th>Refresh token</th><td><code>{}</code></td></tr>\n</table>",
        escape(&credentials.client_id),
        escape(redirect_url),
        escape(&credentials.access_token),
        credentials.expiry,
        escape(&credentials.refresh_token),
    );
    layout("Connected", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
    }

    #[test]
    fn money_formats_minor_units() {
        assert_eq!(money(1234, "GBP"), "12.34 GBP");
        assert_eq!(money(-5, "GBP"), "-0.05 GBP");
        assert_eq!(money(0, "EUR"), "0.00 EUR");
    }

    #[test]
    fn step_one_escapes_user_input() {
        let page = auth_step_one("http://x/monzo", Some("Please enter all fields"), "<script>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("Please enter all fields"));
    }

    #[test]
    fn step_two_escapes_ampersands_in_link() {
        let page = auth_step_two("https://auth.monzo.com?client_id=a&state=b");
        assert!(page.contains("href=\"https://auth.monzo.com?client_id=a&amp;state=b\""));
    }
}
