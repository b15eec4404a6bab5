use url::form_urlencoded;

/// Placeholder written in place of a secret.
pub const REDACTED: &str = "[REDACTED]";

/// Replace every occurrence of `secret` in `text` with [`REDACTED`].
///
/// Encoded spellings of the secret are scrubbed too, since secrets end up in
/// query strings: percent-encoding and the form encoding `url` uses for query
/// pairs (`+` for space, `%7E` for `~`). An empty secret leaves the input
/// unchanged.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }

    let percent_encoded = urlencoding::encode(secret).into_owned();
    let form_encoded: String = form_urlencoded::byte_serialize(secret.as_bytes()).collect();

    [secret.to_string(), percent_encoded, form_encoded]
        .iter()
        .fold(text.to_string(), |acc, spelling| acc.replace(spelling.as_str(), REDACTED))
}

/// Apply [`redact`] for each secret in turn.
pub fn redact_all<'a>(text: &str, secrets: impl IntoIterator<Item = &'a str>) -> String {
    secrets
        .into_iter()
        .fold(text.to_string(), |acc, secret| redact(&acc, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_every_occurrence() {
        let url = "https://svc.test/api?key=s3cr3t&api_key=s3cr3t";
        let out = redact(url, "s3cr3t");
        assert!(!out.contains("s3cr3t"));
        assert_eq!(out.matches(REDACTED).count(), 2);
    }

    #[test]
    fn test_empty_secret_is_noop() {
        assert_eq!(redact("abc", ""), "abc");
    }

    #[test]
    fn test_percent_encoded_secret() {
        let out = redact("https://svc.test/?key=a%2Fb%3Dc", "a/b=c");
        assert_eq!(out, format!("https://svc.test/?key={REDACTED}"));
    }

    #[test]
    fn test_form_encoded_secret() {
        let mut url = url::Url::parse("https://svc.test/").unwrap();
        url.query_pairs_mut()
            .append_pair("key", "k3y~abc")
            .append_pair("api_key", "two words");

        let out = redact_all(url.as_str(), ["k3y~abc", "two words"]);
        assert_eq!(out, format!("https://svc.test/?key={REDACTED}&api_key={REDACTED}"));
    }

    #[test]
    fn test_redact_all() {
        let out = redact_all("one two three", ["one", "", "three"]);
        assert_eq!(out, format!("{REDACTED} two {REDACTED}"));
    }
}
