use anyhow::{Context, Result};
use url::Url;

use crate::jsonp::JsonpTransport;

pub fn create_transport(url: impl AsRef<str>) -> Result<JsonpTransport> {
    let parsed_url =
        Url::parse(url.as_ref()).context(format!("Failed to parse url: {}", url.as_ref()))?;
    match parsed_url.scheme() {
        "http" | "https" => Ok(JsonpTransport::new(parsed_url)),
        _ => anyhow::bail!("Unknown scheme: {}", parsed_url.scheme()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_by_scheme() {
        assert!(create_transport("https://en.wikipedia.org/w/api.php").is_ok());
        assert!(create_transport("http://127.0.0.1:8080/search").is_ok());

        let err = create_transport("ws://127.0.0.1:8080").err().unwrap();
        assert_eq!(err.to_string(), "Unknown scheme: ws");
        assert!(create_transport("not a url").is_err());
    }
}
