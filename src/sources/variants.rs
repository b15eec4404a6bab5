use url::Url;

use super::SourceDescriptor;
use crate::Result;

/// Query parameters that carry the API key. Both spellings are sent since the
/// service does not document which one it reads.
pub const API_KEY_PARAMS: [&str; 2] = ["key", "api_key"];

/// Enumerate candidate request URLs for `video_id` against `source`.
///
/// Endpoints are iterated in the outer loop and parameter sets in the inner
/// loop, so spellings of the same request are tried back to back before moving
/// to the next endpoint. Exactly `endpoint_paths.len() * param_sets.len()`
/// URLs are produced. No I/O happens here.
pub fn candidate_urls(source: &SourceDescriptor, video_id: &str, api_key: Option<&str>) -> Result<Vec<String>> {
    let base = Url::parse(&source.base_url)
        .map_err(|_| anyhow::anyhow!("Invalid base URL for source '{}': {}", source.name, source.base_url))?;
    let api_key = api_key.filter(|key| !key.is_empty());

    let mut urls = Vec::with_capacity(source.endpoint_paths.len() * source.param_sets.len());

    for endpoint in &source.endpoint_paths {
        let endpoint_url = base
            .join(endpoint)
            .map_err(|_| anyhow::anyhow!("Invalid endpoint path '{}' for source '{}'", endpoint, source.name))?;

        for params in &source.param_sets {
            let mut url = endpoint_url.clone();
            {
                let mut query = url.query_pairs_mut();
                for param in params {
                    query.append_pair(&param.key, &param.value.render(video_id));
                }
                if let Some(key) = api_key {
                    for name in API_KEY_PARAMS {
                        query.append_pair(name, key);
                    }
                }
            }
            urls.push(url.to_string());
        }
    }

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ParamSpec;

    fn small_source() -> SourceDescriptor {
        SourceDescriptor {
            name: "test".to_string(),
            base_url: "https://svc.test".to_string(),
            endpoint_paths: vec!["/".to_string(), "/api/transcript".to_string()],
            param_sets: vec![
                vec![ParamSpec::video_id("v")],
                vec![ParamSpec::video_id("video_id")],
                vec![ParamSpec::watch_url("url")],
            ],
        }
    }

    #[test]
    fn test_count_is_endpoints_times_param_sets() {
        let source = SourceDescriptor::transcript_service();
        let urls = candidate_urls(&source, "abc12345678", None).unwrap();
        assert_eq!(urls.len(), source.endpoint_paths.len() * source.param_sets.len());
    }

    #[test]
    fn test_endpoint_major_order() {
        let urls = candidate_urls(&small_source(), "abc12345678", None).unwrap();

        assert_eq!(
            urls,
            vec![
                "https://svc.test/?v=abc12345678",
                "https://svc.test/?video_id=abc12345678",
                "https://svc.test/?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc12345678",
                "https://svc.test/api/transcript?v=abc12345678",
                "https://svc.test/api/transcript?video_id=abc12345678",
                "https://svc.test/api/transcript?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc12345678",
            ]
        );
    }

    #[test]
    fn test_api_key_injected_twice_on_every_candidate() {
        let urls = candidate_urls(&small_source(), "abc12345678", Some("k3y")).unwrap();

        for url in &urls {
            assert!(url.contains("&key=k3y&api_key=k3y"), "missing key params: {}", url);
        }
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let urls = candidate_urls(&small_source(), "abc12345678", Some("")).unwrap();
        assert!(urls.iter().all(|url| !url.contains("key=")));
    }

    #[test]
    fn test_deterministic() {
        let a = candidate_urls(&small_source(), "id", Some("k")).unwrap();
        let b = candidate_urls(&small_source(), "id", Some("k")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_base_url() {
        let mut source = small_source();
        source.base_url = "::nope".to_string();
        assert!(candidate_urls(&source, "id", None).is_err());
    }
}
