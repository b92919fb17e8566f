use super::*;
use crate::auth::Credentials;
use crate::reference::ImageReference;
use mockito::Matcher;
use serde_json::json;

fn index_client(server: &mockito::Server) -> HttpRegistryClient {
    let config = ClientConfig::new()
        .with_index_url(format!("{}/v1", server.url()))
        .with_page_size(2);
    HttpRegistryClient::new(config).unwrap()
}

fn catalog_client(server: &mockito::Server) -> HttpRegistryClient {
    let config = ClientConfig::new()
        .with_registry_url(server.url())
        .with_api(SearchApi::Catalog)
        .with_page_size(2);
    HttpRegistryClient::new(config).unwrap()
}

#[test]
fn test_search_page_from_json_results_is_v1() {
    let body = json!({
        "results": [
            {"name": "alpine", "description": "tiny", "star_count": 10, "is_official": true},
            {"name": "alpine/git"}
        ]
    });

    match SearchPage::from_json(&body) {
        SearchPage::V1 { results } => {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].stars, 10);
            assert!(results[0].is_official);
            assert_eq!(results[1].description, "");
        }
        other => panic!("expected v1 page, got {other:?}"),
    }
}

#[test]
fn test_search_page_from_json_skips_malformed_hits() {
    let body = json!({"results": [{"description": "no name"}, {"name": "ok"}]});

    assert_eq!(
        SearchPage::from_json(&body),
        SearchPage::V1 {
            results: vec![SearchHit {
                name: "ok".to_string(),
                description: String::new(),
                stars: 0,
                is_official: false,
                is_automated: false,
            }]
        }
    );
}

#[test]
fn test_search_page_from_json_prefers_results_over_repositories() {
    let body = json!({"results": [], "repositories": ["x"]});
    assert!(matches!(SearchPage::from_json(&body), SearchPage::V1 { .. }));
}

#[test]
fn test_search_page_from_json_unknown_shape() {
    assert_eq!(SearchPage::from_json(&json!(["zzz"])), SearchPage::Unrecognized);
    assert!(SearchPage::Unrecognized.is_empty());
}

#[test]
fn test_registry_host_strips_scheme_and_path() {
    assert_eq!(
        registry_host("https://registry-1.docker.io/v2/").as_deref(),
        Some("registry-1.docker.io")
    );
    assert_eq!(
        registry_host("http://localhost:5000/v1").as_deref(),
        Some("localhost:5000")
    );
}

#[test]
fn test_client_rejects_empty_url() {
    let config = ClientConfig::new().with_index_url("  ");
    assert!(HttpRegistryClient::new(config).is_err());
}

#[test]
fn test_client_normalizes_urls() {
    let config = ClientConfig::new()
        .with_index_url("index.example.com/v1/")
        .with_registry_url("http://localhost:5000//");
    let client = HttpRegistryClient::new(config).unwrap();

    assert_eq!(client.index_url(), "https://index.example.com/v1");
    assert_eq!(client.registry_url(), "http://localhost:5000");
}

#[test]
fn test_is_repo_name_follows_distribution_grammar() {
    let client = HttpRegistryClient::new(ClientConfig::new()).unwrap();

    assert!(client.is_repo_name("alpine"));
    assert!(client.is_repo_name("localhost:5000/team/app"));
    assert!(!client.is_repo_name("Upper-Case"));
    assert!(!client.is_repo_name("bad name"));
}

#[test]
fn test_is_repo_name_rejects_tag_and_digest_suffixes() {
    let client = HttpRegistryClient::new(ClientConfig::new()).unwrap();

    assert!(!client.is_repo_name("a:b"));
    assert!(!client.is_repo_name("localhost:5000/app:v1"));
    assert!(!client.is_repo_name("alpine@sha256"));

    let policy = |name: &str| client.is_repo_name(name);
    assert!(ImageReference::resolve("a:b:c", policy).is_none());
    assert!(ImageReference::resolve("alpine@sha256:abcd", policy).is_none());

    let resolved = ImageReference::resolve("localhost:5000/app:v1", policy).unwrap();
    assert_eq!(resolved.repository(), "localhost:5000/app");
    assert_eq!(resolved.tag(), "v1");
}

#[test]
fn test_index_search_fetches_pages_until_num_pages() {
    let mut server = mockito::Server::new();
    let first = server
        .mock("GET", "/v1/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "alpine".into()),
            Matcher::UrlEncoded("n".into(), "2".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(
            json!({"num_pages": 2, "page": 1, "results": [{"name": "alpine"}]}).to_string(),
        )
        .create();
    let second = server
        .mock("GET", "/v1/search")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({"num_pages": 2, "page": 2, "results": [{"name": "alpine/git"}]}).to_string(),
        )
        .create();

    let mut client = index_client(&server);

    let page = client.search_get_page("alpine", 0).unwrap();
    assert!(matches!(page, SearchPage::V1 { .. }));
    assert!(!client.search_ended());

    client.search_get_page("alpine", 1).unwrap();
    assert!(client.search_ended());

    first.assert();
    second.assert();
}

#[test]
fn test_index_search_sends_stored_credentials() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1/search")
        .match_query(Matcher::Any)
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_header("content-type", "application/json")
        .with_body(json!({"results": []}).to_string())
        .create();

    let config = ClientConfig::new()
        .with_index_url(format!("{}/v1", server.url()))
        .with_credentials(Credentials::basic("user", "pass"));
    let mut client = HttpRegistryClient::new(config).unwrap();

    client.search_get_page("x", 0).unwrap();
    assert!(client.search_ended());
    mock.assert();
}

#[test]
fn test_index_search_error_status_returns_none() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/search")
        .match_query(Matcher::Any)
        .with_status(500)
        .create();

    let mut client = index_client(&server);

    assert!(client.search_get_page("alpine", 0).is_none());
    assert!(client.search_ended());
}

#[test]
fn test_index_search_malformed_body_returns_none() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/search")
        .match_query(Matcher::Any)
        .with_body("not json")
        .create();

    let mut client = index_client(&server);
    assert!(client.search_get_page("alpine", 0).is_none());
}

#[test]
fn test_catalog_search_filters_and_follows_cursor() {
    let mut server = mockito::Server::new();
    let first = server
        .mock("GET", "/v2/_catalog")
        .match_query(Matcher::Exact("n=2".into()))
        .with_header("content-type", "application/json")
        .with_header("link", "</v2/_catalog?last=nginx&n=2>; rel=\"next\"")
        .with_body(json!({"repositories": ["alpine", "nginx"]}).to_string())
        .create();
    let second = server
        .mock("GET", "/v2/_catalog")
        .match_query(Matcher::Exact("n=2&last=nginx".into()))
        .with_header("content-type", "application/json")
        .with_body(json!({"repositories": ["team/alpine-tools"]}).to_string())
        .create();

    let mut client = catalog_client(&server);

    assert_eq!(
        client.search_get_page("ALPINE", 0),
        Some(SearchPage::V2 {
            repositories: vec!["alpine".to_string()]
        })
    );
    assert!(!client.search_ended());

    assert_eq!(
        client.search_get_page("alpine", 1),
        Some(SearchPage::V2 {
            repositories: vec!["team/alpine-tools".to_string()]
        })
    );
    assert!(client.search_ended());

    first.assert();
    second.assert();
}

#[test]
fn test_catalog_unauthorized_returns_none() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v2/_catalog")
        .match_query(Matcher::Any)
        .with_status(401)
        .create();

    let mut client = catalog_client(&server);
    assert!(client.search_get_page("alpine", 0).is_none());
}
