use super::*;
use serde_json::json;

#[test]
fn base_url_gets_single_trailing_slash() {
    let url = normalise_base_url("https://places.example.com/api//").unwrap();
    assert_eq!(url.as_str(), "https://places.example.com/api/");
    assert_eq!(
        url.join(DISCOVER_PATH).unwrap().as_str(),
        "https://places.example.com/api/discover-offices"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(
        normalise_base_url("not a url"),
        Err(PlacesApiError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn status_429_is_rate_limited_regardless_of_body() {
    let err = check_api_error(StatusCode::TOO_MANY_REQUESTS, &serde_json::Value::Null).unwrap_err();
    assert!(matches!(err, PlacesApiError::RateLimited(_)));
}

#[test]
fn rate_limited_error_code_on_200_is_rate_limited() {
    let body = json!({ "success": false, "error": "Daily quota hit", "errorCode": "rate_limited" });
    let err = check_api_error(StatusCode::OK, &body).unwrap_err();
    assert!(matches!(err, PlacesApiError::RateLimited(ref m) if m == "Daily quota hit"));
}

#[test]
fn rate_limit_wording_without_code_is_a_provider_error() {
    let body = json!({ "success": false, "error": "Rate limit exceeded, try again later" });
    let err = check_api_error(StatusCode::OK, &body).unwrap_err();
    assert!(matches!(err, PlacesApiError::Api { status: 200, .. }));
    assert!(matches!(PlacesError::from(err), PlacesError::Provider { .. }));
}

#[test]
fn server_error_status_is_api_error() {
    let body = json!({ "error": "upstream down" });
    let err = check_api_error(StatusCode::BAD_GATEWAY, &body).unwrap_err();
    assert!(matches!(err, PlacesApiError::Api { status: 502, ref message } if message == "upstream down"));
}

#[test]
fn success_envelope_passes() {
    let body = json!({ "success": true, "offices": [] });
    assert!(check_api_error(StatusCode::OK, &body).is_ok());
}
