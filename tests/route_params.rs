use http::Method;
use keyfront_rs::error::ApiError;
use keyfront_rs::message::{
    GetEntryRequest, HkpLookupRequest, ListEntryHistoryRequest, ListSehRequest, ListStepsRequest,
    ListUpdateRequest, RequestMessage, UpdateEntryRequest, UpdateKeyRequest,
};
use keyfront_rs::params::path_var;
use keyfront_rs::routing::{RouteLookup, RouteTable};

const EMAIL: &str = "e2eshare.test@gmail.com";
const EPOCH: &str = "2367";
const PAGE_SIZE: &str = "653";
const COMMITMENT_TS: &str = "8626";

/// Decode `uri` (path plus optional query) with an `{}` body, as the
/// dispatch pipeline would before calling the handler.
fn decode(method: Method, uri: &str) -> Result<RequestMessage, ApiError> {
    let table = RouteTable::standard().expect("standard routes");
    let (path, query) = match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    };
    let decoded = match table.lookup(&method, path, query) {
        RouteLookup::Matched { binding, params } => binding.decode(&params, b"{}"),
        other => panic!("{method} {uri} did not match: {other:?}"),
    };
    decoded
}

fn assert_param_error(method: Method, uri: &str) {
    let err = decode(method.clone(), uri).expect_err(uri);
    assert!(
        matches!(err, ApiError::InvalidParam { .. }),
        "{method} {uri}: {err}"
    );
}

#[test]
fn test_get_entry_params_v1_and_v2() {
    for prefix in ["/v1/users/", "/v2/users/"] {
        let cases = [
            (format!("{prefix}{EMAIL}?app_id=gmail&epoch={EPOCH}"), "gmail", 2367),
            (format!("{prefix}{EMAIL}?epoch={EPOCH}"), "", 2367),
            (format!("{prefix}{EMAIL}?app_id=gmail"), "gmail", 0),
            (format!("{prefix}{EMAIL}"), "", 0),
        ];
        for (uri, app_id, epoch) in cases {
            let msg = decode(Method::GET, &uri).expect(&uri);
            assert_eq!(
                msg,
                RequestMessage::GetEntry(GetEntryRequest {
                    user_id: EMAIL.to_string(),
                    app_id: app_id.to_string(),
                    epoch,
                }),
                "{uri}"
            );
        }
        assert_param_error(Method::GET, &format!("{prefix}{EMAIL}?epoch=-2587"));
        assert_param_error(Method::GET, &format!("{prefix}{EMAIL}?epoch=greatepoch"));
        assert_param_error(Method::GET, &format!("{prefix}{EMAIL}?epoch="));
    }
}

#[test]
fn test_hkp_lookup_params() {
    let escaped = "e2eshare.test%40gmail.com";
    let cases = [
        (format!("/v1/hkp/lookup?op=get&search={escaped}&options=mr"), "get", EMAIL, "mr"),
        (format!("/v1/hkp/lookup?op=get&search={EMAIL}&options=mr"), "get", EMAIL, "mr"),
        (format!("/v1/hkp/lookup?search={escaped}&options=mr"), "", EMAIL, "mr"),
        ("/v1/hkp/lookup?op=get&options=mr".to_string(), "get", "", "mr"),
        (format!("/v1/hkp/lookup?op=get&search={escaped}"), "get", EMAIL, ""),
        ("/v1/hkp/lookup?options=mr".to_string(), "", "", "mr"),
        (format!("/v1/hkp/lookup?search={escaped}"), "", EMAIL, ""),
        ("/v1/hkp/lookup?op=get".to_string(), "get", "", ""),
        ("/v1/hkp/lookup".to_string(), "", "", ""),
    ];
    for (uri, op, search, options) in cases {
        let msg = decode(Method::GET, &uri).expect(&uri);
        assert_eq!(
            msg,
            RequestMessage::HkpLookup(HkpLookupRequest {
                op: op.to_string(),
                search: search.to_string(),
                options: options.to_string(),
            }),
            "{uri}"
        );
    }
}

#[test]
fn test_list_entry_history_params() {
    let base = format!("/v2/users/{EMAIL}/history");
    let cases = [
        (format!("{base}?start_epoch={EPOCH}&page_size={PAGE_SIZE}"), 2367, 653),
        (format!("{base}?start_epoch={EPOCH}"), 2367, 0),
        (format!("{base}?page_size={PAGE_SIZE}"), 0, 653),
        (base.clone(), 0, 0),
    ];
    for (uri, start_epoch, page_size) in cases {
        let msg = decode(Method::GET, &uri).expect(&uri);
        assert_eq!(
            msg,
            RequestMessage::ListEntryHistory(ListEntryHistoryRequest {
                user_id: EMAIL.to_string(),
                start_epoch,
                page_size,
            }),
            "{uri}"
        );
    }
    assert_param_error(Method::GET, &format!("{base}?start_epoch=-2587"));
    assert_param_error(Method::GET, &format!("{base}?start_epoch=greatepoch"));
    assert_param_error(Method::GET, &format!("{base}?page_size=bigpagesize"));
    assert_param_error(Method::GET, &format!("{base}?start_epoch="));
}

#[test]
fn test_update_entry_params() {
    let uri = format!("/v2/users/{EMAIL}");
    let msg = decode(Method::PUT, &uri).expect(&uri);
    assert_eq!(
        msg,
        RequestMessage::UpdateEntry(UpdateEntryRequest {
            user_id: EMAIL.to_string(),
            signed_key: None,
        })
    );
}

#[test]
fn test_update_key_params() {
    let uri = format!("/v1/users/{EMAIL}/keys/gmail");
    let msg = decode(Method::PUT, &uri).expect(&uri);
    assert_eq!(
        msg,
        RequestMessage::UpdateKey(UpdateKeyRequest {
            user_id: EMAIL.to_string(),
            key_id: "gmail".to_string(),
            signed_key: None,
        })
    );
}

#[test]
fn test_list_seh_params() {
    let cases = [
        (format!("/v2/seh?start_epoch={EPOCH}&page_size={PAGE_SIZE}"), 2367, 653),
        (format!("/v2/seh?start_epoch={EPOCH}"), 2367, 0),
        (format!("/v2/seh?page_size={PAGE_SIZE}"), 0, 653),
        ("/v2/seh".to_string(), 0, 0),
    ];
    for (uri, start_epoch, page_size) in cases {
        let msg = decode(Method::GET, &uri).expect(&uri);
        assert_eq!(
            msg,
            RequestMessage::ListSeh(ListSehRequest {
                start_epoch,
                page_size,
            }),
            "{uri}"
        );
    }
    assert_param_error(Method::GET, "/v2/seh?start_epoch=-2587");
    assert_param_error(Method::GET, "/v2/seh?start_epoch=greatepoch");
    assert_param_error(Method::GET, "/v2/seh?page_size=bigpagesize");
    assert_param_error(Method::GET, "/v2/seh?page_size=");
}

#[test]
fn test_list_update_and_steps_params() {
    for path in ["/v2/update", "/v2/step"] {
        let cases = [
            (
                format!("{path}?start_commitment_timestamp={COMMITMENT_TS}&page_size={PAGE_SIZE}"),
                8626,
                653,
            ),
            (format!("{path}?start_commitment_timestamp={COMMITMENT_TS}"), 8626, 0),
            (format!("{path}?page_size={PAGE_SIZE}"), 0, 653),
            (path.to_string(), 0, 0),
        ];
        for (uri, start_commitment_timestamp, page_size) in cases {
            let msg = decode(Method::GET, &uri).expect(&uri);
            let want = if path == "/v2/update" {
                RequestMessage::ListUpdate(ListUpdateRequest {
                    start_commitment_timestamp,
                    page_size,
                })
            } else {
                RequestMessage::ListSteps(ListStepsRequest {
                    start_commitment_timestamp,
                    page_size,
                })
            };
            assert_eq!(msg, want, "{uri}");
        }
        assert_param_error(Method::GET, &format!("{path}?start_commitment_timestamp=-2587"));
        assert_param_error(Method::GET, &format!("{path}?start_commitment_timestamp=greatcommitment"));
        assert_param_error(Method::GET, &format!("{path}?page_size=bigpagesize"));
        assert_param_error(Method::GET, &format!("{path}?start_commitment_timestamp="));
    }
}

#[test]
fn test_path_var_lookup_by_name() {
    let table = RouteTable::standard().expect("standard routes");
    let path = format!("/v1/users/{EMAIL}");
    let RouteLookup::Matched { params, .. } = table.lookup(&Method::GET, &path, None) else {
        panic!("route did not match");
    };
    assert_eq!(path_var(&params, "user_id").expect("declared"), EMAIL);
    assert!(matches!(
        path_var(&params, "random_keyword"),
        Err(ApiError::MissingPathVar(_))
    ));
}
