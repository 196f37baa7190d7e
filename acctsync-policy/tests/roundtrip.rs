use acctsync_policy::{parse_plain_json, parse_url_encoded_json};

fn canon(doc: &str) -> String {
    parse_plain_json(doc).unwrap().render_compact_json()
}

#[test]
fn canonicalization_is_idempotent() {
    let doc = r#"{"Action": ["s3:Put", "s3:Get"], "Effect": "Allow"}"#;
    let once = canon(doc);
    let twice = canon(&once);
    assert_eq!(once, twice);
}

#[test]
fn url_encoded_round_trip_matches_after_canonicalization() {
    let original = parse_plain_json(r#"{"Action":["s3:Get","s3:Put"],"Effect":"Allow"}"#).unwrap();
    let escaped = original.encode_url_escaped();
    let decoded = parse_url_encoded_json(&escaped).unwrap();
    assert_eq!(original, decoded);
}

#[test]
fn single_element_array_collapses_to_scalar_equivalent() {
    let scalar = parse_plain_json(r#"{"Action": "s3:Get"}"#).unwrap();
    let array = parse_plain_json(r#"{"Action": ["s3:Get"]}"#).unwrap();
    assert_eq!(scalar, array);
}

#[test]
fn multi_element_string_arrays_are_order_insensitive() {
    let a = parse_plain_json(r#"{"Action": ["s3:Get", "s3:Put"]}"#).unwrap();
    let b = parse_plain_json(r#"{"Action": ["s3:Put", "s3:Get"]}"#).unwrap();
    assert_eq!(a, b);
}
