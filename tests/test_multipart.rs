use bytes::Bytes;
use pocket_httpd::http::multipart::decode;

fn body(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

#[test]
fn test_two_form_fields_in_order() {
    let data = body(
        "preamble is dropped\r\n\
         --XYZ\r\n\
         Content-Disposition: form-data; name=\"first\"\r\n\
         \r\n\
         hello\r\n\
         --XYZ\r\n\
         Content-Disposition: form-data; name=\"second\"; filename=\"b.txt\"\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         world\r\n\
         --XYZ--\r\n\
         epilogue is ignored",
    );

    let parts = decode(&data, "XYZ");

    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].name.as_deref(), Some("first"));
    assert_eq!(parts[0].filename, None);
    assert_eq!(&parts[0].body[..], b"hello");
    assert_eq!(parts[0].body_text.as_deref(), Some("hello"));

    assert_eq!(parts[1].name.as_deref(), Some("second"));
    assert_eq!(parts[1].filename.as_deref(), Some("b.txt"));
    assert_eq!(parts[1].content_type(), Some("text/plain"));
    assert_eq!(&parts[1].body[..], b"world");
}

#[test]
fn test_no_boundary_yields_no_parts() {
    let parts = decode(&body("just some text\r\nwith lines\r\n"), "XYZ");

    assert!(parts.is_empty());
}

#[test]
fn test_bare_lf_line_endings() {
    let data = body("--b\nContent-Disposition: form-data; name=x\n\nvalue\n--b--\n");
    let parts = decode(&data, "b");

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name.as_deref(), Some("x"));
    assert_eq!(&parts[0].body[..], b"value");
}

#[test]
fn test_body_keeps_inner_line_breaks() {
    let data = body("--b\r\n\r\nline one\r\nline two\r\n\r\n--b--");
    let parts = decode(&data, "b");

    assert_eq!(parts.len(), 1);
    assert!(parts[0].headers.is_empty());
    assert_eq!(&parts[0].body[..], b"line one\r\nline two\r\n");
}

#[test]
fn test_part_without_blank_line_is_all_body() {
    let data = body("--b\r\njust data\r\n--b--");
    let parts = decode(&data, "b");

    assert_eq!(parts.len(), 1);
    assert!(parts[0].headers.is_empty());
    assert_eq!(&parts[0].body[..], b"just data");
}

#[test]
fn test_unterminated_body_keeps_last_part() {
    let data = body("--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nabc");
    let parts = decode(&data, "b");

    assert_eq!(parts.len(), 1);
    assert_eq!(&parts[0].body[..], b"abc");
}

#[test]
fn test_similar_lines_are_not_delimiters() {
    let data = body("--b\r\n\r\n--bb\r\n-- b\r\n--b--");
    let parts = decode(&data, "b");

    assert_eq!(parts.len(), 1);
    assert_eq!(&parts[0].body[..], b"--bb\r\n-- b");
}

#[test]
fn test_binary_part_has_no_text() {
    let mut raw = b"--b\r\nContent-Disposition: form-data; name=\"img\"; filename=\"a.bin\"\r\n\r\n".to_vec();
    raw.extend_from_slice(&[0xff, 0xfe, 0x00, 0x01]);
    raw.extend_from_slice(b"\r\n--b--\r\n");

    let parts = decode(&Bytes::from(raw), "b");

    assert_eq!(parts.len(), 1);
    assert_eq!(&parts[0].body[..], &[0xff, 0xfe, 0x00, 0x01]);
    assert!(parts[0].body_text.is_none());
}

#[test]
fn test_part_charset_decoding() {
    let mut raw = b"--b\r\nContent-Type: text/plain; charset=iso-8859-1\r\n\r\n".to_vec();
    raw.extend_from_slice(b"na\xefve");
    raw.extend_from_slice(b"\r\n--b--");

    let parts = decode(&Bytes::from(raw), "b");

    assert_eq!(parts[0].body_text.as_deref(), Some("naïve"));
}

#[test]
fn test_nested_multipart() {
    let data = body(
        "--outer\r\n\
         Content-Disposition: form-data; name=\"files\"\r\n\
         Content-Type: multipart/mixed; boundary=inner\r\n\
         \r\n\
         --inner\r\n\
         Content-Disposition: file; filename=\"one.txt\"\r\n\
         \r\n\
         1\r\n\
         --inner\r\n\
         Content-Disposition: file; filename=\"two.txt\"\r\n\
         \r\n\
         2\r\n\
         --inner--\r\n\
         --outer--\r\n",
    );

    let parts = decode(&data, "outer");

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name.as_deref(), Some("files"));
    assert!(parts[0].body_text.is_none());

    let nested = parts[0].nested_parts.as_ref().expect("nested parts");
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[0].filename.as_deref(), Some("one.txt"));
    assert_eq!(&nested[0].body[..], b"1");
    assert_eq!(nested[1].filename.as_deref(), Some("two.txt"));
    assert_eq!(&nested[1].body[..], b"2");
}

#[test]
fn test_quoted_filename_with_separator() {
    let data = body("--b\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"a; b.txt\"\r\n\r\nx\r\n--b--");
    let parts = decode(&data, "b");

    assert_eq!(parts[0].name.as_deref(), Some("doc"));
    assert_eq!(parts[0].filename.as_deref(), Some("a; b.txt"));
}

#[test]
fn test_disposition_keys_ignore_case() {
    let data = body("--b\r\ncontent-disposition: form-data; NAME=field\r\n\r\nx\r\n--b--");
    let parts = decode(&data, "b");

    assert_eq!(parts[0].name.as_deref(), Some("field"));
}
