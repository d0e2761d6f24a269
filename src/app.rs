//! Request inspector served by the `pocket_httpd` binary.
//!
//! - `/` redirects to `/inspect`
//! - `/inspect` echoes the parsed request back as text (headers only for HEAD)
//! - anything else is 404

use std::fmt::Write;

use crate::http::connection::{BoxFuture, ConnectionHandle, Handler};
use crate::http::mime::ContentType;
use crate::http::multipart::MimePart;
use crate::http::persistence::Persistence;
use crate::http::request::{Method, Request};
use crate::http::response::StatusCode;

pub struct InspectApp;

impl Handler for InspectApp {
    fn handle<'a>(
        &'a self,
        request: Request,
        conn: &'a mut ConnectionHandle<'_>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            match request.path.as_str() {
                "/" => {
                    conn.redirect("/inspect").await?;
                }
                "/inspect" => {
                    let text = describe(&request)?;
                    let mut response = conn.response(
                        StatusCode::Ok,
                        Some(ContentType::TextPlain.as_str()),
                        text,
                    );
                    if request.method == Method::HEAD {
                        // Content-Length from the build stays; only the body goes.
                        response.content = None;
                    }
                    conn.send(response, Persistence::Unspecified).await?;
                }
                _ => {
                    let response = conn.response(
                        StatusCode::NotFound,
                        Some(ContentType::TextPlain.as_str()),
                        format!("The requested URL path, \"{}\", was not found\n", request.path),
                    );
                    conn.send(response, Persistence::Unspecified).await?;
                }
            }
            anyhow::Ok(())
        })
    }
}

/// Renders the parsed request as plain text.
pub fn describe(request: &Request) -> anyhow::Result<String> {
    let mut out = String::new();

    writeln!(out, "{} {} {:?}", request.method.as_str(), request.path, request.version)?;
    if let Some(fragment) = &request.fragment {
        writeln!(out, "fragment: {fragment}")?;
    }

    let mut params: Vec<_> = request.url_parameters().iter().collect();
    params.sort();
    for (name, value) in params {
        writeln!(out, "param {name} = {value}")?;
    }

    let mut headers: Vec<_> = request.headers.iter().collect();
    headers.sort();
    for (name, value) in headers {
        writeln!(out, "header {name}: {}", value.unwrap_or_default())?;
    }

    if let Some(body) = &request.body {
        writeln!(out, "body: {} bytes", body.len())?;
    }
    if let Some(parts) = &request.mime_parts {
        describe_parts(&mut out, parts, 0)?;
    }

    Ok(out)
}

fn describe_parts(out: &mut String, parts: &[MimePart], depth: usize) -> std::fmt::Result {
    let indent = "  ".repeat(depth);
    for part in parts {
        writeln!(
            out,
            "{indent}part name={} filename={} bytes={}",
            part.name.as_deref().unwrap_or("-"),
            part.filename.as_deref().unwrap_or("-"),
            part.body.len()
        )?;
        if let Some(nested) = &part.nested_parts {
            describe_parts(out, nested, depth + 1)?;
        }
    }
    Ok(())
}
