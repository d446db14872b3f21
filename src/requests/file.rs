use std::path::Path;

use bytes::Bytes;

use crate::args::parse_header;
use crate::error::{AppError, AppResult, HttpError, ValidationError};

use super::spec::RequestSpec;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reads a request file. See [`parse_request_lines`] for the line format.
///
/// # Errors
///
/// Returns an error when the file cannot be read, contains a malformed line,
/// or holds no requests at all.
pub fn load_request_file(path: &Path) -> AppResult<Vec<RequestSpec>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::http(HttpError::ReadRequestFile {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    let specs = parse_request_lines(&content)?;
    if specs.is_empty() {
        return Err(AppError::validation(ValidationError::EmptyRequestFile {
            path: path.display().to_string(),
        }));
    }
    Ok(specs)
}

/// Parses newline-delimited requests. Each non-blank line is
/// `url [\t method [\t field3 [\t field4]]]`: for `GET`, `field3` is a header
/// string; for any other method `field3` is the body and `field4` the headers.
///
/// # Errors
///
/// Returns an error on the first malformed line.
pub fn parse_request_lines(content: &str) -> Result<Vec<RequestSpec>, ValidationError> {
    let mut specs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let url = fields.next().unwrap_or_default();
        let method = fields
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let third = fields.next();
        let fourth = fields.next();

        let (body, header_field) = if method == "GET" {
            (None, third)
        } else {
            (third, fourth)
        };

        let mut headers = match header_field {
            Some(raw) if !raw.trim().is_empty() => parse_header_string(raw)?,
            Some(_) | None => Vec::new(),
        };
        let body = body.map_or_else(Bytes::new, |raw_body| {
            let has_content_type = headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                headers.push(("Content-Type".to_owned(), FORM_CONTENT_TYPE.to_owned()));
            }
            Bytes::copy_from_slice(raw_body.as_bytes())
        });

        specs.push(RequestSpec::new(&method, url, &headers, body)?);
    }
    Ok(specs)
}

/// Parses curl-style header flags: `-H 'Key: Value' -H "Other: v"`.
///
/// # Errors
///
/// Returns an error when a segment has no `:` separator.
pub fn parse_header_string(raw: &str) -> Result<Vec<(String, String)>, ValidationError> {
    let mut headers = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        rest = rest.strip_prefix("-H").unwrap_or(rest).trim_start();
        let end = next_flag(rest);
        let (segment, tail) = rest.split_at(end);
        let segment = segment.trim().trim_matches(|ch| ch == '\'' || ch == '"');
        if !segment.is_empty() {
            headers.push(parse_header(segment)?);
        }
        rest = tail;
    }
    Ok(headers)
}

// A flag starts a new segment only after whitespace, so `X-Header` stays intact.
fn next_flag(segment: &str) -> usize {
    segment
        .match_indices("-H")
        .map(|(idx, _)| idx)
        .find(|idx| {
            segment
                .get(..*idx)
                .is_some_and(|head| head.ends_with(char::is_whitespace))
        })
        .unwrap_or(segment.len())
}
