// HTTP response utilities for rendered SVG charts
use async_compression::tokio::bufread::BrotliEncoder;
use axum::{
    body::Body,
    http::{header, HeaderMap, Response, StatusCode},
};
use tokio::io::AsyncReadExt;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Coding name and q-value of one Accept-Encoding entry; a missing or unparsable q counts as 1
fn coding_weight(entry: &str) -> (&str, f32) {
    let mut parts = entry.split(';').map(str::trim);
    let coding = parts.next().unwrap_or_default();
    let q = parts
        .find_map(|param| param.strip_prefix("q="))
        .map(|q| q.parse().unwrap_or(1.0))
        .unwrap_or(1.0);
    (coding, q)
}

/// Whether Accept-Encoding allows `br`, either by name or through `*`. A zero q-value refuses it.
pub fn accepts_brotli(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT_ENCODING).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mut wildcard = None;
    for (coding, q) in accept.split(',').map(coding_weight) {
        if coding.eq_ignore_ascii_case("br") {
            return q > 0.0;
        }
        if coding == "*" {
            wildcard = Some(q > 0.0);
        }
    }
    wildcard.unwrap_or(false)
}

async fn brotli(bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
    let mut encoder = BrotliEncoder::new(std::io::Cursor::new(bytes));
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

/// SVG document, Brotli-compressed when `compress` is set
pub async fn svg_response(svg: String, compress: bool) -> Result<Response<Body>, StatusCode> {
    let raw = svg.into_bytes();

    let (body, encoding) = if compress {
        let raw_len = raw.len();
        let compressed = brotli(raw).await.map_err(|e| {
            tracing::error!(error = %e, "brotli compression failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tracing::trace!(raw = raw_len, compressed = compressed.len(), "compressed chart");
        (compressed, Some("br"))
    } else {
        (raw, None)
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, SVG_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::CACHE_CONTROL, "no-store");

    if let Some(encoding) = encoding {
        builder = builder
            .header(header::CONTENT_ENCODING, encoding)
            .header(header::VARY, "accept-encoding");
    }

    builder.body(Body::from(body)).map_err(|e| {
        tracing::error!(error = %e, "failed to build chart response");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::BrotliDecoder;
    use axum::http::HeaderValue;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;

    #[test]
    fn test_accepts_brotli() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_brotli(&headers));

        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br;q=0.9"));
        assert!(accepts_brotli(&headers));

        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        assert!(!accepts_brotli(&headers));
    }

    #[test]
    fn test_brotli_refused_by_zero_weight() {
        let mut headers = HeaderMap::new();
        for refused in ["gzip, br;q=0", "br; q=0.0, gzip", "*;q=0", "br;q=0, *", "brotli"] {
            headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(refused));
            assert!(!accepts_brotli(&headers), "{}", refused);
        }

        for allowed in ["BR", "gzip;q=1.0, *;q=0.5", "br;q=0.001"] {
            headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(allowed));
            assert!(accepts_brotli(&headers), "{}", allowed);
        }
    }

    #[tokio::test]
    async fn test_plain_svg() {
        let response = svg_response(SVG.to_string(), false).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], SVG_CONTENT_TYPE);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], SVG.as_bytes());
    }

    #[tokio::test]
    async fn test_brotli_svg_decodes() {
        let response = svg_response(SVG.to_string(), true).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "br");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let mut decoder = BrotliDecoder::new(std::io::Cursor::new(body.to_vec()));
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).await.unwrap();
        assert_eq!(decoded, SVG);
    }
}
