//! Legacy XML-RPC transport over the shared index session
//!
//! `XmlRpcTransport` performs exactly one POST per call and never retries;
//! retry policy belongs to the `IndexSession` underneath it.

use std::io::BufReader;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, error};
use url::{Position, Url};

use crate::client::{basic_auth_header, raise_for_status, IndexSession};
use crate::xmlrpc::{self, Value};
use crate::IndexResult;
use quarry_core::error::QuarryError;
use quarry_core::types::redact_url;

/// Content type of the XML-RPC envelope
pub const XMLRPC_CONTENT_TYPE: &str = "text/xml";

/// Handler used when the index URL has no path of its own
const DEFAULT_HANDLER: &str = "/RPC2";

fn parse_url(raw: &str) -> IndexResult<Url> {
    Url::parse(raw).map_err(|e| QuarryError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// XML-RPC request/response transport bound to an index URL scheme
#[derive(Debug, Clone)]
pub struct XmlRpcTransport {
    /// Scheme of the index URL (`https` in practice)
    scheme: String,
    /// Shared, already-authenticated session
    session: Arc<IndexSession>,
}

impl XmlRpcTransport {
    pub fn new(index_url: &str, session: Arc<IndexSession>) -> IndexResult<Self> {
        let index = parse_url(index_url)?;
        Ok(Self {
            scheme: index.scheme().to_string(),
            session,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// POST `request_body` to `<scheme>://<host><handler>` and decode the reply
    ///
    /// `host` may carry `user[:password]@`; those credentials are sent as
    /// basic auth and never appear in the request URL. A non-success status
    /// is logged and returned as `QuarryError::NetworkConnection`;
    /// lower-level failures from the session propagate untouched.
    pub fn request(
        &self,
        host: &str,
        handler: &str,
        request_body: Vec<u8>,
    ) -> IndexResult<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(XMLRPC_CONTENT_TYPE));

        let raw = format!("{}://{}{}", self.scheme, host, handler);
        let url = match split_credentials(&raw)? {
            (url, Some(authorization)) => {
                headers.insert(AUTHORIZATION, authorization);
                url
            },
            (url, None) => url,
        };

        let response = self.session.post(&url, request_body, headers)?;
        let response = raise_for_status(response).map_err(|err| {
            if let Some(status) = err.status() {
                error!("HTTP error {} while getting {}", status, url);
            }
            err
        })?;

        xmlrpc::decode_response(BufReader::new(response))
    }
}

/// Strip userinfo from `raw`, turning it into a basic auth header
fn split_credentials(raw: &str) -> IndexResult<(String, Option<HeaderValue>)> {
    let mut url = parse_url(raw)?;
    if url.username().is_empty() && url.password().is_none() {
        return Ok((raw.to_string(), None));
    }

    let username = decode_userinfo(url.username());
    let password = decode_userinfo(url.password().unwrap_or(""));
    let authorization = basic_auth_header(&username, &password)?;

    // Only fails for URLs that cannot have credentials in the first place
    let _ = url.set_username("");
    let _ = url.set_password(None);
    Ok((url.to_string(), Some(authorization)))
}

fn decode_userinfo(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Client-side proxy for an XML-RPC index endpoint
#[derive(Debug, Clone)]
pub struct IndexProxy {
    index_url: String,
    /// `[user[:password]@]host[:port]` of the endpoint
    host: String,
    /// Request path of the endpoint
    handler: String,
    transport: XmlRpcTransport,
}

impl IndexProxy {
    pub fn new(index_url: &str, session: Arc<IndexSession>) -> IndexResult<Self> {
        let index = parse_url(index_url)?;
        if index.host_str().is_none() {
            return Err(QuarryError::InvalidUrl {
                url: index_url.to_string(),
                reason: "index URL has no host".to_string(),
            });
        }

        let host = index[Position::BeforeUsername..Position::AfterPort].to_string();
        let handler = match &index[Position::BeforePath..Position::AfterQuery] {
            "" | "/" => DEFAULT_HANDLER.to_string(),
            path => path.to_string(),
        };

        Ok(Self {
            index_url: index_url.to_string(),
            host,
            handler,
            transport: XmlRpcTransport::new(index_url, session)?,
        })
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Invoke `method` and return the single value the server answered with
    pub fn call(&self, method: &str, params: &[Value]) -> IndexResult<Value> {
        debug!("XML-RPC {} on {}", method, redact_url(&self.index_url));
        let body = xmlrpc::encode_call(method, params);
        let mut values = self.transport.request(&self.host, &self.handler, body)?;

        if values.is_empty() {
            return Err(QuarryError::decode(format!(
                "{} returned no value",
                method
            )));
        }
        Ok(values.swap_remove(0))
    }
}
