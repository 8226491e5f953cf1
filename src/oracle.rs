use std::sync::Arc;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use reqwest::{Client, Method, Proxy};

use crate::encode::{encode_chain, Encoding};
use crate::errors::AttackError;

pub const INJECTION_POINT: &str = "@{CIPHERTEXT}@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
}

// a single-query padding oracle. non-padding failures from the target must
// surface as OracleTransport; an invalid pad is an ordinary negative answer,
// never an error
#[async_trait]
pub trait Oracle: Send + Sync + 'static {
    async fn query(&self, ciphertext: &[u8]) -> Result<Verdict, AttackError>;
}

#[async_trait]
impl<O: Oracle> Oracle for Arc<O> {
    async fn query(&self, ciphertext: &[u8]) -> Result<Verdict, AttackError> {
        self.as_ref().query(ciphertext).await
    }
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for Box<O> {
    async fn query(&self, ciphertext: &[u8]) -> Result<Verdict, AttackError> {
        self.as_ref().query(ciphertext).await
    }
}

// probes a remote endpoint: the encoded candidate replaces the injection
// point in the url, header values and body, and a response matching the
// invalid-padding pattern counts as a rejected pad
#[derive(Debug)]
pub struct HttpOracle {
    client: Client,
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<String>,
    encodings: Vec<Encoding>,
    invalid_pattern: Regex,
}

impl HttpOracle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: String,
        method: Method,
        headers: Vec<(String, String)>,
        body: Option<String>,
        encodings: Vec<Encoding>,
        invalid_pattern: &str,
        proxy: Option<String>,
    ) -> Result<Self, AttackError> {
        let invalid_pattern = RegexBuilder::new(invalid_pattern)
            .multi_line(true)
            .build()
            .map_err(|err| {
                AttackError::InvalidInput(format!("bad invalid-padding pattern: {err}"))
            })?;
        let mut builder = Client::builder();
        if let Some(proxy) = proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|err| AttackError::InvalidInput(format!("bad proxy: {err}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|err| {
            AttackError::InvalidInput(format!("could not build http client: {err}"))
        })?;
        Ok(Self {
            client,
            url,
            method,
            headers,
            body,
            encodings,
            invalid_pattern,
        })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn query(&self, ciphertext: &[u8]) -> Result<Verdict, AttackError> {
        let encoded = encode_chain(ciphertext, &self.encodings)
            .map_err(|err| AttackError::OracleTransport(err.to_string()))?;
        let url = self.url.replace(INJECTION_POINT, &encoded);
        let mut request = self.client.request(self.method.clone(), url);
        for (name, value) in &self.headers {
            request = request.header(name, value.replace(INJECTION_POINT, &encoded));
        }
        if let Some(body) = &self.body {
            request = request.body(body.replace(INJECTION_POINT, &encoded));
        }
        let response = request
            .send()
            .await
            .map_err(|err| AttackError::OracleTransport(err.to_string()))?;
        // match against the status code followed by the body
        let mut text = format!("{}\n", response.status().as_str());
        let body = response
            .text()
            .await
            .map_err(|err| AttackError::OracleTransport(err.to_string()))?;
        text.push_str(&body);
        if self.invalid_pattern.is_match(&text) {
            Ok(Verdict::Invalid)
        } else {
            Ok(Verdict::Valid)
        }
    }
}
