pub use client::{Auth, Client, ClientError, Method, Response, StatusCode};
pub use uri::{InvalidUriError, Uri};

mod uri {
    use std::fmt::Display;
    use std::str::FromStr;

    use thiserror::Error;

    #[derive(Debug, Error)]
    pub struct InvalidUriError(String);

    impl Display for InvalidUriError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            self.0.fmt(f)
        }
    }

    impl From<http::uri::InvalidUri> for InvalidUriError {
        fn from(value: http::uri::InvalidUri) -> Self {
            InvalidUriError(value.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Uri(http::Uri);

    impl Uri {
        pub fn from_string(src: String) -> Result<Self, InvalidUriError> {
            let uri = http::Uri::from_maybe_shared(src)?;
            // reqwest only accepts absolute URIs
            if uri.scheme().is_none() || uri.host().is_none() {
                return Err(InvalidUriError(format!(
                    "expected an absolute URI, got '{uri}'"
                )));
            }
            Ok(Self(uri))
        }
    }

    impl Display for Uri {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            self.0.fmt(f)
        }
    }

    impl FromStr for Uri {
        type Err = InvalidUriError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::from_string(s.to_owned())
        }
    }

    impl TryFrom<String> for Uri {
        type Error = InvalidUriError;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            Self::from_string(value)
        }
    }
}

mod client {
    use std::time::Duration;

    use reqwest::RequestBuilder;
    use reqwest::header::AUTHORIZATION;

    use super::uri::Uri;

    pub type Method = reqwest::Method;
    pub type StatusCode = reqwest::StatusCode;

    #[derive(Debug, thiserror::Error)]
    pub enum ClientError {
        #[error(transparent)]
        Client(reqwest::Error),

        #[error(transparent)]
        Server(reqwest::Error),
    }

    #[derive(Debug)]
    pub struct Response(reqwest::Response);

    impl Response {
        pub fn status(&self) -> StatusCode {
            self.0.status()
        }

        pub async fn text(self) -> Result<String, ClientError> {
            self.0.text().await.map_err(ClientError::Server)
        }
    }

    #[derive(Debug, Clone)]
    pub enum Auth {
        /// Send the token verbatim as the `Authorization` header value, with
        /// no scheme prefix.
        Plain { token: String },
    }

    #[derive(Debug, Clone)]
    pub struct Client {
        client: reqwest::Client,
        timeout: Option<Duration>,
        auth: Option<Auth>,
    }

    impl Client {
        pub fn new(timeout: Option<Duration>) -> Self {
            Self {
                client: reqwest::Client::new(),
                timeout,
                auth: None,
            }
        }

        pub fn auth(self, auth: Option<Auth>) -> Self {
            Self {
                client: self.client,
                timeout: self.timeout,
                auth,
            }
        }

        /// Thin wrapper around [reqwest::Request], the decorator gets the
        /// builder after timeout and authorization have been applied.
        pub async fn request<D>(
            &self,
            method: Method,
            uri: &Uri,
            decorator: D,
        ) -> Result<Response, ClientError>
        where
            D: FnOnce(RequestBuilder) -> RequestBuilder,
        {
            let mut request = self.client.request(method, uri.to_string());

            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            if let Some(auth) = &self.auth {
                request = match auth {
                    Auth::Plain { token } => request.header(AUTHORIZATION, token),
                };
            };

            request = decorator(request);

            Ok(Response(request.send().await.map_err(ClientError::Client)?))
        }
    }
}
