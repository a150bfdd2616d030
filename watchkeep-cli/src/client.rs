use reqwest::{Client, RequestBuilder, Response, StatusCode};

/// Daemon address plus optional Basic credentials.
#[derive(Debug, Clone)]
pub struct Endpoint {
    client: Client,
    base: String,
    user: Option<String>,
    password: Option<String>,
}

impl Endpoint {
    pub fn new(base: &str, user: Option<String>, password: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("watchkeep-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            user,
            password,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Response> {
        tracing::debug!(path, "GET");
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        handle_error(request.send().await?).await
    }

    /// Posts an urlencoded form; repeated keys are kept.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> anyhow::Result<Response> {
        tracing::debug!(path, fields = form.len(), "POST");
        let request = self.authorize(self.client.post(self.url(path)).form(form));
        handle_error(request.send().await?).await
    }
}

/// A non-2xx reply from the daemon.
#[derive(Debug, thiserror::Error)]
#[error("request failed {status}: {text}")]
pub struct RequestError {
    pub status: StatusCode,
    pub text: String,
}

/// Text content of an HTML error page, on one line.
pub fn plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 200)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize non-2xx responses into errors while returning the response on success.
pub async fn handle_error(resp: Response) -> anyhow::Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RequestError {
        status,
        text: plain_text(&body),
    }
    .into())
}

/// Status of a failed request, if the daemon answered at all.
pub fn error_status(err: &anyhow::Error) -> Option<StatusCode> {
    err.downcast_ref::<RequestError>().map(|e| e.status)
}
