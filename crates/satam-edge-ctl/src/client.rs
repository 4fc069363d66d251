use reqwest::{Client, Response, Url};
use satam_edge_types::{
    MESSAGE_PATH, MessageRequest, MessageType, STATUS_PATH, StatusResponse, VersionResponse,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("edge error: {0}")]
    Server(String),
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
}

impl Ctx {
    pub fn new(edge: &str) -> Result<Self, CliError> {
        let base = Url::parse(edge)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("satam-edge-ctl/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    pub async fn version(&self) -> Result<VersionResponse, CliError> {
        let resp = self.message(MessageType::GetVersion).await?;
        Self::json(resp).await
    }

    pub async fn skip_waiting(&self) -> Result<(), CliError> {
        let resp = self.message(MessageType::SkipWaiting).await?;
        Self::check(resp).await.map(|_| ())
    }

    pub async fn status(&self) -> Result<StatusResponse, CliError> {
        let resp = self.client.get(self.url(STATUS_PATH)?).send().await?;
        Self::json(resp).await
    }

    async fn message(&self, kind: MessageType) -> Result<Response, CliError> {
        let resp = self
            .client
            .post(self.url(MESSAGE_PATH)?)
            .json(&MessageRequest::new(kind))
            .send()
            .await?;
        Ok(resp)
    }

    async fn check(resp: Response) -> Result<Response, CliError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        Ok(resp)
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, CliError> {
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Server(format!("failed to parse body: {e}")))
    }
}
