use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid response: {0}")]
    Parse(String),
    #[error("Command rejected: {0}")]
    Rejected(String),
    #[error("Client error: {0}")]
    Generic(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Parse(e.to_string())
    }
}

pub(crate) async fn read_json(
    response: reqwest::Response,
) -> Result<serde_json::Value, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    Ok(response.json::<serde_json::Value>().await?)
}
