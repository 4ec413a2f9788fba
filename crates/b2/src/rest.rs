//! B2 client over HTTPS
//!
//! Talks to the B2 native API (v2) with reqwest. The account
//! authorization from `b2_authorize_account` is kept and sent with every
//! later call.

use std::sync::RwLock;

use async_trait::async_trait;
use duck_core::{Error, Host, Result, RetryPolicy};
use http::StatusCode;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::client::{
    B2Account, B2Bucket, B2Client, B2ErrorResponse, B2FileInfo, B2UploadUrl,
    ListFileVersionsRequest, ListFileVersionsResponse, UploadRequest, map_b2_error,
};
use crate::protocol::DO_NOT_VERIFY;

const API_VERSION: &str = "b2api/v2";

#[derive(Debug, Clone)]
struct Authorization {
    account_id: String,
    token: String,
    api_url: String,
}

/// B2 client using reqwest
pub struct HttpB2Client {
    http: reqwest::Client,
    base_url: url::Url,
    retry: RetryPolicy,
    authorization: RwLock<Option<Authorization>>,
}

impl HttpB2Client {
    /// Client for `host`, normally `api.backblazeb2.com`
    pub fn new(host: &Host, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("duck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Connectivity(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: host.url()?,
            retry,
            authorization: RwLock::new(None),
        })
    }

    fn authorization(&self) -> Result<Authorization> {
        self.authorization
            .read()
            .map_err(|_| Error::General("B2 authorization lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| Error::login_failure("Login failed", "Not authorized"))
    }

    /// POST a JSON call to the API URL of the account, retrying transient
    /// failures.
    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let auth = self.authorization()?;
        let url = format!("{}/{API_VERSION}/{operation}", auth.api_url);
        let http = &self.http;
        let url = url.as_str();
        let token = auth.token.as_str();
        tracing::debug!(operation, "B2 API call");
        self.retry
            .run(operation, || async move {
                let response = http
                    .post(url)
                    .header(AUTHORIZATION, token)
                    .json(body)
                    .send()
                    .await
                    .map_err(transport_error)?;
                parse_response(response).await
            })
            .await
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Connectivity(format!("Request timeout: {e}"))
    } else {
        Error::Connectivity(e.to_string())
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status: StatusCode = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| Error::General(format!("Invalid B2 response: {e}")));
    }
    let text = response.text().await.map_err(transport_error)?;
    let error = serde_json::from_str::<B2ErrorResponse>(&text).unwrap_or_else(|_| B2ErrorResponse {
        status: status.as_u16(),
        code: String::new(),
        message: text,
    });
    Err(map_b2_error(status, &error))
}

/// Percent-encode a file name for the `X-Bz-File-Name` header
fn encode_file_name(name: &str) -> String {
    urlencoding::encode(name).replace("%2F", "/")
}

#[async_trait]
impl B2Client for HttpB2Client {
    async fn authorize_account(&self, key_id: &str, application_key: &str) -> Result<B2Account> {
        let url = format!("{}{API_VERSION}/b2_authorize_account", self.base_url);
        let http = &self.http;
        let url = url.as_str();
        let account: B2Account = self
            .retry
            .run("b2_authorize_account", || async move {
                let response = http
                    .get(url)
                    .basic_auth(key_id, Some(application_key))
                    .send()
                    .await
                    .map_err(transport_error)?;
                parse_response(response).await
            })
            .await?;
        let mut authorization = self
            .authorization
            .write()
            .map_err(|_| Error::General("B2 authorization lock poisoned".to_string()))?;
        *authorization = Some(Authorization {
            account_id: account.account_id.clone(),
            token: account.authorization_token.clone(),
            api_url: account.api_url.clone(),
        });
        Ok(account)
    }

    async fn list_buckets(&self) -> Result<Vec<B2Bucket>> {
        #[derive(serde::Deserialize)]
        struct Buckets {
            buckets: Vec<B2Bucket>,
        }
        let account_id = self.authorization()?.account_id;
        let response: Buckets = self
            .call("b2_list_buckets", &json!({ "accountId": account_id }))
            .await?;
        Ok(response.buckets)
    }

    async fn create_bucket(&self, bucket_name: &str, bucket_type: &str) -> Result<B2Bucket> {
        let account_id = self.authorization()?.account_id;
        self.call(
            "b2_create_bucket",
            &json!({
                "accountId": account_id,
                "bucketName": bucket_name,
                "bucketType": bucket_type,
            }),
        )
        .await
    }

    async fn delete_bucket(&self, bucket_id: &str) -> Result<B2Bucket> {
        let account_id = self.authorization()?.account_id;
        self.call(
            "b2_delete_bucket",
            &json!({ "accountId": account_id, "bucketId": bucket_id }),
        )
        .await
    }

    async fn list_file_versions(
        &self,
        request: &ListFileVersionsRequest,
    ) -> Result<ListFileVersionsResponse> {
        self.call("b2_list_file_versions", request).await
    }

    async fn get_upload_url(&self, bucket_id: &str) -> Result<B2UploadUrl> {
        self.call("b2_get_upload_url", &json!({ "bucketId": bucket_id }))
            .await
    }

    async fn upload_file(&self, url: &B2UploadUrl, request: UploadRequest) -> Result<B2FileInfo> {
        let sha1 = request
            .content_sha1
            .clone()
            .unwrap_or_else(|| DO_NOT_VERIFY.to_string());
        let response = self
            .http
            .post(&url.upload_url)
            .header(AUTHORIZATION, &url.authorization_token)
            .header(CONTENT_TYPE, &request.content_type)
            .header(CONTENT_LENGTH, request.data.len())
            .header("X-Bz-File-Name", encode_file_name(&request.file_name))
            .header("X-Bz-Content-Sha1", sha1)
            .body(request.data)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    async fn hide_file(&self, bucket_id: &str, file_name: &str) -> Result<B2FileInfo> {
        self.call(
            "b2_hide_file",
            &json!({ "bucketId": bucket_id, "fileName": file_name }),
        )
        .await
    }

    async fn delete_file_version(&self, file_name: &str, file_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "b2_delete_file_version",
                &json!({ "fileName": file_name, "fileId": file_id }),
            )
            .await?;
        Ok(())
    }
}
