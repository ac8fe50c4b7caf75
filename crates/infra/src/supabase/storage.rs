use reqwest::Method;
use reqwest::header::CONTENT_TYPE;

use crate::supabase::rest::{SupabaseClient, SupabaseError, check_status};

impl SupabaseClient {
    pub async fn upload_object(
        &self,
        access_token: Option<&str>,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), SupabaseError> {
        let url = self.storage_url(&format!("object/{bucket}/{path}"));
        let response = self
            .request(Method::POST, &url, access_token)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!("object/public/{bucket}/{path}"))
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{path}", self.base_url())
    }
}
