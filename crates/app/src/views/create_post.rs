use agora_core::CoreError;
use agora_core::domain::posts::{ImageUpload, PostDraft};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub community_id: Option<i64>,
    #[serde(default)]
    pub image: Option<ImageField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageField {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

impl CreatePostForm {
    pub fn into_draft(self, max_upload_bytes: usize) -> Result<PostDraft, CoreError> {
        let image = match self.image {
            Some(field) => Some(field.into_upload(max_upload_bytes)?),
            None => None,
        };
        PostDraft::new(&self.title, &self.content, self.community_id, image)
    }
}

impl ImageField {
    fn into_upload(self, max_upload_bytes: usize) -> Result<ImageUpload, CoreError> {
        let encoded = strip_data_url(self.data.trim());
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|err| CoreError::Validation(format!("image is not valid base64: {err}")))?;
        if bytes.len() > max_upload_bytes {
            return Err(CoreError::Validation(format!(
                "image is larger than {max_upload_bytes} bytes"
            )));
        }
        ImageUpload::new(&self.file_name, &self.content_type, bytes)
    }
}

fn strip_data_url(data: &str) -> &str {
    match data.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => data,
    }
}

#[cfg(test)]
mod tests {
    use agora_core::CoreError;

    use super::{CreatePostForm, ImageField, strip_data_url};

    fn form(data: &str) -> CreatePostForm {
        CreatePostForm {
            title: " Hello ".to_string(),
            content: "world".to_string(),
            community_id: Some(2),
            image: Some(ImageField {
                file_name: "cat.png".to_string(),
                content_type: "image/png".to_string(),
                data: data.to_string(),
            }),
        }
    }

    #[test]
    fn valid_form_becomes_draft() {
        let draft = form("AQID").into_draft(1024).unwrap();
        assert_eq!(draft.title, "Hello");
        assert_eq!(draft.community_id, Some(2));
        assert_eq!(draft.image.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn data_urls_are_accepted() {
        assert_eq!(strip_data_url("data:image/png;base64,AQID"), "AQID");
        assert_eq!(strip_data_url("AQID"), "AQID");
        let draft = form("data:image/png;base64,AQID").into_draft(1024).unwrap();
        assert_eq!(draft.image.bytes.len(), 3);
    }

    #[test]
    fn oversized_or_garbled_images_are_rejected() {
        assert!(matches!(
            form("AQID").into_draft(2),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            form("not base64!").into_draft(1024),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn missing_image_is_a_validation_error() {
        let mut form = form("AQID");
        form.image = None;
        assert!(matches!(form.into_draft(1024), Err(CoreError::Validation(_))));
    }
}
