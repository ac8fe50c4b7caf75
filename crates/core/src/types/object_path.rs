use std::fmt;

use crate::error::CoreError;

const MAX_SEGMENT_LEN: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn for_image(title: &str, unix_millis: i64, file_name: &str) -> Result<Self, CoreError> {
        let safe_title = sanitize(title);
        let safe_name = sanitize(file_name);
        let safe_title = if safe_title.is_empty() {
            "post".to_string()
        } else {
            safe_title
        };
        let safe_name = if safe_name.is_empty() {
            "image".to_string()
        } else {
            safe_name
        };
        ObjectPath::try_from(format!("{safe_title}-{unix_millis}-{safe_name}").as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("empty object path".to_string()));
        }
        if trimmed.starts_with('.')
            || !trimmed
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '_' | '.'))
        {
            return Err(CoreError::Validation(format!("invalid object path: {trimmed}")));
        }
        Ok(ObjectPath(trimmed.to_string()))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut last_dash = true;
    for ch in value.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '.' || ch == '_' {
            output.push(ch);
            last_dash = false;
        } else if !last_dash {
            output.push('-');
            last_dash = true;
        }
        if output.len() >= MAX_SEGMENT_LEN {
            break;
        }
    }
    output
        .trim_matches(|ch| ch == '-' || ch == '.')
        .to_string()
}
