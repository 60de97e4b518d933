use serde_derive::{Deserialize, Serialize};

/// Build metadata baked in at compile time from `BUILD_REVISION`, `BUILD_TAG`
/// and `BUILD_TIME`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub revision: String,
    pub tag: String,
    pub time: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            revision: option_env!("BUILD_REVISION").unwrap_or("unknown").to_owned(),
            tag: option_env!("BUILD_TAG").unwrap_or("unknown").to_owned(),
            time: option_env!("BUILD_TIME").unwrap_or("unknown").to_owned(),
        }
    }
}
