use orderdesk_core::{AppError, AppResult};
use url::Url;

/// Validated root URL of the remote API.
///
/// The path always ends with `/` so relative targets resolve beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBaseUrl(Url);

impl ApiBaseUrl {
    /// Parses and validates an `http` or `https` base URL.
    pub fn parse(value: &str) -> AppResult<Self> {
        let mut url = Url::parse(value.trim()).map_err(|error| {
            AppError::Validation(format!("invalid API base URL '{value}': {error}"))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "API base URL '{value}' must use http or https"
            )));
        }

        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(path.as_str());
        }

        Ok(Self(url))
    }

    /// Resolves `target` beneath the base path.
    pub fn join(&self, target: &str) -> AppResult<Url> {
        self.0
            .join(target.trim_start_matches('/'))
            .map_err(|error| AppError::Validation(format!("invalid request target '{target}': {error}")))
    }

    /// Returns the base URL.
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}
