//! Default request and helper factories.

use std::fmt;

use crate::domain::entities::{ImageId, ImageRequest, LoadHelper, RequestId, RequestOptions};
use crate::domain::ports::{HelperFactory, Identify, RequestFactory};

/// Builds requests with fresh identifiers and URI-derived cache keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRequestFactory;

impl Identify for DefaultRequestFactory {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultRequestFactory")
    }
}

impl RequestFactory for DefaultRequestFactory {
    fn create(&self, uri: &str, options: RequestOptions) -> ImageRequest {
        ImageRequest {
            id: RequestId::next(),
            uri: uri.to_string(),
            image_id: ImageId::from_uri(uri),
            options,
        }
    }
}

/// Hands out plain `LoadHelper`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHelperFactory;

impl Identify for DefaultHelperFactory {
    fn append_identifier(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("DefaultHelperFactory")
    }
}

impl HelperFactory for DefaultHelperFactory {
    fn load_helper(&self, options: RequestOptions) -> LoadHelper {
        LoadHelper::new(options)
    }
}
