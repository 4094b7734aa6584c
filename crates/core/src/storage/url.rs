//! Public URL resolution for stored objects.
//!
//! Purely a function of the backend configuration and the key. No backend
//! call is made and existence is never checked.

use depot_shared::config::LocalConfig;

use super::config::BackendConfig;

/// Public URL for `key` under `backend`.
///
/// A configured custom domain always wins over the provider-derived host.
#[must_use]
pub fn resolve_url(backend: &BackendConfig, key: &str) -> String {
    let (domain, use_ssl) = match backend {
        BackendConfig::Local(local) => return local_url(local, key),
        BackendConfig::Aliyun(c) => (c.domain.as_str(), c.use_ssl),
        BackendConfig::Tencent(c) => (c.domain.as_str(), c.use_ssl),
        BackendConfig::Huawei(c) => (c.domain.as_str(), c.use_ssl),
        BackendConfig::Aws(c) => (c.domain.as_str(), c.use_ssl),
        BackendConfig::QCloud(c) => (c.domain.as_str(), c.use_ssl),
        BackendConfig::Minio(c) => (c.domain.as_str(), c.use_ssl),
    };

    if !domain.is_empty() {
        return format!("{}/{key}", domain.trim_end_matches('/'));
    }

    let scheme = scheme(use_ssl);
    match backend {
        BackendConfig::Aliyun(c) => {
            let endpoint = strip_scheme(&c.endpoint);
            if endpoint.contains(c.bucket.as_str()) {
                format!("{scheme}://{endpoint}/{key}")
            } else {
                format!("{scheme}://{}.{endpoint}/{key}", c.bucket)
            }
        }
        BackendConfig::Tencent(c) => {
            format!("{scheme}://{}.cos.{}.myqcloud.com/{key}", c.bucket, c.region)
        }
        BackendConfig::Huawei(c) => {
            format!("{scheme}://{}.{}/{key}", c.bucket, strip_scheme(&c.endpoint))
        }
        BackendConfig::Aws(c) if !c.endpoint.is_empty() => {
            format!("{scheme}://{}/{}/{key}", strip_scheme(&c.endpoint), c.bucket)
        }
        BackendConfig::Aws(c) => {
            format!("{scheme}://{}.s3.{}.amazonaws.com/{key}", c.bucket, c.region)
        }
        BackendConfig::QCloud(c) => format!("{scheme}://{}/{key}", strip_scheme(&c.endpoint)),
        BackendConfig::Minio(c) => {
            format!("{scheme}://{}/{}/{key}", strip_scheme(&c.endpoint), c.bucket)
        }
        BackendConfig::Local(local) => local_url(local, key),
    }
}

fn local_url(local: &LocalConfig, key: &str) -> String {
    if local.url_prefix.is_empty() {
        format!("file://{key}")
    } else {
        format!("{}/{key}", local.url_prefix.trim_end_matches('/'))
    }
}

pub(crate) const fn scheme(use_ssl: bool) -> &'static str {
    if use_ssl { "https" } else { "http" }
}

/// Endpoint host without any `http://` or `https://` prefix or trailing slash.
pub(crate) fn strip_scheme(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint)
        .trim_end_matches('/')
}
