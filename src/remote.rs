//! Anonymous read-only access to the NOAA public data buckets.
//!
//! The GOES archive buckets allow unsigned requests, so this client is plain HTTPS: the
//! ListObjectsV2 endpoint for key listings and bare GETs for object downloads.

use crate::error::StormSatResult;
use serde::Deserialize;
use std::{fs::File, path::Path, time::Duration};

pub(crate) struct BucketClient {
    http: reqwest::blocking::Client,
    bucket: &'static str,
}

/// One page of a ListObjectsV2 response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ObjectSummary>,
    #[serde(default)]
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectSummary {
    key: String,
}

impl BucketClient {
    pub(crate) fn new(bucket: &'static str) -> StormSatResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(BucketClient { http, bucket })
    }

    fn base_url(&self) -> String {
        format!("https://{}.s3.amazonaws.com/", self.bucket)
    }

    /// List every key under a prefix.
    ///
    /// Listings are paginated: each page may carry a continuation token, and the loop keeps
    /// requesting until a page comes back without one.
    pub(crate) fn list(&self, prefix: &str) -> StormSatResult<Vec<String>> {
        let url = self.base_url();
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("list-type", "2"), ("prefix", prefix)]);

            if let Some(tok) = token.as_deref() {
                request = request.query(&[("continuation-token", tok)]);
            }

            let body = request.send()?.error_for_status()?.text()?;
            let page: ListBucketResult = quick_xml::de::from_str(&body)?;

            keys.extend(page.contents.into_iter().map(|object| object.key));

            match page.next_continuation_token {
                Some(tok) if page.is_truncated => token = Some(tok),
                _ => break,
            }
        }

        Ok(keys)
    }

    /// Download an object to a local path, creating parent directories as needed.
    pub(crate) fn download(&self, key: &str, dest: &Path) -> StormSatResult<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("{}{}", self.base_url(), key);
        let mut response = self.http.get(&url).send()?.error_for_status()?;

        let mut file = File::create(dest)?;
        response.copy_to(&mut file)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ONE_PAGE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
        "<Name>noaa-goes16</Name>",
        "<Prefix>ABI-L1b-RadF/2019/244/12/</Prefix>",
        "<KeyCount>2</KeyCount>",
        "<MaxKeys>1000</MaxKeys>",
        "<IsTruncated>false</IsTruncated>",
        "<Contents><Key>ABI-L1b-RadF/2019/244/12/a.nc</Key><Size>100</Size></Contents>",
        "<Contents><Key>ABI-L1b-RadF/2019/244/12/b.nc</Key><Size>200</Size></Contents>",
        "</ListBucketResult>",
    );

    const TRUNCATED_PAGE: &str = concat!(
        r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
        "<IsTruncated>true</IsTruncated>",
        "<NextContinuationToken>1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=</NextContinuationToken>",
        "<Contents><Key>ABI-L1b-RadF/2019/244/12/a.nc</Key></Contents>",
        "</ListBucketResult>",
    );

    #[test]
    fn test_listing_page_decodes() {
        let page: ListBucketResult = quick_xml::de::from_str(ONE_PAGE).unwrap();

        assert!(!page.is_truncated);
        assert!(page.next_continuation_token.is_none());
        assert_eq!(page.contents.len(), 2);
        assert_eq!(page.contents[0].key, "ABI-L1b-RadF/2019/244/12/a.nc");
    }

    #[test]
    fn test_truncated_listing_carries_a_token() {
        let page: ListBucketResult = quick_xml::de::from_str(TRUNCATED_PAGE).unwrap();

        assert!(page.is_truncated);
        assert_eq!(
            page.next_continuation_token.as_deref(),
            Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=")
        );
    }

    #[test]
    fn test_empty_listing_decodes() {
        let empty = concat!(
            r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
            "<IsTruncated>false</IsTruncated>",
            "</ListBucketResult>",
        );

        let page: ListBucketResult = quick_xml::de::from_str(empty).unwrap();
        assert!(page.contents.is_empty());
    }
}
