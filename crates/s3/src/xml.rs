//! Parsing of the XML documents the S3 REST API returns.
//!
//! Matching is on local element names so the parser accepts responses
//! with or without the S3 document namespace (MinIO and AWS differ
//! here).

use crate::error::StoreError;
use crate::types::{BucketInfo, ListPage, ObjectInfo};
use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};

fn child_text<'a>(node: Node<'a, 'a>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decodes an S3 `<Error>` document into (code, message). Returns
/// `None` when the body is not one, so the caller can fall back to the
/// HTTP status.
pub fn parse_error_body(xml: &str) -> Option<(String, String)> {
    let doc = Document::parse(xml).ok()?;
    let root = doc.root_element();

    let error_node = if root.tag_name().name() == "Error" {
        root
    } else {
        root.descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "Error")?
    };

    let code = child_text(error_node, "Code")?.to_string();
    let message = child_text(error_node, "Message")
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}

/// Decodes `ListAllMyBucketsResult`.
pub fn parse_bucket_list(xml: &str) -> Result<Vec<BucketInfo>, StoreError> {
    let doc = Document::parse(xml).map_err(|e| StoreError::Parse(e.to_string()))?;

    let mut buckets = Vec::new();
    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Bucket")
    {
        let name = child_text(node, "Name")
            .ok_or_else(|| StoreError::Parse("Bucket entry without a Name".to_string()))?;
        let creation_date = child_text(node, "CreationDate").and_then(parse_timestamp);
        buckets.push(BucketInfo {
            name: name.to_string(),
            creation_date,
        });
    }

    Ok(buckets)
}

/// Decodes one `ListBucketResult` page of a ListObjectsV2 response.
pub fn parse_object_list(xml: &str) -> Result<ListPage, StoreError> {
    let doc = Document::parse(xml).map_err(|e| StoreError::Parse(e.to_string()))?;
    let root = doc.root_element();

    let mut page = ListPage::default();

    for node in root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Contents")
    {
        let key = child_text(node, "Key")
            .ok_or_else(|| StoreError::Parse("Contents entry without a Key".to_string()))?;
        let etag = child_text(node, "ETag").unwrap_or_default();
        let size = child_text(node, "Size")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let last_modified = child_text(node, "LastModified").and_then(parse_timestamp);

        page.objects.push(ObjectInfo {
            key: key.to_string(),
            etag: etag.to_string(),
            size,
            last_modified,
        });
    }

    for node in root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "CommonPrefixes")
    {
        if let Some(prefix) = child_text(node, "Prefix") {
            page.common_prefixes.push(prefix.to_string());
        }
    }

    page.is_truncated = child_text(root, "IsTruncated") == Some("true");
    page.next_continuation_token = child_text(root, "NextContinuationToken").map(str::to_string);

    Ok(page)
}

/// Escapes text for embedding in an XML request body.
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// A per-key failure reported inside a 200 `DeleteResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub code: String,
    pub message: String,
}

/// Extracts per-key `<Error>` entries from a Multi-Object Delete
/// response. Quiet mode suppresses successes, so anything present is
/// a failure.
pub fn parse_delete_failures(xml: &str) -> Result<Vec<DeleteFailure>, StoreError> {
    let doc = Document::parse(xml).map_err(|e| StoreError::Parse(e.to_string()))?;

    let mut failures = Vec::new();
    for node in doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Error")
    {
        failures.push(DeleteFailure {
            key: child_text(node, "Key").unwrap_or_default().to_string(),
            code: child_text(node, "Code").unwrap_or_default().to_string(),
            message: child_text(node, "Message").unwrap_or_default().to_string(),
        });
    }

    Ok(failures)
}

/// Builds the Multi-Object Delete request body (quiet mode).
pub fn build_delete_body(keys: &[String]) -> String {
    let mut body = String::from("<Delete><Quiet>true</Quiet>");
    for key in keys {
        body.push_str("<Object><Key>");
        body.push_str(&xml_escape(key));
        body.push_str("</Key></Object>");
    }
    body.push_str("</Delete>");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

    #[test]
    fn test_parse_bucket_list() {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="{NS}">
  <Owner><ID>minio</ID><DisplayName>minio</DisplayName></Owner>
  <Buckets>
    <Bucket><Name>invoices</Name><CreationDate>2024-02-01T09:30:00.000Z</CreationDate></Bucket>
    <Bucket><Name>photos</Name><CreationDate>2024-03-15T12:00:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#
        );

        let buckets = parse_bucket_list(&xml).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "invoices");
        assert!(buckets[0].creation_date.is_some());
        assert_eq!(buckets[1].name, "photos");
    }

    #[test]
    fn test_parse_bucket_list_without_namespace() {
        let xml = r#"<ListAllMyBucketsResult>
  <Buckets><Bucket><Name>plain</Name></Bucket></Buckets>
</ListAllMyBucketsResult>"#;

        let buckets = parse_bucket_list(xml).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "plain");
        assert!(buckets[0].creation_date.is_none());
    }

    #[test]
    fn test_parse_object_list_page() {
        let xml = format!(
            r#"<ListBucketResult xmlns="{NS}">
  <Name>invoices</Name>
  <Prefix>2024/</Prefix>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>token-123</NextContinuationToken>
  <Contents>
    <Key>2024/january.pdf</Key>
    <LastModified>2024-02-01T09:30:00.000Z</LastModified>
    <ETag>&quot;9bb58f26192e4ba00f01e2e7b136bbd8&quot;</ETag>
    <Size>52741</Size>
  </Contents>
  <CommonPrefixes><Prefix>2024/q1/</Prefix></CommonPrefixes>
  <CommonPrefixes><Prefix>2024/q2/</Prefix></CommonPrefixes>
</ListBucketResult>"#
        );

        let page = parse_object_list(&xml).unwrap();
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].key, "2024/january.pdf");
        assert_eq!(page.objects[0].etag, "\"9bb58f26192e4ba00f01e2e7b136bbd8\"");
        assert_eq!(page.objects[0].size, 52741);
        assert_eq!(page.common_prefixes, vec!["2024/q1/", "2024/q2/"]);
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("token-123"));
    }

    #[test]
    fn test_parse_object_list_final_page() {
        let xml = r#"<ListBucketResult>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#;

        let page = parse_object_list(xml).unwrap();
        assert!(page.objects.is_empty());
        assert!(!page.is_truncated);
        assert!(page.next_continuation_token.is_none());
    }

    #[test]
    fn test_parse_error_body() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchBucket</Code>
  <Message>The specified bucket does not exist</Message>
  <BucketName>ghost</BucketName>
</Error>"#;

        let (code, message) = parse_error_body(xml).unwrap();
        assert_eq!(code, "NoSuchBucket");
        assert_eq!(message, "The specified bucket does not exist");
    }

    #[test]
    fn test_parse_error_body_rejects_non_error_document() {
        assert!(parse_error_body("<ListBucketResult></ListBucketResult>").is_none());
        assert!(parse_error_body("not xml at all").is_none());
    }

    #[test]
    fn test_build_delete_body_escapes_keys() {
        let body = build_delete_body(&["a&b.txt".to_string(), "c<d>.txt".to_string()]);
        assert_eq!(
            body,
            "<Delete><Quiet>true</Quiet>\
             <Object><Key>a&amp;b.txt</Key></Object>\
             <Object><Key>c&lt;d&gt;.txt</Key></Object>\
             </Delete>"
        );
    }

    #[test]
    fn test_parse_delete_failures() {
        let xml = r#"<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Error>
    <Key>locked/file.txt</Key>
    <Code>AccessDenied</Code>
    <Message>Access Denied</Message>
  </Error>
</DeleteResult>"#;

        let failures = parse_delete_failures(xml).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, "locked/file.txt");
        assert_eq!(failures[0].code, "AccessDenied");
    }

    #[test]
    fn test_parse_delete_failures_quiet_success_is_empty() {
        let failures = parse_delete_failures("<DeleteResult></DeleteResult>").unwrap();
        assert!(failures.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        let err = parse_object_list("<unclosed").unwrap_err();
        assert!(matches!(err, StoreError::Parse(_)));
    }
}
