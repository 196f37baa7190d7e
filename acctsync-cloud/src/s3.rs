//! S3 bucket policy fetch.
//!
//! Grounded on `original_source/iamy/s3.go`: buckets are listed once with
//! the default (us-east-1) client, then each bucket's region and policy
//! are populated concurrently (`listAllBuckets`'s per-bucket goroutine),
//! using a region -> client cache (`regionClientMap`) since
//! `GetBucketPolicy` must be called against the bucket's own region.
//! `NoSuchBucketPolicy` means "no policy", not an error, exactly as
//! `GetBucketPolicyDoc` treats it; a bucket that's vanished between the
//! list and the describe call is dropped rather than failing the whole
//! fetch, mirroring the original's `ErrCodeNoSuchBucket` tolerance.
//!
//! The donor also collects bucket tags; this model has no field for
//! them (`acctsync_policy::BucketPolicy` is just `bucket_name` +
//! `policy`), so that part of the original fetch has no counterpart
//! here and isn't ported.

use std::collections::HashMap;
use std::sync::Arc;

use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::ProvideErrorMetadata;
use tokio::sync::Mutex;

use acctsync_policy::BucketPolicy;

use crate::error::CloudError;

struct RegionClients {
    config: aws_config::SdkConfig,
    clients: Mutex<HashMap<String, aws_sdk_s3::Client>>,
}

impl RegionClients {
    fn new(config: aws_config::SdkConfig, default_client: aws_sdk_s3::Client) -> Self {
        let mut clients = HashMap::new();
        clients.insert(String::new(), default_client);
        RegionClients {
            config,
            clients: Mutex::new(clients),
        }
    }

    async fn get_or_create(&self, region: &str) -> aws_sdk_s3::Client {
        if region.is_empty() {
            return self.clients.lock().await.get("").unwrap().clone();
        }

        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }

        let conf = aws_sdk_s3::config::Builder::from(&self.config)
            .region(Region::new(region.to_string()))
            .build();
        let client = aws_sdk_s3::Client::from_conf(conf);
        clients.insert(region.to_string(), client.clone());
        client
    }
}

fn error_code<E: ProvideErrorMetadata>(err: &E) -> Option<&str> {
    err.code()
}

async fn fetch_bucket_policy(
    regions: &RegionClients,
    bucket_name: &str,
) -> Result<Option<BucketPolicy>, CloudError> {
    let default_client = regions.get_or_create("").await;
    let location = default_client
        .get_bucket_location()
        .bucket(bucket_name)
        .send()
        .await;

    let location = match location {
        Ok(resp) => resp,
        Err(err) => {
            if error_code(&err) == Some("NoSuchBucket") {
                return Ok(None);
            }
            return Err(CloudError::S3(format!(
                "GetBucketLocation for {bucket_name}: {err}"
            )));
        }
    };

    let region = location
        .location_constraint
        .map(|c| c.as_str().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "us-east-1".to_string());
    let client = regions.get_or_create(&region).await;

    let policy_resp = client.get_bucket_policy().bucket(bucket_name).send().await;
    match policy_resp {
        Ok(resp) => {
            let policy_json = resp.policy.unwrap_or_default();
            let policy = acctsync_policy::parse_plain_json(&policy_json)?;
            Ok(Some(BucketPolicy {
                bucket_name: bucket_name.to_string(),
                policy,
            }))
        }
        Err(err) => {
            if error_code(&err) == Some("NoSuchBucketPolicy") {
                Ok(None)
            } else if error_code(&err) == Some("NoSuchBucket") {
                Ok(None)
            } else {
                Err(CloudError::S3(format!(
                    "GetBucketPolicy for {bucket_name}: {err}"
                )))
            }
        }
    }
}

pub async fn fetch(
    client: &aws_sdk_s3::Client,
    config: &aws_config::SdkConfig,
) -> Result<Vec<BucketPolicy>, CloudError> {
    let resp = client
        .list_buckets()
        .send()
        .await
        .map_err(|e| CloudError::S3(format!("ListBuckets: {e}")))?;

    let regions = Arc::new(RegionClients::new(config.clone(), client.clone()));
    let mut set = tokio::task::JoinSet::new();

    for b in &resp.buckets {
        let Some(name) = b.name.clone() else {
            continue;
        };
        let regions = Arc::clone(&regions);
        set.spawn(async move { fetch_bucket_policy(&regions, &name).await });
    }

    let mut outcomes = Vec::new();
    while let Some(result) = set.join_next().await {
        outcomes.push(result.map_err(|e| CloudError::S3(format!("bucket fetch task panicked: {e}"))));
    }

    let mut bucket_policies = Vec::new();
    let mut first_err = None;
    for outcome in outcomes {
        match outcome.and_then(|inner| inner) {
            Ok(Some(bp)) => bucket_policies.push(bp),
            Ok(None) => {}
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_err {
        return Err(e);
    }
    bucket_policies.sort_by(|a, b| a.bucket_name.cmp(&b.bucket_name));

    Ok(bucket_policies)
}
