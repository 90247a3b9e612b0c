use common::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use url::{ParseError, Url};

/// Where a table lives, classified by URI scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageLocation {
    S3 { bucket: String, key: String },
    Url(Url),
    Local(PathBuf),
}

impl StorageLocation {
    pub fn parse(uri: &str) -> Result<Self> {
        match Url::parse(uri) {
            Ok(url) if url.scheme() == "s3" => {
                let bucket = url
                    .host_str()
                    .filter(|bucket| !bucket.is_empty())
                    .ok_or_else(|| Error::InvalidUri(format!("S3 path '{}' has no bucket", uri)))?
                    .to_string();
                let key = url.path().trim_start_matches('/').to_string();
                if key.is_empty() {
                    return Err(Error::InvalidUri(format!(
                        "S3 path '{}' results in an empty object key",
                        uri
                    )));
                }
                Ok(StorageLocation::S3 { bucket, key })
            }
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => {
                Ok(StorageLocation::Url(url))
            }
            // A drive letter such as `C:\data\trips.parquet`.
            Ok(url) if url.scheme().len() == 1 => Ok(StorageLocation::Local(PathBuf::from(uri))),
            Ok(url) => Err(Error::Config(format!(
                "Unsupported storage scheme '{}' in '{}'",
                url.scheme(),
                uri
            ))),
            Err(ParseError::RelativeUrlWithoutBase) => {
                if uri.trim().is_empty() {
                    return Err(Error::InvalidUri("Empty storage path".to_string()));
                }
                Ok(StorageLocation::Local(PathBuf::from(uri)))
            }
            Err(e) => Err(Error::InvalidUri(format!("'{}': {}", uri, e))),
        }
    }

    pub fn is_s3(&self) -> bool {
        matches!(self, StorageLocation::S3 { .. })
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::S3 { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
            StorageLocation::Url(url) => write!(f, "{}", url),
            StorageLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_uri() {
        let location = StorageLocation::parse(
            "s3://nyc-duration/taxi_type=yellow/year=2022/month=02/predictions.parquet",
        )
        .unwrap();
        assert_eq!(
            location,
            StorageLocation::S3 {
                bucket: "nyc-duration".to_string(),
                key: "taxi_type=yellow/year=2022/month=02/predictions.parquet".to_string(),
            }
        );
        assert!(location.is_s3());
    }

    #[test]
    fn test_https_and_file_uris() {
        let https = StorageLocation::parse(
            "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2022-02.parquet",
        )
        .unwrap();
        assert!(matches!(https, StorageLocation::Url(_)));

        let file = StorageLocation::parse("file:///tmp/trips.parquet").unwrap();
        assert!(matches!(file, StorageLocation::Url(_)));
    }

    #[test]
    fn test_relative_and_absolute_paths_are_local() {
        assert_eq!(
            StorageLocation::parse("output/yellow_tripdata_2022-02.parquet").unwrap(),
            StorageLocation::Local(PathBuf::from("output/yellow_tripdata_2022-02.parquet"))
        );
        assert!(matches!(
            StorageLocation::parse("/data/trips.parquet").unwrap(),
            StorageLocation::Local(_)
        ));
    }

    #[test]
    fn test_invalid_uris() {
        assert!(matches!(
            StorageLocation::parse("s3://bucket-only"),
            Err(Error::InvalidUri(_))
        ));
        assert!(matches!(
            StorageLocation::parse("ftp://host/file.parquet"),
            Err(Error::Config(_))
        ));
        assert!(matches!(StorageLocation::parse(""), Err(Error::InvalidUri(_))));
    }

    #[test]
    fn test_display_round_trips_location() {
        let s3 = StorageLocation::parse("s3://nyc-duration/out/2022-02.parquet").unwrap();
        assert_eq!(s3.to_string(), "s3://nyc-duration/out/2022-02.parquet");

        let local = StorageLocation::parse("output/predictions.parquet").unwrap();
        assert!(!local.is_s3());
        assert_eq!(local.to_string(), "output/predictions.parquet");
    }
}
