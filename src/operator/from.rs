use std::fmt;

/// Source of a query: one bucket, named or addressed by id.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct FromBucket {
    bucket: Option<String>,
    bucket_id: Option<String>,
}

impl FromBucket {
    pub fn new(bucket: Option<String>, bucket_id: Option<String>) -> Self {
        Self { bucket, bucket_id }
    }

    pub fn with_name<S: Into<String>>(bucket: S) -> Self {
        Self::new(Some(bucket.into()), None)
    }

    pub fn with_id<S: Into<String>>(bucket_id: S) -> Self {
        Self::new(None, Some(bucket_id.into()))
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn bucket_id(&self) -> Option<&str> {
        self.bucket_id.as_deref()
    }
}

impl fmt::Display for FromBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.bucket, &self.bucket_id) {
            (Some(name), _) => write!(f, "bucket: {:?}", name),
            (None, Some(id)) => write!(f, "bucketID: {:?}", id),
            (None, None) => Ok(()),
        }
    }
}
