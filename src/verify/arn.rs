//! Minimal ARN parsing.

use crate::error::{Error, Result};

/// The components of an Amazon Resource Name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn<'a> {
    /// Partition, e.g. `aws`.
    pub partition: &'a str,
    /// Service namespace, e.g. `iam`.
    pub service: &'a str,
    /// Region; empty for global services.
    pub region: &'a str,
    /// Account ID; empty for S3.
    pub account_id: &'a str,
    /// Service-specific resource part, which may itself contain colons.
    pub resource: &'a str,
}

impl<'a> Arn<'a> {
    /// Parses `arn:partition:service:region:account:resource`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] when the text is not an ARN.
    pub fn parse(text: &'a str) -> Result<Self> {
        let mut parts = text.splitn(6, ':');
        let prefix = parts.next();
        let (Some(partition), Some(service), Some(region), Some(account_id), Some(resource)) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Invalid(format!("arn: not enough sections in {text}")));
        };
        if prefix != Some("arn") {
            return Err(Error::Invalid(format!("arn: invalid prefix in {text}")));
        }
        Ok(Self { partition, service, region, account_id, resource })
    }
}

/// Extracts the role name from an IAM role ARN.
///
/// The role may live under a path (`role/service-role/name`); the last
/// segment is the name.
///
/// # Errors
///
/// Returns [`Error::Invalid`] unless the ARN is an IAM `role/` ARN.
pub fn extract_role_name(role_arn: &str) -> Result<String> {
    let arn = Arn::parse(role_arn)
        .map_err(|e| Error::Invalid(format!("failed to parse role arn:{role_arn} {e}")))?;
    if arn.service != "iam" || !arn.resource.starts_with("role/") {
        return Err(Error::Invalid("not a valid role arn".to_string()));
    }
    Ok(arn.resource.rsplit('/').next().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_components() {
        let arn = Arn::parse("arn:aws:secretsmanager:us-east-1:123:secret:db-AbC:password::")
            .unwrap();
        assert_eq!(arn.service, "secretsmanager");
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.resource, "secret:db-AbC:password::");
    }

    #[test]
    fn rejects_non_arn() {
        assert!(Arn::parse("my-bucket/key").is_err());
        assert!(Arn::parse("urn:aws:s3:::bucket").is_err());
    }

    #[test]
    fn role_names() {
        assert_eq!(extract_role_name("arn:aws:iam::123:role/ecsTaskExecutionRole").unwrap(), "ecsTaskExecutionRole");
        assert_eq!(extract_role_name("arn:aws:iam::123:role/service-role/app").unwrap(), "app");
        assert!(extract_role_name("arn:aws:iam::123:user/alice").is_err());
        assert!(extract_role_name("arn:aws:s3:::role/x").is_err());
        assert!(extract_role_name("ecsTaskExecutionRole").is_err());
    }
}
