//! Decoded vendor responses and the link rewrite computed from them.

use calltrack_cache::{CacheEntry, CacheError};
use serde::{Deserialize, Serialize};

/// A decoded call tracking vendor response.
///
/// Vendors return at minimum a `phoneNumber`; the optional
/// `formattedPhoneNumber` is a human-readable rendering of the same number.
/// Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTrackingResponse {
    /// The phone number to dial, used for the `tel:` target.
    pub phone_number: String,
    /// A display rendering of the number, if the vendor provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_phone_number: Option<String>,
}

impl CallTrackingResponse {
    /// Validates that the response is usable.
    pub fn validate(&self) -> CacheEntry {
        if self.phone_number.is_empty() {
            return Err(CacheError::Malformed(
                "response must contain a non-empty `phoneNumber` field".to_owned(),
            ));
        }
        Ok(())
    }

    /// Computes the hyperlink rewrite for this response.
    pub fn link_rewrite(&self) -> LinkRewrite {
        LinkRewrite {
            href: format!("tel:{}", self.phone_number),
            text: self
                .formatted_phone_number
                .clone()
                .unwrap_or_else(|| self.phone_number.clone()),
        }
    }
}

/// The attribute values to apply to the tracked hyperlink.
///
/// How these are applied is up to the embedding environment; this crate only
/// computes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkRewrite {
    /// The new link destination, a `tel:` URL.
    pub href: String,
    /// The new link text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_camel_case() {
        let response: CallTrackingResponse =
            serde_json::from_str(r#"{"phoneNumber": "+1-555-0100"}"#).unwrap();
        assert_eq!(response.phone_number, "+1-555-0100");
        assert_eq!(response.formatted_phone_number, None);

        let response: CallTrackingResponse = serde_json::from_str(
            r#"{"phoneNumber": "+15550100", "formattedPhoneNumber": "(555) 010-0", "vendorId": 7}"#,
        )
        .unwrap();
        assert_eq!(
            response.formatted_phone_number.as_deref(),
            Some("(555) 010-0")
        );
    }

    #[test]
    fn test_rejects_empty_phone_number() {
        let response: CallTrackingResponse =
            serde_json::from_str(r#"{"phoneNumber": ""}"#).unwrap();
        assert!(matches!(
            response.validate(),
            Err(CacheError::Malformed(_))
        ));
    }

    #[test]
    fn test_link_rewrite_prefers_formatted_number() {
        let response = CallTrackingResponse {
            phone_number: "+15550100".to_owned(),
            formatted_phone_number: Some("(555) 010-0".to_owned()),
        };
        let rewrite = response.link_rewrite();
        assert_eq!(rewrite.href, "tel:+15550100");
        assert_eq!(rewrite.text, "(555) 010-0");

        let response = CallTrackingResponse {
            phone_number: "+15550100".to_owned(),
            formatted_phone_number: None,
        };
        assert_eq!(response.link_rewrite().text, "+15550100");
    }
}
