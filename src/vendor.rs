//! Vendor classification for incoming target URLs.
//!
//! The dispatcher maps a target URL onto a closed vendor enumeration by
//! case-insensitive hostname containment against a fixed allowlist. The
//! [`Vendor::Unsupported`] arm is explicit so every match over vendors is
//! exhaustive; unsupported targets are rejected before any browser session
//! is opened.

use url::Url;

use crate::heuristic::{ChainSpec, chains};

/// Supported firmware vendors, plus an explicit rejection arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// TP-Link product support pages (`tp-link.com`).
    TpLink,
    /// Netgear product support pages (`netgear.com`).
    Netgear,
    /// Anything else; rejected without launching a browser.
    Unsupported,
}

impl Vendor {
    /// Classifies a target URL by hostname.
    ///
    /// Unparseable URLs and URLs without a host classify as `Unsupported`.
    #[must_use]
    pub fn classify(url: &str) -> Self {
        let Some(host) = Url::parse(url).ok().and_then(|u| {
            u.host_str()
                .map(|h| h.to_ascii_lowercase())
        }) else {
            return Self::Unsupported;
        };

        if host.contains("tp-link.com") {
            Self::TpLink
        } else if host.contains("netgear.com") {
            Self::Netgear
        } else {
            Self::Unsupported
        }
    }

    /// Returns the heuristic chain for this vendor, or `None` for
    /// [`Vendor::Unsupported`].
    #[must_use]
    pub fn chain(self) -> Option<&'static ChainSpec> {
        match self {
            Self::TpLink => Some(&chains::TP_LINK),
            Self::Netgear => Some(&chains::NETGEAR),
            Self::Unsupported => None,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TpLink => "tp-link",
            Self::Netgear => "netgear",
            Self::Unsupported => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tp_link() {
        assert_eq!(
            Vendor::classify("https://www.tp-link.com/us/support/download/archer-c7/"),
            Vendor::TpLink
        );
    }

    #[test]
    fn test_classify_netgear() {
        assert_eq!(
            Vendor::classify("https://www.netgear.com/support/product/r7000#download"),
            Vendor::Netgear
        );
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(
            Vendor::classify("https://WWW.TP-LINK.COM/support"),
            Vendor::TpLink
        );
    }

    #[test]
    fn test_classify_unknown_host() {
        assert_eq!(Vendor::classify("https://example.com/fw"), Vendor::Unsupported);
    }

    #[test]
    fn test_classify_matches_host_not_path() {
        // A hostile path mentioning a vendor must not classify as that vendor.
        assert_eq!(
            Vendor::classify("https://example.com/tp-link.com/firmware"),
            Vendor::Unsupported
        );
    }

    #[test]
    fn test_classify_garbage_input() {
        assert_eq!(Vendor::classify("not a url"), Vendor::Unsupported);
        assert_eq!(Vendor::classify(""), Vendor::Unsupported);
    }

    #[test]
    fn test_supported_vendors_have_chains() {
        assert!(Vendor::TpLink.chain().is_some());
        assert!(Vendor::Netgear.chain().is_some());
        assert!(Vendor::Unsupported.chain().is_none());
    }
}
