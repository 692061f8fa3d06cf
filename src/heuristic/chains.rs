//! Per-vendor heuristic chain tables.
//!
//! Chains are plain data: ordered strategy steps with their selectors and
//! timeout bounds. Supporting a new vendor page layout means editing these
//! tables, not the interpreter.

use std::time::Duration;

use crate::session::Locator;

use super::{ChainSpec, Strategy};

/// Extensions accepted by anchor scans as firmware-like artifacts.
pub const FIRMWARE_EXTENSIONS: &[&str] =
    &[".zip", ".bin", ".img", ".tar", ".tar.gz", ".tgz", ".exe"];

/// Extension tokens probed for in raw markup fallbacks.
pub const MARKUP_TOKENS: &[&str] = &[".zip", ".bin", ".img", ".tar", ".tgz"];

/// Markup tokens for Netgear, which also ships `.exe` installers.
pub const NETGEAR_MARKUP_TOKENS: &[&str] = &[".zip", ".bin", ".img", ".tar", ".tgz", ".exe"];

/// TP-Link support pages: dismiss the locale switcher overlay, open the
/// Firmware tab, then try anchors, download buttons, and raw markup in
/// that order.
pub static TP_LINK: ChainSpec = ChainSpec {
    vendor: "tp-link",
    nav_timeout: Duration::from_secs(60),
    steps: &[
        Strategy::DismissOverlay {
            locator: Locator::Css(".tp-local-switcher"),
        },
        Strategy::ActivateSection {
            locators: &[
                Locator::Text {
                    selector: "button",
                    text: "Firmware",
                },
                Locator::Text {
                    selector: "a",
                    text: "Firmware",
                },
                Locator::Text {
                    selector: "*",
                    text: "Firmware",
                },
            ],
            settle: Duration::from_millis(1500),
        },
        Strategy::AnchorScan {
            extensions: FIRMWARE_EXTENSIONS,
        },
        Strategy::ClickCapture {
            locators: &[
                Locator::Text {
                    selector: "a",
                    text: "Download",
                },
                Locator::Text {
                    selector: "a.tp-button",
                    text: "Download",
                },
                Locator::Text {
                    selector: "button",
                    text: "Download",
                },
                Locator::Text {
                    selector: "a",
                    text: "Firmware Download",
                },
            ],
            wait: Duration::from_secs(20),
        },
        Strategy::MarkupScan {
            tokens: MARKUP_TOKENS,
        },
    ],
};

/// Netgear support pages: accept the cookie banner, then go straight for
/// download controls (anchors on these pages rarely expose extensions
/// directly), falling back to raw markup.
pub static NETGEAR: ChainSpec = ChainSpec {
    vendor: "netgear",
    nav_timeout: Duration::from_secs(90),
    steps: &[
        Strategy::ActivateSection {
            locators: &[
                Locator::Text {
                    selector: "button",
                    text: "Accept All Cookies",
                },
                Locator::Text {
                    selector: "button",
                    text: "Accept Cookies",
                },
                Locator::Text {
                    selector: "button",
                    text: "Agree",
                },
            ],
            settle: Duration::ZERO,
        },
        Strategy::ClickCapture {
            locators: &[
                Locator::Text {
                    selector: "li a",
                    text: "Download",
                },
                Locator::Text {
                    selector: "a",
                    text: "Download",
                },
                Locator::Css("a[href*='.zip']"),
                Locator::Css("a[href*='.img']"),
                Locator::Css("a[href*='/downloads/']"),
            ],
            wait: Duration::from_secs(15),
        },
        Strategy::MarkupScan {
            tokens: NETGEAR_MARKUP_TOKENS,
        },
    ],
};
