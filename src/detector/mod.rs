//! QR symbol localization from finder patterns
//!
//! This module contains the geometric side of symbol detection:
//! - Finder pattern detection (the three square markers)
//! - Grouping finder triples into oriented symbol candidates

/// Finder pattern detection using 1:1:3:1:1 ratio scanning
pub mod finder;
/// Finder triples to ordered symbol geometry
pub mod grouping;
