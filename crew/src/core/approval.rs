//! Approval keyword detection.

/// Literal the reviewer is asked to emit when it accepts the code.
pub const APPROVAL_KEYWORD: &str = "APPROVED";

/// Whether the reviewer `verdict` contains the approval keyword, ignoring case.
///
/// This is a plain substring test: "NOT APPROVED" and "unapproved" both count.
pub fn is_approved(verdict: &str) -> bool {
    verdict.to_uppercase().contains(APPROVAL_KEYWORD)
}
