/// Classification for tier fallback policy.
///
/// Every tier failure falls through to the next tier; the class only decides
/// whether the failure also penalises the shared rate budget.
///
/// | Class | Try Next Tier? | Force Governor Penalty? |
/// |-------|----------------|-------------------------|
/// | `NextTier` | Yes | No |
/// | `FailoverWithPenalty` | Yes | Yes |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Fall through to the next tier without touching the rate budget.
    ///
    /// Used for timeouts, provider 5xx, malformed payloads, missing symbols
    /// and local budget denials (the governor already knows about those).
    NextTier,

    /// Fall through to the next tier and push the governor into its penalty
    /// block.
    ///
    /// Used when the provider itself answers 429: our local accounting
    /// disagrees with the provider's, so we stop spending calls until the
    /// penalty expires.
    FailoverWithPenalty,
}
