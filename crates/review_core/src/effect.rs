/// Side effects the pagination controller asks its driver to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Request this page next (after the politeness delay).
    FetchPage { page: u32 },
    /// The run reached a terminal state; no further fetches follow.
    Finished { complete: bool },
}
