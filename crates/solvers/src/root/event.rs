/// Event emitted after each midpoint evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Iteration number, starting at 1.
    pub iter: usize,

    /// The evaluated midpoint.
    pub x: f64,

    /// The function value at `x`.
    pub residual: f64,

    /// The bracket before this evaluation, in ascending order.
    pub bracket: [f64; 2],
}
