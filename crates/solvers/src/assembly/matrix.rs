use impulse_core::{Matrix, model::InteractionId};
use ndarray::s;

use super::{AssemblyError, Block};

/// Coupling blocks between two interactions that share a system.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupling {
    pub source: InteractionId,
    pub target: InteractionId,
    /// Block at `(pos(source), pos(target))`.
    pub forward: Matrix,
    /// Block at `(pos(target), pos(source))`.
    pub backward: Matrix,
}

/// Source operators for one [`OsnsMatrix::fill`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blocks {
    pub diagonal: Vec<(InteractionId, Matrix)>,
    pub couplings: Vec<Coupling>,
}

/// Dense block matrix indexed by absolute interaction positions.
#[derive(Debug, Clone, Default)]
pub struct OsnsMatrix {
    positions: Vec<Option<usize>>,
    sizes: Vec<usize>,
    order: Vec<InteractionId>,
    dim: usize,
    matrix: Matrix,
    allocations: usize,
}

impl OsnsMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns absolute positions to `(interaction, size)` pairs in
    /// iteration order and returns the total dimension.
    ///
    /// Each position is the running sum of the sizes before it, so
    /// positions start at 0, strictly increase, and leave no gaps.
    pub fn update_size_and_positions<I>(&mut self, members: I) -> usize
    where
        I: IntoIterator<Item = (InteractionId, usize)>,
    {
        self.positions.fill(None);
        self.order.clear();
        self.dim = 0;

        for (id, size) in members {
            let index = id.index();
            if index >= self.positions.len() {
                self.positions.resize(index + 1, None);
                self.sizes.resize(index + 1, 0);
            }
            self.positions[index] = Some(self.dim);
            self.sizes[index] = size;
            self.order.push(id);
            self.dim += size;
        }

        self.dim
    }

    /// Copies diagonal blocks and accumulates coupling blocks at their
    /// absolute positions.
    ///
    /// The `D × D` store is reallocated when `force_rebuild` is set or `D`
    /// changed; otherwise its contents are refreshed in place.
    ///
    /// # Errors
    ///
    /// Returns an error if a block belongs to an unpositioned interaction or
    /// its shape disagrees with the law sizes.
    pub fn fill(&mut self, blocks: &Blocks, force_rebuild: bool) -> Result<(), AssemblyError> {
        if force_rebuild || self.matrix.dim() != (self.dim, self.dim) {
            self.matrix = Matrix::zeros((self.dim, self.dim));
            self.allocations += 1;
        } else {
            self.matrix.fill(0.0);
        }

        for (id, block) in &blocks.diagonal {
            let (pos, size) = self.slot(*id)?;
            check_shape(Block::Diagonal(*id), block, (size, size))?;
            self.matrix
                .slice_mut(s![pos..pos + size, pos..pos + size])
                .assign(block);
        }

        for coupling in &blocks.couplings {
            let (pos_a, size_a) = self.slot(coupling.source)?;
            let (pos_b, size_b) = self.slot(coupling.target)?;
            let block = Block::Coupling(coupling.source, coupling.target);
            check_shape(block, &coupling.forward, (size_a, size_b))?;
            check_shape(block, &coupling.backward, (size_b, size_a))?;

            let mut forward = self
                .matrix
                .slice_mut(s![pos_a..pos_a + size_a, pos_b..pos_b + size_b]);
            forward += &coupling.forward;
            let mut backward = self
                .matrix
                .slice_mut(s![pos_b..pos_b + size_b, pos_a..pos_a + size_a]);
            backward += &coupling.backward;
        }

        Ok(())
    }

    /// Returns the problem dimension `D`.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Returns the absolute position of an interaction.
    #[must_use]
    pub fn position(&self, id: InteractionId) -> Option<usize> {
        self.positions.get(id.index()).copied().flatten()
    }

    /// Returns the positioned interactions in iteration order.
    #[must_use]
    pub fn members(&self) -> &[InteractionId] {
        &self.order
    }

    /// Returns how many times the block store has been allocated.
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    fn slot(&self, id: InteractionId) -> Result<(usize, usize), AssemblyError> {
        self.position(id)
            .map(|pos| (pos, self.sizes[id.index()]))
            .ok_or(AssemblyError::Unpositioned(id))
    }
}

fn check_shape(
    block: Block,
    matrix: &Matrix,
    expected: (usize, usize),
) -> Result<(), AssemblyError> {
    if matrix.dim() == expected {
        Ok(())
    } else {
        Err(AssemblyError::DimensionMismatch {
            block,
            expected,
            found: matrix.dim(),
        })
    }
}
