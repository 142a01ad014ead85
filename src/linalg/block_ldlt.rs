//! Block-structured LDL^T factorization for symmetric indefinite systems.
//!
//! Factors `M = P^T (L D L^T) P` where `P` is an ambient permutation
//! derived from a user-supplied permutation of the matrix's block
//! structure. The factorization is dense and unpivoted; the block
//! permutation is the only reordering applied, so the caller controls
//! elimination order at block granularity.
//!
//! ## Example Usage
//! ```
//! use faer::{Col, Mat};
//! use almanac::linalg::block_ldlt::{BlockLdlt, SymbolicBlockMatrix};
//!
//! // Factor a symmetric matrix partitioned into a 2-block and a 1-block
//! let m = Mat::from_fn(3, 3, |i, j| if i == j { 4.0 } else { -1.0 });
//! let mut ldlt = BlockLdlt::new(SymbolicBlockMatrix::new(&[2, 1]));
//! ldlt.compute(m.as_ref()).unwrap();
//!
//! // Solve in place
//! let mut b = Col::from_fn(3, |i| (i + 1) as f64);
//! ldlt.solve_in_place(b.as_mut()).unwrap();
//! ```

use derive_more::{Display, Error};
use faer::{Col, ColMut, Mat, MatRef};
use problemo::Problem;

use crate::{E, I};

#[derive(Debug, Display, Error, PartialEq)]
pub enum BlockLdltError {
    #[display("Zero or non-finite pivot encountered during factorization")]
    SingularPivot,

    #[display("Factorization has not been computed")]
    NotFactorized,

    #[display("Permutation length does not match the block count")]
    PermutationMismatch,
}

/// Symbolic description of a block-partitioned symmetric matrix: the
/// row/column segment lengths, plus a flag recording whether a numeric
/// factorization of a matrix with this structure has been performed.
#[derive(Debug, Clone)]
pub struct SymbolicBlockMatrix {
    segment_lens: Vec<I>,
    pub performed_llt: bool,
}

impl SymbolicBlockMatrix {
    pub fn new(segment_lens: &[I]) -> Self {
        Self {
            segment_lens: segment_lens.to_vec(),
            performed_llt: false,
        }
    }

    /// Number of diagonal blocks.
    pub fn nsegments(&self) -> I {
        self.segment_lens.len()
    }

    pub fn segment_lens(&self) -> &[I] {
        &self.segment_lens
    }

    /// Total matrix dimension (sum of the segment lengths).
    pub fn total_dim(&self) -> I {
        self.segment_lens.iter().sum()
    }

    /// Deep copy of the structure.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Deep copy of the structure under a block permutation: block `i` of
    /// the result is block `perm[i]` of `self`.
    pub fn permuted(&self, perm: &[I]) -> Self {
        debug_assert_eq!(perm.len(), self.nsegments());
        Self {
            segment_lens: perm.iter().map(|&p| self.segment_lens[p]).collect(),
            performed_llt: false,
        }
    }
}

/// Dense LDL^T factorization of a symmetric block-partitioned matrix
/// under a block permutation.
///
/// All buffers are sized at construction; `compute` and `solve_in_place`
/// do not allocate.
pub struct BlockLdlt {
    /// Block structure in the original ordering.
    structure: SymbolicBlockMatrix,
    /// Deep copy of the structure under the current block permutation.
    reordered: SymbolicBlockMatrix,
    /// Working matrix: holds `L` (strict lower, unit diagonal implied)
    /// and `D` (diagonal) of the permuted input after `compute`.
    mat: Mat<E>,
    /// Block permutation: slot `i` of the reordered matrix is block
    /// `perm[i]` of the original.
    perm: Vec<I>,
    /// Start offset of each block in the original ordering.
    idx: Vec<I>,
    /// Ambient index permutation, mapping original positions to reordered
    /// positions. Derived from `perm` and the segment lengths.
    piv: Vec<I>,
    /// Scratch for the permuted right-hand side.
    work: Col<E>,
}

impl BlockLdlt {
    pub fn new(structure: SymbolicBlockMatrix) -> Self {
        let n = structure.nsegments();
        let dim = structure.total_dim();
        let reordered = structure.copy();
        let mut ldlt = Self {
            structure,
            reordered,
            mat: Mat::zeros(dim, dim),
            perm: (0..n).collect(),
            idx: vec![0; n],
            piv: vec![0; dim],
            work: Col::zeros(dim),
        };
        ldlt.analyze_pattern();
        ldlt
    }

    /// Matrix dimension.
    pub fn dim(&self) -> I {
        self.structure.total_dim()
    }

    pub fn structure(&self) -> &SymbolicBlockMatrix {
        &self.structure
    }

    /// Current block permutation.
    pub fn permutation(&self) -> &[I] {
        &self.perm
    }

    /// Ambient index permutation (original position to reordered
    /// position), derived from the block permutation.
    pub fn ambient_permutation(&self) -> &[I] {
        &self.piv
    }

    /// Installs a new block permutation and re-analyzes the pattern.
    /// Passing `None` keeps the current permutation.
    pub fn set_permutation(&mut self, perm: Option<&[I]>) -> Result<(), Problem> {
        let input = self.structure.copy();
        if let Some(p) = perm {
            if p.len() != self.structure.nsegments() {
                return Err(BlockLdltError::PermutationMismatch.into());
            }
            self.perm.copy_from_slice(p);
        }
        self.structure.performed_llt = false;
        self.reordered = input.permuted(&self.perm);
        self.analyze_pattern();
        Ok(())
    }

    /// Derives the block offsets and the ambient index permutation from
    /// the block permutation.
    fn analyze_pattern(&mut self) {
        let nblocks = self.structure.nsegments();

        let mut offset = 0;
        for i in 0..nblocks {
            self.idx[i] = offset;
            offset += self.structure.segment_lens[i];
        }

        // Slot i of the reordered matrix receives the contiguous index
        // range of original block perm[i]; storing the transposed map
        // makes piv take original positions to reordered positions.
        let mut pos = 0;
        for i in 0..nblocks {
            let len = self.reordered.segment_lens[i];
            let i0 = self.idx[self.perm[i]];
            for k in 0..len {
                self.piv[i0 + k] = pos + k;
            }
            pos += len;
        }
    }

    /// Factors the symmetric matrix `m` in place as `P M P^T = L D L^T`.
    ///
    /// Only the lower triangle of the permuted matrix is referenced. A
    /// zero or non-finite pivot aborts the factorization.
    pub fn compute(&mut self, m: MatRef<'_, E>) -> Result<(), Problem> {
        let dim = self.dim();
        debug_assert_eq!(m.nrows(), dim);
        debug_assert_eq!(m.ncols(), dim);

        for c in 0..dim {
            for r in 0..dim {
                self.mat[(self.piv[r], self.piv[c])] = m[(r, c)];
            }
        }

        for j in 0..dim {
            let mut d = self.mat[(j, j)];
            for k in 0..j {
                let l_jk = self.mat[(j, k)];
                d -= l_jk * l_jk * self.mat[(k, k)];
            }
            if d == 0.0 || !d.is_finite() {
                self.structure.performed_llt = false;
                return Err(BlockLdltError::SingularPivot.into());
            }
            self.mat[(j, j)] = d;

            for i in (j + 1)..dim {
                let mut v = self.mat[(i, j)];
                for k in 0..j {
                    v -= self.mat[(i, k)] * self.mat[(j, k)] * self.mat[(k, k)];
                }
                self.mat[(i, j)] = v / d;
            }
        }

        self.structure.performed_llt = true;
        Ok(())
    }

    /// Solves `M x = b` in place using the current factorization.
    pub fn solve_in_place(&mut self, mut b: ColMut<'_, E>) -> Result<(), Problem> {
        if !self.structure.performed_llt {
            return Err(BlockLdltError::NotFactorized.into());
        }
        let dim = self.dim();
        debug_assert_eq!(b.nrows(), dim);

        // work = P b
        for j in 0..dim {
            self.work[self.piv[j]] = b[j];
        }

        // L z = work (unit lower triangle)
        for i in 0..dim {
            let mut acc = self.work[i];
            for k in 0..i {
                acc -= self.mat[(i, k)] * self.work[k];
            }
            self.work[i] = acc;
        }

        // D y = z
        for i in 0..dim {
            self.work[i] /= self.mat[(i, i)];
        }

        // L^T x = y
        for i in (0..dim).rev() {
            let mut acc = self.work[i];
            for k in (i + 1)..dim {
                acc -= self.mat[(k, i)] * self.work[k];
            }
            self.work[i] = acc;
        }

        // b = P^T work
        for j in 0..dim {
            b[j] = self.work[self.piv[j]];
        }

        Ok(())
    }

    /// Writes the sign pattern of the diagonal factor `D` into `out`.
    /// The sign pattern encodes the inertia of the factored matrix.
    pub fn signature(&self, out: &mut [i8]) {
        debug_assert!(self.structure.performed_llt);
        debug_assert_eq!(out.len(), self.dim());
        for (i, s) in out.iter_mut().enumerate() {
            let d = self.mat[(i, i)];
            *s = if d > 0.0 {
                1
            } else if d < 0.0 {
                -1
            } else {
                0
            };
        }
    }

    /// Recovers an approximation of the original matrix from the
    /// factorization: seeds an identity matrix, applies `L`, `D`, `L^T`
    /// in place, and undoes the ambient permutation.
    pub fn reconstructed_matrix(&self) -> Mat<E> {
        debug_assert!(self.structure.performed_llt);
        let dim = self.dim();

        let mut ldl = Mat::zeros(dim, dim);
        for i in 0..dim {
            ldl[(i, i)] = 1.0;
        }

        for c in 0..dim {
            // ldl[.., c] := L^T ldl[.., c]
            for i in 0..dim {
                let mut acc = ldl[(i, c)];
                for k in (i + 1)..dim {
                    acc += self.mat[(k, i)] * ldl[(k, c)];
                }
                ldl[(i, c)] = acc;
            }
            // ldl[.., c] := D ldl[.., c]
            for i in 0..dim {
                ldl[(i, c)] *= self.mat[(i, i)];
            }
            // ldl[.., c] := L ldl[.., c]
            for i in (0..dim).rev() {
                let mut acc = ldl[(i, c)];
                for k in 0..i {
                    acc += self.mat[(i, k)] * ldl[(k, c)];
                }
                ldl[(i, c)] = acc;
            }
        }

        // res = P^T ldl P
        let mut res = Mat::zeros(dim, dim);
        for c in 0..dim {
            for r in 0..dim {
                res[(r, c)] = ldl[(self.piv[r], self.piv[c])];
            }
        }
        res
    }
}
