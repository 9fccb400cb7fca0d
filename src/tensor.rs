//! Shape of the per-pixel value (scalar, vector or matrix).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage layout of the tensor elements of one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorShape {
    ColVector,
    RowVector,
    ColMajorMatrix,
    RowMajorMatrix,
    /// Only the diagonal is stored.
    DiagonalMatrix,
    /// Diagonal first, then the upper triangle column by column.
    SymmetricMatrix,
    UpperTriangularMatrix,
    LowerTriangularMatrix,
}

impl TensorShape {
    pub const fn name(self) -> &'static str {
        match self {
            TensorShape::ColVector => "column vector",
            TensorShape::RowVector => "row vector",
            TensorShape::ColMajorMatrix => "column-major matrix",
            TensorShape::RowMajorMatrix => "row-major matrix",
            TensorShape::DiagonalMatrix => "diagonal matrix",
            TensorShape::SymmetricMatrix => "symmetric matrix",
            TensorShape::UpperTriangularMatrix => "upper triangular matrix",
            TensorShape::LowerTriangularMatrix => "lower triangular matrix",
        }
    }
}

/// Tensor descriptor: shape, number of stored elements and number of rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tensor {
    shape: TensorShape,
    elements: usize,
    rows: usize,
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor::scalar()
    }
}

fn n_upper_diagonal_elements(n: usize) -> usize {
    n * (n + 1) / 2
}

impl Tensor {
    pub const fn scalar() -> Self {
        Tensor {
            shape: TensorShape::ColVector,
            elements: 1,
            rows: 1,
        }
    }

    pub fn vector(n: usize) -> Result<Self> {
        let mut t = Tensor::scalar();
        t.set_vector(n)?;
        Ok(t)
    }

    pub fn matrix(rows: usize, cols: usize) -> Result<Self> {
        let mut t = Tensor::scalar();
        t.set_matrix(rows, cols)?;
        Ok(t)
    }

    pub fn with_shape(shape: TensorShape, rows: usize, cols: usize) -> Result<Self> {
        let mut t = Tensor::scalar();
        t.set_shape(shape, rows, cols)?;
        Ok(t)
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        match self.shape {
            TensorShape::ColVector => 1,
            TensorShape::RowVector => self.elements,
            TensorShape::ColMajorMatrix | TensorShape::RowMajorMatrix => self.elements / self.rows,
            TensorShape::DiagonalMatrix
            | TensorShape::SymmetricMatrix
            | TensorShape::UpperTriangularMatrix
            | TensorShape::LowerTriangularMatrix => self.rows,
        }
    }

    /// `[]` for a scalar, `[n]` for a vector, `[rows, columns]` otherwise.
    pub fn sizes(&self) -> Vec<usize> {
        if self.is_scalar() {
            Vec::new()
        } else if self.is_vector() {
            vec![self.elements]
        } else {
            vec![self.rows, self.columns()]
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.elements == 1
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.shape, TensorShape::ColVector | TensorShape::RowVector) && self.elements > 1
    }

    pub fn is_diagonal(&self) -> bool {
        self.shape == TensorShape::DiagonalMatrix
    }

    pub fn is_symmetric(&self) -> bool {
        self.shape == TensorShape::SymmetricMatrix
    }

    pub fn is_triangular(&self) -> bool {
        matches!(
            self.shape,
            TensorShape::UpperTriangularMatrix | TensorShape::LowerTriangularMatrix
        )
    }

    /// True when every logical element is stored, in column-major order.
    pub fn has_normal_order(&self) -> bool {
        matches!(
            self.shape,
            TensorShape::ColVector | TensorShape::RowVector | TensorShape::ColMajorMatrix
        )
    }

    pub fn set_scalar(&mut self) {
        *self = Tensor::scalar();
    }

    pub fn set_vector(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::parameter("tensor size must be non-zero"));
        }
        self.shape = TensorShape::ColVector;
        self.elements = n;
        self.rows = n;
        Ok(())
    }

    pub fn set_matrix(&mut self, rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 {
            return Err(Error::parameter("tensor sizes must be non-zero"));
        }
        self.shape = TensorShape::ColMajorMatrix;
        self.elements = rows * cols;
        self.rows = rows;
        self.correct_shape();
        Ok(())
    }

    /// Sets tensor sizes from a 0-, 1- or 2-element array.
    pub fn set_sizes(&mut self, sizes: &[usize]) -> Result<()> {
        match sizes {
            [] => {
                self.set_scalar();
                Ok(())
            }
            [n] => self.set_vector(*n),
            [rows, cols] => self.set_matrix(*rows, *cols),
            _ => Err(Error::parameter(
                "tensor dimensionalities higher than 2 not supported",
            )),
        }
    }

    pub fn set_shape(&mut self, shape: TensorShape, rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 {
            return Err(Error::parameter("tensor sizes must be non-zero"));
        }
        let square = |what: &str| -> Result<()> {
            if rows != cols {
                return Err(Error::parameter(format!("a {what} matrix must be square")));
            }
            Ok(())
        };
        match shape {
            TensorShape::ColVector => {
                if cols != 1 {
                    return Err(Error::parameter("a column vector can have only one column"));
                }
                self.elements = rows;
                self.rows = rows;
            }
            TensorShape::RowVector => {
                if rows != 1 {
                    return Err(Error::parameter("a row vector can have only one row"));
                }
                self.elements = cols;
                self.rows = 1;
            }
            TensorShape::ColMajorMatrix | TensorShape::RowMajorMatrix => {
                self.elements = rows * cols;
                self.rows = rows;
            }
            TensorShape::DiagonalMatrix => {
                square("diagonal")?;
                self.elements = rows;
                self.rows = rows;
            }
            TensorShape::SymmetricMatrix => {
                square("symmetric")?;
                self.elements = n_upper_diagonal_elements(rows);
                self.rows = rows;
            }
            TensorShape::UpperTriangularMatrix | TensorShape::LowerTriangularMatrix => {
                square("triangular")?;
                self.elements = n_upper_diagonal_elements(rows);
                self.rows = rows;
            }
        }
        self.shape = shape;
        if matches!(
            shape,
            TensorShape::ColMajorMatrix | TensorShape::RowMajorMatrix
        ) {
            self.correct_shape();
        }
        Ok(())
    }

    /// Reinterprets the stored elements as a column-major matrix with `rows` rows.
    pub fn change_shape(&mut self, rows: usize) -> Result<()> {
        if self.rows != rows {
            if rows == 0 || self.elements % rows != 0 {
                return Err(Error::parameter("cannot reshape tensor to requested size"));
            }
            self.rows = rows;
            self.shape = TensorShape::ColMajorMatrix;
            self.correct_shape();
        }
        Ok(())
    }

    /// Reinterprets the stored elements as a column vector.
    pub fn flatten(&mut self) {
        self.shape = TensorShape::ColVector;
        self.rows = self.elements;
    }

    pub fn transpose(&mut self) {
        match self.shape {
            TensorShape::ColVector => {
                self.shape = TensorShape::RowVector;
                self.rows = 1;
            }
            TensorShape::RowVector => {
                self.shape = TensorShape::ColVector;
                self.rows = self.elements;
            }
            TensorShape::ColMajorMatrix => {
                self.shape = TensorShape::RowMajorMatrix;
                self.rows = self.elements / self.rows;
            }
            TensorShape::RowMajorMatrix => {
                self.shape = TensorShape::ColMajorMatrix;
                self.rows = self.elements / self.rows;
            }
            TensorShape::DiagonalMatrix | TensorShape::SymmetricMatrix => {}
            TensorShape::UpperTriangularMatrix => self.shape = TensorShape::LowerTriangularMatrix,
            TensorShape::LowerTriangularMatrix => self.shape = TensorShape::UpperTriangularMatrix,
        }
    }

    /// Maps each position of the full column-major `rows x columns` matrix to
    /// the index of the stored element holding it, or `-1` for an implicit zero.
    pub fn look_up_table(&self) -> Vec<isize> {
        let m_rows = self.rows;
        let n_cols = self.columns();
        let mut lut = vec![-1isize; m_rows * n_cols];
        let mut index = 0isize;
        let mut next = || {
            index += 1;
            index - 1
        };
        match self.shape {
            TensorShape::ColVector | TensorShape::RowVector | TensorShape::ColMajorMatrix => {
                for n in 0..n_cols {
                    for m in 0..m_rows {
                        lut[n * m_rows + m] = next();
                    }
                }
            }
            TensorShape::RowMajorMatrix => {
                for m in 0..m_rows {
                    for n in 0..n_cols {
                        lut[n * m_rows + m] = next();
                    }
                }
            }
            TensorShape::DiagonalMatrix => {
                for m in 0..m_rows {
                    lut[m * m_rows + m] = next();
                }
            }
            TensorShape::SymmetricMatrix => {
                for m in 0..m_rows {
                    lut[m * m_rows + m] = next();
                }
                for n in 1..n_cols {
                    for m in 0..n {
                        let k = next();
                        lut[n * m_rows + m] = k;
                        lut[m * m_rows + n] = k;
                    }
                }
            }
            TensorShape::UpperTriangularMatrix => {
                for m in 0..m_rows {
                    lut[m * m_rows + m] = next();
                }
                for n in 1..n_cols {
                    for m in 0..n {
                        lut[n * m_rows + m] = next();
                    }
                }
            }
            TensorShape::LowerTriangularMatrix => {
                for m in 0..m_rows {
                    lut[m * m_rows + m] = next();
                }
                for n in 1..n_cols {
                    for m in 0..n {
                        lut[m * m_rows + n] = next();
                    }
                }
            }
        }
        lut
    }

    fn correct_shape(&mut self) {
        if self.rows == 1 {
            self.shape = TensorShape::RowVector;
        } else if self.rows == self.elements {
            self.shape = TensorShape::ColVector;
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            f.write_str("scalar")
        } else {
            write!(f, "{}x{} {}", self.rows, self.columns(), self.shape.name())
        }
    }
}
