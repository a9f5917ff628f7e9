//! Forward tensor operations.
//!
//! Every operation validates shapes, computes a fresh output buffer, and
//! attaches a chain step linking back to its tracked inputs. Input order is
//! the upstream-link order, which keeps chain walks deterministic.

use crate::autograd::record_step;
use crate::error::NnError;
use crate::tensor::Tensor;

/// Matrix product of two rank-2 tensors: `[m, k] x [k, n] -> [m, n]`.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor, NnError> {
    let sa = a.shape();
    let sb = b.shape();
    if sa.len() != 2 || sb.len() != 2 || sa[1] != sb[0] {
        return Err(NnError::IncompatibleShapes {
            shape1: sa,
            shape2: sb,
            operation: "matmul",
        });
    }
    let (m, k, n) = (sa[0], sa[1], sb[1]);
    let da = a.data();
    let db = b.data();
    let mut out = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0;
            for p in 0..k {
                acc += da[i * k + p] * db[p * n + j];
            }
            out[i * n + j] = acc;
        }
    }
    let y = Tensor::new(out, vec![m, n])?;
    record_step(&y, "MatmulBackward", &[a, b]);
    Ok(y)
}

/// Elementwise addition. A rank-1 right operand matching the trailing axis
/// of the left operand is broadcast across it (the bias case).
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor, NnError> {
    let sa = a.shape();
    let sb = b.shape();
    let da = a.data();
    let db = b.data();
    let out = if sa == sb {
        da.iter().zip(db.iter()).map(|(x, y)| x + y).collect()
    } else if sb.len() == 1 && sa.last() == Some(&sb[0]) {
        let n = sb[0];
        da.iter()
            .enumerate()
            .map(|(i, x)| x + db[i % n])
            .collect()
    } else {
        return Err(NnError::IncompatibleShapes {
            shape1: sa,
            shape2: sb,
            operation: "add",
        });
    };
    let y = Tensor::new(out, sa)?;
    record_step(&y, "AddBackward", &[a, b]);
    Ok(y)
}

/// Multiplies every element by a constant factor.
pub fn scale(t: &Tensor, factor: f32) -> Result<Tensor, NnError> {
    let out = t.data().iter().map(|x| x * factor).collect();
    let y = Tensor::new(out, t.shape())?;
    record_step(&y, "MulBackward", &[t]);
    Ok(y)
}

/// Rectified linear unit, elementwise.
pub fn relu(t: &Tensor) -> Result<Tensor, NnError> {
    let out = t.data().iter().map(|x| x.max(0.0)).collect();
    let y = Tensor::new(out, t.shape())?;
    record_step(&y, "ReluBackward", &[t]);
    Ok(y)
}

/// Hyperbolic tangent, elementwise.
pub fn tanh(t: &Tensor) -> Result<Tensor, NnError> {
    let out = t.data().iter().map(|x| x.tanh()).collect();
    let y = Tensor::new(out, t.shape())?;
    record_step(&y, "TanhBackward", &[t]);
    Ok(y)
}

/// Concatenates tensors of identical shape (except along `axis`).
pub fn cat(tensors: &[Tensor], axis: usize) -> Result<Tensor, NnError> {
    let first = tensors.first().ok_or(NnError::EmptyTensorList)?;
    let base = first.shape();
    if axis >= base.len() {
        return Err(NnError::InvalidAxis {
            axis,
            rank: base.len(),
        });
    }
    let mut axis_total = 0;
    for t in tensors {
        let s = t.shape();
        let compatible = s.len() == base.len()
            && s.iter()
                .zip(base.iter())
                .enumerate()
                .all(|(d, (x, y))| d == axis || x == y);
        if !compatible {
            return Err(NnError::ShapeMismatch {
                expected: base.clone(),
                actual: s,
                operation: "cat",
            });
        }
        axis_total += s[axis];
    }

    let outer: usize = base[..axis].iter().product();
    let buffers: Vec<Vec<f32>> = tensors.iter().map(|t| t.data()).collect();
    let chunks: Vec<usize> = tensors
        .iter()
        .map(|t| t.shape()[axis..].iter().product())
        .collect();
    let mut out = Vec::with_capacity(buffers.iter().map(|b| b.len()).sum());
    for o in 0..outer {
        for (buf, &chunk) in buffers.iter().zip(chunks.iter()) {
            out.extend_from_slice(&buf[o * chunk..(o + 1) * chunk]);
        }
    }

    let mut shape = base;
    shape[axis] = axis_total;
    let y = Tensor::new(out, shape)?;
    let refs: Vec<&Tensor> = tensors.iter().collect();
    record_step(&y, "CatBackward", &refs);
    Ok(y)
}
