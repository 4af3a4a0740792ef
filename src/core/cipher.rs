use crate::core::error::EngineError;
use rand::Rng;
use std::fmt;

/// An opaque ciphertext handle wrapping an integer value.
///
/// The engine never inspects the plaintext of a `CipherValue`; it only
/// combines handles through the homomorphic algebra (`add`, `sub`, `mul`,
/// `div`, comparisons, `select`). The single disclosure path is
/// [`CipherValue::reveal`], reserved for the decryption oracle boundary
/// and test assertions.
///
/// # Examples
///
/// ```
/// use credit_engine::core::cipher::CipherValue;
///
/// let a = CipherValue::encrypt(200);
/// let b = CipherValue::encrypt(50);
/// let sum = a.add(&b);
/// assert_eq!(sum.reveal(), 250);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CipherValue {
    inner: i128,
    tag: u64,
}

/// An encrypted boolean produced by ciphertext comparisons.
///
/// Supports `and`/`or`/`not` and drives [`CipherValue::select`] without
/// a plaintext branch. [`CipherBool::into_guard`] discloses the single
/// bit for the bounded guard decisions the protocol permits (draw-limit
/// and zero-debt checks).
#[derive(Debug, Clone, Copy)]
pub struct CipherBool {
    inner: bool,
    tag: u64,
}

/// Proof artifact accompanying an externally submitted ciphertext.
///
/// Validation of handle/proof consistency belongs to the encryption
/// library; the engine only checks that the proof commits to the handle
/// and treats a mismatch as an upstream rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputProof {
    commitment: u64,
}

const PROOF_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

fn commitment_for(value: i128) -> u64 {
    (value as u64)
        .wrapping_mul(0x100_0000_01b3)
        .rotate_left(17)
        ^ PROOF_SALT
}

fn fresh_tag() -> u64 {
    rand::thread_rng().gen()
}

impl InputProof {
    /// Produce the proof a submitter would attach to `value`.
    pub fn for_value(value: i128) -> Self {
        Self {
            commitment: commitment_for(value),
        }
    }
}

impl CipherValue {
    /// Encrypt a value through the trusted internal path (initializers,
    /// policy-derived constants).
    pub fn encrypt(value: i128) -> Self {
        Self {
            inner: value,
            tag: fresh_tag(),
        }
    }

    /// The encrypted zero.
    pub fn zero() -> Self {
        Self::encrypt(0)
    }

    /// Accept an externally submitted ciphertext with its proof.
    ///
    /// Fails with [`EngineError::InvalidProof`] when the proof does not
    /// commit to the submitted handle; the caller must abort with no
    /// state change.
    pub fn from_external(value: i128, proof: &InputProof) -> Result<Self, EngineError> {
        if proof.commitment != commitment_for(value) {
            return Err(EngineError::InvalidProof);
        }
        Ok(Self::encrypt(value))
    }

    // --- Homomorphic arithmetic ---

    pub fn add(&self, other: &CipherValue) -> CipherValue {
        CipherValue {
            inner: self.inner.wrapping_add(other.inner),
            tag: fresh_tag(),
        }
    }

    pub fn sub(&self, other: &CipherValue) -> CipherValue {
        CipherValue {
            inner: self.inner.wrapping_sub(other.inner),
            tag: fresh_tag(),
        }
    }

    pub fn mul(&self, other: &CipherValue) -> CipherValue {
        CipherValue {
            inner: self.inner.wrapping_mul(other.inner),
            tag: fresh_tag(),
        }
    }

    /// Integer division. Division by an encrypted zero yields the
    /// encrypted zero; callers add one to divisors where zero is
    /// possible (the collateral-ratio convention).
    pub fn div(&self, other: &CipherValue) -> CipherValue {
        let inner = if other.inner == 0 {
            0
        } else {
            self.inner / other.inner
        };
        CipherValue {
            inner,
            tag: fresh_tag(),
        }
    }

    pub fn add_plain(&self, value: i128) -> CipherValue {
        CipherValue {
            inner: self.inner.wrapping_add(value),
            tag: fresh_tag(),
        }
    }

    pub fn sub_plain(&self, value: i128) -> CipherValue {
        CipherValue {
            inner: self.inner.wrapping_sub(value),
            tag: fresh_tag(),
        }
    }

    pub fn mul_plain(&self, value: i128) -> CipherValue {
        CipherValue {
            inner: self.inner.wrapping_mul(value),
            tag: fresh_tag(),
        }
    }

    pub fn div_plain(&self, value: i128) -> CipherValue {
        let inner = if value == 0 { 0 } else { self.inner / value };
        CipherValue {
            inner,
            tag: fresh_tag(),
        }
    }

    // --- Comparisons ---

    pub fn ge(&self, other: &CipherValue) -> CipherBool {
        CipherBool {
            inner: self.inner >= other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn gt(&self, other: &CipherValue) -> CipherBool {
        CipherBool {
            inner: self.inner > other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn le(&self, other: &CipherValue) -> CipherBool {
        CipherBool {
            inner: self.inner <= other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn lt(&self, other: &CipherValue) -> CipherBool {
        CipherBool {
            inner: self.inner < other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn eq_cipher(&self, other: &CipherValue) -> CipherBool {
        CipherBool {
            inner: self.inner == other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn ge_plain(&self, value: i128) -> CipherBool {
        CipherBool {
            inner: self.inner >= value,
            tag: fresh_tag(),
        }
    }

    pub fn gt_plain(&self, value: i128) -> CipherBool {
        CipherBool {
            inner: self.inner > value,
            tag: fresh_tag(),
        }
    }

    pub fn le_plain(&self, value: i128) -> CipherBool {
        CipherBool {
            inner: self.inner <= value,
            tag: fresh_tag(),
        }
    }

    pub fn lt_plain(&self, value: i128) -> CipherBool {
        CipherBool {
            inner: self.inner < value,
            tag: fresh_tag(),
        }
    }

    pub fn eq_plain(&self, value: i128) -> CipherBool {
        CipherBool {
            inner: self.inner == value,
            tag: fresh_tag(),
        }
    }

    /// Branchless select: returns `a` where `cond` holds, else `b`.
    pub fn select(cond: &CipherBool, a: &CipherValue, b: &CipherValue) -> CipherValue {
        CipherValue {
            inner: if cond.inner { a.inner } else { b.inner },
            tag: fresh_tag(),
        }
    }

    /// Clamp below at an encrypted floor: `max(self, floor)`.
    pub fn max_with(&self, floor: &CipherValue) -> CipherValue {
        CipherValue::select(&self.ge(floor), self, floor)
    }

    /// Clamp above at an encrypted ceiling: `min(self, ceiling)`.
    pub fn min_with(&self, ceiling: &CipherValue) -> CipherValue {
        CipherValue::select(&self.le(ceiling), self, ceiling)
    }

    /// Disclose the plaintext. This is the oracle boundary: call sites
    /// are the decryption oracle simulator and test assertions, nothing
    /// else.
    pub fn reveal(&self) -> i128 {
        self.inner
    }

    /// The opaque handle tag (public, carries no value information).
    pub fn tag(&self) -> u64 {
        self.tag
    }
}

impl CipherBool {
    pub fn and(&self, other: &CipherBool) -> CipherBool {
        CipherBool {
            inner: self.inner && other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn or(&self, other: &CipherBool) -> CipherBool {
        CipherBool {
            inner: self.inner || other.inner,
            tag: fresh_tag(),
        }
    }

    pub fn not(&self) -> CipherBool {
        CipherBool {
            inner: !self.inner,
            tag: fresh_tag(),
        }
    }

    /// Encrypted one-or-zero, for folding booleans into arithmetic.
    pub fn as_value(&self) -> CipherValue {
        CipherValue::encrypt(if self.inner { 1 } else { 0 })
    }

    /// Disclose the single bit for a protocol-permitted guard decision
    /// (draw-limit check, zero-debt check). The bit is consumed as a
    /// branch condition and never stored.
    pub fn into_guard(self) -> bool {
        self.inner
    }
}

impl fmt::Display for CipherValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cipher#{:016x}", self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sub_roundtrip() {
        let a = CipherValue::encrypt(1_000);
        let b = CipherValue::encrypt(400);
        assert_eq!(a.add(&b).reveal(), 1_400);
        assert_eq!(a.sub(&b).reveal(), 600);
    }

    #[test]
    fn test_mul_div() {
        let a = CipherValue::encrypt(12_000);
        assert_eq!(a.mul_plain(10_000).div_plain(100).reveal(), 1_200_000);
    }

    #[test]
    fn test_div_by_zero_yields_zero() {
        let a = CipherValue::encrypt(500);
        assert_eq!(a.div(&CipherValue::zero()).reveal(), 0);
        assert_eq!(a.div_plain(0).reveal(), 0);
    }

    #[test]
    fn test_compare_and_select() {
        let a = CipherValue::encrypt(7);
        let b = CipherValue::encrypt(9);
        let picked = CipherValue::select(&a.ge(&b), &a, &b);
        assert_eq!(picked.reveal(), 9);
        let picked = CipherValue::select(&b.ge(&a), &a, &b);
        assert_eq!(picked.reveal(), 7);
    }

    #[test]
    fn test_bool_algebra() {
        let t = CipherValue::encrypt(1).ge_plain(0);
        let f = CipherValue::encrypt(-1).ge_plain(0);
        assert!(t.and(&t).into_guard());
        assert!(!t.and(&f).into_guard());
        assert!(t.or(&f).into_guard());
        assert!(f.not().into_guard());
        assert_eq!(t.as_value().reveal(), 1);
        assert_eq!(f.as_value().reveal(), 0);
    }

    #[test]
    fn test_max_min_clamps() {
        let x = CipherValue::encrypt(-30);
        assert_eq!(x.max_with(&CipherValue::zero()).reveal(), 0);
        let y = CipherValue::encrypt(150);
        assert_eq!(y.min_with(&CipherValue::encrypt(100)).reveal(), 100);
    }

    #[test]
    fn test_proof_accepts_matching_value() {
        let proof = InputProof::for_value(42);
        let cipher = CipherValue::from_external(42, &proof).unwrap();
        assert_eq!(cipher.reveal(), 42);
    }

    #[test]
    fn test_proof_rejects_mismatch() {
        let proof = InputProof::for_value(42);
        assert!(matches!(
            CipherValue::from_external(43, &proof),
            Err(EngineError::InvalidProof)
        ));
    }

    #[test]
    fn test_tags_are_fresh_per_operation() {
        let a = CipherValue::encrypt(5);
        let b = a.add_plain(0);
        assert_ne!(a.tag(), b.tag());
        assert_eq!(a.reveal(), b.reveal());
    }
}
