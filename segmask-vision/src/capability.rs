//! Host vector-instruction capability, resolved once and passed explicitly

use tracing::info;

/// Which wide-register paths the current host can run.
///
/// Only constructible through [`SimdCapability::detect`] or
/// [`SimdCapability::scalar_only`], so a `true` flag always reflects the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdCapability {
    avx2: bool,
}

impl SimdCapability {
    /// Query the CPU
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        let avx2 = is_x86_feature_detected!("avx2");
        #[cfg(not(target_arch = "x86_64"))]
        let avx2 = false;

        info!("Vector capability: avx2={}", avx2);
        Self { avx2 }
    }

    /// Disable every vectorized path
    pub fn scalar_only() -> Self {
        Self { avx2: false }
    }

    pub fn avx2(&self) -> bool {
        self.avx2
    }

    pub fn has_vectorized_resample(&self) -> bool {
        self.avx2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_only() {
        let cap = SimdCapability::scalar_only();
        assert!(!cap.avx2());
        assert!(!cap.has_vectorized_resample());
    }

    #[test]
    fn test_detect_is_stable() {
        assert_eq!(SimdCapability::detect(), SimdCapability::detect());
    }
}
